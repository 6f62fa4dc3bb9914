//! Results store loading.

pub mod loader;

pub use loader::{load_store, parse_store};
