//! Analysis modules.
//!
//! The pure aggregation primitives live in `aggregator`; `series` applies
//! them to a results store to build chart data for each problem.

pub mod aggregator;
pub mod error;
pub mod series;

pub use aggregator::*;
pub use error::AggregateError;
pub use series::{build_problem, select_problems, AggregationSettings, SeriesBuilder};
