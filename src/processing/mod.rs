//! Multi-target processing

pub mod batch;
pub mod parser;

pub use batch::{BatchSolver, BatchSummary, TargetEstimate, TargetObservations, TimedReception};
pub use parser::{reception_time_column, FeedError, TARGET_ID_COLUMN};
