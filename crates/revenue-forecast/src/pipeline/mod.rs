//! Pipeline module.
//!
//! Ties loading, splitting, encoding, fitting, evaluation and output
//! writing into a single run.

mod builder;
pub mod progress;

pub use builder::{ForecastOutcome, ForecastPipeline, ForecastPipelineBuilder, run_forecast};
pub use progress::{ClosureProgressReporter, ForecastStage, ProgressReporter, ProgressUpdate};
