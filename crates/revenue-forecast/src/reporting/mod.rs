//! Output generation.
//!
//! Serializes a run's predictions, coefficients and performance summary to
//! CSV, and optionally the [`ForecastReport`](crate::types::ForecastReport)
//! to JSON.

mod writer;

pub use writer::{
    INTERCEPT_FEATURE, OutputWriter, coefficients_frame, metrics_frame, predictions_frame,
    write_report_json,
};
