//! Evaluation of held-out predictions.
//!
//! [`scores`] holds the plain MAE / R² functions; [`summary`] applies them to
//! the whole test set and to each category value of the grouping columns.

pub mod scores;
pub mod summary;

pub use scores::{absolute_error, mean_absolute_error, r2_score};
pub use summary::{GLOBAL_GROUP_VALUE, MetricsSummary, evaluate};
