//! Revenue Forecasting Library
//!
//! Fits an ordinary-least-squares model of revenue on tabular sales data and
//! exports BI-ready CSV tables.
//!
//! # Overview
//!
//! A run reads one sales CSV and goes through these steps:
//!
//! - **Loading**: Header normalization, schema checks and per-cell parsing
//! - **Splitting**: Seeded 80/20 (configurable) train/test partition
//! - **Encoding**: One-hot encoding with the first level of each category dropped
//! - **Training**: OLS with an intercept, tolerant of collinear features
//! - **Evaluation**: MAE and R² on the test set, globally and per group
//! - **Output**: Predictions, coefficients and a performance summary as CSV
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use revenue_forecast::{ForecastConfig, ForecastPipeline};
//!
//! let config = ForecastConfig::builder()
//!     .input_path("data/raw/sales_forecasting_dataset.csv")
//!     .output_dir("data/processed")
//!     .seed(42)
//!     .build()?;
//!
//! let report = ForecastPipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! println!("MAE: {:.2}", report.mae);
//! println!("R² Score: {:.2}", report.r2_score);
//! ```
//!
//! # In-memory use
//!
//! [`ForecastPipeline::train_and_evaluate`] runs everything after loading
//! without touching the filesystem:
//!
//! ```rust,ignore
//! use revenue_forecast::{ForecastPipeline, load_sales_csv};
//!
//! let records = load_sales_csv("sales.csv")?;
//! let outcome = ForecastPipeline::builder().build()?.train_and_evaluate(&records)?;
//! for c in outcome.coefficients() {
//!     println!("{:<40} {:>12.4}", c.feature, c.coefficient);
//! }
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod reporting;
pub mod schema;
pub mod split;
pub mod types;

// Re-exports for convenient access
pub use config::{ConfigValidationError, ForecastConfig, ForecastConfigBuilder};
pub use error::{ForecastError, Result as ForecastResult, ResultExt};
pub use loader::{detect_date_format, load_sales_csv, parse_date, records_from_dataframe};
pub use metrics::{MetricsSummary, evaluate, mean_absolute_error, r2_score};
pub use model::LinearRegression;
pub use pipeline::{
    ClosureProgressReporter, ForecastOutcome, ForecastPipeline, ForecastPipelineBuilder,
    ForecastStage, ProgressReporter, ProgressUpdate, run_forecast,
};
pub use preprocess::{ColumnEncoding, OneHotEncoder};
pub use reporting::OutputWriter;
pub use schema::{CategoricalColumn, NumericColumn};
pub use split::{SplitIndices, train_test_split};
pub use types::{
    FeatureCoefficient, ForecastReport, GroupMetrics, GroupType, OutputPaths, PredictionRecord,
    SalesRecord,
};
