//! Configuration for a forecasting run.
//!
//! A run is fully described by a [`ForecastConfig`]: where to read the
//! dataset, where to write the three CSV outputs, how to split, and which
//! categorical columns get their own rows in the performance summary.

use crate::schema::CategoricalColumn;
use crate::types::OutputPaths;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_INPUT_PATH: &str = "data/raw/sales_forecasting_dataset.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "data/processed";
pub const DEFAULT_PREDICTIONS_FILE: &str = "revenue_predictions.csv";
pub const DEFAULT_COEFFICIENTS_FILE: &str = "feature_coefficients.csv";
pub const DEFAULT_METRICS_FILE: &str = "model_performance_summary.csv";
pub const REPORT_FILE: &str = "forecast_report.json";
pub const DEFAULT_TEST_RATIO: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;

/// Configuration for the forecasting pipeline.
///
/// Use [`ForecastConfig::builder()`] for a validated configuration. Missing
/// fields fall back to their defaults when deserializing, so a JSON config
/// file only needs the values it overrides.
///
/// # Example
///
/// ```rust,ignore
/// use revenue_forecast::ForecastConfig;
///
/// let config = ForecastConfig::builder()
///     .input_path("data/raw/q3_sales.csv")
///     .output_dir("dashboards/q3")
///     .test_ratio(0.25)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Sales dataset to read.
    /// Default: "data/raw/sales_forecasting_dataset.csv"
    pub input_path: PathBuf,

    /// Directory receiving all output files. Created if absent.
    /// Default: "data/processed"
    pub output_dir: PathBuf,

    /// File name of the predictions table.
    pub predictions_file: String,

    /// File name of the coefficients table.
    pub coefficients_file: String,

    /// File name of the performance summary table.
    pub metrics_file: String,

    /// Fraction of rows held out for evaluation, strictly between 0 and 1.
    /// Default: 0.2
    pub test_ratio: f64,

    /// Seed for the train/test shuffle.
    /// Default: 42
    pub seed: u64,

    /// Categorical columns that get per-value rows in the performance summary.
    /// Default: region, segment
    pub group_columns: Vec<CategoricalColumn>,

    /// Also write `forecast_report.json` next to the CSV outputs.
    /// Default: false
    pub emit_report: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            predictions_file: DEFAULT_PREDICTIONS_FILE.to_string(),
            coefficients_file: DEFAULT_COEFFICIENTS_FILE.to_string(),
            metrics_file: DEFAULT_METRICS_FILE.to_string(),
            test_ratio: DEFAULT_TEST_RATIO,
            seed: DEFAULT_SEED,
            group_columns: vec![CategoricalColumn::Region, CategoricalColumn::Segment],
            emit_report: false,
        }
    }
}

impl ForecastConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ForecastConfigBuilder {
        ForecastConfigBuilder::default()
    }

    /// Read a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ForecastConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(ConfigValidationError::InvalidTestRatio(self.test_ratio));
        }

        let files = [
            ("predictions_file", &self.predictions_file),
            ("coefficients_file", &self.coefficients_file),
            ("metrics_file", &self.metrics_file),
        ];

        let mut seen = HashSet::new();
        for (field, name) in files {
            if name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyFileName(field.to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigValidationError::DuplicateFileName(name.clone()));
            }
        }
        if seen.contains(REPORT_FILE) {
            return Err(ConfigValidationError::DuplicateFileName(REPORT_FILE.to_string()));
        }

        let mut groups = HashSet::new();
        for column in &self.group_columns {
            if !groups.insert(column) {
                return Err(ConfigValidationError::DuplicateGroupColumn(*column));
            }
        }

        Ok(())
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.output_dir.join(&self.predictions_file)
    }

    pub fn coefficients_path(&self) -> PathBuf {
        self.output_dir.join(&self.coefficients_file)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.output_dir.join(&self.metrics_file)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }

    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths {
            predictions: self.predictions_path(),
            coefficients: self.coefficients_path(),
            metrics: self.metrics_path(),
        }
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid test ratio: {0} (must be strictly between 0.0 and 1.0)")]
    InvalidTestRatio(f64),

    #[error("Output file name for '{0}' must not be empty")]
    EmptyFileName(String),

    #[error("Output file name '{0}' is used more than once")]
    DuplicateFileName(String),

    #[error("Group column '{0}' is listed more than once")]
    DuplicateGroupColumn(CategoricalColumn),
}

/// Builder for [`ForecastConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ForecastConfigBuilder {
    input_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    predictions_file: Option<String>,
    coefficients_file: Option<String>,
    metrics_file: Option<String>,
    test_ratio: Option<f64>,
    seed: Option<u64>,
    group_columns: Option<Vec<CategoricalColumn>>,
    emit_report: Option<bool>,
}

impl ForecastConfigBuilder {
    /// Set the dataset to read.
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    /// Set the directory receiving the output files.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    pub fn predictions_file(mut self, name: impl Into<String>) -> Self {
        self.predictions_file = Some(name.into());
        self
    }

    pub fn coefficients_file(mut self, name: impl Into<String>) -> Self {
        self.coefficients_file = Some(name.into());
        self
    }

    pub fn metrics_file(mut self, name: impl Into<String>) -> Self {
        self.metrics_file = Some(name.into());
        self
    }

    /// Set the held-out fraction.
    ///
    /// # Arguments
    /// * `ratio` - Value strictly between 0.0 and 1.0 (e.g., 0.2 = 20% test rows)
    pub fn test_ratio(mut self, ratio: f64) -> Self {
        self.test_ratio = Some(ratio);
        self
    }

    /// Set the shuffle seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the categorical columns reported per value in the summary.
    pub fn group_columns(mut self, columns: impl IntoIterator<Item = CategoricalColumn>) -> Self {
        self.group_columns = Some(columns.into_iter().collect());
        self
    }

    /// Enable or disable writing the JSON run report.
    pub fn emit_report(mut self, emit: bool) -> Self {
        self.emit_report = Some(emit);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ForecastConfig` or an error if validation fails.
    pub fn build(self) -> Result<ForecastConfig, ConfigValidationError> {
        let defaults = ForecastConfig::default();
        let config = ForecastConfig {
            input_path: self.input_path.unwrap_or(defaults.input_path),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            predictions_file: self.predictions_file.unwrap_or(defaults.predictions_file),
            coefficients_file: self.coefficients_file.unwrap_or(defaults.coefficients_file),
            metrics_file: self.metrics_file.unwrap_or(defaults.metrics_file),
            test_ratio: self.test_ratio.unwrap_or(defaults.test_ratio),
            seed: self.seed.unwrap_or(defaults.seed),
            group_columns: self.group_columns.unwrap_or(defaults.group_columns),
            emit_report: self.emit_report.unwrap_or(defaults.emit_report),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ForecastConfig::default();
        assert_eq!(config.test_ratio, 0.2);
        assert_eq!(config.seed, 42);
        assert_eq!(
            config.input_path,
            PathBuf::from("data/raw/sales_forecasting_dataset.csv")
        );
        assert_eq!(
            config.group_columns,
            vec![CategoricalColumn::Region, CategoricalColumn::Segment]
        );
        assert!(!config.emit_report);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ForecastConfig::builder()
            .input_path("in.csv")
            .output_dir("out")
            .test_ratio(0.25)
            .seed(7)
            .group_columns([CategoricalColumn::ProductCategory])
            .build()
            .unwrap();

        assert_eq!(config.input_path, PathBuf::from("in.csv"));
        assert_eq!(config.test_ratio, 0.25);
        assert_eq!(config.seed, 7);
        assert_eq!(config.group_columns, vec![CategoricalColumn::ProductCategory]);
        assert_eq!(
            config.predictions_path(),
            PathBuf::from("out").join("revenue_predictions.csv")
        );
        assert_eq!(
            config.metrics_path(),
            PathBuf::from("out").join("model_performance_summary.csv")
        );
    }

    #[test]
    fn test_validation_invalid_test_ratio() {
        for ratio in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let result = ForecastConfig::builder().test_ratio(ratio).build();
            assert!(
                matches!(result, Err(ConfigValidationError::InvalidTestRatio(_))),
                "ratio {} should be rejected",
                ratio
            );
        }
    }

    #[test]
    fn test_validation_duplicate_file_names() {
        let result = ForecastConfig::builder()
            .predictions_file("out.csv")
            .metrics_file("out.csv")
            .build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::DuplicateFileName(name)) if name == "out.csv"
        ));

        let result = ForecastConfig::builder().coefficients_file("  ").build();
        assert!(matches!(result, Err(ConfigValidationError::EmptyFileName(_))));
    }

    #[test]
    fn test_validation_duplicate_group_column() {
        let result = ForecastConfig::builder()
            .group_columns([CategoricalColumn::Region, CategoricalColumn::Region])
            .build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::DuplicateGroupColumn(CategoricalColumn::Region))
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "output_dir": "bi_exports",
            "test_ratio": 0.3,
            "group_columns": ["segment", "product_category"]
        }"#;

        let config: ForecastConfig = serde_json::from_str(json).expect("partial config");

        assert_eq!(config.output_dir, PathBuf::from("bi_exports"));
        assert_eq!(config.test_ratio, 0.3);
        assert_eq!(config.seed, DEFAULT_SEED);
        assert_eq!(config.predictions_file, DEFAULT_PREDICTIONS_FILE);
        assert_eq!(
            config.group_columns,
            vec![CategoricalColumn::Segment, CategoricalColumn::ProductCategory]
        );
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ForecastConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ForecastConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
