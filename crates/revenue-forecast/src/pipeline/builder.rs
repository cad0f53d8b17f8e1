//! The forecasting pipeline and its builder.

use crate::config::{ConfigValidationError, ForecastConfig};
use crate::error::{Result, ResultExt};
use crate::loader::load_sales_csv;
use crate::metrics::{MetricsSummary, evaluate};
use crate::model::LinearRegression;
use crate::pipeline::progress::{
    ClosureProgressReporter, ForecastStage, ProgressReporter, ProgressUpdate,
};
use crate::preprocess::OneHotEncoder;
use crate::reporting::{OutputWriter, write_report_json};
use crate::split::{SplitIndices, train_test_split};
use crate::types::{FeatureCoefficient, ForecastReport, PredictionRecord, SalesRecord};
use chrono::Local;
use ndarray::Array1;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Everything a run produces before anything is written to disk.
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    pub split: SplitIndices,
    pub encoder: OneHotEncoder,
    pub model: LinearRegression,
    pub predictions: Vec<PredictionRecord>,
    pub metrics: MetricsSummary,
    pub warnings: Vec<String>,
}

impl ForecastOutcome {
    /// Learned weights paired with their encoded feature names.
    pub fn coefficients(&self) -> Vec<FeatureCoefficient> {
        let Some(weights) = self.model.coefficients() else {
            return Vec::new();
        };
        self.encoder
            .feature_names()
            .iter()
            .zip(weights.iter())
            .map(|(feature, &coefficient)| FeatureCoefficient {
                feature: feature.clone(),
                coefficient,
            })
            .collect()
    }
}

/// Load → split → encode → fit → predict → evaluate → write.
///
/// Use [`ForecastPipeline::builder()`] to create a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use revenue_forecast::{ForecastConfig, ForecastPipeline};
///
/// let report = ForecastPipeline::builder()
///     .config(ForecastConfig::builder().output_dir("exports").build()?)
///     .build()?
///     .run()?;
///
/// println!("MAE: {:.2}", report.mae);
/// ```
pub struct ForecastPipeline {
    config: ForecastConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(ForecastPipeline: Send);

impl ForecastPipeline {
    pub fn builder() -> ForecastPipelineBuilder {
        ForecastPipelineBuilder::default()
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Execute a full run and write all outputs.
    ///
    /// # Errors
    ///
    /// Any failure before the CSV outputs are in place aborts the run, and
    /// none of the output files from this run should be considered valid.
    /// The optional JSON report is written last; failing to write it is
    /// logged and recorded in [`ForecastReport::warnings`] instead.
    pub fn run(&self) -> Result<ForecastReport> {
        match self.run_internal() {
            Ok(report) => {
                self.report_progress(ProgressUpdate::complete("Forecast completed successfully"));
                Ok(report)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Forecast failed: {}", e);
                Err(e)
            }
        }
    }

    /// Split, encode, fit and score `records` without touching the filesystem.
    pub fn train_and_evaluate(&self, records: &[SalesRecord]) -> Result<ForecastOutcome> {
        self.report_progress(ProgressUpdate::new(
            ForecastStage::Splitting,
            0.0,
            "Splitting train/test sets...",
        ));
        let split = train_test_split(records.len(), self.config.test_ratio, self.config.seed)?;
        let (train, test) = split.apply(records);
        info!("Train rows: {}, test rows: {}", train.len(), test.len());

        self.report_progress(ProgressUpdate::new(
            ForecastStage::Encoding,
            0.0,
            "Encoding categorical features...",
        ));
        let encoder = OneHotEncoder::fit(&train)?;
        let x_train = encoder.transform(&train);
        let x_test = encoder.transform(&test);

        let warnings: Vec<String> = encoder
            .unseen_values(&test)
            .into_iter()
            .map(|(column, value)| {
                format!(
                    "Test value '{}' in column '{}' was not present in training data",
                    value, column
                )
            })
            .collect();

        self.report_progress(ProgressUpdate::new(
            ForecastStage::Training,
            0.0,
            format!("Fitting regression on {} features...", encoder.n_features()),
        ));
        let y_train: Array1<f64> = train.iter().map(|r| r.revenue).collect();
        let mut model = LinearRegression::new();
        model.fit(&x_train, &y_train).context("While fitting the regression")?;

        self.report_progress(ProgressUpdate::new(
            ForecastStage::Evaluating,
            0.0,
            "Scoring held-out rows...",
        ));
        let predicted = model.predict(&x_test)?;
        let predictions: Vec<PredictionRecord> = test
            .into_iter()
            .zip(predicted.iter())
            .map(|(record, &value)| PredictionRecord::new(record, value))
            .collect();
        let metrics = evaluate(&predictions, &self.config.group_columns)?;

        Ok(ForecastOutcome {
            split,
            encoder,
            model,
            predictions,
            metrics,
            warnings,
        })
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self) -> Result<ForecastReport> {
        let start_time = Instant::now();
        info!("Starting revenue forecast...");

        self.report_progress(ProgressUpdate::new(
            ForecastStage::Loading,
            0.0,
            format!("Loading {}", self.config.input_path.display()),
        ));
        let records =
            load_sales_csv(&self.config.input_path).context("While loading sales data")?;

        let outcome = self.train_and_evaluate(&records)?;
        let global = outcome.metrics.global().clone();
        info!("MAE: {:.2}, R²: {:.2}", global.mae, global.r2_score);

        self.report_progress(ProgressUpdate::new(
            ForecastStage::Writing,
            0.0,
            "Writing output files...",
        ));
        let coefficients = outcome.coefficients();
        let outputs = OutputWriter::new(self.config.output_paths()).write_all(
            &outcome.predictions,
            &coefficients,
            outcome.model.intercept(),
            &outcome.metrics,
        )?;

        let mut report = ForecastReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: self.config.input_path.clone(),
            total_rows: records.len(),
            train_rows: outcome.split.train.len(),
            test_rows: outcome.split.test.len(),
            test_ratio: self.config.test_ratio,
            seed: self.config.seed,
            mae: global.mae,
            r2_score: global.r2_score,
            intercept: outcome.model.intercept(),
            coefficients,
            metrics: outcome.metrics.into_rows(),
            outputs,
            duration_ms: start_time.elapsed().as_millis() as u64,
            warnings: outcome.warnings,
        };

        if self.config.emit_report {
            let path = self.config.report_path();
            if let Err(e) = write_report_json(&report, &path) {
                warn!("Could not write report {}: {}", path.display(), e);
                report
                    .warnings
                    .push(format!("Report not written to {}: {}", path.display(), e));
            }
        }

        Ok(report)
    }
}

/// Builder for [`ForecastPipeline`].
#[derive(Default)]
pub struct ForecastPipelineBuilder {
    config: Option<ForecastConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(ForecastPipelineBuilder: Send);

impl ForecastPipelineBuilder {
    pub fn config(mut self, config: ForecastConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline, validating the configuration.
    pub fn build(self) -> std::result::Result<ForecastPipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(ForecastPipeline {
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}

/// Run a forecast with `config` and no progress reporting.
pub fn run_forecast(config: ForecastConfig) -> Result<ForecastReport> {
    ForecastPipeline::builder().config(config).build()?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CategoricalColumn;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn synthetic_records(n: usize) -> Vec<SalesRecord> {
        let regions = ["North", "South", "East", "West"];
        let segments = ["Retail", "Online", "Wholesale"];
        let categories = ["Toys", "Garden", "Electronics"];
        (0..n)
            .map(|i| {
                let units = (i % 17 + 1) as f64;
                let price = 5.0 + (i % 7) as f64 * 2.5;
                let discount = (i % 4) as f64 * 5.0;
                let region_bonus = (i % 4) as f64 * 3.0;
                SalesRecord {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                        + chrono::Days::new(i as u64),
                    region: regions[i % 4].to_string(),
                    segment: segments[i % 3].to_string(),
                    product_category: categories[(i / 3) % 3].to_string(),
                    units_sold: units,
                    unit_price: price,
                    discount_percent: discount,
                    revenue: 10.0 + 4.0 * units + 2.0 * price - 0.5 * discount + region_bonus,
                }
            })
            .collect()
    }

    #[test]
    fn test_builder_default() {
        let pipeline = ForecastPipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().test_ratio, 0.2);
        assert!(pipeline.progress_reporter.is_none());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = ForecastConfig {
            test_ratio: 1.2,
            ..ForecastConfig::default()
        };
        assert!(ForecastPipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_train_and_evaluate_linear_data() {
        let records = synthetic_records(120);
        let pipeline = ForecastPipeline::builder().build().unwrap();

        let outcome = pipeline.train_and_evaluate(&records).unwrap();

        assert_eq!(outcome.split.train.len(), 96);
        assert_eq!(outcome.predictions.len(), 24);
        // Revenue is an exact linear function of the encoded features.
        assert!(outcome.metrics.global().mae < 1e-6);
        assert!((outcome.metrics.global().r2_score - 1.0).abs() < 1e-9);

        let coefficients = outcome.coefficients();
        assert_eq!(coefficients.len(), outcome.encoder.n_features());
        let units = coefficients
            .iter()
            .find(|c| c.feature == "remainder__units_sold")
            .unwrap();
        assert!((units.coefficient - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_group_counts_match_test_rows() {
        let records = synthetic_records(60);
        let config = ForecastConfig::builder()
            .group_columns([CategoricalColumn::Region, CategoricalColumn::Segment])
            .build()
            .unwrap();
        let pipeline = ForecastPipeline::builder().config(config).build().unwrap();

        let outcome = pipeline.train_and_evaluate(&records).unwrap();
        let test_rows = outcome.predictions.len();

        for group_type in [crate::types::GroupType::Region, crate::types::GroupType::Segment] {
            let total: usize = outcome
                .metrics
                .rows_for(group_type)
                .map(|r| r.row_count)
                .sum();
            assert_eq!(total, test_rows);
        }
    }

    #[test]
    fn test_progress_reported_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();

        let pipeline = ForecastPipeline::builder()
            .on_progress(move |update| {
                stages_clone.lock().unwrap().push(update.stage);
            })
            .build()
            .unwrap();

        pipeline.train_and_evaluate(&synthetic_records(30)).unwrap();

        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                ForecastStage::Splitting,
                ForecastStage::Encoding,
                ForecastStage::Training,
                ForecastStage::Evaluating,
            ]
        );
    }

    #[test]
    fn test_report_failure_keeps_csv_outputs() {
        use std::io::Write;

        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("sales.csv");
        let mut file = std::fs::File::create(&input).unwrap();
        writeln!(
            file,
            "date,region,segment,product_category,units_sold,unit_price,discount_percent,revenue"
        )
        .unwrap();
        for r in synthetic_records(40) {
            writeln!(
                file,
                "{},{},{},{},{},{},{},{}",
                r.date,
                r.region,
                r.segment,
                r.product_category,
                r.units_sold,
                r.unit_price,
                r.discount_percent,
                r.revenue
            )
            .unwrap();
        }
        drop(file);

        let output_dir = dir.path().join("out");
        // A directory where the report file should go.
        std::fs::create_dir_all(output_dir.join(crate::config::REPORT_FILE)).unwrap();

        let config = ForecastConfig::builder()
            .input_path(&input)
            .output_dir(&output_dir)
            .emit_report(true)
            .build()
            .unwrap();
        let report = run_forecast(config).unwrap();

        assert!(report.outputs.predictions.exists());
        assert!(report.outputs.metrics.exists());
        assert!(report.warnings.iter().any(|w| w.starts_with("Report not written")));
    }

    #[test]
    fn test_run_missing_input_reports_failure() {
        let failed = Arc::new(Mutex::new(false));
        let failed_clone = failed.clone();
        let config = ForecastConfig::builder()
            .input_path("no/such/file.csv")
            .output_dir("no/such/output")
            .build()
            .unwrap();

        let result = ForecastPipeline::builder()
            .config(config)
            .on_progress(move |update| {
                if update.stage == ForecastStage::Failed {
                    *failed_clone.lock().unwrap() = true;
                }
            })
            .build()
            .unwrap()
            .run();

        let err = result.unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
        assert!(*failed.lock().unwrap());
    }
}
