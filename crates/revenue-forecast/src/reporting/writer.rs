use crate::error::{ForecastError, Result};
use crate::metrics::MetricsSummary;
use crate::schema::{
    ACTUAL_REVENUE, CategoricalColumn, DATE, NumericColumn, OUTPUT_DATE_FORMAT, PREDICTED_REVENUE,
};
use crate::types::{FeatureCoefficient, ForecastReport, OutputPaths, PredictionRecord};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Feature name used for the intercept row of the coefficients table.
pub const INTERCEPT_FEATURE: &str = "intercept";

/// Writes the three CSV outputs of a run.
///
/// Files are first written next to their destination with a `.tmp` suffix
/// and renamed into place only after all three were written, so a failed run
/// never leaves a fresh predictions file beside a stale summary.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    paths: OutputPaths,
}

impl OutputWriter {
    pub fn new(paths: OutputPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    pub fn write_all(
        &self,
        predictions: &[PredictionRecord],
        coefficients: &[FeatureCoefficient],
        intercept: f64,
        metrics: &MetricsSummary,
    ) -> Result<OutputPaths> {
        let mut frames = [
            (&self.paths.predictions, predictions_frame(predictions)?),
            (
                &self.paths.coefficients,
                coefficients_frame(coefficients, intercept)?,
            ),
            (&self.paths.metrics, metrics_frame(metrics)?),
        ];

        let mut staged: Vec<(PathBuf, &PathBuf)> = Vec::with_capacity(frames.len());
        for (target, df) in frames.iter_mut() {
            let staging = staging_path(target.as_path());
            if let Err(e) = write_csv(&staging, df) {
                discard(&staged);
                discard_one(&staging);
                return Err(ForecastError::OutputFailed {
                    path: target.to_path_buf(),
                    reason: e.to_string(),
                });
            }
            staged.push((staging, *target));
        }

        for (idx, (staging, target)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(staging, target) {
                discard(&staged[idx..]);
                return Err(ForecastError::OutputFailed {
                    path: target.to_path_buf(),
                    reason: e.to_string(),
                });
            }
            info!("Saved: {}", target.display());
        }

        Ok(self.paths.clone())
    }
}

/// Write the run report as pretty-printed JSON.
pub fn write_report_json(report: &ForecastReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;
    info!("Report saved: {}", path.display());
    Ok(())
}

/// Predictions table: date first, then the original features, then the
/// actual and predicted revenue.
pub fn predictions_frame(predictions: &[PredictionRecord]) -> Result<DataFrame> {
    let mut columns: Vec<Column> =
        Vec::with_capacity(3 + CategoricalColumn::ALL.len() + NumericColumn::ALL.len());

    let dates: Vec<String> = predictions
        .iter()
        .map(|p| p.record.date.format(OUTPUT_DATE_FORMAT).to_string())
        .collect();
    columns.push(Column::new(DATE.into(), dates));

    for column in CategoricalColumn::ALL {
        let values: Vec<&str> = predictions
            .iter()
            .map(|p| p.record.categorical(column))
            .collect();
        columns.push(Column::new(column.name().into(), values));
    }
    for column in NumericColumn::ALL {
        let values: Vec<f64> = predictions.iter().map(|p| p.record.numeric(column)).collect();
        columns.push(Column::new(column.name().into(), values));
    }

    let actual: Vec<f64> = predictions.iter().map(|p| p.actual_revenue()).collect();
    let predicted: Vec<f64> = predictions.iter().map(|p| p.predicted_revenue).collect();
    columns.push(Column::new(ACTUAL_REVENUE.into(), actual));
    columns.push(Column::new(PREDICTED_REVENUE.into(), predicted));

    Ok(DataFrame::new(columns)?)
}

/// Coefficients table: one row per encoded feature, then the intercept.
pub fn coefficients_frame(coefficients: &[FeatureCoefficient], intercept: f64) -> Result<DataFrame> {
    let mut features: Vec<&str> = coefficients.iter().map(|c| c.feature.as_str()).collect();
    let mut weights: Vec<f64> = coefficients.iter().map(|c| c.coefficient).collect();
    features.push(INTERCEPT_FEATURE);
    weights.push(intercept);

    Ok(DataFrame::new(vec![
        Column::new("feature".into(), features),
        Column::new("coefficient".into(), weights),
    ])?)
}

/// Performance summary table tagged by `group_type` / `group_value`.
pub fn metrics_frame(metrics: &MetricsSummary) -> Result<DataFrame> {
    let rows = metrics.rows();
    let group_types: Vec<&str> = rows.iter().map(|r| r.group_type.as_str()).collect();
    let group_values: Vec<&str> = rows.iter().map(|r| r.group_value.as_str()).collect();
    let row_counts: Vec<u64> = rows.iter().map(|r| r.row_count as u64).collect();
    let mae: Vec<f64> = rows.iter().map(|r| r.mae).collect();
    let r2: Vec<f64> = rows.iter().map(|r| r.r2_score).collect();

    Ok(DataFrame::new(vec![
        Column::new("group_type".into(), group_types),
        Column::new("group_value".into(), group_values),
        Column::new("row_count".into(), row_counts),
        Column::new("mae".into(), mae),
        Column::new("r2_score".into(), r2),
    ])?)
}

fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)?;

    debug!("Staged {} rows to {}", df.height(), path.display());
    Ok(())
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

fn discard(staged: &[(PathBuf, &PathBuf)]) {
    for (staging, _) in staged {
        discard_one(staging);
    }
}

fn discard_one(staging: &Path) {
    if staging.exists()
        && let Err(e) = fs::remove_file(staging)
    {
        warn!("Could not remove staged file {}: {}", staging.display(), e);
    }
}
