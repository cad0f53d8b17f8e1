use crate::schema::{CategoricalColumn, NumericColumn};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One row of the sales dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub region: String,
    pub segment: String,
    pub product_category: String,
    pub units_sold: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub revenue: f64,
}

impl SalesRecord {
    pub fn categorical(&self, column: CategoricalColumn) -> &str {
        match column {
            CategoricalColumn::Region => &self.region,
            CategoricalColumn::Segment => &self.segment,
            CategoricalColumn::ProductCategory => &self.product_category,
        }
    }

    pub fn numeric(&self, column: NumericColumn) -> f64 {
        match column {
            NumericColumn::UnitsSold => self.units_sold,
            NumericColumn::UnitPrice => self.unit_price,
            NumericColumn::DiscountPercent => self.discount_percent,
        }
    }
}

/// A held-out row with the model's prediction attached.
///
/// The record keeps its original `revenue`, which is the actual value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub record: SalesRecord,
    pub predicted_revenue: f64,
}

impl PredictionRecord {
    pub fn new(record: SalesRecord, predicted_revenue: f64) -> Self {
        Self {
            record,
            predicted_revenue,
        }
    }

    pub fn actual_revenue(&self) -> f64 {
        self.record.revenue
    }

    /// This row's contribution to the mean absolute error.
    pub fn absolute_error(&self) -> f64 {
        crate::metrics::absolute_error(self.actual_revenue(), self.predicted_revenue)
    }
}

/// A learned weight for one encoded feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCoefficient {
    pub feature: String,
    pub coefficient: f64,
}

/// Which slice of the test set a metrics row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    Global,
    Region,
    Segment,
    ProductCategory,
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Region => "region",
            Self::Segment => "segment",
            Self::ProductCategory => "product_category",
        }
    }
}

impl From<CategoricalColumn> for GroupType {
    fn from(column: CategoricalColumn) -> Self {
        match column {
            CategoricalColumn::Region => Self::Region,
            CategoricalColumn::Segment => Self::Segment,
            CategoricalColumn::ProductCategory => Self::ProductCategory,
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the performance summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMetrics {
    pub group_type: GroupType,
    pub group_value: String,
    pub row_count: usize,
    #[serde(deserialize_with = "f64_or_nan")]
    pub mae: f64,
    /// NaN for groups with fewer than two rows
    #[serde(deserialize_with = "f64_or_nan")]
    pub r2_score: f64,
}

/// JSON has no NaN: serde_json writes it as `null`, so read `null` back as NaN.
fn f64_or_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Where a run wrote its three CSV outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    pub predictions: PathBuf,
    pub coefficients: PathBuf,
    pub metrics: PathBuf,
}

/// Serializable summary of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    /// Local timestamp when the run finished
    pub generated_at: String,
    pub input_file: PathBuf,
    pub total_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_ratio: f64,
    pub seed: u64,
    /// Global mean absolute error on the test set
    #[serde(deserialize_with = "f64_or_nan")]
    pub mae: f64,
    /// Global R² on the test set
    #[serde(deserialize_with = "f64_or_nan")]
    pub r2_score: f64,
    pub intercept: f64,
    pub coefficients: Vec<FeatureCoefficient>,
    pub metrics: Vec<GroupMetrics>,
    pub outputs: OutputPaths,
    pub duration_ms: u64,
    /// Non-fatal observations, e.g. test categories unseen during training
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
