//! Global and per-group performance summary.

use super::scores::{mean_absolute_error, r2_score};
use crate::error::{ForecastError, Result};
use crate::schema::CategoricalColumn;
use crate::types::{GroupMetrics, GroupType, PredictionRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Label used as `group_value` on the global row.
pub const GLOBAL_GROUP_VALUE: &str = "all";

/// Performance summary rows: the global row first, then one row per
/// distinct value of each grouping column, values sorted within a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    rows: Vec<GroupMetrics>,
}

impl MetricsSummary {
    pub fn rows(&self) -> &[GroupMetrics] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<GroupMetrics> {
        self.rows
    }

    pub fn global(&self) -> &GroupMetrics {
        &self.rows[0]
    }

    pub fn rows_for(&self, group_type: GroupType) -> impl Iterator<Item = &GroupMetrics> {
        self.rows.iter().filter(move |r| r.group_type == group_type)
    }
}

/// Score `predictions` globally and for every value of each of `group_columns`.
pub fn evaluate(
    predictions: &[PredictionRecord],
    group_columns: &[CategoricalColumn],
) -> Result<MetricsSummary> {
    if predictions.is_empty() {
        return Err(ForecastError::InsufficientData(
            "no predictions to evaluate".to_string(),
        ));
    }

    let mut rows = Vec::new();
    rows.push(score_group(
        GroupType::Global,
        GLOBAL_GROUP_VALUE,
        predictions.iter(),
    ));

    for &column in group_columns {
        let mut groups: BTreeMap<&str, Vec<&PredictionRecord>> = BTreeMap::new();
        for prediction in predictions {
            groups
                .entry(prediction.record.categorical(column))
                .or_default()
                .push(prediction);
        }

        debug!("Scoring {} groups for '{}'", groups.len(), column);
        for (value, members) in groups {
            rows.push(score_group(column.into(), value, members.into_iter()));
        }
    }

    Ok(MetricsSummary { rows })
}

fn score_group<'a>(
    group_type: GroupType,
    group_value: &str,
    members: impl Iterator<Item = &'a PredictionRecord>,
) -> GroupMetrics {
    let (actual, predicted): (Vec<f64>, Vec<f64>) = members
        .map(|p| (p.actual_revenue(), p.predicted_revenue))
        .unzip();

    GroupMetrics {
        group_type,
        group_value: group_value.to_string(),
        row_count: actual.len(),
        mae: mean_absolute_error(&actual, &predicted),
        r2_score: r2_score(&actual, &predicted),
    }
}
