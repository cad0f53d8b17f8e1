//! One-hot encoding of categorical columns with a dropped reference level.

use crate::error::{ForecastError, Result};
use crate::schema::{CategoricalColumn, NumericColumn};
use crate::types::SalesRecord;
use ndarray::Array2;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Learned levels of one categorical column.
///
/// Levels are sorted; the first is the reference category and has no
/// indicator column, so a column with k levels contributes k-1 features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnEncoding {
    column: CategoricalColumn,
    levels: Vec<String>,
}

impl ColumnEncoding {
    pub fn column(&self) -> CategoricalColumn {
        self.column
    }

    /// All learned levels, reference first.
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn reference(&self) -> Option<&str> {
        self.levels.first().map(String::as_str)
    }

    /// Levels that get an indicator column.
    pub fn encoded_levels(&self) -> &[String] {
        self.levels.get(1..).unwrap_or_default()
    }

    pub fn width(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Offset of `value` among the indicator columns, `None` for the
    /// reference level and for values never seen during fitting.
    fn indicator_offset(&self, value: &str) -> Option<usize> {
        match self.levels.binary_search_by(|level| level.as_str().cmp(value)) {
            Ok(0) | Err(_) => None,
            Ok(pos) => Some(pos - 1),
        }
    }

    fn contains(&self, value: &str) -> bool {
        self.levels
            .binary_search_by(|level| level.as_str().cmp(value))
            .is_ok()
    }
}

/// Encodes sales records into the model's design matrix.
///
/// Output columns are the indicators of each categorical column (in
/// [`CategoricalColumn::ALL`] order), followed by the numeric columns passed
/// through unchanged. The encoder is fit once on the training rows and then
/// reused as-is for the test rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneHotEncoder {
    encodings: Vec<ColumnEncoding>,
    feature_names: Vec<String>,
}

impl OneHotEncoder {
    /// Learn the category levels of every categorical column.
    pub fn fit(records: &[SalesRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(ForecastError::InsufficientData(
                "cannot fit an encoder on zero rows".to_string(),
            ));
        }

        let encodings: Vec<ColumnEncoding> = CategoricalColumn::ALL
            .into_iter()
            .map(|column| {
                let levels: BTreeSet<&str> =
                    records.iter().map(|r| r.categorical(column)).collect();
                ColumnEncoding {
                    column,
                    levels: levels.into_iter().map(str::to_string).collect(),
                }
            })
            .collect();

        let mut feature_names = Vec::new();
        for encoding in &encodings {
            debug!(
                "Encoding '{}': {} levels, reference '{}'",
                encoding.column,
                encoding.levels.len(),
                encoding.reference().unwrap_or_default()
            );
            for level in encoding.encoded_levels() {
                feature_names.push(format!("cat__{}_{}", encoding.column, level));
            }
        }
        for column in NumericColumn::ALL {
            feature_names.push(format!("remainder__{}", column));
        }

        Ok(Self {
            encodings,
            feature_names,
        })
    }

    pub fn encodings(&self) -> &[ColumnEncoding] {
        &self.encodings
    }

    pub fn encoding(&self, column: CategoricalColumn) -> Option<&ColumnEncoding> {
        self.encodings.iter().find(|e| e.column == column)
    }

    /// Names of the output columns, in matrix order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Encode `records` into an `(n_rows, n_features)` matrix.
    ///
    /// Values unseen during fitting encode like the reference level (all
    /// indicators zero).
    pub fn transform(&self, records: &[SalesRecord]) -> Array2<f64> {
        let mut matrix = Array2::<f64>::zeros((records.len(), self.n_features()));

        for (row, record) in records.iter().enumerate() {
            let mut offset = 0;
            for encoding in &self.encodings {
                if let Some(pos) = encoding.indicator_offset(record.categorical(encoding.column)) {
                    matrix[[row, offset + pos]] = 1.0;
                }
                offset += encoding.width();
            }
            for column in NumericColumn::ALL {
                matrix[[row, offset]] = record.numeric(column);
                offset += 1;
            }
        }

        let unseen = self.unseen_values(records);
        for (column, value) in &unseen {
            warn!(
                "Category '{}' in column '{}' was not seen during training; encoded as reference",
                value, column
            );
        }

        matrix
    }

    /// Distinct `(column, value)` pairs in `records` absent from training.
    pub fn unseen_values(&self, records: &[SalesRecord]) -> Vec<(CategoricalColumn, String)> {
        let mut unseen = BTreeSet::new();
        for record in records {
            for encoding in &self.encodings {
                let value = record.categorical(encoding.column);
                if !encoding.contains(value) {
                    unseen.insert((encoding.column, value.to_string()));
                }
            }
        }
        unseen.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn record(region: &str, segment: &str, category: &str, units: f64) -> SalesRecord {
        SalesRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            region: region.to_string(),
            segment: segment.to_string(),
            product_category: category.to_string(),
            units_sold: units,
            unit_price: 10.0,
            discount_percent: 5.0,
            revenue: units * 9.5,
        }
    }

    fn training_rows() -> Vec<SalesRecord> {
        vec![
            record("South", "Retail", "Toys", 1.0),
            record("North", "Wholesale", "Toys", 2.0),
            record("East", "Retail", "Garden", 3.0),
            record("West", "Online", "Toys", 4.0),
        ]
    }

    #[test]
    fn test_k_levels_yield_k_minus_one_columns() {
        let encoder = OneHotEncoder::fit(&training_rows()).unwrap();

        let widths: Vec<usize> = encoder.encodings().iter().map(|e| e.width()).collect();
        assert_eq!(widths, vec![3, 2, 1]);
        assert_eq!(encoder.n_features(), 3 + 2 + 1 + 3);
    }

    #[test]
    fn test_empty_encoding_has_no_indicators() {
        let encoding = ColumnEncoding {
            column: CategoricalColumn::Segment,
            levels: Vec::new(),
        };

        assert_eq!(encoding.reference(), None);
        assert_eq!(encoding.width(), 0);
        assert!(encoding.encoded_levels().is_empty());
        assert_eq!(encoding.indicator_offset("Retail"), None);
    }

    #[test]
    fn test_feature_names_and_reference() {
        let encoder = OneHotEncoder::fit(&training_rows()).unwrap();

        assert_eq!(
            encoder.encoding(CategoricalColumn::Region).unwrap().reference(),
            Some("East")
        );
        assert_eq!(
            encoder.feature_names(),
            &[
                "cat__region_North",
                "cat__region_South",
                "cat__region_West",
                "cat__segment_Retail",
                "cat__segment_Wholesale",
                "cat__product_category_Toys",
                "remainder__units_sold",
                "remainder__unit_price",
                "remainder__discount_percent",
            ]
        );
    }

    #[test]
    fn test_transform_rows() {
        let rows = training_rows();
        let encoder = OneHotEncoder::fit(&rows).unwrap();
        let matrix = encoder.transform(&rows);

        assert_eq!(matrix.dim(), (4, 9));
        // South / Retail / Toys
        assert_eq!(
            matrix.row(0).to_vec(),
            vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 10.0, 5.0]
        );
        // East / Retail / Garden: only the segment indicator is set
        assert_eq!(
            matrix.row(2).to_vec(),
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 3.0, 10.0, 5.0]
        );
    }

    #[test]
    fn test_unseen_category_encodes_as_reference() {
        let encoder = OneHotEncoder::fit(&training_rows()).unwrap();
        let test_rows = vec![record("Central", "Retail", "Toys", 5.0)];

        let matrix = encoder.transform(&test_rows);
        assert_eq!(matrix.row(0).slice(ndarray::s![0..3]).sum(), 0.0);
        assert_eq!(
            encoder.unseen_values(&test_rows),
            vec![(CategoricalColumn::Region, "Central".to_string())]
        );
    }

    #[test]
    fn test_fit_is_not_affected_by_transform_input() {
        let rows = training_rows();
        let encoder = OneHotEncoder::fit(&rows).unwrap();
        let before = encoder.clone();
        let _ = encoder.transform(&[record("Central", "Direct", "Books", 1.0)]);
        assert_eq!(encoder, before);
    }

    #[test]
    fn test_fit_empty() {
        assert!(OneHotEncoder::fit(&[]).is_err());
    }
}
