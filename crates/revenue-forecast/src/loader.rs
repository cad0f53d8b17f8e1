//! Sales dataset loading.
//!
//! The CSV is read with every column as a string so that each cell can be
//! validated individually: a bad cell reports its column and row instead of
//! failing schema inference somewhere inside the reader.

use crate::error::{ForecastError, Result, ResultExt};
use crate::schema::{
    DATE_FORMATS, DAY_FIRST, MONTH_FIRST, REQUIRED_COLUMNS, normalize_column_name,
};
use crate::types::SalesRecord;
use chrono::NaiveDate;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Load and validate the sales dataset at `path`.
///
/// # Errors
///
/// - [`ForecastError::FileNotFound`] if the file does not exist
/// - [`ForecastError::SchemaMismatch`] if a canonical column is missing or
///   two headers normalize to the same name
/// - [`ForecastError::InvalidValue`] for empty or unparseable cells
pub fn load_sales_csv(path: impl AsRef<Path>) -> Result<Vec<SalesRecord>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ForecastError::FileNotFound(path.to_path_buf()));
    }

    info!("Loading sales data from: {}", path.display());

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Failed to open '{}'", path.display()))?
        .finish()
        .context(format!("Failed to parse '{}'", path.display()))?;

    debug!("Raw dataset shape: {:?}", df.shape());

    let records = records_from_dataframe(&df)?;
    info!("Loaded {} sales records", records.len());
    Ok(records)
}

/// Convert a raw DataFrame into typed sales records.
///
/// Headers are matched case-insensitively after normalization; columns
/// outside the canonical schema are ignored. Row numbers in errors are
/// 1-based and exclude the header line.
pub fn records_from_dataframe(df: &DataFrame) -> Result<Vec<SalesRecord>> {
    let columns = resolve_columns(df)?;

    let dates = string_values(df, &columns, "date")?;
    let regions = string_values(df, &columns, "region")?;
    let segments = string_values(df, &columns, "segment")?;
    let categories = string_values(df, &columns, "product_category")?;
    let units_sold = numeric_values(df, &columns, "units_sold")?;
    let unit_prices = numeric_values(df, &columns, "unit_price")?;
    let discounts = numeric_values(df, &columns, "discount_percent")?;
    let revenues = numeric_values(df, &columns, "revenue")?;

    let date_format = detect_date_format(&dates)?;
    debug!("Date column layout: {}", date_format);

    let mut records = Vec::with_capacity(df.height());
    for (idx, date) in dates.iter().enumerate() {
        records.push(SalesRecord {
            date: NaiveDate::parse_from_str(date, date_format).map_err(|_| {
                ForecastError::InvalidValue {
                    column: "date".to_string(),
                    row: idx + 1,
                    reason: format!("'{}' does not match the layout '{}'", date, date_format),
                }
            })?,
            region: regions[idx].clone(),
            segment: segments[idx].clone(),
            product_category: categories[idx].clone(),
            units_sold: units_sold[idx],
            unit_price: unit_prices[idx],
            discount_percent: discounts[idx],
            revenue: revenues[idx],
        });
    }

    Ok(records)
}

/// Parse a single date in the first accepted layout that fits.
///
/// Whole columns go through [`detect_date_format`] instead, so that every
/// cell of a file is read with the same day/month order.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Pick the one layout from [`DATE_FORMATS`] that parses every value.
///
/// # Errors
///
/// - [`ForecastError::SchemaMismatch`] when both day-first and month-first
///   slash layouts fit every value (e.g. only `01/02/2023`-style dates)
/// - [`ForecastError::InvalidValue`] for the first cell that the best
///   matching layout cannot parse
pub fn detect_date_format(values: &[String]) -> Result<&'static str> {
    if values.is_empty() {
        return Ok(DATE_FORMATS[0]);
    }

    let parses = |fmt: &str, value: &str| NaiveDate::parse_from_str(value, fmt).is_ok();

    let candidates: Vec<&'static str> = DATE_FORMATS
        .iter()
        .copied()
        .filter(|fmt| values.iter().all(|v| parses(fmt, v)))
        .collect();

    if candidates.contains(&DAY_FIRST) && candidates.contains(&MONTH_FIRST) {
        return Err(ForecastError::SchemaMismatch(format!(
            "date column is ambiguous: every value (e.g. '{}') reads as both '{}' and '{}'; use YYYY-MM-DD",
            values[0], DAY_FIRST, MONTH_FIRST
        )));
    }
    if let Some(&format) = candidates.first() {
        return Ok(format);
    }

    // No single layout fits: blame the first cell the closest layout rejects.
    let best = DATE_FORMATS
        .iter()
        .copied()
        .enumerate()
        .max_by_key(|&(pos, fmt)| {
            let hits = values.iter().filter(|v| parses(fmt, v)).count();
            (hits, std::cmp::Reverse(pos))
        })
        .map_or(DATE_FORMATS[0], |(_, fmt)| fmt);

    let (idx, value) = values
        .iter()
        .enumerate()
        .find(|(_, v)| !parses(best, v))
        .unwrap_or((0, &values[0]));

    let reason = if parse_date(value).is_some() {
        format!(
            "'{}' does not match the layout '{}' used by the rest of the column",
            value, best
        )
    } else {
        format!("'{}' is not a recognized date", value)
    };
    Err(ForecastError::InvalidValue {
        column: "date".to_string(),
        row: idx + 1,
        reason,
    })
}

/// Map each canonical column name to the header it was found under.
fn resolve_columns(df: &DataFrame) -> Result<HashMap<String, String>> {
    let mut resolved: HashMap<String, String> = HashMap::new();

    for name in df.get_column_names() {
        let normalized = normalize_column_name(name.as_str());
        if !REQUIRED_COLUMNS.contains(&normalized.as_str()) {
            debug!("Ignoring column '{}' (not part of the sales schema)", name);
            continue;
        }
        if let Some(previous) = resolved.get(&normalized) {
            return Err(ForecastError::SchemaMismatch(format!(
                "headers '{}' and '{}' both resolve to column '{}'",
                previous, name, normalized
            )));
        }
        resolved.insert(normalized, name.to_string());
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !resolved.contains_key(*col))
        .collect();

    if !missing.is_empty() {
        let found: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        return Err(ForecastError::SchemaMismatch(format!(
            "missing required column(s) {:?}; found {:?}",
            missing, found
        )));
    }

    Ok(resolved)
}

fn string_values(
    df: &DataFrame,
    columns: &HashMap<String, String>,
    canonical: &str,
) -> Result<Vec<String>> {
    let header = columns
        .get(canonical)
        .ok_or_else(|| ForecastError::SchemaMismatch(format!("missing column '{}'", canonical)))?;

    let series = df
        .column(header)?
        .as_materialized_series()
        .cast(&DataType::String)?;

    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value.map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(ForecastError::InvalidValue {
                column: canonical.to_string(),
                row: idx + 1,
                reason: "missing value".to_string(),
            }),
        })
        .collect()
}

fn numeric_values(
    df: &DataFrame,
    columns: &HashMap<String, String>,
    canonical: &str,
) -> Result<Vec<f64>> {
    string_values(df, columns, canonical)?
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(ForecastError::InvalidValue {
                column: canonical.to_string(),
                row: idx + 1,
                reason: format!("'{}' is not a finite number", raw),
            }),
        })
        .collect()
}
