//! Canonical sales dataset schema.
//!
//! Input headers are matched case-insensitively: each header is normalized
//! with [`normalize_column_name`] before it is compared against the canonical
//! lowercase snake_case names below. `Date`, `DATE` and ` date ` all resolve
//! to `date`; `Units Sold` resolves to `units_sold`.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DATE: &str = "date";
pub const REVENUE: &str = "revenue";
pub const ACTUAL_REVENUE: &str = "actual_revenue";
pub const PREDICTED_REVENUE: &str = "predicted_revenue";

/// Every column the input file must provide, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    DATE,
    "region",
    "segment",
    "product_category",
    "units_sold",
    "unit_price",
    "discount_percent",
    REVENUE,
];

pub const DAY_FIRST: &str = "%d/%m/%Y";
pub const MONTH_FIRST: &str = "%m/%d/%Y";

/// Accepted input date layouts, in order of preference. A column uses a
/// single layout for all its cells. Output is always ISO.
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", DAY_FIRST, MONTH_FIRST];

pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Categorical feature columns, one-hot encoded before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalColumn {
    Region,
    Segment,
    ProductCategory,
}

impl CategoricalColumn {
    pub const ALL: [CategoricalColumn; 3] = [Self::Region, Self::Segment, Self::ProductCategory];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Segment => "segment",
            Self::ProductCategory => "product_category",
        }
    }

    /// Resolve a (possibly non-normalized) header to a categorical column.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = normalize_column_name(name);
        Self::ALL.into_iter().find(|c| c.name() == normalized)
    }
}

impl fmt::Display for CategoricalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric feature columns, passed through to the model unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericColumn {
    UnitsSold,
    UnitPrice,
    DiscountPercent,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 3] = [Self::UnitsSold, Self::UnitPrice, Self::DiscountPercent];

    pub fn name(&self) -> &'static str {
        match self {
            Self::UnitsSold => "units_sold",
            Self::UnitPrice => "unit_price",
            Self::DiscountPercent => "discount_percent",
        }
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalize a header to canonical form: trimmed, lowercased, with runs of
/// whitespace, hyphens and underscores collapsed into a single `_`.
pub fn normalize_column_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_separator = true;
            continue;
        }
        if pending_separator && !normalized.is_empty() {
            normalized.push('_');
        }
        pending_separator = false;
        normalized.extend(ch.to_lowercase());
    }

    normalized
}
