//! Feature preprocessing.
//!
//! Categorical columns are one-hot encoded against a reference level;
//! numeric columns pass through untouched.

pub mod encoder;

pub use encoder::{ColumnEncoding, OneHotEncoder};
