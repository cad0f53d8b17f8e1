//! Regression models.

pub mod linear;

pub use linear::LinearRegression;
