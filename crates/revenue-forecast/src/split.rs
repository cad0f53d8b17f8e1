//! Seeded train/test splitting.
//!
//! Row indices are shuffled with a seeded [`StdRng`]; the first
//! `ceil(test_ratio * n)` shuffled indices become the test set and the rest
//! the training set. Whole records move together, so the date, features and
//! target of a row can never drift out of alignment.

use crate::error::{ForecastError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Disjoint row positions for the training and test partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    pub fn total(&self) -> usize {
        self.train.len() + self.test.len()
    }

    /// Partition `rows` into `(train, test)` following these indices.
    pub fn apply<T: Clone>(&self, rows: &[T]) -> (Vec<T>, Vec<T>) {
        let pick = |indices: &[usize]| indices.iter().map(|&i| rows[i].clone()).collect();
        (pick(&self.train), pick(&self.test))
    }
}

/// Number of test rows for `n_rows` at `test_ratio`.
pub fn test_size(n_rows: usize, test_ratio: f64) -> usize {
    (test_ratio * n_rows as f64).ceil() as usize
}

/// Shuffle `0..n_rows` with `seed` and split it into train and test indices.
///
/// # Errors
///
/// Returns [`ForecastError::InvalidConfig`] for a ratio outside (0, 1) and
/// [`ForecastError::InsufficientData`] when either partition would be empty.
pub fn train_test_split(n_rows: usize, test_ratio: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(ForecastError::InvalidConfig(format!(
            "test ratio must be strictly between 0 and 1, got {}",
            test_ratio
        )));
    }

    let n_test = test_size(n_rows, test_ratio);
    let n_train = n_rows.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(ForecastError::InsufficientData(format!(
            "{} rows cannot be split at test ratio {} (train {}, test {})",
            n_rows, test_ratio, n_train, n_test
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    debug!(
        "Split {} rows into {} train / {} test (seed {})",
        n_rows,
        train.len(),
        indices.len(),
        seed
    );

    Ok(SplitIndices {
        train,
        test: indices,
    })
}
