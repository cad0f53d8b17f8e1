//! Ordinary least squares linear regression.

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::{debug, warn};

/// Pivots of the unit-diagonal normal equations at or below this count as zero.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// A centered column whose sum of squares is at or below this fraction of
/// its raw sum of squares is constant up to rounding.
const CONSTANT_COLUMN_TOLERANCE: f64 = 1e-20;

/// Ordinary least squares regression with an intercept and no regularization.
///
/// The fit centers features and target, rescales the normal equations to a
/// unit diagonal so every column is judged on its own scale, solves them with
/// partial-pivot Gaussian elimination, and recovers the intercept from the
/// means. When the design is rank deficient (e.g. a category level that
/// always co-occurs with another) the dependent columns get weight zero.
///
/// # Example
///
/// ```rust,ignore
/// use ndarray::array;
/// use revenue_forecast::LinearRegression;
///
/// let x = array![[1.0], [2.0], [3.0]];
/// let y = array![5.0, 7.0, 9.0];
///
/// let mut model = LinearRegression::new();
/// model.fit(&x, &y)?;
/// assert!((model.intercept() - 3.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    coefficients: Option<Array1<f64>>,
    intercept: f64,
    rank: usize,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the model to `x` (rows = samples) and `y`.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 {
            return Err(ForecastError::InsufficientData(
                "cannot fit a regression on zero rows".to_string(),
            ));
        }
        if y.len() != n_samples {
            return Err(ForecastError::Model(format!(
                "feature matrix has {} rows but target has {}",
                n_samples,
                y.len()
            )));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let y_mean = y.mean().unwrap_or(0.0);

        let x_centered = x - &x_mean;
        let y_centered = y - y_mean;

        let gram = x_centered.t().dot(&x_centered);
        let moments = x_centered.t().dot(&y_centered);

        let raw_norms = x.map_axis(Axis(0), |column| column.dot(&column));
        let scale = column_scale(&gram, &raw_norms);

        let scaled_gram =
            Array2::from_shape_fn((n_features, n_features), |(i, j)| {
                gram[[i, j]] * scale[i] * scale[j]
            });
        let scaled_moments = &moments * &scale;

        let (scaled_solution, rank) = solve_normal_equations(scaled_gram, scaled_moments);
        let coefficients = scaled_solution * &scale;
        if rank < n_features {
            warn!(
                "Design matrix is rank deficient ({} of {} columns independent); dependent columns get weight 0",
                rank, n_features
            );
        }

        self.intercept = y_mean - x_mean.dot(&coefficients);
        self.coefficients = Some(coefficients);
        self.rank = rank;

        debug!(
            "Fitted OLS on {} rows x {} features, intercept {:.4}",
            n_samples, n_features, self.intercept
        );
        Ok(())
    }

    /// Predict targets for `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| ForecastError::Model("model has not been fitted".to_string()))?;

        if x.ncols() != coefficients.len() {
            return Err(ForecastError::Model(format!(
                "model expects {} features, got {}",
                coefficients.len(),
                x.ncols()
            )));
        }

        Ok(x.dot(coefficients) + self.intercept)
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    /// Learned weights, one per feature column. `None` before fitting.
    pub fn coefficients(&self) -> Option<ArrayView1<'_, f64>> {
        self.coefficients.as_ref().map(|c| c.view())
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Number of linearly independent feature columns found while fitting.
    pub fn rank(&self) -> usize {
        self.rank
    }
}

/// `1 / sqrt(diag(gram))` per column, 0 for columns that are constant.
fn column_scale(gram: &Array2<f64>, raw_norms: &Array1<f64>) -> Array1<f64> {
    gram.diag()
        .iter()
        .zip(raw_norms.iter())
        .map(|(&centered, &raw)| {
            if centered > 0.0 && centered > CONSTANT_COLUMN_TOLERANCE * raw {
                centered.sqrt().recip()
            } else {
                0.0
            }
        })
        .collect()
}

/// Solve the symmetric system `gram * beta = moments`.
///
/// Columns whose pivot vanishes are treated as free and set to zero, which
/// yields a valid least squares solution when the system is singular.
/// Returns the solution and the number of pivot columns.
fn solve_normal_equations(mut gram: Array2<f64>, mut moments: Array1<f64>) -> (Array1<f64>, usize) {
    let n = moments.len();

    let mut pivot_columns: Vec<usize> = Vec::with_capacity(n);
    let mut row = 0;

    for col in 0..n {
        if row == n {
            break;
        }

        let (best_row, best_value) = (row..n)
            .map(|r| (r, gram[[r, col]].abs()))
            .fold((row, -1.0), |best, cand| if cand.1 > best.1 { cand } else { best });

        if best_value <= PIVOT_TOLERANCE {
            continue;
        }

        if best_row != row {
            for k in 0..n {
                gram.swap([row, k], [best_row, k]);
            }
            moments.swap(row, best_row);
        }

        let pivot = gram[[row, col]];
        for r in (row + 1)..n {
            let factor = gram[[r, col]] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                gram[[r, k]] -= factor * gram[[row, k]];
            }
            moments[r] -= factor * moments[row];
        }

        pivot_columns.push(col);
        row += 1;
    }

    let mut solution = Array1::<f64>::zeros(n);
    for (pivot_row, &col) in pivot_columns.iter().enumerate().rev() {
        let mut acc = moments[pivot_row];
        for k in (col + 1)..n {
            acc -= gram[[pivot_row, k]] * solution[k];
        }
        solution[col] = acc / gram[[pivot_row, col]];
    }

    (solution, pivot_columns.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-8, "{} != {}", a, b);
    }

    #[test]
    fn test_recovers_exact_linear_relationship() {
        // y = 3 + 2*x1 - 1*x2
        let x = array![
            [1.0, 0.0],
            [2.0, 1.0],
            [3.0, 5.0],
            [4.0, 2.0],
            [5.0, 3.0],
        ];
        let y: Array1<f64> = x.rows().into_iter().map(|r| 3.0 + 2.0 * r[0] - r[1]).collect();

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coefficients = model.coefficients().unwrap();
        assert_close(coefficients[0], 2.0);
        assert_close(coefficients[1], -1.0);
        assert_close(model.intercept(), 3.0);
        assert_eq!(model.rank(), 2);

        let predictions = model.predict(&array![[10.0, 4.0]]).unwrap();
        assert_close(predictions[0], 19.0);
    }

    #[test]
    fn test_least_squares_on_noisy_data() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 3.0, 2.0, 4.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        // Closed form: slope = cov(x, y) / var(x) = 0.8, intercept = 2.5 - 0.8 * 2.5
        assert_close(model.coefficients().unwrap()[0], 0.8);
        assert_close(model.intercept(), 0.5);
    }

    #[test]
    fn test_rank_deficient_design_still_predicts() {
        // Second column duplicates the first.
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.rank(), 1);
        let predictions = model.predict(&x).unwrap();
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert_close(*p, *t);
        }
    }

    #[test]
    fn test_constant_feature_gets_zero_weight() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0]];
        let y = array![1.0, 2.0, 3.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        assert_close(model.coefficients().unwrap()[1], 0.0);
        assert_close(model.coefficients().unwrap()[0], 1.0);
    }

    #[test]
    fn test_rare_indicator_beside_large_scale_column() {
        // A million-scale column next to a level that occurs once.
        let n = 20;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| match j {
            0 => i as f64 * 1e6,
            _ => f64::from(u8::from(i == 7)),
        });
        let y: Array1<f64> = x.rows().into_iter().map(|r| 2e-6 * r[0] + 500.0 * r[1]).collect();

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.rank(), 2);
        let coefficients = model.coefficients().unwrap();
        assert!((coefficients[0] - 2e-6).abs() < 1e-12, "{}", coefficients[0]);
        assert!((coefficients[1] - 500.0).abs() < 1e-6, "{}", coefficients[1]);
        assert!(model.intercept().abs() < 1e-6);

        let predictions = model.predict(&x).unwrap();
        assert!((predictions[7] - 514.0).abs() < 1e-6, "{}", predictions[7]);
    }

    #[test]
    fn test_mixed_scales_with_collinear_pair() {
        // Columns: revenue-scale numeric, small numeric, two indicators that
        // always co-occur.
        let n = 30;
        let x = Array2::from_shape_fn((n, 4), |(i, j)| match j {
            0 => 1e5 + (i * i) as f64 * 250.0,
            1 => (i % 7) as f64 * 0.01,
            _ => f64::from(u8::from(i % 5 == 0)),
        });
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| 12.0 + 0.003 * r[0] - 40.0 * r[1] + 80.0 * r[2])
            .collect();

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.rank(), 3);
        let coefficients = model.coefficients().unwrap();
        assert!((coefficients[0] - 0.003).abs() < 1e-10);
        assert!((coefficients[1] + 40.0).abs() < 1e-6);
        // The duplicated indicator pair shares the effect between them.
        assert!((coefficients[2] + coefficients[3] - 80.0).abs() < 1e-6);

        let predictions = model.predict(&x).unwrap();
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6, "{} != {}", p, t);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LinearRegression::new();
        assert!(!model.is_fitted());
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(ForecastError::Model(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut model = LinearRegression::new();
        assert!(model.fit(&array![[1.0], [2.0]], &array![1.0]).is_err());

        model.fit(&array![[1.0], [2.0]], &array![1.0, 2.0]).unwrap();
        assert!(model.predict(&array![[1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_empty_training_set() {
        let mut model = LinearRegression::new();
        let x = Array2::<f64>::zeros((0, 3));
        let y = Array1::<f64>::zeros(0);
        assert!(matches!(
            model.fit(&x, &y),
            Err(ForecastError::InsufficientData(_))
        ));
    }
}
