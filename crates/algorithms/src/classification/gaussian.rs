//! Multivariate normal density
//!
//! The covariance is factorized once (Cholesky, `Σ = L·Lᵗ`) when the density
//! is built. Mahalanobis distances are then computed by forward substitution
//! and the determinant falls out of the diagonal of `L`.

use ndarray::{Array1, Array2, ArrayView1};
use std::f64::consts::PI;

use emclust_core::{Error, Result};

/// A multivariate normal distribution with fixed mean and covariance.
#[derive(Debug, Clone)]
pub struct Gaussian {
    mean: Array1<f64>,
    covariance: Array2<f64>,
    /// Lower-triangular Cholesky factor of the covariance
    cholesky: Array2<f64>,
    /// `log(1 / ((2π)^(D/2) · sqrt(det Σ)))`
    log_norm: f64,
    norm_factor: f64,
}

impl Gaussian {
    /// Build a density from a mean of dimension D and a symmetric D×D covariance.
    ///
    /// Fails with [`Error::InvalidDimension`] on shape mismatch and with
    /// [`Error::DegenerateCluster`] (cluster index 0) if the covariance is not
    /// symmetric positive-definite.
    pub fn new(mean: Array1<f64>, covariance: Array2<f64>) -> Result<Self> {
        let d = mean.len();
        if d == 0 {
            return Err(Error::InvalidDimension { what: "mean", expected: 1, actual: 0 });
        }
        let (rows, cols) = covariance.dim();
        if rows != d {
            return Err(Error::InvalidDimension { what: "covariance rows", expected: d, actual: rows });
        }
        if cols != d {
            return Err(Error::InvalidDimension { what: "covariance columns", expected: d, actual: cols });
        }

        for a in 0..d {
            for b in (a + 1)..d {
                let (x, y) = (covariance[[a, b]], covariance[[b, a]]);
                let scale = x.abs().max(y.abs()).max(f64::MIN_POSITIVE);
                if (x - y).abs() > 1e-12 * scale {
                    return Err(degenerate(format!("covariance is not symmetric at ({}, {})", a, b)));
                }
            }
        }

        let cholesky = cholesky(&covariance)?;
        let log_det: f64 = 2.0 * cholesky.diag().iter().map(|l| l.ln()).sum::<f64>();
        let log_norm = -0.5 * (d as f64) * (2.0 * PI).ln() - 0.5 * log_det;

        Ok(Self {
            mean,
            covariance,
            cholesky,
            log_norm,
            norm_factor: log_norm.exp(),
        })
    }

    /// Dimension D of the distribution
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// `log(det Σ)`
    pub fn log_determinant(&self) -> f64 {
        -2.0 * self.log_norm - (self.dimension() as f64) * (2.0 * PI).ln()
    }

    /// Squared Mahalanobis distance `(x−μ)ᵗ Σ⁻¹ (x−μ)`.
    ///
    /// `x` must have the distribution's dimension; this is checked only in
    /// debug builds because it sits on the E-step hot path.
    pub fn mahalanobis_squared(&self, x: ArrayView1<'_, f64>) -> f64 {
        debug_assert_eq!(x.len(), self.dimension());
        let d = self.dimension();
        // Forward substitution L·y = x − μ, then |y|² is the distance.
        let mut y = vec![0.0; d];
        let mut sum_sq = 0.0;
        for i in 0..d {
            let mut v = x[i] - self.mean[i];
            for (j, yj) in y.iter().enumerate().take(i) {
                v -= self.cholesky[[i, j]] * yj;
            }
            y[i] = v / self.cholesky[[i, i]];
            sum_sq += y[i] * y[i];
        }
        sum_sq
    }

    /// Probability density at `x`: `normFactor · exp(−½·(x−μ)ᵗ Σ⁻¹ (x−μ))`.
    ///
    /// Underflows to exactly 0.0 far from the mean; use
    /// [`log_density`](Self::log_density) when that matters.
    pub fn density(&self, x: ArrayView1<'_, f64>) -> f64 {
        self.norm_factor * (-0.5 * self.mahalanobis_squared(x)).exp()
    }

    /// Natural logarithm of the density, computed without exponentiating.
    pub fn log_density(&self, x: ArrayView1<'_, f64>) -> f64 {
        self.log_norm - 0.5 * self.mahalanobis_squared(x)
    }
}

fn degenerate(reason: String) -> Error {
    Error::DegenerateCluster { cluster: 0, reason }
}

/// Cholesky–Banachiewicz factorization of a symmetric matrix.
///
/// Only the lower triangle of `a` is read. Fails if a pivot is not strictly
/// positive and finite.
fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if !(sum > 0.0 && sum.is_finite()) {
                    return Err(degenerate(format!(
                        "covariance is not positive-definite (pivot {} = {:e})",
                        i, sum
                    )));
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    Ok(l)
}
