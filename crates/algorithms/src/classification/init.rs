//! Random initialization of the EM clusters
//!
//! Initial means are drawn from the point table by rejection sampling until
//! K distinct feature vectors are found. Each cluster then gets the
//! covariance of the whole table about its own mean, and a constant prior.

use ndarray::{Array1, Array2};
use tracing::trace;

use emclust_core::{Error, PointTable, Result};

use super::lcg::Lcg48;

/// Prior weight every cluster starts with.
///
/// Not `1/K`. The first E-step only uses prior ratios, so any positive
/// constant gives the same responsibilities; from the first M-step on,
/// priors are normalized mean responsibilities.
pub const INITIAL_PRIOR: f64 = 1.0;

/// Sampling attempts allowed per requested cluster before giving up.
pub const ATTEMPTS_PER_CLUSTER: usize = 100;

/// Draw `k` feature vectors that are pairwise distinct by value.
///
/// Gives up after `ATTEMPTS_PER_CLUSTER * k` draws in total.
pub(crate) fn select_distinct_means(
    points: &PointTable,
    k: usize,
    rng: &mut Lcg48,
) -> Result<Vec<Array1<f64>>> {
    let max_attempts = ATTEMPTS_PER_CLUSTER * k;
    let mut means: Vec<Array1<f64>> = Vec::with_capacity(k);
    let mut attempts = 0;

    while means.len() < k {
        if attempts == max_attempts {
            return Err(Error::InsufficientDistinctPoints {
                requested: k,
                attempts,
            });
        }
        attempts += 1;

        let candidate = points.point(rng.next_index(points.len()));
        if means.iter().any(|m| *m == candidate) {
            trace!(cluster = means.len(), attempts, "initial mean collides, redrawing");
            continue;
        }
        means.push(candidate.to_owned());
    }

    Ok(means)
}

/// Covariance of the whole table about `mean`, divided by N.
pub(crate) fn scatter_covariance(points: &PointTable, mean: &Array1<f64>) -> Array2<f64> {
    let d = points.dimension();
    let mut cov = Array2::<f64>::zeros((d, d));

    for row in points.rows() {
        for a in 0..d {
            let da = row[a] - mean[a];
            for b in a..d {
                cov[[a, b]] += da * (row[b] - mean[b]);
            }
        }
    }

    let n = points.len() as f64;
    for a in 0..d {
        for b in a..d {
            cov[[a, b]] /= n;
            cov[[b, a]] = cov[[a, b]];
        }
    }
    cov
}
