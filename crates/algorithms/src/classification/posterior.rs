//! Posterior cluster probabilities
//!
//! Shared by the engine's E-step and by [`ClusterModel`](super::ClusterModel)
//! queries, so both produce the same numbers for the same clusters.
//!
//! The direct path computes `h[k] = p[k]·f_k(x)` and normalizes. When every
//! accepted density underflows to zero, or a very narrow cluster overflows its
//! normalization factor, the sum is not a positive finite number and the
//! posteriors are recomputed from log-densities:
//!
//! `h[k] = 1 / (1 + Σ_{l≠k} (p[l]/p[k])·exp(L[l] − L[k]))`

use ndarray::{ArrayView1, ArrayViewMut1};

use super::filter::IndexFilter;
use super::model::Cluster;

/// Which of the two evaluation paths produced a posterior vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosteriorBranch {
    /// Normalized `prior · density` products
    Direct,
    /// Log-space recomputation after the density sum underflowed
    LogSpace,
}

/// Write the posterior probabilities of `x` for every cluster into `out`.
///
/// Rejected indices get 0.0 and are left out of the normalization, so the
/// accepted entries sum to one. If no index is accepted, `out` is all zeros.
/// `out` must have one slot per cluster.
pub(crate) fn soft_posterior<F>(
    clusters: &[Cluster],
    x: ArrayView1<'_, f64>,
    filter: &F,
    mut out: ArrayViewMut1<'_, f64>,
) -> PosteriorBranch
where
    F: IndexFilter + ?Sized,
{
    debug_assert_eq!(out.len(), clusters.len());

    let mut sum = 0.0;
    for (k, cluster) in clusters.iter().enumerate() {
        out[k] = if filter.accept(k) {
            let h = cluster.prior_probability() * cluster.distribution().density(x);
            sum += h;
            h
        } else {
            0.0
        };
    }

    if sum > 0.0 && sum.is_finite() {
        for (k, h) in out.iter_mut().enumerate() {
            if filter.accept(k) {
                *h /= sum;
            }
        }
        return PosteriorBranch::Direct;
    }

    let priors: Vec<f64> = clusters.iter().map(Cluster::prior_probability).collect();
    let log_densities: Vec<f64> = clusters
        .iter()
        .map(|c| c.distribution().log_density(x))
        .collect();
    log_space_posterior(&priors, &log_densities, filter, out);
    PosteriorBranch::LogSpace
}

/// Posterior probabilities from priors and log-densities.
///
/// Priors of accepted clusters must be strictly positive; the engine
/// guarantees this for every cluster it produces.
///
/// The prior ratio is taken in linear space and the density ratio in log
/// space. Exact algebra gives the same value as
/// `exp(log p[l] + L[l] − log p[k] − L[k])`; the two differ only in rounding.
pub(crate) fn log_space_posterior<F>(
    priors: &[f64],
    log_densities: &[f64],
    filter: &F,
    mut out: ArrayViewMut1<'_, f64>,
) where
    F: IndexFilter + ?Sized,
{
    let k_count = priors.len();
    for k in 0..k_count {
        if !filter.accept(k) {
            out[k] = 0.0;
            continue;
        }
        let mut ratio = 0.0;
        for l in 0..k_count {
            if l != k && filter.accept(l) {
                ratio += (priors[l] / priors[k]) * (log_densities[l] - log_densities[k]).exp();
            }
        }
        out[k] = 1.0 / (1.0 + ratio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::filter::{AcceptAll, AcceptOnly};
    use approx::assert_relative_eq;
    use ndarray::{array, Array1, Array2};

    fn cluster(prior: f64, mean: f64, var: f64) -> Cluster {
        Cluster::new(prior, array![mean], array![[var]]).unwrap()
    }

    fn posterior<F: IndexFilter>(clusters: &[Cluster], x: f64, filter: &F) -> (Array1<f64>, PosteriorBranch) {
        let mut out = Array1::zeros(clusters.len());
        let point = array![x];
        let branch = soft_posterior(clusters, point.view(), filter, out.view_mut());
        (out, branch)
    }

    #[test]
    fn test_direct_branch_sums_to_one() {
        let clusters = vec![cluster(0.3, 0.0, 1.0), cluster(0.7, 2.0, 0.5)];
        let (h, branch) = posterior(&clusters, 1.0, &AcceptAll);
        assert_eq!(branch, PosteriorBranch::Direct);
        assert_relative_eq!(h.sum(), 1.0, epsilon = 1e-12);

        let a = 0.3 * clusters[0].distribution().density(array![1.0].view());
        let b = 0.7 * clusters[1].distribution().density(array![1.0].view());
        assert_relative_eq!(h[0], a / (a + b), epsilon = 1e-12);
    }

    #[test]
    fn test_log_branch_on_underflow() {
        let clusters = vec![cluster(0.5, 0.0, 1e-4), cluster(0.5, 1.0, 1e-4)];
        let (h, branch) = posterior(&clusters, 1000.0, &AcceptAll);
        assert_eq!(branch, PosteriorBranch::LogSpace);
        assert_relative_eq!(h.sum(), 1.0, epsilon = 1e-9);
        // The second mean is closer, it takes all the mass.
        assert_relative_eq!(h[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_log_branch_matches_direct_when_well_conditioned() {
        let clusters = vec![
            cluster(0.2, 0.0, 1.0),
            cluster(0.5, 1.5, 2.0),
            cluster(0.3, -1.0, 0.5),
        ];
        let x = array![0.4];
        let (direct, branch) = posterior(&clusters, 0.4, &AcceptAll);
        assert_eq!(branch, PosteriorBranch::Direct);

        let priors: Vec<f64> = clusters.iter().map(|c| c.prior_probability()).collect();
        let logs: Vec<f64> = clusters.iter().map(|c| c.distribution().log_density(x.view())).collect();
        let mut via_logs = Array1::zeros(3);
        log_space_posterior(&priors, &logs, &AcceptAll, via_logs.view_mut());

        for k in 0..3 {
            assert_relative_eq!(direct[k], via_logs[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_log_ratio_form_agrees_with_log_sum_form() {
        let priors = [0.1, 0.6, 0.3];
        let logs = [-700.0, -702.5, -699.0];
        let mut out = Array1::zeros(3);
        log_space_posterior(&priors, &logs, &AcceptAll, out.view_mut());

        // Reference: normalize exp(log p + L) after shifting by the maximum.
        let joint: Vec<f64> = priors.iter().zip(&logs).map(|(p, l)| p.ln() + l).collect();
        let max = joint.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let total: f64 = joint.iter().map(|j| (j - max).exp()).sum();
        for k in 0..3 {
            assert_relative_eq!(out[k], (joint[k] - max).exp() / total, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_filter_restricts_normalization() {
        let clusters = vec![
            cluster(0.4, 0.0, 1.0),
            cluster(0.4, 1.0, 1.0),
            cluster(0.2, 2.0, 1.0),
        ];
        let (h, _) = posterior(&clusters, 0.5, &AcceptOnly::new([0, 2]));
        assert_eq!(h[1], 0.0);
        assert_relative_eq!(h[0] + h[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_filter_in_log_branch() {
        let clusters = vec![
            cluster(0.4, 0.0, 1e-4),
            cluster(0.4, 1.0, 1e-4),
            cluster(0.2, 2.0, 1e-4),
        ];
        let (h, branch) = posterior(&clusters, -500.0, &AcceptOnly::new([1, 2]));
        assert_eq!(branch, PosteriorBranch::LogSpace);
        assert_eq!(h[0], 0.0);
        assert_relative_eq!(h[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(h[1] + h[2], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_log_branch_on_density_overflow() {
        // det Σ = 1e-900: the normalization factor overflows to +inf
        let narrow = Cluster::new(0.5, Array1::zeros(3), Array2::eye(3) * 1e-300).unwrap();
        let unit = Cluster::new(0.5, Array1::ones(3), Array2::eye(3)).unwrap();
        let clusters = vec![narrow, unit];
        let x = Array1::<f64>::zeros(3);
        assert!(clusters[0].distribution().density(x.view()).is_infinite());

        let mut h = Array1::zeros(2);
        let branch = soft_posterior(&clusters, x.view(), &AcceptAll, h.view_mut());
        assert_eq!(branch, PosteriorBranch::LogSpace);
        assert!(h.iter().all(|p| p.is_finite()));
        assert_relative_eq!(h[0], 1.0, epsilon = 1e-12);
        assert_eq!(h[1], 0.0);
    }

    #[test]
    fn test_nothing_accepted_gives_zeros() {
        let clusters = vec![cluster(0.5, 0.0, 1.0), cluster(0.5, 1.0, 1.0)];
        let (h, _) = posterior(&clusters, 0.5, &|_k: usize| false);
        assert_eq!(h.sum(), 0.0);
    }
}
