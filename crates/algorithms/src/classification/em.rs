//! Expectation-Maximization engine for Gaussian mixtures
//!
//! The engine owns the per-cluster state (priors, means, covariances and
//! their densities) and the responsibility matrix over the training points.
//! The caller decides how many iterations to run; every [`Clusterer::iterate`]
//! call is one E-step followed by one M-step.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use tracing::{debug, warn};

use crate::maybe_rayon::*;
use emclust_core::{Error, PointTable, Result};

use super::filter::AcceptAll;
use super::gaussian::Gaussian;
use super::init::{scatter_covariance, select_distinct_means, INITIAL_PRIOR};
use super::lcg::Lcg48;
use super::model::{Cluster, ClusterModel, ClusterOrder};
use super::posterior::{soft_posterior, PosteriorBranch};

/// EM clustering run over a borrowed point table.
///
/// The table is only read, so any number of engines may share it. A single
/// engine must not be iterated and snapshotted concurrently, which `&mut self`
/// on [`iterate`](Self::iterate) already enforces.
///
/// # Example
///
/// ```
/// use emclust_algorithms::classification::Clusterer;
/// use emclust_core::PointTable;
///
/// let rows: Vec<Vec<f64>> = (0..40)
///     .map(|i| vec![if i % 2 == 0 { 0.0 } else { 8.0 } + (i as f64) * 0.01])
///     .collect();
/// let points = PointTable::from_rows(&rows).unwrap();
///
/// let mut clusterer = Clusterer::new(&points, 2, 5489).unwrap();
/// for _ in 0..10 {
///     clusterer.iterate().unwrap();
/// }
/// let model = clusterer.snapshot();
/// assert_eq!(model.cluster_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Clusterer<'a> {
    points: &'a PointTable,
    clusters: Vec<Cluster>,
    /// Posterior probabilities, shape (N, K)
    responsibilities: Array2<f64>,
    iterations: usize,
}

impl<'a> Clusterer<'a> {
    /// Initialize `cluster_count` clusters from `points` using `seed`.
    ///
    /// Requires `2 <= cluster_count <= points.len()`. Fails with
    /// [`Error::InsufficientDistinctPoints`] if the table does not hold enough
    /// distinct feature vectors, and with [`Error::DegenerateCluster`] if an
    /// initial covariance is singular.
    pub fn new(points: &'a PointTable, cluster_count: usize, seed: u64) -> Result<Self> {
        if cluster_count < 2 {
            return Err(Error::InvalidParameter {
                name: "cluster_count",
                value: cluster_count.to_string(),
                reason: "EM clustering requires at least 2 clusters".into(),
            });
        }
        if cluster_count > points.len() {
            return Err(Error::InvalidParameter {
                name: "cluster_count",
                value: cluster_count.to_string(),
                reason: format!("exceeds the number of points ({})", points.len()),
            });
        }

        let mut rng = Lcg48::new(seed);
        let means = select_distinct_means(points, cluster_count, &mut rng)?;

        let clusters = means
            .into_iter()
            .enumerate()
            .map(|(k, mean)| {
                let covariance = scatter_covariance(points, &mean);
                let distribution = Gaussian::new(mean, covariance).map_err(|e| e.in_cluster(k))?;
                Ok(Cluster::from_parts(INITIAL_PRIOR, distribution))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            points = points.len(),
            dimension = points.dimension(),
            clusters = cluster_count,
            seed,
            "EM clusterer initialized"
        );

        Ok(Self::with_clusters(points, clusters))
    }

    /// Start a run from explicit initial clusters.
    ///
    /// Every cluster must have the table's dimension.
    pub(crate) fn with_clusters(points: &'a PointTable, clusters: Vec<Cluster>) -> Self {
        debug_assert!(clusters.iter().all(|c| c.mean().len() == points.dimension()));
        Self {
            points,
            responsibilities: Array2::zeros((points.len(), clusters.len())),
            clusters,
            iterations: 0,
        }
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn dimension(&self) -> usize {
        self.points.dimension()
    }

    /// Number of iterations completed so far
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Current clusters, in engine order
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Perform one E-step and one M-step.
    ///
    /// On error the clusters keep the values of the last completed iteration.
    /// The run should then be abandoned: no cluster is re-seeded.
    pub fn iterate(&mut self) -> Result<()> {
        let underflows = self.step_e();
        self.step_m()?;
        self.iterations += 1;

        let (min_prior, max_prior) = self
            .clusters
            .iter()
            .map(Cluster::prior_probability)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p), hi.max(p)));
        debug!(
            iteration = self.iterations,
            underflows, min_prior, max_prior, "EM iteration complete"
        );
        Ok(())
    }

    /// Snapshot of the current clusters, largest prior first
    pub fn snapshot(&self) -> ClusterModel {
        self.snapshot_with(&ClusterOrder::default())
    }

    /// Snapshot of the current clusters, sorted by `order`
    pub fn snapshot_with(&self, order: &ClusterOrder) -> ClusterModel {
        ClusterModel::snapshot(&self.clusters, order)
    }

    /// Responsibilities from the latest E-step, shape (N, K)
    pub fn responsibilities(&self) -> ArrayView2<'_, f64> {
        self.responsibilities.view()
    }

    /// Recompute every point's responsibilities. Returns how many points
    /// needed the log-space fallback.
    fn step_e(&mut self) -> usize {
        let clusters = &self.clusters;
        let points = self.points;

        self.responsibilities
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .map(|(i, h)| soft_posterior(clusters, points.point(i), &AcceptAll, h))
            .filter(|branch| *branch == PosteriorBranch::LogSpace)
            .count()
    }

    /// Re-estimate every cluster from the responsibilities.
    ///
    /// All K clusters are computed before any is replaced.
    fn step_m(&mut self) -> Result<()> {
        let updated = (0..self.clusters.len())
            .into_par_iter()
            .map(|k| self.maximize(k))
            .collect::<Result<Vec<_>>>()?;
        self.clusters = updated;
        Ok(())
    }

    fn maximize(&self, k: usize) -> Result<Cluster> {
        let h = self.responsibilities.column(k);
        let n = self.points.len();
        let d = self.points.dimension();

        let weight: f64 = h.sum();
        if !(weight > 0.0) {
            warn!(cluster = k, weight, "cluster lost all responsibility");
            return Err(Error::DegenerateCluster {
                cluster: k,
                reason: format!("total responsibility is {}", weight),
            });
        }

        let mut mean = Array1::<f64>::zeros(d);
        for (row, &hi) in self.points.rows().zip(h.iter()) {
            mean.scaled_add(hi, &row);
        }
        mean /= weight;

        let mut covariance = Array2::<f64>::zeros((d, d));
        for (row, &hi) in self.points.rows().zip(h.iter()) {
            for a in 0..d {
                let da = hi * (row[a] - mean[a]);
                for b in a..d {
                    covariance[[a, b]] += da * (row[b] - mean[b]);
                }
            }
        }
        for a in 0..d {
            for b in a..d {
                covariance[[a, b]] /= weight;
                covariance[[b, a]] = covariance[[a, b]];
            }
        }

        let distribution = Gaussian::new(mean, covariance).map_err(|e| {
            warn!(cluster = k, weight, "cluster covariance became singular");
            e.in_cluster(k)
        })?;
        Ok(Cluster::from_parts(weight / n as f64, distribution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_blobs_2d() -> PointTable {
        let mut rows = Vec::new();
        for i in 0..30 {
            let t = i as f64 * 0.37;
            let (dx, dy) = (t.sin() * 0.5, t.cos() * 0.3);
            rows.push(vec![dx, dy]);
            rows.push(vec![6.0 + dy, -4.0 + dx]);
        }
        PointTable::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_cluster_count_bounds() {
        let points = two_blobs_2d();
        assert!(matches!(
            Clusterer::new(&points, 1, 0),
            Err(Error::InvalidParameter { name: "cluster_count", .. })
        ));
        assert!(matches!(
            Clusterer::new(&points, points.len() + 1, 0),
            Err(Error::InvalidParameter { name: "cluster_count", .. })
        ));
    }

    #[test]
    fn test_initial_state() {
        let points = two_blobs_2d();
        let clusterer = Clusterer::new(&points, 3, 5489).unwrap();
        assert_eq!(clusterer.cluster_count(), 3);
        assert_eq!(clusterer.dimension(), 2);
        assert_eq!(clusterer.iterations(), 0);
        for c in clusterer.clusters() {
            assert_eq!(c.prior_probability(), INITIAL_PRIOR);
            assert!(points.rows().any(|r| r == c.mean()));
        }
    }

    #[test]
    fn test_m_step_weights_match_priors() {
        let points = two_blobs_2d();
        let mut clusterer = Clusterer::new(&points, 2, 11).unwrap();
        for _ in 0..5 {
            clusterer.iterate().unwrap();
            let h = clusterer.responsibilities();
            let n = points.len() as f64;
            for (k, c) in clusterer.clusters().iter().enumerate() {
                let weight = h.column(k).sum();
                assert_relative_eq!(c.prior_probability(), weight / n, epsilon = 1e-12);
            }
            for row in h.axis_iter(Axis(0)) {
                assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_priors_sum_to_one_after_iteration() {
        let points = two_blobs_2d();
        let mut clusterer = Clusterer::new(&points, 4, 3).unwrap();
        clusterer.iterate().unwrap();
        let total: f64 = clusterer.clusters().iter().map(|c| c.prior_probability()).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_covariances_stay_symmetric() {
        let points = two_blobs_2d();
        let mut clusterer = Clusterer::new(&points, 2, 21).unwrap();
        for _ in 0..10 {
            clusterer.iterate().unwrap();
        }
        for c in clusterer.clusters() {
            let cov = c.covariance();
            assert_eq!(cov[[0, 1]], cov[[1, 0]]);
        }
    }

    #[test]
    fn test_snapshot_is_independent_of_later_iterations() {
        let points = two_blobs_2d();
        let mut clusterer = Clusterer::new(&points, 2, 8).unwrap();
        clusterer.iterate().unwrap();
        let before = clusterer.snapshot_with(&ClusterOrder::Unsorted);
        let frozen: Vec<Vec<f64>> = (0..2).map(|k| before.mean(k).to_vec()).collect();

        for _ in 0..5 {
            clusterer.iterate().unwrap();
        }
        let after = clusterer.snapshot_with(&ClusterOrder::Unsorted);

        for k in 0..2 {
            assert_eq!(before.mean(k).to_vec(), frozen[k]);
        }
        assert!((0..2).any(|k| after.mean(k).to_vec() != frozen[k]));
    }

    fn grouped_1d() -> PointTable {
        let offsets: Vec<f64> = (0..50).map(|j| -0.5 + j as f64 / 49.0).collect();
        let rows: Vec<Vec<f64>> = offsets
            .iter()
            .map(|&o| vec![o])
            .chain(offsets.iter().map(|&o| vec![10.0 + o]))
            .collect();
        PointTable::from_rows(&rows).unwrap()
    }

    fn sorted_means(clusterer: &Clusterer<'_>) -> Vec<f64> {
        let mut means: Vec<f64> = clusterer.clusters().iter().map(|c| c.mean()[0]).collect();
        means.sort_by(f64::total_cmp);
        means
    }

    #[test]
    fn test_initial_covariance_scaled_by_point_count() {
        let points = grouped_1d();
        let n = points.len() as f64;

        let mut scaled = Clusterer::new(&points, 2, 42).unwrap();
        let raw_clusters = scaled
            .clusters()
            .iter()
            .map(|c| {
                let mean = c.mean().to_owned();
                let raw = scatter_covariance(&points, &mean) * n;
                Cluster::new(INITIAL_PRIOR, mean, raw).unwrap()
            })
            .collect();
        let mut raw = Clusterer::with_clusters(&points, raw_clusters);

        for _ in 0..30 {
            scaled.iterate().unwrap();
            raw.iterate().unwrap();
        }

        // Scaled start: one cluster per group
        let means = sorted_means(&scaled);
        assert!(means[0].abs() < 0.5, "low mean {}", means[0]);
        assert!((means[1] - 10.0).abs() < 0.5, "high mean {}", means[1]);

        // Unscaled start: flat densities, both clusters still straddle the gap
        for m in sorted_means(&raw) {
            assert!((m - 5.0).abs() < 1.0, "mean {}", m);
        }
    }

    #[test]
    fn test_zero_weight_cluster_is_degenerate() {
        let points = two_blobs_2d();
        let mut clusterer = Clusterer::new(&points, 3, 17).unwrap();
        clusterer.iterate().unwrap();
        let before: Vec<Vec<f64>> = clusterer.clusters().iter().map(|c| c.mean().to_vec()).collect();

        // All responsibility moves off cluster 1
        for mut row in clusterer.responsibilities.axis_iter_mut(Axis(0)) {
            row[0] += row[1];
            row[1] = 0.0;
        }
        let result = clusterer.step_m();

        assert!(matches!(result, Err(Error::DegenerateCluster { cluster: 1, .. })));
        let after: Vec<Vec<f64>> = clusterer.clusters().iter().map(|c| c.mean().to_vec()).collect();
        assert_eq!(before, after);
        assert_eq!(clusterer.iterations(), 1);
    }

    #[test]
    fn test_collapsed_cluster_is_degenerate() {
        // Three tight groups and K = 3: one cluster ends up owning a single
        // repeated value and its covariance collapses.
        let mut rows = vec![vec![0.0]; 20];
        rows.push(vec![50.0]);
        rows.push(vec![100.0]);
        let points = PointTable::from_rows(&rows).unwrap();

        let mut clusterer = Clusterer::new(&points, 3, 0).unwrap();
        let mut outcome = Ok(());
        for _ in 0..20 {
            outcome = clusterer.iterate();
            if outcome.is_err() {
                break;
            }
        }
        assert!(matches!(outcome, Err(Error::DegenerateCluster { .. })));
        // The engine still holds the last completed clusters.
        let model = clusterer.snapshot();
        assert_eq!(model.cluster_count(), 3);
        assert!(model.clusters().iter().all(|c| c.prior_probability() > 0.0));
    }
}
