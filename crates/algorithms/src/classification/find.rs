//! Fixed-budget EM runs
//!
//! Convenience driver over [`Clusterer`]: build, iterate a fixed number of
//! times (optionally checking a cancellation hook between iterations) and
//! snapshot.

use std::ops::ControlFlow;

use tracing::info;

use emclust_core::{Algorithm, Error, PointTable, Result};

use super::em::Clusterer;
use super::model::{ClusterModel, ClusterOrder};

/// Parameters for EM clustering
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EmParams {
    /// Number of clusters K (default: 14)
    pub cluster_count: usize,
    /// Number of EM iterations (default: 30)
    pub iteration_count: usize,
    /// Seed for the initial mean selection (default: 31415)
    pub seed: u64,
}

impl Default for EmParams {
    fn default() -> Self {
        Self {
            cluster_count: 14,
            iteration_count: 30,
            seed: 31415,
        }
    }
}

impl EmParams {
    /// Check the counts that do not depend on the point table.
    ///
    /// `cluster_count <= N` is checked when the engine is built.
    pub fn validate(&self) -> Result<()> {
        if self.cluster_count < 2 {
            return Err(Error::InvalidParameter {
                name: "cluster_count",
                value: self.cluster_count.to_string(),
                reason: "EM clustering requires at least 2 clusters".into(),
            });
        }
        if self.iteration_count == 0 {
            return Err(Error::InvalidParameter {
                name: "iteration_count",
                value: "0".into(),
                reason: "at least one EM iteration is required".into(),
            });
        }
        Ok(())
    }
}

/// Run `params.iteration_count` EM iterations and return the clusters sorted by `order`.
///
/// # Example
///
/// ```
/// use emclust_algorithms::classification::{find_clusters, ClusterOrder, EmParams};
/// use emclust_core::PointTable;
///
/// let rows: Vec<Vec<f64>> = (0..60)
///     .map(|i| vec![if i % 2 == 0 { 1.0 } else { 9.0 } + (i as f64) * 0.005])
///     .collect();
/// let points = PointTable::from_rows(&rows).unwrap();
///
/// let params = EmParams { cluster_count: 2, iteration_count: 20, seed: 7 };
/// let model = find_clusters(&points, &params, ClusterOrder::default()).unwrap();
/// assert!(model.prior_probability(0) >= model.prior_probability(1));
/// ```
pub fn find_clusters(points: &PointTable, params: &EmParams, order: ClusterOrder) -> Result<ClusterModel> {
    find_clusters_with(points, params, order, |_| ControlFlow::Continue(()))
}

/// Like [`find_clusters`], but calls `progress` with the number of completed
/// iterations after each one.
///
/// Returning `ControlFlow::Break(())` stops the run; the clusters of the last
/// completed iteration are returned.
pub fn find_clusters_with<P>(
    points: &PointTable,
    params: &EmParams,
    order: ClusterOrder,
    mut progress: P,
) -> Result<ClusterModel>
where
    P: FnMut(usize) -> ControlFlow<()>,
{
    params.validate()?;

    let mut clusterer = Clusterer::new(points, params.cluster_count, params.seed)?;
    for _ in 0..params.iteration_count {
        clusterer.iterate()?;
        if progress(clusterer.iterations()).is_break() {
            info!(
                completed = clusterer.iterations(),
                requested = params.iteration_count,
                "EM clustering cancelled"
            );
            return Ok(clusterer.snapshot_with(&order));
        }
    }

    info!(
        clusters = params.cluster_count,
        iterations = clusterer.iterations(),
        points = points.len(),
        "EM clustering complete"
    );
    Ok(clusterer.snapshot_with(&order))
}

/// EM clustering algorithm
#[derive(Debug, Clone, Default)]
pub struct FindClusters {
    /// Sort order of the returned clusters
    pub order: ClusterOrder,
}

impl Algorithm for FindClusters {
    type Input = PointTable;
    type Output = ClusterModel;
    type Params = EmParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "FindClusters"
    }

    fn description(&self) -> &'static str {
        "Gaussian mixture clustering of feature vectors by Expectation-Maximization"
    }

    fn validate(&self, params: &EmParams) -> Result<()> {
        params.validate()
    }

    fn execute(&self, input: &PointTable, params: &EmParams) -> Result<ClusterModel> {
        find_clusters(input, params, self.order.clone())
    }
}
