//! Clusters and immutable cluster model snapshots

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1};

use emclust_core::{Error, Result};

use super::filter::{AcceptAll, IndexFilter};
use super::gaussian::Gaussian;
use super::posterior::soft_posterior;

/// One mixture component: a prior probability and a Gaussian density.
#[derive(Debug, Clone)]
pub struct Cluster {
    prior: f64,
    distribution: Gaussian,
}

impl Cluster {
    /// Build a cluster from its prior, mean and covariance.
    ///
    /// The prior must be finite and strictly positive; the covariance must be
    /// symmetric positive-definite.
    pub fn new(prior: f64, mean: Array1<f64>, covariance: Array2<f64>) -> Result<Self> {
        if !(prior > 0.0 && prior.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "prior",
                value: prior.to_string(),
                reason: "prior probability must be finite and > 0".into(),
            });
        }
        Ok(Self::from_parts(prior, Gaussian::new(mean, covariance)?))
    }

    pub(crate) fn from_parts(prior: f64, distribution: Gaussian) -> Self {
        Self { prior, distribution }
    }

    /// Mixture weight of the cluster
    pub fn prior_probability(&self) -> f64 {
        self.prior
    }

    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.distribution.mean().view()
    }

    pub fn covariance(&self) -> &Array2<f64> {
        self.distribution.covariance()
    }

    /// Gaussian density of the cluster
    pub fn distribution(&self) -> &Gaussian {
        &self.distribution
    }
}

type ClusterComparator = dyn Fn(&Cluster, &Cluster) -> Ordering + Send + Sync;

/// Sort order applied when a [`ClusterModel`] is materialized.
///
/// Sorting is stable: clusters that compare equal keep engine order.
#[derive(Clone, Default)]
pub enum ClusterOrder {
    /// Largest prior probability first
    #[default]
    ByPriorDescending,
    /// Engine order, as initialized
    Unsorted,
    /// Caller-supplied comparison
    Custom(Arc<ClusterComparator>),
}

impl ClusterOrder {
    pub fn custom<F>(compare: F) -> Self
    where
        F: Fn(&Cluster, &Cluster) -> Ordering + Send + Sync + 'static,
    {
        ClusterOrder::Custom(Arc::new(compare))
    }

    pub(crate) fn sort(&self, clusters: &mut [Cluster]) {
        match self {
            ClusterOrder::ByPriorDescending => {
                clusters.sort_by(|a, b| b.prior.total_cmp(&a.prior));
            }
            ClusterOrder::Unsorted => {}
            ClusterOrder::Custom(compare) => clusters.sort_by(|a, b| compare(a, b)),
        }
    }
}

impl fmt::Debug for ClusterOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterOrder::ByPriorDescending => f.write_str("ByPriorDescending"),
            ClusterOrder::Unsorted => f.write_str("Unsorted"),
            ClusterOrder::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// An immutable, ordered set of K clusters.
///
/// Owns its own copies of every mean and covariance, so it stays valid and
/// unchanged while the engine that produced it keeps iterating.
///
/// # Example
///
/// ```
/// use emclust_algorithms::classification::{AcceptOnly, Cluster, ClusterModel};
/// use ndarray::array;
///
/// let model = ClusterModel::new(vec![
///     Cluster::new(0.5, array![0.0], array![[1.0]]).unwrap(),
///     Cluster::new(0.5, array![5.0], array![[1.0]]).unwrap(),
/// ]).unwrap();
///
/// let h = model.posterior_probabilities(&[0.2]).unwrap();
/// assert!(h[0] > 0.99);
///
/// let only_second = model.posterior_probabilities_filtered(&[0.2], &AcceptOnly::new([1])).unwrap();
/// assert_eq!(only_second, vec![0.0, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct ClusterModel {
    clusters: Vec<Cluster>,
}

impl ClusterModel {
    /// Assemble a model from clusters in the given order.
    ///
    /// Every cluster must have the same dimension and there must be at least one.
    pub fn new(clusters: Vec<Cluster>) -> Result<Self> {
        let d = match clusters.first() {
            Some(c) => c.distribution.dimension(),
            None => {
                return Err(Error::InvalidParameter {
                    name: "clusters",
                    value: "0".into(),
                    reason: "a cluster model needs at least one cluster".into(),
                })
            }
        };
        if let Some(c) = clusters.iter().find(|c| c.distribution.dimension() != d) {
            return Err(Error::InvalidDimension {
                what: "cluster mean",
                expected: d,
                actual: c.distribution.dimension(),
            });
        }
        Ok(Self { clusters })
    }

    /// Deep copy of engine clusters, sorted by `order`
    pub(crate) fn snapshot(clusters: &[Cluster], order: &ClusterOrder) -> Self {
        let mut clusters = clusters.to_vec();
        order.sort(&mut clusters);
        Self { clusters }
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Feature vector dimension D
    pub fn dimension(&self) -> usize {
        self.clusters[0].distribution.dimension()
    }

    /// Mean of cluster `k`. Panics if `k >= cluster_count()`.
    pub fn mean(&self, k: usize) -> ArrayView1<'_, f64> {
        self.clusters[k].mean()
    }

    /// Prior probability of cluster `k`. Panics if `k >= cluster_count()`.
    pub fn prior_probability(&self, k: usize) -> f64 {
        self.clusters[k].prior
    }

    pub fn cluster(&self, k: usize) -> &Cluster {
        &self.clusters[k]
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Posterior probability of each cluster for `point`.
    pub fn posterior_probabilities(&self, point: &[f64]) -> Result<Vec<f64>> {
        self.posterior_probabilities_filtered(point, &AcceptAll)
    }

    /// Posterior probabilities restricted to the clusters `filter` accepts.
    ///
    /// Rejected clusters get 0.0 and are excluded from the normalization, so
    /// the accepted entries sum to one.
    pub fn posterior_probabilities_filtered<F>(&self, point: &[f64], filter: &F) -> Result<Vec<f64>>
    where
        F: IndexFilter + ?Sized,
    {
        self.check_dimension(point.len())?;
        let mut h = Array1::zeros(self.clusters.len());
        soft_posterior(&self.clusters, ArrayView1::from(point), filter, h.view_mut());
        Ok(h.to_vec())
    }

    pub(crate) fn check_dimension(&self, d: usize) -> Result<()> {
        if d != self.dimension() {
            return Err(Error::InvalidDimension {
                what: "point",
                expected: self.dimension(),
                actual: d,
            });
        }
        Ok(())
    }
}
