//! Cluster membership and responsibility-based averaging
//!
//! Helpers for the consumers of a fitted [`ClusterModel`]: hard assignment of
//! points to their most likely cluster, posterior tables for probability
//! bands, and per-cluster averages of companion vectors (e.g. the
//! reflectance spectra behind the feature vectors) used as endmembers.

use ndarray::{Array1, Array2, Axis};

use crate::maybe_rayon::*;
use emclust_core::{Error, PointTable, Result};

use super::filter::IndexFilter;
use super::model::ClusterModel;
use super::posterior::soft_posterior;

/// Index of the largest posterior.
///
/// Returns `None` when every posterior is zero, i.e. the point belongs to no
/// accepted cluster. Ties resolve to the lowest index.
pub fn most_likely_cluster(posteriors: &[f64]) -> Option<usize> {
    let mut best = 0;
    for (k, &p) in posteriors.iter().enumerate().skip(1) {
        if p > posteriors[best] {
            best = k;
        }
    }
    match posteriors.get(best) {
        Some(&p) if p > 0.0 => Some(best),
        _ => None,
    }
}

impl ClusterModel {
    /// Posterior probabilities for every row of `points`, shape (N, K).
    pub fn posterior_table<F>(&self, points: &PointTable, filter: &F) -> Result<Array2<f64>>
    where
        F: IndexFilter + Sync + ?Sized,
    {
        self.check_dimension(points.dimension())?;
        let clusters = self.clusters();
        let mut table = Array2::zeros((points.len(), clusters.len()));
        table
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(i, h)| {
                soft_posterior(clusters, points.point(i), filter, h);
            });
        Ok(table)
    }

    /// Most likely accepted cluster for every row of `points`.
    pub fn classify<F>(&self, points: &PointTable, filter: &F) -> Result<Vec<Option<usize>>>
    where
        F: IndexFilter + Sync + ?Sized,
    {
        self.check_dimension(points.dimension())?;
        let clusters = self.clusters();
        let k = clusters.len();
        let labels = (0..points.len())
            .into_par_iter()
            .map(|i| {
                let mut h = Array1::zeros(k);
                soft_posterior(clusters, points.point(i), filter, h.view_mut());
                h.as_slice().and_then(most_likely_cluster)
            })
            .collect();
        Ok(labels)
    }
}

/// Average `values` rows over the points that belong to each selected cluster.
///
/// Posteriors are computed for each row of `features` with `filter`. A point
/// joins the first cluster `k` that `select` accepts and whose posterior
/// exceeds `threshold` (0.5 is the usual policy), and contributes its row of
/// `values` to that cluster's average. Clusters without members get `None`.
pub fn average_members<F, S>(
    model: &ClusterModel,
    features: &PointTable,
    values: &PointTable,
    filter: &F,
    select: &S,
    threshold: f64,
) -> Result<Vec<Option<Array1<f64>>>>
where
    F: IndexFilter + ?Sized,
    S: IndexFilter + ?Sized,
{
    model.check_dimension(features.dimension())?;
    if values.len() != features.len() {
        return Err(Error::InvalidDimension {
            what: "value rows",
            expected: features.len(),
            actual: values.len(),
        });
    }

    let k_count = model.cluster_count();
    let mut sums = Array2::<f64>::zeros((k_count, values.dimension()));
    let mut counts = vec![0usize; k_count];
    let mut h = Array1::zeros(k_count);

    for (i, x) in features.rows().enumerate() {
        soft_posterior(model.clusters(), x, filter, h.view_mut());
        let member = (0..k_count).find(|&k| h[k] > threshold && select.accept(k));
        if let Some(k) = member {
            let mut sum = sums.row_mut(k);
            sum += &values.point(i);
            counts[k] += 1;
        }
    }

    Ok(sums
        .axis_iter(Axis(0))
        .zip(counts)
        .map(|(sum, count)| (count > 0).then(|| &sum / count as f64))
        .collect())
}
