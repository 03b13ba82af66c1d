//! # emclust Algorithms
//!
//! Soft Gaussian-mixture clustering of feature vectors by
//! Expectation-Maximization.
//!
//! ## Modules
//!
//! - **classification**: EM engine, cluster models, index filters, membership

pub mod classification;
mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        average_members, find_clusters, find_clusters_with, most_likely_cluster,
        AcceptAll, AcceptOnly, Cluster, ClusterModel, ClusterOrder, Clusterer,
        EmParams, Exclusive, FindClusters, Gaussian, Inclusive, IndexFilter, IndexFilterExt,
    };
    pub use emclust_core::prelude::*;
}
