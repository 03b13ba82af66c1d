//! Gaussian mixture clustering by Expectation-Maximization
//!
//! Soft (probabilistic) clustering of feature vectors:
//! - **Gaussian**: multivariate normal density with a cached Cholesky factor
//! - **Clusterer**: the EM engine (E-step, M-step, snapshots)
//! - **ClusterModel**: immutable snapshot answering posterior queries
//! - **Filters**: restrict posteriors to a subset of clusters
//! - **Membership**: hard labels, posterior tables and per-cluster averages

mod em;
mod filter;
mod find;
mod gaussian;
mod init;
mod lcg;
mod membership;
mod model;
mod posterior;

pub use em::Clusterer;
pub use filter::{AcceptAll, AcceptOnly, And, Exclusive, Inclusive, IndexFilter, IndexFilterExt, Not, Or};
pub use find::{find_clusters, find_clusters_with, EmParams, FindClusters};
pub use gaussian::Gaussian;
pub use init::{ATTEMPTS_PER_CLUSTER, INITIAL_PRIOR};
pub use lcg::Lcg48;
pub use membership::{average_members, most_likely_cluster};
pub use model::{Cluster, ClusterModel, ClusterOrder};
pub use posterior::PosteriorBranch;
