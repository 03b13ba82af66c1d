//! Error types for emclust

use thiserror::Error;

/// Main error type for clustering operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A mean, covariance or point does not have the dimension the run expects.
    #[error("Invalid dimension for {what}: expected {expected}, got {actual}")]
    InvalidDimension {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Initialization could not find enough distinct feature vectors.
    #[error("Insufficient distinct points: could not select {requested} distinct means after {attempts} attempts")]
    InsufficientDistinctPoints { requested: usize, attempts: usize },

    /// A cluster's covariance is not positive-definite, or its weight collapsed to zero.
    #[error("Degenerate cluster {cluster}: {reason}")]
    DegenerateCluster { cluster: usize, reason: String },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Error {
    /// Attach a cluster index to a [`Error::DegenerateCluster`].
    ///
    /// Densities are built without knowing which cluster they belong to and
    /// report index 0; the engine rewrites the index before surfacing the error.
    /// Other variants pass through unchanged.
    pub fn in_cluster(self, k: usize) -> Self {
        match self {
            Error::DegenerateCluster { reason, .. } => Error::DegenerateCluster { cluster: k, reason },
            other => other,
        }
    }

    pub(crate) fn dimension(what: &'static str, expected: usize, actual: usize) -> Self {
        Error::InvalidDimension {
            what,
            expected,
            actual,
        }
    }
}

/// Result type alias for clustering operations
pub type Result<T> = std::result::Result<T, Error>;
