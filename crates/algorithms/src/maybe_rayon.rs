//! Parallel or serial iteration for the EM passes.
//!
//! Call sites write `into_par_iter()` on point ranges, cluster ranges and
//! ndarray axis iterators. With `parallel`, that is rayon (axis iterators get
//! their impls from `ndarray/rayon`). Without it, the shim below turns the
//! call into `into_iter()` and the rest of the chain runs on `Iterator`.
//! Each work item writes only its own row or cluster, so both builds give
//! the same results.

#[cfg(feature = "parallel")]
pub(crate) use rayon::prelude::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

#[cfg(not(feature = "parallel"))]
mod serial {
    /// `into_par_iter()` for builds without rayon.
    pub(crate) trait IntoParallelIterator: IntoIterator + Sized {
        fn into_par_iter(self) -> Self::IntoIter {
            self.into_iter()
        }
    }

    impl<I: IntoIterator> IntoParallelIterator for I {}
}

#[cfg(not(feature = "parallel"))]
pub(crate) use serial::IntoParallelIterator;
