//! # emclust Core
//!
//! Core types and traits for the emclust clustering engine.
//!
//! This crate provides:
//! - `PointTable`: read-only table of feature vectors (one row per pixel)
//! - `Error`: the error taxonomy shared by every clustering operation
//! - Algorithm traits for consistent API

pub mod error;
pub mod points;

pub use error::{Error, Result};
pub use points::PointTable;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::points::PointTable;
    pub use crate::Algorithm;
}

/// A named operation run over a borrowed input.
///
/// Inputs such as a [`PointTable`] are only read, so `execute` borrows them
/// and the same table can feed several runs. Parameters are checked by
/// [`validate`](Algorithm::validate) before any work starts.
pub trait Algorithm {
    type Input: ?Sized;
    type Output;
    /// Run configuration; `Default` gives the usual settings
    type Params: Default;
    type Error: std::error::Error;

    /// Short identifier, e.g. for logs
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Reject parameters that can never produce a result. Accepts everything by default.
    fn validate(&self, _params: &Self::Params) -> std::result::Result<(), Self::Error> {
        Ok(())
    }

    fn execute(&self, input: &Self::Input, params: &Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// [`execute`](Algorithm::execute) with `Params::default()`
    fn execute_default(&self, input: &Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, &Self::Params::default())
    }
}
