//! Feature vector table

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// An ordered, read-only table of N feature vectors of dimension D.
///
/// Rows are feature vectors (typically one per pixel), columns are features
/// (bands or derived quantities). The table is immutable once built, so a
/// single instance can be borrowed by several clustering runs at once.
///
/// # Example
///
/// ```
/// use emclust_core::PointTable;
///
/// let table = PointTable::from_rows(&[vec![0.1, 0.2], vec![0.3, 0.4]]).unwrap();
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.dimension(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PointTable {
    /// Feature vectors in row-major order (point, feature)
    data: Array2<f64>,
}

impl PointTable {
    /// Create a table from row-major data holding `n` points of dimension `d`
    pub fn from_vec(data: Vec<f64>, n: usize, d: usize) -> Result<Self> {
        if data.len() != n * d {
            return Err(Error::dimension("point data length", n * d, data.len()));
        }
        let array = Array2::from_shape_vec((n, d), data).map_err(|e| Error::InvalidParameter {
            name: "data",
            value: format!("{} x {}", n, d),
            reason: e.to_string(),
        })?;
        Self::from_array(array)
    }

    /// Create a table from one vector per point. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let d = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * d);
        for row in rows {
            if row.len() != d {
                return Err(Error::dimension("feature vector", d, row.len()));
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(data, rows.len(), d)
    }

    /// Create a table from an ndarray of shape (points, features)
    pub fn from_array(data: Array2<f64>) -> Result<Self> {
        let (n, d) = data.dim();
        if n == 0 {
            return Err(Error::InvalidParameter {
                name: "points",
                value: "0".into(),
                reason: "point table must not be empty".into(),
            });
        }
        if d == 0 {
            return Err(Error::dimension("feature vector", 1, 0));
        }
        Ok(Self { data })
    }

    /// Number of feature vectors (N)
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Whether the table holds no points.
    ///
    /// The constructors reject empty input, so this is false for every table
    /// they return.
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Feature vector dimension (D)
    pub fn dimension(&self) -> usize {
        self.data.ncols()
    }

    /// Feature vector `i`. Panics if `i >= len()`.
    pub fn point(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    /// Iterate over all feature vectors in order
    pub fn rows(&self) -> impl ExactSizeIterator<Item = ArrayView1<'_, f64>> + '_ {
        self.data.axis_iter(Axis(0))
    }

    /// Borrow the underlying (N, D) array
    pub fn as_array(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }
}
