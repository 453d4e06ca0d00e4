//! Path-wise matrices and the per-path SVD pseudo-inverse.
//!
//! A [`PathMatrix`] stores [`PathValue`] entries sparsely: an absent entry
//! reads as `0.0` everywhere. The pseudo-inverse materialises the matrix
//! path by path, inverts each realisation through an SVD and reassembles
//! the result; the per-path loop is the one hot spot of the pipeline and
//! runs on the rayon pool.

use nalgebra::DMatrix;
use rayon::prelude::*;

use simm_core::PathValue;

use crate::error::SensitivityError;

/// Singular values below this threshold are truncated in the SVD inverse.
const SVD_EPSILON: f64 = 1e-12;

/// A dense-shaped, sparsely stored matrix of path-wise values.
#[derive(Clone, Debug)]
pub struct PathMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<Option<PathValue>>,
}

impl PathMatrix {
    /// An empty (all-zero) matrix of the given shape.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            entries: vec![None; rows * cols],
        }
    }

    /// The identity matrix of size `n`.
    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::new(n, n);
        for i in 0..n {
            matrix.set(i, i, PathValue::constant(1.0));
        }
        matrix
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Stores an entry.
    pub fn set(&mut self, row: usize, col: usize, value: PathValue) {
        let index = row * self.cols + col;
        self.entries[index] = Some(value);
    }

    /// Reads an entry; `None` means zero.
    pub fn get(&self, row: usize, col: usize) -> Option<&PathValue> {
        self.entries[row * self.cols + col].as_ref()
    }

    /// Reads the realisation of an entry on one path (absent entries are
    /// zero, constants broadcast).
    pub fn entry_on_path(&self, row: usize, col: usize, path: usize) -> f64 {
        self.get(row, col).map_or(0.0, |value| value.get(path))
    }

    /// The top-left `n` x `n` block.
    pub fn top_left(&self, n: usize) -> PathMatrix {
        let mut block = PathMatrix::new(n, n);
        for row in 0..n {
            for col in 0..n {
                if let Some(value) = self.get(row, col) {
                    block.set(row, col, value.clone());
                }
            }
        }
        block
    }

    /// The Moore-Penrose pseudo-inverse, computed independently on every
    /// path through an SVD and reassembled as a `cols` x `rows` matrix.
    pub fn pseudo_inverse(&self, num_paths: usize) -> Result<PathMatrix, SensitivityError> {
        let inverses: Vec<DMatrix<f64>> = (0..num_paths)
            .into_par_iter()
            .map(|path| {
                let realisation = DMatrix::from_fn(self.rows, self.cols, |row, col| {
                    self.entry_on_path(row, col, path)
                });
                realisation
                    .svd(true, true)
                    .pseudo_inverse(SVD_EPSILON)
                    .map_err(|_| SensitivityError::SingularMatrix {
                        context: "path-wise pseudo-inverse",
                    })
            })
            .collect::<Result<_, _>>()?;

        let mut result = PathMatrix::new(self.cols, self.rows);
        for row in 0..self.cols {
            for col in 0..self.rows {
                let values: Vec<f64> = inverses.iter().map(|inv| inv[(row, col)]).collect();
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(SensitivityError::SingularMatrix {
                        context: "path-wise pseudo-inverse",
                    });
                }
                result.set(row, col, PathValue::from_values(values));
            }
        }
        Ok(result)
    }
}

/// Row-vector-by-matrix product with absent-as-zero semantics.
///
/// Summation runs over `min(vector.len(), matrix.rows())` so that a
/// truncated sensitivity vector can be applied against a full-size
/// time-zero Jacobian.
pub fn multiply_vec(vector: &[PathValue], matrix: &PathMatrix) -> Vec<PathValue> {
    let depth = vector.len().min(matrix.rows());
    (0..matrix.cols())
        .map(|col| {
            let mut sum = PathValue::zero();
            for (k, value) in vector.iter().enumerate().take(depth) {
                if let Some(entry) = matrix.get(k, col) {
                    sum = sum.add_product(value, entry);
                }
            }
            sum
        })
        .collect()
}
