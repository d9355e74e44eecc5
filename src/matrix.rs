//! Rectangular row-major matrix buffer.

use crate::{kernels, utils::MatrixElem};

/// Element type of the benchmarked matrices.
pub type Element = i32;

/// Rectangular matrix stored row-major in a single contiguous buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix<T = Element> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: MatrixElem> Matrix<T> {
    /// Creates a `rows` x `cols` matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::zero(); rows * cols],
        }
    }

    /// Creates a `rows` x `cols` matrix where the element at `(i, j)` is `i * cols + j`.
    pub fn sequential(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: (0..rows * cols).map(T::from_index).collect(),
        }
    }

    /// Creates a matrix from row-major data.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "expected {rows}x{cols}={} elements",
            rows * cols
        );
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Returns the element at row `i` and column `j`.
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[i * self.cols + j]
    }

    /// Resets every element to zero.
    pub fn fill_zero(&mut self) {
        self.data.fill(T::zero());
    }

    /// Writes the transpose of `self` into `dst` with the given kernel.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is not `cols` x `rows`.
    pub fn transpose_into(&self, dst: &mut Matrix<T>, kernel: kernels::TransposeKernel) {
        assert!(
            dst.rows == self.cols && dst.cols == self.rows,
            "destination is {}x{}, expected {}x{}",
            dst.rows,
            dst.cols,
            self.cols,
            self.rows
        );
        kernel.run(&self.data, &mut dst.data, self.rows, self.cols);
    }

    /// Returns the transpose of `self`, computed with the given kernel.
    pub fn transposed(&self, kernel: kernels::TransposeKernel) -> Matrix<T> {
        let mut dst = Matrix::zeros(self.cols, self.rows);
        self.transpose_into(&mut dst, kernel);
        dst
    }
}
