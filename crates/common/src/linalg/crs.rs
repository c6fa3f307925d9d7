//! Compressed row storage (CRS) matrices.
//!
//! The storage scheme is part of the type, so every kernel is only
//! available for the layout it is correct for.

use super::LinalgError;

use rayon::prelude::*;
use std::{marker::PhantomData, ops::Range};

pub trait Storage: Copy + Default + Send + Sync + 'static {
  /// Position of the diagonal entry of `row` in the value array.
  fn diagonal_position(row_ptr: &[usize], col_ind: &[usize], row: usize) -> Option<usize>;
}

/// Only the upper triangle including the diagonal is stored.
/// The diagonal is the first entry of every row.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymmetricUpper;
impl Storage for SymmetricUpper {
  fn diagonal_position(row_ptr: &[usize], col_ind: &[usize], row: usize) -> Option<usize> {
    let first = row_ptr[row];
    (first < row_ptr[row + 1] && col_ind[first] == row).then_some(first)
  }
}

/// Every nonzero entry is stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct General;
impl Storage for General {
  fn diagonal_position(row_ptr: &[usize], col_ind: &[usize], row: usize) -> Option<usize> {
    (row_ptr[row]..row_ptr[row + 1]).find(|&l| col_ind[l] == row)
  }
}

#[derive(Debug, Clone)]
pub struct CrsMatrix<S: Storage = SymmetricUpper> {
  nrows: usize,
  ncols: usize,
  row_ptr: Vec<usize>,
  col_ind: Vec<usize>,
  values: Vec<f64>,
  storage: PhantomData<S>,
}

impl<S: Storage> CrsMatrix<S> {
  fn check_layout(
    nrows: usize,
    ncols: usize,
    row_ptr: &[usize],
    col_ind: &[usize],
    nvalues: usize,
  ) -> Result<(), LinalgError> {
    if row_ptr.len() != nrows + 1 {
      return Err(LinalgError::InvalidStructure(format!(
        "row_ptr has {} entries, expected {}",
        row_ptr.len(),
        nrows + 1
      )));
    }
    if row_ptr.windows(2).any(|w| w[0] > w[1]) {
      return Err(LinalgError::InvalidStructure(
        "row_ptr is not monotonically non-decreasing".into(),
      ));
    }
    let nnz = row_ptr[nrows];
    if row_ptr[0] != 0 || nnz != col_ind.len() || nnz != nvalues {
      return Err(LinalgError::InvalidStructure(format!(
        "row_ptr spans {}..{} but there are {} column indices and {} values",
        row_ptr[0],
        nnz,
        col_ind.len(),
        nvalues
      )));
    }
    if let Some(&col) = col_ind.iter().find(|&&c| c >= ncols) {
      return Err(LinalgError::InvalidStructure(format!(
        "column index {col} out of range for {ncols} columns"
      )));
    }
    Ok(())
  }

  pub fn nrows(&self) -> usize {
    self.nrows
  }
  pub fn ncols(&self) -> usize {
    self.ncols
  }
  pub fn nnz(&self) -> usize {
    self.values.len()
  }
  pub fn row_ptr(&self) -> &[usize] {
    &self.row_ptr
  }
  pub fn col_ind(&self) -> &[usize] {
    &self.col_ind
  }
  pub fn values(&self) -> &[f64] {
    &self.values
  }
  pub fn values_mut(&mut self) -> &mut [f64] {
    &mut self.values
  }

  pub fn row_range(&self, row: usize) -> Range<usize> {
    self.row_ptr[row]..self.row_ptr[row + 1]
  }

  /// Slot of entry `(row, col)` in the value array.
  ///
  /// Linear search over the stored columns of `row`.
  pub fn position(&self, row: usize, col: usize) -> Option<usize> {
    self.row_range(row).find(|&l| self.col_ind[l] == col)
  }

  pub fn diagonal_position(&self, row: usize) -> Option<usize> {
    S::diagonal_position(&self.row_ptr, &self.col_ind, row)
  }

  pub fn diagonal(&self, row: usize) -> Option<f64> {
    self.diagonal_position(row).map(|l| self.values[l])
  }

  /// Zeroes the stored entries selected by `predicate(row, col)`.
  /// The pattern is kept.
  pub fn set_zero<F>(&mut self, predicate: F)
  where
    F: Fn(usize, usize) -> bool,
  {
    for row in 0..self.nrows {
      for l in self.row_ptr[row]..self.row_ptr[row + 1] {
        if predicate(row, self.col_ind[l]) {
          self.values[l] = 0.0;
        }
      }
    }
  }
}

impl CrsMatrix<SymmetricUpper> {
  pub fn try_from_parts(
    nrows: usize,
    row_ptr: Vec<usize>,
    col_ind: Vec<usize>,
    values: Vec<f64>,
  ) -> Result<Self, LinalgError> {
    Self::check_layout(nrows, nrows, &row_ptr, &col_ind, values.len())?;
    for row in 0..nrows {
      let range = row_ptr[row]..row_ptr[row + 1];
      if range.is_empty() || col_ind[range.start] != row {
        return Err(LinalgError::InvalidStructure(format!(
          "row {row} does not start with its diagonal"
        )));
      }
      if col_ind[range].windows(2).any(|w| w[0] >= w[1]) {
        return Err(LinalgError::InvalidStructure(format!(
          "row {row} is not strictly increasing in its upper-triangular columns"
        )));
      }
    }
    Ok(Self {
      nrows,
      ncols: nrows,
      row_ptr,
      col_ind,
      values,
      storage: PhantomData,
    })
  }

  pub fn from_pattern(
    nrows: usize,
    row_ptr: Vec<usize>,
    col_ind: Vec<usize>,
  ) -> Result<Self, LinalgError> {
    let nnz = col_ind.len();
    Self::try_from_parts(nrows, row_ptr, col_ind, vec![0.0; nnz])
  }

  /// $y = A x$ for symmetric matrices stored as their upper triangle.
  ///
  /// The row-local products run in parallel, the mirrored strictly
  /// lower contributions are scattered sequentially.
  pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
    assert_eq!(x.len(), self.ncols);
    assert_eq!(y.len(), self.nrows);

    y.par_iter_mut().enumerate().for_each(|(row, yi)| {
      *yi = self
        .row_range(row)
        .map(|l| self.values[l] * x[self.col_ind[l]])
        .sum();
    });

    for row in 0..self.nrows {
      let xi = x[row];
      for l in self.row_range(row).skip(1) {
        y[self.col_ind[l]] += self.values[l] * xi;
      }
    }
  }
}

impl CrsMatrix<General> {
  pub fn try_from_parts(
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_ind: Vec<usize>,
    values: Vec<f64>,
  ) -> Result<Self, LinalgError> {
    Self::check_layout(nrows, ncols, &row_ptr, &col_ind, values.len())?;
    Ok(Self {
      nrows,
      ncols,
      row_ptr,
      col_ind,
      values,
      storage: PhantomData,
    })
  }

  /// $y = A x$
  pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
    assert_eq!(x.len(), self.ncols);
    assert_eq!(y.len(), self.nrows);

    y.par_iter_mut().enumerate().for_each(|(row, yi)| {
      *yi = self
        .row_range(row)
        .map(|l| self.values[l] * x[self.col_ind[l]])
        .sum();
    });
  }

  /// $y = A^T x$
  pub fn transpose_mul_vec(&self, x: &[f64], y: &mut [f64]) {
    assert_eq!(x.len(), self.nrows);
    assert_eq!(y.len(), self.ncols);

    y.iter_mut().for_each(|yi| *yi = 0.0);
    for row in 0..self.nrows {
      let xi = x[row];
      for l in self.row_range(row) {
        y[self.col_ind[l]] += self.values[l] * xi;
      }
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  /// [[4,1,0],[1,4,1],[0,1,4]]
  fn tridiag() -> CrsMatrix<SymmetricUpper> {
    CrsMatrix::<SymmetricUpper>::try_from_parts(
      3,
      vec![0, 2, 4, 5],
      vec![0, 1, 1, 2, 2],
      vec![4.0, 1.0, 4.0, 1.0, 4.0],
    )
    .unwrap()
  }

  #[test]
  fn symmetric_spmv_mirrors_upper_triangle() {
    let a = tridiag();
    let mut y = vec![0.0; 3];
    a.mul_vec(&[1.0, 2.0, 3.0], &mut y);
    assert_eq!(y, vec![6.0, 12.0, 14.0]);
  }

  #[test]
  fn general_spmv_and_transpose() {
    // [[1,2],[0,3],[4,0]]
    let a =
      CrsMatrix::<General>::try_from_parts(3, 2, vec![0, 2, 3, 4], vec![0, 1, 1, 0], vec![
        1.0, 2.0, 3.0, 4.0,
      ])
      .unwrap();

    let mut y = vec![0.0; 3];
    a.mul_vec(&[1.0, 1.0], &mut y);
    assert_eq!(y, vec![3.0, 3.0, 4.0]);

    let mut z = vec![0.0; 2];
    a.transpose_mul_vec(&[1.0, 1.0, 1.0], &mut z);
    assert_eq!(z, vec![5.0, 5.0]);

    assert_eq!(a.diagonal(1), Some(3.0));
    assert_eq!(a.diagonal(2), None);
  }

  #[test]
  fn rejects_lower_entries_and_missing_diagonal() {
    let lower = CrsMatrix::<SymmetricUpper>::try_from_parts(
      2,
      vec![0, 1, 3],
      vec![0, 1, 0],
      vec![1.0, 1.0, 1.0],
    );
    assert!(lower.is_err());

    let no_diag =
      CrsMatrix::<SymmetricUpper>::try_from_parts(2, vec![0, 1, 1], vec![1], vec![1.0]);
    assert!(no_diag.is_err());
  }

  #[test]
  fn set_zero_keeps_pattern() {
    let mut a = tridiag();
    a.set_zero(|r, c| r == 2 || c == 2);
    assert_eq!(a.nnz(), 5);
    assert_eq!(a.values(), &[4.0, 1.0, 4.0, 0.0, 0.0]);
  }

  #[test]
  fn position_lookup() {
    let a = tridiag();
    assert_eq!(a.position(1, 2), Some(3));
    assert_eq!(a.position(0, 2), None);
    assert_eq!(a.diagonal(2), Some(4.0));
  }
}
