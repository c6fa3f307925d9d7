//! Conversions between CRS storage and nalgebra matrices.
//! Mostly used to cross check assembled systems against dense references.

use super::{
  crs::{CrsMatrix, Storage, SymmetricUpper},
  LinalgError,
};

pub type Vector = na::DVector<f64>;
pub type Matrix = na::DMatrix<f64>;
pub type CsrMatrix = nas::CsrMatrix<f64>;

pub trait CrsExpand {
  /// All entries of the represented matrix as `(row, col, value)`.
  fn full_triplets(&self) -> Vec<(usize, usize, f64)>;
}
impl CrsExpand for CrsMatrix<SymmetricUpper> {
  fn full_triplets(&self) -> Vec<(usize, usize, f64)> {
    let mut triplets = Vec::with_capacity(2 * self.nnz());
    for row in 0..self.nrows() {
      for l in self.row_range(row) {
        let col = self.col_ind()[l];
        let val = self.values()[l];
        triplets.push((row, col, val));
        if col != row {
          triplets.push((col, row, val));
        }
      }
    }
    triplets
  }
}
impl CrsExpand for CrsMatrix<super::General> {
  fn full_triplets(&self) -> Vec<(usize, usize, f64)> {
    (0..self.nrows())
      .flat_map(|row| self.row_range(row).map(move |l| (row, l)))
      .map(|(row, l)| (row, self.col_ind()[l], self.values()[l]))
      .collect()
  }
}

pub fn crs_to_nalgebra_csr<S: Storage>(a: &CrsMatrix<S>) -> CsrMatrix
where
  CrsMatrix<S>: CrsExpand,
{
  let mut coo = nas::CooMatrix::new(a.nrows(), a.ncols());
  for (r, c, v) in a.full_triplets() {
    coo.push(r, c, v);
  }
  CsrMatrix::from(&coo)
}

pub fn crs_to_dense<S: Storage>(a: &CrsMatrix<S>) -> Matrix
where
  CrsMatrix<S>: CrsExpand,
{
  let mut dense = Matrix::zeros(a.nrows(), a.ncols());
  for (r, c, v) in a.full_triplets() {
    dense[(r, c)] += v;
  }
  dense
}

/// Upper triangle of a dense symmetric matrix, keeping the diagonal
/// even where it is zero.
pub fn upper_crs_from_dense(m: &Matrix) -> Result<CrsMatrix<SymmetricUpper>, LinalgError> {
  assert!(m.is_square());
  let n = m.nrows();
  let mut row_ptr = Vec::with_capacity(n + 1);
  let mut col_ind = Vec::new();
  let mut values = Vec::new();
  for row in 0..n {
    row_ptr.push(col_ind.len());
    for col in row..n {
      let v = m[(row, col)];
      if col == row || v != 0.0 {
        col_ind.push(col);
        values.push(v);
      }
    }
  }
  row_ptr.push(col_ind.len());
  CrsMatrix::<SymmetricUpper>::try_from_parts(n, row_ptr, col_ind, values)
}
