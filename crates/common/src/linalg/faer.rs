use faer::linalg::solvers::Solve;

use super::{
  crs::{CrsMatrix, SymmetricUpper},
  LinalgError,
};

type SparseMatrixFaer = faer::sparse::SparseRowMat<usize, f64>;

/// Upper triangular row storage maps one to one onto faer's row matrix.
pub fn crs2faer(a: &CrsMatrix<SymmetricUpper>) -> Result<SparseMatrixFaer, LinalgError> {
  let nrows = a.nrows();
  let symbolic = faer::sparse::SymbolicSparseRowMat::new_checked(
    nrows,
    nrows,
    a.row_ptr().to_vec(),
    None,
    a.col_ind().to_vec(),
  );
  Ok(faer::sparse::SparseRowMat::new(symbolic, a.values().to_vec()))
}

/// Sparse Cholesky factorization of a symmetric upper CRS matrix.
pub struct FaerCholesky {
  raw: faer::sparse::linalg::solvers::Llt<usize, f64>,
}
impl FaerCholesky {
  pub fn new(a: &CrsMatrix<SymmetricUpper>) -> Result<Self, LinalgError> {
    let raw = crs2faer(a)?
      .sp_cholesky(faer::Side::Upper)
      .map_err(|err| LinalgError::Factorization(format!("{err:?}")))?;
    Ok(Self { raw })
  }

  pub fn solve(&self, b: &[f64]) -> Vec<f64> {
    let b = faer::Col::from_fn(b.len(), |i| b[i]);
    let x = self.raw.solve(b);
    x.iter().copied().collect()
  }
}
