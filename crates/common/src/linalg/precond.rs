//! Preconditioners $M approx A$ applied as $z = M^(-1) r$.

use super::{
  crs::{CrsMatrix, Storage, SymmetricUpper},
  LinalgError,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Relaxation parameter of SSOR. One gives symmetric Gauss-Seidel.
pub const SSOR_OMEGA: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreconditionerKind {
  None,
  Jacobi,
  Ssor,
}

#[derive(Debug, Clone)]
pub enum Preconditioner {
  Identity,
  Jacobi(Jacobi),
  Ssor(Ssor),
}

impl Preconditioner {
  pub fn new(kind: PreconditionerKind, a: &CrsMatrix<SymmetricUpper>) -> Result<Self, LinalgError> {
    Ok(match kind {
      PreconditionerKind::None => Self::Identity,
      PreconditionerKind::Jacobi => Self::Jacobi(Jacobi::new(a)?),
      PreconditionerKind::Ssor => Self::Ssor(Ssor::new(a, SSOR_OMEGA)?),
    })
  }

  /// Tries the kinds in order and returns the first one that initializes.
  pub fn first_available(
    kinds: &[PreconditionerKind],
    a: &CrsMatrix<SymmetricUpper>,
  ) -> Result<Self, LinalgError> {
    for (i, &kind) in kinds.iter().enumerate() {
      match Self::new(kind, a) {
        Ok(precond) => return Ok(precond),
        Err(err) => {
          if let Some(next) = kinds.get(i + 1) {
            tracing::warn!("initialization of {kind:?} preconditioner failed ({err}), trying {next:?}");
          } else {
            tracing::warn!("initialization of {kind:?} preconditioner failed ({err})");
          }
        }
      }
    }
    Err(LinalgError::NoPreconditioner)
  }

  pub fn kind(&self) -> PreconditionerKind {
    match self {
      Self::Identity => PreconditionerKind::None,
      Self::Jacobi(_) => PreconditionerKind::Jacobi,
      Self::Ssor(_) => PreconditionerKind::Ssor,
    }
  }

  pub fn apply(&self, r: &[f64], z: &mut [f64]) {
    match self {
      Self::Identity => z.copy_from_slice(r),
      Self::Jacobi(jacobi) => jacobi.apply(r, z),
      Self::Ssor(ssor) => ssor.apply(r, z),
    }
  }
}

/// Diagonal scaling. Stores the inverted diagonal.
#[derive(Debug, Clone)]
pub struct Jacobi {
  inv_diag: Vec<f64>,
}
impl Jacobi {
  pub fn new<S: Storage>(a: &CrsMatrix<S>) -> Result<Self, LinalgError> {
    let inv_diag = (0..a.nrows())
      .map(|row| match a.diagonal(row) {
        Some(d) if d != 0.0 && d.is_finite() => Ok(d.recip()),
        _ => Err(LinalgError::BadDiagonal { row }),
      })
      .collect::<Result<_, _>>()?;
    Ok(Self { inv_diag })
  }

  pub fn apply(&self, r: &[f64], z: &mut [f64]) {
    z.par_iter_mut()
      .zip(r.par_iter())
      .zip(self.inv_diag.par_iter())
      .for_each(|((zi, ri), di)| *zi = ri * di);
  }
}

/// Unit lower triangular factor, stored as its transpose
/// (strictly upper part, row-wise).
#[derive(Debug, Clone)]
pub struct UnitLowerFactor {
  row_ptr: Vec<usize>,
  col_ind: Vec<usize>,
  values: Vec<f64>,
}
impl UnitLowerFactor {
  /// Forward substitution $L y = y$, in place.
  pub fn solve_in_place(&self, y: &mut [f64]) {
    let n = self.row_ptr.len() - 1;
    for row in 0..n {
      let yi = y[row];
      for l in self.row_ptr[row]..self.row_ptr[row + 1] {
        y[self.col_ind[l]] -= yi * self.values[l];
      }
    }
  }
}

/// Upper triangular factor with a non-unit diagonal stored first in each row.
#[derive(Debug, Clone)]
pub struct UpperFactor {
  matrix: CrsMatrix<SymmetricUpper>,
}
impl UpperFactor {
  /// Backward substitution $U y = y$, in place.
  pub fn solve_in_place(&self, y: &mut [f64]) {
    let a = &self.matrix;
    let (row_ptr, col_ind, values) = (a.row_ptr(), a.col_ind(), a.values());
    for row in (0..a.nrows()).rev() {
      let diag = row_ptr[row];
      let mut sum = y[row];
      for l in diag + 1..row_ptr[row + 1] {
        sum -= values[l] * y[col_ind[l]];
      }
      y[row] = sum / values[diag];
    }
  }
}

/// Symmetric successive over-relaxation.
///
/// $M = (I - omega E D^(-1)) (D - omega F)$ where $-E$ and $-F$ are the
/// strictly lower and upper parts of $A$.
#[derive(Debug, Clone)]
pub struct Ssor {
  lower: UnitLowerFactor,
  upper: UpperFactor,
}
impl Ssor {
  pub fn new(a: &CrsMatrix<SymmetricUpper>, omega: f64) -> Result<Self, LinalgError> {
    let n = a.nrows();
    let (row_ptr, col_ind, values) = (a.row_ptr(), a.col_ind(), a.values());

    let mut lt_row_ptr = Vec::with_capacity(n + 1);
    let mut lt_col_ind = Vec::with_capacity(a.nnz() - n);
    let mut lt_values = Vec::with_capacity(a.nnz() - n);
    let mut upper = a.clone();

    for row in 0..n {
      let diag = values[row_ptr[row]];
      if diag == 0.0 || !diag.is_finite() {
        return Err(LinalgError::BadDiagonal { row });
      }

      lt_row_ptr.push(lt_col_ind.len());
      for l in row_ptr[row] + 1..row_ptr[row + 1] {
        lt_col_ind.push(col_ind[l]);
        lt_values.push(omega * values[l] / diag);
        upper.values_mut()[l] = omega * values[l];
      }
    }
    lt_row_ptr.push(lt_col_ind.len());

    Ok(Self {
      lower: UnitLowerFactor {
        row_ptr: lt_row_ptr,
        col_ind: lt_col_ind,
        values: lt_values,
      },
      upper: UpperFactor { matrix: upper },
    })
  }

  pub fn apply(&self, r: &[f64], z: &mut [f64]) {
    z.copy_from_slice(r);
    self.lower.solve_in_place(z);
    self.upper.solve_in_place(z);
  }
}
