pub mod blas;
pub mod crs;
pub mod faer;
pub mod nalgebra;
pub mod precond;
pub mod solver;

pub use crs::{CrsMatrix, General, Storage, SymmetricUpper};
pub use precond::{Preconditioner, PreconditionerKind};
pub use solver::{solve, SolveStats, SolverConfig, SolverKind};

#[derive(Debug, thiserror::Error)]
pub enum LinalgError {
  #[error("invalid compressed row storage: {0}")]
  InvalidStructure(String),
  #[error("zero or non-finite diagonal entry in row {row}")]
  BadDiagonal { row: usize },
  #[error("no preconditioner could be initialized")]
  NoPreconditioner,
  #[error("solution did not converge, MAXITS reached ({iterations} iterations, residual {residual:e})")]
  NotConverged { iterations: usize, residual: f64 },
  #[error("square root of a negative number in solver ({0:e})")]
  NegativeSqrt(f64),
  #[error("sparse factorization failed: {0}")]
  Factorization(String),
}
