//! Iterative Krylov solvers for symmetric systems in upper CRS storage.

use super::{
  blas,
  crs::{CrsMatrix, SymmetricUpper},
  faer::FaerCholesky,
  precond::{Preconditioner, PreconditionerKind},
  LinalgError,
};
use crate::progress::Progress;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
  /// Stopping criterion. Relative residual for CG, residual estimate for MINRES.
  pub tol: f64,
  pub max_iter: usize,
  /// Progress is reported every `print_iters` iterations.
  pub print_iters: usize,
}
impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      tol: 1e-1,
      max_iter: 100_000,
      print_iters: 10,
    }
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverKind {
  /// Preconditioned CG, unpreconditioned MINRES if no preconditioner applies.
  #[default]
  ConjugateGradient,
  Minres,
  /// Sparse Cholesky factorization.
  Direct,
}

#[derive(Debug, Clone, Copy)]
pub struct SolveStats {
  pub iterations: usize,
  pub residual: f64,
  pub preconditioner: PreconditionerKind,
}

/// Maps residual reduction to an estimate of elapsed solver time.
///
/// The exponential fit was calibrated on wind simulations.
#[derive(Debug)]
pub struct ProgressEstimator {
  tol: f64,
  start_resid: Option<f64>,
  residual_percent_old: f64,
}
impl ProgressEstimator {
  pub fn new(tol: f64) -> Self {
    Self {
      tol,
      start_resid: None,
      residual_percent_old: -1.0,
    }
  }

  pub fn set_start(&mut self, resid: f64) {
    self.start_resid.get_or_insert(resid);
  }

  pub fn residual_percent(&mut self, resid: f64) -> f64 {
    let start = self.start_resid.unwrap_or(resid);
    let mut percent = 100.0 - 100.0 * ((resid - self.tol) / (start - self.tol));
    if !percent.is_finite() || percent < self.residual_percent_old {
      percent = self.residual_percent_old;
    }
    percent = percent.clamp(0.0, 100.0);
    self.residual_percent_old = percent;
    percent
  }

  /// Estimated time percent, never 100 while iterating.
  pub fn time_percent(&mut self, resid: f64) -> u32 {
    let residual_percent = self.residual_percent(resid);
    let time_percent = (1.8 * (0.0401 * residual_percent).exp()).min(99.0);
    (time_percent + 0.5) as u32
  }
}

/// Solves $A x = b$, using `x` as the initial guess for the iterative kinds.
pub fn solve(
  kind: SolverKind,
  a: &CrsMatrix<SymmetricUpper>,
  x: &mut [f64],
  b: &[f64],
  config: &SolverConfig,
  progress: &dyn Progress,
) -> Result<SolveStats, LinalgError> {
  match kind {
    SolverKind::ConjugateGradient => match conjugate_gradient(a, x, b, config, progress) {
      Err(LinalgError::NoPreconditioner) => {
        tracing::warn!("conjugate gradient has no preconditioner, trying minres");
        minres_with(a, x, b, &Preconditioner::Identity, config, progress)
      }
      res => res,
    },
    SolverKind::Minres => minres(a, x, b, config, progress),
    SolverKind::Direct => {
      let solution = FaerCholesky::new(a)?.solve(b);
      x.copy_from_slice(&solution);
      progress.solver_progress(100);
      Ok(SolveStats {
        iterations: 0,
        residual: relative_residual(a, x, b),
        preconditioner: PreconditionerKind::None,
      })
    }
  }
}

/// $norm(b - A x) / norm(b)$, with a zero `b` counting as one.
pub fn relative_residual(a: &CrsMatrix<SymmetricUpper>, x: &[f64], b: &[f64]) -> f64 {
  let mut r = vec![0.0; b.len()];
  a.mul_vec(x, &mut r);
  r.iter_mut().zip(b).for_each(|(ri, bi)| *ri = bi - *ri);
  let normb = blas::nrm2(b);
  blas::nrm2(&r) / if normb == 0.0 { 1.0 } else { normb }
}

/// Preconditioned Conjugate Gradient.
///
/// SSOR is preferred, Jacobi is the fallback.
/// Fails with [`LinalgError::NoPreconditioner`] if neither can be set up.
pub fn conjugate_gradient(
  a: &CrsMatrix<SymmetricUpper>,
  x: &mut [f64],
  b: &[f64],
  config: &SolverConfig,
  progress: &dyn Progress,
) -> Result<SolveStats, LinalgError> {
  let precond = Preconditioner::first_available(
    &[PreconditionerKind::Ssor, PreconditionerKind::Jacobi],
    a,
  )?;
  conjugate_gradient_with(a, x, b, &precond, config, progress)
}

pub fn conjugate_gradient_with(
  a: &CrsMatrix<SymmetricUpper>,
  x: &mut [f64],
  b: &[f64],
  precond: &Preconditioner,
  config: &SolverConfig,
  progress: &dyn Progress,
) -> Result<SolveStats, LinalgError> {
  let n = a.nrows();
  assert_eq!(x.len(), n);
  assert_eq!(b.len(), n);

  let tol = config.tol;
  let mut r = vec![0.0; n];
  let mut z = vec![0.0; n];
  let mut p = vec![0.0; n];
  let mut q = vec![0.0; n];

  a.mul_vec(x, &mut r);
  r.iter_mut().zip(b).for_each(|(ri, bi)| *ri = bi - *ri);

  let mut normb = blas::nrm2(b);
  if normb == 0.0 {
    normb = 1.0;
  }

  let mut resid = blas::nrm2(&r) / normb;
  if resid <= tol {
    tracing::debug!("initial residual {resid:e} already below tolerance");
    return Ok(SolveStats {
      iterations: 0,
      residual: resid,
      preconditioner: precond.kind(),
    });
  }

  let mut estimator = ProgressEstimator::new(tol);
  let mut rho_1 = 0.0;
  for iter in 1..=config.max_iter {
    precond.apply(&r, &mut z);
    let rho = blas::dot(&z, &r);
    if iter == 1 {
      blas::copy(&z, &mut p);
    } else {
      blas::xpby(&z, rho / rho_1, &mut p);
    }

    a.mul_vec(&p, &mut q);
    let alpha = rho / blas::dot(&p, &q);
    blas::axpy(alpha, &p, x);
    blas::axpy(-alpha, &q, &mut r);

    resid = blas::nrm2(&r) / normb;
    if iter == 1 {
      estimator.set_start(resid);
    }

    if iter % config.print_iters == 0 {
      tracing::debug!("cg iteration={iter} residual={resid:e} tol={tol:e}");
      progress.solver_progress(estimator.time_percent(resid));
    }

    if resid <= tol {
      progress.solver_progress(100);
      tracing::debug!("cg converged after {iter} iterations");
      return Ok(SolveStats {
        iterations: iter,
        residual: resid,
        preconditioner: precond.kind(),
      });
    }
    rho_1 = rho;
  }

  Err(LinalgError::NotConverged {
    iterations: config.max_iter,
    residual: resid,
  })
}

/// Preconditioned MINRES based on Lanczos with Givens rotations.
///
/// Jacobi is preferred, SSOR is the fallback.
/// Converges monotonically but is usually slower than CG.
pub fn minres(
  a: &CrsMatrix<SymmetricUpper>,
  x: &mut [f64],
  b: &[f64],
  config: &SolverConfig,
  progress: &dyn Progress,
) -> Result<SolveStats, LinalgError> {
  let precond = Preconditioner::first_available(
    &[PreconditionerKind::Jacobi, PreconditionerKind::Ssor],
    a,
  )?;
  minres_with(a, x, b, &precond, config, progress)
}

pub fn minres_with(
  a: &CrsMatrix<SymmetricUpper>,
  x: &mut [f64],
  b: &[f64],
  precond: &Preconditioner,
  config: &SolverConfig,
  progress: &dyn Progress,
) -> Result<SolveStats, LinalgError> {
  let n = a.nrows();
  assert_eq!(x.len(), n);
  assert_eq!(b.len(), n);

  let tol = config.tol;
  let stats = |iterations: usize, residual: f64| SolveStats {
    iterations,
    residual,
    preconditioner: precond.kind(),
  };

  let mut r = vec![0.0; n];
  let mut z = vec![0.0; n];
  let mut v = vec![0.0; n];
  let mut u = vec![0.0; n];
  let mut vold = vec![0.0; n];
  let mut uold = vec![0.0; n];
  let mut w = vec![0.0; n];
  let mut wold = vec![0.0; n];
  let mut woold = vec![0.0; n];

  a.mul_vec(x, &mut r);
  r.iter_mut().zip(b).for_each(|(ri, bi)| *ri = bi - *ri);
  let bnorm = blas::nrm2(b);

  precond.apply(&r, &mut z);
  let dp0 = blas::dot(&r, &z);
  if dp0 < 0.0 {
    return Err(LinalgError::NegativeSqrt(dp0));
  }

  let mut rnorm = blas::nrm2(&z);
  if dp0 == 0.0 || rnorm < tol {
    return Ok(stats(0, rnorm));
  }

  let mut beta = dp0.sqrt();
  let mut eta = beta;
  blas::copy(&r, &mut v);
  blas::copy(&z, &mut u);
  blas::scal(beta.recip(), &mut v);
  blas::scal(beta.recip(), &mut u);

  let (mut c, mut cold) = (1.0, 1.0);
  let (mut s, mut sold) = (0.0, 0.0);

  let mut estimator = ProgressEstimator::new(tol);
  for iter in 1..=config.max_iter {
    // Lanczos
    a.mul_vec(&u, &mut r);
    let alpha = blas::dot(&u, &r);
    precond.apply(&r, &mut z);
    blas::axpy(-alpha, &v, &mut r);
    blas::axpy(-alpha, &u, &mut z);
    blas::axpy(-beta, &vold, &mut r);
    blas::axpy(-beta, &uold, &mut z);

    let betaold = beta;
    let dp = blas::dot(&r, &z);
    if dp < -f64::EPSILON * dp0 {
      return Err(LinalgError::NegativeSqrt(dp));
    }
    beta = dp.max(0.0).sqrt();

    let coold = cold;
    cold = c;
    let soold = sold;
    sold = s;
    let rho0 = cold * alpha - coold * sold * betaold;
    let rho1 = (rho0 * rho0 + beta * beta).sqrt();
    let rho2 = sold * alpha + coold * cold * betaold;
    let rho3 = soold * betaold;
    if rho1 == 0.0 {
      break;
    }

    // Givens rotation
    c = rho0 / rho1;
    s = beta / rho1;

    std::mem::swap(&mut woold, &mut wold);
    std::mem::swap(&mut wold, &mut w);
    blas::copy(&u, &mut w);
    blas::axpy(-rho2, &wold, &mut w);
    blas::axpy(-rho3, &woold, &mut w);
    blas::scal(rho1.recip(), &mut w);

    blas::axpy(c * eta, &w, x);
    eta *= -s;

    rnorm *= s.abs();
    if iter == 1 {
      estimator.set_start(rnorm);
    }
    if rnorm < tol {
      progress.solver_progress(100);
      tracing::debug!("minres converged after {iter} iterations");
      return Ok(stats(iter, rnorm));
    }

    std::mem::swap(&mut vold, &mut v);
    std::mem::swap(&mut v, &mut r);
    std::mem::swap(&mut uold, &mut u);
    std::mem::swap(&mut u, &mut z);
    blas::scal(beta.recip(), &mut v);
    blas::scal(beta.recip(), &mut u);

    if iter % config.print_iters == 0 {
      tracing::debug!(
        "minres n={n} iteration={iter} residual norm={:e}",
        rnorm / bnorm.max(f64::MIN_POSITIVE)
      );
      progress.solver_progress(estimator.time_percent(rnorm));
    }
  }

  Err(LinalgError::NotConverged {
    iterations: config.max_iter,
    residual: rnorm,
  })
}
