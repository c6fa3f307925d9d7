//! Module for the variational mass conservation solver.
//!
//! Finds the potential $phi$ whose gradient corrects the initial wind `U0`
//! into a divergence free field with minimal weighted change.

use crate::{
  assemble::{self, GalMat, GalVec},
  io,
  operators::MassConservationElsys,
  problems::check_cancel,
  Error, SimulationConfig,
};

use common::{
  linalg::{self, SolveStats},
  progress::Progress,
};
use mesh::{gradient::smoothed_gradient, Mesh, ReferenceElement, VectorField};
use stability::{CharacteristicHeight, ShortwaveModel, Stability, StabilityContext};

use rayon::prelude::*;

/// Allocated by [`MassConservation::initialize`].
#[derive(Debug)]
struct Buffers {
  phi: Vec<f64>,
  rhs: GalVec,
  galmat: GalMat,
  boundary: Vec<bool>,
  /// `phi` holds a converged solution of the current system.
  solved: bool,
}

#[derive(Debug)]
pub struct MassConservation<'a> {
  mesh: &'a Mesh,
  config: SimulationConfig,
  reference: ReferenceElement,
  u0: VectorField,
  alpha_v: Option<Vec<f64>>,
  buffers: Option<Buffers>,
}

impl<'a> MassConservation<'a> {
  pub fn new(mesh: &'a Mesh, u0: VectorField, config: SimulationConfig) -> Result<Self, Error> {
    config.validate()?;
    if u0.len() != mesh.nnodes() {
      return Err(Error::FieldLength {
        what: "U0",
        got: u0.len(),
        expected: mesh.nnodes(),
      });
    }
    Ok(Self {
      mesh,
      reference: ReferenceElement::new(config.quad_rule),
      config,
      u0,
      alpha_v: None,
      buffers: None,
    })
  }

  /// Allocates the potential and the linear system with its pattern.
  pub fn initialize(&mut self) -> Result<(), Error> {
    if self.buffers.is_some() {
      return Err(Error::AlreadyInitialized);
    }
    let nnodes = self.mesh.nnodes();
    self.buffers = Some(Buffers {
      phi: vec![0.0; nnodes],
      rhs: vec![0.0; nnodes],
      galmat: assemble::crs_pattern(self.mesh)?,
      boundary: assemble::boundary_flags(self.mesh),
      solved: false,
    });
    Ok(())
  }

  pub fn deallocate(&mut self) {
    self.buffers = None;
  }

  pub fn set_alpha_coefficients(
    &mut self,
    stability: &Stability,
    shortwave: &dyn ShortwaveModel,
    characteristic_height: &dyn CharacteristicHeight,
  ) -> Result<(), Error> {
    let ctx = StabilityContext {
      mesh: self.mesh,
      reference: &self.reference,
      u0: &self.u0,
      shortwave,
      characteristic_height,
    };
    self.alpha_v = Some(stability.vertical_alpha(self.config.alpha_h, &ctx)?);
    Ok(())
  }

  /// Assembles stiffness and load, overwriting the previous values.
  pub fn discretize(&mut self) -> Result<(), Error> {
    let alpha_v = self.alpha_v.as_deref().ok_or(Error::MissingAlpha)?;
    let buffers = self.buffers.as_mut().ok_or(Error::NotInitialized("discretize"))?;
    let elsys = MassConservationElsys {
      u0: &self.u0,
      alpha_h: self.config.alpha_h,
      alpha_v,
    };
    buffers.solved = false;
    assemble::assemble_system(
      self.mesh,
      &self.reference,
      &elsys,
      &mut buffers.galmat,
      std::slice::from_mut(&mut buffers.rhs),
    )
  }

  /// Zero potential on the lateral faces and the top.
  pub fn set_boundary_conditions(&mut self) -> Result<(), Error> {
    let buffers = self
      .buffers
      .as_mut()
      .ok_or(Error::NotInitialized("set_boundary_conditions"))?;
    buffers.solved = false;
    assemble::fix_dofs_zero(&buffers.boundary, &mut buffers.galmat, &mut buffers.rhs);
    Ok(())
  }

  /// On failure `phi` is left unsolved and no velocity can be computed from it.
  pub fn solve(&mut self, progress: &dyn Progress) -> Result<SolveStats, Error> {
    let buffers = self.buffers.as_mut().ok_or(Error::NotInitialized("solve"))?;
    buffers.solved = false;
    if let Some(dir) = &self.config.system_out {
      io::write_system(&buffers.galmat, &buffers.rhs, dir)?;
    }
    let stats = linalg::solve(
      self.config.solver,
      &buffers.galmat,
      &mut buffers.phi,
      &buffers.rhs,
      &self.config.solver_config,
      progress,
    )?;
    buffers.solved = true;
    tracing::info!(
      "solved for the potential in {} iterations, residual {:e}",
      stats.iterations,
      stats.residual
    );
    Ok(stats)
  }

  /// $U = U_0 + R nabla phi$ with the smoothed nodal gradient.
  /// The ground layer is set to zero.
  pub fn compute_uvw_field(&self) -> Result<VectorField, Error> {
    let buffers = self.solved_buffers("compute_uvw_field")?;
    let alpha_v = self.alpha_v.as_deref().ok_or(Error::MissingAlpha)?;

    let grad = smoothed_gradient(self.mesh, &self.reference, &buffers.phi)?;
    let rh = (2.0 * self.config.alpha_h * self.config.alpha_h).recip();

    let mut u = self.u0.clone();
    u.u.par_iter_mut().zip(&grad.u).for_each(|(x, g)| *x += rh * g);
    u.v.par_iter_mut().zip(&grad.v).for_each(|(x, g)| *x += rh * g);
    u.w
      .par_iter_mut()
      .zip(&grad.w)
      .zip(alpha_v)
      .for_each(|((x, g), av)| *x += g / (2.0 * av * av));
    u.zero_ground(self.mesh.nnodes_per_layer());
    Ok(u)
  }

  /// Writes the configured VTK dumps.
  pub fn write_phi_and_rhs(&self) -> Result<(), Error> {
    let buffers = self.solved_buffers("write_phi_and_rhs")?;
    if let Some(path) = &self.config.phi_out {
      io::write_scalar_field(self.mesh, "PHI", &buffers.phi, path)?;
    }
    if let Some(path) = &self.config.rhs_out {
      io::write_scalar_field(self.mesh, "RHS", &buffers.rhs, path)?;
    }
    Ok(())
  }

  fn solved_buffers(&self, operation: &'static str) -> Result<&Buffers, Error> {
    let buffers = self.buffers.as_ref().ok_or(Error::NotInitialized(operation))?;
    if !buffers.solved {
      return Err(Error::NotSolved(operation));
    }
    Ok(buffers)
  }

  /// Runs all phases, polling for cancellation in between.
  pub fn run(
    &mut self,
    stability: &Stability,
    shortwave: &dyn ShortwaveModel,
    characteristic_height: &dyn CharacteristicHeight,
    progress: &dyn Progress,
  ) -> Result<VectorField, Error> {
    progress.message("Initializing mass conservation...");
    self.initialize()?;
    self.set_alpha_coefficients(stability, shortwave, characteristic_height)?;
    check_cancel(progress)?;

    progress.message("Discretizing...");
    self.discretize()?;
    self.set_boundary_conditions()?;
    check_cancel(progress)?;

    progress.message("Solving...");
    self.solve(progress)?;
    check_cancel(progress)?;

    progress.message("Computing velocity field...");
    let u = self.compute_uvw_field()?;
    self.write_phi_and_rhs()?;
    Ok(u)
  }

  pub fn mesh(&self) -> &Mesh {
    self.mesh
  }
  pub fn u0(&self) -> &VectorField {
    &self.u0
  }
  pub fn alpha_v(&self) -> Option<&[f64]> {
    self.alpha_v.as_deref()
  }
  /// `None` unless the last solve converged.
  pub fn phi(&self) -> Option<&[f64]> {
    self
      .buffers
      .as_ref()
      .filter(|b| b.solved)
      .map(|b| b.phi.as_slice())
  }
  pub fn rhs(&self) -> Option<&[f64]> {
    self.buffers.as_ref().map(|b| b.rhs.as_slice())
  }
  pub fn galmat(&self) -> Option<&GalMat> {
    self.buffers.as_ref().map(|b| &b.galmat)
  }
}
