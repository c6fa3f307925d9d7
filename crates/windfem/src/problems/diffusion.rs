//! Module for the turbulent diffusion of a wind field, a parabolic PDE
//! solved component wise.

use crate::{
  assemble::{self, GalMat, GalVec},
  config::DiffusionScheme,
  io,
  operators::DiffusionElsys,
  problems::check_cancel,
  Error, SimulationConfig,
};

use common::{linalg, progress::Progress};
use mesh::{gradient::smoothed_gradient, Mesh, ReferenceElement, VectorField};

#[derive(Debug)]
struct Buffers {
  height_above_ground: Vec<f64>,
  /// Only for the implicit schemes.
  galmat: Option<GalMat>,
  /// Nodes keeping their value over a step of an implicit scheme.
  dirichlet: Vec<bool>,
}

#[derive(Debug)]
pub struct Diffusion<'a> {
  mesh: &'a Mesh,
  config: SimulationConfig,
  reference: ReferenceElement,
  buffers: Option<Buffers>,
}

impl<'a> Diffusion<'a> {
  pub fn new(mesh: &'a Mesh, config: SimulationConfig) -> Result<Self, Error> {
    config.validate()?;
    Ok(Self {
      mesh,
      reference: ReferenceElement::new(config.quad_rule),
      config,
      buffers: None,
    })
  }

  pub fn scheme(&self) -> DiffusionScheme {
    self.config.diffusion_scheme
  }

  pub fn initialize(&mut self) -> Result<(), Error> {
    if self.buffers.is_some() {
      return Err(Error::AlreadyInitialized);
    }
    let galmat = match self.scheme() {
      DiffusionScheme::LumpedCapacitance => None,
      _ => Some(assemble::crs_pattern(self.mesh)?),
    };
    self.buffers = Some(Buffers {
      height_above_ground: self.mesh.height_above_ground(),
      galmat,
      dirichlet: assemble::boundary_and_ground_flags(self.mesh),
    });
    Ok(())
  }

  pub fn deallocate(&mut self) {
    self.buffers = None;
  }

  /// Advances `u` by one time step. Ground nodes keep their value.
  pub fn step(&mut self, u: &VectorField, progress: &dyn Progress) -> Result<VectorField, Error> {
    let nnodes = self.mesh.nnodes();
    if u.len() != nnodes {
      return Err(Error::FieldLength {
        what: "velocity",
        got: u.len(),
        expected: nnodes,
      });
    }
    let buffers = self.buffers.as_mut().ok_or(Error::NotInitialized("step"))?;

    let speed = u.horizontal_speed();
    let dspeed = smoothed_gradient(self.mesh, &self.reference, &speed)?;
    let elsys = DiffusionElsys {
      scheme: self.config.diffusion_scheme,
      dt: self.config.dt,
      u,
      height_above_ground: &buffers.height_above_ground,
      dspeed_dz: &dspeed.w,
    };

    match buffers.galmat.as_mut() {
      None => {
        let (cl, rhs) = assemble::assemble_lumped(self.mesh, &self.reference, &elsys)?;
        let dt = self.config.dt;
        let nground = self.mesh.nnodes_per_layer();
        let mut next = u.clone();
        for (comp, rhs) in next.components_mut().into_iter().zip(&rhs) {
          for n in nground..nnodes {
            comp[n] += rhs[n] / cl[n] * dt;
          }
        }
        Ok(next)
      }
      Some(galmat) => {
        let mut rhs: Vec<GalVec> = vec![Vec::new(); 3];
        assemble::assemble_system(self.mesh, &self.reference, &elsys, galmat, &mut rhs)?;
        assemble::fix_dofs_coeff(&buffers.dirichlet, &u.components(), galmat, &mut rhs);

        if let Some(dir) = &self.config.system_out {
          io::write_system(galmat, &rhs[0], dir)?;
        }

        let mut next = u.clone();
        for (comp, b) in next.components_mut().into_iter().zip(&rhs) {
          let stats = linalg::solve(
            self.config.solver,
            galmat,
            comp,
            b,
            &self.config.solver_config,
            progress,
          )?;
          tracing::debug!("diffusion component solved in {} iterations", stats.iterations);
        }
        Ok(next)
      }
    }
  }

  /// Runs `nsteps` time steps, polling for cancellation after each.
  pub fn run(
    &mut self,
    u0: &VectorField,
    nsteps: usize,
    progress: &dyn Progress,
  ) -> Result<VectorField, Error> {
    if self.buffers.is_none() {
      self.initialize()?;
    }
    let mut u = u0.clone();
    for istep in 0..nsteps {
      tracing::info!("diffusion step={istep}/{nsteps} scheme={:?}", self.scheme());
      u = self.step(&u, progress)?;
      check_cancel(progress)?;
    }
    Ok(u)
  }
}
