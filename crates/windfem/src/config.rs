//! Run configuration.

use crate::Error;

use common::linalg::{SolverConfig, SolverKind};
use mesh::{MeshConfig, QuadRule};
use serde::{Deserialize, Serialize};
use stability::Stability;

use std::path::PathBuf;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquationType {
  #[default]
  ConservationOfMass,
  Diffusion,
}

/// Time integration of the diffusion equation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffusionScheme {
  /// Explicit Euler with a row summed capacitance matrix. No linear solve.
  #[default]
  LumpedCapacitance,
  /// Crank-Nicolson.
  CentralDifference,
  /// Implicit Euler.
  BackwardDifference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
  pub equation: EquationType,
  pub diffusion_scheme: DiffusionScheme,
  /// Diffusion time step in seconds.
  pub dt: f64,
  pub quad_rule: QuadRule,
  pub alpha_h: f64,
  /// Fixed stability alpha. Neutral if absent.
  pub alpha_stability: Option<f64>,
  pub solver: SolverKind,
  pub solver_config: SolverConfig,
  pub mesh: MeshConfig,
  /// ASCII VTK dump of the potential.
  pub phi_out: Option<PathBuf>,
  /// ASCII VTK dump of the right hand side.
  pub rhs_out: Option<PathBuf>,
  /// Directory receiving `A.txt` and `b.txt` before every solve.
  pub system_out: Option<PathBuf>,
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      equation: EquationType::default(),
      diffusion_scheme: DiffusionScheme::default(),
      dt: 1.0,
      quad_rule: QuadRule::default(),
      alpha_h: 1.0,
      alpha_stability: None,
      solver: SolverKind::default(),
      solver_config: SolverConfig::default(),
      mesh: MeshConfig::default(),
      phi_out: None,
      rhs_out: None,
      system_out: None,
    }
  }
}

impl SimulationConfig {
  pub fn validate(&self) -> Result<(), Error> {
    if !(self.alpha_h > 0.0) {
      return Err(Error::Config(format!("alphaH must be positive, got {}", self.alpha_h)));
    }
    if !(self.dt > 0.0) {
      return Err(Error::Config(format!("time step must be positive, got {}", self.dt)));
    }
    if let Some(alpha) = self.alpha_stability {
      if !(alpha > 0.0) {
        return Err(Error::Config(format!("alphaStability must be positive, got {alpha}")));
      }
    }
    if !(self.solver_config.tol > 0.0) || self.solver_config.print_iters == 0 {
      return Err(Error::Config("solver tolerance and print interval must be positive".into()));
    }
    self.mesh.validate()?;
    Ok(())
  }

  /// The stability selection expressible in the configuration alone.
  /// Gridded strategies are passed to the drivers directly.
  pub fn stability(&self) -> Stability {
    self.alpha_stability.map_or(Stability::Off, Stability::Given)
  }
}
