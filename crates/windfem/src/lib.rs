extern crate nalgebra as na;

pub mod assemble;
pub mod config;
pub mod io;
pub mod operators;
pub mod problems;

pub use config::{DiffusionScheme, EquationType, SimulationConfig};
pub use problems::{diffusion::Diffusion, mass_conservation::MassConservation};

use common::linalg::LinalgError;
use mesh::MeshError;
use stability::StabilityError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error(transparent)]
  Linalg(#[from] LinalgError),
  #[error(transparent)]
  Mesh(#[from] MeshError),
  #[error(transparent)]
  Stability(#[from] StabilityError),
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error("vtk export failed: {0}")]
  Vtk(String),
  #[error("buffers are already allocated, deallocate before initializing again")]
  AlreadyInitialized,
  #[error("{0} called before initialize")]
  NotInitialized(&'static str),
  #[error("{0} needs a converged solve of the current system")]
  NotSolved(&'static str),
  #[error("alpha coefficients have not been set")]
  MissingAlpha,
  #[error("{what} has {got} entries, expected {expected}")]
  FieldLength {
    what: &'static str,
    got: usize,
    expected: usize,
  },
  #[error("invalid configuration: {0}")]
  Config(String),
  #[error("cancelled")]
  Cancelled,
}
