extern crate nalgebra as na;

pub mod element;
pub mod field;
pub mod gradient;
pub mod grid;
pub mod mesh;
pub mod quadrature;

pub use element::{QuadPointGeometry, ReferenceElement, NNPE};
pub use field::VectorField;
pub use grid::Grid;
pub use mesh::{Mesh, MeshConfig, NodeType};
pub use quadrature::QuadRule;

pub type NodeIdx = usize;
pub type ElemIdx = usize;

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
  #[error("invalid grid: {0}")]
  InvalidGrid(String),
  #[error("bad vertical growth factor {0}, must be at least one and not exactly one")]
  VerticalGrowth(f64),
  #[error("the number of vertical layers must be at least two, got {0}")]
  Layers(usize),
  #[error("the maximum aspect ratio must be positive, got {0}")]
  AspectRatio(f64),
  #[error("domain height {height} is below the elevation of the tallest mountain ({max_elevation})")]
  DomainBelowTerrain { height: f64, max_elevation: f64 },
  #[error("invalid mesh coordinates: {0}")]
  Coordinates(String),
  #[error("volume Jacobian is zero or negative in element {elem} (det = {det:e})")]
  NonPositiveJacobian { elem: ElemIdx, det: f64 },
  #[error("nodal array has length {got}, expected {expected}")]
  FieldLength { got: usize, expected: usize },
}
