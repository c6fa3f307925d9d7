//! Atmospheric stability as a field of $alpha = alpha_H / alpha_V$ ratios.
//!
//! Stable air suppresses vertical motion (small alpha), unstable air
//! favours it (large alpha).

pub mod alpha;
pub mod pasquill;
pub mod stations;
pub mod strouhal;

pub use alpha::{Stability, StabilityContext, StabilityStrategy};
pub use pasquill::{ConstantShortwave, PasquillClass, ShortwaveModel};
pub use stations::Station;
pub use strouhal::{CharacteristicHeight, InverseSquareDistance};

use mesh::MeshError;

/// Largest admissible stability alpha.
pub const ALPHA_MAX: f64 = 5.0;

#[derive(Debug, thiserror::Error)]
pub enum StabilityError {
  #[error(
    "Fill interpolation from the wx stations didn't completely fill the grids (cell {row},{col}). \
     To be sure everything is filled, let at least one wx station have an infinite influence radius."
  )]
  UnfilledInterpolation { row: usize, col: usize },
  #[error("no weather stations given")]
  NoStations,
  #[error("interpolation power must be positive, got {0}")]
  InterpolationPower(f64),
  #[error("{what} grid is {got_rows}x{got_cols}, the mesh has {nrows}x{ncols} nodes per layer")]
  GridMismatch {
    what: &'static str,
    got_rows: usize,
    got_cols: usize,
    nrows: usize,
    ncols: usize,
  },
  #[error("nodal array has length {got}, expected {expected}")]
  FieldLength { got: usize, expected: usize },
  #[error("Problem with atmospheric stability calculation: alpha {alpha} outside (0, 5] at node {node}")]
  AlphaOutOfRange { node: usize, alpha: f64 },
  #[error("{what} must be positive, got {value}")]
  NonPositive { what: &'static str, value: f64 },
  #[error(transparent)]
  Mesh(#[from] MeshError),
}
