//! Pasquill-Gifford stability classes from surface conditions.

use crate::StabilityError;

use mesh::{Grid, Mesh};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasquillClass {
  /// Very unstable
  A,
  AB,
  B,
  BC,
  C,
  CD,
  /// Neutral
  D,
  E,
  /// Very stable
  F,
}

impl PasquillClass {
  /// Classifies a surface cell by incoming shortwave radiation `qsw` (W/m^2),
  /// cloud cover fraction and wind speed (m/s).
  pub fn classify(qsw: f64, cloud_cover: f64, speed: f64) -> Self {
    use PasquillClass::*;
    if qsw > 600.0 {
      match speed {
        s if s < 2.0 => A,
        s if s < 3.0 => AB,
        s if s < 5.0 => B,
        _ => C,
      }
    } else if qsw > 350.0 {
      match speed {
        s if s < 2.0 => AB,
        s if s < 3.0 => B,
        s if s < 5.0 => BC,
        s if s < 6.0 => CD,
        _ => D,
      }
    } else if qsw > 0.0 {
      match speed {
        s if s < 2.0 => B,
        s if s < 5.0 => C,
        _ => D,
      }
    } else if cloud_cover > 0.5 {
      if speed < 3.0 {
        E
      } else {
        D
      }
    } else {
      match speed {
        s if s < 3.0 => F,
        s if s < 5.0 => E,
        _ => D,
      }
    }
  }

  pub fn alpha(self) -> f64 {
    match self {
      Self::A => 5.0,
      Self::AB => 4.25,
      Self::B => 3.5,
      Self::BC => 2.75,
      Self::C => 2.0,
      Self::CD => 1.5,
      Self::D => 1.0,
      Self::E => 0.5,
      Self::F => 0.2,
    }
  }
}

/// Incoming shortwave radiation at the surface.
///
/// Solar geometry, shading and the diurnal model live outside of this crate.
pub trait ShortwaveModel: Sync {
  fn qsw(&self, i: usize, j: usize, cloud_cover: f64) -> f64;
}

/// Same radiation everywhere.
#[derive(Debug, Clone, Copy)]
pub struct ConstantShortwave(pub f64);
impl ShortwaveModel for ConstantShortwave {
  fn qsw(&self, _i: usize, _j: usize, _cloud_cover: f64) -> f64 {
    self.0
  }
}

/// Precomputed radiation per surface cell.
impl ShortwaveModel for Grid {
  fn qsw(&self, i: usize, j: usize, _cloud_cover: f64) -> f64 {
    self.get(i, j)
  }
}

pub(crate) fn check_grid(what: &'static str, grid: &Grid, mesh: &Mesh) -> Result<(), StabilityError> {
  if grid.nrows() != mesh.nrows() || grid.ncols() != mesh.ncols() {
    return Err(StabilityError::GridMismatch {
      what,
      got_rows: grid.nrows(),
      got_cols: grid.ncols(),
      nrows: mesh.nrows(),
      ncols: mesh.ncols(),
    });
  }
  Ok(())
}

/// Classifies every surface cell and extends the alpha of the class over
/// the whole column.
pub fn pasquill_alpha_field(
  mesh: &Mesh,
  shortwave: &dyn ShortwaveModel,
  cloud_cover: &Grid,
  speed: &Grid,
) -> Result<Vec<f64>, StabilityError> {
  check_grid("cloud cover", cloud_cover, mesh)?;
  check_grid("speed", speed, mesh)?;

  let surface: Vec<f64> = (0..mesh.nnodes_per_layer())
    .into_par_iter()
    .map(|n| {
      let (i, j) = (n / mesh.ncols(), n % mesh.ncols());
      let cloud = cloud_cover.get(i, j);
      let qsw = shortwave.qsw(i, j, cloud);
      PasquillClass::classify(qsw, cloud, speed.get(i, j)).alpha()
    })
    .collect();

  Ok(
    (0..mesh.nnodes())
      .map(|n| surface[mesh.ground_node(n)])
      .collect(),
  )
}
