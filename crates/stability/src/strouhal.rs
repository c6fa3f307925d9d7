//! Stability alpha from a local Strouhal number, for runs with a 3D
//! potential temperature field.
//!
//! Follows Chan and Sugiyama (1997): the Strouhal number relates a
//! characteristic terrain height to the buoyancy frequency over the wind speed.

use crate::{StabilityError, ALPHA_MAX};

use mesh::{gradient::smoothed_gradient, Mesh, ReferenceElement, VectorField};
use rayon::prelude::*;

pub const GRAVITY: f64 = 9.81;
/// Speeds are floored to this value.
pub const MIN_SPEED: f64 = 0.2;
/// Offset from perturbation to total potential temperature.
pub const THETA_REFERENCE: f64 = 300.0;
/// Replacement for non-positive alphas.
pub const ALPHA_FLOOR: f64 = 0.1;

/// Orographic height scale per ground node.
pub trait CharacteristicHeight: Sync {
  /// One value per ground node, in node order.
  fn heights(&self, mesh: &Mesh) -> Vec<f64>;
}

/// $H = sum |Delta h| / r^2 \/ sum 1 / r^2$ over all other ground nodes.
///
/// Quadratic in the number of ground nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct InverseSquareDistance;
impl CharacteristicHeight for InverseSquareDistance {
  fn heights(&self, mesh: &Mesh) -> Vec<f64> {
    let n = mesh.nnodes_per_layer();
    let (x, y, z) = (mesh.xord(), mesh.yord(), mesh.zord());
    (0..n)
      .into_par_iter()
      .map(|a| {
        let mut sum_dh = 0.0;
        let mut sum_w = 0.0;
        for b in (0..n).filter(|&b| b != a) {
          let r2 = (x[a] - x[b]).powi(2) + (y[a] - y[b]).powi(2);
          if r2 == 0.0 {
            continue;
          }
          sum_dh += (z[a] - z[b]).abs() / r2;
          sum_w += r2.recip();
        }
        if sum_w > 0.0 {
          sum_dh / sum_w
        } else {
          0.0
        }
      })
      .collect()
  }
}

pub fn strouhal_number(height: f64, theta: f64, dtheta_dz: f64, speed: f64) -> f64 {
  let speed = speed.max(MIN_SPEED);
  if dtheta_dz >= 0.0 {
    let n = (GRAVITY / theta * dtheta_dz).sqrt();
    height * n / speed
  } else {
    let t = (-GRAVITY / theta * dtheta_dz).sqrt();
    -height / speed * t
  }
}

/// Clamped to `(0, ALPHA_MAX]`. NaN passes through.
pub fn alpha_from_strouhal(strouhal: f64) -> f64 {
  let alpha = if strouhal >= 0.0 {
    (-1.5 * strouhal.powf(1.5)).exp().sqrt()
  } else {
    (1.5 * (-strouhal).powf(1.5)).exp().sqrt()
  };
  if alpha > ALPHA_MAX {
    ALPHA_MAX
  } else if alpha <= 0.0 {
    ALPHA_FLOOR
  } else {
    alpha
  }
}

/// `theta_perturbation` is relative to [`THETA_REFERENCE`].
pub fn strouhal_alpha_field(
  mesh: &Mesh,
  reference: &ReferenceElement,
  theta_perturbation: &[f64],
  u0: &VectorField,
  characteristic_height: &dyn CharacteristicHeight,
) -> Result<Vec<f64>, StabilityError> {
  let nnodes = mesh.nnodes();
  for len in [theta_perturbation.len(), u0.len()] {
    if len != nnodes {
      return Err(StabilityError::FieldLength {
        got: len,
        expected: nnodes,
      });
    }
  }

  let theta: Vec<f64> = theta_perturbation
    .par_iter()
    .map(|t| t + THETA_REFERENCE)
    .collect();
  let dtheta = smoothed_gradient(mesh, reference, &theta)?;
  let heights = characteristic_height.heights(mesh);
  let speed = u0.horizontal_speed();

  (0..nnodes)
    .into_par_iter()
    .map(|node| {
      let strouhal = strouhal_number(
        heights[mesh.ground_node(node)],
        theta[node],
        dtheta.w[node],
        speed[node],
      );
      let alpha = alpha_from_strouhal(strouhal);
      if alpha > 0.0 && alpha <= ALPHA_MAX {
        Ok(alpha)
      } else {
        Err(StabilityError::AlphaOutOfRange { node, alpha })
      }
    })
    .collect()
}
