//! Gauss quadrature on the reference hexahedron $[-1,1]^3$.

use crate::element::LOCAL_NODE_SIGNS;

use itertools::iproduct;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuadRule {
  /// Centroid rule, weight 8.
  #[default]
  OnePoint,
  /// $2^3$ Gauss points at $plus.minus 1/sqrt(3)$, ordered like the local nodes.
  EightPoint,
  /// $3^3$ Gauss points at $0, plus.minus sqrt(0.6)$.
  TwentySevenPoint,
}

pub struct QuadPoint {
  pub local: na::Vector3<f64>,
  pub weight: f64,
}

impl QuadRule {
  pub fn npoints(self) -> usize {
    match self {
      Self::OnePoint => 1,
      Self::EightPoint => 8,
      Self::TwentySevenPoint => 27,
    }
  }

  pub fn points(self) -> Vec<QuadPoint> {
    match self {
      Self::OnePoint => vec![QuadPoint {
        local: na::Vector3::zeros(),
        weight: 8.0,
      }],
      Self::EightPoint => {
        let a = 3f64.sqrt().recip();
        LOCAL_NODE_SIGNS
          .iter()
          .map(|s| QuadPoint {
            local: a * na::Vector3::from(*s),
            weight: 1.0,
          })
          .collect()
      }
      Self::TwentySevenPoint => {
        let a = 0.6f64.sqrt();
        let gauss = [(-a, 5.0 / 9.0), (0.0, 8.0 / 9.0), (a, 5.0 / 9.0)];
        iproduct!(gauss, gauss, gauss)
          .map(|((w, ww), (v, wv), (u, wu))| QuadPoint {
            local: na::Vector3::new(u, v, w),
            weight: wu * wv * ww,
          })
          .collect()
      }
    }
  }
}
