//! Trilinear hexahedral elements.

use crate::{mesh::Mesh, quadrature::QuadRule, ElemIdx, MeshError};

pub const NNPE: usize = 8;

/// Reference coordinates of the local nodes.
pub const LOCAL_NODE_SIGNS: [[f64; 3]; NNPE] = [
  [-1.0, -1.0, -1.0],
  [1.0, -1.0, -1.0],
  [1.0, 1.0, -1.0],
  [-1.0, 1.0, -1.0],
  [-1.0, -1.0, 1.0],
  [1.0, -1.0, 1.0],
  [1.0, 1.0, 1.0],
  [-1.0, 1.0, 1.0],
];

/// $N_k = 1/8 (1 plus.minus u)(1 plus.minus v)(1 plus.minus w)$
pub fn shape_values(p: &na::Vector3<f64>) -> [f64; NNPE] {
  LOCAL_NODE_SIGNS.map(|[su, sv, sw]| 0.125 * (1.0 + su * p.x) * (1.0 + sv * p.y) * (1.0 + sw * p.z))
}

/// Reference gradients $(partial_u, partial_v, partial_w) N_k$.
pub fn shape_gradients(p: &na::Vector3<f64>) -> [na::Vector3<f64>; NNPE] {
  LOCAL_NODE_SIGNS.map(|[su, sv, sw]| {
    let (fu, fv, fw) = (1.0 + su * p.x, 1.0 + sv * p.y, 1.0 + sw * p.z);
    0.125 * na::Vector3::new(su * fv * fw, sv * fu * fw, sw * fu * fv)
  })
}

/// Shape function data at the quadrature points, shared by all elements.
#[derive(Debug, Clone)]
pub struct ReferenceElement {
  rule: QuadRule,
  weights: Vec<f64>,
  values: Vec<[f64; NNPE]>,
  gradients: Vec<[na::Vector3<f64>; NNPE]>,
}

/// Physical quantities of one element at one quadrature point.
#[derive(Debug, Clone)]
pub struct QuadPointGeometry {
  pub weight: f64,
  /// $N_k$
  pub n: [f64; NNPE],
  /// Physical gradients $(DNDX, DNDY, DNDZ)_k$.
  pub dn: [na::Vector3<f64>; NNPE],
  /// Jacobian determinant.
  pub dv: f64,
  /// Physical position of the quadrature point.
  pub position: na::Vector3<f64>,
}

impl QuadPointGeometry {
  /// Interpolates nodal values.
  pub fn interpolate(&self, nodal: &[f64; NNPE]) -> f64 {
    self.n.iter().zip(nodal).map(|(n, v)| n * v).sum()
  }

  /// Gradient of the interpolant of nodal values.
  pub fn gradient(&self, nodal: &[f64; NNPE]) -> na::Vector3<f64> {
    self
      .dn
      .iter()
      .zip(nodal)
      .fold(na::Vector3::zeros(), |acc, (dn, v)| acc + dn * *v)
  }
}

impl ReferenceElement {
  pub fn new(rule: QuadRule) -> Self {
    let points = rule.points();
    Self {
      rule,
      weights: points.iter().map(|q| q.weight).collect(),
      values: points.iter().map(|q| shape_values(&q.local)).collect(),
      gradients: points.iter().map(|q| shape_gradients(&q.local)).collect(),
    }
  }

  pub fn rule(&self) -> QuadRule {
    self.rule
  }
  pub fn nqpoints(&self) -> usize {
    self.weights.len()
  }

  /// Maps reference data onto the element with the given node coordinates.
  pub fn geometry_at(
    &self,
    coords: &[na::Vector3<f64>; NNPE],
    iqpoint: usize,
    ielem: ElemIdx,
  ) -> Result<QuadPointGeometry, MeshError> {
    let ref_grads = &self.gradients[iqpoint];
    let n = self.values[iqpoint];

    // J[r][c] = sum_k dN_k/dxi_c x_k,r
    let jacobian = coords
      .iter()
      .zip(ref_grads)
      .fold(na::Matrix3::zeros(), |acc, (x, dn)| acc + x * dn.transpose());
    let det = jacobian.determinant();
    if !(det > 0.0) {
      return Err(MeshError::NonPositiveJacobian { elem: ielem, det });
    }
    let inv_t = jacobian
      .try_inverse()
      .ok_or(MeshError::NonPositiveJacobian { elem: ielem, det })?
      .transpose();

    let position = coords
      .iter()
      .zip(&n)
      .fold(na::Vector3::zeros(), |acc, (x, nk)| acc + x * *nk);

    Ok(QuadPointGeometry {
      weight: self.weights[iqpoint],
      n,
      dn: (*ref_grads).map(|g| inv_t * g),
      dv: det,
      position,
    })
  }

  /// All quadrature points of one element of the mesh.
  pub fn element_geometry(
    &self,
    mesh: &Mesh,
    ielem: ElemIdx,
  ) -> Result<Vec<QuadPointGeometry>, MeshError> {
    let coords = mesh.elem_coords(ielem);
    (0..self.nqpoints())
      .map(|q| self.geometry_at(&coords, q, ielem))
      .collect()
  }
}
