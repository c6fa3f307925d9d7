//! Nodal velocity fields.

use crate::{MeshError, NodeIdx};

use rayon::prelude::*;

/// One `(u, v, w)` per node, stored component wise.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
  pub u: Vec<f64>,
  pub v: Vec<f64>,
  pub w: Vec<f64>,
}

impl VectorField {
  pub fn zeros(nnodes: usize) -> Self {
    Self::uniform(nnodes, [0.0; 3])
  }

  pub fn uniform(nnodes: usize, [u, v, w]: [f64; 3]) -> Self {
    Self {
      u: vec![u; nnodes],
      v: vec![v; nnodes],
      w: vec![w; nnodes],
    }
  }

  pub fn from_components(u: Vec<f64>, v: Vec<f64>, w: Vec<f64>) -> Result<Self, MeshError> {
    for c in [&v, &w] {
      if c.len() != u.len() {
        return Err(MeshError::FieldLength {
          got: c.len(),
          expected: u.len(),
        });
      }
    }
    Ok(Self { u, v, w })
  }

  pub fn len(&self) -> usize {
    self.u.len()
  }
  pub fn is_empty(&self) -> bool {
    self.u.is_empty()
  }

  pub fn get(&self, inode: NodeIdx) -> na::Vector3<f64> {
    na::Vector3::new(self.u[inode], self.v[inode], self.w[inode])
  }

  pub fn set(&mut self, inode: NodeIdx, value: na::Vector3<f64>) {
    self.u[inode] = value.x;
    self.v[inode] = value.y;
    self.w[inode] = value.z;
  }

  pub fn components(&self) -> [&[f64]; 3] {
    [&self.u, &self.v, &self.w]
  }
  pub fn components_mut(&mut self) -> [&mut Vec<f64>; 3] {
    [&mut self.u, &mut self.v, &mut self.w]
  }

  /// $sqrt(u^2 + v^2)$ per node.
  pub fn horizontal_speed(&self) -> Vec<f64> {
    self
      .u
      .par_iter()
      .zip(self.v.par_iter())
      .map(|(u, v)| u.hypot(*v))
      .collect()
  }

  /// Sets the first `nnodes_ground` nodes to zero.
  pub fn zero_ground(&mut self, nnodes_ground: usize) {
    for c in self.components_mut() {
      c[..nnodes_ground].iter_mut().for_each(|x| *x = 0.0);
    }
  }
}
