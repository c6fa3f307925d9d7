//! Nodal gradients of nodal scalar fields.
//!
//! The trilinear interpolant has no continuous gradient at the nodes, so the
//! element gradients at the quadrature points are averaged onto the element
//! nodes, weighted by the inverse distance between node and quadrature point.

use crate::{
  element::{ReferenceElement, NNPE},
  field::VectorField,
  mesh::Mesh,
  MeshError,
};

use rayon::prelude::*;

struct Accumulator {
  grad: VectorField,
  weight: Vec<f64>,
}
impl Accumulator {
  fn new(nnodes: usize) -> Self {
    Self {
      grad: VectorField::zeros(nnodes),
      weight: vec![0.0; nnodes],
    }
  }

  fn merge(mut self, other: Self) -> Self {
    for (a, b) in self.grad.components_mut().into_iter().zip(other.grad.components()) {
      a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
    }
    self.weight.iter_mut().zip(&other.weight).for_each(|(x, y)| *x += y);
    self
  }
}

pub fn smoothed_gradient(
  mesh: &Mesh,
  reference: &ReferenceElement,
  values: &[f64],
) -> Result<VectorField, MeshError> {
  let nnodes = mesh.nnodes();
  if values.len() != nnodes {
    return Err(MeshError::FieldLength {
      got: values.len(),
      expected: nnodes,
    });
  }

  let acc = (0..mesh.nelems())
    .into_par_iter()
    .with_min_len(mesh.elem_split_len())
    .try_fold(
      || Accumulator::new(nnodes),
      |mut acc, ielem| -> Result<Accumulator, MeshError> {
        let nodes = mesh.elem_nodes(ielem);
        let coords = mesh.elem_coords(ielem);
        let nodal: [f64; NNPE] = nodes.map(|n| values[n]);
        for iq in 0..reference.nqpoints() {
          let geo = reference.geometry_at(&coords, iq, ielem)?;
          let grad = geo.gradient(&nodal);
          for (inode, x) in nodes.iter().zip(&coords) {
            let dist = (x - geo.position).norm();
            if dist == 0.0 {
              continue;
            }
            let wt = dist.recip();
            acc.grad.u[*inode] += wt * grad.x;
            acc.grad.v[*inode] += wt * grad.y;
            acc.grad.w[*inode] += wt * grad.z;
            acc.weight[*inode] += wt;
          }
        }
        Ok(acc)
      },
    )
    .try_reduce_with(|a, b| Ok(a.merge(b)))
    .unwrap_or_else(|| Ok(Accumulator::new(nnodes)))?;

  let Accumulator { mut grad, weight } = acc;
  for c in grad.components_mut() {
    c.par_iter_mut().zip(weight.par_iter()).for_each(|(g, w)| {
      if *w > 0.0 {
        *g /= w;
      }
    });
  }
  Ok(grad)
}
