use crate::config::DiffusionScheme;

use mesh::{element::NNPE, NodeIdx, QuadPointGeometry, VectorField};

pub type ElMat = na::SMatrix<f64, NNPE, NNPE>;
pub type ElVec = na::SVector<f64, NNPE>;

/// Von Karman constant.
pub const VON_KARMAN: f64 = 0.41;

/// Element matrix together with one element load vector per right hand side.
#[derive(Debug, Clone)]
pub struct ElSystem {
  pub mat: ElMat,
  pub rhs: Vec<ElVec>,
}

pub trait ElSystemProvider: Sync {
  fn nrhs(&self) -> usize;
  fn eval(&self, nodes: &[NodeIdx; NNPE], qpoints: &[QuadPointGeometry]) -> ElSystem;
}

fn gather(field: &[f64], nodes: &[NodeIdx; NNPE]) -> [f64; NNPE] {
  nodes.map(|n| field[n])
}

/// $S_(k l) = integral nabla N_k dot R nabla N_l$ for a diagonal `R`
/// given per quadrature point.
fn stiffness<F>(qpoints: &[QuadPointGeometry], coeffs: F) -> ElMat
where
  F: Fn(&QuadPointGeometry) -> na::Vector3<f64>,
{
  let mut elmat = ElMat::zeros();
  for qp in qpoints {
    let r = coeffs(qp);
    let wdv = qp.weight * qp.dv;
    for k in 0..NNPE {
      let rdn = r.component_mul(&qp.dn[k]);
      for l in 0..NNPE {
        elmat[(k, l)] += wdv * rdn.dot(&qp.dn[l]);
      }
    }
  }
  elmat
}

/// $C_(k l) = integral N_k N_l$
fn capacitance(qpoints: &[QuadPointGeometry]) -> ElMat {
  let mut elmat = ElMat::zeros();
  for qp in qpoints {
    let wdv = qp.weight * qp.dv;
    let n = na::SVector::<f64, NNPE>::from(qp.n);
    elmat += wdv * n * n.transpose();
  }
  elmat
}

/// Variational mass conservation.
///
/// $integral nabla N_k dot R nabla phi = integral N_k div U_0$ with
/// $R = "diag"(1/(2 alpha_H^2), 1/(2 alpha_H^2), 1/(2 alpha_V^2))$.
pub struct MassConservationElsys<'a> {
  pub u0: &'a VectorField,
  pub alpha_h: f64,
  /// Per node.
  pub alpha_v: &'a [f64],
}
impl ElSystemProvider for MassConservationElsys<'_> {
  fn nrhs(&self) -> usize {
    1
  }
  fn eval(&self, nodes: &[NodeIdx; NNPE], qpoints: &[QuadPointGeometry]) -> ElSystem {
    let rh = (2.0 * self.alpha_h * self.alpha_h).recip();
    let alpha_v = gather(self.alpha_v, nodes);
    let [u, v, w] = self.u0.components().map(|c| gather(c, nodes));

    let mat = stiffness(qpoints, |qp| {
      let av = qp.interpolate(&alpha_v);
      na::Vector3::new(rh, rh, (2.0 * av * av).recip())
    });

    let mut qe = ElVec::zeros();
    for qp in qpoints {
      let div = qp.gradient(&u).x + qp.gradient(&v).y + qp.gradient(&w).z;
      let wdv = qp.weight * qp.dv;
      for k in 0..NNPE {
        qe[k] += wdv * qp.n[k] * div;
      }
    }

    ElSystem {
      mat,
      rhs: vec![qe],
    }
  }
}

/// Turbulent diffusion of the three velocity components with
/// diffusivity $0.41 z_"agl" |(partial s)/(partial z)|$, where `s` is the
/// horizontal speed.
///
/// The element matrix and loads depend on the time scheme:
/// - lumped capacitance: `C` and $-S u$, to be row summed,
/// - central difference: $C + Delta t/2 S$ and $(C - Delta t/2 S) u$,
/// - backward difference: $C/(Delta t) + S$ and $C/(Delta t) u$.
pub struct DiffusionElsys<'a> {
  pub scheme: DiffusionScheme,
  pub dt: f64,
  pub u: &'a VectorField,
  pub height_above_ground: &'a [f64],
  pub dspeed_dz: &'a [f64],
}
impl DiffusionElsys<'_> {
  pub fn diffusivity(&self, nodes: &[NodeIdx; NNPE], qp: &QuadPointGeometry) -> f64 {
    let height = qp.interpolate(&gather(self.height_above_ground, nodes));
    let dspeed = qp.interpolate(&gather(self.dspeed_dz, nodes));
    VON_KARMAN * height * dspeed.abs()
  }
}
impl ElSystemProvider for DiffusionElsys<'_> {
  fn nrhs(&self) -> usize {
    3
  }
  fn eval(&self, nodes: &[NodeIdx; NNPE], qpoints: &[QuadPointGeometry]) -> ElSystem {
    let s = stiffness(qpoints, |qp| {
      na::Vector3::repeat(self.diffusivity(nodes, qp))
    });
    let c = capacitance(qpoints);
    let phi = self.u.components().map(|comp| ElVec::from(gather(comp, nodes)));
    let dt = self.dt;

    let (mat, rhs_op) = match self.scheme {
      DiffusionScheme::LumpedCapacitance => (c, -s),
      DiffusionScheme::CentralDifference => (c + 0.5 * dt * s, c - 0.5 * dt * s),
      DiffusionScheme::BackwardDifference => (c / dt + s, c / dt),
    };
    ElSystem {
      mat,
      rhs: phi.iter().map(|p| rhs_op * p).collect(),
    }
  }
}
