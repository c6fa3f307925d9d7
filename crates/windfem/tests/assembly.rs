extern crate nalgebra as na;

use approx::assert_relative_eq;
use common::linalg::{
  faer::FaerCholesky,
  nalgebra::{crs_to_dense, Matrix, Vector},
};
use mesh::{element::NNPE, Grid, Mesh, MeshConfig, QuadRule, ReferenceElement, VectorField};
use windfem::{
  assemble::{self, GalVec},
  operators::{ElSystemProvider, MassConservationElsys},
};

fn hill_mesh() -> Mesh {
  let dem = Grid::from_fn(5, 6, 50.0, |i, j| {
    let r2 = (i as f64 - 2.0).powi(2) + (j as f64 - 2.5).powi(2);
    100.0 + 20.0 * (-r2 / 3.0).exp()
  })
  .unwrap();
  let config = MeshConfig {
    nlayers: 4,
    domain_height: Some(400.0),
    ..Default::default()
  };
  Mesh::from_elevation(&dem, &config).unwrap()
}

fn swirling_u0(mesh: &Mesh) -> VectorField {
  let n = mesh.nnodes();
  let mut u0 = VectorField::zeros(n);
  for i in 0..n {
    let x = mesh.coord(i);
    u0.set(i, na::Vector3::new(3.0 + 0.01 * x.y, 1.0 - 0.02 * x.x, 0.001 * x.z));
  }
  u0
}

/// Full dense assembly, no pattern, no symmetry.
fn dense_reference(
  mesh: &Mesh,
  reference: &ReferenceElement,
  elsys: &impl ElSystemProvider,
) -> (Matrix, Vector) {
  let n = mesh.nnodes();
  let mut a = Matrix::zeros(n, n);
  let mut b = Vector::zeros(n);
  for ielem in 0..mesh.nelems() {
    let nodes = mesh.elem_nodes(ielem);
    let qps = reference.element_geometry(mesh, ielem).unwrap();
    let sys = elsys.eval(&nodes, &qps);
    for k in 0..NNPE {
      for l in 0..NNPE {
        a[(nodes[k], nodes[l])] += sys.mat[(k, l)];
      }
      b[nodes[k]] += sys.rhs[0][k];
    }
  }
  (a, b)
}

#[test]
fn pattern_is_upper_triangular() {
  let mesh = hill_mesh();
  let galmat = assemble::crs_pattern(&mesh).unwrap();
  assert_eq!(galmat.row_ptr().len(), mesh.nnodes() + 1);
  assert!(galmat.row_ptr().windows(2).all(|w| w[0] < w[1]));
  for row in 0..mesh.nnodes() {
    let cols = &galmat.col_ind()[galmat.row_range(row)];
    assert_eq!(cols[0], row);
    assert!(cols.windows(2).all(|w| w[0] < w[1]));
  }
  // an internal node has 26 neighbours, 13 of them above in numbering
  let internal = mesh.node_index(2, 2, 1);
  assert_eq!(galmat.row_range(internal).len(), 14);
  // the last node only couples to itself
  assert_eq!(galmat.row_range(mesh.nnodes() - 1).len(), 1);
}

#[test]
fn pattern_rows_follow_node_type() {
  let mesh = hill_mesh();
  let galmat = assemble::crs_pattern(&mesh).unwrap();
  // stored upper entries plus their mirrored lower entries, diagonal once
  let mut coupled = vec![0usize; mesh.nnodes()];
  for row in 0..mesh.nnodes() {
    for &col in &galmat.col_ind()[galmat.row_range(row)] {
      coupled[row] += 1;
      if col != row {
        coupled[col] += 1;
      }
    }
  }
  for (n, &count) in coupled.iter().enumerate() {
    let (i, j, k) = mesh.node_ijk(n);
    assert_eq!(count, mesh.node_type(i, j, k).ncoupled());
  }
  assert_eq!(
    galmat.nnz(),
    (coupled.iter().sum::<usize>() + mesh.nnodes()) / 2
  );
}

#[test]
fn assembly_matches_dense_reference() {
  let mesh = hill_mesh();
  let u0 = swirling_u0(&mesh);
  let alpha_v: Vec<f64> = (0..mesh.nnodes()).map(|n| 1.0 + 0.1 * (n % 3) as f64).collect();
  let elsys = MassConservationElsys {
    u0: &u0,
    alpha_h: 1.0,
    alpha_v: &alpha_v,
  };

  for rule in [QuadRule::OnePoint, QuadRule::EightPoint, QuadRule::TwentySevenPoint] {
    let reference = ReferenceElement::new(rule);
    let mut galmat = assemble::crs_pattern(&mesh).unwrap();
    let mut galvec: GalVec = vec![0.0; mesh.nnodes()];
    assemble::assemble_system(
      &mesh,
      &reference,
      &elsys,
      &mut galmat,
      std::slice::from_mut(&mut galvec),
    )
    .unwrap();

    let (a, b) = dense_reference(&mesh, &reference, &elsys);
    assert_relative_eq!(crs_to_dense(&galmat), a, epsilon = 1e-9);
    assert_relative_eq!(Vector::from_vec(galvec), b, epsilon = 1e-9);
  }
}

#[test]
fn reassembly_overwrites() {
  let mesh = hill_mesh();
  let reference = ReferenceElement::new(QuadRule::OnePoint);
  let u0 = swirling_u0(&mesh);
  let alpha_v = vec![1.0; mesh.nnodes()];
  let elsys = MassConservationElsys {
    u0: &u0,
    alpha_h: 1.0,
    alpha_v: &alpha_v,
  };
  let mut galmat = assemble::crs_pattern(&mesh).unwrap();
  let mut galvecs = vec![vec![0.0; mesh.nnodes()]];
  assemble::assemble_system(&mesh, &reference, &elsys, &mut galmat, &mut galvecs).unwrap();
  let first = (galmat.values().to_vec(), galvecs[0].clone());
  assemble::assemble_system(&mesh, &reference, &elsys, &mut galmat, &mut galvecs).unwrap();
  assert_eq!(first.0, galmat.values());
  assert_eq!(first.1, galvecs[0]);
}

#[test]
fn zero_wind_gives_zero_load() {
  let mesh = hill_mesh();
  let reference = ReferenceElement::new(QuadRule::EightPoint);
  let u0 = VectorField::zeros(mesh.nnodes());
  let alpha_v = vec![1.0; mesh.nnodes()];
  let elsys = MassConservationElsys {
    u0: &u0,
    alpha_h: 1.0,
    alpha_v: &alpha_v,
  };
  let mut galmat = assemble::crs_pattern(&mesh).unwrap();
  let mut galvecs = vec![vec![1.0; mesh.nnodes()]];
  assemble::assemble_system(&mesh, &reference, &elsys, &mut galmat, &mut galvecs).unwrap();
  assert!(galvecs[0].iter().all(|&v| v == 0.0));
}

#[test]
fn homogeneous_dirichlet_is_idempotent() {
  let mesh = hill_mesh();
  let reference = ReferenceElement::new(QuadRule::EightPoint);
  let u0 = swirling_u0(&mesh);
  let alpha_v = vec![1.0; mesh.nnodes()];
  let elsys = MassConservationElsys {
    u0: &u0,
    alpha_h: 1.0,
    alpha_v: &alpha_v,
  };
  let mut galmat = assemble::crs_pattern(&mesh).unwrap();
  let mut galvecs = vec![vec![0.0; mesh.nnodes()]];
  assemble::assemble_system(&mesh, &reference, &elsys, &mut galmat, &mut galvecs).unwrap();

  let flags = assemble::boundary_flags(&mesh);
  assert!(!flags[mesh.node_index(2, 2, 0)]);
  assert!(flags[mesh.node_index(2, 2, mesh.nlayers() - 1)]);
  assert!(flags[mesh.node_index(0, 2, 1)]);

  assemble::fix_dofs_zero(&flags, &mut galmat, &mut galvecs[0]);
  let once = (galmat.values().to_vec(), galvecs[0].clone());
  assemble::fix_dofs_zero(&flags, &mut galmat, &mut galvecs[0]);
  assert_eq!(once.0, galmat.values());
  assert_eq!(once.1, galvecs[0]);

  let dense = crs_to_dense(&galmat);
  for (n, &fixed) in flags.iter().enumerate() {
    if fixed {
      assert_eq!(galvecs[0][n], 0.0);
      assert_eq!(dense[(n, n)], 1.0);
      assert_eq!(dense.row(n).iter().filter(|&&v| v != 0.0).count(), 1);
      assert_eq!(dense.column(n).iter().filter(|&&v| v != 0.0).count(), 1);
    }
  }
}

#[test]
fn prescribed_values_keep_symmetry() {
  let mesh = Mesh::uniform(4, 4, 4, 10.0, 10.0, 5.0).unwrap();
  let reference = ReferenceElement::new(QuadRule::EightPoint);
  let u0 = swirling_u0(&mesh);
  let alpha_v = vec![1.0; mesh.nnodes()];
  let elsys = MassConservationElsys {
    u0: &u0,
    alpha_h: 1.0,
    alpha_v: &alpha_v,
  };
  let mut galmat = assemble::crs_pattern(&mesh).unwrap();
  let mut galvecs = vec![vec![0.0; mesh.nnodes()]];
  assemble::assemble_system(&mesh, &reference, &elsys, &mut galmat, &mut galvecs).unwrap();
  let (a, b) = (crs_to_dense(&galmat), Vector::from_vec(galvecs[0].clone()));

  let flags = assemble::boundary_and_ground_flags(&mesh);
  let g: Vec<f64> = (0..mesh.nnodes()).map(|n| (n as f64).sin()).collect();
  assemble::fix_dofs_coeff(&flags, &[&g], &mut galmat, &mut galvecs);

  let x = FaerCholesky::new(&galmat).unwrap().solve(&galvecs[0]);
  let x = Vector::from_vec(x);
  let residual = &a * &x - &b;
  for (n, &fixed) in flags.iter().enumerate() {
    if fixed {
      assert_relative_eq!(x[n], g[n], epsilon = 1e-10);
    } else {
      assert_relative_eq!(residual[n], 0.0, epsilon = 1e-8);
    }
  }
}
