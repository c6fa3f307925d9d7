extern crate nalgebra as na;

use approx::assert_relative_eq;
use mesh::{Grid, Mesh, MeshConfig, MeshError, QuadRule, ReferenceElement};

fn hill() -> Grid {
  Grid::from_fn(6, 7, 50.0, |i, j| {
    let (di, dj) = (i as f64 - 2.5, j as f64 - 3.0);
    1000.0 + 80.0 * (-(di * di + dj * dj) / 4.0).exp()
  })
  .unwrap()
}

#[test]
fn layers_follow_terrain_and_reach_domain_top() {
  let dem = hill();
  let config = MeshConfig {
    nlayers: 8,
    ..Default::default()
  };
  let mesh = Mesh::from_elevation(&dem, &config).unwrap();

  let top = config.compute_domain_height(dem.cellsize(), dem.max_value());
  assert_relative_eq!(mesh.domain_top(), top, epsilon = 1e-9);

  for i in 0..dem.nrows() {
    for j in 0..dem.ncols() {
      let ground = mesh.node_index(i, j, 0);
      assert_eq!(mesh.zord()[ground], dem.get(i, j));
      assert_relative_eq!(mesh.xord()[ground], (j as f64 + 0.5) * 50.0);
      assert_relative_eq!(mesh.yord()[ground], (i as f64 + 0.5) * 50.0);
      let topnode = mesh.node_index(i, j, config.nlayers - 1);
      assert_relative_eq!(mesh.zord()[topnode], top, epsilon = 1e-9);

      // layers grow geometrically
      let dz = |k: usize| mesh.zord()[mesh.node_index(i, j, k + 1)] - mesh.zord()[mesh.node_index(i, j, k)];
      for k in 0..config.nlayers - 2 {
        assert_relative_eq!(dz(k + 1) / dz(k), config.vert_growth, epsilon = 1e-9);
      }
    }
  }
}

#[test]
fn domain_height_formula() {
  let config = MeshConfig::default();
  let first = 100.0 / 400.0;
  let expected = first * (1.3f64.powi(20) - 1.0) / 0.3 + 500.0;
  assert_relative_eq!(config.compute_domain_height(100.0, 500.0), expected, epsilon = 1e-9);

  // never lower than three times the output height plus roughness
  let shallow = MeshConfig {
    nlayers: 2,
    output_wind_height: 10.0,
    max_roughness: 2.0,
    ..Default::default()
  };
  assert_relative_eq!(shallow.compute_domain_height(100.0, 0.0), 36.0);
}

#[test]
fn domain_below_terrain_is_rejected() {
  let config = MeshConfig {
    domain_height: Some(900.0),
    ..Default::default()
  };
  assert!(matches!(
    Mesh::from_elevation(&hill(), &config),
    Err(MeshError::DomainBelowTerrain { .. })
  ));
}

#[test]
fn element_volumes_sum_to_box_volume() {
  let mesh = Mesh::uniform(4, 3, 5, 2.0, 3.0, 0.5).unwrap();
  for rule in [QuadRule::OnePoint, QuadRule::EightPoint, QuadRule::TwentySevenPoint] {
    let reference = ReferenceElement::new(rule);
    let vol: f64 = (0..mesh.nelems())
      .map(|e| {
        reference
          .element_geometry(&mesh, e)
          .unwrap()
          .iter()
          .map(|q| q.weight * q.dv)
          .sum::<f64>()
      })
      .sum();
    assert_relative_eq!(vol, (2.0 * 2.0) * (3.0 * 3.0) * (4.0 * 0.5), epsilon = 1e-10);
  }
}

#[test]
fn inverted_element_is_an_error() {
  let mut mesh_coords = Mesh::uniform(2, 2, 2, 1.0, 1.0, 1.0).unwrap();
  // mirror x, which flips the orientation of the only element
  let xord: Vec<f64> = mesh_coords.xord().iter().map(|x| -x).collect();
  mesh_coords = Mesh::from_coords(
    2,
    2,
    2,
    xord,
    mesh_coords.yord().to_vec(),
    mesh_coords.zord().to_vec(),
  )
  .unwrap();
  let reference = ReferenceElement::new(QuadRule::OnePoint);
  assert!(matches!(
    reference.element_geometry(&mesh_coords, 0),
    Err(MeshError::NonPositiveJacobian { elem: 0, .. })
  ));
}

#[test]
fn physical_gradients_of_stretched_element() {
  let mesh = Mesh::uniform(2, 2, 2, 4.0, 2.0, 1.0).unwrap();
  let reference = ReferenceElement::new(QuadRule::OnePoint);
  let geo = &reference.element_geometry(&mesh, 0).unwrap()[0];
  assert_relative_eq!(geo.dv, 4.0 * 2.0 * 1.0 / 8.0);
  assert_relative_eq!(geo.position, na::Vector3::new(2.0, 1.0, 0.5));
  // N_0 decreases along every axis at the centroid
  assert_relative_eq!(geo.dn[0], na::Vector3::new(-0.25 / 4.0, -0.25 / 2.0, -0.25 / 1.0));
}

#[test]
fn bounds_and_heights() {
  let dem = hill();
  let mesh = Mesh::from_elevation(&dem, &MeshConfig::default()).unwrap();
  assert!(mesh.in_mesh_xy(25.0, 25.0));
  assert!(mesh.in_mesh_xy(325.0, 275.0));
  assert!(!mesh.in_mesh_xy(10.0, 100.0));
  assert!(!mesh.in_mesh_xy(100.0, 300.0));

  let heights = mesh.height_above_ground();
  for n in 0..mesh.nnodes_per_layer() {
    assert_eq!(heights[n], 0.0);
  }
  assert!(heights[mesh.nnodes_per_layer()..].iter().all(|&h| h > 0.0));
  assert!(mesh.ground_aspect_ratio() >= 1.0);
}

#[test]
fn domain_top_must_clear_the_terrain() {
  let dem = Grid::constant(3, 4, 100.0, 500.0).unwrap();
  let touching = MeshConfig {
    domain_height: Some(500.0),
    ..Default::default()
  };
  assert!(matches!(
    Mesh::from_elevation(&dem, &touching),
    Err(MeshError::DomainBelowTerrain { .. })
  ));
  let above = MeshConfig {
    domain_height: Some(500.5),
    ..Default::default()
  };
  assert!(Mesh::from_elevation(&dem, &above).is_ok());
}
