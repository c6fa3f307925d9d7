//! Flow over a gaussian hill: mass conservation followed by a few
//! diffusion steps of the corrected field.

use common::progress::TracingProgress;
use mesh::{Grid, Mesh, MeshConfig, VectorField};
use stability::{ConstantShortwave, InverseSquareDistance, Stability, StabilityStrategy};
use windfem::{Diffusion, DiffusionScheme, MassConservation, SimulationConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt::init();

  let dem = Grid::from_fn(40, 50, 100.0, |i, j| {
    let r2 = (i as f64 - 20.0).powi(2) + (j as f64 - 25.0).powi(2);
    1000.0 + 300.0 * (-r2 / 40.0).exp()
  })?;
  let mesh_config = MeshConfig {
    nlayers: 15,
    ..Default::default()
  };
  let mesh = Mesh::from_elevation(&dem, &mesh_config)?;
  println!(
    "mesh with {} nodes, top at {:.1} m, ground aspect ratio {:.1}",
    mesh.nnodes(),
    mesh.domain_top(),
    mesh.ground_aspect_ratio()
  );

  // log like profile from the south west
  let shape: Vec<f64> = mesh
    .height_above_ground()
    .iter()
    .map(|h| (1.0 + h / 0.1).ln() / (1.0 + 10.0 / 0.1_f64).ln())
    .collect();
  let u0 = VectorField::from_components(
    shape.iter().map(|s| 5.0 * s).collect(),
    shape.iter().map(|s| 5.0 * s).collect(),
    vec![0.0; mesh.nnodes()],
  )?;

  let config = SimulationConfig {
    mesh: mesh_config,
    phi_out: Some("phi.vtk".into()),
    ..Default::default()
  };
  let stability = Stability::Strategy(StabilityStrategy::DomainAverage {
    cloud_cover: 0.2,
    speed: dem.like(7.0),
  });

  let mut solver = MassConservation::new(&mesh, u0, config.clone())?;
  let u = solver.run(
    &stability,
    &ConstantShortwave(400.0),
    &InverseSquareDistance,
    &TracingProgress,
  )?;
  let wmax = u.w.iter().fold(0.0_f64, |m, w| m.max(w.abs()));
  println!("largest vertical velocity {wmax:.3} m/s");

  let config = SimulationConfig {
    diffusion_scheme: DiffusionScheme::CentralDifference,
    dt: 5.0,
    phi_out: None,
    ..config
  };
  let mut diffusion = Diffusion::new(&mesh, config)?;
  let u = diffusion.run(&u, 4, &TracingProgress)?;
  let speed = u.horizontal_speed();
  let top = speed[mesh.nnodes() - mesh.nnodes_per_layer()..]
    .iter()
    .fold(0.0_f64, |m, s| m.max(*s));
  println!("largest speed at the domain top after diffusion {top:.3} m/s");

  Ok(())
}
