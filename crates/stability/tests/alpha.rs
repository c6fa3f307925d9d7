use approx::assert_relative_eq;
use mesh::{Grid, Mesh, MeshConfig, QuadRule, ReferenceElement, VectorField};
use stability::{
  CharacteristicHeight, ConstantShortwave, InverseSquareDistance, Stability, StabilityContext,
  StabilityError, StabilityStrategy, Station,
};

struct Setup {
  dem: Grid,
  mesh: Mesh,
  reference: ReferenceElement,
  u0: VectorField,
}

fn setup(dem: Grid) -> Setup {
  let config = MeshConfig {
    nlayers: 5,
    ..Default::default()
  };
  let mesh = Mesh::from_elevation(&dem, &config).unwrap();
  let u0 = VectorField::uniform(mesh.nnodes(), [3.0, 4.0, 0.0]);
  Setup {
    dem,
    mesh,
    reference: ReferenceElement::new(QuadRule::OnePoint),
    u0,
  }
}

fn flat() -> Setup {
  setup(Grid::constant(5, 6, 100.0, 200.0).unwrap())
}

fn hill() -> Setup {
  setup(
    Grid::from_fn(5, 6, 100.0, |i, j| {
      let r2 = (i as f64 - 2.0).powi(2) + (j as f64 - 2.5).powi(2);
      200.0 + 150.0 * (-r2 / 2.0).exp()
    })
    .unwrap(),
  )
}

fn context<'a>(s: &'a Setup, shortwave: &'a ConstantShortwave) -> StabilityContext<'a> {
  StabilityContext {
    mesh: &s.mesh,
    reference: &s.reference,
    u0: &s.u0,
    shortwave,
    characteristic_height: &InverseSquareDistance,
  }
}

#[test]
fn neutral_and_given() {
  let s = flat();
  let sw = ConstantShortwave(0.0);
  let ctx = context(&s, &sw);

  let off = Stability::Off.vertical_alpha(1.5, &ctx).unwrap();
  assert!(off.iter().all(|&a| a == 1.5));

  let given = Stability::Given(2.0).vertical_alpha(1.0, &ctx).unwrap();
  assert!(given.iter().all(|&a| a == 0.5));

  assert!(matches!(
    Stability::Given(0.0).vertical_alpha(1.0, &ctx),
    Err(StabilityError::NonPositive { .. })
  ));
  assert!(Stability::Off.vertical_alpha(-1.0, &ctx).is_err());
}

#[test]
fn domain_average_sunny_calm_is_very_unstable() {
  let s = flat();
  let sw = ConstantShortwave(700.0);
  let ctx = context(&s, &sw);
  let strategy = StabilityStrategy::DomainAverage {
    cloud_cover: 0.0,
    speed: s.dem.like(1.0),
  };
  let alpha_v = Stability::Strategy(strategy).vertical_alpha(1.0, &ctx).unwrap();
  assert_eq!(alpha_v.len(), s.mesh.nnodes());
  assert!(alpha_v.iter().all(|&a| a == 1.0 / 5.0));
}

#[test]
fn weather_model_grids_vary_per_column() {
  let s = flat();
  let sw = ConstantShortwave(-1.0);
  let ctx = context(&s, &sw);
  // clear night, calm in the west, windy in the east
  let speed = Grid::from_fn(5, 6, 100.0, |_, j| if j < 3 { 1.0 } else { 10.0 }).unwrap();
  let strategy = StabilityStrategy::WeatherModel2d {
    cloud_cover: s.dem.like(0.0),
    speed,
  };
  let alpha = strategy.alpha_field(&ctx).unwrap();
  for n in 0..s.mesh.nnodes() {
    let (_, j, _) = s.mesh.node_ijk(n);
    assert_eq!(alpha[n], if j < 3 { 0.2 } else { 1.0 });
  }
}

#[test]
fn point_initialization_needs_full_coverage() {
  let s = flat();
  let sw = ConstantShortwave(0.0);
  let ctx = context(&s, &sw);

  let near_only = StabilityStrategy::PointInitialization {
    stations: vec![Station::new(50.0, 50.0, 1.0, 150.0)],
    speed: s.dem.like(2.0),
  };
  assert!(matches!(
    near_only.alpha_field(&ctx),
    Err(StabilityError::UnfilledInterpolation { .. })
  ));

  let infinite = StabilityStrategy::PointInitialization {
    stations: vec![Station::new(50.0, 50.0, 1.0, -1.0)],
    speed: s.dem.like(2.0),
  };
  // overcast night, light wind
  assert!(infinite.alpha_field(&ctx).unwrap().iter().all(|&a| a == 0.5));
}

#[test]
fn grid_mismatch_is_reported() {
  let s = flat();
  let sw = ConstantShortwave(0.0);
  let ctx = context(&s, &sw);
  let strategy = StabilityStrategy::DomainAverage {
    cloud_cover: 0.0,
    speed: Grid::constant(4, 6, 100.0, 1.0).unwrap(),
  };
  assert!(matches!(
    strategy.alpha_field(&ctx),
    Err(StabilityError::GridMismatch { .. })
  ));
}

#[test]
fn characteristic_height_vanishes_on_flat_terrain() {
  let s = flat();
  assert!(InverseSquareDistance.heights(&s.mesh).iter().all(|&h| h == 0.0));
  let h = InverseSquareDistance.heights(&hill().mesh);
  assert!(h.iter().all(|&h| h > 0.0));
}

#[test]
fn strouhal_field() {
  let sw = ConstantShortwave(0.0);

  // isothermal on flat ground is neutral
  let s = flat();
  let ctx = context(&s, &sw);
  let strategy = StabilityStrategy::Variable3d {
    theta_perturbation: vec![0.0; s.mesh.nnodes()],
  };
  for a in strategy.alpha_field(&ctx).unwrap() {
    assert_relative_eq!(a, 1.0, epsilon = 1e-9);
  }

  // stable stratification over a hill suppresses vertical motion,
  // unstable stratification enhances it
  let s = hill();
  let ctx = context(&s, &sw);
  let stable = StabilityStrategy::Variable3d {
    theta_perturbation: s.mesh.zord().iter().map(|z| 0.01 * z).collect(),
  };
  assert!(stable.alpha_field(&ctx).unwrap().iter().all(|&a| a > 0.0 && a < 1.0));
  let unstable = StabilityStrategy::Variable3d {
    theta_perturbation: s.mesh.zord().iter().map(|z| -0.01 * z).collect(),
  };
  assert!(unstable.alpha_field(&ctx).unwrap().iter().all(|&a| a > 1.0 && a <= 5.0));
}
