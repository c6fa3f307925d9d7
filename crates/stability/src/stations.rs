//! Inverse distance weighting of weather station observations onto a grid.

use crate::StabilityError;

use mesh::Grid;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
  /// Projected coordinates, same system as the grid origin.
  pub x: f64,
  pub y: f64,
  pub cloud_cover: f64,
  /// Cells further away ignore the station. `None` reaches everywhere.
  pub influence_radius: Option<f64>,
}

impl Station {
  /// Negative radii mean infinite influence.
  pub fn new(x: f64, y: f64, cloud_cover: f64, influence_radius: f64) -> Self {
    Self {
      x,
      y,
      cloud_cover,
      influence_radius: (influence_radius >= 0.0).then_some(influence_radius),
    }
  }

  fn reaches(&self, distance: f64) -> bool {
    self.influence_radius.map_or(true, |r| distance <= r)
  }
}

/// Interpolates station cloud cover onto the cells of `template`,
/// weighting by `distance^(-power)`.
///
/// A cell that coincides with a station takes its value.
/// A cell out of reach of every station is an error.
pub fn interpolate_cloud_cover(
  template: &Grid,
  stations: &[Station],
  power: f64,
) -> Result<Grid, StabilityError> {
  if stations.is_empty() {
    return Err(StabilityError::NoStations);
  }
  if !(power > 0.0) {
    return Err(StabilityError::InterpolationPower(power));
  }

  let mut grid = template.like(0.0);
  for i in 0..grid.nrows() {
    for j in 0..grid.ncols() {
      let (xc, yc) = grid.cell_center(i, j);
      let mut value = 0.0;
      let mut weight_sum = 0.0;
      let mut exact = None;
      for station in stations {
        let distance = (xc - station.x).hypot(yc - station.y);
        if !station.reaches(distance) {
          continue;
        }
        if distance == 0.0 {
          exact = Some(station.cloud_cover);
          break;
        }
        let weight = distance.powf(power).recip();
        weight_sum += weight;
        value += station.cloud_cover * weight;
      }
      let cell = match exact {
        Some(v) => v,
        None if weight_sum != 0.0 => value / weight_sum,
        None => return Err(StabilityError::UnfilledInterpolation { row: i, col: j }),
      };
      grid.set(i, j, cell);
    }
  }
  Ok(grid)
}

#[cfg(test)]
mod test {
  use super::*;
  use approx::assert_relative_eq;

  fn template() -> Grid {
    Grid::constant(3, 4, 100.0, 0.0).unwrap()
  }

  #[test]
  fn single_station_fills_everything() {
    let stations = [Station::new(0.0, 0.0, 0.7, -1.0)];
    let grid = interpolate_cloud_cover(&template(), &stations, 2.0).unwrap();
    for &v in grid.data() {
      assert_relative_eq!(v, 0.7, epsilon = 1e-12);
    }
  }

  #[test]
  fn inverse_distance_squared() {
    // cell (0,0) centre is (50, 50)
    let stations = [
      Station::new(50.0, 150.0, 1.0, -1.0),
      Station::new(50.0, -150.0, 0.0, -1.0),
    ];
    let grid = interpolate_cloud_cover(&template(), &stations, 2.0).unwrap();
    // distances 100 and 200, weights 1/1e4 and 1/4e4
    assert_relative_eq!(grid.get(0, 0), 0.8, epsilon = 1e-12);
  }

  #[test]
  fn station_on_cell_centre() {
    let stations = [
      Station::new(150.0, 50.0, 0.3, -1.0),
      Station::new(0.0, 0.0, 0.9, -1.0),
    ];
    let grid = interpolate_cloud_cover(&template(), &stations, 2.0).unwrap();
    assert_eq!(grid.get(0, 1), 0.3);
  }

  #[test]
  fn limited_radius_leaves_holes() {
    let stations = [Station::new(50.0, 50.0, 0.5, 120.0)];
    assert!(matches!(
      interpolate_cloud_cover(&template(), &stations, 2.0),
      Err(StabilityError::UnfilledInterpolation { row: 0, col: 2 })
    ));
  }
}
