//! Nodal vertical coefficient $alpha_V$ from the run wide $alpha_H$.

use crate::{
  pasquill::{check_grid, pasquill_alpha_field, ShortwaveModel},
  stations::{interpolate_cloud_cover, Station},
  strouhal::{strouhal_alpha_field, CharacteristicHeight},
  StabilityError,
};

use mesh::{Grid, Mesh, ReferenceElement, VectorField};
use rayon::prelude::*;

/// Power of the inverse distance weighting of station cloud cover.
pub const STATION_INTERPOLATION_POWER: f64 = 2.0;

/// Ways to obtain the stability alpha field.
#[derive(Debug, Clone)]
pub enum StabilityStrategy {
  /// Uniform cloud cover over the domain.
  DomainAverage { cloud_cover: f64, speed: Grid },
  /// Cloud cover interpolated from weather stations.
  PointInitialization { stations: Vec<Station>, speed: Grid },
  /// Cloud cover from a gridded weather model.
  WeatherModel2d { cloud_cover: Grid, speed: Grid },
  /// Strouhal number from a potential temperature perturbation per node.
  Variable3d { theta_perturbation: Vec<f64> },
}

#[derive(Debug, Clone, Default)]
pub enum Stability {
  /// Neutral, $alpha_V = alpha_H$.
  #[default]
  Off,
  /// A single alpha for the whole domain.
  Given(f64),
  Strategy(StabilityStrategy),
}

/// Collaborators the strategies draw on.
pub struct StabilityContext<'a> {
  pub mesh: &'a Mesh,
  pub reference: &'a ReferenceElement,
  pub u0: &'a VectorField,
  pub shortwave: &'a dyn ShortwaveModel,
  pub characteristic_height: &'a dyn CharacteristicHeight,
}

impl StabilityStrategy {
  pub fn name(&self) -> &'static str {
    match self {
      Self::DomainAverage { .. } => "domain average",
      Self::PointInitialization { .. } => "point initialization",
      Self::WeatherModel2d { .. } => "2D weather model",
      Self::Variable3d { .. } => "3D variable",
    }
  }

  pub fn alpha_field(&self, ctx: &StabilityContext) -> Result<Vec<f64>, StabilityError> {
    match self {
      Self::DomainAverage { cloud_cover, speed } => {
        let cloud = speed.like(*cloud_cover);
        pasquill_alpha_field(ctx.mesh, ctx.shortwave, &cloud, speed)
      }
      Self::PointInitialization { stations, speed } => {
        check_grid("speed", speed, ctx.mesh)?;
        let cloud = interpolate_cloud_cover(speed, stations, STATION_INTERPOLATION_POWER)?;
        pasquill_alpha_field(ctx.mesh, ctx.shortwave, &cloud, speed)
      }
      Self::WeatherModel2d { cloud_cover, speed } => {
        pasquill_alpha_field(ctx.mesh, ctx.shortwave, cloud_cover, speed)
      }
      Self::Variable3d { theta_perturbation } => strouhal_alpha_field(
        ctx.mesh,
        ctx.reference,
        theta_perturbation,
        ctx.u0,
        ctx.characteristic_height,
      ),
    }
  }
}

impl Stability {
  /// $alpha_V = alpha_H / alpha$ per node.
  pub fn vertical_alpha(
    &self,
    alpha_h: f64,
    ctx: &StabilityContext,
  ) -> Result<Vec<f64>, StabilityError> {
    if !(alpha_h > 0.0) {
      return Err(StabilityError::NonPositive {
        what: "alphaH",
        value: alpha_h,
      });
    }
    let nnodes = ctx.mesh.nnodes();
    match self {
      Self::Off => Ok(vec![alpha_h; nnodes]),
      Self::Given(alpha) => {
        if !(*alpha > 0.0) {
          return Err(StabilityError::NonPositive {
            what: "alphaStability",
            value: *alpha,
          });
        }
        Ok(vec![alpha_h / alpha; nnodes])
      }
      Self::Strategy(strategy) => {
        let alpha = strategy.alpha_field(ctx)?;
        tracing::debug!("stability alpha field set by {}", strategy.name());
        Ok(alpha.par_iter().map(|a| alpha_h / a).collect())
      }
    }
  }
}
