//! Cell centred raster grids, used for elevation and for surface
//! quantities like cloud cover.
//!
//! Row `i = 0` is the southern row, column `j = 0` the western one.

use crate::MeshError;

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
  nrows: usize,
  ncols: usize,
  cellsize: f64,
  data: Vec<f64>,
}

impl Grid {
  pub fn new(nrows: usize, ncols: usize, cellsize: f64, data: Vec<f64>) -> Result<Self, MeshError> {
    if nrows < 2 || ncols < 2 {
      return Err(MeshError::InvalidGrid(format!(
        "need at least 2x2 cells, got {nrows}x{ncols}"
      )));
    }
    if !(cellsize > 0.0 && cellsize.is_finite()) {
      return Err(MeshError::InvalidGrid(format!(
        "cell size must be positive, got {cellsize}"
      )));
    }
    if data.len() != nrows * ncols {
      return Err(MeshError::InvalidGrid(format!(
        "{} values for {nrows}x{ncols} cells",
        data.len()
      )));
    }
    if data.iter().any(|v| !v.is_finite()) {
      return Err(MeshError::InvalidGrid("grid contains non-finite values".into()));
    }
    Ok(Self {
      nrows,
      ncols,
      cellsize,
      data,
    })
  }

  pub fn from_fn(
    nrows: usize,
    ncols: usize,
    cellsize: f64,
    f: impl Fn(usize, usize) -> f64,
  ) -> Result<Self, MeshError> {
    let data = (0..nrows)
      .flat_map(|i| (0..ncols).map(move |j| (i, j)))
      .map(|(i, j)| f(i, j))
      .collect();
    Self::new(nrows, ncols, cellsize, data)
  }

  pub fn constant(nrows: usize, ncols: usize, cellsize: f64, value: f64) -> Result<Self, MeshError> {
    Self::new(nrows, ncols, cellsize, vec![value; nrows * ncols])
  }

  /// Same geometry, new values.
  pub fn like(&self, value: f64) -> Self {
    Self {
      data: vec![value; self.data.len()],
      ..self.clone()
    }
  }

  pub fn nrows(&self) -> usize {
    self.nrows
  }
  pub fn ncols(&self) -> usize {
    self.ncols
  }
  pub fn cellsize(&self) -> f64 {
    self.cellsize
  }
  pub fn data(&self) -> &[f64] {
    &self.data
  }

  pub fn get(&self, i: usize, j: usize) -> f64 {
    debug_assert!(i < self.nrows && j < self.ncols);
    self.data[i * self.ncols + j]
  }
  pub fn set(&mut self, i: usize, j: usize, value: f64) {
    debug_assert!(i < self.nrows && j < self.ncols);
    self.data[i * self.ncols + j] = value;
  }

  /// Centre of cell `(i, j)` relative to the lower left corner.
  pub fn cell_center(&self, i: usize, j: usize) -> (f64, f64) {
    (
      (j as f64 + 0.5) * self.cellsize,
      (i as f64 + 0.5) * self.cellsize,
    )
  }

  pub fn max_value(&self) -> f64 {
    self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
  }
}
