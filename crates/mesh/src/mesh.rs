//! Terrain following structured hexahedral mesh.
//!
//! Nodes are numbered `k * nrows * ncols + i * ncols + j` with
//! `i` the row (south to north), `j` the column (west to east)
//! and `k` the layer, `k = 0` being the ground.

use crate::{element::NNPE, grid::Grid, ElemIdx, MeshError, NodeIdx};

use itertools::iproduct;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
  pub nlayers: usize,
  /// Ratio between the heights of two consecutive layers.
  pub vert_growth: f64,
  /// Horizontal resolution over height of the first cell layer.
  pub max_aspect_ratio: f64,
  /// Absolute height of the top of the domain. Derived when absent.
  pub domain_height: Option<f64>,
  pub output_wind_height: f64,
  pub max_roughness: f64,
}
impl Default for MeshConfig {
  fn default() -> Self {
    Self {
      nlayers: 20,
      vert_growth: 1.3,
      max_aspect_ratio: 400.0,
      domain_height: None,
      output_wind_height: 10.0,
      max_roughness: 0.0,
    }
  }
}

impl MeshConfig {
  pub fn validate(&self) -> Result<(), MeshError> {
    if self.nlayers < 2 {
      return Err(MeshError::Layers(self.nlayers));
    }
    if !(self.vert_growth >= 1.0) || self.vert_growth == 1.0 {
      return Err(MeshError::VerticalGrowth(self.vert_growth));
    }
    if !(self.max_aspect_ratio > 0.0) {
      return Err(MeshError::AspectRatio(self.max_aspect_ratio));
    }
    Ok(())
  }

  /// Absolute height of the domain top over a terrain of the given
  /// resolution and maximum elevation.
  pub fn compute_domain_height(&self, resolution: f64, max_elevation: f64) -> f64 {
    let g = self.vert_growth;
    let first_cell_height = resolution / self.max_aspect_ratio;
    let mut height = first_cell_height * (g.powi(self.nlayers as i32) - 1.0) / (g - 1.0);
    let min_height = 3.0 * (self.output_wind_height + self.max_roughness);
    if height < min_height {
      height = min_height;
    }
    height + max_elevation
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
  Internal,
  Face,
  Edge,
  Corner,
}
impl NodeType {
  /// Nodes sharing an element with a node of this type, itself included.
  pub fn ncoupled(self) -> usize {
    match self {
      Self::Internal => 27,
      Self::Face => 18,
      Self::Edge => 12,
      Self::Corner => 8,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Mesh {
  nrows: usize,
  ncols: usize,
  nlayers: usize,
  xord: Vec<f64>,
  yord: Vec<f64>,
  zord: Vec<f64>,
}

impl Mesh {
  /// Nodes sit on the cell centres of the elevation grid, relative to its
  /// lower left corner. Layers are stretched geometrically towards the top.
  pub fn from_elevation(dem: &Grid, config: &MeshConfig) -> Result<Self, MeshError> {
    config.validate()?;

    let res = dem.cellsize();
    let max_elevation = dem.max_value();
    let domain_height = config
      .domain_height
      .unwrap_or_else(|| config.compute_domain_height(res, max_elevation));
    if !(domain_height > max_elevation) {
      return Err(MeshError::DomainBelowTerrain {
        height: domain_height,
        max_elevation,
      });
    }

    let (nrows, ncols, nlayers) = (dem.nrows(), dem.ncols(), config.nlayers);
    let g = config.vert_growth;
    let n = nlayers as i32;
    let denom = 1.0 - g.powi(1 - n);

    let nnodes = nrows * ncols * nlayers;
    let mut xord = vec![0.0; nnodes];
    let mut yord = vec![0.0; nnodes];
    let mut zord = vec![0.0; nnodes];
    xord
      .par_iter_mut()
      .zip(yord.par_iter_mut())
      .zip(zord.par_iter_mut())
      .enumerate()
      .for_each(|(inode, ((x, y), z))| {
        let k = inode / (nrows * ncols);
        let rem = inode % (nrows * ncols);
        let (i, j) = (rem / ncols, rem % ncols);
        let elev = dem.get(i, j);
        *x = (j as f64 + 0.5) * res;
        *y = (i as f64 + 0.5) * res;
        *z = if k == 0 {
          elev
        } else {
          let k = k as i32;
          (domain_height - elev) * ((g.powi(k - n + 1) - g.powi(1 - n)) / denom) + elev
        };
      });

    tracing::debug!(
      "built {nrows}x{ncols}x{nlayers} terrain mesh, domain top at {domain_height:.1} m"
    );

    Ok(Self {
      nrows,
      ncols,
      nlayers,
      xord,
      yord,
      zord,
    })
  }

  /// Flat box with spacings `dx`, `dy`, `dz` and a node at the origin.
  pub fn uniform(
    nrows: usize,
    ncols: usize,
    nlayers: usize,
    dx: f64,
    dy: f64,
    dz: f64,
  ) -> Result<Self, MeshError> {
    let nnodes = nrows * ncols * nlayers;
    let mut xord = Vec::with_capacity(nnodes);
    let mut yord = Vec::with_capacity(nnodes);
    let mut zord = Vec::with_capacity(nnodes);
    for (k, i, j) in iproduct!(0..nlayers, 0..nrows, 0..ncols) {
      xord.push(j as f64 * dx);
      yord.push(i as f64 * dy);
      zord.push(k as f64 * dz);
    }
    Self::from_coords(nrows, ncols, nlayers, xord, yord, zord)
  }

  pub fn from_coords(
    nrows: usize,
    ncols: usize,
    nlayers: usize,
    xord: Vec<f64>,
    yord: Vec<f64>,
    zord: Vec<f64>,
  ) -> Result<Self, MeshError> {
    if nrows < 2 || ncols < 2 {
      return Err(MeshError::Coordinates(format!(
        "need at least 2x2 nodes per layer, got {nrows}x{ncols}"
      )));
    }
    if nlayers < 2 {
      return Err(MeshError::Layers(nlayers));
    }
    let nnodes = nrows * ncols * nlayers;
    for ord in [&xord, &yord, &zord] {
      if ord.len() != nnodes {
        return Err(MeshError::FieldLength {
          got: ord.len(),
          expected: nnodes,
        });
      }
    }
    let layer = nrows * ncols;
    if let Some(inode) = (layer..nnodes).find(|&n| !(zord[n] > zord[n - layer])) {
      return Err(MeshError::Coordinates(format!(
        "z does not increase away from the ground at node {inode}"
      )));
    }
    Ok(Self {
      nrows,
      ncols,
      nlayers,
      xord,
      yord,
      zord,
    })
  }

  pub fn nrows(&self) -> usize {
    self.nrows
  }
  pub fn ncols(&self) -> usize {
    self.ncols
  }
  pub fn nlayers(&self) -> usize {
    self.nlayers
  }
  pub fn nnodes(&self) -> usize {
    self.nrows * self.ncols * self.nlayers
  }
  pub fn nelems(&self) -> usize {
    (self.nrows - 1) * (self.ncols - 1) * (self.nlayers - 1)
  }
  pub fn nnodes_per_layer(&self) -> usize {
    self.nrows * self.ncols
  }

  pub fn xord(&self) -> &[f64] {
    &self.xord
  }
  pub fn yord(&self) -> &[f64] {
    &self.yord
  }
  pub fn zord(&self) -> &[f64] {
    &self.zord
  }

  pub fn node_index(&self, i: usize, j: usize, k: usize) -> NodeIdx {
    debug_assert!(i < self.nrows && j < self.ncols && k < self.nlayers);
    k * self.ncols * self.nrows + i * self.ncols + j
  }

  /// `(i, j, k)` of a node.
  pub fn node_ijk(&self, inode: NodeIdx) -> (usize, usize, usize) {
    debug_assert!(inode < self.nnodes());
    let layer = self.nnodes_per_layer();
    let rem = inode % layer;
    (rem / self.ncols, rem % self.ncols, inode / layer)
  }

  pub fn coord(&self, inode: NodeIdx) -> na::Vector3<f64> {
    na::Vector3::new(self.xord[inode], self.yord[inode], self.zord[inode])
  }

  pub fn is_ground(&self, inode: NodeIdx) -> bool {
    inode < self.nnodes_per_layer()
  }

  /// The ground node below `inode`.
  pub fn ground_node(&self, inode: NodeIdx) -> NodeIdx {
    inode % self.nnodes_per_layer()
  }

  /// Number of outer domain faces the node lies on, ground included.
  /// Determines the row length of the sparse pattern.
  pub fn node_type(&self, i: usize, j: usize, k: usize) -> NodeType {
    let on_face = [
      i == 0 || i == self.nrows - 1,
      j == 0 || j == self.ncols - 1,
      k == 0 || k == self.nlayers - 1,
    ];
    match on_face.iter().filter(|&&b| b).count() {
      0 => NodeType::Internal,
      1 => NodeType::Face,
      2 => NodeType::Edge,
      _ => NodeType::Corner,
    }
  }

  /// Lateral faces and the top. The ground is not part of it.
  pub fn is_boundary(&self, inode: NodeIdx) -> bool {
    let (i, j, k) = self.node_ijk(inode);
    i == 0 || i == self.nrows - 1 || j == 0 || j == self.ncols - 1 || k == self.nlayers - 1
  }

  pub fn elem_index(&self, row: usize, col: usize, layer: usize) -> ElemIdx {
    debug_assert!(row < self.nrows - 1 && col < self.ncols - 1 && layer < self.nlayers - 1);
    layer * (self.nrows - 1) * (self.ncols - 1) + row * (self.ncols - 1) + col
  }

  /// `(row, col, layer)` of an element.
  pub fn elem_ijk(&self, ielem: ElemIdx) -> (usize, usize, usize) {
    debug_assert!(ielem < self.nelems());
    let per_layer = (self.nrows - 1) * (self.ncols - 1);
    let layer = ielem / per_layer;
    let rem = ielem - layer * per_layer;
    let row = rem / (self.ncols - 1);
    let col = rem - row * (self.ncols - 1);
    (row, col, layer)
  }

  /// Lower south west node of an element.
  pub fn node0(&self, ielem: ElemIdx) -> NodeIdx {
    let (row, col, layer) = self.elem_ijk(ielem);
    self.node_index(row, col, layer)
  }

  /// Local nodes `0..4` run counter clockwise on the lower layer starting
  /// at `node0`, `4..8` likewise on the upper layer.
  pub fn global_node(&self, ilocal: usize, ielem: ElemIdx) -> NodeIdx {
    self.elem_nodes(ielem)[ilocal]
  }

  /// Smallest number of elements handed to one parallel split.
  /// Per split accumulators then exist about once per thread.
  pub fn elem_split_len(&self) -> usize {
    self.nelems().div_ceil(rayon::current_num_threads()).max(1)
  }

  pub fn elem_nodes(&self, ielem: ElemIdx) -> [NodeIdx; NNPE] {
    let n0 = self.node0(ielem);
    let ncols = self.ncols;
    let layer = self.nnodes_per_layer();
    let lower = [n0, n0 + 1, n0 + ncols + 1, n0 + ncols];
    [
      lower[0],
      lower[1],
      lower[2],
      lower[3],
      lower[0] + layer,
      lower[1] + layer,
      lower[2] + layer,
      lower[3] + layer,
    ]
  }

  pub fn elem_coords(&self, ielem: ElemIdx) -> [na::Vector3<f64>; NNPE] {
    self.elem_nodes(ielem).map(|inode| self.coord(inode))
  }

  pub fn min_x(&self) -> f64 {
    self.xord[0]
  }
  pub fn min_y(&self) -> f64 {
    self.yord[0]
  }
  pub fn max_x(&self) -> f64 {
    self.xord[self.node_index(self.nrows - 1, self.ncols - 1, 0)]
  }
  pub fn max_y(&self) -> f64 {
    self.yord[self.node_index(self.nrows - 1, self.ncols - 1, 0)]
  }

  pub fn in_mesh_xy(&self, x: f64, y: f64) -> bool {
    !(x < self.min_x() || x > self.max_x() || y < self.min_y() || y > self.max_y())
  }

  /// Highest node of the top layer.
  pub fn domain_top(&self) -> f64 {
    let top = (self.nlayers - 1) * self.nnodes_per_layer();
    self.zord[top..].iter().copied().fold(f64::NEG_INFINITY, f64::max)
  }

  /// Height of every node above the ground node of its column.
  pub fn height_above_ground(&self) -> Vec<f64> {
    (0..self.nnodes())
      .into_par_iter()
      .map(|inode| self.zord[inode] - self.zord[self.ground_node(inode)])
      .collect()
  }

  /// Largest ratio of longest to shortest mean edge length over the ground
  /// layer elements, which are the most degenerate ones.
  pub fn ground_aspect_ratio(&self) -> f64 {
    let edge = |a: NodeIdx, b: NodeIdx| (self.coord(b) - self.coord(a)).norm();
    let mut aspect_ratio = 1.0_f64;
    for (i, j) in iproduct!(0..self.nrows - 1, 0..self.ncols - 1) {
      let n = |di: usize, dj: usize, dk: usize| self.node_index(i + di, j + dj, dk);
      let ex = [(0, 0), (1, 0), (0, 1), (1, 1)]
        .iter()
        .map(|&(di, dk)| edge(n(di, 0, dk), n(di, 1, dk)))
        .sum::<f64>()
        / 4.0;
      let ey = [(0, 0), (1, 0), (0, 1), (1, 1)]
        .iter()
        .map(|&(dj, dk)| edge(n(0, dj, dk), n(1, dj, dk)))
        .sum::<f64>()
        / 4.0;
      let ez = [(0, 0), (0, 1), (1, 0), (1, 1)]
        .iter()
        .map(|&(di, dj)| edge(n(di, dj, 0), n(di, dj, 1)))
        .sum::<f64>()
        / 4.0;
      let longest = ex.max(ey).max(ez);
      let shortest = ex.min(ey).min(ez);
      aspect_ratio = aspect_ratio.max(longest / shortest);
    }
    aspect_ratio
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn node_and_element_indexing() {
    let mesh = Mesh::uniform(3, 4, 2, 1.0, 1.0, 1.0).unwrap();
    assert_eq!(mesh.nnodes(), 24);
    assert_eq!(mesh.nelems(), 6);
    assert_eq!(mesh.node_index(1, 2, 1), 12 + 4 + 2);
    assert_eq!(mesh.node_ijk(18), (1, 2, 1));

    let ielem = mesh.elem_index(1, 2, 0);
    assert_eq!(ielem, 5);
    assert_eq!(mesh.elem_ijk(ielem), (1, 2, 0));
    assert_eq!(mesh.node0(ielem), 6);
    assert_eq!(mesh.elem_nodes(ielem), [6, 7, 11, 10, 18, 19, 23, 22]);
    assert_eq!(mesh.global_node(2, ielem), 11);
  }

  #[test]
  fn node_types() {
    let mesh = Mesh::uniform(4, 4, 4, 1.0, 1.0, 1.0).unwrap();
    assert_eq!(mesh.node_type(1, 2, 1), NodeType::Internal);
    assert_eq!(mesh.node_type(0, 2, 1), NodeType::Face);
    assert_eq!(mesh.node_type(1, 2, 0), NodeType::Face);
    assert_eq!(mesh.node_type(0, 3, 2), NodeType::Edge);
    assert_eq!(mesh.node_type(3, 0, 3), NodeType::Corner);
  }

  #[test]
  fn elements_split_once_per_thread() {
    let mesh = Mesh::uniform(9, 8, 5, 1.0, 1.0, 1.0).unwrap();
    let len = mesh.elem_split_len();
    let nthreads = rayon::current_num_threads();
    assert!(len >= 1);
    assert!(len * nthreads >= mesh.nelems());
    assert!((len - 1) * nthreads < mesh.nelems());
  }

  #[test]
  fn rejects_bad_config() {
    let dem = Grid::constant(3, 3, 100.0, 0.0).unwrap();
    let mut config = MeshConfig {
      vert_growth: 1.0,
      ..Default::default()
    };
    assert!(matches!(
      Mesh::from_elevation(&dem, &config),
      Err(MeshError::VerticalGrowth(_))
    ));
    config.vert_growth = 0.9;
    assert!(Mesh::from_elevation(&dem, &config).is_err());
    config.vert_growth = 1.3;
    config.nlayers = 0;
    assert!(matches!(
      Mesh::from_elevation(&dem, &config),
      Err(MeshError::Layers(0))
    ));
  }
}
