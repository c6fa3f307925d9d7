use crate::{operators::ElSystemProvider, Error};

use common::{
  linalg::{CrsMatrix, LinalgError, SymmetricUpper},
  util,
};
use itertools::iproduct;
use mesh::{Mesh, NodeIdx, ReferenceElement};

use rayon::prelude::*;

pub type GalMat = CrsMatrix<SymmetricUpper>;
pub type GalVec = Vec<f64>;

/// Upper triangular CRS pattern of the trilinear hexahedral mesh.
///
/// Every node couples to the nodes of the up to 27 surrounding
/// positions. Columns of a row are increasing, the diagonal comes first.
pub fn crs_pattern(mesh: &Mesh) -> Result<GalMat, Error> {
  let (nrows, ncols, nlayers) = (mesh.nrows(), mesh.ncols(), mesh.nlayers());
  let offsets: Vec<(isize, isize, isize)> = iproduct!(-1..=1, -1..=1, -1..=1).collect();

  let rows: Vec<Vec<usize>> = (0..mesh.nnodes())
    .into_par_iter()
    .map(|row| {
      let (i, j, k) = mesh.node_ijk(row);
      let mut cols = Vec::with_capacity(mesh.node_type(i, j, k).ncoupled());
      cols.extend(
        offsets
          .iter()
          .filter_map(|&(dk, di, dj)| {
            let kk = k.checked_add_signed(dk).filter(|&kk| kk < nlayers)?;
            let ii = i.checked_add_signed(di).filter(|&ii| ii < nrows)?;
            let jj = j.checked_add_signed(dj).filter(|&jj| jj < ncols)?;
            Some(mesh.node_index(ii, jj, kk))
          })
          .filter(|&col| col >= row),
      );
      cols
    })
    .collect();

  let mut row_ptr = Vec::with_capacity(mesh.nnodes() + 1);
  row_ptr.push(0);
  for cols in &rows {
    row_ptr.push(row_ptr.last().copied().unwrap_or(0) + cols.len());
  }
  let col_ind = rows.concat();
  tracing::debug!("crs pattern with {} entries for {} nodes", col_ind.len(), mesh.nnodes());
  Ok(GalMat::from_pattern(mesh.nnodes(), row_ptr, col_ind)?)
}

/// Lateral faces and top.
pub fn boundary_flags(mesh: &Mesh) -> Vec<bool> {
  (0..mesh.nnodes())
    .into_par_iter()
    .map(|n| mesh.is_boundary(n))
    .collect()
}

/// Lateral faces, top and ground.
pub fn boundary_and_ground_flags(mesh: &Mesh) -> Vec<bool> {
  (0..mesh.nnodes())
    .into_par_iter()
    .map(|n| mesh.is_boundary(n) || mesh.is_ground(n))
    .collect()
}

struct Buffers {
  values: Vec<f64>,
  rhs: Vec<GalVec>,
}
impl Buffers {
  fn new(nnz: usize, nrhs: usize, nnodes: usize) -> Self {
    Self {
      values: vec![0.0; nnz],
      rhs: vec![vec![0.0; nnodes]; nrhs],
    }
  }

  fn merge(mut self, other: Self) -> Self {
    add_assign(&mut self.values, &other.values);
    for (a, b) in self.rhs.iter_mut().zip(&other.rhs) {
      add_assign(a, b);
    }
    self
  }
}

fn add_assign(a: &mut [f64], b: &[f64]) {
  a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
}

/// Assembly algorithm for the Galerkin matrix and vectors.
///
/// Overwrites the values of `galmat` and `galvecs`. Only the upper
/// triangle is accumulated. Elements are split into about one chunk per
/// thread, each summing into its own buffers, which are added up afterwards.
pub fn assemble_system(
  mesh: &Mesh,
  reference: &ReferenceElement,
  elsys: &impl ElSystemProvider,
  galmat: &mut GalMat,
  galvecs: &mut [GalVec],
) -> Result<(), Error> {
  let nnodes = mesh.nnodes();
  let nrhs = elsys.nrhs();
  assert_eq!(galmat.nrows(), nnodes);
  assert_eq!(galvecs.len(), nrhs);
  let pattern: &GalMat = galmat;

  let buffers = (0..mesh.nelems())
    .into_par_iter()
    .with_min_len(mesh.elem_split_len())
    .try_fold(
      || Buffers::new(pattern.nnz(), nrhs, nnodes),
      |mut buf, ielem| -> Result<Buffers, Error> {
        let nodes = mesh.elem_nodes(ielem);
        let qpoints = reference.element_geometry(mesh, ielem)?;
        let sys = elsys.eval(&nodes, &qpoints);

        for (k, &row) in nodes.iter().enumerate() {
          for (l, &col) in nodes.iter().enumerate() {
            if col < row {
              continue;
            }
            let pos = pattern
              .position(row, col)
              .ok_or_else(|| missing_entry(row, col))?;
            buf.values[pos] += sys.mat[(k, l)];
          }
          for (galvec, elvec) in buf.rhs.iter_mut().zip(&sys.rhs) {
            galvec[row] += elvec[k];
          }
        }
        Ok(buf)
      },
    )
    .try_reduce_with(|a, b| Ok(a.merge(b)))
    .unwrap_or_else(|| Ok(Buffers::new(pattern.nnz(), nrhs, nnodes)))?;

  galmat.values_mut().copy_from_slice(&buffers.values);
  for (galvec, rhs) in galvecs.iter_mut().zip(buffers.rhs) {
    *galvec = rhs;
  }
  Ok(())
}

fn missing_entry(row: NodeIdx, col: NodeIdx) -> LinalgError {
  LinalgError::InvalidStructure(format!("entry ({row}, {col}) is not part of the pattern"))
}

/// Row summed element matrix together with the assembled loads.
///
/// Returns the lumped diagonal and one vector per right hand side.
pub fn assemble_lumped(
  mesh: &Mesh,
  reference: &ReferenceElement,
  elsys: &impl ElSystemProvider,
) -> Result<(GalVec, Vec<GalVec>), Error> {
  let nnodes = mesh.nnodes();
  let nrhs = elsys.nrhs();

  let buffers = (0..mesh.nelems())
    .into_par_iter()
    .with_min_len(mesh.elem_split_len())
    .try_fold(
      || Buffers::new(nnodes, nrhs, nnodes),
      |mut buf, ielem| -> Result<Buffers, Error> {
        let nodes = mesh.elem_nodes(ielem);
        let qpoints = reference.element_geometry(mesh, ielem)?;
        let sys = elsys.eval(&nodes, &qpoints);
        for (k, &row) in nodes.iter().enumerate() {
          buf.values[row] += sys.mat.row(k).sum();
          for (galvec, elvec) in buf.rhs.iter_mut().zip(&sys.rhs) {
            galvec[row] += elvec[k];
          }
        }
        Ok(buf)
      },
    )
    .try_reduce_with(|a, b| Ok(a.merge(b)))
    .unwrap_or_else(|| Ok(Buffers::new(nnodes, nrhs, nnodes)))?;

  Ok((buffers.values, buffers.rhs))
}

/// Homogeneous Dirichlet conditions on the flagged DOFs.
///
/// Entries sharing a row or column with a flagged DOF are zeroed,
/// the diagonal becomes one and the right hand side zero.
/// Applying it twice changes nothing.
pub fn fix_dofs_zero(dof_flags: &[bool], galmat: &mut GalMat, galvec: &mut [f64]) {
  assert_eq!(dof_flags.len(), galmat.nrows());
  galmat.set_zero(|r, c| dof_flags[r] || dof_flags[c]);
  for idof in util::flags_to_indicies(dof_flags) {
    if let Some(l) = galmat.diagonal_position(idof) {
      galmat.values_mut()[l] = 1.0;
    }
    galvec[idof] = 0.0;
  }
}

/// Fix DOFs of the FE solutions to given coefficients.
///
/// `dof_coeffs[c]` holds the values for right hand side `c`, read on the
/// flagged DOFs only.
/// $mat(A_0, 0; 0, I) vec(mu_0, mu_diff) = vec(phi - A_(0 diff) gamma, gamma)$
pub fn fix_dofs_coeff(
  dof_flags: &[bool],
  dof_coeffs: &[&[f64]],
  galmat: &mut GalMat,
  galvecs: &mut [GalVec],
) {
  assert_eq!(dof_coeffs.len(), galvecs.len());

  // Move the known part of the solution to the right hand side.
  // Every stored entry stands for itself and its mirror.
  for row in 0..galmat.nrows() {
    for l in galmat.row_range(row).skip(1) {
      let col = galmat.col_ind()[l];
      let val = galmat.values()[l];
      match (dof_flags[row], dof_flags[col]) {
        (false, true) => galvecs
          .iter_mut()
          .zip(dof_coeffs)
          .for_each(|(b, g)| b[row] -= val * g[col]),
        (true, false) => galvecs
          .iter_mut()
          .zip(dof_coeffs)
          .for_each(|(b, g)| b[col] -= val * g[row]),
        _ => {}
      }
    }
  }

  let mut zero = vec![0.0; galmat.nrows()];
  fix_dofs_zero(dof_flags, galmat, &mut zero);

  let dofs = util::flags_to_indicies(dof_flags);
  for (b, g) in galvecs.iter_mut().zip(dof_coeffs) {
    dofs.iter().for_each(|&idof| b[idof] = g[idof]);
  }
}
