use crate::{assemble::GalMat, Error};

use mesh::Mesh;
use vtkio::{
  model::{Attribute, Attributes, ByteOrder, Extent, StructuredGridPiece, Version, Vtk},
  IOBuffer,
};

use std::{
  fs::File,
  io::{BufWriter, Write},
  path::Path,
};

/// Structured grid carrying one scalar per node.
///
/// VTK orders structured points with x fastest, then y, then z, which is
/// the node numbering of the mesh.
pub fn scalar_field_to_vtk(mesh: &Mesh, name: &str, values: &[f64]) -> Result<Vtk, Error> {
  if values.len() != mesh.nnodes() {
    return Err(Error::FieldLength {
      what: "vtk scalars",
      got: values.len(),
      expected: mesh.nnodes(),
    });
  }

  let points: Vec<f64> = (0..mesh.nnodes())
    .flat_map(|n| [mesh.xord()[n], mesh.yord()[n], mesh.zord()[n]])
    .collect();
  let dims = [mesh.ncols(), mesh.nrows(), mesh.nlayers()].map(|d| d as u32);

  let piece = StructuredGridPiece {
    extent: Extent::Dims(dims),
    points: IOBuffer::new(points),
    data: Attributes {
      point: vec![Attribute::scalars(name, 1).with_data(values.to_vec())],
      cell: Vec::new(),
    },
  };

  Ok(Vtk {
    version: Version::new((4, 2)),
    title: format!("{name} field"),
    byte_order: ByteOrder::native(),
    data: piece.into(),
    file_path: None,
  })
}

/// Legacy ASCII VTK file.
pub fn write_scalar_field(
  mesh: &Mesh,
  name: &str,
  values: &[f64],
  path: impl AsRef<Path>,
) -> Result<(), Error> {
  let vtk = scalar_field_to_vtk(mesh, name, values)?;
  vtk
    .export_ascii(path.as_ref())
    .map_err(|err| Error::Vtk(format!("{err:?}")))?;
  tracing::info!("wrote {name} to {}", path.as_ref().display());
  Ok(())
}

/// Writes `A.txt` with one `slot = value , column` line per stored entry
/// and `b.txt` with one `row = value` line per row into `dir`.
pub fn write_system(galmat: &GalMat, galvec: &[f64], dir: impl AsRef<Path>) -> std::io::Result<()> {
  let dir = dir.as_ref();
  let mut a_file = BufWriter::new(File::create(dir.join("A.txt"))?);
  let mut b_file = BufWriter::new(File::create(dir.join("b.txt"))?);
  write_matrix(&mut a_file, galmat)?;
  write_vector(&mut b_file, galvec)?;
  a_file.flush()?;
  b_file.flush()
}

pub fn write_matrix<W: Write>(mut writer: W, galmat: &GalMat) -> std::io::Result<()> {
  for row in 0..galmat.nrows() {
    for l in galmat.row_range(row) {
      writeln!(writer, "{l} = {:.6} , {}", galmat.values()[l], galmat.col_ind()[l])?;
    }
  }
  Ok(())
}

pub fn write_vector<W: Write>(mut writer: W, galvec: &[f64]) -> std::io::Result<()> {
  for (i, v) in galvec.iter().enumerate() {
    writeln!(writer, "{i} = {v:.6}")?;
  }
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::assemble::crs_pattern;

  #[test]
  fn system_text_format() {
    let mesh = Mesh::uniform(2, 2, 2, 1.0, 1.0, 1.0).unwrap();
    let mut galmat = crs_pattern(&mesh).unwrap();
    galmat.values_mut()[0] = 2.5;

    let mut out = Vec::new();
    write_matrix(&mut out, &galmat).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), galmat.nnz());
    assert_eq!(lines[0], "0 = 2.500000 , 0");
    // node 0 couples to all 8 nodes of the single element
    assert_eq!(lines[7], "7 = 0.000000 , 7");

    let mut out = Vec::new();
    write_vector(&mut out, &[1.0, -0.5]).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "0 = 1.000000\n1 = -0.500000\n");
  }

  #[test]
  fn vtk_has_one_scalar_per_node() {
    let mesh = Mesh::uniform(3, 4, 2, 1.0, 1.0, 1.0).unwrap();
    let values: Vec<f64> = (0..mesh.nnodes()).map(|n| n as f64).collect();
    let vtk = scalar_field_to_vtk(&mesh, "PHI", &values).unwrap();
    assert_eq!(vtk.title, "PHI field");
    assert!(matches!(
      scalar_field_to_vtk(&mesh, "PHI", &values[1..]),
      Err(Error::FieldLength { .. })
    ));
  }
}
