//! BLAS level 1 kernels on contiguous slices.
//!
//! Only unit strides are supported.

use rayon::prelude::*;

pub fn dot(x: &[f64], y: &[f64]) -> f64 {
  debug_assert_eq!(x.len(), y.len());
  x.par_iter().zip(y.par_iter()).map(|(a, b)| a * b).sum()
}

pub fn nrm2(x: &[f64]) -> f64 {
  dot(x, x).sqrt()
}

/// $y <- alpha x + y$
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
  debug_assert_eq!(x.len(), y.len());
  y.par_iter_mut().zip(x.par_iter()).for_each(|(yi, xi)| *yi += alpha * xi);
}

/// $y <- x + beta y$
pub fn xpby(x: &[f64], beta: f64, y: &mut [f64]) {
  debug_assert_eq!(x.len(), y.len());
  y.par_iter_mut().zip(x.par_iter()).for_each(|(yi, xi)| *yi = xi + beta * *yi);
}

pub fn scal(alpha: f64, x: &mut [f64]) {
  x.par_iter_mut().for_each(|xi| *xi *= alpha);
}

pub fn copy(x: &[f64], y: &mut [f64]) {
  debug_assert_eq!(x.len(), y.len());
  y.copy_from_slice(x);
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn level1_kernels() {
    let x = [1.0, 2.0, 3.0];
    let mut y = [1.0, 1.0, 1.0];

    assert_eq!(dot(&x, &y), 6.0);
    assert_eq!(nrm2(&[3.0, 4.0]), 5.0);

    axpy(2.0, &x, &mut y);
    assert_eq!(y, [3.0, 5.0, 7.0]);

    xpby(&x, -1.0, &mut y);
    assert_eq!(y, [-2.0, -3.0, -4.0]);

    scal(0.5, &mut y);
    assert_eq!(y, [-1.0, -1.5, -2.0]);

    copy(&x, &mut y);
    assert_eq!(y, x);
  }
}
