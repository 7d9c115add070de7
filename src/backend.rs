//! Backend interface for the heavy numeric operations of matrices.
//!
//! A matrix keeps a shared handle to the backend that created it, and the matrix
//! methods for multiplication, solving and the decompositions dispatch to it. Every
//! operation has a default body that fails with [`Error::UnsupportedByBackend`], so a
//! backend implements only the subset it supports.

use std::fmt::Debug;

use crate::error::{Error, Result};
use crate::matrix::Matrix;

/// LU factorization with partial pivoting, `P * A = L * U`.
#[derive(Clone, Debug, PartialEq)]
pub struct Lu {
    /// Unit lower triangular factor.
    pub l: Matrix,
    /// Upper triangular factor.
    pub u: Matrix,
    /// Row permutation, where row `i` of `P * A` is row `perm[i]` of `A`.
    pub perm: Vec<usize>,
}

/// QR factorization, `A = Q * R`.
#[derive(Clone, Debug, PartialEq)]
pub struct Qr {
    /// Orthogonal factor.
    pub q: Matrix,
    /// Upper triangular factor.
    pub r: Matrix,
}

/// Singular value decomposition, `A = U * diag(s) * V^T`.
#[derive(Clone, Debug, PartialEq)]
pub struct Svd {
    /// Left singular vectors.
    pub u: Matrix,
    /// Singular values in decreasing order.
    pub s: Vec<f64>,
    /// Right singular vectors.
    pub v: Matrix,
}

/// Dense linear algebra operations supplied by a backend.
pub trait Backend: Debug + Send + Sync {
    /// Returns the backend name used in error messages.
    fn name(&self) -> &str;

    /// Returns the matrix product `a * b`.
    fn matmul(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        _ = (a, b);

        Err(unsupported(self.name(), "matmul"))
    }

    /// Returns the solution `x` of `a * x = b`.
    fn solve(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        _ = (a, b);

        Err(unsupported(self.name(), "solve"))
    }

    /// Returns the determinant.
    fn det(&self, a: &Matrix) -> Result<f64> {
        _ = a;

        Err(unsupported(self.name(), "det"))
    }

    /// Returns the inverse.
    fn inverse(&self, a: &Matrix) -> Result<Matrix> {
        _ = a;

        Err(unsupported(self.name(), "inverse"))
    }

    /// Returns the Moore-Penrose pseudo-inverse.
    fn pinv(&self, a: &Matrix) -> Result<Matrix> {
        _ = a;

        Err(unsupported(self.name(), "pinv"))
    }

    /// Returns the lower triangular Cholesky factor `l` with `a = l * l^T`.
    fn chol(&self, a: &Matrix) -> Result<Matrix> {
        _ = a;

        Err(unsupported(self.name(), "chol"))
    }

    /// Returns the LU factorization with partial pivoting.
    fn lu(&self, a: &Matrix) -> Result<Lu> {
        _ = a;

        Err(unsupported(self.name(), "lu"))
    }

    /// Returns the QR factorization.
    fn qr(&self, a: &Matrix) -> Result<Qr> {
        _ = a;

        Err(unsupported(self.name(), "qr"))
    }

    /// Returns the singular value decomposition.
    fn svd(&self, a: &Matrix) -> Result<Svd> {
        _ = a;

        Err(unsupported(self.name(), "svd"))
    }
}

/// Returns the error for an operation that the named backend does not implement.
pub fn unsupported(backend: &str, op: &'static str) -> Error {
    Error::UnsupportedByBackend { backend: backend.to_string(), op }
}

/// Reference backend with plain loops over `f64` elements.
///
/// Results always have the `f64` element kind. QR, SVD and the pseudo-inverse are
/// not implemented.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaiveBackend;

impl Backend for NaiveBackend {
    fn name(&self) -> &str {
        "naive"
    }

    fn matmul(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        if a.cols() != b.rows() {
            return Err(Error::shape(format!(
                "matmul requires inner dimensions to agree, got {}x{} and {}x{}",
                a.rows(),
                a.cols(),
                b.rows(),
                b.cols()
            )));
        }

        let (m, k, n) = (a.rows(), a.cols(), b.cols());
        let x = a.to_vec_f64()?;
        let y = b.to_vec_f64()?;
        let mut z = vec![0.0; m * n];

        for i in 0..m {
            for p in 0..k {
                let s = x[i * k + p];

                for j in 0..n {
                    z[i * n + j] += s * y[p * n + j];
                }
            }
        }

        a.with_data(m, n, z)
    }

    fn solve(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let n = square_dim(a, "solve")?;

        if b.rows() != n {
            return Err(Error::shape(format!(
                "solve requires {n} right-hand side rows, got {}x{}",
                b.rows(),
                b.cols()
            )));
        }

        let factors = Factors::new(a.to_vec_f64()?, n);

        if factors.singular {
            return Err(Error::Singular);
        }

        let m = b.cols();
        let rhs = b.to_vec_f64()?;
        let mut x = vec![0.0; n * m];

        for j in 0..m {
            let col = (0..n).map(|i| rhs[i * m + j]).collect::<Vec<_>>();

            for (i, value) in factors.substitute(&col).into_iter().enumerate() {
                x[i * m + j] = value;
            }
        }

        a.with_data(n, m, x)
    }

    fn det(&self, a: &Matrix) -> Result<f64> {
        let n = square_dim(a, "det")?;
        let factors = Factors::new(a.to_vec_f64()?, n);

        if factors.singular {
            return Ok(0.0);
        }

        Ok((0..n).fold(factors.sign, |acc, i| acc * factors.lu[i * n + i]))
    }

    fn inverse(&self, a: &Matrix) -> Result<Matrix> {
        let n = square_dim(a, "inverse")?;
        let eye = (0..n * n).map(|i| if i / n == i % n { 1.0 } else { 0.0 }).collect();

        self.solve(a, &a.with_data(n, n, eye)?)
    }

    fn chol(&self, a: &Matrix) -> Result<Matrix> {
        let n = square_dim(a, "chol")?;
        let x = a.to_vec_f64()?;
        let mut l = vec![0.0; n * n];

        for j in 0..n {
            let d = x[j * n + j] - (0..j).map(|p| l[j * n + p] * l[j * n + p]).sum::<f64>();

            if d <= 0.0 || d.is_nan() {
                return Err(Error::NotPositiveDefinite);
            }

            l[j * n + j] = d.sqrt();

            for i in j + 1..n {
                let s = x[i * n + j] - (0..j).map(|p| l[i * n + p] * l[j * n + p]).sum::<f64>();

                l[i * n + j] = s / l[j * n + j];
            }
        }

        a.with_data(n, n, l)
    }

    fn lu(&self, a: &Matrix) -> Result<Lu> {
        let n = square_dim(a, "lu")?;
        let factors = Factors::new(a.to_vec_f64()?, n);
        let mut l = vec![0.0; n * n];
        let mut u = vec![0.0; n * n];

        for i in 0..n {
            for j in 0..n {
                match i.cmp(&j) {
                    std::cmp::Ordering::Greater => l[i * n + j] = factors.lu[i * n + j],
                    std::cmp::Ordering::Equal => {
                        l[i * n + j] = 1.0;
                        u[i * n + j] = factors.lu[i * n + j];
                    }
                    std::cmp::Ordering::Less => u[i * n + j] = factors.lu[i * n + j],
                }
            }
        }

        Ok(Lu { l: a.with_data(n, n, l)?, u: a.with_data(n, n, u)?, perm: factors.perm })
    }
}

// Packed LU factors from Gaussian elimination with partial pivoting.
struct Factors {
    lu: Vec<f64>,
    perm: Vec<usize>,
    sign: f64,
    n: usize,
    singular: bool,
}

impl Factors {
    fn new(mut lu: Vec<f64>, n: usize) -> Self {
        let mut perm = (0..n).collect::<Vec<_>>();
        let mut sign = 1.0;
        let mut singular = false;

        for k in 0..n {
            let mut pivot = k;

            for i in k + 1..n {
                if lu[i * n + k].abs() > lu[pivot * n + k].abs() {
                    pivot = i;
                }
            }

            if lu[pivot * n + k] == 0.0 {
                singular = true;

                continue;
            }

            if pivot != k {
                for j in 0..n {
                    lu.swap(k * n + j, pivot * n + j);
                }

                perm.swap(k, pivot);
                sign = -sign;
            }

            for i in k + 1..n {
                let factor = lu[i * n + k] / lu[k * n + k];

                lu[i * n + k] = factor;

                for j in k + 1..n {
                    lu[i * n + j] -= factor * lu[k * n + j];
                }
            }
        }

        log::trace!("lu factorization of order {n}, singular: {singular}");

        Self { lu, perm, sign, n, singular }
    }

    // Solves for one right-hand side by forward and back substitution.
    fn substitute(&self, b: &[f64]) -> Vec<f64> {
        let n = self.n;
        let mut x = self.perm.iter().map(|&p| b[p]).collect::<Vec<_>>();

        for i in 0..n {
            for j in 0..i {
                x[i] -= self.lu[i * n + j] * x[j];
            }
        }

        for i in (0..n).rev() {
            for j in i + 1..n {
                x[i] -= self.lu[i * n + j] * x[j];
            }

            x[i] /= self.lu[i * n + i];
        }

        x
    }
}

fn square_dim(a: &Matrix, op: &str) -> Result<usize> {
    if a.rows() != a.cols() {
        return Err(Error::shape(format!(
            "{op} requires a square matrix, got {}x{}",
            a.rows(),
            a.cols()
        )));
    }

    Ok(a.rows())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factors_track_permutation_sign() {
        let factors = Factors::new(vec![0.0, 1.0, 1.0, 0.0], 2);

        assert!(!factors.singular);
        assert_eq!(factors.perm, [1, 0]);
        assert_eq!(factors.sign, -1.0);
        assert_eq!(factors.substitute(&[2.0, 3.0]), [3.0, 2.0]);
    }

    #[test]
    fn factors_flag_zero_pivot() {
        let factors = Factors::new(vec![1.0, 2.0, 2.0, 4.0], 2);

        assert!(factors.singular);
    }
}
