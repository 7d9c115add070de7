//! Matrix exponential by scaling and squaring with Padé approximants.
//!
//! The approximant order is chosen from the induced 1-norm of the matrix, following
//! Higham, "The scaling and squaring method for the matrix exponential revisited",
//! SIAM J. Matrix Anal. Appl. 26(4), 2005. Only matrix products, sums and the `solve`
//! operation of the backend are used.

use crate::error::{Error, Result};
use crate::kind::ElementKind;
use crate::matrix::{Matrix, MatrixAccess};

// Largest 1-norm for which the approximant of each order is accurate without scaling.
const THETA: [(f64, usize); 4] = [
    (1.495585217958292e-2, 3),
    (2.539398330063230e-1, 5),
    (9.504178996162932e-1, 7),
    (2.097847961257068e0, 9),
];

const THETA_13: f64 = 5.371920351148152;

const PADE_3: [f64; 4] = [120.0, 60.0, 12.0, 1.0];

const PADE_5: [f64; 6] = [30240.0, 15120.0, 3360.0, 420.0, 30.0, 1.0];

const PADE_7: [f64; 8] = [17297280.0, 8648640.0, 1995840.0, 277200.0, 25200.0, 1512.0, 56.0, 1.0];

const PADE_9: [f64; 10] = [
    17643225600.0,
    8821612800.0,
    2075673600.0,
    302702400.0,
    30270240.0,
    2162160.0,
    110880.0,
    3960.0,
    90.0,
    1.0,
];

const PADE_13: [f64; 14] = [
    64764752532480000.0,
    32382376266240000.0,
    7771770303897600.0,
    1187353796428800.0,
    129060195264000.0,
    10559470521600.0,
    670442572800.0,
    33522128640.0,
    1323241920.0,
    40840800.0,
    960960.0,
    16380.0,
    182.0,
    1.0,
];

/// Returns the matrix exponential `exp(a)`.
///
/// The result has the element kind `f64` and the backend of the input matrix.
///
/// # Errors
///
/// Returns an error if the matrix is not square, has the object kind or has infinite
/// or NaN elements. Errors from the backend, e.g. for a singular system in `solve`,
/// are returned unchanged.
pub fn expm(a: &Matrix) -> Result<Matrix> {
    if !a.is_square() {
        return Err(Error::shape(format!(
            "expm requires a square matrix, got {}x{}",
            a.rows(),
            a.cols()
        )));
    }

    let n = a.rows();
    let a = a.to_kind(ElementKind::F64)?;
    let norm = a.norm1()?;

    if !norm.is_finite() {
        return Err(Error::NotFinite("expm"));
    }

    let (u, v, squarings) = match THETA.iter().find(|&&(theta, _)| norm < theta) {
        Some(&(_, order)) => {
            log::debug!("expm of {n}x{n} matrix: norm1 {norm}, pade order {order}");

            let (u, v) = pade(&a, order)?;

            (u, v, 0)
        }
        None => {
            let s = (norm / THETA_13).log2().ceil().max(0.0) as i32;

            log::debug!("expm of {n}x{n} matrix: norm1 {norm}, pade order 13, {s} squarings");

            let (u, v) = pade_13(&a.div_scalar(2f64.powi(s))?)?;

            (u, v, s)
        }
    };

    let mut r = solve_by_columns(&v.sub(&u)?, &v.add(&u)?)?;

    for _ in 0..squarings {
        r = r.matmul(&r)?;
    }

    Ok(r)
}

// Returns the odd and even parts U and V of the approximant of order 3, 5, 7 or 9.
fn pade(a: &Matrix, order: usize) -> Result<(Matrix, Matrix)> {
    let b: &[f64] = match order {
        3 => &PADE_3,
        5 => &PADE_5,
        7 => &PADE_7,
        _ => &PADE_9,
    };

    let a2 = a.matmul(a)?;
    let mut power = a.pow(0)?;
    let mut u = power.mul_scalar(b[1])?;
    let mut v = power.mul_scalar(b[0])?;

    for k in 1..=order / 2 {
        power = power.matmul(&a2)?;
        u = u.add(&power.mul_scalar(b[2 * k + 1])?)?;
        v = v.add(&power.mul_scalar(b[2 * k])?)?;
    }

    Ok((a.matmul(&u)?, v))
}

fn pade_13(a: &Matrix) -> Result<(Matrix, Matrix)> {
    let b = &PADE_13;

    let a2 = a.matmul(a)?;
    let a4 = a2.matmul(&a2)?;
    let a6 = a4.matmul(&a2)?;
    let eye = a.pow(0)?;

    let u = a6.matmul(&combine(&[(b[13], &a6), (b[11], &a4), (b[9], &a2)])?)?;
    let u = u.add(&combine(&[(b[7], &a6), (b[5], &a4), (b[3], &a2), (b[1], &eye)])?)?;
    let u = a.matmul(&u)?;

    let v = a6.matmul(&combine(&[(b[12], &a6), (b[10], &a4), (b[8], &a2)])?)?;
    let v = v.add(&combine(&[(b[6], &a6), (b[4], &a4), (b[2], &a2), (b[0], &eye)])?)?;

    Ok((u, v))
}

// Returns the linear combination of the terms, which must not be empty.
fn combine(terms: &[(f64, &Matrix)]) -> Result<Matrix> {
    let (&(c, m), rest) = terms.split_first().ok_or_else(|| Error::shape("empty combination"))?;
    let mut sum = m.mul_scalar(c)?;

    for &(c, m) in rest {
        sum = sum.add(&m.mul_scalar(c)?)?;
    }

    Ok(sum)
}

// Solves (V - U) R = (V + U) one column at a time.
fn solve_by_columns(p: &Matrix, q: &Matrix) -> Result<Matrix> {
    let mut r = q.clone();

    for j in 0..q.cols() as isize {
        let x = p.solve(&q.col(j)?)?;

        r.set_col(j, &x)?;
    }

    Ok(r)
}
