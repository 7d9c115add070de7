/*!
# Backend-agnostic matrices and N-dimensional arrays

## Overview

The mdmatrix crate provides a dense N-dimensional array with a runtime element kind,
and a matrix type on top of it where the heavy linear algebra is delegated to a
pluggable backend. The purpose is to give numeric code a small and predictable
array API, with numpy-like slicing and reductions, while the choice of backend is
made once when the matrices are created.

Here are the main features of mdmatrix:

- Dense array type in row-major order with the element kinds `f64`, `f32`, `i64`,
  `i32`, `i16`, `i8` and a generic object kind.
- Inclusive index ranges where negative indices count from the end.
- Matrix type with elementwise operations, concatenation and dispatch of products,
  solving and the decompositions to a backend.
- Read and write windows into a matrix, optionally transposed and copy-on-write.
- Matrix exponential by scaling and squaring with Padé approximants.
- Seeded, reproducible random generator and random matrices.
- Dimension validation across several matrices with shared size variables.

The naive backend included in the crate implements multiplication, solving, the
determinant, the inverse and the Cholesky and LU decompositions. Other backends
implement the [`Backend`] trait and are installed with a [`Factory`].

## Example

```
use mdmatrix::{expm, mat, MatrixAccess, END};

let a = mat![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 10.0]];

let b = a.slice(0..=END, 1..=END).unwrap();
let x = a.solve(&mdmatrix::ones(3, 1)).unwrap();

assert_eq!(b.to_vec_f64(), Ok(vec![2.0, 3.0, 5.0, 6.0, 8.0, 10.0]));
assert!((&a * &x).all_close(&mdmatrix::ones(3, 1), 1e-12, 1e-12));
assert!((expm(&mdmatrix::zeros(2, 2)).unwrap().trace().unwrap() - 2.0).abs() < 1e-15);
```

The top-level creation functions use the process-wide default factory, which can be
replaced with [`set_default_factory`].
*/

#![warn(missing_docs)]

mod array;
mod backend;
mod config;
mod error;
mod expm;
mod factory;
mod index;
mod kind;
mod matrix;
mod ops;
mod random;
mod shape;
mod validate;
mod view;

#[macro_use]
mod macros;

#[cfg(feature = "serde")]
mod serde;

pub use array::NdArray;
pub use backend::{unsupported, Backend, Lu, NaiveBackend, Qr, Svd};
pub use config::{Config, SEED_VAR, STREAM_VAR, VALIDATE_VAR};
pub use error::{Error, Result};
pub use expm::expm;
pub use factory::{default_factory, reset_default_factory, set_default_factory, Factory};
pub use index::{check_indices, check_linear_index, wrap_index, IndexRange, ALL, END};
pub use kind::{Element, ElementKind, Object, Value};
pub use matrix::{Matrix, MatrixAccess};
pub use ops::kahan_sum;
pub use random::{
    reset_default_rng, set_default_rng, set_seed, with_default_rng, SeededRng, DEFAULT_SEED,
    DEFAULT_STREAM,
};
pub use shape::{index_to_linear, linear_to_index, strides, Shape};
pub use validate::{
    set_validation_enabled, validate, validation_enabled, Dim, Requirement, Validator,
};
pub use view::MatrixView;

/// Creates a matrix of kind `f64` with all elements set to zero, using the default factory.
pub fn zeros(rows: usize, cols: usize) -> Matrix {
    default_factory().zeros(rows, cols)
}

/// Creates a matrix of kind `f64` with all elements set to one, using the default factory.
pub fn ones(rows: usize, cols: usize) -> Matrix {
    default_factory().ones(rows, cols)
}

/// Creates an identity matrix of kind `f64`, using the default factory.
pub fn eye(n: usize) -> Matrix {
    default_factory().eye(n)
}

/// Creates a matrix of kind `f64` with all elements set to the given value, using the
/// default factory.
pub fn fill(rows: usize, cols: usize, value: f64) -> Matrix {
    default_factory().fill(rows, cols, value)
}

/// Creates a matrix with uniform deviates in `[0, 1)` from the default generator.
pub fn rand(rows: usize, cols: usize) -> Matrix {
    default_factory().rand(rows, cols)
}

/// Creates a matrix with standard normal deviates from the default generator.
pub fn randn(rows: usize, cols: usize) -> Matrix {
    default_factory().randn(rows, cols)
}

/// Creates a `1 x n` matrix with values from `start` up to but not including `stop`.
///
/// # Errors
///
/// Returns an error if the step is zero or not finite.
pub fn arange(start: f64, stop: f64, step: f64) -> Result<Matrix> {
    default_factory().arange(start, stop, step)
}

/// Creates a matrix of kind `f64` from elements in row-major order, using the default
/// factory.
///
/// # Errors
///
/// Returns an error if the number of elements does not match the shape.
pub fn create(rows: usize, cols: usize, data: Vec<f64>) -> Result<Matrix> {
    default_factory().create(rows, cols, data)
}

/// Creates a matrix of kind `f64` from a sequence of rows, using the default factory.
///
/// # Errors
///
/// Returns an error if the rows have different lengths.
pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Matrix> {
    default_factory().from_rows(rows)
}
