use std::fmt::{self, Debug, Formatter};
use std::ops::{Add, Deref, DerefMut, Div, Mul, Neg, Sub};
use std::sync::Arc;

use crate::array::NdArray;
use crate::backend::{Backend, Lu, Qr, Svd};
use crate::error::{Error, Result};
use crate::factory;
use crate::index::{IndexRange, ALL};
use crate::kind::{Element, ElementKind, Value};
use crate::ops::kahan_sum;

/// Read access shared by matrices and matrix views.
///
/// Only the element accessors are required. The remaining methods have default
/// bodies built on them, which implementors may override with faster versions.
pub trait MatrixAccess {
    /// Returns the number of rows.
    fn rows(&self) -> usize;

    /// Returns the number of columns.
    fn cols(&self) -> usize;

    /// Returns the element at the given position converted to `f64`.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is out of bounds, or for the object kind.
    fn get_f64(&self, row: usize, col: usize) -> Result<f64>;

    /// Returns the number of rows and columns.
    fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    /// Returns `true` if the number of rows and columns are equal.
    fn is_square(&self) -> bool {
        self.rows() == self.cols()
    }

    /// Returns all elements converted to `f64` in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind.
    fn to_vec_f64(&self) -> Result<Vec<f64>> {
        let mut vec = Vec::with_capacity(self.rows() * self.cols());

        for i in 0..self.rows() {
            for j in 0..self.cols() {
                vec.push(self.get_f64(i, j)?);
            }
        }

        Ok(vec)
    }

    /// Returns a new matrix with a copy of the elements.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind.
    fn to_matrix(&self) -> Result<Matrix> {
        factory::default_factory().create(self.rows(), self.cols(), self.to_vec_f64()?)
    }

    /// Returns the sum of the diagonal elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not square, or for the object kind.
    fn trace(&self) -> Result<f64> {
        if !self.is_square() {
            return Err(Error::shape(format!(
                "trace requires a square matrix, got {}x{}",
                self.rows(),
                self.cols()
            )));
        }

        let diag = (0..self.rows()).map(|i| self.get_f64(i, i)).collect::<Result<Vec<_>>>()?;

        Ok(kahan_sum(diag))
    }

    /// Returns the induced 1-norm, i.e. the largest absolute column sum.
    ///
    /// The result is NaN if any column sum is NaN.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind.
    fn norm1(&self) -> Result<f64> {
        let mut norm = 0.0f64;

        for j in 0..self.cols() {
            let col = (0..self.rows()).map(|i| self.get_f64(i, j)).collect::<Result<Vec<_>>>()?;
            let sum = kahan_sum(col.into_iter().map(f64::abs));

            if sum.is_nan() {
                return Ok(f64::NAN);
            }

            norm = norm.max(sum);
        }

        Ok(norm)
    }

    /// Returns the Frobenius norm, i.e. the square root of the sum of squares.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind.
    fn norm_fro(&self) -> Result<f64> {
        Ok(kahan_sum(self.to_vec_f64()?.into_iter().map(|x| x * x)).sqrt())
    }
}

/// Dense matrix, i.e. an array of rank 2 tied to the backend that created it.
///
/// The matrix dereferences to the underlying [`NdArray`], which gives access to the
/// generic element accessors and reductions. Heavy operations like multiplication and
/// the decompositions are dispatched to the backend, and results share the backend.
#[derive(Clone)]
pub struct Matrix {
    array: NdArray,
    backend: Arc<dyn Backend>,
}

impl Matrix {
    /// Creates a matrix from an array of rank 2 and a backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the array rank is not 2.
    pub fn new(array: NdArray, backend: Arc<dyn Backend>) -> Result<Self> {
        if array.rank() != 2 {
            return Err(Error::shape(format!(
                "matrix requires an array of rank 2, got shape {}",
                array.shape()
            )));
        }

        Ok(Self { array, backend })
    }

    /// Returns the number of rows.
    pub fn rows(&self) -> usize {
        self.array.dim(0)
    }

    /// Returns the number of columns.
    pub fn cols(&self) -> usize {
        self.array.dim(1)
    }

    /// Returns `true` if the number of rows and columns are equal.
    pub fn is_square(&self) -> bool {
        self.rows() == self.cols()
    }

    /// Returns the underlying array.
    pub fn array(&self) -> &NdArray {
        &self.array
    }

    /// Converts the matrix into the underlying array.
    pub fn into_array(self) -> NdArray {
        self.array
    }

    /// Returns the backend of the matrix.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Returns a copy of the matrix using another backend.
    pub fn with_backend(&self, backend: Arc<dyn Backend>) -> Self {
        Self { array: self.array.clone(), backend }
    }

    /// Returns the element at the given position.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Result<Value> {
        self.array.get(&[row, col])
    }

    /// Sets the element at the given position.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is out of bounds, or if the value cannot be
    /// represented in the element kind.
    pub fn set<V: Into<Value>>(&mut self, row: usize, col: usize, value: V) -> Result<()> {
        self.array.set(&[row, col], value)
    }

    /// Returns the element at the given position converted to `f64`.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is out of bounds, or for the object kind.
    pub fn get_f64(&self, row: usize, col: usize) -> Result<f64> {
        self.array.get_f64(&[row, col])
    }

    /// Sets the element at the given position from an `f64` value.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is out of bounds, or if the value cannot be
    /// represented in the element kind.
    pub fn set_f64(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        self.array.set_f64(&[row, col], value)
    }

    /// Returns all elements converted to `f64` in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind.
    pub fn to_vec_f64(&self) -> Result<Vec<f64>> {
        self.array.to_vec_f64()
    }

    /// Returns a copy of the matrix with the elements converted to another kind.
    ///
    /// # Errors
    ///
    /// Returns an error if an element cannot be represented in the new kind.
    pub fn to_kind(&self, kind: ElementKind) -> Result<Self> {
        Ok(self.derive(self.array.to_kind(kind)?))
    }

    /// Returns a new matrix with a copy of the addressed region.
    ///
    /// Both ranges are inclusive and may use negative indices counting from the end,
    /// so `m.slice(0..=END, 1..=END)` drops the first column.
    ///
    /// # Errors
    ///
    /// Returns an error if a range is out of bounds.
    pub fn slice<R, C>(&self, rows: R, cols: C) -> Result<Self>
    where
        R: Into<IndexRange>,
        C: Into<IndexRange>,
    {
        Ok(self.derive(self.array.slice(&[rows.into(), cols.into()])?))
    }

    /// Copies the elements of another matrix into the addressed region.
    ///
    /// # Errors
    ///
    /// Returns an error if a range is out of bounds, or if the region shape does not
    /// exactly match the shape of the value.
    pub fn assign<R, C>(&mut self, rows: R, cols: C, value: &Matrix) -> Result<()>
    where
        R: Into<IndexRange>,
        C: Into<IndexRange>,
    {
        self.array.assign_slice(&[rows.into(), cols.into()], &value.array)
    }

    /// Sets every element in the addressed region to the given value.
    ///
    /// # Errors
    ///
    /// Returns an error if a range is out of bounds, or if the value cannot be
    /// represented in the element kind.
    pub fn fill<R, C, V>(&mut self, rows: R, cols: C, value: V) -> Result<()>
    where
        R: Into<IndexRange>,
        C: Into<IndexRange>,
        V: Into<Value>,
    {
        self.array.fill_slice(&[rows.into(), cols.into()], value)
    }

    /// Returns the transpose of the matrix.
    pub fn transpose(&self) -> Self {
        let offsets = (0..self.len()).map(|i| (i % self.rows()) * self.cols() + i / self.rows());
        let storage = self.array.storage().gather(&offsets.collect::<Vec<_>>());

        self.derive(NdArray::from_parts([self.cols(), self.rows()].into(), storage))
    }

    /// Returns a copy of a row as a `1 x cols` matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the row is out of bounds.
    pub fn row(&self, row: isize) -> Result<Self> {
        self.slice(row, ALL)
    }

    /// Returns a copy of a column as a `rows x 1` matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is out of bounds.
    pub fn col(&self, col: isize) -> Result<Self> {
        self.slice(ALL, col)
    }

    /// Replaces a row with the elements of a `1 x cols` matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the row is out of bounds or the shapes do not match.
    pub fn set_row(&mut self, row: isize, value: &Matrix) -> Result<()> {
        self.assign(row, ALL, value)
    }

    /// Replaces a column with the elements of a `rows x 1` matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is out of bounds or the shapes do not match.
    pub fn set_col(&mut self, col: isize, value: &Matrix) -> Result<()> {
        self.assign(ALL, col, value)
    }

    /// Concatenates matrices horizontally, i.e. side by side.
    ///
    /// The result has the backend of the first matrix. The element kind is kept if all
    /// matrices have the same kind, and is `f64` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if no matrices are given, or if the number of rows differs.
    pub fn hstack(matrices: &[&Matrix]) -> Result<Self> {
        let first = matrices.first().ok_or_else(|| Error::shape("hstack of no matrices"))?;
        let rows = first.rows();

        if let Some(m) = matrices.iter().find(|m| m.rows() != rows) {
            return Err(Error::shape(format!(
                "hstack requires equal row counts, got {} and {}",
                rows,
                m.rows()
            )));
        }

        let cols = matrices.iter().map(|m| m.cols()).sum();
        let mut result = first.derive(NdArray::zeros(stack_kind(matrices), [rows, cols]));
        let mut offset = 0;

        for m in matrices {
            if m.cols() > 0 {
                let last = (offset + m.cols() - 1) as isize;

                result.assign(ALL, IndexRange::new(offset as isize, last), m)?;
            }

            offset += m.cols();
        }

        Ok(result)
    }

    /// Concatenates matrices vertically, i.e. on top of each other.
    ///
    /// The result has the backend of the first matrix. The element kind is kept if all
    /// matrices have the same kind, and is `f64` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if no matrices are given, or if the number of columns differs.
    pub fn vstack(matrices: &[&Matrix]) -> Result<Self> {
        let first = matrices.first().ok_or_else(|| Error::shape("vstack of no matrices"))?;
        let cols = first.cols();

        if let Some(m) = matrices.iter().find(|m| m.cols() != cols) {
            return Err(Error::shape(format!(
                "vstack requires equal column counts, got {} and {}",
                cols,
                m.cols()
            )));
        }

        let rows = matrices.iter().map(|m| m.rows()).sum();
        let mut result = first.derive(NdArray::zeros(stack_kind(matrices), [rows, cols]));
        let mut offset = 0;

        for m in matrices {
            if m.rows() > 0 {
                let last = (offset + m.rows() - 1) as isize;

                result.assign(IndexRange::new(offset as isize, last), ALL, m)?;
            }

            offset += m.rows();
        }

        Ok(result)
    }

    /// Returns the running sum of the elements in row-major order as a `1 x n` matrix.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind.
    pub fn cum_sum(&self) -> Result<Self> {
        let mut sum = 0.0;
        let vec = self
            .to_vec_f64()?
            .into_iter()
            .map(|x| {
                sum += x;
                sum
            })
            .collect::<Vec<_>>();

        self.with_data(1, vec.len(), vec)
    }

    /// Returns the matrix raised to a non-negative integer power by repeated
    /// multiplication, where the power zero gives the identity matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not square or the power is negative, or if
    /// the backend fails to multiply.
    pub fn pow(&self, k: i32) -> Result<Self> {
        if !self.is_square() {
            return Err(Error::shape(format!(
                "pow requires a square matrix, got {}x{}",
                self.rows(),
                self.cols()
            )));
        }

        if k < 0 {
            return Err(Error::OutOfRange(format!("negative matrix power {k} is not supported")));
        }

        if k == 0 {
            let n = self.rows();

            return Ok(self.derive(NdArray::from_fn([n, n], |i| f64::from(i[0] == i[1]))));
        }

        let mut result = self.clone();

        for _ in 1..k {
            result = result.matmul(self)?;
        }

        Ok(result)
    }

    /// Returns the diagonal elements as a column vector.
    pub fn diag(&self) -> Self {
        let n = self.rows().min(self.cols());
        let offsets = (0..n).map(|i| i * self.cols() + i).collect::<Vec<_>>();

        self.derive(NdArray::from_parts([n, 1].into(), self.array.storage().gather(&offsets)))
    }

    /// Returns the largest absolute elementwise difference to another matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes differ, or for the object kind.
    pub fn max_abs_diff(&self, other: &Matrix) -> Result<f64> {
        if self.dims() != other.dims() {
            return Err(Error::mismatch("max_abs_diff", self.dims(), other.dims()));
        }

        let x = self.to_vec_f64()?;
        let y = other.to_vec_f64()?;

        Ok(x.iter().zip(&y).fold(0.0, |acc, (a, b)| f64::max(acc, (a - b).abs())))
    }

    /// Returns the elementwise sum of two matrices.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes or element kinds differ, or for the object kind.
    pub fn add(&self, other: &Matrix) -> Result<Self> {
        Ok(self.derive(self.array.add(&other.array)?))
    }

    /// Returns the elementwise difference of two matrices.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes or element kinds differ, or for the object kind.
    pub fn sub(&self, other: &Matrix) -> Result<Self> {
        Ok(self.derive(self.array.sub(&other.array)?))
    }

    /// Returns the elementwise product of two matrices.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes or element kinds differ, or for the object kind.
    pub fn mul_elem(&self, other: &Matrix) -> Result<Self> {
        Ok(self.derive(self.array.mul_elem(&other.array)?))
    }

    /// Returns the matrix with each element negated.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind.
    pub fn neg(&self) -> Result<Self> {
        Ok(self.derive(self.array.neg()?))
    }

    /// Returns the matrix with each element multiplied by a scalar.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind, or if a result does not fit in the kind.
    pub fn mul_scalar(&self, scalar: f64) -> Result<Self> {
        Ok(self.derive(self.array.mul_scalar(scalar)?))
    }

    /// Returns the matrix with each element divided by a scalar.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind, or if a result does not fit in the kind.
    pub fn div_scalar(&self, scalar: f64) -> Result<Self> {
        Ok(self.derive(self.array.div_scalar(scalar)?))
    }

    /// Returns the matrix with each element raised to the given power.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind, or if a result does not fit in the kind.
    pub fn pow_elem(&self, exponent: f64) -> Result<Self> {
        Ok(self.derive(self.array.pow_elem(exponent)?))
    }

    /// Returns the matrix product, computed by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the inner dimensions differ, or if the backend does not
    /// support the operation.
    pub fn matmul(&self, other: &Matrix) -> Result<Self> {
        self.backend.matmul(self, other)
    }

    /// Returns the solution `x` of `self * x = rhs`, computed by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is singular or the shapes do not match, or if the
    /// backend does not support the operation.
    pub fn solve(&self, rhs: &Matrix) -> Result<Self> {
        self.backend.solve(self, rhs)
    }

    /// Returns the determinant, computed by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not square, or if the backend does not
    /// support the operation.
    pub fn det(&self) -> Result<f64> {
        self.backend.det(self)
    }

    /// Returns the inverse, computed by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is singular or not square, or if the backend
    /// does not support the operation.
    pub fn inverse(&self) -> Result<Self> {
        self.backend.inverse(self)
    }

    /// Returns the pseudo-inverse, computed by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not support the operation.
    pub fn pinv(&self) -> Result<Self> {
        self.backend.pinv(self)
    }

    /// Returns the lower triangular Cholesky factor, computed by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not positive definite, or if the backend does
    /// not support the operation.
    pub fn chol(&self) -> Result<Self> {
        self.backend.chol(self)
    }

    /// Returns the LU factorization, computed by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not square, or if the backend does not
    /// support the operation.
    pub fn lu(&self) -> Result<Lu> {
        self.backend.lu(self)
    }

    /// Returns the QR factorization, computed by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not support the operation.
    pub fn qr(&self) -> Result<Qr> {
        self.backend.qr(self)
    }

    /// Returns the singular value decomposition, computed by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not support the operation.
    pub fn svd(&self) -> Result<Svd> {
        self.backend.svd(self)
    }

    /// Creates a matrix of kind `f64` with the same backend, from elements in
    /// row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of elements does not match the shape.
    pub fn with_data(&self, rows: usize, cols: usize, vec: Vec<f64>) -> Result<Self> {
        Ok(self.derive(NdArray::from_vec([rows, cols], vec)?))
    }

    // Wraps an array of rank 2 with the same backend.
    pub(crate) fn derive(&self, array: NdArray) -> Self {
        Self::from_parts(array, Arc::clone(&self.backend))
    }

    pub(crate) fn from_parts(array: NdArray, backend: Arc<dyn Backend>) -> Self {
        debug_assert!(array.rank() == 2, "invalid rank");

        Self { array, backend }
    }
}

impl MatrixAccess for Matrix {
    fn rows(&self) -> usize {
        Matrix::rows(self)
    }

    fn cols(&self) -> usize {
        Matrix::cols(self)
    }

    fn get_f64(&self, row: usize, col: usize) -> Result<f64> {
        Matrix::get_f64(self, row, col)
    }

    fn to_vec_f64(&self) -> Result<Vec<f64>> {
        self.array.to_vec_f64()
    }

    fn to_matrix(&self) -> Result<Matrix> {
        Ok(self.clone())
    }
}

impl Debug for Matrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .field("backend", &self.backend.name())
            .field("array", &self.array)
            .finish()
    }
}

impl Deref for Matrix {
    type Target = NdArray;

    fn deref(&self) -> &NdArray {
        &self.array
    }
}

impl DerefMut for Matrix {
    fn deref_mut(&mut self) -> &mut NdArray {
        &mut self.array
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.array == other.array
    }
}

impl<T: Element, const R: usize, const C: usize> From<[[T; C]; R]> for Matrix {
    fn from(rows: [[T; C]; R]) -> Self {
        let array = NdArray::from_fn([R, C], |i| rows[i[0]][i[1]]);

        Self { array, backend: factory::default_factory().backend().clone() }
    }
}

macro_rules! impl_binary_op {
    ($trt:ident, $fn:ident) => {
        impl $trt<&Matrix> for &Matrix {
            type Output = Matrix;

            /// # Panics
            ///
            /// Panics if the operation fails, e.g. for mismatched shapes.
            fn $fn(self, rhs: &Matrix) -> Matrix {
                Matrix::$fn(self, rhs).unwrap_or_else(|e| panic!("{e}"))
            }
        }
    };
}

impl_binary_op!(Add, add);
impl_binary_op!(Sub, sub);

impl Mul<&Matrix> for &Matrix {
    type Output = Matrix;

    /// # Panics
    ///
    /// Panics if the inner dimensions differ or the backend fails to multiply.
    fn mul(self, rhs: &Matrix) -> Matrix {
        self.matmul(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Mul<f64> for &Matrix {
    type Output = Matrix;

    /// # Panics
    ///
    /// Panics for the object kind, or if a result does not fit in the element kind.
    fn mul(self, rhs: f64) -> Matrix {
        self.mul_scalar(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Div<f64> for &Matrix {
    type Output = Matrix;

    /// # Panics
    ///
    /// Panics for the object kind, or if a result does not fit in the element kind.
    fn div(self, rhs: f64) -> Matrix {
        self.div_scalar(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Neg for &Matrix {
    type Output = Matrix;

    /// # Panics
    ///
    /// Panics for the object kind.
    fn neg(self) -> Matrix {
        Matrix::neg(self).unwrap_or_else(|e| panic!("{e}"))
    }
}

// Element kind of a concatenation, promoted to f64 for mixed kinds.
fn stack_kind(matrices: &[&Matrix]) -> ElementKind {
    match matrices.split_first() {
        Some((first, rest)) if rest.iter().all(|m| m.kind() == first.kind()) => first.kind(),
        _ => ElementKind::F64,
    }
}
