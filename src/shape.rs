use std::fmt::{self, Debug, Display, Formatter};

use crate::error::Result;
use crate::index::{check_indices, check_linear_index};

/// Array shape, i.e. the number of elements in each dimension.
///
/// Elements are laid out in row-major order, where the last dimension varies fastest.
#[derive(Clone, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape {
    dims: Box<[usize]>,
}

impl Shape {
    /// Creates an array shape with the given dimensions.
    pub fn new(dims: &[usize]) -> Self {
        Self { dims: dims.into() }
    }

    /// Returns the number of elements in the specified dimension.
    ///
    /// # Panics
    ///
    /// Panics if the dimension is out of bounds.
    pub fn dim(&self, axis: usize) -> usize {
        assert!(axis < self.rank(), "invalid dimension");

        self.dims[axis]
    }

    /// Returns the number of elements in each dimension.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns `true` if the array contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of elements in the array.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the array rank, i.e. the number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the distance between consecutive elements in each dimension.
    pub fn strides(&self) -> Vec<usize> {
        strides(&self.dims)
    }

    /// Converts a multidimensional index to the linear offset in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error if the rank does not match or an index is out of bounds.
    pub fn index_to_linear(&self, index: &[usize]) -> Result<usize> {
        index_to_linear(index, self)
    }

    /// Converts a linear offset in row-major order to the multidimensional index.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is out of bounds.
    pub fn linear_to_index(&self, linear: usize) -> Result<Vec<usize>> {
        linear_to_index(linear, self)
    }
}

impl Debug for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.dims, f)
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.dims, f)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(&dims)
    }
}

impl<const N: usize> From<&[usize; N]> for Shape {
    fn from(dims: &[usize; N]) -> Self {
        Self::new(dims)
    }
}

impl From<&Shape> for Shape {
    fn from(shape: &Shape) -> Self {
        shape.clone()
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self { dims: dims.into_boxed_slice() }
    }
}

/// Returns the row-major strides for the given dimensions.
///
/// The stride of the last dimension is 1, and the stride of each other dimension is the
/// product of the sizes of all dimensions after it.
pub fn strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];

    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }

    strides
}

/// Converts a multidimensional index to the linear offset in row-major order.
///
/// For a matrix this reduces to `row * cols + col`.
///
/// # Errors
///
/// Returns an error if the rank does not match or an index is out of bounds.
pub fn index_to_linear(index: &[usize], shape: &Shape) -> Result<usize> {
    check_indices(index, shape)?;

    Ok(offset(index, shape.dims()))
}

/// Converts a linear offset in row-major order to the multidimensional index.
///
/// # Errors
///
/// Returns an error if the offset is out of bounds.
pub fn linear_to_index(linear: usize, shape: &Shape) -> Result<Vec<usize>> {
    check_linear_index(linear, shape)?;

    let mut index = vec![0; shape.rank()];
    let mut rem = linear;

    for (i, stride) in shape.strides().into_iter().enumerate() {
        index[i] = rem / stride;
        rem %= stride;
    }

    Ok(index)
}

pub(crate) fn offset(index: &[usize], dims: &[usize]) -> usize {
    debug_assert!(index.len() == dims.len(), "invalid rank");

    index.iter().zip(dims).fold(0, |acc, (&i, &size)| acc * size + i)
}

// Advances the index to the next position in row-major order, returning false after the last.
pub(crate) fn next_index(index: &mut [usize], dims: &[usize]) -> bool {
    for axis in (0..index.len()).rev() {
        index[axis] += 1;

        if index[axis] < dims[axis] {
            return true;
        }

        index[axis] = 0;
    }

    false
}
