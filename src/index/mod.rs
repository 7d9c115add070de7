//! Module for index wrapping, bounds checking and index ranges.

mod range;

pub use range::IndexRange;

use crate::error::{Error, Result};
use crate::shape::Shape;

/// Index of the last element in a dimension.
///
/// Negative indices count from the end, so `END` addresses the last element
/// without knowing the size of the dimension.
pub const END: isize = -1;

/// Index range covering a whole dimension, i.e. `0..=END`.
pub const ALL: IndexRange = IndexRange::new(0, END);

/// Wraps a possibly negative index into the range `[0, size)`.
///
/// A negative index is reinterpreted as `size + index`.
///
/// # Errors
///
/// Returns an error if the wrapped index is still outside `[0, size)`.
pub fn wrap_index(index: isize, size: usize) -> Result<usize> {
    let wrapped = if index < 0 { index + size as isize } else { index };

    if wrapped < 0 || wrapped as usize >= size {
        return Err(Error::OutOfRange(format!(
            "index {index} is out of bounds for dimension of size {size}"
        )));
    }

    Ok(wrapped as usize)
}

/// Checks that a multidimensional index is within the bounds of the array shape.
///
/// # Errors
///
/// Returns a shape error if the rank does not match, or an out of range error naming
/// the index and the shape if any component is out of bounds.
pub fn check_indices(index: &[usize], shape: &Shape) -> Result<()> {
    if index.len() != shape.rank() {
        return Err(Error::shape(format!(
            "index {index:?} has rank {} but the array has shape {shape}",
            index.len()
        )));
    }

    if index.iter().zip(shape.dims()).any(|(&i, &size)| i >= size) {
        return Err(Error::OutOfRange(format!(
            "index {index:?} is out of bounds for array of shape {shape}"
        )));
    }

    Ok(())
}

/// Checks that a linear index is within the bounds of the array shape.
///
/// # Errors
///
/// Returns an out of range error naming the index, the number of elements and the shape.
pub fn check_linear_index(linear: usize, shape: &Shape) -> Result<()> {
    let len = shape.len();

    if linear >= len {
        let noun = if len == 1 { "element" } else { "elements" };

        return Err(Error::OutOfRange(format!(
            "linear index {linear} is out of bounds for array of {len} {noun} with shape {shape}"
        )));
    }

    Ok(())
}
