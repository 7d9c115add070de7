use std::ops::{Range, RangeFull, RangeInclusive};

use crate::error::{Error, Result};

/// Inclusive index range, where negative endpoints count from the end of the dimension.
///
/// `IndexRange::new(0, END)` covers the whole dimension and `IndexRange::new(1, -2)`
/// drops the first and the last element.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct IndexRange {
    first: isize,
    last: isize,
}

impl IndexRange {
    /// Creates an inclusive index range from the first and the last index.
    pub const fn new(first: isize, last: isize) -> Self {
        Self { first, last }
    }

    /// Returns the first index of the range, before wrapping.
    pub fn first(&self) -> isize {
        self.first
    }

    /// Returns the last index of the range, before wrapping.
    pub fn last(&self) -> isize {
        self.last
    }

    /// Wraps the range against a dimension size, returning the half-open range of
    /// addressed positions.
    ///
    /// The range may be empty only when the last index immediately precedes the first
    /// after wrapping, e.g. `0..=END` on an empty dimension.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is out of bounds or the range is reversed.
    pub fn wrap(&self, size: usize) -> Result<Range<usize>> {
        let first = if self.first < 0 { self.first + size as isize } else { self.first };
        let last = if self.last < 0 { self.last + size as isize } else { self.last };

        if first < 0 || first > size as isize || last < -1 || last >= size as isize {
            return Err(Error::OutOfRange(format!(
                "range {}..={} is out of bounds for dimension of size {size}",
                self.first, self.last
            )));
        }

        if last + 1 < first {
            return Err(Error::OutOfRange(format!(
                "range {}..={} ends before it starts in dimension of size {size}",
                self.first, self.last
            )));
        }

        Ok(first as usize..(last + 1) as usize)
    }
}

impl From<RangeInclusive<isize>> for IndexRange {
    fn from(range: RangeInclusive<isize>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

impl From<RangeFull> for IndexRange {
    fn from(_: RangeFull) -> Self {
        super::ALL
    }
}

impl From<isize> for IndexRange {
    fn from(index: isize) -> Self {
        Self::new(index, index)
    }
}
