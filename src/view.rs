use std::borrow::Cow;
use std::ops::Range;

use crate::error::{Error, Result};
use crate::index::IndexRange;
use crate::kind::Value;
use crate::matrix::{Matrix, MatrixAccess};

/// Rectangular window into another matrix.
///
/// The view borrows the target matrix and maps its own positions to the addressed
/// rows and columns of the target, optionally transposed. A view created with
/// [`Matrix::view_mut`] writes through to the target. A view created with
/// [`Matrix::view`] is copy-on-write: the first write makes a private copy of the
/// target, and later reads and writes use the copy.
#[derive(Debug)]
pub struct MatrixView<'a> {
    target: Target<'a>,
    rows: Range<usize>,
    cols: Range<usize>,
    transposed: bool,
}

#[derive(Debug)]
enum Target<'a> {
    Shared(&'a mut Matrix),
    CopyOnWrite(Cow<'a, Matrix>),
}

impl Matrix {
    /// Returns a copy-on-write view of the addressed region.
    ///
    /// Both ranges are inclusive and may use negative indices counting from the end.
    ///
    /// # Errors
    ///
    /// Returns an error if a range is out of bounds.
    pub fn view<R, C>(&self, rows: R, cols: C) -> Result<MatrixView<'_>>
    where
        R: Into<IndexRange>,
        C: Into<IndexRange>,
    {
        let rows = rows.into().wrap(self.rows())?;
        let cols = cols.into().wrap(self.cols())?;

        Ok(MatrixView::new(Target::CopyOnWrite(Cow::Borrowed(self)), rows, cols))
    }

    /// Returns a view of the addressed region that writes through to the matrix.
    ///
    /// Both ranges are inclusive and may use negative indices counting from the end.
    ///
    /// # Errors
    ///
    /// Returns an error if a range is out of bounds.
    pub fn view_mut<R, C>(&mut self, rows: R, cols: C) -> Result<MatrixView<'_>>
    where
        R: Into<IndexRange>,
        C: Into<IndexRange>,
    {
        let rows = rows.into().wrap(self.rows())?;
        let cols = cols.into().wrap(self.cols())?;

        Ok(MatrixView::new(Target::Shared(self), rows, cols))
    }
}

impl<'a> MatrixView<'a> {
    fn new(target: Target<'a>, rows: Range<usize>, cols: Range<usize>) -> Self {
        Self { target, rows, cols, transposed: false }
    }

    /// Returns the view with the rows and columns swapped.
    pub fn transposed(mut self) -> Self {
        self.transposed = !self.transposed;
        self
    }

    /// Returns `true` if the rows and columns of the view are swapped.
    pub fn is_transposed(&self) -> bool {
        self.transposed
    }

    /// Returns `true` if writes go to a private copy instead of the target.
    pub fn is_copy_on_write(&self) -> bool {
        matches!(self.target, Target::CopyOnWrite(_))
    }

    /// Returns `true` if a private copy has been made by an earlier write.
    pub fn is_copied(&self) -> bool {
        matches!(self.target, Target::CopyOnWrite(Cow::Owned(_)))
    }

    /// Returns the element at the given position of the view.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Result<Value> {
        let (i, j) = self.position(row, col)?;

        self.matrix().get(i, j)
    }

    /// Sets the element at the given position of the view.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is out of bounds, or if the value cannot be
    /// represented in the element kind.
    pub fn set<V: Into<Value>>(&mut self, row: usize, col: usize, value: V) -> Result<()> {
        let (i, j) = self.position(row, col)?;

        match &mut self.target {
            Target::Shared(matrix) => matrix.set(i, j, value),
            Target::CopyOnWrite(matrix) => {
                if let Cow::Borrowed(m) = matrix {
                    log::trace!("copying {}x{} matrix on first write", m.rows(), m.cols());
                }

                matrix.to_mut().set(i, j, value)
            }
        }
    }

    fn matrix(&self) -> &Matrix {
        match &self.target {
            Target::Shared(matrix) => &**matrix,
            Target::CopyOnWrite(matrix) => &**matrix,
        }
    }

    // Maps a position in the view to the position in the target.
    fn position(&self, row: usize, col: usize) -> Result<(usize, usize)> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::OutOfRange(format!(
                "index [{row}, {col}] is out of bounds for view of shape [{}, {}]",
                self.rows(),
                self.cols()
            )));
        }

        let (i, j) = if self.transposed { (col, row) } else { (row, col) };

        Ok((self.rows.start + i, self.cols.start + j))
    }
}

impl MatrixAccess for MatrixView<'_> {
    fn rows(&self) -> usize {
        if self.transposed {
            self.cols.len()
        } else {
            self.rows.len()
        }
    }

    fn cols(&self) -> usize {
        if self.transposed {
            self.rows.len()
        } else {
            self.cols.len()
        }
    }

    fn get_f64(&self, row: usize, col: usize) -> Result<f64> {
        let (i, j) = self.position(row, col)?;

        self.matrix().get_f64(i, j)
    }

    fn to_matrix(&self) -> Result<Matrix> {
        let matrix = self.matrix();
        let window = matrix.derive(matrix.slice_exact(&[self.rows.clone(), self.cols.clone()]));

        Ok(if self.transposed { window.transpose() } else { window })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transposed_positions_map_to_target() {
        let m = Matrix::from([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let view = m.view(0..=1, 1..=2).unwrap().transposed();

        assert_eq!(view.shape(), (2, 2));
        assert_eq!(view.get_f64(1, 0), Ok(3.0));
        assert_eq!(view.position(0, 1), Ok((1, 1)));
        assert!(matches!(view.get_f64(2, 0), Err(Error::OutOfRange(_))));
    }
}
