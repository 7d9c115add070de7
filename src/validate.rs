//! Dimension validation across a set of matrices.
//!
//! Each matrix is registered with a declared shape, where each axis is either a
//! fixed size or a single-character variable. Variables shared between matrices must
//! resolve to the same size. All mismatches of a validation pass are collected and
//! reported in a single error.
//!
//! ```
//! use mdmatrix::{mat, validate};
//!
//! let a = mat![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
//! let x = mat![[1.0], [2.0], [3.0]];
//!
//! validate(|v| {
//!     v.require("a", &a, 'M', 'N');
//!     v.require("x", &x, 'N', 1);
//! })
//! .unwrap();
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::matrix::MatrixAccess;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Enables or disables dimension validation for the whole process.
///
/// Validators created with [`Validator::new`] while validation is disabled do no
/// bookkeeping and always succeed.
pub fn set_validation_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

/// Returns `true` if dimension validation is enabled for the process.
pub fn validation_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Runs a validation pass with the matrices registered by the given function.
///
/// # Errors
///
/// Returns a validation error listing every mismatch, if any.
pub fn validate<'a, F: FnOnce(&mut Validator<'a>)>(f: F) -> Result<()> {
    let mut validator = Validator::new();

    f(&mut validator);
    validator.finish()
}

/// Declared size of a matrix axis.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Dim {
    /// Fixed size.
    Size(usize),
    /// Size variable shared between matrices.
    Var(char),
}

impl Display for Dim {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(size) => write!(f, "{size}"),
            Self::Var(var) => write!(f, "{var}"),
        }
    }
}

impl From<usize> for Dim {
    fn from(size: usize) -> Self {
        Self::Size(size)
    }
}

impl From<char> for Dim {
    fn from(var: char) -> Self {
        Self::Var(var)
    }
}

struct Entry<'a> {
    name: String,
    matrix: &'a dyn MatrixAccess,
    rows: Dim,
    cols: Dim,
    transposable: bool,
    symmetric: bool,
}

impl Entry<'_> {
    fn vars(&self) -> impl Iterator<Item = char> {
        let rows = match self.rows {
            Dim::Var(var) => Some(var),
            Dim::Size(_) => None,
        };

        let cols = match self.cols {
            Dim::Var(var) if Some(var) != rows => Some(var),
            _ => None,
        };

        rows.into_iter().chain(cols)
    }

    // Returns the actual shape and, if transposable, its transpose.
    fn shapes(&self) -> Vec<(usize, usize)> {
        let (r, c) = self.matrix.shape();

        if self.transposable && r != c {
            vec![(r, c), (c, r)]
        } else {
            vec![(r, c)]
        }
    }

    // Returns the orientations allowed by the fixed sizes, as (rows, cols) pairs.
    fn orientations(&self) -> Vec<(usize, usize)> {
        let mut orientations = self.shapes();

        orientations.retain(|&(r, c)| {
            fits(self.rows, r) && fits(self.cols, c) && (self.rows != self.cols || r == c)
        });

        orientations
    }

    fn required(&self) -> String {
        match (self.rows, self.cols) {
            (Dim::Size(1), other) | (other, Dim::Size(1)) => format!("a {other}-vector"),
            (rows, cols) => format!("{rows} by {cols}"),
        }
    }

    fn is_symmetric(&self) -> bool {
        let m = self.matrix;

        m.is_square()
            && (0..m.rows()).all(|i| {
                (0..i).all(|j| match (m.get_f64(i, j), m.get_f64(j, i)) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                })
            })
    }
}

/// Validation pass over a set of matrices with declared shapes.
pub struct Validator<'a> {
    enabled: bool,
    entries: Vec<Entry<'a>>,
}

/// Handle to a registered matrix, used to relax or tighten its requirement.
pub struct Requirement<'v, 'a> {
    entry: Option<&'v mut Entry<'a>>,
}

impl<'a> Validator<'a> {
    /// Creates a validator, enabled if validation is enabled for the process.
    pub fn new() -> Self {
        Self::with_enabled(validation_enabled())
    }

    /// Creates a validator that is enabled or disabled regardless of the process flag.
    pub fn with_enabled(enabled: bool) -> Self {
        Self { enabled, entries: Vec::new() }
    }

    /// Returns `true` if the validator checks the registered matrices.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Registers a matrix under a name with the declared number of rows and columns.
    ///
    /// Each axis is declared either as a fixed size or as a variable character.
    pub fn require<M, R, C>(
        &mut self,
        name: &str,
        matrix: &'a M,
        rows: R,
        cols: C,
    ) -> Requirement<'_, 'a>
    where
        M: MatrixAccess,
        R: Into<Dim>,
        C: Into<Dim>,
    {
        if !self.enabled {
            return Requirement { entry: None };
        }

        self.entries.push(Entry {
            name: name.to_string(),
            matrix,
            rows: rows.into(),
            cols: cols.into(),
            transposable: false,
            symmetric: false,
        });

        Requirement { entry: self.entries.last_mut() }
    }

    /// Checks all registered matrices.
    ///
    /// # Errors
    ///
    /// Returns a single validation error listing every matrix that does not fit its
    /// declared shape, together with the matrices sharing its variables.
    pub fn finish(self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let feasible = self.resolve();
        let mut lines = Vec::new();

        for (k, entry) in self.entries.iter().enumerate() {
            if feasible[k].is_empty() {
                let (r, c) = entry.matrix.shape();
                let required = entry.required();
                let mut line = format!("{} is {r} by {c} but must be {required}", entry.name);

                if entry.transposable {
                    line.push_str(" or its transpose");
                }

                for var in entry.vars() {
                    let shared = self.sharing(var, k);

                    if !shared.is_empty() {
                        line.push_str(&format!("; {var} is shared with {}", shared.join(", ")));
                    }
                }

                lines.push(line);
            }

            if entry.symmetric && !entry.is_symmetric() {
                lines.push(format!("{} must be symmetric", entry.name));
            }
        }

        log::debug!("validated {} matrices with {} mismatches", self.entries.len(), lines.len());

        if lines.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!("invalid matrix dimensions:\n  {}", lines.join("\n  "))))
        }
    }

    // Narrows the variable sets and the orientations of each matrix until nothing
    // changes, and returns the remaining orientations.
    fn resolve(&self) -> Vec<Vec<(usize, usize)>> {
        let mut feasible = self.entries.iter().map(Entry::orientations).collect::<Vec<_>>();

        loop {
            let mut values = BTreeMap::<char, BTreeSet<usize>>::new();

            for (entry, orientations) in self.entries.iter().zip(&feasible) {
                // A matrix failing its fixed sizes still constrains its variables.
                let shapes =
                    if orientations.is_empty() { entry.shapes() } else { orientations.clone() };

                for (dim, axis) in [(entry.rows, 0), (entry.cols, 1)] {
                    if let Dim::Var(var) = dim {
                        let sizes = shapes.iter().map(|&o| pick(o, axis));
                        let sizes = sizes.collect::<BTreeSet<_>>();

                        values
                            .entry(var)
                            .and_modify(|set| *set = set.intersection(&sizes).copied().collect())
                            .or_insert(sizes);
                    }
                }
            }

            let mut changed = false;

            for (entry, orientations) in self.entries.iter().zip(&mut feasible) {
                let len = orientations.len();

                let allowed = |dim: Dim, size: usize| match dim {
                    Dim::Var(var) => values.get(&var).map_or(false, |set| set.contains(&size)),
                    Dim::Size(_) => true,
                };

                orientations.retain(|&(r, c)| allowed(entry.rows, r) && allowed(entry.cols, c));

                changed |= orientations.len() != len;
            }

            log::trace!("variable sets: {values:?}");

            if !changed {
                return feasible;
            }
        }
    }

    // Returns the names of the other matrices that use the variable.
    fn sharing(&self, var: char, skip: usize) -> Vec<&str> {
        let mut names = Vec::new();

        for (k, entry) in self.entries.iter().enumerate() {
            let name = entry.name.as_str();

            if k != skip && entry.vars().any(|v| v == var) && !names.contains(&name) {
                names.push(name);
            }
        }

        names
    }
}

impl Default for Validator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Requirement<'_, '_> {
    /// Accepts the matrix in either orientation.
    pub fn transposable(mut self) -> Self {
        if let Some(entry) = &mut self.entry {
            entry.transposable = true;
        }

        self
    }

    /// Requires the matrix to be square and equal to its transpose.
    pub fn symmetric(mut self) -> Self {
        if let Some(entry) = &mut self.entry {
            entry.symmetric = true;
        }

        self
    }
}

fn fits(dim: Dim, size: usize) -> bool {
    match dim {
        Dim::Size(expected) => expected == size,
        Dim::Var(_) => true,
    }
}

fn pick((rows, cols): (usize, usize), axis: usize) -> usize {
    match axis {
        0 => rows,
        _ => cols,
    }
}
