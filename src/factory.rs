//! Matrix factory and the process-wide default factory.

use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};

use crate::array::NdArray;
use crate::backend::{Backend, NaiveBackend};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::kind::ElementKind;
use crate::matrix::Matrix;
use crate::random::{self, SeededRng};
use crate::validate::{self, Validator};

static DEFAULT_FACTORY: RwLock<Option<Factory>> = const_rwlock(None);

/// Factory creating matrices with a given backend and configuration.
///
/// Matrices created by the factory share its backend, which computes the heavy
/// operations like multiplication and solving.
#[derive(Clone, Debug)]
pub struct Factory {
    backend: Arc<dyn Backend>,
    config: Config,
}

impl Factory {
    /// Creates a factory with the given configuration and backend.
    pub fn new(config: Config, backend: Arc<dyn Backend>) -> Self {
        Self { backend, config }
    }

    /// Returns the backend of the factory.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Returns the configuration of the factory.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a new random generator seeded from the configuration.
    pub fn rng(&self) -> SeededRng {
        SeededRng::new(self.config.seed, self.config.stream)
    }

    /// Returns a dimension validator, enabled if the configuration enables validation.
    pub fn validator<'a>(&self) -> Validator<'a> {
        Validator::with_enabled(self.config.validate)
    }

    /// Creates a matrix from an array of rank 2.
    ///
    /// # Errors
    ///
    /// Returns an error if the array rank is not 2.
    pub fn from_array(&self, array: NdArray) -> Result<Matrix> {
        Matrix::new(array, Arc::clone(&self.backend))
    }

    /// Creates a matrix of kind `f64` with all elements set to zero.
    pub fn zeros(&self, rows: usize, cols: usize) -> Matrix {
        self.zeros_kind(ElementKind::F64, rows, cols)
    }

    /// Creates a matrix of the given kind with all elements set to zero.
    pub fn zeros_kind(&self, kind: ElementKind, rows: usize, cols: usize) -> Matrix {
        self.wrap(NdArray::zeros(kind, [rows, cols]))
    }

    /// Creates a matrix of kind `f64` with all elements set to one.
    pub fn ones(&self, rows: usize, cols: usize) -> Matrix {
        self.wrap(NdArray::from_fn([rows, cols], |_| 1.0))
    }

    /// Creates an identity matrix of kind `f64`.
    pub fn eye(&self, n: usize) -> Matrix {
        self.wrap(NdArray::from_fn([n, n], |i| f64::from(i[0] == i[1])))
    }

    /// Creates a matrix of kind `f64` with all elements set to the given value.
    pub fn fill(&self, rows: usize, cols: usize, value: f64) -> Matrix {
        self.wrap(NdArray::from_fn([rows, cols], |_| value))
    }

    /// Creates a matrix of kind `f64` from elements in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of elements does not match the shape.
    pub fn create(&self, rows: usize, cols: usize, data: Vec<f64>) -> Result<Matrix> {
        Ok(self.wrap(NdArray::from_vec([rows, cols], data)?))
    }

    /// Creates a matrix of kind `f64` from a sequence of rows.
    ///
    /// No rows give an empty `0 x 0` matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows have different lengths.
    pub fn from_rows<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<Matrix> {
        let cols = rows.first().map_or(0, |row| row.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);

        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();

            if row.len() != cols {
                return Err(Error::shape(format!(
                    "row {i} has {} elements, expected {cols}",
                    row.len()
                )));
            }

            data.extend_from_slice(row);
        }

        self.create(rows.len(), cols, data)
    }

    /// Creates a matrix of kind `f64` with uniform deviates in `[0, 1)`, drawn from the
    /// process-wide default generator.
    pub fn rand(&self, rows: usize, cols: usize) -> Matrix {
        random::with_default_rng(|rng| self.rand_with(rng, rows, cols))
    }

    /// Creates a matrix of kind `f64` with uniform deviates in `[0, 1)`, drawn from the
    /// given generator.
    pub fn rand_with(&self, rng: &mut SeededRng, rows: usize, cols: usize) -> Matrix {
        self.wrap(NdArray::from_fn([rows, cols], |_| rng.next_f64()))
    }

    /// Creates a matrix of kind `f64` with standard normal deviates, drawn from the
    /// process-wide default generator.
    pub fn randn(&self, rows: usize, cols: usize) -> Matrix {
        random::with_default_rng(|rng| self.randn_with(rng, rows, cols))
    }

    /// Creates a matrix of kind `f64` with standard normal deviates, drawn from the
    /// given generator.
    pub fn randn_with(&self, rng: &mut SeededRng, rows: usize, cols: usize) -> Matrix {
        self.wrap(NdArray::from_fn([rows, cols], |_| rng.next_gaussian()))
    }

    /// Creates a `1 x n` matrix of kind `f64` with values from `start` up to but not
    /// including `stop`, in increments of `step`.
    ///
    /// # Errors
    ///
    /// Returns an error if the step is zero or not finite.
    pub fn arange(&self, start: f64, stop: f64, step: f64) -> Result<Matrix> {
        if step == 0.0 || !step.is_finite() {
            return Err(Error::OutOfRange(format!("arange step {step} must be finite and nonzero")));
        }

        let n = ((stop - start) / step).ceil().max(0.0) as usize;

        Ok(self.wrap(NdArray::from_fn([1, n], |i| start + i[1] as f64 * step)))
    }

    fn wrap(&self, array: NdArray) -> Matrix {
        Matrix::from_parts(array, Arc::clone(&self.backend))
    }
}

impl Default for Factory {
    fn default() -> Self {
        Self::new(Config::default(), Arc::new(NaiveBackend))
    }
}

/// Returns the process-wide default factory.
///
/// Until a factory is installed with [`set_default_factory`], this is a factory with
/// the default configuration and the [`NaiveBackend`].
pub fn default_factory() -> Factory {
    DEFAULT_FACTORY.read().clone().unwrap_or_default()
}

/// Installs the process-wide default factory used by the top-level functions.
///
/// The default generator is replaced by one seeded from the configuration, and the
/// process-wide validation flag is set from it.
pub fn set_default_factory(factory: Factory) {
    log::debug!(
        "installing default factory with {} backend and {:?}",
        factory.backend.name(),
        factory.config
    );

    random::set_default_rng(factory.rng());
    validate::set_validation_enabled(factory.config.validate);

    *DEFAULT_FACTORY.write() = Some(factory);
}

/// Restores the process-wide default factory, generator and validation flag to their
/// startup state.
pub fn reset_default_factory() {
    *DEFAULT_FACTORY.write() = None;

    random::reset_default_rng();
    validate::set_validation_enabled(true);
}
