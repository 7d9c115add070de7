//! Elementwise arithmetic and reductions for numeric arrays.

use crate::array::NdArray;
use crate::error::{Error, Result};
use crate::kind::{cast_f64, to_f64, with_numeric, with_numeric_pair};
use crate::kind::{Element, Storage, Value};

impl NdArray {
    /// Returns the elementwise sum of two arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes or element kinds differ, or for the object kind.
    pub fn add(&self, other: &NdArray) -> Result<NdArray> {
        self.zip_with(other, "add", |x, y| {
            with_numeric_pair!(x, y, "add", (x, y) => zip_map(x, y, |a, b| a + b))
        })
    }

    /// Returns the elementwise difference of two arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes or element kinds differ, or for the object kind.
    pub fn sub(&self, other: &NdArray) -> Result<NdArray> {
        self.zip_with(other, "sub", |x, y| {
            with_numeric_pair!(x, y, "sub", (x, y) => zip_map(x, y, |a, b| a - b))
        })
    }

    /// Returns the elementwise product of two arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes or element kinds differ, or for the object kind.
    pub fn mul_elem(&self, other: &NdArray) -> Result<NdArray> {
        self.zip_with(other, "mul_elem", |x, y| {
            with_numeric_pair!(x, y, "mul_elem", (x, y) => zip_map(x, y, |a, b| a * b))
        })
    }

    /// Returns the array with each element negated.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind.
    pub fn neg(&self) -> Result<NdArray> {
        let storage = with_numeric!(self.storage(), "neg", v => map_same(v, |a| -a))?;

        Ok(NdArray::from_parts(self.shape().clone(), storage))
    }

    /// Returns the array with each element multiplied by a scalar.
    ///
    /// Integer elements are scaled in `f64` and truncated toward zero.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind, or if a result does not fit in the kind.
    pub fn mul_scalar(&self, scalar: f64) -> Result<NdArray> {
        self.map_numeric("mul_scalar", |x| x * scalar)
    }

    /// Returns the array with each element divided by a scalar.
    ///
    /// Integer elements are divided in `f64` and truncated toward zero.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind, or if a result does not fit in the kind.
    pub fn div_scalar(&self, scalar: f64) -> Result<NdArray> {
        self.map_numeric("div_scalar", |x| x / scalar)
    }

    /// Returns the array with each element raised to the given power.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind, or if a result does not fit in the kind.
    pub fn pow_elem(&self, exponent: f64) -> Result<NdArray> {
        self.map_numeric("pow_elem", |x| x.powf(exponent))
    }

    /// Returns the sum of all elements.
    ///
    /// Floating point kinds are summed with compensated (Kahan) summation and returned
    /// as `f64`. Integer kinds are accumulated in `i128` and returned as `i64`.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind, or if an integer sum overflows `i64`.
    pub fn sum(&self) -> Result<Value> {
        with_numeric!(self.storage(), "sum", v => sum_slice(v)?)
    }

    /// Returns the sum of all elements as `f64`, using compensated summation.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind.
    pub fn sum_f64(&self) -> Result<f64> {
        with_numeric!(self.storage(), "sum_f64", v => kahan_sum(v.iter().map(|&x| to_f64(x))))
    }

    /// Returns the arithmetic mean of all elements.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind or an empty array.
    pub fn mean(&self) -> Result<f64> {
        if self.is_empty() {
            return Err(Error::shape("mean of an empty array"));
        }

        Ok(self.sum_f64()? / self.len() as f64)
    }

    /// Returns the smallest element.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind or an empty array.
    pub fn min(&self) -> Result<Value> {
        let i = self.arg_min()?;

        Ok(self.storage().get(i))
    }

    /// Returns the largest element.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind or an empty array.
    pub fn max(&self) -> Result<Value> {
        let i = self.arg_max()?;

        Ok(self.storage().get(i))
    }

    /// Returns the linear index of the smallest element.
    ///
    /// Ties are broken by the first occurrence in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind or an empty array.
    pub fn arg_min(&self) -> Result<usize> {
        with_numeric!(self.storage(), "arg_min", v => arg_best(v, |x, best| x < best))?
            .ok_or_else(|| Error::shape("arg_min of an empty array"))
    }

    /// Returns the linear index of the largest element.
    ///
    /// Ties are broken by the first occurrence in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind or an empty array.
    pub fn arg_max(&self) -> Result<usize> {
        with_numeric!(self.storage(), "arg_max", v => arg_best(v, |x, best| x > best))?
            .ok_or_else(|| Error::shape("arg_max of an empty array"))
    }

    fn zip_with<F>(&self, other: &NdArray, op: &str, f: F) -> Result<NdArray>
    where
        F: FnOnce(&Storage, &Storage) -> Result<Storage>,
    {
        if self.dims() != other.dims() {
            return Err(Error::mismatch(op, self.dims(), other.dims()));
        }

        let storage = f(self.storage(), other.storage())?;

        Ok(NdArray::from_parts(self.shape().clone(), storage))
    }

    fn map_numeric<F: Fn(f64) -> f64>(&self, op: &'static str, f: F) -> Result<NdArray> {
        let storage = with_numeric!(self.storage(), op, v => map_cast(v, &f)?)?;

        Ok(NdArray::from_parts(self.shape().clone(), storage))
    }
}

/// Returns the sum of the values using compensated (Kahan) summation.
pub fn kahan_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;

    for x in values {
        let y = x - compensation;
        let t = sum + y;

        compensation = (t - sum) - y;
        sum = t;
    }

    sum
}

fn zip_map<T: Element, F: Fn(T, T) -> T>(x: &[T], y: &[T], f: F) -> Storage {
    T::into_storage(x.iter().zip(y).map(|(&a, &b)| f(a, b)).collect())
}

fn map_same<T: Element, F: Fn(T) -> T>(v: &[T], f: F) -> Storage {
    T::into_storage(v.iter().map(|&a| f(a)).collect())
}

fn map_cast<T: Element, F: Fn(f64) -> f64>(v: &[T], f: &F) -> Result<Storage> {
    let vec = v.iter().map(|&x| cast_f64::<T>(f(to_f64(x)))).collect::<Result<Vec<T>>>()?;

    Ok(T::into_storage(vec))
}

fn sum_slice<T: Element>(v: &[T]) -> Result<Value> {
    if T::KIND.is_float() {
        return Ok(Value::F64(kahan_sum(v.iter().map(|&x| to_f64(x)))));
    }

    let sum = v.iter().map(|x| x.to_i128().unwrap_or(0)).sum::<i128>();

    i64::try_from(sum)
        .map(Value::I64)
        .map_err(|_| Error::OutOfRange(format!("sum {sum} does not fit in i64")))
}

fn arg_best<T: Element, F: Fn(&T, &T) -> bool>(v: &[T], better: F) -> Option<usize> {
    let mut best = None;

    for (i, x) in v.iter().enumerate() {
        match best {
            Some(j) if !better(x, &v[j]) => {}
            _ => best = Some(i),
        }
    }

    best
}
