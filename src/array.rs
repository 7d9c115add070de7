use std::fmt::{self, Debug, Formatter};
use std::ops::Range;

use crate::error::{Error, Result};
use crate::index::{check_linear_index, IndexRange};
use crate::kind::{Element, ElementKind, Object, Storage, Value};
use crate::shape::{next_index, offset, Shape};

/// Dense multidimensional array with dynamic rank and element kind.
///
/// Elements are stored in row-major order. The shape is fixed after creation, elements
/// are mutated in place with the indexed setters.
#[derive(Clone, PartialEq)]
pub struct NdArray {
    shape: Shape,
    storage: Storage,
}

macro_rules! impl_typed_access {
    ($(($type:ty, $get:ident, $set:ident, $get_linear:ident, $set_linear:ident)),+ $(,)?) => {
        impl NdArray {
            $(
                #[doc = concat!(
                    "Returns the element at the given index converted to `",
                    stringify!($type),
                    "`."
                )]
                ///
                /// # Errors
                ///
                /// Returns an error if the index is out of bounds, or if the element cannot
                /// be represented in the target type.
                pub fn $get(&self, index: &[usize]) -> Result<$type> {
                    self.get_as(index)
                }

                #[doc = concat!(
                    "Sets the element at the given index from a `",
                    stringify!($type),
                    "` value."
                )]
                ///
                /// # Errors
                ///
                /// Returns an error if the index is out of bounds, or if the value cannot be
                /// represented in the element kind of the array.
                pub fn $set(&mut self, index: &[usize], value: $type) -> Result<()> {
                    self.set_as(index, value)
                }

                #[doc = concat!(
                    "Returns the element at the given linear index converted to `",
                    stringify!($type),
                    "`."
                )]
                ///
                /// # Errors
                ///
                /// Returns an error if the index is out of bounds, or if the element cannot
                /// be represented in the target type.
                pub fn $get_linear(&self, linear: usize) -> Result<$type> {
                    check_linear_index(linear, &self.shape)?;

                    self.storage.get_as(linear)
                }

                #[doc = concat!(
                    "Sets the element at the given linear index from a `",
                    stringify!($type),
                    "` value."
                )]
                ///
                /// # Errors
                ///
                /// Returns an error if the index is out of bounds, or if the value cannot be
                /// represented in the element kind of the array.
                pub fn $set_linear(&mut self, linear: usize, value: $type) -> Result<()> {
                    check_linear_index(linear, &self.shape)?;

                    self.storage.set_as(linear, value)
                }
            )+
        }
    };
}

impl_typed_access!(
    (f64, get_f64, set_f64, get_linear_f64, set_linear_f64),
    (f32, get_f32, set_f32, get_linear_f32, set_linear_f32),
    (i64, get_i64, set_i64, get_linear_i64, set_linear_i64),
    (i32, get_i32, set_i32, get_linear_i32, set_linear_i32),
    (i16, get_i16, set_i16, get_linear_i16, set_linear_i16),
    (i8, get_i8, set_i8, get_linear_i8, set_linear_i8),
);

impl NdArray {
    /// Creates an array with all elements set to zero.
    ///
    /// Arrays of the object kind are filled with the unit value `()`.
    pub fn zeros<S: Into<Shape>>(kind: ElementKind, shape: S) -> Self {
        let shape = shape.into();
        let storage = Storage::zeros(kind, shape.len());

        Self { shape, storage }
    }

    /// Creates an array with all elements set to the given value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented in the element kind.
    pub fn full<S: Into<Shape>>(kind: ElementKind, shape: S, value: Value) -> Result<Self> {
        let mut array = Self::zeros(kind, shape);

        array.fill(|_| value.clone())?;

        Ok(array)
    }

    /// Creates an array from a vector of elements in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector length does not match the shape.
    pub fn from_vec<T: Element, S: Into<Shape>>(shape: S, vec: Vec<T>) -> Result<Self> {
        let shape = shape.into();

        if vec.len() != shape.len() {
            return Err(Error::shape(format!(
                "{} elements cannot fill an array of shape {shape}",
                vec.len()
            )));
        }

        Ok(Self { shape, storage: T::into_storage(vec) })
    }

    /// Creates an array of the object kind from boxed values in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector length does not match the shape.
    pub fn from_objects<S: Into<Shape>>(shape: S, vec: Vec<Object>) -> Result<Self> {
        let shape = shape.into();

        if vec.len() != shape.len() {
            return Err(Error::shape(format!(
                "{} elements cannot fill an array of shape {shape}",
                vec.len()
            )));
        }

        Ok(Self { shape, storage: Storage::Object(vec) })
    }

    /// Creates an array with the results from the given function, called for each index
    /// in row-major order.
    pub fn from_fn<T: Element, S: Into<Shape>, F>(shape: S, mut f: F) -> Self
    where
        F: FnMut(&[usize]) -> T,
    {
        let shape = shape.into();
        let mut vec = Vec::with_capacity(shape.len());

        for_each_index(shape.dims(), |index| vec.push(f(index)));

        Self { shape, storage: T::into_storage(vec) }
    }

    /// Returns the array shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the number of elements in each dimension.
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    /// Returns the number of elements in the specified dimension.
    ///
    /// # Panics
    ///
    /// Panics if the dimension is out of bounds.
    pub fn dim(&self, axis: usize) -> usize {
        self.shape.dim(axis)
    }

    /// Returns the array rank, i.e. the number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Returns the number of elements in the array.
    pub fn len(&self) -> usize {
        self.shape.len()
    }

    /// Returns `true` if the array contains no elements.
    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    /// Returns the element kind of the array.
    pub fn kind(&self) -> ElementKind {
        self.storage.kind()
    }

    /// Returns the elements as a slice if the element kind is `T`.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(&self.storage)
    }

    /// Returns the elements as a mutable slice if the element kind is `T`.
    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(&mut self.storage)
    }

    /// Returns the element at the given index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds.
    pub fn get(&self, index: &[usize]) -> Result<Value> {
        let linear = self.shape.index_to_linear(index)?;

        Ok(self.storage.get(linear))
    }

    /// Sets the element at the given index, converting to the element kind of the array.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds, or if the value cannot be
    /// represented in the element kind.
    pub fn set<V: Into<Value>>(&mut self, index: &[usize], value: V) -> Result<()> {
        let linear = self.shape.index_to_linear(index)?;

        self.storage.set(linear, value.into())
    }

    /// Returns the element at the given linear index in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds.
    pub fn get_linear(&self, linear: usize) -> Result<Value> {
        check_linear_index(linear, &self.shape)?;

        Ok(self.storage.get(linear))
    }

    /// Sets the element at the given linear index in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds, or if the value cannot be
    /// represented in the element kind.
    pub fn set_linear<V: Into<Value>>(&mut self, linear: usize, value: V) -> Result<()> {
        check_linear_index(linear, &self.shape)?;

        self.storage.set(linear, value.into())
    }

    /// Returns the element at the given index converted to the type `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds, or if the element cannot be
    /// represented in the target type.
    pub fn get_as<T: Element>(&self, index: &[usize]) -> Result<T> {
        let linear = self.shape.index_to_linear(index)?;

        self.storage.get_as(linear)
    }

    /// Sets the element at the given index from a value of type `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds, or if the value cannot be
    /// represented in the element kind.
    pub fn set_as<T: Element>(&mut self, index: &[usize], value: T) -> Result<()> {
        let linear = self.shape.index_to_linear(index)?;

        self.storage.set_as(linear, value)
    }

    /// Overwrites each element with the result from the given function, called for each
    /// index in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error if a result cannot be represented in the element kind.
    pub fn fill<F: FnMut(&[usize]) -> Value>(&mut self, mut f: F) -> Result<()> {
        let mut result = Ok(());
        let mut linear = 0;

        for_each_index(self.shape.dims(), |index| {
            if result.is_ok() {
                result = self.storage.set(linear, f(index));
                linear += 1;
            }
        });

        result
    }

    /// Returns a new array with the given function applied to each element.
    ///
    /// The results are converted to the element kind of the array.
    ///
    /// # Errors
    ///
    /// Returns an error if a result cannot be represented in the element kind.
    pub fn map<F: FnMut(Value) -> Value>(&self, mut f: F) -> Result<Self> {
        self.map_indexed(|_, value| f(value))
    }

    /// Returns a new array with the given function applied to each index and element.
    ///
    /// # Errors
    ///
    /// Returns an error if a result cannot be represented in the element kind.
    pub fn map_indexed<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&[usize], Value) -> Value,
    {
        let mut array = self.clone();
        let mut result = Ok(());
        let mut linear = 0;

        for_each_index(self.shape.dims(), |index| {
            if result.is_ok() {
                result = array.storage.set(linear, f(index, self.storage.get(linear)));
                linear += 1;
            }
        });

        result.map(|()| array)
    }

    /// Returns a new array with the given function applied to each element as `f64`.
    ///
    /// Arrays of kind `f64` are mapped directly, other numeric kinds are converted to
    /// `f64` and back.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind, or if a result cannot be represented in
    /// the element kind.
    pub fn map_f64<F: FnMut(f64) -> f64>(&self, mut f: F) -> Result<Self> {
        if let Storage::F64(vec) = &self.storage {
            let storage = Storage::F64(vec.iter().map(|&x| f(x)).collect());

            return Ok(Self { shape: self.shape.clone(), storage });
        }

        if !self.kind().is_numeric() {
            return Err(Error::ElementKind { op: "map_f64", found: self.kind() });
        }

        self.map(|value| Value::F64(f(value.to_f64().unwrap_or(f64::NAN))))
    }

    /// Calls the given function for each element in row-major order.
    pub fn for_each<F: FnMut(Value)>(&self, mut f: F) {
        for i in 0..self.len() {
            f(self.storage.get(i));
        }
    }

    /// Calls the given function for each index and element in row-major order.
    pub fn for_each_indexed<F: FnMut(&[usize], Value)>(&self, mut f: F) {
        let mut linear = 0;

        for_each_index(self.shape.dims(), |index| {
            f(index, self.storage.get(linear));
            linear += 1;
        });
    }

    /// Returns all elements converted to `f64` in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error for the object kind.
    pub fn to_vec_f64(&self) -> Result<Vec<f64>> {
        if let Storage::F64(vec) = &self.storage {
            return Ok(vec.clone());
        }

        (0..self.len())
            .map(|i| {
                self.storage
                    .to_f64(i)
                    .ok_or(Error::ElementKind { op: "to_vec_f64", found: self.kind() })
            })
            .collect()
    }

    /// Returns a copy of the array with the elements converted to another kind.
    ///
    /// # Errors
    ///
    /// Returns an error if an element cannot be represented in the new kind.
    pub fn to_kind(&self, kind: ElementKind) -> Result<Self> {
        if kind == self.kind() {
            return Ok(self.clone());
        }

        let mut array = Self::zeros(kind, self.shape.clone());

        for i in 0..self.len() {
            array.storage.set(i, self.storage.get(i))?;
        }

        Ok(array)
    }

    /// Returns a copy of the array with a new shape and the same elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of elements differs.
    pub fn reshape<S: Into<Shape>>(&self, shape: S) -> Result<Self> {
        let shape = shape.into();

        if shape.len() != self.len() {
            return Err(Error::shape(format!(
                "cannot reshape array of shape {} into shape {shape}",
                self.shape
            )));
        }

        Ok(Self { shape, storage: self.storage.clone() })
    }

    /// Returns a new array containing a copy of the region addressed by the ranges,
    /// one inclusive range per dimension.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of ranges differs from the rank, or if a range
    /// is out of bounds.
    pub fn slice(&self, ranges: &[IndexRange]) -> Result<Self> {
        let (dims, offsets) = self.region(ranges)?;

        Ok(Self { shape: Shape::from(dims), storage: self.storage.gather(&offsets) })
    }

    /// Copies the elements of another array into the region addressed by the ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if the region shape does not exactly match the shape of the
    /// value, or if a range is out of bounds.
    pub fn assign_slice(&mut self, ranges: &[IndexRange], value: &NdArray) -> Result<()> {
        let (dims, offsets) = self.region(ranges)?;

        if dims[..] != value.dims()[..] {
            return Err(Error::mismatch("slice assignment", &dims, value.dims()));
        }

        self.storage.scatter(&offsets, &value.storage)
    }

    /// Sets every element in the region addressed by the ranges to the given value.
    ///
    /// # Errors
    ///
    /// Returns an error if a range is out of bounds, or if the value cannot be
    /// represented in the element kind.
    pub fn fill_slice<V: Into<Value>>(&mut self, ranges: &[IndexRange], value: V) -> Result<()> {
        let (_, offsets) = self.region(ranges)?;
        let value = value.into();

        for offset in offsets {
            self.storage.set(offset, value.clone())?;
        }

        Ok(())
    }

    /// Returns `true` if the shapes match and every element pair `(a, b)` satisfies
    /// `|a - b| <= atol + rtol * |a|`.
    ///
    /// The tolerance scales with the elements of `self` only, so the comparison is not
    /// symmetric in general. Arrays of the object kind never compare close.
    pub fn all_close(&self, other: &NdArray, rtol: f64, atol: f64) -> bool {
        if self.dims() != other.dims() {
            return false;
        }

        (0..self.len()).all(|i| match (self.storage.to_f64(i), other.storage.to_f64(i)) {
            (Some(a), Some(b)) => (a - b).abs() <= atol + rtol * a.abs(),
            _ => false,
        })
    }

    // Copies the region given by half-open ranges that are already within bounds.
    pub(crate) fn slice_exact(&self, ranges: &[Range<usize>]) -> Self {
        let (dims, offsets) = self.region_of(ranges);

        Self { shape: Shape::from(dims), storage: self.storage.gather(&offsets) }
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    pub(crate) fn from_parts(shape: Shape, storage: Storage) -> Self {
        debug_assert!(shape.len() == storage.len(), "length mismatch");

        Self { shape, storage }
    }

    // Returns the dimensions of the addressed region and the linear offsets of its
    // elements in row-major order.
    fn region(&self, ranges: &[IndexRange]) -> Result<(Vec<usize>, Vec<usize>)> {
        if ranges.len() != self.rank() {
            return Err(Error::shape(format!(
                "{} ranges given for array of shape {}",
                ranges.len(),
                self.shape
            )));
        }

        let ranges = ranges
            .iter()
            .zip(self.dims())
            .map(|(range, &size)| range.wrap(size))
            .collect::<Result<Vec<_>>>()?;

        Ok(self.region_of(&ranges))
    }

    fn region_of(&self, ranges: &[Range<usize>]) -> (Vec<usize>, Vec<usize>) {
        let dims = ranges.iter().map(|r| r.end - r.start).collect::<Vec<_>>();
        let mut offsets = Vec::with_capacity(dims.iter().product());
        let mut src = vec![0; dims.len()];

        for_each_index(&dims, |index| {
            for (i, range) in ranges.iter().enumerate() {
                src[i] = range.start + index[i];
            }

            offsets.push(offset(&src, self.dims()));
        });

        (dims, offsets)
    }
}

impl Debug for NdArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("NdArray")
            .field("kind", &self.kind())
            .field("shape", &self.shape)
            .field("data", &self.storage)
            .finish()
    }
}

// Calls the function for each index in row-major order, or not at all for empty shapes.
pub(crate) fn for_each_index<F: FnMut(&[usize])>(dims: &[usize], mut f: F) {
    if dims.iter().any(|&size| size == 0) {
        return;
    }

    let mut index = vec![0; dims.len()];

    loop {
        f(&index);

        if !next_index(&mut index, dims) {
            break;
        }
    }
}
