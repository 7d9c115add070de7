//! Element kinds, generic element values and the typed element trait.

use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use num_traits::{NumCast, Signed};

use crate::error::{Error, Result};

/// Boxed element of an array with the generic element kind.
pub type Object = Arc<dyn Any + Send + Sync>;

/// Element kind of an array.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ElementKind {
    /// 64-bit floating point.
    #[default]
    F64,
    /// 32-bit floating point.
    F32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit signed integer.
    I32,
    /// 16-bit signed integer.
    I16,
    /// 8-bit signed integer.
    I8,
    /// Boxed value of any type.
    Object,
}

impl ElementKind {
    /// Returns `true` for the floating point kinds.
    pub fn is_float(self) -> bool {
        matches!(self, Self::F64 | Self::F32)
    }

    /// Returns `true` for all kinds except the generic object kind.
    pub fn is_numeric(self) -> bool {
        self != Self::Object
    }
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::I64 => "i64",
            Self::I32 => "i32",
            Self::I16 => "i16",
            Self::I8 => "i8",
            Self::Object => "object",
        };

        f.write_str(name)
    }
}

/// Single array element of any kind.
#[derive(Clone, Debug)]
pub enum Value {
    /// 64-bit floating point.
    F64(f64),
    /// 32-bit floating point.
    F32(f32),
    /// 64-bit signed integer.
    I64(i64),
    /// 32-bit signed integer.
    I32(i32),
    /// 16-bit signed integer.
    I16(i16),
    /// 8-bit signed integer.
    I8(i8),
    /// Boxed value of any type.
    Object(Object),
}

impl Value {
    /// Returns the element kind of the value.
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::F64(_) => ElementKind::F64,
            Self::F32(_) => ElementKind::F32,
            Self::I64(_) => ElementKind::I64,
            Self::I32(_) => ElementKind::I32,
            Self::I16(_) => ElementKind::I16,
            Self::I8(_) => ElementKind::I8,
            Self::Object(_) => ElementKind::Object,
        }
    }

    /// Converts a numeric value to `f64`, or returns `None` for objects.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::F64(x) => Some(*x),
            Self::F32(x) => Some(*x as f64),
            Self::I64(x) => Some(*x as f64),
            Self::I32(x) => Some(*x as f64),
            Self::I16(x) => Some(*x as f64),
            Self::I8(x) => Some(*x as f64),
            Self::Object(_) => None,
        }
    }

    /// Converts the value to the given element type.
    ///
    /// Floating point values are truncated toward zero when converted to integers.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is an object or does not fit in the target type.
    pub fn cast<T: Element>(&self) -> Result<T> {
        let cast = match self {
            Self::F64(x) => <T as NumCast>::from(*x),
            Self::F32(x) => <T as NumCast>::from(*x),
            Self::I64(x) => <T as NumCast>::from(*x),
            Self::I32(x) => <T as NumCast>::from(*x),
            Self::I16(x) => <T as NumCast>::from(*x),
            Self::I8(x) => <T as NumCast>::from(*x),
            Self::Object(_) => {
                return Err(Error::ElementKind { op: "cast", found: ElementKind::Object });
            }
        };

        cast.ok_or_else(|| {
            Error::OutOfRange(format!("value {self} cannot be represented as {}", T::KIND))
        })
    }

    /// Returns a reference to the boxed value if it is an object of type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Object(obj) => obj.downcast_ref(),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::F64(x) => Display::fmt(x, f),
            Self::F32(x) => Display::fmt(x, f),
            Self::I64(x) => Display::fmt(x, f),
            Self::I32(x) => Display::fmt(x, f),
            Self::I16(x) => Display::fmt(x, f),
            Self::I8(x) => Display::fmt(x, f),
            Self::Object(_) => f.write_str("<object>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Object(x), Self::Object(y)) => Arc::ptr_eq(x, y),
            (Self::F64(x), Self::F64(y)) => x == y,
            (Self::F32(x), Self::F32(y)) => x == y,
            (Self::I64(x), Self::I64(y)) => x == y,
            (Self::I32(x), Self::I32(y)) => x == y,
            (Self::I16(x), Self::I16(y)) => x == y,
            (Self::I8(x), Self::I8(y)) => x == y,
            _ => false,
        }
    }
}

/// Trait for the primitive numeric types that can be stored in an array.
pub trait Element:
    Copy + Debug + Default + PartialOrd + NumCast + Signed + Send + Sync + 'static
{
    /// Element kind of the type.
    const KIND: ElementKind;

    /// Wraps the element into a generic value.
    fn into_value(self) -> Value;

    #[doc(hidden)]
    fn into_storage(vec: Vec<Self>) -> Storage;

    #[doc(hidden)]
    fn slice(storage: &Storage) -> Option<&[Self]>;

    #[doc(hidden)]
    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]>;
}

/// Backing store of an array, with one variant per element kind.
#[doc(hidden)]
#[derive(Clone, Debug)]
pub enum Storage {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I64(Vec<i64>),
    I32(Vec<i32>),
    I16(Vec<i16>),
    I8(Vec<i8>),
    Object(Vec<Object>),
}

macro_rules! impl_element {
    ($type:ty, $kind:ident) => {
        impl Element for $type {
            const KIND: ElementKind = ElementKind::$kind;

            fn into_value(self) -> Value {
                Value::$kind(self)
            }

            fn into_storage(vec: Vec<Self>) -> Storage {
                Storage::$kind(vec)
            }

            fn slice(storage: &Storage) -> Option<&[Self]> {
                match storage {
                    Storage::$kind(vec) => Some(vec),
                    _ => None,
                }
            }

            fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]> {
                match storage {
                    Storage::$kind(vec) => Some(vec),
                    _ => None,
                }
            }
        }

        impl From<$type> for Value {
            fn from(value: $type) -> Self {
                Value::$kind(value)
            }
        }
    };
}

impl_element!(f64, F64);
impl_element!(f32, F32);
impl_element!(i64, I64);
impl_element!(i32, I32);
impl_element!(i16, I16);
impl_element!(i8, I8);

/// Evaluates the expression for every storage variant, binding the vector to `$vec`.
macro_rules! for_all {
    ($storage:expr, $vec:ident => $body:expr) => {
        match $storage {
            $crate::kind::Storage::F64($vec) => $body,
            $crate::kind::Storage::F32($vec) => $body,
            $crate::kind::Storage::I64($vec) => $body,
            $crate::kind::Storage::I32($vec) => $body,
            $crate::kind::Storage::I16($vec) => $body,
            $crate::kind::Storage::I8($vec) => $body,
            $crate::kind::Storage::Object($vec) => $body,
        }
    };
}

/// Evaluates the expression for numeric storage variants, or returns an element kind
/// error for the object variant.
macro_rules! with_numeric {
    ($storage:expr, $op:expr, $vec:ident => $body:expr) => {
        match $storage {
            $crate::kind::Storage::F64($vec) => Ok($body),
            $crate::kind::Storage::F32($vec) => Ok($body),
            $crate::kind::Storage::I64($vec) => Ok($body),
            $crate::kind::Storage::I32($vec) => Ok($body),
            $crate::kind::Storage::I16($vec) => Ok($body),
            $crate::kind::Storage::I8($vec) => Ok($body),
            $crate::kind::Storage::Object(_) => {
                Err($crate::error::Error::ElementKind {
                    op: $op,
                    found: $crate::kind::ElementKind::Object,
                })
            }
        }
    };
}

/// Evaluates the expression for pairs of numeric storage with the same variant.
macro_rules! with_numeric_pair {
    ($lhs:expr, $rhs:expr, $op:expr, ($x:ident, $y:ident) => $body:expr) => {
        match ($lhs, $rhs) {
            ($crate::kind::Storage::F64($x), $crate::kind::Storage::F64($y)) => Ok($body),
            ($crate::kind::Storage::F32($x), $crate::kind::Storage::F32($y)) => Ok($body),
            ($crate::kind::Storage::I64($x), $crate::kind::Storage::I64($y)) => Ok($body),
            ($crate::kind::Storage::I32($x), $crate::kind::Storage::I32($y)) => Ok($body),
            ($crate::kind::Storage::I16($x), $crate::kind::Storage::I16($y)) => Ok($body),
            ($crate::kind::Storage::I8($x), $crate::kind::Storage::I8($y)) => Ok($body),
            (x, y) => {
                let found = if x.kind().is_numeric() { y.kind() } else { x.kind() };

                Err($crate::error::Error::ElementKind { op: $op, found })
            }
        }
    };
}

pub(crate) use {with_numeric, with_numeric_pair};

impl Storage {
    pub(crate) fn zeros(kind: ElementKind, len: usize) -> Self {
        match kind {
            ElementKind::F64 => Self::F64(vec![0.0; len]),
            ElementKind::F32 => Self::F32(vec![0.0; len]),
            ElementKind::I64 => Self::I64(vec![0; len]),
            ElementKind::I32 => Self::I32(vec![0; len]),
            ElementKind::I16 => Self::I16(vec![0; len]),
            ElementKind::I8 => Self::I8(vec![0; len]),
            ElementKind::Object => Self::Object(vec![Arc::new(()) as Object; len]),
        }
    }

    pub(crate) fn kind(&self) -> ElementKind {
        match self {
            Self::F64(_) => ElementKind::F64,
            Self::F32(_) => ElementKind::F32,
            Self::I64(_) => ElementKind::I64,
            Self::I32(_) => ElementKind::I32,
            Self::I16(_) => ElementKind::I16,
            Self::I8(_) => ElementKind::I8,
            Self::Object(_) => ElementKind::Object,
        }
    }

    pub(crate) fn len(&self) -> usize {
        for_all!(self, vec => vec.len())
    }

    pub(crate) fn get(&self, i: usize) -> Value {
        match self {
            Self::F64(vec) => Value::F64(vec[i]),
            Self::F32(vec) => Value::F32(vec[i]),
            Self::I64(vec) => Value::I64(vec[i]),
            Self::I32(vec) => Value::I32(vec[i]),
            Self::I16(vec) => Value::I16(vec[i]),
            Self::I8(vec) => Value::I8(vec[i]),
            Self::Object(vec) => Value::Object(vec[i].clone()),
        }
    }

    pub(crate) fn get_as<T: Element>(&self, i: usize) -> Result<T> {
        match T::slice(self) {
            Some(slice) => Ok(slice[i]),
            None => self.get(i).cast(),
        }
    }

    pub(crate) fn set(&mut self, i: usize, value: Value) -> Result<()> {
        match self {
            Self::F64(vec) => vec[i] = value.cast()?,
            Self::F32(vec) => vec[i] = value.cast()?,
            Self::I64(vec) => vec[i] = value.cast()?,
            Self::I32(vec) => vec[i] = value.cast()?,
            Self::I16(vec) => vec[i] = value.cast()?,
            Self::I8(vec) => vec[i] = value.cast()?,
            Self::Object(vec) => vec[i] = into_object(value),
        }

        Ok(())
    }

    pub(crate) fn set_as<T: Element>(&mut self, i: usize, value: T) -> Result<()> {
        match T::slice_mut(self) {
            Some(slice) => {
                slice[i] = value;

                Ok(())
            }
            None => self.set(i, value.into_value()),
        }
    }

    // Copies the elements at the given offsets into new storage of the same kind.
    pub(crate) fn gather(&self, offsets: &[usize]) -> Self {
        match self {
            Self::F64(vec) => Self::F64(offsets.iter().map(|&i| vec[i]).collect()),
            Self::F32(vec) => Self::F32(offsets.iter().map(|&i| vec[i]).collect()),
            Self::I64(vec) => Self::I64(offsets.iter().map(|&i| vec[i]).collect()),
            Self::I32(vec) => Self::I32(offsets.iter().map(|&i| vec[i]).collect()),
            Self::I16(vec) => Self::I16(offsets.iter().map(|&i| vec[i]).collect()),
            Self::I8(vec) => Self::I8(offsets.iter().map(|&i| vec[i]).collect()),
            Self::Object(vec) => Self::Object(offsets.iter().map(|&i| vec[i].clone()).collect()),
        }
    }

    // Copies the source elements in order to the given offsets, converting if needed.
    pub(crate) fn scatter(&mut self, offsets: &[usize], src: &Storage) -> Result<()> {
        debug_assert!(offsets.len() == src.len(), "length mismatch");

        match (self, src) {
            (Self::F64(dst), Self::F64(src)) => scatter_copy(dst, offsets, src),
            (Self::F32(dst), Self::F32(src)) => scatter_copy(dst, offsets, src),
            (Self::I64(dst), Self::I64(src)) => scatter_copy(dst, offsets, src),
            (Self::I32(dst), Self::I32(src)) => scatter_copy(dst, offsets, src),
            (Self::I16(dst), Self::I16(src)) => scatter_copy(dst, offsets, src),
            (Self::I8(dst), Self::I8(src)) => scatter_copy(dst, offsets, src),
            (Self::Object(dst), Self::Object(src)) => scatter_copy(dst, offsets, src),
            (dst, src) => {
                for (i, &offset) in offsets.iter().enumerate() {
                    dst.set(offset, src.get(i))?;
                }
            }
        }

        Ok(())
    }

    pub(crate) fn to_f64(&self, i: usize) -> Option<f64> {
        match self {
            Self::F64(vec) => Some(vec[i]),
            Self::F32(vec) => Some(vec[i] as f64),
            Self::I64(vec) => Some(vec[i] as f64),
            Self::I32(vec) => Some(vec[i] as f64),
            Self::I16(vec) => Some(vec[i] as f64),
            Self::I8(vec) => Some(vec[i] as f64),
            Self::Object(_) => None,
        }
    }
}

impl PartialEq for Storage {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::F64(x), Self::F64(y)) => x == y,
            (Self::F32(x), Self::F32(y)) => x == y,
            (Self::I64(x), Self::I64(y)) => x == y,
            (Self::I32(x), Self::I32(y)) => x == y,
            (Self::I16(x), Self::I16(y)) => x == y,
            (Self::I8(x), Self::I8(y)) => x == y,
            (Self::Object(x), Self::Object(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(a, b)| Arc::ptr_eq(a, b))
            }
            _ => false,
        }
    }
}

pub(crate) fn into_object(value: Value) -> Object {
    match value {
        Value::F64(x) => Arc::new(x),
        Value::F32(x) => Arc::new(x),
        Value::I64(x) => Arc::new(x),
        Value::I32(x) => Arc::new(x),
        Value::I16(x) => Arc::new(x),
        Value::I8(x) => Arc::new(x),
        Value::Object(obj) => obj,
    }
}

pub(crate) fn cast_f64<T: Element>(x: f64) -> Result<T> {
    <T as NumCast>::from(x)
        .ok_or_else(|| Error::OutOfRange(format!("value {x} cannot be represented as {}", T::KIND)))
}

pub(crate) fn to_f64<T: Element>(x: T) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}

fn scatter_copy<T: Clone>(dst: &mut [T], offsets: &[usize], src: &[T]) {
    for (&offset, x) in offsets.iter().zip(src) {
        dst[offset] = x.clone();
    }
}
