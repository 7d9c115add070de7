use std::fmt::{self, Formatter};

use serde::de::{Error, SeqAccess, Visitor};
use serde::ser::{self, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::array::NdArray;
use crate::factory;
use crate::kind::Value;
use crate::matrix::Matrix;
use crate::shape::Shape;

// Nested sequences of numbers with a rectangular shape.
struct Nested {
    dims: Vec<usize>,
    data: Vec<f64>,
}

struct NestedVisitor;

impl<'a> Visitor<'a> for NestedVisitor {
    type Value = Nested;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "a number or nested sequences of numbers")
    }

    fn visit_f64<E: Error>(self, value: f64) -> Result<Nested, E> {
        Ok(Nested { dims: Vec::new(), data: vec![value] })
    }

    fn visit_i64<E: Error>(self, value: i64) -> Result<Nested, E> {
        self.visit_f64(value as f64)
    }

    fn visit_u64<E: Error>(self, value: u64) -> Result<Nested, E> {
        self.visit_f64(value as f64)
    }

    fn visit_seq<A: SeqAccess<'a>>(self, mut seq: A) -> Result<Nested, A::Error> {
        let mut data = Vec::new();
        let mut inner = None::<Vec<usize>>;
        let mut size = 0;

        while let Some(value) = seq.next_element::<Nested>()? {
            let expect = inner.get_or_insert_with(|| value.dims.clone());

            if value.dims != *expect {
                let msg = format!("invalid dimensions {:?}, expected {:?}", value.dims, expect);

                return Err(A::Error::custom(msg));
            }

            data.extend(value.data);
            size += 1;
        }

        let mut dims = vec![size];

        dims.extend(inner.unwrap_or_default());

        Ok(Nested { dims, data })
    }
}

impl<'a> Deserialize<'a> for Nested {
    fn deserialize<R: Deserializer<'a>>(deserializer: R) -> Result<Self, R::Error> {
        deserializer.deserialize_any(NestedVisitor)
    }
}

impl<'a> Deserialize<'a> for NdArray {
    fn deserialize<R: Deserializer<'a>>(deserializer: R) -> Result<Self, R::Error> {
        let nested = Nested::deserialize(deserializer)?;

        NdArray::from_vec(Shape::from(nested.dims), nested.data).map_err(R::Error::custom)
    }
}

impl<'a> Deserialize<'a> for Matrix {
    fn deserialize<R: Deserializer<'a>>(deserializer: R) -> Result<Self, R::Error> {
        let mut array = NdArray::deserialize(deserializer)?;

        // An empty sequence has no inner dimension.
        if array.dims() == [0] {
            array = NdArray::zeros(array.kind(), [0, 0]);
        }

        factory::default_factory().from_array(array).map_err(R::Error::custom)
    }
}

impl Serialize for Value {
    fn serialize<R: Serializer>(&self, serializer: R) -> Result<R::Ok, R::Error> {
        match self {
            Self::F64(x) => serializer.serialize_f64(*x),
            Self::F32(x) => serializer.serialize_f32(*x),
            Self::I64(x) => serializer.serialize_i64(*x),
            Self::I32(x) => serializer.serialize_i32(*x),
            Self::I16(x) => serializer.serialize_i16(*x),
            Self::I8(x) => serializer.serialize_i8(*x),
            Self::Object(_) => Err(ser::Error::custom("object elements cannot be serialized")),
        }
    }
}

// Serializes the subarray at the given offset as nested sequences.
struct Subarray<'a> {
    array: &'a NdArray,
    dims: &'a [usize],
    offset: usize,
}

impl Serialize for Subarray<'_> {
    fn serialize<R: Serializer>(&self, serializer: R) -> Result<R::Ok, R::Error> {
        let Some((&size, inner)) = self.dims.split_first() else {
            let value = self.array.get_linear(self.offset);

            return value.map_err(<R::Error as ser::Error>::custom)?.serialize(serializer);
        };

        let stride = inner.iter().product::<usize>();
        let mut seq = serializer.serialize_seq(Some(size))?;

        for i in 0..size {
            let offset = self.offset + i * stride;

            seq.serialize_element(&Subarray { array: self.array, dims: inner, offset })?;
        }

        seq.end()
    }
}

impl Serialize for NdArray {
    fn serialize<R: Serializer>(&self, serializer: R) -> Result<R::Ok, R::Error> {
        Subarray { array: self, dims: self.dims(), offset: 0 }.serialize(serializer)
    }
}

impl Serialize for Matrix {
    fn serialize<R: Serializer>(&self, serializer: R) -> Result<R::Ok, R::Error> {
        self.array().serialize(serializer)
    }
}
