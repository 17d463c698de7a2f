//! Dynamically typed field values.

use crate::cursor::{ByteReader, ByteWriter};
use crate::dtype::{Dtype, Element};
use crate::error::{Error, Result};
use crate::field::{ArrayKind, Field, VLEN_COUNT_BYTES};

/// Values of one field in one record.
///
/// Scalars are stored as one-element vectors.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

/// Runs `$body` with `$v` bound to the inner vector, whatever the variant.
macro_rules! with_values {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            FieldData::Int8($v) => $body,
            FieldData::UInt8($v) => $body,
            FieldData::Int16($v) => $body,
            FieldData::UInt16($v) => $body,
            FieldData::Int32($v) => $body,
            FieldData::UInt32($v) => $body,
            FieldData::Int64($v) => $body,
            FieldData::UInt64($v) => $body,
            FieldData::Float32($v) => $body,
            FieldData::Float64($v) => $body,
        }
    };
}

/// Runs `$body` with `$t` aliased to the element type of `$dtype`.
macro_rules! with_dtype {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            Dtype::Int8 => {
                type $t = i8;
                $body
            }
            Dtype::UInt8 => {
                type $t = u8;
                $body
            }
            Dtype::Int16 => {
                type $t = i16;
                $body
            }
            Dtype::UInt16 => {
                type $t = u16;
                $body
            }
            Dtype::Int32 => {
                type $t = i32;
                $body
            }
            Dtype::UInt32 => {
                type $t = u32;
                $body
            }
            Dtype::Int64 => {
                type $t = i64;
                $body
            }
            Dtype::UInt64 => {
                type $t = u64;
                $body
            }
            Dtype::Float32 => {
                type $t = f32;
                $body
            }
            Dtype::Float64 => {
                type $t = f64;
                $body
            }
        }
    };
}

impl FieldData {
    /// Wraps a single value.
    #[must_use]
    pub fn scalar<T: Element>(value: T) -> Self {
        T::into_data(vec![value])
    }

    /// Wraps a vector of values.
    #[must_use]
    pub fn from_vec<T: Element>(values: Vec<T>) -> Self {
        T::into_data(values)
    }

    /// Copies a slice of values.
    #[must_use]
    pub fn from_slice<T: Element>(values: &[T]) -> Self {
        T::into_data(values.to_vec())
    }

    /// `len` zero values of the given dtype.
    #[must_use]
    pub fn zeros(dtype: Dtype, len: usize) -> Self {
        with_dtype!(dtype, T => T::into_data(vec![T::default(); len]))
    }

    /// Dtype of the stored values.
    #[must_use]
    pub fn dtype(&self) -> Dtype {
        match self {
            FieldData::Int8(_) => Dtype::Int8,
            FieldData::UInt8(_) => Dtype::UInt8,
            FieldData::Int16(_) => Dtype::Int16,
            FieldData::UInt16(_) => Dtype::UInt16,
            FieldData::Int32(_) => Dtype::Int32,
            FieldData::UInt32(_) => Dtype::UInt32,
            FieldData::Int64(_) => Dtype::Int64,
            FieldData::UInt64(_) => Dtype::UInt64,
            FieldData::Float32(_) => Dtype::Float32,
            FieldData::Float64(_) => Dtype::Float64,
        }
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        with_values!(self, v => v.len())
    }

    /// Returns true if no values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the values as `T`, if the dtype matches.
    #[must_use]
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::from_data(self)
    }

    /// Takes the values as `T`, if the dtype matches.
    #[must_use]
    pub fn into_vec<T: Element>(self) -> Option<Vec<T>> {
        T::take_data(self)
    }

    /// First value interpreted as a non-negative integer count.
    ///
    /// Returns `None` for floats, negative values and empty data.
    #[must_use]
    pub fn as_count(&self) -> Option<usize> {
        match self {
            FieldData::Int8(v) => v.first().and_then(|&x| usize::try_from(x).ok()),
            FieldData::UInt8(v) => v.first().map(|&x| usize::from(x)),
            FieldData::Int16(v) => v.first().and_then(|&x| usize::try_from(x).ok()),
            FieldData::UInt16(v) => v.first().map(|&x| usize::from(x)),
            FieldData::Int32(v) => v.first().and_then(|&x| usize::try_from(x).ok()),
            FieldData::UInt32(v) => v.first().and_then(|&x| usize::try_from(x).ok()),
            FieldData::Int64(v) => v.first().and_then(|&x| usize::try_from(x).ok()),
            FieldData::UInt64(v) => v.first().and_then(|&x| usize::try_from(x).ok()),
            FieldData::Float32(_) | FieldData::Float64(_) => None,
        }
    }

    /// Encoded size of these values under `field`, including a vlen prefix.
    #[must_use]
    pub fn wire_size(&self, field: &Field) -> usize {
        let body = self.len() * field.dtype.bytes();
        match field.kind {
            ArrayKind::VarArray => VLEN_COUNT_BYTES + body,
            ArrayKind::Scalar | ArrayKind::FixedArray => body,
        }
    }

    /// Decodes the values of `field` from the cursor.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the cursor runs out of bytes.
    pub fn decode(field: &Field, input: &mut ByteReader<'_>) -> Result<Self> {
        let count = match field.kind {
            ArrayKind::Scalar => 1,
            ArrayKind::FixedArray => field.array_size as usize,
            ArrayKind::VarArray => input.read::<u32>()? as usize,
        };
        with_dtype!(field.dtype, T => Ok(T::into_data(input.read_vec::<T>(count)?)))
    }

    /// Encodes the values as `field`.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] if the dtype differs from the field's,
    /// or [`Error::InvalidArgument`] if the value count does not fit the
    /// field's array kind.
    pub fn encode(&self, field: &Field, out: &mut ByteWriter) -> Result<()> {
        if self.dtype() != field.dtype {
            return Err(Error::TypeMismatch {
                label: field.label.clone(),
                expected: field.dtype.to_text(),
                found: self.dtype().to_text(),
            });
        }
        let len = self.len();
        match field.kind {
            ArrayKind::Scalar if len != 1 => {
                return Err(Error::InvalidArgument(format!(
                    "scalar field '{}' got {len} values",
                    field.label
                )));
            }
            ArrayKind::FixedArray if len != field.array_size as usize => {
                return Err(Error::InvalidArgument(format!(
                    "field '{}' holds {} values, got {len}",
                    field.label, field.array_size
                )));
            }
            ArrayKind::VarArray => {
                let count = u32::try_from(len).map_err(|_| {
                    Error::InvalidArgument(format!(
                        "field '{}' has too many values ({len})",
                        field.label
                    ))
                })?;
                out.put(count);
            }
            _ => {}
        }
        with_values!(self, v => out.put_slice(v));
        Ok(())
    }
}
