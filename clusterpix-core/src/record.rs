//! Record traits and the per-schema record codec.
//!
//! Every record type can be encoded field by field: it exposes its values by
//! label and can be rebuilt from the values of a schema's fields. Types whose
//! byte layout is fixed may additionally implement [`FixedLayout`], which lets
//! a codec move whole records at once. The choice between the two paths is
//! made once, when a [`RecordCodec`] is bound to a field list.

use crate::cursor::{ByteReader, ByteWriter};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::field::{fixed_record_size, has_vlen, Field};
use crate::value::FieldData;

/// A value that can be stored as one record of a cluster file.
pub trait Record: Sized {
    /// Fields this type writes, in wire order.
    fn fields() -> Vec<Field>;

    /// Value of the field named `label`, or `None` if the type has no such
    /// field.
    fn value(&self, label: &str) -> Option<FieldData>;

    /// Rebuilds a record from decoded field values.
    ///
    /// # Errors
    /// Returns an error if a required field is missing or has the wrong dtype.
    fn from_values(values: FieldValues) -> Result<Self>;

    /// Fixed-layout capability; `None` unless the type implements
    /// [`FixedLayout`].
    fn fixed_codec() -> Option<FixedCodec<Self>> {
        None
    }
}

/// A record that heads one frame and declares how many clusters follow.
pub trait FrameHeader: Record {
    /// Number of data records that follow this header.
    fn cluster_count(&self) -> usize;
}

/// Records whose wire layout is exactly [`Record::fields`] with no
/// variable-length arrays.
pub trait FixedLayout: Record {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Appends the record's bytes.
    fn encode_fixed(&self, out: &mut ByteWriter);

    /// Reads one record.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the cursor runs out of bytes.
    fn decode_fixed(input: &mut ByteReader<'_>) -> Result<Self>;
}

/// Function table of a [`FixedLayout`] type.
pub struct FixedCodec<T> {
    size: usize,
    encode: fn(&T, &mut ByteWriter),
    decode: fn(&mut ByteReader<'_>) -> Result<T>,
}

impl<T> Clone for FixedCodec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FixedCodec<T> {}

impl<T> std::fmt::Debug for FixedCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedCodec").field("size", &self.size).finish()
    }
}

impl<T: FixedLayout> FixedCodec<T> {
    /// Function table of `T`.
    #[must_use]
    pub fn of() -> Self {
        Self {
            size: T::SIZE,
            encode: T::encode_fixed,
            decode: T::decode_fixed,
        }
    }
}

impl<T> FixedCodec<T> {
    /// Encoded size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Decoded values of one record, keyed by the schema's fields.
#[derive(Debug, Clone)]
pub struct FieldValues {
    entries: Vec<(Field, Option<FieldData>)>,
}

impl FieldValues {
    /// Pairs fields with their values.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the counts differ.
    pub fn new(fields: &[Field], values: Vec<FieldData>) -> Result<Self> {
        if fields.len() != values.len() {
            return Err(Error::InvalidArgument(format!(
                "{} fields but {} values",
                fields.len(),
                values.len()
            )));
        }
        Ok(Self {
            entries: fields.iter().cloned().zip(values.into_iter().map(Some)).collect(),
        })
    }

    /// Decodes one value per field from the cursor.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the cursor runs out of bytes.
    pub fn decode(fields: &[Field], input: &mut ByteReader<'_>) -> Result<Self> {
        let entries = fields
            .iter()
            .map(|field| Ok((field.clone(), Some(FieldData::decode(field, input)?))))
            .collect::<Result<_>>()?;
        Ok(Self { entries })
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns the value of `label`.
    ///
    /// # Errors
    /// Returns [`Error::MissingField`] if the label is absent or already taken.
    pub fn take(&mut self, label: &str) -> Result<FieldData> {
        self.entries
            .iter_mut()
            .find(|(field, _)| field.label == label)
            .and_then(|(_, value)| value.take())
            .ok_or_else(|| Error::MissingField(label.to_string()))
    }

    /// Removes the value of `label` as a vector of `T`.
    ///
    /// # Errors
    /// Returns [`Error::MissingField`] or [`Error::TypeMismatch`].
    pub fn take_vec<T: Element>(&mut self, label: &str) -> Result<Vec<T>> {
        let data = self.take(label)?;
        let found = data.dtype();
        data.into_vec::<T>().ok_or_else(|| Error::TypeMismatch {
            label: label.to_string(),
            expected: T::DTYPE.to_text(),
            found: found.to_text(),
        })
    }

    /// Removes the value of `label` as a single `T`.
    ///
    /// # Errors
    /// Returns [`Error::MissingField`], [`Error::TypeMismatch`], or
    /// [`Error::InvalidFormat`] if the field does not hold exactly one value.
    pub fn take_scalar<T: Element>(&mut self, label: &str) -> Result<T> {
        match self.take_vec::<T>(label)?.as_slice() {
            [value] => Ok(*value),
            other => Err(Error::InvalidFormat(format!(
                "field '{label}' holds {} values, expected one",
                other.len()
            ))),
        }
    }

    /// Removes the value of `label` as an array of `N` elements.
    ///
    /// # Errors
    /// Returns [`Error::MissingField`], [`Error::TypeMismatch`], or
    /// [`Error::InvalidFormat`] if the length is not `N`.
    pub fn take_array<T: Element, const N: usize>(&mut self, label: &str) -> Result<[T; N]> {
        let values = self.take_vec::<T>(label)?;
        let len = values.len();
        values.try_into().map_err(|_| {
            Error::InvalidFormat(format!("field '{label}' holds {len} values, expected {N}"))
        })
    }

    /// Consumes the container, returning fields and the values not yet taken.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Field>, Vec<Option<FieldData>>) {
        self.entries.into_iter().unzip()
    }
}

/// Encoder/decoder for one record type bound to one field list.
#[derive(Debug, Clone)]
pub enum RecordCodec<T> {
    /// Whole-record path for [`FixedLayout`] types matching the fields.
    Fixed(FixedCodec<T>),
    /// Field-by-field path.
    Fields {
        /// Field list in wire order.
        fields: Vec<Field>,
        /// Fixed record size, 0 with variable-length fields.
        size: usize,
    },
}

impl<T: Record> RecordCodec<T> {
    /// Chooses the encoding path for `fields`.
    ///
    /// The fixed path is taken only when `T` has a fixed layout, the fields
    /// contain no variable-length array, and they equal `T::fields()`.
    #[must_use]
    pub fn bind(fields: &[Field]) -> Self {
        if let Some(codec) = T::fixed_codec() {
            if !has_vlen(fields)
                && codec.size == fixed_record_size(fields)
                && T::fields() == fields
            {
                return RecordCodec::Fixed(codec);
            }
        }
        RecordCodec::Fields {
            fields: fields.to_vec(),
            size: fixed_record_size(fields),
        }
    }

    /// Returns true if whole records are moved at once.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, RecordCodec::Fixed(_))
    }

    /// Encoded size of every record, `None` if records vary in size.
    #[must_use]
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            RecordCodec::Fixed(codec) => Some(codec.size),
            RecordCodec::Fields { size: 0, .. } => None,
            RecordCodec::Fields { size, .. } => Some(*size),
        }
    }

    /// Appends the encoding of `record`.
    ///
    /// # Errors
    /// Returns an error if the record lacks a field or a value has the wrong
    /// shape. Nothing is appended in that case.
    pub fn encode(&self, record: &T, out: &mut ByteWriter) -> Result<()> {
        match self {
            RecordCodec::Fixed(codec) => {
                (codec.encode)(record, out);
                Ok(())
            }
            RecordCodec::Fields { fields, .. } => {
                let mut scratch = ByteWriter::new();
                for field in fields {
                    let value = record
                        .value(&field.label)
                        .ok_or_else(|| Error::MissingField(field.label.clone()))?;
                    value.encode(field, &mut scratch)?;
                }
                out.put_bytes(scratch.as_bytes());
                Ok(())
            }
        }
    }

    /// Decodes one record.
    ///
    /// # Errors
    /// Returns an error if the bytes are truncated or do not fit `T`.
    pub fn decode(&self, input: &mut ByteReader<'_>) -> Result<T> {
        match self {
            RecordCodec::Fixed(codec) => (codec.decode)(input),
            RecordCodec::Fields { fields, .. } => T::from_values(FieldValues::decode(fields, input)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::Dtype;

    #[test]
    fn test_field_values_take() {
        let fields = vec![
            Field::scalar("frame_number", Dtype::Int32),
            Field::fixed_array("data", Dtype::UInt16, 3),
        ];
        let values = vec![
            FieldData::scalar(42i32),
            FieldData::from_vec(vec![1u16, 2, 3]),
        ];
        let mut fv = FieldValues::new(&fields, values).unwrap();
        assert_eq!(fv.take_scalar::<i32>("frame_number").unwrap(), 42);
        assert!(matches!(
            fv.take_scalar::<i32>("frame_number"),
            Err(Error::MissingField(_))
        ));
        assert!(matches!(
            fv.take_array::<u16, 4>("data"),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_field_values_type_mismatch() {
        let fields = vec![Field::scalar("x", Dtype::Int16)];
        let mut fv = FieldValues::new(&fields, vec![FieldData::scalar(1i16)]).unwrap();
        assert!(matches!(
            fv.take_scalar::<u16>("x"),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_field_values_count_mismatch() {
        let fields = vec![Field::scalar("x", Dtype::Int16)];
        assert!(FieldValues::new(&fields, vec![]).is_err());
    }
}
