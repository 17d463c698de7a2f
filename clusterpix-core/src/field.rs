//! Schema column descriptors.

use crate::dtype::Dtype;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Width of the element count that precedes every variable-length array.
pub const VLEN_COUNT_BYTES: usize = 4;

/// Array shape of a field. Encoded as `is_array` 0, 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArrayKind {
    /// One value.
    #[default]
    Scalar,
    /// `array_size` values.
    FixedArray,
    /// Count-prefixed run of values, length varies per record.
    VarArray,
}

impl ArrayKind {
    /// Numeric code used in the schema JSON.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            ArrayKind::Scalar => 0,
            ArrayKind::FixedArray => 1,
            ArrayKind::VarArray => 2,
        }
    }

    /// Parses the numeric code used in the schema JSON.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for codes other than 0, 1 and 2.
    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            0 => Ok(ArrayKind::Scalar),
            1 => Ok(ArrayKind::FixedArray),
            2 => Ok(ArrayKind::VarArray),
            other => Err(Error::InvalidFormat(format!("invalid is_array code {other}"))),
        }
    }
}

/// One named, typed column of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FieldRepr", into = "FieldRepr")]
pub struct Field {
    /// Column name.
    pub label: String,
    /// Element type.
    pub dtype: Dtype,
    /// Array shape.
    pub kind: ArrayKind,
    /// Element count, only meaningful for [`ArrayKind::FixedArray`].
    pub array_size: u32,
}

impl Field {
    /// Creates a field.
    pub fn new(label: impl Into<String>, dtype: Dtype, kind: ArrayKind, array_size: u32) -> Self {
        Self {
            label: label.into(),
            dtype,
            kind,
            array_size,
        }
    }

    /// Single value field.
    pub fn scalar(label: impl Into<String>, dtype: Dtype) -> Self {
        Self::new(label, dtype, ArrayKind::Scalar, 0)
    }

    /// Fixed-length array field.
    pub fn fixed_array(label: impl Into<String>, dtype: Dtype, array_size: u32) -> Self {
        Self::new(label, dtype, ArrayKind::FixedArray, array_size)
    }

    /// Variable-length array field.
    pub fn var_array(label: impl Into<String>, dtype: Dtype) -> Self {
        Self::new(label, dtype, ArrayKind::VarArray, 0)
    }

    /// Returns true for variable-length array fields.
    #[must_use]
    pub fn is_vlen(&self) -> bool {
        self.kind == ArrayKind::VarArray
    }

    /// Fixed wire size in bytes, `None` for variable-length arrays.
    #[must_use]
    pub fn fixed_size(&self) -> Option<usize> {
        match self.kind {
            ArrayKind::Scalar => Some(self.dtype.bytes()),
            ArrayKind::FixedArray => Some(self.array_size as usize * self.dtype.bytes()),
            ArrayKind::VarArray => None,
        }
    }

    /// JSON encoding of the field.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if serialization fails.
    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidFormat(e.to_string()))
    }

    /// Parses the JSON encoding of a field. Whitespace between tokens is free.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] on malformed JSON, an unknown dtype or
    /// an invalid `is_array` code.
    pub fn from_text(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidFormat(e.to_string()))
    }
}

/// Fixed wire size of a record described by `fields`; 0 if any field is a
/// variable-length array.
#[must_use]
pub fn fixed_record_size(fields: &[Field]) -> usize {
    fields
        .iter()
        .map(Field::fixed_size)
        .sum::<Option<usize>>()
        .unwrap_or(0)
}

/// Returns true if any field is a variable-length array.
#[must_use]
pub fn has_vlen(fields: &[Field]) -> bool {
    fields.iter().any(Field::is_vlen)
}

/// Wire shape of a field in the schema JSON.
#[derive(Serialize, Deserialize)]
struct FieldRepr {
    #[serde(default)]
    label: String,
    dtype: String,
    #[serde(default)]
    is_array: u64,
    #[serde(default)]
    array_size: u32,
}

impl TryFrom<FieldRepr> for Field {
    type Error = Error;

    fn try_from(repr: FieldRepr) -> Result<Self> {
        Ok(Self {
            label: repr.label,
            dtype: Dtype::from_text(&repr.dtype)?,
            kind: ArrayKind::from_code(repr.is_array)?,
            array_size: repr.array_size,
        })
    }
}

impl From<Field> for FieldRepr {
    fn from(field: Field) -> Self {
        Self {
            label: field.label,
            dtype: field.dtype.to_text(),
            is_array: u64::from(field.kind.code()),
            array_size: field.array_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::NATIVE_ORDER;

    #[test]
    fn test_to_text() {
        let field = Field::fixed_array("TEST", Dtype::Int32, 10);
        assert_eq!(
            field.to_text().unwrap(),
            format!(
                r#"{{"label":"TEST","dtype":"{NATIVE_ORDER}i4","is_array":1,"array_size":10}}"#
            )
        );

        let field = Field::var_array("123abc", Dtype::Float64);
        assert_eq!(
            field.to_text().unwrap(),
            r#"{"label":"123abc","dtype":"f8","is_array":2,"array_size":0}"#
        );
    }

    #[test]
    fn test_text_round_trip() {
        let field = Field::fixed_array("TEST", Dtype::Int32, 10);
        let parsed = Field::from_text(&field.to_text().unwrap()).unwrap();
        assert_eq!(parsed, field);
    }

    #[test]
    fn test_from_text_with_whitespace() {
        let text = format!(
            "{{ \n\t\"label\":\n\t \"XXXABC\", \n\t\"dtype\":\t\n \"{NATIVE_ORDER}i4\", \
             \"is_array\": 1, \"array_size\": 10\n }} \n"
        );
        let field = Field::from_text(&text).unwrap();
        assert_eq!(field, Field::fixed_array("XXXABC", Dtype::Int32, 10));
    }

    #[test]
    fn test_from_text_rejects_bad_input() {
        assert!(matches!(
            Field::from_text(r#"{"label":"a","dtype":"q4","is_array":0,"array_size":0}"#),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            Field::from_text(r#"{"label":"a","dtype":"f4","is_array":3,"array_size":0}"#),
            Err(Error::InvalidFormat(_))
        ));
        assert!(Field::from_text("{\"label\": ").is_err());
    }

    #[test]
    fn test_sizes() {
        let fields = vec![
            Field::scalar("x", Dtype::Int16),
            Field::scalar("y", Dtype::Int16),
            Field::fixed_array("data", Dtype::Int32, 9),
        ];
        assert_eq!(fixed_record_size(&fields), 40);
        assert!(!has_vlen(&fields));

        let vlen = vec![
            Field::scalar("x", Dtype::Int16),
            Field::var_array("energy", Dtype::Int32),
        ];
        assert_eq!(fixed_record_size(&vlen), 0);
        assert!(has_vlen(&vlen));
    }
}
