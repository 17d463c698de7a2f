//! Schema-driven record for files whose layout is only known at runtime.

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::field::{ArrayKind, Field};
use crate::record::{FieldValues, FrameHeader, Record};
use crate::value::FieldData;

/// Label a [`DynamicRecord`] header reads its cluster count from.
pub const CLUSTER_COUNT_LABEL: &str = "n_clusters";

/// A record holding one [`FieldData`] per field of an arbitrary field list.
///
/// [`Record::fields`] is empty for this type: the layout comes from the
/// file's schema, so schemas for writing must be built explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    fields: Vec<Field>,
    values: Vec<FieldData>,
}

impl DynamicRecord {
    /// Record of zeros shaped by `fields`. Variable-length fields start empty.
    #[must_use]
    pub fn zeroed(fields: &[Field]) -> Self {
        let values = fields
            .iter()
            .map(|field| {
                let len = match field.kind {
                    ArrayKind::Scalar => 1,
                    ArrayKind::FixedArray => field.array_size as usize,
                    ArrayKind::VarArray => 0,
                };
                FieldData::zeros(field.dtype, len)
            })
            .collect();
        Self {
            fields: fields.to_vec(),
            values,
        }
    }

    /// Field list of this record.
    #[must_use]
    pub fn field_list(&self) -> &[Field] {
        &self.fields
    }

    /// Raw value of `label`.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&FieldData> {
        self.index_of(label).map(|i| &self.values[i])
    }

    /// Values of `label` as `T`, if present with that dtype.
    #[must_use]
    pub fn get_as<T: Element>(&self, label: &str) -> Option<&[T]> {
        self.get(label).and_then(FieldData::as_slice)
    }

    /// First value of `label` as `T`.
    #[must_use]
    pub fn scalar<T: Element>(&self, label: &str) -> Option<T> {
        self.get_as::<T>(label).and_then(|values| values.first().copied())
    }

    /// Replaces the value of `label`.
    ///
    /// # Errors
    /// Returns [`Error::MissingField`] for unknown labels and
    /// [`Error::TypeMismatch`] if the dtype differs from the field's.
    pub fn set(&mut self, label: &str, value: FieldData) -> Result<()> {
        let index = self
            .index_of(label)
            .ok_or_else(|| Error::MissingField(label.to_string()))?;
        let field = &self.fields[index];
        if field.dtype != value.dtype() {
            return Err(Error::TypeMismatch {
                label: label.to_string(),
                expected: field.dtype.to_text(),
                found: value.dtype().to_text(),
            });
        }
        self.values[index] = value;
        Ok(())
    }

    fn index_of(&self, label: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.label == label)
    }
}

impl Record for DynamicRecord {
    fn fields() -> Vec<Field> {
        Vec::new()
    }

    fn value(&self, label: &str) -> Option<FieldData> {
        self.get(label).cloned()
    }

    fn from_values(values: FieldValues) -> Result<Self> {
        let (fields, values) = values.into_parts();
        let values = fields
            .iter()
            .zip(values)
            .map(|(field, value)| value.ok_or_else(|| Error::MissingField(field.label.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields, values })
    }
}

impl FrameHeader for DynamicRecord {
    fn cluster_count(&self) -> usize {
        self.get(CLUSTER_COUNT_LABEL)
            .and_then(FieldData::as_count)
            .unwrap_or(0)
    }
}
