//! Self-describing cluster file schema.

use crate::error::{Error, Result};
use crate::field::{fixed_record_size, has_vlen, Field};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written by this crate.
pub const SCHEMA_VERSION: &str = "0.1";

/// Schema of a cluster file: field lists for the per-frame header and the
/// per-cluster data, free-form metadata and the number of frame records.
///
/// Field order is wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSchema {
    /// Three character version string, e.g. `"0.1"`.
    #[serde(default)]
    pub version: String,
    /// Number of frame records in the file.
    #[serde(default)]
    pub n_records: u32,
    /// String key/value pairs.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Layout of each frame header.
    #[serde(default)]
    pub header_fields: Vec<Field>,
    /// Layout of each cluster record.
    #[serde(default)]
    pub data_fields: Vec<Field>,
}

impl ClusterSchema {
    /// Creates a schema with the current version and no records.
    #[must_use]
    pub fn new(header_fields: Vec<Field>, data_fields: Vec<Field>) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            n_records: 0,
            metadata: BTreeMap::new(),
            header_fields,
            data_fields,
        }
    }

    /// Schema built from the fields two record types declare.
    #[must_use]
    pub fn for_records<H: Record, D: Record>() -> Self {
        Self::new(H::fields(), D::fields())
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns true if a header field is a variable-length array.
    #[must_use]
    pub fn has_vlen_header(&self) -> bool {
        has_vlen(&self.header_fields)
    }

    /// Returns true if a data field is a variable-length array.
    #[must_use]
    pub fn has_vlen_data(&self) -> bool {
        has_vlen(&self.data_fields)
    }

    /// Fixed size of a frame header in bytes, 0 when it has a vlen field.
    #[must_use]
    pub fn header_size(&self) -> usize {
        fixed_record_size(&self.header_fields)
    }

    /// Fixed size of a cluster record in bytes, 0 when it has a vlen field.
    #[must_use]
    pub fn data_size(&self) -> usize {
        fixed_record_size(&self.data_fields)
    }

    /// Compact JSON encoding.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidFormat(e.to_string()))
    }

    /// Parses the JSON encoding. Missing keys take their defaults and
    /// unknown keys are ignored.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] on malformed JSON, bad field entries or
    /// a version string that is not three characters long.
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidFormat(e.to_string()))?;
        if !schema.version.is_empty() && schema.version.chars().count() != 3 {
            return Err(Error::InvalidFormat(format!(
                "invalid version string '{}'",
                schema.version
            )));
        }
        Ok(schema)
    }
}
