//! Error types for clusterpix-core.

use thiserror::Error;

/// Result type alias for clusterpix-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for schemas and record encoding.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed dtype text, byte order, schema or record bytes.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Argument outside of the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A field value does not have the dtype the record expects.
    #[error("type mismatch for field '{label}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Field label.
        label: String,
        /// Dtype the record type expects.
        expected: String,
        /// Dtype found in the schema or value.
        found: String,
    },

    /// A record type requires a field the schema does not declare.
    #[error("missing field: {0}")]
    MissingField(String),
}
