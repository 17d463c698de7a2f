//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Invalid argument or call in the wrong mode.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No more records to read.
    #[error("end of stream after {records} records")]
    EndOfStream {
        /// Records read before the end was reached.
        records: u32,
    },

    /// Rewritten schema does not fit the space reserved at creation.
    #[error("schema needs {required} bytes but only {reserved} are reserved")]
    HeaderOverflow {
        /// Bytes reserved in the file.
        reserved: usize,
        /// Bytes the schema needs.
        required: usize,
    },

    /// Core library error other than a format error.
    #[error("core error: {0}")]
    CoreError(clusterpix_core::Error),
}

impl From<clusterpix_core::Error> for Error {
    fn from(err: clusterpix_core::Error) -> Self {
        match err {
            clusterpix_core::Error::InvalidFormat(message) => Error::InvalidFormat(message),
            other => Error::CoreError(other),
        }
    }
}
