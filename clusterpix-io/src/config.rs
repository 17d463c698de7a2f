//! Codec configuration and open modes.

use crate::{Error, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// How a cluster file is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OpenMode {
    /// `"r"`: read an existing file.
    Read,
    /// `"w"`: create or truncate.
    Write,
    /// `"a"`: append to an existing legacy file, creating it if missing.
    Append,
}

impl OpenMode {
    /// Returns true for modes that write.
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::Append)
    }

    /// Mode string, as accepted by [`OpenMode::from_str`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::Write => "w",
            OpenMode::Append => "a",
        }
    }
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(OpenMode::Read),
            "w" => Ok(OpenMode::Write),
            "a" => Ok(OpenMode::Append),
            other => Err(Error::InvalidArgument(format!(
                "unsupported open mode '{other}'"
            ))),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration shared by the cluster file codecs.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodecConfig {
    /// Capacity of the buffered reader/writer in bytes.
    pub buffer_capacity: usize,
    /// Extra bytes reserved for the schema of new v3 files.
    pub header_slack: usize,
    /// Log a warning when a file does not use the `.clust` extension.
    pub warn_on_extension: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            header_slack: 0,
            warn_on_extension: true,
        }
    }
}

impl CodecConfig {
    /// Set the I/O buffer capacity. Values less than 1 are clamped to 1.
    #[must_use]
    pub fn with_buffer_capacity(mut self, bytes: usize) -> Self {
        self.buffer_capacity = bytes.max(1);
        self
    }

    /// Set the extra schema bytes reserved when creating v3 files.
    #[must_use]
    pub fn with_header_slack(mut self, bytes: usize) -> Self {
        self.header_slack = bytes;
        self
    }

    /// Enable or disable the file extension warning.
    #[must_use]
    pub fn with_warn_on_extension(mut self, enabled: bool) -> Self {
        self.warn_on_extension = enabled;
        self
    }

    /// Logs a warning if `path` does not end in `.clust` and warnings are on.
    pub(crate) fn check_extension(&self, path: &std::path::Path) {
        if self.warn_on_extension
            && path.extension().and_then(|ext| ext.to_str()) != Some("clust")
        {
            log::warn!(
                "cluster file {} does not have the .clust extension",
                path.display()
            );
        }
    }
}
