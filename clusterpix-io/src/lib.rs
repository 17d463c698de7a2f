//! clusterpix-io: Cluster file codecs.
//!
//! This crate reads and writes cluster files in two formats:
//! - **Legacy** - schema-less frames of 3x3 `i32` clusters, with noise-cut
//!   and region-of-interest readers
//! - **v3** - self-describing files whose JSON schema lists the header and
//!   cluster fields, generic over the record types
//!

mod config;
mod error;
mod frame;
pub mod legacy;
pub mod v3;

pub use config::{CodecConfig, OpenMode};
pub use error::{Error, Result};
pub use frame::Frame;
pub use legacy::{LegacyClusterFile, Roi};
pub use v3::{ClusterFile, Frames, LENGTH_DIGITS, MAGIC};
