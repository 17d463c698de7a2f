//! clusterpix-core: Dtypes, schemas and record types for cluster files.
//!
//! This crate provides the building blocks shared by the cluster file
//! codecs and the geometry algorithms: the numeric [`Dtype`] set, schema
//! [`Field`]s, the [`ClusterSchema`], the [`Record`] traits with their
//! fixed-layout fast path, and the concrete cluster records.
//!

pub mod cluster;
pub mod cursor;
pub mod dtype;
pub mod dynamic;
pub mod error;
pub mod field;
pub mod pedestal;
pub mod record;
pub mod schema;
pub mod value;

pub use cluster::{Cluster, Cluster2x2, Cluster3x3, Cluster5x5, ClusterHeader, Sample, VlenCluster};
pub use cursor::{ByteReader, ByteWriter};
pub use dtype::{Dtype, Element, NATIVE_ORDER};
pub use dynamic::{DynamicRecord, CLUSTER_COUNT_LABEL};
pub use error::{Error, Result};
pub use field::{fixed_record_size, has_vlen, ArrayKind, Field, VLEN_COUNT_BYTES};
pub use pedestal::{GainMap, NoiseMap, Pedestal};
pub use record::{FieldValues, FixedCodec, FixedLayout, FrameHeader, Record, RecordCodec};
pub use schema::{ClusterSchema, SCHEMA_VERSION};
pub use value::FieldData;
