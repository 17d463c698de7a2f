//! Cluster record types.
//!
//! A cluster is a square neighborhood of pixel samples stored row-major,
//! starting with the top row, together with the coordinates of its center
//! pixel.

use crate::cursor::{ByteReader, ByteWriter};
use crate::dtype::{Dtype, Element};
use crate::error::Result;
use crate::field::Field;
use crate::record::{FieldValues, FixedCodec, FixedLayout, FrameHeader, Record};
use crate::value::FieldData;
use std::ops::Add;

/// Pixel sample types the geometry algorithms can sum and compare.
pub trait Sample: Element + PartialOrd + Add<Output = Self> {
    /// Lossy conversion used for ratios.
    fn to_f64(self) -> f64;

    /// Conversion back from a scaled value. Integers truncate toward zero
    /// and saturate at their bounds.
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_sample {
    ($($ty:ty),*) => {
        $(
            impl Sample for $ty {
                #[inline]
                #[allow(clippy::cast_lossless, clippy::cast_precision_loss)]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_lossless
                )]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_sample!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

/// Square cluster of `N` samples (`N` = side * side) centered on `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cluster<T, const N: usize> {
    /// Column of the center pixel.
    pub x: i16,
    /// Row of the center pixel.
    pub y: i16,
    /// Samples, row-major.
    pub data: [T; N],
}

/// 2x2 cluster.
pub type Cluster2x2<T = i32> = Cluster<T, 4>;
/// 3x3 cluster, the legacy file format's only cluster shape.
pub type Cluster3x3<T = i32> = Cluster<T, 9>;
/// 5x5 cluster.
pub type Cluster5x5<T = i32> = Cluster<T, 25>;

impl<T: Element, const N: usize> Cluster<T, N> {
    /// Creates a cluster.
    #[must_use]
    pub fn new(x: i16, y: i16, data: [T; N]) -> Self {
        Self { x, y, data }
    }

    /// Cluster of zeros at `(x, y)`.
    #[must_use]
    pub fn zeroed(x: i16, y: i16) -> Self {
        Self {
            x,
            y,
            data: [T::default(); N],
        }
    }

    /// Sample at `(row, col)` for a cluster of the given side length.
    #[must_use]
    pub fn at(&self, side: usize, row: usize, col: usize) -> Option<T> {
        if row < side && col < side {
            self.data.get(row * side + col).copied()
        } else {
            None
        }
    }
}

impl<T: Sample, const N: usize> Cluster<T, N> {
    /// Sum of all samples.
    #[must_use]
    pub fn sum(&self) -> T {
        self.data
            .iter()
            .copied()
            .fold(T::default(), |acc, value| acc + value)
    }
}

impl<T: Element, const N: usize> Record for Cluster<T, N> {
    fn fields() -> Vec<Field> {
        // N is a cluster size, always small
        #[allow(clippy::cast_possible_truncation)]
        let size = N as u32;
        vec![
            Field::scalar("x", Dtype::Int16),
            Field::scalar("y", Dtype::Int16),
            Field::fixed_array("data", T::DTYPE, size),
        ]
    }

    fn value(&self, label: &str) -> Option<FieldData> {
        match label {
            "x" => Some(FieldData::scalar(self.x)),
            "y" => Some(FieldData::scalar(self.y)),
            "data" => Some(FieldData::from_slice(&self.data)),
            _ => None,
        }
    }

    fn from_values(mut values: FieldValues) -> Result<Self> {
        Ok(Self {
            x: values.take_scalar("x")?,
            y: values.take_scalar("y")?,
            data: values.take_array("data")?,
        })
    }

    fn fixed_codec() -> Option<FixedCodec<Self>> {
        Some(FixedCodec::of())
    }
}

impl<T: Element, const N: usize> FixedLayout for Cluster<T, N> {
    const SIZE: usize = 2 * Dtype::Int16.bytes() + N * T::DTYPE.bytes();

    fn encode_fixed(&self, out: &mut ByteWriter) {
        out.put(self.x);
        out.put(self.y);
        out.put_slice(&self.data);
    }

    fn decode_fixed(input: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            x: input.read()?,
            y: input.read()?,
            data: input.read_array()?,
        })
    }
}

/// Per-frame header: frame number and number of clusters that follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterHeader {
    /// Frame number.
    pub frame_number: i32,
    /// Number of clusters in the frame.
    pub n_clusters: i32,
}

impl ClusterHeader {
    /// Creates a header.
    #[must_use]
    pub fn new(frame_number: i32, n_clusters: i32) -> Self {
        Self {
            frame_number,
            n_clusters,
        }
    }
}

impl Record for ClusterHeader {
    fn fields() -> Vec<Field> {
        vec![
            Field::scalar("frame_number", Dtype::Int32),
            Field::scalar("n_clusters", Dtype::Int32),
        ]
    }

    fn value(&self, label: &str) -> Option<FieldData> {
        match label {
            "frame_number" => Some(FieldData::scalar(self.frame_number)),
            "n_clusters" => Some(FieldData::scalar(self.n_clusters)),
            _ => None,
        }
    }

    fn from_values(mut values: FieldValues) -> Result<Self> {
        Ok(Self {
            frame_number: values.take_scalar("frame_number")?,
            n_clusters: values.take_scalar("n_clusters")?,
        })
    }

    fn fixed_codec() -> Option<FixedCodec<Self>> {
        Some(FixedCodec::of())
    }
}

impl FixedLayout for ClusterHeader {
    const SIZE: usize = 2 * Dtype::Int32.bytes();

    fn encode_fixed(&self, out: &mut ByteWriter) {
        out.put(self.frame_number);
        out.put(self.n_clusters);
    }

    fn decode_fixed(input: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            frame_number: input.read()?,
            n_clusters: input.read()?,
        })
    }
}

impl FrameHeader for ClusterHeader {
    fn cluster_count(&self) -> usize {
        usize::try_from(self.n_clusters).unwrap_or(0)
    }
}

/// Cluster of arbitrary shape stored as parallel pixel lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlenCluster {
    /// Pixel columns.
    pub x: Vec<i16>,
    /// Pixel rows.
    pub y: Vec<i16>,
    /// Pixel energies. Stored under the label `data`.
    pub energy: Vec<i32>,
}

impl VlenCluster {
    /// Creates a cluster from pixel lists.
    #[must_use]
    pub fn new(x: Vec<i16>, y: Vec<i16>, energy: Vec<i32>) -> Self {
        Self { x, y, energy }
    }

    /// Number of pixels, taken from the energy list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.energy.len()
    }

    /// Returns true if the cluster has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }

    /// Total deposited energy.
    #[must_use]
    pub fn total_energy(&self) -> i64 {
        self.energy.iter().map(|&e| i64::from(e)).sum()
    }
}

impl Record for VlenCluster {
    fn fields() -> Vec<Field> {
        vec![
            Field::var_array("x", Dtype::Int16),
            Field::var_array("y", Dtype::Int16),
            Field::var_array("data", Dtype::Int32),
        ]
    }

    fn value(&self, label: &str) -> Option<FieldData> {
        match label {
            "x" => Some(FieldData::from_slice(&self.x)),
            "y" => Some(FieldData::from_slice(&self.y)),
            "data" => Some(FieldData::from_slice(&self.energy)),
            _ => None,
        }
    }

    fn from_values(mut values: FieldValues) -> Result<Self> {
        Ok(Self {
            x: values.take_vec("x")?,
            y: values.take_vec("y")?,
            energy: values.take_vec("data")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordCodec;

    #[test]
    fn test_cluster_fields_and_size() {
        assert_eq!(Cluster3x3::<i32>::SIZE, 40);
        assert_eq!(Cluster5x5::<f64>::SIZE, 4 + 25 * 8);
        assert_eq!(
            Cluster3x3::<u16>::fields(),
            vec![
                Field::scalar("x", Dtype::Int16),
                Field::scalar("y", Dtype::Int16),
                Field::fixed_array("data", Dtype::UInt16, 9),
            ]
        );
    }

    #[test]
    fn test_sum() {
        let cluster = Cluster3x3::new(1, 2, [1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(cluster.sum(), 45);
        assert_eq!(cluster.at(3, 1, 1), Some(5));
        assert_eq!(cluster.at(3, 3, 0), None);
    }

    #[test]
    fn test_fixed_and_field_paths_agree() {
        let cluster = Cluster3x3::new(-4, 17, [9, 8, 7, 6, 5, 4, 3, 2, 1]);

        let fixed = RecordCodec::<Cluster3x3>::bind(&Cluster3x3::<i32>::fields());
        assert!(fixed.is_fixed());
        let slow = RecordCodec::<Cluster3x3>::Fields {
            fields: Cluster3x3::<i32>::fields(),
            size: 40,
        };

        let mut a = ByteWriter::new();
        let mut b = ByteWriter::new();
        fixed.encode(&cluster, &mut a).unwrap();
        slow.encode(&cluster, &mut b).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());

        let decoded = slow.decode(&mut ByteReader::new(a.as_bytes())).unwrap();
        assert_eq!(decoded, cluster);
    }

    #[test]
    fn test_reordered_fields_use_field_path() {
        let fields = vec![
            Field::scalar("y", Dtype::Int16),
            Field::scalar("x", Dtype::Int16),
            Field::fixed_array("data", Dtype::Int32, 9),
        ];
        let codec = RecordCodec::<Cluster3x3>::bind(&fields);
        assert!(!codec.is_fixed());
        assert_eq!(codec.fixed_size(), Some(40));

        let cluster = Cluster3x3::new(3, 5, [0; 9]);
        let mut out = ByteWriter::new();
        codec.encode(&cluster, &mut out).unwrap();
        let mut input = ByteReader::new(out.as_bytes());
        assert_eq!(input.read::<i16>().unwrap(), 5);
    }

    #[test]
    fn test_header_cluster_count() {
        assert_eq!(ClusterHeader::new(1, 12).cluster_count(), 12);
        assert_eq!(ClusterHeader::new(1, -1).cluster_count(), 0);
        assert!(RecordCodec::<ClusterHeader>::bind(&ClusterHeader::fields()).is_fixed());
    }

    #[test]
    fn test_vlen_cluster_codec() {
        let codec = RecordCodec::<VlenCluster>::bind(&VlenCluster::fields());
        assert!(!codec.is_fixed());
        assert_eq!(codec.fixed_size(), None);

        let cluster = VlenCluster::new(vec![1, 2], vec![3, 4], vec![100, 200]);
        let mut out = ByteWriter::new();
        codec.encode(&cluster, &mut out).unwrap();
        assert_eq!(out.len(), 3 * 4 + 2 * 2 + 2 * 2 + 2 * 4);

        let decoded = codec.decode(&mut ByteReader::new(out.as_bytes())).unwrap();
        assert_eq!(decoded, cluster);
        assert_eq!(decoded.total_energy(), 300);
    }
}
