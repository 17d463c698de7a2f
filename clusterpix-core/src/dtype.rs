//! Native-endian numeric dtypes and their text encoding.
//!
//! The text form follows the numpy array-interface convention: an optional
//! byte-order marker (`<` little, `>` big, `=`/`|` native), a kind letter
//! (`i`, `u`, `f`) and the width in bytes. Integers are written with the
//! native marker, floats without one (`f4`, `f8`).

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::value::FieldData;
use std::fmt;
use std::str::FromStr;

/// Byte-order marker of the host.
#[cfg(target_endian = "little")]
pub const NATIVE_ORDER: char = '<';
/// Byte-order marker of the host.
#[cfg(target_endian = "big")]
pub const NATIVE_ORDER: char = '>';

/// Closed set of numeric element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// Signed 8-bit integer, `i1`.
    Int8,
    /// Unsigned 8-bit integer, `u1`.
    UInt8,
    /// Signed 16-bit integer, `i2`.
    Int16,
    /// Unsigned 16-bit integer, `u2`.
    UInt16,
    /// Signed 32-bit integer, `i4`.
    Int32,
    /// Unsigned 32-bit integer, `u4`.
    UInt32,
    /// Signed 64-bit integer, `i8`.
    Int64,
    /// Unsigned 64-bit integer, `u8`.
    UInt64,
    /// Single precision float, `f4`.
    Float32,
    /// Double precision float, `f8`.
    Float64,
}

impl Dtype {
    /// All supported dtypes.
    pub const ALL: [Dtype; 10] = [
        Dtype::Int8,
        Dtype::UInt8,
        Dtype::Int16,
        Dtype::UInt16,
        Dtype::Int32,
        Dtype::UInt32,
        Dtype::Int64,
        Dtype::UInt64,
        Dtype::Float32,
        Dtype::Float64,
    ];

    /// Width of one element in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Dtype::Int8 | Dtype::UInt8 => 1,
            Dtype::Int16 | Dtype::UInt16 => 2,
            Dtype::Int32 | Dtype::UInt32 | Dtype::Float32 => 4,
            Dtype::Int64 | Dtype::UInt64 | Dtype::Float64 => 8,
        }
    }

    /// Width of one element in bits.
    #[must_use]
    pub const fn bitdepth(self) -> u8 {
        // bytes() is at most 8
        #[allow(clippy::cast_possible_truncation)]
        let bytes = self.bytes() as u8;
        bytes * 8
    }

    /// Dtype of a Rust element type.
    #[must_use]
    pub fn of<T: Element>() -> Self {
        T::DTYPE
    }

    /// Returns true for `Float32` and `Float64`.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Dtype::Float32 | Dtype::Float64)
    }

    fn kind(self) -> char {
        match self {
            Dtype::Int8 | Dtype::Int16 | Dtype::Int32 | Dtype::Int64 => 'i',
            Dtype::UInt8 | Dtype::UInt16 | Dtype::UInt32 | Dtype::UInt64 => 'u',
            Dtype::Float32 | Dtype::Float64 => 'f',
        }
    }

    /// Text encoding, e.g. `<i4` or `f8`.
    #[must_use]
    pub fn to_text(self) -> String {
        if self.is_float() {
            format!("{}{}", self.kind(), self.bytes())
        } else {
            format!("{}{}{}", NATIVE_ORDER, self.kind(), self.bytes())
        }
    }

    /// Parses the text encoding.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] when the byte-order marker is not the
    /// host's native order or the kind/width pair is unknown.
    pub fn from_text(text: &str) -> Result<Self> {
        let text = text.trim();
        let body = match text.chars().next() {
            Some(marker @ ('<' | '>')) => {
                if marker != NATIVE_ORDER {
                    return Err(Error::InvalidFormat(format!(
                        "non-native byte order in dtype '{text}'"
                    )));
                }
                &text[1..]
            }
            Some('=' | '|') => &text[1..],
            _ => text,
        };

        Self::ALL
            .into_iter()
            .find(|dt| {
                let mut chars = body.chars();
                chars.next() == Some(dt.kind())
                    && chars.as_str() == dt.bytes().to_string()
            })
            .ok_or_else(|| Error::InvalidFormat(format!("unsupported dtype '{text}'")))
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl FromStr for Dtype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_text(s)
    }
}

/// Rust types that map onto a [`Dtype`].
///
/// Encoding is always native-endian.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Matching dtype.
    const DTYPE: Dtype;

    /// Appends the native-endian bytes of `self`.
    fn encode(self, out: &mut ByteWriter);

    /// Consumes one element from the cursor.
    fn decode(input: &mut ByteReader<'_>) -> Result<Self>;

    /// Wraps a vector into the matching [`FieldData`] variant.
    fn into_data(values: Vec<Self>) -> FieldData;

    /// Borrows the values when `data` holds this element type.
    fn from_data(data: &FieldData) -> Option<&[Self]>;

    /// Takes the values when `data` holds this element type.
    fn take_data(data: FieldData) -> Option<Vec<Self>>;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: Dtype = Dtype::$variant;

                #[inline]
                fn encode(self, out: &mut ByteWriter) {
                    out.put_bytes(&self.to_ne_bytes());
                }

                #[inline]
                fn decode(input: &mut ByteReader<'_>) -> Result<Self> {
                    Ok(<$ty>::from_ne_bytes(input.take_array()?))
                }

                fn into_data(values: Vec<Self>) -> FieldData {
                    FieldData::$variant(values)
                }

                fn from_data(data: &FieldData) -> Option<&[Self]> {
                    match data {
                        FieldData::$variant(values) => Some(values),
                        _ => None,
                    }
                }

                fn take_data(data: FieldData) -> Option<Vec<Self>> {
                    match data {
                        FieldData::$variant(values) => Some(values),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_element!(
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);
