//! Byte cursors used to encode and decode records.

use crate::dtype::Element;
use crate::error::{Error, Result};

/// Read cursor over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a cursor positioned at the start of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset into the buffer.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns true when every byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consumes `n` bytes.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if fewer than `n` bytes remain.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::InvalidFormat(format!(
                "record truncated: need {n} bytes at offset {}, {} left",
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Consumes exactly `N` bytes into an array.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if fewer than `N` bytes remain.
    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads one element.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the buffer is exhausted.
    #[inline]
    pub fn read<T: Element>(&mut self) -> Result<T> {
        T::decode(self)
    }

    /// Reads `n` consecutive elements.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the buffer is exhausted.
    pub fn read_vec<T: Element>(&mut self, n: usize) -> Result<Vec<T>> {
        if n.saturating_mul(T::DTYPE.bytes()) > self.remaining() {
            return Err(Error::InvalidFormat(format!(
                "record truncated: {n} x {} does not fit in {} bytes",
                T::DTYPE,
                self.remaining()
            )));
        }
        (0..n).map(|_| T::decode(self)).collect()
    }

    /// Reads `N` consecutive elements into an array.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the buffer is exhausted.
    pub fn read_array<T: Element, const N: usize>(&mut self) -> Result<[T; N]> {
        let mut out = [T::default(); N];
        for slot in &mut out {
            *slot = T::decode(self)?;
        }
        Ok(out)
    }
}

/// Growable write buffer.
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Appends raw bytes.
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Appends one element.
    #[inline]
    pub fn put<T: Element>(&mut self, value: T) {
        value.encode(self);
    }

    /// Appends a slice of elements.
    pub fn put_slice<T: Element>(&mut self, values: &[T]) {
        self.buf.reserve(values.len() * T::DTYPE.bytes());
        for &value in values {
            value.encode(self);
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drops the contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Written bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the writer and returns the bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
