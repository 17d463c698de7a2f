//! Self-describing cluster files.
//!
//! Layout: the magic bytes `CLST`, a 10 digit zero-padded ASCII length, a
//! JSON [`ClusterSchema`] of exactly that length, then the frame records back
//! to back. Each frame record is one header followed by as many cluster
//! records as the header announces, both laid out field by field in schema
//! order. Variable-length array fields carry a `u32` element count first.
//!
//! Writers reserve room for the schema with the largest possible record
//! count and pad the JSON with spaces, so the count can be rewritten in place
//! on close.

use crate::config::{CodecConfig, OpenMode};
use crate::frame::Frame;
use crate::{Error, Result};
use clusterpix_core::{
    ByteReader, ByteWriter, ClusterSchema, Field, FrameHeader, Record, RecordCodec,
    SCHEMA_VERSION, VLEN_COUNT_BYTES,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes at the start of every v3 file.
pub const MAGIC: &[u8; 4] = b"CLST";
/// Width of the ASCII schema length field.
pub const LENGTH_DIGITS: usize = 10;
const MAX_SCHEMA_LEN: u64 = 9_999_999_999;
const MAX_PREALLOC: usize = 1 << 16;

enum Stream {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
    Closed,
}

/// Appends exactly `n` bytes from `reader` to `buf`.
fn append_exact(reader: &mut impl Read, buf: &mut Vec<u8>, n: usize) -> Result<()> {
    let got = reader.by_ref().take(n as u64).read_to_end(buf)?;
    if got != n {
        return Err(Error::InvalidFormat(format!(
            "record truncated: expected {n} bytes, found {got}"
        )));
    }
    Ok(())
}

/// Reads the bytes of one record into `buf` and decodes it.
///
/// Fixed-size records are read in one piece. Otherwise the fields are
/// walked to find each variable-length array's element count.
fn read_record<T: Record>(
    reader: &mut impl Read,
    codec: &RecordCodec<T>,
    fields: &[Field],
    buf: &mut Vec<u8>,
) -> Result<T> {
    buf.clear();
    if let Some(size) = codec.fixed_size() {
        append_exact(reader, buf, size)?;
    } else {
        for field in fields {
            if let Some(size) = field.fixed_size() {
                append_exact(reader, buf, size)?;
                continue;
            }
            let start = buf.len();
            append_exact(reader, buf, VLEN_COUNT_BYTES)?;
            let count = ByteReader::new(&buf[start..]).read::<u32>()? as usize;
            let size = count.checked_mul(field.dtype.bytes()).ok_or_else(|| {
                Error::InvalidFormat(format!("array '{}' of {count} elements", field.label))
            })?;
            append_exact(reader, buf, size)?;
        }
    }
    Ok(codec.decode(&mut ByteReader::new(buf))?)
}

/// Schema bytes to reserve for a schema whose widest JSON is `json_len`
/// bytes long. The total must fit the length field.
fn reserve_len(json_len: usize, slack: usize) -> Result<usize> {
    json_len
        .checked_add(slack)
        .filter(|&len| u64::try_from(len).is_ok_and(|len| len <= MAX_SCHEMA_LEN))
        .ok_or_else(|| Error::InvalidArgument("schema too large to store".to_string()))
}

/// Length field plus the schema JSON padded with spaces to `reserved` bytes.
fn render_header(schema: &ClusterSchema, reserved: usize) -> Result<Vec<u8>> {
    let json = schema.to_json()?;
    if json.len() > reserved {
        return Err(Error::HeaderOverflow {
            reserved,
            required: json.len(),
        });
    }
    let mut out = Vec::with_capacity(LENGTH_DIGITS + reserved);
    out.extend_from_slice(format!("{reserved:0width$}", width = LENGTH_DIGITS).as_bytes());
    out.extend_from_slice(json.as_bytes());
    out.resize(LENGTH_DIGITS + reserved, b' ');
    Ok(out)
}

/// Replaces a truncation error with `message`; other errors pass through.
fn truncated_as(err: Error, message: impl Into<String>) -> Error {
    match err {
        Error::InvalidFormat(_) => Error::InvalidFormat(message.into()),
        other => other,
    }
}

/// Reads magic, length and schema. Returns the schema and its stored length.
fn read_header(reader: &mut impl Read) -> Result<(ClusterSchema, usize)> {
    let mut buf = Vec::with_capacity(MAGIC.len() + LENGTH_DIGITS);
    append_exact(reader, &mut buf, MAGIC.len())
        .map_err(|e| truncated_as(e, "file too short for magic bytes"))?;
    if buf.as_slice() != MAGIC {
        return Err(Error::InvalidFormat(format!(
            "bad magic bytes {:?}, expected {:?}",
            String::from_utf8_lossy(&buf),
            String::from_utf8_lossy(MAGIC)
        )));
    }

    buf.clear();
    append_exact(reader, &mut buf, LENGTH_DIGITS)
        .map_err(|e| truncated_as(e, "file too short for schema length"))?;
    let length = std::str::from_utf8(&buf)
        .ok()
        .filter(|text| text.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|text| text.parse::<usize>().ok())
        .ok_or_else(|| {
            Error::InvalidFormat(format!(
                "bad schema length field {:?}",
                String::from_utf8_lossy(&buf)
            ))
        })?;

    buf.clear();
    append_exact(reader, &mut buf, length)
        .map_err(|e| truncated_as(e, format!("schema shorter than {length} bytes")))?;
    let json = String::from_utf8(buf)
        .map_err(|e| Error::InvalidFormat(format!("schema is not UTF-8: {e}")))?;
    let schema = ClusterSchema::from_json(&json)?;
    Ok((schema, length))
}

/// Reader/writer for self-describing cluster files, generic over the frame
/// header type `H` and the cluster record type `D`.
///
/// # Example
/// ```no_run
/// use clusterpix_core::{Cluster3x3, ClusterHeader, ClusterSchema};
/// use clusterpix_io::ClusterFile;
///
/// # fn main() -> clusterpix_io::Result<()> {
/// let schema = ClusterSchema::for_records::<ClusterHeader, Cluster3x3>();
/// let mut file = ClusterFile::<ClusterHeader, Cluster3x3>::create("run.clust", schema)?;
/// file.write(&ClusterHeader::new(0, 1), &[Cluster3x3::zeroed(10, 20)])?;
/// file.close()?;
///
/// let mut file = ClusterFile::<ClusterHeader, Cluster3x3>::open("run.clust")?;
/// for frame in file.frames() {
///     let frame = frame?;
///     println!("frame {}: {} clusters", frame.header.frame_number, frame.clusters.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ClusterFile<H, D> {
    path: PathBuf,
    mode: OpenMode,
    stream: Stream,
    schema: ClusterSchema,
    header_codec: RecordCodec<H>,
    data_codec: RecordCodec<D>,
    position: u32,
    reserved: usize,
    buf: Vec<u8>,
    scratch: ByteWriter,
}

impl<H: FrameHeader, D: Record> ClusterFile<H, D> {
    /// Opens `path` for reading with the default configuration.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be opened and
    /// [`Error::InvalidFormat`] if the magic bytes or schema are invalid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, &CodecConfig::default())
    }

    /// Opens `path` for reading.
    ///
    /// # Errors
    /// Same as [`open`](Self::open).
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: &CodecConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        config.check_extension(&path);

        let mut reader = BufReader::with_capacity(config.buffer_capacity.max(1), File::open(&path)?);
        let (schema, reserved) = read_header(&mut reader)?;
        log::debug!(
            "opened {} (version {:?}, {} records)",
            path.display(),
            schema.version,
            schema.n_records
        );
        Ok(Self::bind(path, OpenMode::Read, Stream::Reader(reader), schema, reserved))
    }

    /// Creates or truncates `path` and writes `schema` with the default
    /// configuration.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, schema: ClusterSchema) -> Result<Self> {
        Self::create_with_config(path, schema, &CodecConfig::default())
    }

    /// Creates or truncates `path` and writes `schema`.
    ///
    /// The record count of `schema` is reset to 0 and an empty version is
    /// replaced by the current one.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be created and
    /// [`Error::InvalidArgument`] if the schema cannot be stored, including a
    /// version that is not three characters long. Nothing is created then.
    pub fn create_with_config<P: AsRef<Path>>(
        path: P,
        mut schema: ClusterSchema,
        config: &CodecConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        config.check_extension(&path);

        if schema.version.is_empty() {
            schema.version = SCHEMA_VERSION.to_string();
        }
        if schema.version.chars().count() != 3 {
            return Err(Error::InvalidArgument(format!(
                "schema version '{}' is not three characters long",
                schema.version
            )));
        }
        schema.n_records = u32::MAX;
        let reserved = reserve_len(schema.to_json()?.len(), config.header_slack)?;
        schema.n_records = 0;

        let mut writer =
            BufWriter::with_capacity(config.buffer_capacity.max(1), File::create(&path)?);
        writer.write_all(MAGIC)?;
        writer.write_all(&render_header(&schema, reserved)?)?;
        log::debug!(
            "created {} with {} schema bytes reserved",
            path.display(),
            reserved
        );
        Ok(Self::bind(path, OpenMode::Write, Stream::Writer(writer), schema, reserved))
    }

    /// Opens `path` in `mode`. Writing requires a schema.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for append mode or a missing schema
    /// in write mode, otherwise the errors of [`open`](Self::open) and
    /// [`create`](Self::create).
    pub fn open_with_mode<P: AsRef<Path>>(
        path: P,
        mode: OpenMode,
        schema: Option<ClusterSchema>,
        config: &CodecConfig,
    ) -> Result<Self> {
        match (mode, schema) {
            (OpenMode::Read, _) => Self::open_with_config(path, config),
            (OpenMode::Write, Some(schema)) => Self::create_with_config(path, schema, config),
            (OpenMode::Write, None) => Err(Error::InvalidArgument(
                "writing a cluster file requires a schema".to_string(),
            )),
            (OpenMode::Append, _) => Err(Error::InvalidArgument(
                "self-describing cluster files cannot be appended to".to_string(),
            )),
        }
    }

    fn bind(
        path: PathBuf,
        mode: OpenMode,
        stream: Stream,
        schema: ClusterSchema,
        reserved: usize,
    ) -> Self {
        let header_codec = RecordCodec::bind(&schema.header_fields);
        let data_codec = RecordCodec::bind(&schema.data_fields);
        log::debug!(
            "{}: header {} path, data {} path",
            path.display(),
            if header_codec.is_fixed() { "fixed" } else { "field" },
            if data_codec.is_fixed() { "fixed" } else { "field" }
        );
        Self {
            path,
            mode,
            stream,
            schema,
            header_codec,
            data_codec,
            position: 0,
            reserved,
            buf: Vec::new(),
            scratch: ByteWriter::new(),
        }
    }

    /// Schema of the file. In write mode its record count is the number of
    /// frames written so far.
    #[must_use]
    pub fn schema(&self) -> &ClusterSchema {
        &self.schema
    }

    /// Number of frame records in the file.
    #[must_use]
    pub fn n_records(&self) -> u32 {
        self.schema.n_records
    }

    /// Frames read (read mode) or written (write mode) so far.
    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode the file was opened in.
    #[must_use]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Bytes reserved for the schema JSON.
    #[must_use]
    pub fn reserved_schema_len(&self) -> usize {
        self.reserved
    }

    /// Reads the next frame.
    ///
    /// # Errors
    /// Returns [`Error::EndOfStream`] once all declared records have been
    /// read, [`Error::InvalidArgument`] if the file is not open for reading
    /// and [`Error::InvalidFormat`] for truncated or malformed records.
    pub fn read(&mut self) -> Result<Frame<H, D>> {
        let reader = match &mut self.stream {
            Stream::Reader(reader) => reader,
            Stream::Writer(_) => {
                return Err(Error::InvalidArgument(format!(
                    "cannot read from a file opened in mode '{}'",
                    self.mode
                )))
            }
            Stream::Closed => return Err(Error::InvalidArgument("file is closed".to_string())),
        };
        if self.position >= self.schema.n_records {
            return Err(Error::EndOfStream {
                records: self.position,
            });
        }

        let header = read_record(
            reader,
            &self.header_codec,
            &self.schema.header_fields,
            &mut self.buf,
        )?;
        let count = header.cluster_count();
        let mut clusters = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            clusters.push(read_record(
                reader,
                &self.data_codec,
                &self.schema.data_fields,
                &mut self.buf,
            )?);
        }
        self.position += 1;
        Ok(Frame::new(header, clusters))
    }

    /// Writes one frame.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `clusters.len()` differs from
    /// the header's cluster count or the file is not open for writing, and
    /// the core error if a record does not fit the schema. Nothing is
    /// written on error.
    pub fn write(&mut self, header: &H, clusters: &[D]) -> Result<()> {
        let writer = match &mut self.stream {
            Stream::Writer(writer) => writer,
            Stream::Reader(_) => {
                return Err(Error::InvalidArgument(
                    "cannot write to a file opened in mode 'r'".to_string(),
                ))
            }
            Stream::Closed => return Err(Error::InvalidArgument("file is closed".to_string())),
        };
        if clusters.len() != header.cluster_count() {
            return Err(Error::InvalidArgument(format!(
                "header announces {} clusters but {} were given",
                header.cluster_count(),
                clusters.len()
            )));
        }
        if self.schema.n_records == u32::MAX {
            return Err(Error::InvalidArgument(
                "record count limit reached".to_string(),
            ));
        }

        self.scratch.clear();
        self.header_codec.encode(header, &mut self.scratch)?;
        for cluster in clusters {
            self.data_codec.encode(cluster, &mut self.scratch)?;
        }
        writer.write_all(self.scratch.as_bytes())?;

        self.schema.n_records += 1;
        self.position += 1;
        Ok(())
    }

    /// Writes `frame`. See [`write`](Self::write).
    ///
    /// # Errors
    /// Same as [`write`](Self::write).
    pub fn write_frame(&mut self, frame: &Frame<H, D>) -> Result<()> {
        self.write(&frame.header, &frame.clusters)
    }

    /// Adds a metadata entry to be stored when the file is closed.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the file is not open for writing
    /// and [`Error::HeaderOverflow`] if the schema would no longer fit the
    /// reserved space, in which case the entry is not added.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        if !matches!(self.stream, Stream::Writer(_)) {
            return Err(Error::InvalidArgument(
                "metadata can only be set while writing".to_string(),
            ));
        }
        let key = key.into();
        let previous = self.schema.metadata.insert(key.clone(), value.into());

        let mut worst = self.schema.clone();
        worst.n_records = u32::MAX;
        if let Err(e) = render_header(&worst, self.reserved) {
            match previous {
                Some(value) => self.schema.metadata.insert(key, value),
                None => self.schema.metadata.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Iterator over the remaining frames.
    ///
    /// Stops after the last declared record or after the first error.
    pub fn frames(&mut self) -> Frames<'_, H, D> {
        Frames {
            file: self,
            done: false,
        }
    }

}

impl<H, D> ClusterFile<H, D> {
    /// Closes the file. In write mode the schema is rewritten with the final
    /// record count. Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns [`Error::HeaderOverflow`] if the schema no longer fits the
    /// reserved space (the stored schema is left as is) and [`Error::Io`]
    /// on write failures.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.stream, Stream::Closed) {
            Stream::Writer(mut writer) => {
                let header = render_header(&self.schema, self.reserved)?;
                writer.flush()?;
                writer.seek(SeekFrom::Start(MAGIC.len() as u64))?;
                writer.write_all(&header)?;
                writer.flush()?;
                log::debug!(
                    "closed {} with {} records",
                    self.path.display(),
                    self.schema.n_records
                );
            }
            Stream::Reader(_) => {
                log::debug!(
                    "closed {} after {} of {} records",
                    self.path.display(),
                    self.position,
                    self.schema.n_records
                );
            }
            Stream::Closed => {}
        }
        Ok(())
    }
}

impl<H, D> Drop for ClusterFile<H, D> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close {}: {e}", self.path.display());
        }
    }
}

/// Iterator returned by [`ClusterFile::frames`].
pub struct Frames<'a, H, D> {
    file: &'a mut ClusterFile<H, D>,
    done: bool,
}

impl<H: FrameHeader, D: Record> Iterator for Frames<'_, H, D> {
    type Item = Result<Frame<H, D>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.file.read() {
            Ok(frame) => Some(Ok(frame)),
            Err(Error::EndOfStream { .. }) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
