//! Reader/writer for the schema-less legacy cluster format.
//!
//! A legacy file is a sequence of frames, each stored as
//! `[i32 frame_number][u32 n_clusters]` followed by `n_clusters` 3x3 clusters
//! of `{i16 x, i16 y, i32 data[9]}`, all in native byte order.
//!
//! Reads stream across frame boundaries. Reaching the end of the file is not
//! an error, and a truncated trailing record counts as the end of the file.

use crate::config::{CodecConfig, OpenMode};
use crate::frame::Frame;
use crate::{Error, Result};
use clusterpix_algorithms::passes_noise_cut;
use clusterpix_core::{
    ByteReader, ByteWriter, Cluster3x3, ClusterHeader, FixedLayout, GainMap, NoiseMap,
};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Bytes of one `[i32 frame_number][u32 n_clusters]` pair.
const FRAME_HEADER_BYTES: usize = 8;
/// Bytes of one legacy cluster.
const CLUSTER_BYTES: usize = <Cluster3x3 as FixedLayout>::SIZE;
/// Upper bound on speculative allocation for a read request.
const MAX_PREALLOC: usize = 1 << 16;

/// Inclusive region of interest in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roi {
    /// Smallest accepted column.
    pub xmin: i32,
    /// Largest accepted column.
    pub xmax: i32,
    /// Smallest accepted row.
    pub ymin: i32,
    /// Largest accepted row.
    pub ymax: i32,
}

impl Roi {
    /// Creates a region from its inclusive bounds.
    #[must_use]
    pub fn new(xmin: i32, xmax: i32, ymin: i32, ymax: i32) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// Returns true if `(x, y)` lies inside the region, bounds included.
    #[must_use]
    pub fn contains(&self, x: i16, y: i16) -> bool {
        let (x, y) = (i32::from(x), i32::from(y));
        (self.xmin..=self.xmax).contains(&x) && (self.ymin..=self.ymax).contains(&y)
    }
}

enum Stream {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
    Closed,
}

/// Fills `buf` completely. Returns `false` if the file ends first.
fn read_chunk(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Streaming codec for legacy cluster files.
pub struct LegacyClusterFile {
    path: PathBuf,
    mode: OpenMode,
    stream: Stream,
    /// Clusters of the current frame not yet consumed.
    pending: usize,
    frame_number: i32,
    frames: u32,
    gain: Option<GainMap>,
}

impl LegacyClusterFile {
    /// Opens `path` for reading with the default configuration.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_mode(path, OpenMode::Read, &CodecConfig::default())
    }

    /// Creates or truncates `path` for writing with the default configuration.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_mode(path, OpenMode::Write, &CodecConfig::default())
    }

    /// Opens `path` in `mode`.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be opened.
    pub fn open_with_mode<P: AsRef<Path>>(
        path: P,
        mode: OpenMode,
        config: &CodecConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        config.check_extension(&path);

        let capacity = config.buffer_capacity.max(1);
        let stream = match mode {
            OpenMode::Read => Stream::Reader(BufReader::with_capacity(capacity, File::open(&path)?)),
            OpenMode::Write => {
                Stream::Writer(BufWriter::with_capacity(capacity, File::create(&path)?))
            }
            OpenMode::Append => {
                let file = OpenOptions::new().append(true).create(true).open(&path)?;
                Stream::Writer(BufWriter::with_capacity(capacity, file))
            }
        };
        log::debug!("opened legacy cluster file {} in mode {mode}", path.display());

        Ok(Self {
            path,
            mode,
            stream,
            pending: 0,
            frame_number: 0,
            frames: 0,
            gain: None,
        })
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

    /// Number of the frame clusters are currently read from.
    #[must_use]
    pub fn frame_number(&self) -> i32 {
        self.frame_number
    }

    /// Clusters of the current frame that have not been read yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Scales every cluster read from now on by `gain`.
    ///
    /// Filters such as the noise cut see the unscaled samples. Clusters that
    /// reach past the map are returned zeroed.
    pub fn set_gain_map(&mut self, gain: GainMap) {
        log::debug!("{}: applying {}x{} gain map", self.path.display(), gain.nx(), gain.ny());
        self.gain = Some(gain);
    }

    /// Stops scaling clusters.
    pub fn clear_gain_map(&mut self) {
        self.gain = None;
    }

    /// Gain map applied to read clusters, if any.
    #[must_use]
    pub fn gain_map(&self) -> Option<&GainMap> {
        self.gain.as_ref()
    }

    fn reader(&mut self) -> Result<&mut BufReader<File>> {
        match &mut self.stream {
            Stream::Reader(reader) => Ok(reader),
            Stream::Writer(_) => Err(Error::InvalidArgument(format!(
                "cannot read from a file opened in mode '{}'",
                self.mode
            ))),
            Stream::Closed => Err(Error::InvalidArgument("file is closed".to_string())),
        }
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        match &mut self.stream {
            Stream::Writer(writer) => Ok(writer),
            Stream::Reader(_) => Err(Error::InvalidArgument(
                "cannot write to a file opened in mode 'r'".to_string(),
            )),
            Stream::Closed => Err(Error::InvalidArgument("file is closed".to_string())),
        }
    }

    /// Reads the next frame header pair. `None` at end of file.
    fn next_frame_header(&mut self) -> Result<Option<(i32, u32)>> {
        let mut buf = [0u8; FRAME_HEADER_BYTES];
        if !read_chunk(self.reader()?, &mut buf)? {
            return Ok(None);
        }
        let mut input = ByteReader::new(&buf);
        let frame_number = input.read::<i32>()?;
        let n_clusters = input.read::<u32>()?;
        self.frame_number = frame_number;
        self.frames = self.frames.saturating_add(1);
        Ok(Some((frame_number, n_clusters)))
    }

    /// Reads one cluster of the current frame. `None` at end of file.
    fn next_cluster(&mut self) -> Result<Option<Cluster3x3>> {
        let mut buf = [0u8; CLUSTER_BYTES];
        if !read_chunk(self.reader()?, &mut buf)? {
            self.pending = 0;
            return Ok(None);
        }
        self.pending -= 1;
        Ok(Some(Cluster3x3::decode_fixed(&mut ByteReader::new(&buf))?))
    }

    /// Shared traversal: consume clusters across frames until `n` of them
    /// pass `keep` or the file ends.
    fn read_filtered<F>(&mut self, n: usize, mut keep: F) -> Result<Vec<Cluster3x3>>
    where
        F: FnMut(&Cluster3x3) -> bool,
    {
        // Fail early in the wrong mode even when nothing would be read
        self.reader()?;

        let mut clusters = Vec::with_capacity(n.min(MAX_PREALLOC));
        while clusters.len() < n {
            if self.pending == 0 {
                match self.next_frame_header()? {
                    Some((_, count)) => {
                        self.pending = count as usize;
                        continue;
                    }
                    None => break,
                }
            }
            match self.next_cluster()? {
                Some(cluster) if keep(&cluster) => clusters.push(cluster),
                Some(_) => {}
                None => break,
            }
        }
        if let Some(gain) = &self.gain {
            gain.apply_all(&mut clusters);
        }
        Ok(clusters)
    }

    /// Reads up to `n` clusters, crossing frame boundaries as needed.
    ///
    /// Fewer than `n` clusters are returned only when the file ends.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the file is not open for reading
    /// and [`Error::Io`] on read failures other than end of file.
    pub fn read_clusters(&mut self, n: usize) -> Result<Vec<Cluster3x3>> {
        self.read_filtered(n, |_| true)
    }

    /// Like [`read_clusters`](Self::read_clusters) but only clusters passing
    /// the noise cut count toward `n`.
    ///
    /// A cluster is kept if its center lies inside `noise` and its center,
    /// best 2x2 quadrant or 3x3 total exceeds 1, 2 or 3 times the noise at
    /// the center pixel. Dropped clusters are consumed.
    ///
    /// # Errors
    /// Same as [`read_clusters`](Self::read_clusters).
    pub fn read_clusters_with_cut(&mut self, n: usize, noise: &NoiseMap) -> Result<Vec<Cluster3x3>> {
        self.read_filtered(n, |cluster| {
            match noise.get(i64::from(cluster.x), i64::from(cluster.y)) {
                Some(level) => passes_noise_cut(&cluster.data, level),
                None => {
                    log::trace!(
                        "dropping cluster at ({}, {}) outside the {}x{} noise map",
                        cluster.x,
                        cluster.y,
                        noise.nx(),
                        noise.ny()
                    );
                    false
                }
            }
        })
    }

    /// Like [`read_clusters`](Self::read_clusters) but only clusters whose
    /// center lies in `roi` count toward `n`. Others are consumed.
    ///
    /// # Errors
    /// Same as [`read_clusters`](Self::read_clusters).
    pub fn read_clusters_in_roi(&mut self, n: usize, roi: Roi) -> Result<Vec<Cluster3x3>> {
        self.read_filtered(n, |cluster| roi.contains(cluster.x, cluster.y))
    }

    /// Reads one whole frame.
    ///
    /// If the file ends inside the frame, the clusters read so far are
    /// returned.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if clusters of the current frame
    /// are still pending and [`Error::EndOfStream`] when no frame is left.
    pub fn read_frame(&mut self) -> Result<Frame<ClusterHeader, Cluster3x3>> {
        if self.pending > 0 {
            return Err(Error::InvalidArgument(format!(
                "{} clusters of frame {} are still pending",
                self.pending, self.frame_number
            )));
        }
        let frames_before = self.frames;
        let Some((frame_number, count)) = self.next_frame_header()? else {
            return Err(Error::EndOfStream {
                records: frames_before,
            });
        };

        self.pending = count as usize;
        let mut clusters = Vec::with_capacity(self.pending.min(MAX_PREALLOC));
        while self.pending > 0 {
            match self.next_cluster()? {
                Some(cluster) => clusters.push(cluster),
                None => break,
            }
        }
        if let Some(gain) = &self.gain {
            gain.apply_all(&mut clusters);
        }
        let n_clusters = i32::try_from(clusters.len())
            .map_err(|_| Error::InvalidFormat(format!("frame {frame_number} is too large")))?;
        Ok(Frame::new(ClusterHeader::new(frame_number, n_clusters), clusters))
    }

    /// Appends one frame.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the file is not open for writing
    /// or holds more clusters than the format can count, and [`Error::Io`] on
    /// write failures.
    pub fn write_frame(&mut self, frame_number: i32, clusters: &[Cluster3x3]) -> Result<()> {
        let count = u32::try_from(clusters.len()).map_err(|_| {
            Error::InvalidArgument(format!("{} clusters do not fit in a frame", clusters.len()))
        })?;
        let writer = self.writer()?;

        let mut out = ByteWriter::with_capacity(FRAME_HEADER_BYTES + clusters.len() * CLUSTER_BYTES);
        out.put(frame_number);
        out.put(count);
        for cluster in clusters {
            cluster.encode_fixed(&mut out);
        }
        writer.write_all(out.as_bytes())?;

        self.frame_number = frame_number;
        self.frames = self.frames.saturating_add(1);
        Ok(())
    }

    /// Flushes buffered writes.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        if let Stream::Writer(writer) = &mut self.stream {
            writer.flush()?;
        }
        Ok(())
    }

    /// Flushes and closes the file. Further reads and writes fail.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if flushing fails.
    pub fn close(&mut self) -> Result<()> {
        let result = self.flush();
        if !matches!(self.stream, Stream::Closed) {
            log::debug!(
                "closing legacy cluster file {} after {} frames",
                self.path.display(),
                self.frames
            );
        }
        self.stream = Stream::Closed;
        result
    }
}

impl Drop for LegacyClusterFile {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cluster_bytes() {
        assert_eq!(CLUSTER_BYTES, 40);
    }

    #[test]
    fn test_roi_is_inclusive() {
        let roi = Roi::new(0, 50, 200, 249);
        assert!(roi.contains(0, 200));
        assert!(roi.contains(50, 249));
        assert!(!roi.contains(51, 249));
        assert!(!roi.contains(-1, 220));
        assert!(!roi.contains(10, 250));
    }

    #[test]
    fn test_mode_checks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("modes.clust");

        let mut writer = LegacyClusterFile::create(&path).unwrap();
        assert!(matches!(writer.read_clusters(1), Err(Error::InvalidArgument(_))));
        writer.write_frame(1, &[Cluster3x3::zeroed(1, 1)]).unwrap();
        writer.close().unwrap();
        assert!(matches!(
            writer.write_frame(2, &[]),
            Err(Error::InvalidArgument(_))
        ));

        let mut reader = LegacyClusterFile::open(&path).unwrap();
        assert!(matches!(reader.write_frame(2, &[]), Err(Error::InvalidArgument(_))));
        assert_eq!(reader.read_clusters(0).unwrap().len(), 0);
        assert_eq!(reader.read_clusters(5).unwrap().len(), 1);
    }

    #[test]
    fn test_truncated_record_is_end_of_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("truncated.clust");

        let mut writer = LegacyClusterFile::create(&path).unwrap();
        writer
            .write_frame(3, &[Cluster3x3::zeroed(1, 1), Cluster3x3::zeroed(2, 2)])
            .unwrap();
        writer.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();

        let mut reader = LegacyClusterFile::open(&path).unwrap();
        let clusters = reader.read_clusters(10).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(reader.pending(), 0);
        assert!(reader.read_clusters(10).unwrap().is_empty());
    }
}
