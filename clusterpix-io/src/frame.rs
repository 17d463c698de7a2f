//! One frame's worth of records.

/// A frame header together with the clusters it announces.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<H, D> {
    /// Frame header.
    pub header: H,
    /// Cluster records, as many as the header's cluster count.
    pub clusters: Vec<D>,
}

impl<H, D> Frame<H, D> {
    /// Creates a frame.
    #[must_use]
    pub fn new(header: H, clusters: Vec<D>) -> Self {
        Self { header, clusters }
    }
}
