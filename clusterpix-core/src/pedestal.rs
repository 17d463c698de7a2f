//! Per-pixel noise inputs for cluster cuts.

use crate::cluster::{Cluster, Sample};
use crate::error::{Error, Result};

/// Per-pixel running statistics supplied by a pedestal estimator.
pub trait Pedestal {
    /// Mean of pixel `(row, col)`.
    fn mean(&self, row: usize, col: usize) -> f64;

    /// Variance of pixel `(row, col)`.
    fn variance(&self, row: usize, col: usize) -> f64;

    /// Standard deviation of pixel `(row, col)`.
    fn std(&self, row: usize, col: usize) -> f64 {
        self.variance(row, col).sqrt()
    }
}

/// Number of pixels in an `nx` by `ny` map.
fn pixel_count(nx: usize, ny: usize) -> Result<usize> {
    nx.checked_mul(ny)
        .ok_or_else(|| Error::InvalidArgument(format!("map of {nx}x{ny} pixels is too large")))
}

/// Index of column `x`, row `y` in a row-major `nx` by `ny` buffer.
fn pixel_index(nx: usize, ny: usize, x: i64, y: i64) -> Option<usize> {
    let x = usize::try_from(x).ok().filter(|&x| x < nx)?;
    let y = usize::try_from(y).ok().filter(|&y| y < ny)?;
    Some(y * nx + x)
}

/// Dense row-major noise map of `ny` rows by `nx` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseMap {
    nx: usize,
    ny: usize,
    data: Vec<f64>,
}

impl NoiseMap {
    /// Wraps a row-major buffer.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `data.len() != nx * ny`.
    pub fn new(nx: usize, ny: usize, data: Vec<f64>) -> Result<Self> {
        let len = pixel_count(nx, ny)?;
        if data.len() != len {
            return Err(Error::InvalidArgument(format!(
                "noise map of {nx}x{ny} needs {len} values, got {}",
                data.len()
            )));
        }
        Ok(Self { nx, ny, data })
    }

    /// Map with the same value everywhere.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `nx * ny` overflows.
    pub fn filled(nx: usize, ny: usize, value: f64) -> Result<Self> {
        Ok(Self {
            nx,
            ny,
            data: vec![value; pixel_count(nx, ny)?],
        })
    }

    /// Map filled with the pedestal's per-pixel standard deviation.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `nx * ny` overflows.
    pub fn from_pedestal<P: Pedestal + ?Sized>(pedestal: &P, nx: usize, ny: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(pixel_count(nx, ny)?);
        for row in 0..ny {
            for col in 0..nx {
                data.push(pedestal.std(row, col));
            }
        }
        Ok(Self { nx, ny, data })
    }

    /// Number of columns.
    #[must_use]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of rows.
    #[must_use]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Noise at column `x`, row `y`; `None` outside the map.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> Option<f64> {
        pixel_index(self.nx, self.ny, x, y).map(|i| self.data[i])
    }

    /// Row-major values.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Dense row-major per-pixel gain of `ny` rows by `nx` columns.
///
/// Applying it multiplies every sample of a cluster by the gain of the pixel
/// it sits on. Sample row `r`, column `c` of a cluster with side `s` sits on
/// pixel `(x + c - s/2, y + r - s/2)`. Clusters reaching past the map are
/// zeroed.
#[derive(Debug, Clone, PartialEq)]
pub struct GainMap {
    nx: usize,
    ny: usize,
    data: Vec<f64>,
}

impl GainMap {
    /// Wraps a row-major buffer.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `data.len() != nx * ny`.
    pub fn new(nx: usize, ny: usize, data: Vec<f64>) -> Result<Self> {
        let len = pixel_count(nx, ny)?;
        if data.len() != len {
            return Err(Error::InvalidArgument(format!(
                "gain map of {nx}x{ny} needs {len} values, got {}",
                data.len()
            )));
        }
        Ok(Self { nx, ny, data })
    }

    /// Map with the same gain everywhere.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `nx * ny` overflows.
    pub fn filled(nx: usize, ny: usize, gain: f64) -> Result<Self> {
        Ok(Self {
            nx,
            ny,
            data: vec![gain; pixel_count(nx, ny)?],
        })
    }

    /// Number of columns.
    #[must_use]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of rows.
    #[must_use]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Gain at column `x`, row `y`; `None` outside the map.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> Option<f64> {
        pixel_index(self.nx, self.ny, x, y).map(|i| self.data[i])
    }

    /// Scales `cluster` in place, or zeroes it if any of its pixels lies
    /// outside the map.
    // side is at most a few pixels
    #[allow(clippy::cast_possible_wrap)]
    pub fn apply<T: Sample, const N: usize>(&self, cluster: &mut Cluster<T, N>) {
        let side = (1..=N).find(|&s| s * s >= N).unwrap_or(0);
        let half = (side / 2) as i64;
        let (x0, y0) = (i64::from(cluster.x) - half, i64::from(cluster.y) - half);

        let mut gains = [0.0; N];
        for (i, gain) in gains.iter_mut().enumerate() {
            let (row, col) = ((i / side) as i64, (i % side) as i64);
            match self.get(x0 + col, y0 + row) {
                Some(value) => *gain = value,
                None => {
                    cluster.data = [T::default(); N];
                    return;
                }
            }
        }
        for (sample, gain) in cluster.data.iter_mut().zip(gains) {
            *sample = T::from_f64(sample.to_f64() * gain);
        }
    }

    /// Applies the map to every cluster in `clusters`.
    pub fn apply_all<T: Sample, const N: usize>(&self, clusters: &mut [Cluster<T, N>]) {
        for cluster in clusters {
            self.apply(cluster);
        }
    }

    /// Row-major values.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}
