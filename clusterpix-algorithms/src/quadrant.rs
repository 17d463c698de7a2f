//! Quadrant classification and eta interpolation for 3x3 clusters.
//!
//! Sample indices follow `row * 3 + col` with row 0 at the bottom of the
//! quadrant picture:
//!
//! ```text
//!  6 7 8
//!  3 4 5
//!  0 1 2
//! ```
//!
//! The four 2x2 quadrants all share the center sample 4. Eta values are
//! computed in `f64` and are `0.0` whenever their own denominator is zero.

use clusterpix_core::{Cluster2x2, Cluster3x3, Sample};

/// The 2x2 quadrant of a 3x3 cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    /// Samples 0, 1, 3, 4.
    BottomLeft,
    /// Samples 1, 2, 4, 5.
    BottomRight,
    /// Samples 3, 4, 6, 7.
    TopLeft,
    /// Samples 4, 5, 7, 8.
    TopRight,
}

impl Corner {
    /// All corners in tie-breaking order.
    pub const ALL: [Corner; 4] = [
        Corner::BottomLeft,
        Corner::BottomRight,
        Corner::TopLeft,
        Corner::TopRight,
    ];

    /// Sample indices of this quadrant.
    #[must_use]
    pub const fn indices(self) -> [usize; 4] {
        match self {
            Corner::BottomLeft => [0, 1, 3, 4],
            Corner::BottomRight => [1, 2, 4, 5],
            Corner::TopLeft => [3, 4, 6, 7],
            Corner::TopRight => [4, 5, 7, 8],
        }
    }
}

/// Result of [`analyze_data`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterAnalysis<T> {
    /// Largest quadrant sum.
    pub t2max: T,
    /// Quadrant holding `t2max`.
    pub corner: Corner,
    /// Sum of all nine samples.
    pub t3: T,
    /// Horizontal eta within the winning quadrant.
    pub eta2x: f64,
    /// Vertical eta within the winning quadrant.
    pub eta2y: f64,
    /// Horizontal eta across the middle row.
    pub eta3x: f64,
    /// Vertical eta across the middle column.
    pub eta3y: f64,
}

/// Eta pair together with the quadrant it was measured in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eta2<T> {
    /// Horizontal eta.
    pub x: f64,
    /// Vertical eta.
    pub y: f64,
    /// Quadrant the etas refer to.
    pub corner: Corner,
    /// Sum of the quadrant.
    pub sum: T,
}

#[allow(clippy::float_cmp)]
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Sums of the four quadrants, in [`Corner::ALL`] order.
#[must_use]
pub fn quadrant_sums<T: Sample>(data: &[T; 9]) -> [T; 4] {
    Corner::ALL.map(|corner| {
        corner
            .indices()
            .iter()
            .fold(T::default(), |acc, &i| acc + data[i])
    })
}

/// Largest quadrant sum and its corner. Ties go to the earliest corner in
/// [`Corner::ALL`] order.
#[must_use]
pub fn max_sum_2x2<T: Sample>(data: &[T; 9]) -> (T, Corner) {
    let sums = quadrant_sums(data);
    let mut best = (sums[0], Corner::BottomLeft);
    for (&sum, corner) in sums.iter().zip(Corner::ALL).skip(1) {
        if sum > best.0 {
            best = (sum, corner);
        }
    }
    best
}

/// Eta pair inside `corner`. The vertical eta of the bottom quadrants uses
/// samples 1 and 4 and the horizontal eta of the left quadrants uses 3 and 4.
fn eta2_in<T: Sample>(data: &[T; 9], corner: Corner) -> (f64, f64) {
    let d = data.map(Sample::to_f64);
    match corner {
        Corner::BottomLeft => (ratio(d[4], d[3] + d[4]), ratio(d[4], d[1] + d[4])),
        Corner::BottomRight => (ratio(d[5], d[4] + d[5]), ratio(d[4], d[1] + d[4])),
        Corner::TopLeft => (ratio(d[4], d[3] + d[4]), ratio(d[7], d[7] + d[4])),
        Corner::TopRight => (ratio(d[5], d[5] + d[4]), ratio(d[7], d[7] + d[4])),
    }
}

/// Classifies a 3x3 sample buffer: best quadrant, total sum and the eta
/// values.
#[must_use]
pub fn analyze_data<T: Sample>(data: &[T; 9]) -> ClusterAnalysis<T> {
    let (t2max, corner) = max_sum_2x2(data);
    let t3 = data.iter().fold(T::default(), |acc, &value| acc + value);
    let (eta2x, eta2y) = eta2_in(data, corner);

    let d = data.map(Sample::to_f64);
    ClusterAnalysis {
        t2max,
        corner,
        t3,
        eta2x,
        eta2y,
        eta3x: ratio(d[5] - d[3], d[3] + d[4] + d[5]),
        eta3y: ratio(d[7] - d[1], d[1] + d[4] + d[7]),
    }
}

/// [`analyze_data`] on a cluster's samples.
#[must_use]
pub fn analyze_cluster<T: Sample>(cluster: &Cluster3x3<T>) -> ClusterAnalysis<T> {
    analyze_data(&cluster.data)
}

/// Eta pair of the heaviest quadrant of a 3x3 cluster.
#[must_use]
pub fn calculate_eta2<T: Sample>(cluster: &Cluster3x3<T>) -> Eta2<T> {
    let (sum, corner) = max_sum_2x2(&cluster.data);
    let (x, y) = eta2_in(&cluster.data, corner);
    Eta2 { x, y, corner, sum }
}

/// Eta pair of a 2x2 cluster, taken relative to its bottom-left sample.
#[must_use]
pub fn calculate_eta2_2x2<T: Sample>(cluster: &Cluster2x2<T>) -> Eta2<T> {
    let [d0, d1, d2, d3] = cluster.data;
    let (f0, f1, f2) = (d0.to_f64(), d1.to_f64(), d2.to_f64());
    Eta2 {
        x: ratio(f1, f0 + f1),
        y: ratio(f2, f0 + f2),
        corner: Corner::BottomLeft,
        sum: d0 + d1 + d2 + d3,
    }
}

/// Signal cut on a 3x3 buffer: keeps clusters whose center, best quadrant
/// or total clear 1, 2 or 3 times `noise`.
#[must_use]
pub fn passes_noise_cut<T: Sample>(data: &[T; 9], noise: f64) -> bool {
    let (t2max, _) = max_sum_2x2(data);
    let t3 = data.iter().fold(T::default(), |acc, &value| acc + value);
    data[4].to_f64() > noise || t2max.to_f64() > 2.0 * noise || t3.to_f64() > 3.0 * noise
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadrant_sums() {
        let data = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        assert_eq!(quadrant_sums(&data), [12, 16, 24, 28]);
        assert_eq!(max_sum_2x2(&data), (28, Corner::TopRight));
    }

    #[test]
    fn test_single_hit_ties_to_bottom_left() {
        let data = [0, 0, 0, 0, 10, 0, 0, 0, 0];
        let analysis = analyze_data(&data);
        assert_eq!(analysis.corner, Corner::BottomLeft);
        assert_eq!(analysis.t2max, 10);
        assert_eq!(analysis.t3, 10);
        assert_relative_eq!(analysis.eta2x, 1.0);
        assert_relative_eq!(analysis.eta2y, 1.0);
        assert_relative_eq!(analysis.eta3x, 0.0);
        assert_relative_eq!(analysis.eta3y, 0.0);
    }

    #[test]
    fn test_zero_cluster_has_zero_etas() {
        let analysis = analyze_data(&[0u16; 9]);
        assert_eq!(analysis.corner, Corner::BottomLeft);
        assert_eq!(analysis.t3, 0);
        for eta in [analysis.eta2x, analysis.eta2y, analysis.eta3x, analysis.eta3y] {
            assert_relative_eq!(eta, 0.0);
        }
    }

    #[test]
    fn test_eta_table_per_corner() {
        // top-right heaviest
        let data = [0.0, 1.0, 0.0, 1.0, 4.0, 3.0, 0.0, 2.0, 1.0];
        let analysis = analyze_data(&data);
        assert_eq!(analysis.corner, Corner::TopRight);
        assert_relative_eq!(analysis.t2max, 10.0);
        assert_relative_eq!(analysis.eta2x, 3.0 / 7.0);
        assert_relative_eq!(analysis.eta2y, 2.0 / 6.0);
        assert_relative_eq!(analysis.eta3x, 2.0 / 8.0);
        assert_relative_eq!(analysis.eta3y, 1.0 / 7.0);

        // bottom-right heaviest: vertical eta uses samples 1 and 4
        let data = [0, 3, 5, 0, 4, 6, 0, 0, 0];
        let analysis = analyze_data(&data);
        assert_eq!(analysis.corner, Corner::BottomRight);
        assert_relative_eq!(analysis.eta2x, 6.0 / 10.0);
        assert_relative_eq!(analysis.eta2y, 4.0 / 7.0);

        // top-left heaviest
        let data = [0, 0, 0, 5, 4, 0, 3, 6, 0];
        let analysis = analyze_data(&data);
        assert_eq!(analysis.corner, Corner::TopLeft);
        assert_relative_eq!(analysis.eta2x, 4.0 / 9.0);
        assert_relative_eq!(analysis.eta2y, 6.0 / 10.0);
    }

    #[test]
    fn test_calculate_eta2() {
        let cluster = Cluster3x3::new(0, 0, [0, 3, 5, 0, 4, 6, 0, 0, 0]);
        let eta = calculate_eta2(&cluster);
        assert_eq!(eta.corner, Corner::BottomRight);
        assert_eq!(eta.sum, 18);
        assert_relative_eq!(eta.x, 0.6);

        let eta = calculate_eta2_2x2(&Cluster2x2::new(0, 0, [2, 6, 2, 0]));
        assert_eq!(eta.corner, Corner::BottomLeft);
        assert_eq!(eta.sum, 10);
        assert_relative_eq!(eta.x, 0.75);
        assert_relative_eq!(eta.y, 0.5);
    }

    #[test]
    fn test_noise_cut_thresholds() {
        let center_only = [0, 0, 0, 0, 5, 0, 0, 0, 0];
        assert!(!passes_noise_cut(&center_only, 5.0));
        assert!(passes_noise_cut(&center_only, 4.9));

        // center below noise but quadrant above 2x noise
        let spread = [0, 0, 0, 3, 3, 0, 3, 3, 0];
        assert!(passes_noise_cut(&spread, 5.0));
        assert!(!passes_noise_cut(&spread, 6.0));
    }
}
