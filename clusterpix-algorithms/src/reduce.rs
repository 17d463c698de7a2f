//! Re-centering reduction of square clusters.
//!
//! Among all contiguous subwindows of the target size, the one with the
//! largest sample sum is kept and the cluster center is moved onto it.
//! Ties go to the first subwindow in row-major order.

use clusterpix_core::{Cluster, Cluster2x2, Cluster3x3, Cluster5x5, Sample};

/// Center shift `(dx, dy)` per winning 3x3 subwindow of a 5x5 cluster.
///
/// Rows are stored top first while `y` grows upward, so a subwindow in an
/// upper row moves the center to `y + 1`.
const OFFSETS_5X5_TO_3X3: [(i16, i16); 9] = [
    (-1, 1),
    (0, 1),
    (1, 1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Anchor shift `(dx, dy)` per winning 2x2 subwindow of a 3x3 cluster.
const OFFSETS_3X3_TO_2X2: [(i16, i16); 4] = [(-1, 1), (0, 1), (-1, 0), (0, 0)];

/// Position and sum of the heaviest subwindow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubwindowMax<T> {
    /// Row-major index of the subwindow among all candidates.
    pub index: usize,
    /// Sum of its samples.
    pub sum: T,
}

/// Sum of the `sub` x `sub` window whose top-left sample is `(row, col)`.
fn window_sum<T: Sample>(data: &[T], side: usize, sub: usize, row: usize, col: usize) -> T {
    let mut sum = T::default();
    for r in row..row + sub {
        for &value in &data[r * side + col..r * side + col + sub] {
            sum = sum + value;
        }
    }
    sum
}

/// Finds the `sub` x `sub` subwindow of a `side` x `side` buffer with the
/// largest sum. Candidates are enumerated row-major by their top-left
/// sample; the first maximum wins.
///
/// Returns `None` if `sub` is 0 or larger than `side`, or if `data` is
/// shorter than `side * side`.
#[must_use]
pub fn max_subwindow<T: Sample>(data: &[T], side: usize, sub: usize) -> Option<SubwindowMax<T>> {
    let fits = sub > 0 && sub <= side && side.checked_mul(side).is_some_and(|n| data.len() >= n);
    fits.then(|| best_subwindow(data, side, sub))
}

/// Arg-max over all subwindows. Sizes must already be valid.
fn best_subwindow<T: Sample>(data: &[T], side: usize, sub: usize) -> SubwindowMax<T> {
    let span = side - sub + 1;
    let mut best = SubwindowMax {
        index: 0,
        sum: window_sum(data, side, sub, 0, 0),
    };
    for index in 1..span * span {
        let sum = window_sum(data, side, sub, index / span, index % span);
        if sum > best.sum {
            best = SubwindowMax { index, sum };
        }
    }
    best
}

/// Copies the `sub` x `sub` window at candidate `index` out of `data`.
fn extract<T: Sample, const N: usize>(data: &[T], side: usize, sub: usize, index: usize) -> [T; N] {
    let span = side - sub + 1;
    let (row, col) = (index / span, index % span);
    let mut out = [T::default(); N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = data[(row + i / sub) * side + col + i % sub];
    }
    out
}

/// Reduces a 5x5 cluster to the 3x3 subwindow with the largest sum.
#[must_use]
pub fn reduce_to_3x3<T: Sample>(cluster: &Cluster5x5<T>) -> Cluster3x3<T> {
    let best = best_subwindow(&cluster.data, 5, 3);
    let (dx, dy) = OFFSETS_5X5_TO_3X3[best.index];
    Cluster::new(
        cluster.x.wrapping_add(dx),
        cluster.y.wrapping_add(dy),
        extract(&cluster.data, 5, 3, best.index),
    )
}

/// Reduces a 3x3 cluster to the 2x2 subwindow with the largest sum.
#[must_use]
pub fn reduce_to_2x2<T: Sample>(cluster: &Cluster3x3<T>) -> Cluster2x2<T> {
    let best = best_subwindow(&cluster.data, 3, 2);
    let (dx, dy) = OFFSETS_3X3_TO_2X2[best.index];
    Cluster::new(
        cluster.x.wrapping_add(dx),
        cluster.y.wrapping_add(dy),
        extract(&cluster.data, 3, 2, best.index),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_subwindow_first_wins_ties() {
        let data = [1i32; 25];
        let best = max_subwindow(&data, 5, 3);
        assert_eq!(best, Some(SubwindowMax { index: 0, sum: 9 }));
    }

    #[test]
    fn test_max_subwindow_rejects_bad_sizes() {
        let data = [1i32; 9];
        assert_eq!(max_subwindow(&data, 3, 0), None);
        assert_eq!(max_subwindow(&data, 3, 4), None);
        assert_eq!(max_subwindow(&data, 4, 2), None);
        assert_eq!(max_subwindow(&data, usize::MAX, 2), None);
        assert_eq!(
            max_subwindow(&data, 3, 3),
            Some(SubwindowMax { index: 0, sum: 9 })
        );
    }

    #[test]
    fn test_reduce_to_2x2_picks_heaviest_corner() {
        let cluster = Cluster3x3::new(5, 5, [1, 1, 1, 2, 3, 1, 2, 2, 1]);
        let reduced = reduce_to_2x2(&cluster);
        // sums: [7, 6, 9, 7] -> bottom-left window of the stored grid
        assert_eq!(reduced.data, [2, 3, 2, 2]);
        assert_eq!((reduced.x, reduced.y), (4, 5));

        let cluster = Cluster3x3::new(5, 5, [2, 2, 1, 2, 3, 1, 1, 1, 1]);
        let reduced = reduce_to_2x2(&cluster);
        assert_eq!(reduced.data, [2, 2, 2, 3]);
        assert_eq!((reduced.x, reduced.y), (4, 6));
    }

    #[test]
    fn test_reduce_centered_window_keeps_center() {
        let mut data = [0u16; 25];
        data[12] = 10;
        let reduced = reduce_to_3x3(&Cluster5x5::<u16>::new(20, 30, data));
        // all windows containing the center tie, index 0 wins
        assert_eq!((reduced.x, reduced.y), (19, 31));

        // only the centered window holds all four corners
        let mut data = [0.0f64; 25];
        for i in [6, 8, 16, 18] {
            data[i] = 1.5;
        }
        let reduced = reduce_to_3x3(&Cluster5x5::<f64>::new(20, 30, data));
        assert_eq!((reduced.x, reduced.y), (20, 30));
        assert_eq!(reduced.data, [1.5, 0.0, 1.5, 0.0, 0.0, 0.0, 1.5, 0.0, 1.5]);
    }
}
