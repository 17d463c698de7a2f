//! Parallel batch helpers over cluster slices.
//!
//! Each helper maps one of the per-cluster operations over a slice with
//! rayon. Output order matches input order.

use crate::quadrant::{analyze_cluster, calculate_eta2, ClusterAnalysis, Eta2};
use crate::reduce::{reduce_to_2x2, reduce_to_3x3};
use clusterpix_core::{Cluster2x2, Cluster3x3, Cluster5x5, Sample};
use rayon::prelude::*;

/// Reduces every 5x5 cluster to its heaviest 3x3 subwindow.
#[must_use]
pub fn reduce_to_3x3_batch<T: Sample>(clusters: &[Cluster5x5<T>]) -> Vec<Cluster3x3<T>> {
    clusters.par_iter().map(reduce_to_3x3).collect()
}

/// Reduces every 3x3 cluster to its heaviest 2x2 subwindow.
#[must_use]
pub fn reduce_to_2x2_batch<T: Sample>(clusters: &[Cluster3x3<T>]) -> Vec<Cluster2x2<T>> {
    clusters.par_iter().map(reduce_to_2x2).collect()
}

/// Runs [`analyze_cluster`] on every cluster.
#[must_use]
pub fn analyze_batch<T: Sample>(clusters: &[Cluster3x3<T>]) -> Vec<ClusterAnalysis<T>> {
    clusters.par_iter().map(analyze_cluster).collect()
}

/// Runs [`calculate_eta2`] on every cluster.
#[must_use]
pub fn calculate_eta2_batch<T: Sample>(clusters: &[Cluster3x3<T>]) -> Vec<Eta2<T>> {
    clusters.par_iter().map(calculate_eta2).collect()
}
