//! clusterpix-algorithms: Geometry algorithms on fixed-size clusters.
//!
//! This crate provides:
//! - **Reduction** - re-centering 5x5 to 3x3 and 3x3 to 2x2 on the heaviest subwindow
//! - **Quadrant analysis** - best 2x2 quadrant, totals and eta interpolation
//! - **Noise cut** - the signal cut applied while reading legacy files
//! - **Batch** - rayon-parallel versions of the per-cluster operations
//!
#![warn(missing_docs)]

mod batch;
mod quadrant;
mod reduce;

pub use batch::{analyze_batch, calculate_eta2_batch, reduce_to_2x2_batch, reduce_to_3x3_batch};
pub use quadrant::{
    analyze_cluster, analyze_data, calculate_eta2, calculate_eta2_2x2, max_sum_2x2,
    passes_noise_cut, quadrant_sums, ClusterAnalysis, Corner, Eta2,
};
pub use reduce::{max_subwindow, reduce_to_2x2, reduce_to_3x3, SubwindowMax};

// Re-export the cluster types the algorithms operate on
pub use clusterpix_core::{Cluster2x2, Cluster3x3, Cluster5x5, Sample};
