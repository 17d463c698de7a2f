use approx::assert_relative_eq;
use clusterpix_algorithms::{
    analyze_cluster, max_subwindow, reduce_to_2x2, reduce_to_3x3, Cluster3x3, Cluster5x5, Corner,
};

fn sample_5x5() -> [i32; 25] {
    [
        1, 1, 1, 1, 1, //
        1, 1, 2, 1, 1, //
        1, 2, 3, 1, 2, //
        1, 1, 1, 1, 2, //
        0, 0, 0, 0, 0,
    ]
}

#[test]
fn test_reduce_5x5_sample() {
    let data = sample_5x5();
    let best = max_subwindow(&data, 5, 3).unwrap();
    assert_eq!(best.index, 5);
    assert_eq!(best.sum, 14);

    let reduced = reduce_to_3x3(&Cluster5x5::new(10, 20, data));
    assert_eq!((reduced.x, reduced.y), (11, 20));
    assert_eq!(reduced.data, [2, 1, 1, 3, 1, 2, 1, 1, 2]);
}

#[test]
fn test_reduce_all_ones_goes_top_left() {
    let reduced = reduce_to_3x3(&Cluster5x5::new(10, 20, [1; 25]));
    assert_eq!((reduced.x, reduced.y), (9, 21));
    assert_eq!(reduced.data, [1; 9]);
}

#[test]
fn test_reduce_chain_keeps_heaviest_pixels() {
    let mut data = [0.0f32; 25];
    data[18] = 8.0;
    data[19] = 4.0;
    data[23] = 2.0;
    let three = reduce_to_3x3(&Cluster5x5::<f32>::new(0, 0, data));
    // bottom-right 3x3 window
    assert_eq!((three.x, three.y), (1, -1));
    assert_relative_eq!(three.data.iter().sum::<f32>(), 14.0);

    let two = reduce_to_2x2(&three);
    assert_relative_eq!(two.data.iter().sum::<f32>(), 14.0);
}

#[test]
fn test_analysis_of_reduced_cluster() {
    let reduced: Cluster3x3 = reduce_to_3x3(&Cluster5x5::new(10, 20, sample_5x5()));
    let analysis = analyze_cluster(&reduced);
    // quadrants: [7, 5, 6, 6]
    assert_eq!(analysis.corner, Corner::BottomLeft);
    assert_eq!(analysis.t2max, 7);
    assert_eq!(analysis.t3, 14);
    assert_relative_eq!(analysis.eta2x, 1.0 / 4.0);
    assert_relative_eq!(analysis.eta2y, 1.0 / 2.0);
    assert_relative_eq!(analysis.eta3x, -1.0 / 6.0);
    assert_relative_eq!(analysis.eta3y, 0.0);
}
