use clusterpix_core::{Cluster3x3, GainMap, NoiseMap};
use clusterpix_io::{CodecConfig, Error, LegacyClusterFile, OpenMode, Roi};
use std::path::Path;
use tempfile::TempDir;

const FRAME_SIZES: [usize; 4] = [5, 3, 0, 7];

/// Writes frames of the given sizes; cluster `i` overall sits at `x = i`.
fn write_frames(path: &Path, sizes: &[usize]) -> Vec<Cluster3x3> {
    let mut writer = LegacyClusterFile::create(path).unwrap();
    let mut all = Vec::new();
    for (frame, &size) in sizes.iter().enumerate() {
        let clusters: Vec<Cluster3x3> = (0..size)
            .map(|_| {
                let i = i16::try_from(all.len()).unwrap();
                let c = Cluster3x3::new(i, 2 * i, [i32::from(i); 9]);
                all.push(c);
                c
            })
            .collect();
        writer
            .write_frame(i32::try_from(frame).unwrap() + 100, &clusters)
            .unwrap();
    }
    writer.close().unwrap();
    all
}

#[test]
fn test_file_size() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("size.clust");
    write_frames(&path, &FRAME_SIZES);
    let len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(len, 4 * 8 + 15 * 40);
}

#[test]
fn test_read_all_at_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("all.clust");
    let written = write_frames(&path, &FRAME_SIZES);

    let mut reader = LegacyClusterFile::open(&path).unwrap();
    let clusters = reader.read_clusters(100).unwrap();
    assert_eq!(clusters, written);
    assert_eq!(reader.frame_number(), 103);
    assert!(reader.read_clusters(100).unwrap().is_empty());
}

#[test]
fn test_partial_requests_continue_in_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.clust");
    let written = write_frames(&path, &FRAME_SIZES);

    let mut reader = LegacyClusterFile::open(&path).unwrap();
    let mut clusters = reader.read_clusters(4).unwrap();
    assert_eq!(clusters.len(), 4);
    assert_eq!(reader.pending(), 1);
    clusters.extend(reader.read_clusters(100).unwrap());
    assert_eq!(clusters, written);
}

#[test]
fn test_small_requests_cross_frames() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("small.clust");
    let written = write_frames(&path, &FRAME_SIZES);

    let mut reader = LegacyClusterFile::open(&path).unwrap();
    let mut clusters = Vec::new();
    loop {
        let chunk = reader.read_clusters(2).unwrap();
        if chunk.is_empty() {
            break;
        }
        assert!(chunk.len() == 2 || clusters.len() + chunk.len() == 15);
        clusters.extend(chunk);
    }
    assert_eq!(clusters, written);
}

#[test]
fn test_read_frame() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frames.clust");
    let written = write_frames(&path, &FRAME_SIZES);

    let mut reader = LegacyClusterFile::open(&path).unwrap();
    let mut offset = 0;
    for (i, &size) in FRAME_SIZES.iter().enumerate() {
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.header.frame_number, 100 + i32::try_from(i).unwrap());
        assert_eq!(frame.header.n_clusters, i32::try_from(size).unwrap());
        assert_eq!(frame.clusters, written[offset..offset + size]);
        offset += size;
    }
    assert!(matches!(
        reader.read_frame(),
        Err(Error::EndOfStream { records: 4 })
    ));
}

#[test]
fn test_read_frame_rejects_pending_clusters() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pending.clust");
    write_frames(&path, &FRAME_SIZES);

    let mut reader = LegacyClusterFile::open(&path).unwrap();
    reader.read_clusters(2).unwrap();
    assert!(matches!(reader.read_frame(), Err(Error::InvalidArgument(_))));
    reader.read_clusters(3).unwrap();
    assert_eq!(reader.read_frame().unwrap().clusters.len(), 3);
}

#[test]
fn test_noise_cut_boundary() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cut.clust");

    let mut at_noise = [0; 9];
    at_noise[4] = 10;
    let mut above_noise = [0; 9];
    above_noise[4] = 11;
    let spread = [4, 4, 0, 4, 4, 0, 0, 0, 0];

    let mut writer = LegacyClusterFile::create(&path).unwrap();
    writer
        .write_frame(
            0,
            &[
                Cluster3x3::new(1, 1, at_noise),
                Cluster3x3::new(2, 1, above_noise),
                Cluster3x3::new(3, 1, spread),
            ],
        )
        .unwrap();
    writer
        .write_frame(
            1,
            &[
                Cluster3x3::new(-1, 1, above_noise),
                Cluster3x3::new(4, 3, above_noise),
                Cluster3x3::new(3, 2, above_noise),
            ],
        )
        .unwrap();
    writer.close().unwrap();

    let noise = NoiseMap::filled(4, 3, 10.0).unwrap();
    let mut reader = LegacyClusterFile::open(&path).unwrap();
    let kept = reader.read_clusters_with_cut(100, &noise).unwrap();
    let positions: Vec<(i16, i16)> = kept.iter().map(|c| (c.x, c.y)).collect();
    // quadrant 16 < 20 and total 16 < 30 for the spread cluster
    assert_eq!(positions, vec![(2, 1), (3, 2)]);
}

#[test]
fn test_noise_cut_counts_only_kept_clusters() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cut_count.clust");

    let mut strong = [0; 9];
    strong[4] = 50;
    let weak = [0; 9];

    let mut writer = LegacyClusterFile::create(&path).unwrap();
    writer
        .write_frame(
            0,
            &[
                Cluster3x3::new(0, 0, weak),
                Cluster3x3::new(1, 0, strong),
                Cluster3x3::new(0, 1, weak),
                Cluster3x3::new(1, 1, strong),
            ],
        )
        .unwrap();
    writer.close().unwrap();

    let noise = NoiseMap::filled(2, 2, 1.0).unwrap();
    let mut reader = LegacyClusterFile::open(&path).unwrap();
    let first = reader.read_clusters_with_cut(1, &noise).unwrap();
    assert_eq!((first[0].x, first[0].y), (1, 0));
    assert_eq!(reader.pending(), 2);
    let rest = reader.read_clusters_with_cut(5, &noise).unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!((rest[0].x, rest[0].y), (1, 1));
}

#[test]
fn test_roi_reader() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("roi.clust");
    let written = write_frames(&path, &FRAME_SIZES);

    // x = i, y = 2i: keeps i in 2..=6 with y <= 12
    let roi = Roi::new(2, 10, 0, 12);
    let mut reader = LegacyClusterFile::open(&path).unwrap();
    let clusters = reader.read_clusters_in_roi(100, roi).unwrap();
    assert_eq!(clusters, written[2..=6]);
}

#[test]
fn test_append_mode() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("append.clust");
    let mut written = write_frames(&path, &[2, 1]);

    let config = CodecConfig::default();
    let mut writer = LegacyClusterFile::open_with_mode(&path, OpenMode::Append, &config).unwrap();
    let extra = Cluster3x3::new(42, 42, [7; 9]);
    writer.write_frame(9, &[extra]).unwrap();
    drop(writer);
    written.push(extra);

    let mut reader = LegacyClusterFile::open(&path).unwrap();
    assert_eq!(reader.read_clusters(10).unwrap(), written);
    assert_eq!(reader.frame_number(), 9);
}

#[test]
fn test_open_missing_file() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        LegacyClusterFile::open(dir.path().join("missing.clust")),
        Err(Error::Io(_))
    ));
}

/// 6x6 gain map where pixel `(x, y)` has gain `1 + x + 10 * y`.
fn ramp_gain() -> GainMap {
    let data = (0..6)
        .flat_map(|y| (0..6).map(move |x| f64::from(1 + x + 10 * y)))
        .collect();
    GainMap::new(6, 6, data).unwrap()
}

#[test]
fn test_gain_map_scales_and_zeroes_edges() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gain.clust");

    let inside = Cluster3x3::new(2, 3, [2; 9]);
    let left_edge = Cluster3x3::new(0, 3, [2; 9]);
    let top_edge = Cluster3x3::new(2, 5, [2; 9]);
    let mut writer = LegacyClusterFile::create(&path).unwrap();
    writer.write_frame(0, &[inside, left_edge]).unwrap();
    writer.write_frame(1, &[top_edge]).unwrap();
    writer.close().unwrap();

    let mut reader = LegacyClusterFile::open(&path).unwrap();
    reader.set_gain_map(ramp_gain());
    let clusters = reader.read_clusters(10).unwrap();
    assert_eq!(clusters.len(), 3);
    // pixels x in 1..=3, y in 2..=4
    assert_eq!(clusters[0].data, [44, 46, 48, 64, 66, 68, 84, 86, 88]);
    assert_eq!((clusters[0].x, clusters[0].y), (2, 3));
    assert_eq!(clusters[1].data, [0; 9]);
    assert_eq!(clusters[2].data, [0; 9]);
    assert_eq!((clusters[2].x, clusters[2].y), (2, 5));
}

#[test]
fn test_gain_map_applies_to_frames_and_can_be_cleared() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gain_frames.clust");
    write_frames(&path, &[2, 2]);

    let mut reader = LegacyClusterFile::open(&path).unwrap();
    reader.set_gain_map(GainMap::filled(10, 10, 3.0).unwrap());
    assert!(reader.gain_map().is_some());
    // clusters 0 and 1 sit at (0, 0) and (1, 2): only the second is inside
    let frame = reader.read_frame().unwrap();
    assert_eq!(frame.clusters[0].data, [0; 9]);
    assert_eq!(frame.clusters[1].data, [3; 9]);

    reader.clear_gain_map();
    let frame = reader.read_frame().unwrap();
    assert_eq!(frame.clusters[0].data, [2; 9]);
    assert_eq!(frame.clusters[1].data, [3; 9]);
}

#[test]
fn test_noise_cut_sees_unscaled_samples() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gain_cut.clust");

    let mut weak = [0; 9];
    weak[4] = 5;
    let mut writer = LegacyClusterFile::create(&path).unwrap();
    writer.write_frame(0, &[Cluster3x3::new(1, 1, weak)]).unwrap();
    writer.close().unwrap();

    let mut reader = LegacyClusterFile::open(&path).unwrap();
    reader.set_gain_map(GainMap::filled(3, 3, 100.0).unwrap());
    let noise = NoiseMap::filled(3, 3, 10.0).unwrap();
    assert!(reader.read_clusters_with_cut(10, &noise).unwrap().is_empty());
}
