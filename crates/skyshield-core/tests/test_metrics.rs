mod common;

use common::{add_horizontal_streak, flat_image, mask_from};
use ndarray::Array2;
use skyshield_core::detection::{BaselineConfig, DetectorConfig, StreakDetector};
use skyshield_core::frame::Frame;
use skyshield_core::metrics::{
    aggregate_night, compute_frame_quality, severity_score, FrameQuality, QualityFlag,
};

fn quality_with(rows: usize, lines: usize, name: &str) -> FrameQuality {
    let data = Array2::from_shape_fn((20, 20), |(r, _)| u8::from(r < rows));
    let frame = Frame::new(flat_image(20, 20, 0.0)).with_source(name);
    compute_frame_quality(&frame, &mask_from(data, lines))
}

#[test]
fn test_severity_is_monotone() {
    let mut last = -1.0;
    for i in 0..=100 {
        let s = severity_score(i as f64 / 100.0);
        assert!(s >= last);
        assert!((0.0..=1.0).contains(&s));
        last = s;
    }
}

#[test]
fn test_empty_night_is_zeroed() {
    let night = aggregate_night(&[], "empty");
    assert_eq!(night.dataset_id, "empty");
    assert_eq!(night.n_frames, 0);
    assert_eq!(night.affected_frames, 0);
    assert_eq!(night.median_streak_area_fraction, 0.0);
    assert_eq!(night.p95_streak_area_fraction, 0.0);
    assert!(night.severity_histogram.is_empty());
}

#[test]
fn test_night_histogram_counts_every_frame() {
    let qualities = vec![
        quality_with(0, 0, "a.fits"),
        quality_with(0, 0, "b.fits"),
        quality_with(1, 1, "c.fits"),
        quality_with(20, 2, "d.fits"),
    ];
    let night = aggregate_night(&qualities, "night1");
    assert_eq!(night.n_frames, 4);
    assert_eq!(night.affected_frames, 2);
    assert_eq!(night.severity_histogram.len(), 5);
    assert_eq!(night.severity_histogram.values().sum::<usize>(), 4);
    // 1/20 of the frame: severity 0.5.
    assert_eq!(night.severity_histogram["0.4-0.6"], 1);
    // Fully masked saturates into the closed top bucket.
    assert_eq!(night.severity_histogram["0.8-1.0"], 1);
    assert_eq!(night.severity_histogram["0-0.2"], 2);
}

#[test]
fn test_detected_streak_flows_into_quality() {
    let mut img = flat_image(100, 100, 10.0);
    add_horizontal_streak(&mut img, 49, 51, 1000.0);
    let frame = Frame::new(img).with_source("/night/frame_007.fits");

    let detector = DetectorConfig::Baseline(BaselineConfig::default()).build();
    let mask = detector.detect(&frame.data);
    let q = compute_frame_quality(&frame, &mask);

    assert_eq!(q.file, "frame_007.fits");
    assert!(q.num_streaks >= 1);
    assert!(q.flags.contains(&QualityFlag::StreakDetected));
    assert!(q.streak_area_fraction > 0.0 && q.streak_area_fraction < 0.2);
    assert_eq!(q.severity_score, severity_score(q.streak_area_fraction));

    let json = serde_json::to_value(&q).unwrap();
    assert_eq!(json["detector"]["method"], "baseline_hough");
    assert_eq!(json["flags"][0], "STREAK_DETECTED");
}
