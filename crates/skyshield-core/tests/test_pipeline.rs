mod common;

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::{add_horizontal_streak, add_noise, flat_image, observing_header, write_frame};
use skyshield_core::detection::{BaselineConfig, DetectorConfig};
use skyshield_core::error::SkyShieldError;
use skyshield_core::pipeline::{
    list_frames, run_on_folder, run_on_folder_quiet, FrameOutcome, PipelineConfig, PipelineStage,
    ProgressReporter,
};
use skyshield_core::skyglow::OdcOutcome;

fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.detection = DetectorConfig::Baseline(BaselineConfig {
        line_width: 5.0,
        ..Default::default()
    });
    config.odc.bootstrap_samples = 20;
    config
}

/// A night of four frames: two clean, one streaked, one unreadable, plus a
/// mask product and a text file the runner must ignore.
fn night_folder(root: &std::path::Path) {
    fs::create_dir_all(root).unwrap();
    let header = observing_header("2024-03-10T03:00:00");
    for (i, level) in [100.0f32, 104.0].iter().enumerate() {
        let mut img = flat_image(64, 64, *level);
        add_noise(&mut img, 1.0, i as u64);
        write_frame(root, &format!("frame_{i:03}.fits"), &img, Some(&header));
    }
    let mut streaked = flat_image(100, 100, 10.0);
    add_horizontal_streak(&mut streaked, 49, 51, 1000.0);
    write_frame(root, "frame_002.fits", &streaked, Some(&header));

    fs::write(root.join("frame_003.fits"), vec![b'x'; 3000]).unwrap();
    write_frame(root, "frame_000_mask.fits", &flat_image(8, 8, 0.0), None);
    fs::write(root.join("notes.txt"), "clear night").unwrap();
}

// ---------------------------------------------------------------------------
// Frame listing
// ---------------------------------------------------------------------------

#[test]
fn test_list_frames_skips_products() {
    let dir = tempfile::tempdir().unwrap();
    night_folder(dir.path());
    let names: Vec<String> = list_frames(dir.path())
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["frame_000.fits", "frame_001.fits", "frame_002.fits", "frame_003.fits"]
    );
}

#[test]
fn test_missing_input_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_on_folder_quiet(&test_config(), &dir.path().join("nope"), dir.path()).unwrap_err();
    assert!(matches!(err, SkyShieldError::NotFound(_)));
}

// ---------------------------------------------------------------------------
// Folder runs
// ---------------------------------------------------------------------------

#[test]
fn test_folder_run_writes_products() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("night_2024_03_10");
    let output = dir.path().join("out");
    night_folder(&input);

    let report = run_on_folder_quiet(&test_config(), &input, &output).unwrap();

    assert_eq!(report.frames.len(), 4);
    assert_eq!(report.processed(), 3);
    let failed: Vec<&FrameOutcome> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].file(), "frame_003.fits");

    for stem in ["frame_000", "frame_001", "frame_002"] {
        assert!(output.join(format!("masks/{stem}_mask.fits")).is_file());
        assert!(output.join(format!("quality/{stem}_quality.json")).is_file());
        assert!(!output.join(format!("masks/{stem}_mask.png")).exists());
    }
    assert!(!output.join("quality/frame_003_quality.json").exists());

    assert_eq!(report.night.dataset_id, "night_2024_03_10");
    assert_eq!(report.night.n_frames, 3);
    assert_eq!(report.night.affected_frames, 1);

    let night: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join("night_summary.json")).unwrap())
            .unwrap();
    assert_eq!(night["n_frames"], 3);

    let odc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join("odc_report.json")).unwrap())
            .unwrap();
    assert_eq!(odc["dataset_id"], "night_2024_03_10");
    assert_eq!(odc["status"], "estimated");
    assert_eq!(odc["n_frames"], 3);
    assert_eq!(odc["method"], "physical_with_percentile_fallback");

    let result = report.odc.result().unwrap();
    assert!(result.odc_percent >= 0.0);
    assert!(result.odc_ci95[0] <= result.odc_ci95[1]);
}

#[test]
fn test_quality_json_matches_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    night_folder(&input);
    let report = run_on_folder_quiet(&test_config(), &input, &output).unwrap();

    let streaked = report
        .frames
        .iter()
        .find_map(|f| match f {
            FrameOutcome::Processed { file, quality } if file == "frame_002.fits" => Some(quality),
            _ => None,
        })
        .unwrap();
    assert!(streaked.num_streaks >= 1);

    let json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(output.join("quality/frame_002_quality.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(json["file"], "frame_002.fits");
    assert_eq!(json["timestamp_utc"], "2024-03-10T03:00:00");
    assert_eq!(json["num_streaks"], streaked.num_streaks);
}

#[test]
fn test_empty_folder_has_no_valid_data() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty");
    fs::create_dir_all(&input).unwrap();
    let report = run_on_folder_quiet(&test_config(), &input, &dir.path().join("out")).unwrap();
    assert!(report.frames.is_empty());
    assert_eq!(report.night.n_frames, 0);
    assert_eq!(report.odc, OdcOutcome::NoValidData { frames_seen: 0 });
}

#[test]
fn test_output_switches() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    night_folder(&input);

    let mut config = test_config();
    config.output.write_masks = false;
    config.output.write_quality = false;
    config.output.mask_png = true;
    run_on_folder_quiet(&config, &input, &output).unwrap();

    assert!(output.join("masks/frame_000_mask.png").is_file());
    assert!(!output.join("masks/frame_000_mask.fits").exists());
    assert!(!output.join("quality").exists());
    assert!(output.join("odc_report.json").is_file());
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<PipelineStage>>,
    advanced: AtomicUsize,
}

impl ProgressReporter for Recorder {
    fn begin_stage(&self, stage: PipelineStage, _total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
    }

    fn advance(&self, _items_done: usize) {
        self.advanced.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn test_reporter_sees_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    night_folder(&input);

    let recorder = Arc::new(Recorder::default());
    run_on_folder(&test_config(), &input, &dir.path().join("out"), recorder.clone()).unwrap();

    assert_eq!(
        *recorder.stages.lock().unwrap(),
        vec![
            PipelineStage::Detecting,
            PipelineStage::Aggregating,
            PipelineStage::EstimatingOdc,
            PipelineStage::Writing,
        ]
    );
    // Four frames plus two report files.
    assert_eq!(recorder.advanced.load(Ordering::Relaxed), 6);
}
