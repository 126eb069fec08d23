use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::SEVERITY_BUCKET_EDGES;
use crate::stats::{median, percentile};

use super::frame::FrameQuality;

/// Dataset-level contamination summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NightReport {
    pub dataset_id: String,
    pub n_frames: usize,
    pub affected_frames: usize,
    pub median_streak_area_fraction: f64,
    pub p95_streak_area_fraction: f64,
    /// Frame counts per severity bucket, keyed `"lo-hi"`.
    pub severity_histogram: BTreeMap<String, usize>,
}

/// Aggregate per-frame results into a night report. An empty slice gives a
/// zeroed report with an empty histogram.
pub fn aggregate_night(qualities: &[FrameQuality], dataset_id: &str) -> NightReport {
    if qualities.is_empty() {
        return NightReport {
            dataset_id: dataset_id.to_string(),
            n_frames: 0,
            affected_frames: 0,
            median_streak_area_fraction: 0.0,
            p95_streak_area_fraction: 0.0,
            severity_histogram: BTreeMap::new(),
        };
    }

    let fractions: Vec<f64> = qualities.iter().map(|q| q.streak_area_fraction).collect();
    let affected_frames = qualities.iter().filter(|q| q.num_streaks > 0).count();

    let mut severity_histogram: BTreeMap<String, usize> = SEVERITY_BUCKET_EDGES
        .windows(2)
        .map(|w| (bucket_label(w[0], w[1]), 0))
        .collect();
    for q in qualities {
        if let Some(label) = bucket_of(q.severity_score) {
            *severity_histogram.entry(label).or_insert(0) += 1;
        }
    }

    let report = NightReport {
        dataset_id: dataset_id.to_string(),
        n_frames: qualities.len(),
        affected_frames,
        median_streak_area_fraction: median(&fractions).unwrap_or(0.0),
        p95_streak_area_fraction: percentile(&fractions, 95.0).unwrap_or(0.0),
        severity_histogram,
    };
    info!(
        dataset = dataset_id,
        frames = report.n_frames,
        affected = report.affected_frames,
        "night report aggregated"
    );
    report
}

fn bucket_label(lo: f64, hi: f64) -> String {
    format!("{lo}-{hi:.1}")
}

/// Half-open buckets except the last, which includes 1.0.
fn bucket_of(severity: f64) -> Option<String> {
    let last = SEVERITY_BUCKET_EDGES.len() - 2;
    SEVERITY_BUCKET_EDGES
        .windows(2)
        .enumerate()
        .find(|(i, w)| severity >= w[0] && (severity < w[1] || (*i == last && severity <= w[1])))
        .map(|(_, w)| bucket_label(w[0], w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_bucket_edges() {
        assert_eq!(bucket_of(0.0).as_deref(), Some("0-0.2"));
        assert_eq!(bucket_of(0.2).as_deref(), Some("0.2-0.4"));
        assert_eq!(bucket_of(0.79).as_deref(), Some("0.6-0.8"));
        assert_eq!(bucket_of(1.0).as_deref(), Some("0.8-1.0"));
        assert_eq!(bucket_of(1.5), None);
    }
}
