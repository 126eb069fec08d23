use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyShieldError};
use crate::stats::{mean_stddev_slice, median};

/// Exact pixel confusion counts plus the derived scores.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Evaluation of one frame against its ground truth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionMetrics {
    pub iou: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub num_gt_streaks: usize,
    pub num_pred_streaks: usize,
}

/// Dataset-level scores. `mean_*`/`median_iou`/`std_iou` are per-frame
/// (macro) statistics; `global_*` come from summed counts (micro).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub num_frames: usize,
    pub mean_iou: f64,
    pub std_iou: f64,
    pub median_iou: f64,
    pub mean_precision: f64,
    pub mean_recall: f64,
    pub mean_f1: f64,
    pub global_precision: f64,
    pub global_recall: f64,
    pub global_f1: f64,
    pub total_tp: usize,
    pub total_fp: usize,
    pub total_fn: usize,
}

fn check_shapes(pred: &Array2<u8>, gt: &Array2<u8>) -> Result<()> {
    if pred.dim() != gt.dim() {
        return Err(SkyShieldError::ShapeMismatch {
            pred: pred.dim(),
            truth: gt.dim(),
        });
    }
    Ok(())
}

/// Intersection over union of the nonzero pixels. Two empty masks agree
/// perfectly (1.0). Masks of different shapes are an error.
pub fn compute_iou(pred: &Array2<u8>, gt: &Array2<u8>) -> Result<f64> {
    check_shapes(pred, gt)?;
    let (mut inter, mut union) = (0usize, 0usize);
    Zip::from(pred).and(gt).for_each(|&p, &g| {
        let (p, g) = (p > 0, g > 0);
        inter += usize::from(p && g);
        union += usize::from(p || g);
    });
    if union == 0 {
        return Ok(1.0);
    }
    Ok(inter as f64 / union as f64)
}

pub fn compute_pixel_metrics(pred: &Array2<u8>, gt: &Array2<u8>) -> Result<PixelMetrics> {
    check_shapes(pred, gt)?;
    let mut counts = [0usize; 4];
    Zip::from(pred).and(gt).for_each(|&p, &g| {
        let idx = match (p > 0, g > 0) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };
        counts[idx] += 1;
    });
    let [tp, fp, fn_, tn] = counts;
    let (precision, recall, f1_score) = scores(tp, fp, fn_);

    Ok(PixelMetrics {
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_,
        true_negatives: tn,
        precision,
        recall,
        f1_score,
    })
}

/// Precision, recall and F1 from confusion counts, each 0 when undefined.
fn scores(tp: usize, fp: usize, fn_: usize) -> (f64, f64, f64) {
    let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    (precision, recall, f1)
}

pub fn evaluate_frame(
    pred: &Array2<u8>,
    gt: &Array2<u8>,
    num_gt_streaks: usize,
    num_pred_streaks: usize,
) -> Result<DetectionMetrics> {
    let pixel = compute_pixel_metrics(pred, gt)?;
    Ok(DetectionMetrics {
        iou: compute_iou(pred, gt)?,
        precision: pixel.precision,
        recall: pixel.recall,
        f1_score: pixel.f1_score,
        true_positives: pixel.true_positives,
        false_positives: pixel.false_positives,
        false_negatives: pixel.false_negatives,
        num_gt_streaks,
        num_pred_streaks,
    })
}

/// Macro and micro statistics over frames. Empty input gives an all-zero
/// summary.
pub fn aggregate(metrics: &[DetectionMetrics]) -> ValidationSummary {
    if metrics.is_empty() {
        return ValidationSummary::default();
    }
    let n = metrics.len() as f64;
    let mean_of = |f: fn(&DetectionMetrics) -> f64| metrics.iter().map(f).sum::<f64>() / n;

    let ious: Vec<f64> = metrics.iter().map(|m| m.iou).collect();
    let (mean_iou, std_iou) = mean_stddev_slice(&ious);

    let total_tp = metrics.iter().map(|m| m.true_positives).sum();
    let total_fp = metrics.iter().map(|m| m.false_positives).sum();
    let total_fn = metrics.iter().map(|m| m.false_negatives).sum();
    let (global_precision, global_recall, global_f1) = scores(total_tp, total_fp, total_fn);

    ValidationSummary {
        num_frames: metrics.len(),
        mean_iou,
        std_iou,
        median_iou: median(&ious).unwrap_or(0.0),
        mean_precision: mean_of(|m| m.precision),
        mean_recall: mean_of(|m| m.recall),
        mean_f1: mean_of(|m| m.f1_score),
        global_precision,
        global_recall,
        global_f1,
        total_tp,
        total_fp,
        total_fn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(r0: usize, r1: usize) -> Array2<u8> {
        Array2::from_shape_fn((10, 10), |(r, _)| u8::from((r0..r1).contains(&r)))
    }

    #[test]
    fn iou_special_cases() {
        let zero = Array2::<u8>::zeros((10, 10));
        assert_eq!(compute_iou(&zero, &zero).unwrap(), 1.0);
        assert_eq!(compute_iou(&zero, &block(0, 2)).unwrap(), 0.0);
        assert_eq!(compute_iou(&block(0, 2), &zero).unwrap(), 0.0);
        assert_eq!(compute_iou(&block(0, 4), &block(0, 4)).unwrap(), 1.0);
    }

    #[test]
    fn iou_counts_any_nonzero_value() {
        let a = block(0, 4).mapv(|v| v * 255);
        assert_eq!(compute_iou(&a, &block(2, 6)).unwrap(), 20.0 / 60.0);
    }

    #[test]
    fn pixel_counts_partition_the_image() {
        let m = compute_pixel_metrics(&block(0, 4), &block(2, 6)).unwrap();
        assert_eq!(m.true_positives, 20);
        assert_eq!(m.false_positives, 20);
        assert_eq!(m.false_negatives, 20);
        assert_eq!(m.true_negatives, 40);
        assert_eq!(m.precision, 0.5);
        assert_eq!(m.recall, 0.5);
        assert_eq!(m.f1_score, 0.5);
    }

    #[test]
    fn undefined_scores_are_zero() {
        let zero = Array2::<u8>::zeros((10, 10));
        let m = compute_pixel_metrics(&zero, &zero).unwrap();
        assert_eq!((m.precision, m.recall, m.f1_score), (0.0, 0.0, 0.0));
        assert_eq!(m.true_negatives, 100);
    }

    #[test]
    fn macro_and_micro_differ() {
        // Frame A: tiny perfect detection. Frame B: large miss.
        let a = evaluate_frame(&block(0, 1), &block(0, 1), 1, 1).unwrap();
        let b = evaluate_frame(&Array2::zeros((10, 10)), &block(0, 9), 1, 0).unwrap();
        let s = aggregate(&[a, b]);

        assert_eq!(s.num_frames, 2);
        assert_eq!(s.mean_recall, 0.5);
        assert_eq!(s.total_tp, 10);
        assert_eq!(s.total_fn, 90);
        assert!((s.global_recall - 0.1).abs() < 1e-12);
        assert_eq!(s.global_precision, 1.0);
        assert_eq!(s.median_iou, 0.5);
        assert_eq!(s.std_iou, 0.5);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let small = Array2::<u8>::zeros((4, 10));
        for err in [
            compute_iou(&small, &block(0, 2)).unwrap_err(),
            compute_pixel_metrics(&block(0, 2), &small).unwrap_err(),
            evaluate_frame(&small, &block(0, 2), 1, 0).unwrap_err(),
        ] {
            assert!(matches!(err, SkyShieldError::ShapeMismatch { .. }), "{err}");
        }
        match compute_iou(&small, &block(0, 2)) {
            Err(SkyShieldError::ShapeMismatch { pred, truth }) => {
                assert_eq!(pred, (4, 10));
                assert_eq!(truth, (10, 10));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_aggregate_is_zeroed() {
        assert_eq!(aggregate(&[]), ValidationSummary::default());
    }
}
