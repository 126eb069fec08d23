use ndarray::{s, Array2};
use tracing::warn;

/// One labelled streak box in pixel space, half-open: rows `y0..y1`,
/// columns `x0..x1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub class_id: i64,
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl PixelBox {
    pub fn area(&self) -> usize {
        (self.x1 - self.x0) * (self.y1 - self.y0)
    }
}

/// Rasterized ground truth of one frame.
#[derive(Clone, Debug)]
pub struct GroundTruth {
    pub mask: Array2<u8>,
    pub boxes: Vec<PixelBox>,
}

impl GroundTruth {
    /// Number of labelled streaks.
    pub fn num_streaks(&self) -> usize {
        self.boxes.len()
    }
}

/// Convert label text (`class x_center y_center width height` per line,
/// coordinates normalized to [0,1]) into a filled-rectangle mask of
/// `shape = (height, width)`.
///
/// Pixel coordinates truncate toward zero and the box spans
/// `center ± size/2` (integer half-size), clipped to the image. Lines with
/// fewer than five fields or unparsable numbers are skipped. `None` gives an
/// all-zero mask.
pub fn parse_ground_truth(label: Option<&str>, shape: (usize, usize)) -> GroundTruth {
    let (h, w) = shape;
    let mut mask = Array2::<u8>::zeros(shape);
    let mut boxes = Vec::new();

    for (lineno, line) in label.unwrap_or("").lines().enumerate() {
        if line.split_whitespace().next().is_none() {
            continue;
        }
        let Some(b) = parse_line(line, h, w) else {
            warn!(line = lineno + 1, "skipping malformed label line");
            continue;
        };
        if b.x1 > b.x0 && b.y1 > b.y0 {
            mask.slice_mut(s![b.y0..b.y1, b.x0..b.x1]).fill(1);
        }
        boxes.push(b);
    }

    GroundTruth { mask, boxes }
}

fn parse_line(line: &str, h: usize, w: usize) -> Option<PixelBox> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return None;
    }
    let class_id = fields[0].parse::<i64>().ok()?;
    let mut nums = [0.0f64; 4];
    for (slot, field) in nums.iter_mut().zip(&fields[1..5]) {
        *slot = field.parse::<f64>().ok().filter(|v| v.is_finite())?;
    }
    let [xc, yc, bw, bh] = nums;

    let xc_px = (xc * w as f64).trunc() as i64;
    let yc_px = (yc * h as f64).trunc() as i64;
    let half_w = (bw * w as f64).trunc() as i64 / 2;
    let half_h = (bh * h as f64).trunc() as i64 / 2;

    let clip = |v: i64, hi: usize| v.clamp(0, hi as i64) as usize;
    let x0 = clip(xc_px - half_w, w);
    let y0 = clip(yc_px - half_h, h);
    let x1 = clip(xc_px + half_w, w).max(x0);
    let y1 = clip(yc_px + half_h, h).max(y0);

    Some(PixelBox {
        class_id,
        x0,
        y0,
        x1,
        y1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_box_is_ten_by_ten() {
        let gt = parse_ground_truth(Some("0 0.5 0.5 0.1 0.1\n"), (100, 100));
        assert_eq!(gt.num_streaks(), 1);
        assert_eq!(gt.boxes[0].area(), 100);
        assert_eq!(gt.mask.iter().filter(|&&v| v > 0).count(), 100);
        assert_eq!(gt.mask[[45, 45]], 1);
        assert_eq!(gt.mask[[55, 55]], 0);
    }

    #[test]
    fn boxes_are_clipped_to_the_image() {
        let gt = parse_ground_truth(Some("0 0.0 0.0 0.2 0.2"), (50, 50));
        assert_eq!(gt.boxes[0], PixelBox { class_id: 0, x0: 0, y0: 0, x1: 5, y1: 5 });
        assert_eq!(gt.mask.iter().filter(|&&v| v > 0).count(), 25);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = "0 0.5 0.5\nnot a label at all\n\n0 0.5 0.5 0.2 0.2\n";
        let gt = parse_ground_truth(Some(text), (10, 10));
        assert_eq!(gt.num_streaks(), 1);
    }

    #[test]
    fn absent_label_gives_empty_mask() {
        let gt = parse_ground_truth(None, (8, 6));
        assert_eq!(gt.mask.dim(), (8, 6));
        assert!(gt.mask.iter().all(|&v| v == 0));
        assert_eq!(gt.num_streaks(), 0);
    }
}
