use std::f64::consts::PI;

use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::{HOUGH_ANGLE_BINS, HOUGH_MIN_ANGLE, HOUGH_MIN_DISTANCE};

use super::DetectionError;

/// Straight-line Hough accumulator in normal form `x*cos(t) + y*sin(t) = d`,
/// with `x` the column and `y` the row of a pixel.
///
/// Rows of `votes` index distance (`d = index - offset`), columns index angle.
#[derive(Clone, Debug)]
pub struct HoughAccumulator {
    pub votes: Array2<u32>,
    /// Angle of each column, in radians, evenly spaced over [-pi/2, pi/2).
    pub angles: Vec<f64>,
    /// Distance offset: row index `offset` is `d = 0`.
    pub offset: usize,
}

impl HoughAccumulator {
    pub fn max_votes(&self) -> u32 {
        self.votes.iter().copied().max().unwrap_or(0)
    }

    fn distance_of(&self, index: usize) -> f64 {
        index as f64 - self.offset as f64
    }
}

/// An accepted accumulator peak.
#[derive(Clone, Debug, PartialEq)]
pub struct HoughLine {
    pub angle: f64,
    pub distance: f64,
    pub votes: u32,
}

/// Vote every edge pixel into the accumulator. Angles are processed in
/// parallel; each angle column is independent.
pub fn hough_line(edges: &Array2<bool>) -> Result<HoughAccumulator, DetectionError> {
    let (h, w) = edges.dim();
    if h == 0 || w == 0 {
        return Err(DetectionError::DegenerateImage { rows: h, cols: w });
    }

    let offset = ((h * h + w * w) as f64).sqrt().ceil() as usize;
    let n_dist = 2 * offset + 1;
    let angles: Vec<f64> = (0..HOUGH_ANGLE_BINS)
        .map(|i| -PI / 2.0 + PI * i as f64 / HOUGH_ANGLE_BINS as f64)
        .collect();

    let points: Vec<(f64, f64)> = edges
        .indexed_iter()
        .filter(|(_, &e)| e)
        .map(|((row, col), _)| (col as f64, row as f64))
        .collect();

    let columns: Vec<Vec<u32>> = angles
        .par_iter()
        .map(|&theta| {
            let (s, c) = theta.sin_cos();
            let mut column = vec![0u32; n_dist];
            for &(x, y) in &points {
                let d = (x * c + y * s).round() as isize + offset as isize;
                column[d as usize] += 1;
            }
            column
        })
        .collect();

    let mut votes = Array2::<u32>::zeros((n_dist, angles.len()));
    for (ai, column) in columns.into_iter().enumerate() {
        for (di, v) in column.into_iter().enumerate() {
            votes[[di, ai]] = v;
        }
    }

    Ok(HoughAccumulator {
        votes,
        angles,
        offset,
    })
}

/// Pick prominent peaks with at least `threshold` votes.
///
/// Candidates are visited strongest first (ties in accumulator order) and a
/// candidate is rejected when it lies within the suppression window of an
/// already accepted peak. The window wraps across the +/-90 degree seam,
/// where a line reappears with its distance negated.
pub fn hough_line_peaks(
    acc: &HoughAccumulator,
    threshold: f64,
    max_peaks: Option<usize>,
) -> Vec<HoughLine> {
    let n_angles = acc.angles.len();
    let n_dist = acc.votes.nrows();

    let mut candidates: Vec<(u32, usize, usize)> = acc
        .votes
        .indexed_iter()
        .filter(|(_, &v)| v > 0 && v as f64 >= threshold)
        .map(|((di, ai), &v)| (v, di, ai))
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.2.cmp(&b.2)).then(a.1.cmp(&b.1)));

    let mut accepted: Vec<(usize, usize)> = Vec::new();
    let mut lines = Vec::new();

    for (v, di, ai) in candidates {
        if max_peaks.is_some_and(|m| lines.len() >= m) {
            break;
        }
        let suppressed = accepted.iter().any(|&(pd, pa)| {
            let direct = ai.abs_diff(pa);
            if direct <= HOUGH_MIN_ANGLE && di.abs_diff(pd) <= HOUGH_MIN_DISTANCE {
                return true;
            }
            let wrapped = n_angles - direct;
            let mirrored = n_dist - 1 - di;
            wrapped <= HOUGH_MIN_ANGLE && mirrored.abs_diff(pd) <= HOUGH_MIN_DISTANCE
        });
        if suppressed {
            continue;
        }
        accepted.push((di, ai));
        lines.push(HoughLine {
            angle: acc.angles[ai],
            distance: acc.distance_of(di),
            votes: v,
        });
    }

    lines
}

/// A streak seen as a band between near-parallel edge lines: the centre
/// line plus half the distance between the outermost edges.
#[derive(Clone, Debug, PartialEq)]
pub struct LineBand {
    pub line: HoughLine,
    pub half_span: f64,
}

/// Angle-bin gap between two columns, and whether it is shortest across the
/// +/-90 degree seam.
fn angle_gap(n_angles: usize, a: usize, b: usize) -> (usize, bool) {
    let direct = a.abs_diff(b);
    let wrapped = n_angles - direct;
    if wrapped < direct {
        (wrapped, true)
    } else {
        (direct, false)
    }
}

/// Collapse accepted peaks into streak bands.
///
/// A bright streak produces two edge lines, one on each flank, and peak
/// suppression usually keeps only one of them. Each peak is widened to every
/// cell of its own angle column within `max_width` bins that still clears
/// `threshold`. Peaks within `HOUGH_MIN_ANGLE` bins of a stronger band whose
/// offset from the image centre falls within `max_width` of it join that
/// band. `peaks` must be strongest first, as [`hough_line_peaks`] returns
/// them.
pub fn merge_edge_bands(
    acc: &HoughAccumulator,
    peaks: &[HoughLine],
    threshold: f64,
    shape: (usize, usize),
    max_width: f64,
) -> Vec<LineBand> {
    struct Group {
        column: usize,
        votes: u32,
        lo: f64,
        hi: f64,
    }

    let n_angles = acc.angles.len();
    let n_dist = acc.votes.nrows();
    let (h, w) = shape;
    let (xc, yc) = ((w as f64 - 1.0) / 2.0, (h as f64 - 1.0) / 2.0);
    let centre_term = |ai: usize| {
        let (s, c) = acc.angles[ai].sin_cos();
        xc * c + yc * s
    };
    let reach = max_width.max(0.0).ceil() as usize;

    let mut groups: Vec<Group> = Vec::new();
    for peak in peaks {
        let Some(ai) = acc.angles.iter().position(|&a| a == peak.angle) else {
            continue;
        };
        let pd = (peak.distance + acc.offset as f64).round().max(0.0) as usize;
        let (mut d_lo, mut d_hi) = (peak.distance, peak.distance);
        for di in pd.saturating_sub(reach)..=(pd + reach).min(n_dist - 1) {
            if acc.votes[[di, ai]] as f64 >= threshold {
                let d = acc.distance_of(di);
                d_lo = d_lo.min(d);
                d_hi = d_hi.max(d);
            }
        }
        // Offsets of the band edges from the image centre.
        let base = centre_term(ai);
        let (o_lo, o_hi) = (base - d_hi, base - d_lo);

        let joined = groups.iter_mut().find_map(|g| {
            let (gap, wrapped) = angle_gap(n_angles, g.column, ai);
            if gap > HOUGH_MIN_ANGLE {
                return None;
            }
            // Across the seam the same line has its normal reversed.
            let (lo, hi) = if wrapped { (-o_hi, -o_lo) } else { (o_lo, o_hi) };
            (hi >= g.lo - max_width && lo <= g.hi + max_width).then_some((g, lo, hi))
        });
        match joined {
            Some((g, lo, hi)) => {
                g.lo = g.lo.min(lo);
                g.hi = g.hi.max(hi);
            }
            None => groups.push(Group {
                column: ai,
                votes: peak.votes,
                lo: o_lo,
                hi: o_hi,
            }),
        }
    }

    groups
        .into_iter()
        .map(|g| LineBand {
            line: HoughLine {
                angle: acc.angles[g.column],
                distance: centre_term(g.column) - (g.lo + g.hi) / 2.0,
                votes: g.votes,
            },
            half_span: (g.hi - g.lo) / 2.0,
        })
        .collect()
}

fn rasterize<'a>(
    shape: (usize, usize),
    lines: impl Iterator<Item = (&'a HoughLine, f64)>,
) -> Array2<bool> {
    let mut mask = Array2::from_elem(shape, false);
    for (line, half_width) in lines {
        let (s, c) = line.angle.sin_cos();
        for ((row, col), px) in mask.indexed_iter_mut() {
            if !*px && (col as f64 * c + row as f64 * s - line.distance).abs() < half_width {
                *px = true;
            }
        }
    }
    mask
}

/// Flag every pixel whose perpendicular distance to any line is below
/// `half_width`.
pub fn rasterize_lines(shape: (usize, usize), lines: &[HoughLine], half_width: f32) -> Array2<bool> {
    rasterize(shape, lines.iter().map(|l| (l, half_width as f64)))
}

/// Like [`rasterize_lines`], with each band widened by its half span.
pub fn rasterize_bands(shape: (usize, usize), bands: &[LineBand], half_width: f32) -> Array2<bool> {
    rasterize(
        shape,
        bands.iter().map(|b| (&b.line, half_width as f64 + b.half_span)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal_edge(h: usize, w: usize, row: usize) -> Array2<bool> {
        let mut e = Array2::from_elem((h, w), false);
        for c in 0..w {
            e[[row, c]] = true;
        }
        e
    }

    #[test]
    fn empty_edge_map_has_zero_accumulator() {
        let acc = hough_line(&Array2::from_elem((10, 10), false)).unwrap();
        assert_eq!(acc.max_votes(), 0);
        assert!(hough_line_peaks(&acc, 0.0, None).is_empty());
    }

    #[test]
    fn zero_sized_input_is_an_error() {
        assert!(hough_line(&Array2::from_elem((0, 4), false)).is_err());
    }

    #[test]
    fn horizontal_line_peaks_at_minus_ninety_degrees() {
        let acc = hough_line(&horizontal_edge(50, 80, 20)).unwrap();
        assert_eq!(acc.max_votes(), 80);
        let peaks = hough_line_peaks(&acc, 0.3 * acc.max_votes() as f64, None);
        assert_eq!(peaks.len(), 1, "{peaks:?}");
        assert!((peaks[0].angle + PI / 2.0).abs() < 1e-12);
        assert_eq!(peaks[0].distance, -20.0);
    }

    #[test]
    fn two_separated_lines_give_two_peaks() {
        let mut e = horizontal_edge(60, 60, 10);
        for r in 0..60 {
            e[[r, 40]] = true;
        }
        let acc = hough_line(&e).unwrap();
        let peaks = hough_line_peaks(&acc, 0.3 * acc.max_votes() as f64, None);
        assert_eq!(peaks.len(), 2, "{peaks:?}");
    }

    #[test]
    fn peak_cap_is_respected() {
        let mut e = Array2::from_elem((100, 100), false);
        for k in 0..5 {
            for c in 0..100 {
                e[[5 + 20 * k, c]] = true;
            }
        }
        let acc = hough_line(&e).unwrap();
        let peaks = hough_line_peaks(&acc, 1.0, Some(3));
        assert_eq!(peaks.len(), 3);
    }

    #[test]
    fn edge_pair_merges_into_centred_band() {
        let mut e = horizontal_edge(50, 80, 20);
        for c in 0..80 {
            e[[24, c]] = true;
        }
        let acc = hough_line(&e).unwrap();
        let threshold = 0.3 * acc.max_votes() as f64;
        let peaks = hough_line_peaks(&acc, threshold, None);
        assert_eq!(peaks.len(), 1, "{peaks:?}");

        let bands = merge_edge_bands(&acc, &peaks, threshold, (50, 80), 20.0);
        assert_eq!(bands.len(), 1);
        assert!((bands[0].line.distance + 22.0).abs() < 1e-9, "{bands:?}");
        assert!((bands[0].half_span - 2.0).abs() < 1e-9);

        let m = rasterize_bands((50, 80), &bands, 1.5);
        for r in 0..50 {
            assert_eq!(m[[r, 40]], (r as i32 - 22).abs() <= 3, "row {r}");
        }
    }

    #[test]
    fn tilted_chord_joins_band_but_distant_line_does_not() {
        let mut e = horizontal_edge(50, 80, 20);
        for c in 0..80 {
            e[[24, c]] = true;
        }
        let acc = hough_line(&e).unwrap();
        let threshold = 0.3 * acc.max_votes() as f64;
        let mut peaks = hough_line_peaks(&acc, threshold, None);

        // Four degrees off horizontal, through the image centre.
        let angle = acc.angles[4];
        let (s, c) = angle.sin_cos();
        let through_centre = 39.5 * c + 24.5 * s;
        peaks.push(HoughLine {
            angle,
            distance: through_centre.round(),
            votes: 10,
        });
        let bands = merge_edge_bands(&acc, &peaks, threshold, (50, 80), 20.0);
        assert_eq!(bands.len(), 1, "{bands:?}");

        peaks.push(HoughLine {
            angle,
            distance: (through_centre + 40.0).round(),
            votes: 10,
        });
        let bands = merge_edge_bands(&acc, &peaks, threshold, (50, 80), 20.0);
        assert_eq!(bands.len(), 2, "{bands:?}");
    }

    #[test]
    fn rasterized_line_has_requested_width() {
        let line = HoughLine {
            angle: -PI / 2.0,
            distance: -10.0,
            votes: 1,
        };
        let m = rasterize_lines((21, 7), &[line], 2.0);
        for r in 0..21 {
            let expected = (r as i32 - 10).abs() < 2;
            assert_eq!(m[[r, 3]], expected, "row {r}");
        }
    }
}
