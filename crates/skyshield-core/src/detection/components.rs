use std::collections::BTreeMap;

use ndarray::Array2;

/// Pixel adjacency used when grouping foreground pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    /// Edge neighbours only.
    Four,
    /// Edge and corner neighbours.
    Eight,
}

/// A connected foreground region and its shape statistics.
#[derive(Clone, Debug)]
pub struct Region {
    /// Unique label for this region (raster order of its first pixel).
    pub label: u32,
    /// Pixel coordinates as `(row, col)`.
    pub coords: Vec<(usize, usize)>,
    /// Bounding box: (min_row, max_row, min_col, max_col).
    pub bbox: (usize, usize, usize, usize),
}

impl Region {
    /// Number of pixels in the region.
    pub fn area(&self) -> usize {
        self.coords.len()
    }

    /// Mean `(row, col)` position.
    pub fn centroid(&self) -> (f64, f64) {
        let n = self.coords.len().max(1) as f64;
        let (sr, sc) = self
            .coords
            .iter()
            .fold((0.0, 0.0), |(sr, sc), &(r, c)| (sr + r as f64, sc + c as f64));
        (sr / n, sc / n)
    }

    /// Major and minor axis lengths of the ellipse with the same normalized
    /// second central moments as the region (4 * sqrt(eigenvalue)).
    pub fn axis_lengths(&self) -> (f64, f64) {
        let n = self.coords.len();
        if n == 0 {
            return (0.0, 0.0);
        }
        let (cr, cc) = self.centroid();
        let mut m_rr = 0.0_f64;
        let mut m_cc = 0.0_f64;
        let mut m_rc = 0.0_f64;
        for &(r, c) in &self.coords {
            let dr = r as f64 - cr;
            let dc = c as f64 - cc;
            m_rr += dr * dr;
            m_cc += dc * dc;
            m_rc += dr * dc;
        }
        let n = n as f64;
        m_rr /= n;
        m_cc /= n;
        m_rc /= n;

        let trace = m_rr + m_cc;
        let det = m_rr * m_cc - m_rc * m_rc;
        let disc = (trace * trace - 4.0 * det).max(0.0).sqrt();
        let l_major = ((trace + disc) * 0.5).max(0.0);
        let l_minor = ((trace - disc) * 0.5).max(0.0);
        (4.0 * l_major.sqrt(), 4.0 * l_minor.sqrt())
    }

    /// Major / minor axis ratio. `None` for regions with no width (a single
    /// pixel or a one-pixel-thick straight run).
    pub fn aspect_ratio(&self) -> Option<f64> {
        let (major, minor) = self.axis_lengths();
        if minor > 1e-9 {
            Some(major / minor)
        } else {
            None
        }
    }

    /// Set every pixel of the region in `mask`.
    pub fn paint(&self, mask: &mut Array2<bool>) {
        for &(r, c) in &self.coords {
            mask[[r, c]] = true;
        }
    }
}

/// Perform connected component analysis on a binary mask using two-pass
/// labeling with union-find.
///
/// Returns regions sorted by label, i.e. by the raster position of each
/// region's first pixel.
pub fn label_regions(mask: &Array2<bool>, connectivity: Connectivity) -> Vec<Region> {
    let (h, w) = mask.dim();
    if h == 0 || w == 0 {
        return Vec::new();
    }

    let mut labels = Array2::<u32>::zeros((h, w));
    let mut next_label: u32 = 1;
    // Union-find parent array. Index 0 unused; labels start at 1.
    let mut parent: Vec<u32> = vec![0; h * w / 2 + 2];

    // Pass 1: assign provisional labels.
    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] {
                continue;
            }

            let neighbours = previous_neighbours(&labels, row, col, connectivity);
            let smallest = neighbours.iter().copied().filter(|&l| l > 0).min();

            match smallest {
                None => {
                    if next_label as usize >= parent.len() {
                        parent.resize(parent.len() * 2, 0);
                    }
                    parent[next_label as usize] = next_label;
                    labels[[row, col]] = next_label;
                    next_label += 1;
                }
                Some(smallest) => {
                    labels[[row, col]] = smallest;
                    for &other in neighbours.iter().filter(|&&l| l > 0 && l != smallest) {
                        union(&mut parent, smallest, other);
                    }
                }
            }
        }
    }

    // Flatten parent references.
    for i in 1..next_label as usize {
        parent[i] = find(&parent, i as u32);
    }

    // Pass 2: resolve labels and collect pixels.
    let mut regions = BTreeMap::<u32, Region>::new();

    for row in 0..h {
        for col in 0..w {
            let lbl = labels[[row, col]];
            if lbl == 0 {
                continue;
            }
            let root = parent[lbl as usize];

            let entry = regions.entry(root).or_insert(Region {
                label: root,
                coords: Vec::new(),
                bbox: (row, row, col, col),
            });

            entry.coords.push((row, col));
            entry.bbox.0 = entry.bbox.0.min(row);
            entry.bbox.1 = entry.bbox.1.max(row);
            entry.bbox.2 = entry.bbox.2.min(col);
            entry.bbox.3 = entry.bbox.3.max(col);
        }
    }

    regions.into_values().collect()
}

/// Labels of the already-visited neighbours of `(row, col)`.
fn previous_neighbours(
    labels: &Array2<u32>,
    row: usize,
    col: usize,
    connectivity: Connectivity,
) -> [u32; 4] {
    let (_, w) = labels.dim();
    let up = if row > 0 { labels[[row - 1, col]] } else { 0 };
    let left = if col > 0 { labels[[row, col - 1]] } else { 0 };
    match connectivity {
        Connectivity::Four => [up, left, 0, 0],
        Connectivity::Eight => {
            let up_left = if row > 0 && col > 0 {
                labels[[row - 1, col - 1]]
            } else {
                0
            };
            let up_right = if row > 0 && col + 1 < w {
                labels[[row - 1, col + 1]]
            } else {
                0
            };
            [up, left, up_left, up_right]
        }
    }
}

fn find(parent: &[u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        // Merge larger root into smaller root to keep labels consistent.
        let (small, big) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[big as usize] = small;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_pixels_join_only_with_eight_connectivity() {
        let mut m = Array2::from_elem((3, 3), false);
        m[[0, 0]] = true;
        m[[1, 1]] = true;
        m[[2, 2]] = true;
        assert_eq!(label_regions(&m, Connectivity::Four).len(), 3);
        assert_eq!(label_regions(&m, Connectivity::Eight).len(), 1);
    }

    #[test]
    fn u_shape_merges_into_one_region() {
        // Two arms that only meet on the bottom row exercise the union step.
        let mut m = Array2::from_elem((4, 5), false);
        for r in 0..4 {
            m[[r, 0]] = true;
            m[[r, 4]] = true;
        }
        for c in 0..5 {
            m[[3, c]] = true;
        }
        let regions = label_regions(&m, Connectivity::Four);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area(), 11);
        assert_eq!(regions[0].bbox, (0, 3, 0, 4));
    }

    #[test]
    fn elongated_bar_has_high_aspect_ratio() {
        let mut m = Array2::from_elem((10, 60), false);
        for r in 4..7 {
            for c in 5..55 {
                m[[r, c]] = true;
            }
        }
        let regions = label_regions(&m, Connectivity::Eight);
        assert_eq!(regions.len(), 1);
        let (major, minor) = regions[0].axis_lengths();
        assert!(major > 50.0, "major = {major}");
        assert!(minor > 2.0 && minor < 4.0, "minor = {minor}");
        assert!(regions[0].aspect_ratio().unwrap() > 10.0);
    }

    #[test]
    fn one_pixel_thick_line_has_no_aspect_ratio() {
        let mut m = Array2::from_elem((5, 20), false);
        for c in 0..20 {
            m[[2, c]] = true;
        }
        let regions = label_regions(&m, Connectivity::Eight);
        assert_eq!(regions[0].aspect_ratio(), None);
    }

    #[test]
    fn square_is_not_elongated() {
        let mut m = Array2::from_elem((12, 12), false);
        for r in 2..10 {
            for c in 2..10 {
                m[[r, c]] = true;
            }
        }
        let regions = label_regions(&m, Connectivity::Eight);
        let ar = regions[0].aspect_ratio().unwrap();
        assert!((ar - 1.0).abs() < 1e-9);
    }
}
