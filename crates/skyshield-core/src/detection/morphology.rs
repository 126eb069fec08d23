use ndarray::Array2;

use super::components::{label_regions, Connectivity};

/// Drop connected foreground objects smaller than `min_size` pixels.
///
/// Objects are grouped with edge adjacency only, so two blobs touching at a
/// corner are judged separately.
pub fn remove_small_objects(mask: &Array2<bool>, min_size: usize) -> Array2<bool> {
    let mut result = Array2::from_elem(mask.dim(), false);
    for region in label_regions(mask, Connectivity::Four) {
        if region.area() >= min_size {
            region.paint(&mut result);
        }
    }
    result
}
