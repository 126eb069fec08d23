pub mod gaussian_blur;
pub mod local_threshold;

pub use gaussian_blur::gaussian_blur_array;
pub use local_threshold::gaussian_local_threshold;
