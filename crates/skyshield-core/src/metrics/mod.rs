pub mod frame;
pub mod night;

pub use frame::{compute_frame_quality, severity_score, FrameQuality, QualityFlag};
pub use night::{aggregate_night, NightReport};
