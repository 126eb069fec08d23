pub mod consts;
pub mod detection;
pub mod error;
pub mod filters;
pub mod frame;
pub mod io;
pub mod mask;
pub mod metrics;
pub mod pipeline;
pub mod skyglow;
pub mod stats;
pub mod validation;
