//! TeachableVision demo: teach classes from live frames and watch predictions.

pub mod args;
pub mod config;
pub mod repl;

pub use args::RunArgs;
pub use config::{resolve_frame_source, resolve_model_path, RunSettings};
