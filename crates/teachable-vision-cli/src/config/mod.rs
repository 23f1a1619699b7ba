//! Configuration loading and resolution.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;

use teachable_vision::{
    DirectorySource, LoopConfig, Preprocess, SyntheticSource, VideoSource, VisionError,
    VisionResult, DEFAULT_FRAME_SIZE,
};

/// Environment variable naming the embedding model file.
pub const MODEL_ENV: &str = "TEACHABLE_VISION_MODEL";

/// Environment variable naming a directory of frames to replay.
pub const FRAMES_ENV: &str = "TEACHABLE_VISION_FRAMES";

/// Frames each synthetic scene is held for.
const SYNTHETIC_FRAMES_PER_SCENE: u64 = 90;

/// Errors raised while assembling run settings.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] VisionError),
}

/// How predictions are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Human-readable lines through the logger.
    #[default]
    Text,
    /// One JSON object per event on stdout.
    Json,
}

/// Pixel normalization expected by the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PreprocessArg {
    #[default]
    Mobilenet,
    Clip,
}

impl From<PreprocessArg> for Preprocess {
    fn from(arg: PreprocessArg) -> Self {
        match arg {
            PreprocessArg::Mobilenet => Preprocess::MobileNet,
            PreprocessArg::Clip => Preprocess::Clip,
        }
    }
}

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameSourceSpec {
    Directory { path: PathBuf },
    Synthetic { width: u32, height: u32, frames_per_scene: u64 },
}

impl FrameSourceSpec {
    /// Open the source; failures surface as capture-unavailable.
    pub fn open(&self) -> VisionResult<Box<dyn VideoSource>> {
        match self {
            FrameSourceSpec::Directory { path } => Ok(Box::new(DirectorySource::open(path)?)),
            FrameSourceSpec::Synthetic {
                width,
                height,
                frames_per_scene,
            } => Ok(Box::new(SyntheticSource::new(
                *width,
                *height,
                *frames_per_scene,
            )?)),
        }
    }
}

/// Fully resolved settings for `run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSettings {
    #[serde(rename = "loop")]
    pub loop_config: LoopConfig,
    pub source: FrameSourceSpec,
    pub model_path: Option<String>,
    pub preprocess: Preprocess,
    pub output: OutputFormat,
    pub thumbnails: bool,
    pub interactive: bool,
}

impl RunSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.loop_config.validate()?;
        if let FrameSourceSpec::Directory { path } = &self.source {
            if !path.is_dir() {
                tracing::warn!("Frame directory does not exist: {}", path.display());
            }
        }
        Ok(())
    }
}

/// Resolve the embedding model path.
///
/// Explicit flag, then `TEACHABLE_VISION_MODEL`, then `.teachable-vision/` in
/// the working directory. `None` lets the engine use its home-directory default.
pub fn resolve_model_path(explicit: Option<&str>) -> Option<String> {
    if let Some(path) = explicit {
        return Some(path.to_string());
    }

    if let Ok(env_path) = std::env::var(MODEL_ENV) {
        return Some(env_path);
    }

    let cwd_model = PathBuf::from(".teachable-vision/mobilenet_v2.onnx");
    if cwd_model.exists() {
        return Some(cwd_model.display().to_string());
    }

    None
}

/// Resolve the frame source: explicit directory, then `TEACHABLE_VISION_FRAMES`,
/// then synthetic frames.
pub fn resolve_frame_source(explicit_dir: Option<&str>) -> FrameSourceSpec {
    let dir = explicit_dir
        .map(str::to_string)
        .or_else(|| std::env::var(FRAMES_ENV).ok());
    frame_source_for(dir)
}

/// Map an optional frame directory to a source, without consulting the environment.
pub fn frame_source_for(dir: Option<String>) -> FrameSourceSpec {
    match dir {
        Some(path) => FrameSourceSpec::Directory {
            path: PathBuf::from(path),
        },
        None => FrameSourceSpec::Synthetic {
            width: DEFAULT_FRAME_SIZE,
            height: DEFAULT_FRAME_SIZE,
            frames_per_scene: SYNTHETIC_FRAMES_PER_SCENE,
        },
    }
}
