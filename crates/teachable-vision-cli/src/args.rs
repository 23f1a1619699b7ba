//! Command-line arguments for `run` and `info`.

use clap::Args;

use teachable_vision::config::{DEFAULT_FRAME_RATE, DEFAULT_NUM_CLASSES, DEFAULT_TOP_K};
use teachable_vision::LoopConfig;

use crate::config::{
    resolve_frame_source, resolve_model_path, ConfigError, OutputFormat, PreprocessArg,
    RunSettings,
};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Directory of frames to replay in a loop (synthetic frames if unset).
    /// Also reads TEACHABLE_VISION_FRAMES.
    #[arg(short, long)]
    pub frames: Option<String>,

    /// Path to the ONNX embedding model.
    /// Also reads TEACHABLE_VISION_MODEL.
    #[arg(long)]
    pub model: Option<String>,

    /// Pixel normalization expected by the model.
    #[arg(long, value_enum, default_value_t = PreprocessArg::Mobilenet)]
    pub preprocess: PreprocessArg,

    /// Number of trainable classes (1-9, one digit key each).
    #[arg(short, long, default_value_t = DEFAULT_NUM_CLASSES)]
    pub classes: usize,

    /// Neighbors consulted per prediction.
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Frames per second.
    #[arg(long, default_value_t = DEFAULT_FRAME_RATE)]
    pub fps: u32,

    /// Keep at most this many examples per class (oldest evicted).
    #[arg(long)]
    pub max_examples: Option<usize>,

    /// Stop after this many frames.
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Output format for predictions.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Leave thumbnails out of JSON example events.
    #[arg(long)]
    pub no_thumbnails: bool,

    /// Do not read training input from the terminal.
    #[arg(long)]
    pub no_input: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            frames: None,
            model: None,
            preprocess: PreprocessArg::default(),
            classes: DEFAULT_NUM_CLASSES,
            top_k: DEFAULT_TOP_K,
            fps: DEFAULT_FRAME_RATE,
            max_examples: None,
            max_frames: None,
            output: OutputFormat::default(),
            no_thumbnails: false,
            no_input: false,
        }
    }
}

impl RunArgs {
    /// Resolve paths and environment, then validate.
    pub fn into_settings(self) -> Result<RunSettings, ConfigError> {
        let settings = RunSettings {
            loop_config: LoopConfig {
                num_classes: self.classes,
                top_k: self.top_k,
                frame_rate: self.fps,
                max_examples_per_class: self.max_examples,
                max_frames: self.max_frames,
            },
            source: resolve_frame_source(self.frames.as_deref()),
            model_path: resolve_model_path(self.model.as_deref()),
            preprocess: self.preprocess.into(),
            output: self.output,
            thumbnails: !self.no_thumbnails,
            interactive: !self.no_input,
        };
        settings.validate()?;
        Ok(settings)
    }
}
