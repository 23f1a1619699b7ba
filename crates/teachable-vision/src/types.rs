//! Core data types for frames, embeddings, labels, and predictions.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A discrete class identifier in `0..num_classes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub usize);

impl Label {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current input intent, read once per loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "label", rename_all = "snake_case")]
pub enum Mode {
    Idle,
    Training(Label),
}

impl Mode {
    pub fn is_idle(self) -> bool {
        matches!(self, Mode::Idle)
    }

    pub fn training_label(self) -> Option<Label> {
        match self {
            Mode::Idle => None,
            Mode::Training(label) => Some(label),
        }
    }
}

/// A single captured image, owned by the loop for one iteration.
#[derive(Debug, Clone)]
pub struct Frame {
    pub seq: u64,
    pub image: DynamicImage,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(seq: u64, image: DynamicImage) -> Self {
        Self {
            seq,
            image,
            captured_at: Instant::now(),
        }
    }
}

/// Fixed-length feature vector computed from a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Return an L2-normalized copy. Zero vectors are returned unchanged.
    pub fn normalized(&self) -> Vec<f32> {
        crate::similarity::l2_normalize(self.0.clone())
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// What the store did with an appended example.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added { count: usize },
    /// The class was at capacity; its oldest example was dropped.
    Evicted { count: usize },
}

/// Raw predictor output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub top_label: Option<Label>,
    pub confidences: BTreeMap<Label, f32>,
}

impl PredictionResult {
    pub fn confidence(&self, label: Label) -> f32 {
        self.confidences.get(&label).copied().unwrap_or(0.0)
    }
}

/// Per-label view forwarded to the presenter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassFeedback {
    pub label: Label,
    pub selected: bool,
    pub confidence: f32,
    pub examples: usize,
}

/// Everything the presenter needs for one predicting iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionFeedback {
    pub frame_seq: u64,
    pub top_label: Option<Label>,
    pub classes: Vec<ClassFeedback>,
}

impl PredictionFeedback {
    /// Derive one entry per label in `0..num_classes`.
    pub fn derive(
        frame_seq: u64,
        result: &PredictionResult,
        counts: &BTreeMap<Label, usize>,
        num_classes: usize,
    ) -> Self {
        let classes = (0..num_classes)
            .map(Label)
            .map(|label| ClassFeedback {
                label,
                selected: result.top_label == Some(label),
                confidence: result.confidence(label).clamp(0.0, 1.0),
                examples: counts.get(&label).copied().unwrap_or(0),
            })
            .collect();

        Self {
            frame_seq,
            top_label: result.top_label,
            classes,
        }
    }
}

/// Summary of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub frame_seq: u64,
    pub mode: Mode,
    pub trained: bool,
    pub embedded: bool,
    pub predicted: bool,
}

/// Errors that can occur in the vision library.
#[derive(thiserror::Error, Debug)]
pub enum VisionError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid label {label}: expected a class below {num_classes}")]
    InvalidLabel { label: Label, num_classes: usize },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No examples have been added to the classifier")]
    EmptyExampleSet,
}

/// Convenience result type.
pub type VisionResult<T> = Result<T, VisionError>;
