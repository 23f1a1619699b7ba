//! Frame embeddings via ONNX Runtime, with a downsampled-pixel fallback.

use std::path::PathBuf;

use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;
use serde::{Deserialize, Serialize};

use crate::similarity::l2_normalize;
use crate::types::{Embedding, Frame, VisionError, VisionResult};

/// Default model directory under `$HOME`.
const MODEL_DIR: &str = ".teachable-vision/models";

/// Default model filename.
const MODEL_FILENAME: &str = "mobilenet_v2.onnx";

/// Square input size expected by the image models.
const MODEL_IMAGE_SIZE: u32 = 224;

#[allow(clippy::excessive_precision)]
const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
#[allow(clippy::excessive_precision)]
const CLIP_STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Side of the grid used by the fallback embedding.
const FALLBACK_GRID: u32 = 8;

/// Dimension of the fallback embedding (8x8 RGB).
pub const FALLBACK_EMBEDDING_DIM: usize = (FALLBACK_GRID * FALLBACK_GRID * 3) as usize;

/// Turns a frame into an embedding.
pub trait Embedder {
    fn embed(&mut self, frame: &Frame) -> VisionResult<Embedding>;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed(&mut self, frame: &Frame) -> VisionResult<Embedding> {
        (**self).embed(frame)
    }
}

/// Pixel normalization applied before inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preprocess {
    /// Scale to `[-1, 1]`.
    #[default]
    MobileNet,
    /// Per-channel CLIP mean/std.
    Clip,
}

impl Preprocess {
    fn normalize(self, channel: usize, value: u8) -> f32 {
        let v = value as f32 / 255.0;
        match self {
            Preprocess::MobileNet => v * 2.0 - 1.0,
            Preprocess::Clip => (v - CLIP_MEAN[channel]) / CLIP_STD[channel],
        }
    }
}

/// Engine for generating frame embeddings.
pub struct EmbeddingEngine {
    session: Option<Session>,
    preprocess: Preprocess,
    dim: Option<usize>,
}

impl EmbeddingEngine {
    /// Create a new embedding engine.
    ///
    /// If `model_path` is provided, loads the model from that path.
    /// Otherwise, looks in `~/.teachable-vision/models/`.
    /// If no model is found, the engine falls back to downsampled pixels.
    pub fn new(model_path: Option<&str>, preprocess: Preprocess) -> VisionResult<Self> {
        let path = match model_path {
            Some(p) => PathBuf::from(p),
            None => default_model_path(),
        };

        if !path.exists() {
            tracing::warn!(
                "Embedding model not found at {}. Running in fallback mode (pixel embeddings).",
                path.display()
            );
            return Ok(Self {
                session: None,
                preprocess,
                dim: Some(FALLBACK_EMBEDDING_DIM),
            });
        }

        tracing::info!("Loading embedding model from {}", path.display());

        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_file(&path))
            .map_err(|e| VisionError::Embedding(format!("Failed to load ONNX model: {e}")))?;

        tracing::info!("Embedding model loaded ({preprocess:?} preprocessing)");
        Ok(Self {
            session: Some(session),
            preprocess,
            dim: None,
        })
    }

    /// Check if the engine has a loaded model.
    pub fn has_model(&self) -> bool {
        self.session.is_some()
    }

    /// Output dimension, known once the model has produced an embedding.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    /// Generate an L2-normalized embedding for an image.
    pub fn embed_image(&mut self, img: &DynamicImage) -> VisionResult<Vec<f32>> {
        let preprocess = self.preprocess;
        let session = match &mut self.session {
            Some(s) => s,
            None => return Ok(pixel_embedding(img)),
        };

        let resized = img.resize_exact(
            MODEL_IMAGE_SIZE,
            MODEL_IMAGE_SIZE,
            image::imageops::FilterType::Triangle,
        );
        let rgb = resized.to_rgb8();

        // NCHW [1, 3, 224, 224]
        let mut tensor =
            Array4::<f32>::zeros((1, 3, MODEL_IMAGE_SIZE as usize, MODEL_IMAGE_SIZE as usize));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3usize {
                tensor[[0, c, y as usize, x as usize]] = preprocess.normalize(c, pixel[c]);
            }
        }

        let input_tensor = Tensor::from_array(tensor)
            .map_err(|e| VisionError::Embedding(format!("Failed to create input tensor: {e}")))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| VisionError::Embedding(format!("ONNX inference failed: {e}")))?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Embedding(format!("Failed to extract output: {e}")))?;

        let embedding = l2_normalize(data.to_vec());
        if self.dim.is_none() {
            tracing::debug!("Model embedding dimension: {}", embedding.len());
            self.dim = Some(embedding.len());
        }
        Ok(embedding)
    }
}

impl Embedder for EmbeddingEngine {
    fn embed(&mut self, frame: &Frame) -> VisionResult<Embedding> {
        self.embed_image(&frame.image).map(Embedding::new)
    }
}

/// `~/.teachable-vision/models/mobilenet_v2.onnx`
pub fn default_model_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(MODEL_DIR).join(MODEL_FILENAME)
}

/// Downsample to an 8x8 RGB grid, center around zero, and L2-normalize.
pub fn pixel_embedding(img: &DynamicImage) -> Vec<f32> {
    let small = img
        .resize_exact(
            FALLBACK_GRID,
            FALLBACK_GRID,
            image::imageops::FilterType::Triangle,
        )
        .to_rgb8();

    let values = small
        .pixels()
        .flat_map(|p| p.0)
        .map(|v| v as f32 / 255.0 - 0.5)
        .collect();
    l2_normalize(values)
}
