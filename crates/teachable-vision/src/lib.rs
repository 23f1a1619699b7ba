//! TeachableVision: live frame capture, embedding and incremental k-NN classification.

pub mod capture;
pub mod capture_loop;
pub mod classifier;
pub mod config;
pub mod embedding;
pub mod input;
pub mod lifecycle;
pub mod mode;
pub mod present;
pub mod schedule;
pub mod similarity;
pub mod stats;
pub mod types;

pub use capture::{
    capture_from_file, generate_thumbnail, DirectorySource, FrameGuard, SyntheticSource,
    VideoSource, DEFAULT_FRAME_SIZE,
};
pub use capture_loop::CapturePredictLoop;
pub use classifier::{Classifier, KnnClassifier};
pub use config::LoopConfig;
pub use embedding::{Embedder, EmbeddingEngine, Preprocess, FALLBACK_EMBEDDING_DIM};
pub use input::KeyMap;
pub use lifecycle::{bind, CAPTURE_UNAVAILABLE_MESSAGE};
pub use mode::ModeCell;
pub use present::{JsonLinesPresenter, Presenter, TracingPresenter};
pub use schedule::{FrameRateScheduler, FrameScheduler, YieldScheduler};
pub use similarity::{cosine_similarity, nearest_neighbors, Neighbor};
pub use stats::FrameStats;
pub use types::*;
