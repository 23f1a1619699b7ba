//! One-time setup before the capture loop starts.

use std::future::Future;
use std::sync::Arc;

use crate::capture::VideoSource;
use crate::capture_loop::CapturePredictLoop;
use crate::classifier::KnnClassifier;
use crate::config::LoopConfig;
use crate::embedding::Embedder;
use crate::mode::ModeCell;
use crate::present::Presenter;
use crate::types::{VisionError, VisionResult};

/// Shown once when the video source cannot be set up.
pub const CAPTURE_UNAVAILABLE_MESSAGE: &str =
    "this device does not support video capture, or no camera is available";

/// Build a ready loop: empty classifier, loaded embedder, open video source.
///
/// A video source failure is reported once and returned as
/// [`VisionError::CaptureUnavailable`]; no loop is constructed.
pub async fn bind<S, E, P, FE, FS>(
    config: LoopConfig,
    mode: Arc<ModeCell>,
    presenter: P,
    load_embedder: FE,
    setup_source: FS,
) -> VisionResult<CapturePredictLoop<S, E, KnnClassifier, P>>
where
    S: VideoSource,
    E: Embedder,
    P: Presenter,
    FE: Future<Output = VisionResult<E>>,
    FS: Future<Output = VisionResult<S>>,
{
    config.validate()?;

    let classifier = KnnClassifier::new(config.num_classes)
        .with_capacity_per_class(config.max_examples_per_class);

    let embedder = load_embedder.await?;
    tracing::debug!("Embedding source ready");

    let source = match setup_source.await {
        Ok(source) => source,
        Err(e) => {
            tracing::error!("{CAPTURE_UNAVAILABLE_MESSAGE} ({e})");
            return Err(match e {
                VisionError::CaptureUnavailable(_) => e,
                other => VisionError::CaptureUnavailable(other.to_string()),
            });
        }
    };

    Ok(CapturePredictLoop::new(
        source, embedder, classifier, presenter, mode, config,
    ))
}
