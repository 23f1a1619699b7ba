//! The capture-predict loop: one frame in, one example and/or prediction out.

use std::sync::Arc;

use crate::capture::{FrameGuard, VideoSource};
use crate::classifier::Classifier;
use crate::config::LoopConfig;
use crate::embedding::Embedder;
use crate::mode::ModeCell;
use crate::present::Presenter;
use crate::schedule::FrameScheduler;
use crate::stats::FrameStats;
use crate::types::{Embedding, Frame, Mode, PredictionFeedback, StepReport, VisionResult};

/// Drives capture, training, and prediction one frame at a time.
///
/// Exactly one frame is live per iteration and it is released before
/// [`step`](Self::step) returns, whether the iteration succeeded or not.
pub struct CapturePredictLoop<S, E, C, P> {
    source: S,
    embedder: E,
    classifier: C,
    presenter: P,
    mode: Arc<ModeCell>,
    config: LoopConfig,
    stats: FrameStats,
}

impl<S, E, C, P> CapturePredictLoop<S, E, C, P>
where
    S: VideoSource,
    E: Embedder,
    C: Classifier,
    P: Presenter,
{
    pub fn new(
        source: S,
        embedder: E,
        classifier: C,
        presenter: P,
        mode: Arc<ModeCell>,
        config: LoopConfig,
    ) -> Self {
        Self {
            source,
            embedder,
            classifier,
            presenter,
            mode,
            config,
            stats: FrameStats::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn mode(&self) -> &Arc<ModeCell> {
        &self.mode
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Run a single iteration: acquire, read mode, train, predict, release.
    pub async fn step(&mut self) -> VisionResult<StepReport> {
        let Self {
            source,
            embedder,
            classifier,
            presenter,
            mode,
            config,
            stats,
        } = self;

        stats.begin();
        let guard = FrameGuard::acquire(source)?;
        let mode = mode.get();

        let report = process_frame(guard.frame(), mode, embedder, classifier, presenter, config).await;

        drop(guard);
        stats.end();
        report
    }

    /// Repeat [`step`](Self::step), yielding to `scheduler` between frames.
    ///
    /// Returns the number of frames processed once `max_frames` is reached;
    /// without a limit it only returns on error.
    pub async fn run<F>(&mut self, scheduler: &mut F) -> VisionResult<u64>
    where
        F: FrameScheduler + ?Sized,
    {
        let limit = self.config.max_frames;
        let done = |frames: u64| limit.is_some_and(|max| frames >= max);

        tracing::info!(
            "Capture loop started ({} classes, k={}, {} fps)",
            self.config.num_classes,
            self.config.top_k,
            self.config.frame_rate
        );

        let mut frames = 0u64;
        while !done(frames) {
            if let Err(e) = self.step().await {
                tracing::error!("Capture loop stopped at frame {frames}: {e}");
                return Err(e);
            }
            frames += 1;
            if !done(frames) {
                scheduler.next_frame().await;
            }
        }

        tracing::info!("Capture loop finished after {frames} frames");
        Ok(frames)
    }
}

async fn process_frame<E, C, P>(
    frame: &Frame,
    mode: Mode,
    embedder: &mut E,
    classifier: &mut C,
    presenter: &mut P,
    config: &LoopConfig,
) -> VisionResult<StepReport>
where
    E: Embedder,
    C: Classifier,
    P: Presenter,
{
    let mut report = StepReport {
        frame_seq: frame.seq,
        mode,
        trained: false,
        embedded: false,
        predicted: false,
    };
    let mut embedding: Option<Embedding> = None;

    if let Mode::Training(label) = mode {
        let emb = embedding.insert(embedder.embed(frame)?);
        report.embedded = true;

        let outcome = classifier.add_example(emb, label)?;
        tracing::trace!("Frame {} added to class {label}: {outcome:?}", frame.seq);
        presenter.show_example(label, frame);
        report.trained = true;
    }

    if classifier.class_count() > 0 {
        let emb = match embedding.take() {
            Some(emb) => emb,
            None => {
                report.embedded = true;
                embedder.embed(frame)?
            }
        };
        let emb = embedding.insert(emb);

        let result = classifier.predict(emb, config.top_k).await?;
        let counts = classifier.example_count_per_label();
        let feedback = PredictionFeedback::derive(frame.seq, &result, &counts, config.num_classes);
        presenter.present(&feedback);
        report.predicted = true;
    }

    Ok(report)
}
