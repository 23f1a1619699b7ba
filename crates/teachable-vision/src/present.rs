//! Presentation surfaces for predictions and captured training examples.

use std::io::Write;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::capture::generate_thumbnail;
use crate::types::{ClassFeedback, Frame, Label, PredictionFeedback, VisionResult};

/// Receives feedback from the capture loop. Side effects only.
pub trait Presenter {
    /// Called once per iteration in which a prediction was made.
    fn present(&mut self, feedback: &PredictionFeedback);

    /// Called with the frame just stored as an example for `label`.
    fn show_example(&mut self, _label: Label, _frame: &Frame) {}
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn present(&mut self, feedback: &PredictionFeedback) {
        (**self).present(feedback)
    }

    fn show_example(&mut self, label: Label, frame: &Frame) {
        (**self).show_example(label, frame)
    }
}

/// Format one class line as `"<count> examples - <conf>%"`.
pub fn class_summary(class: &ClassFeedback) -> String {
    format!(
        "{} examples - {:.2}%",
        class.examples,
        class.confidence * 100.0
    )
}

/// Writes feedback through `tracing`.
///
/// The prediction is logged at info level when the top class changes; the
/// per-class lines go out at debug level every frame.
#[derive(Debug, Default)]
pub struct TracingPresenter {
    last_top: Option<Label>,
}

impl TracingPresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Presenter for TracingPresenter {
    fn present(&mut self, feedback: &PredictionFeedback) {
        if feedback.top_label != self.last_top {
            match feedback.top_label {
                Some(label) => tracing::info!("Prediction: class {}", label.index() + 1),
                None => tracing::info!("Prediction: none"),
            }
            self.last_top = feedback.top_label;
        }

        for class in feedback.classes.iter().filter(|c| c.examples > 0) {
            let marker = if class.selected { '*' } else { ' ' };
            tracing::debug!(
                "{marker} class {}: {}",
                class.label.index() + 1,
                class_summary(class)
            );
        }
    }

    fn show_example(&mut self, label: Label, frame: &Frame) {
        tracing::trace!("Frame {} stored for class {}", frame.seq, label.index() + 1);
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Prediction {
        timestamp: DateTime<Utc>,
        #[serde(flatten)]
        feedback: &'a PredictionFeedback,
    },
    Example {
        timestamp: DateTime<Utc>,
        label: Label,
        frame_seq: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        thumbnail_jpeg: Option<String>,
    },
}

/// Writes one JSON object per line for every event.
pub struct JsonLinesPresenter<W: Write> {
    writer: W,
    thumbnails: bool,
}

impl<W: Write> JsonLinesPresenter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            thumbnails: true,
        }
    }

    /// Include a base64 JPEG thumbnail with every example event.
    pub fn with_thumbnails(mut self, enabled: bool) -> Self {
        self.thumbnails = enabled;
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, event: &Event<'_>) {
        let result = serde_json::to_writer(&mut self.writer, event)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush());
        if let Err(e) = result {
            tracing::warn!("Failed to write event: {e}");
        }
    }
}

impl<W: Write> Presenter for JsonLinesPresenter<W> {
    fn present(&mut self, feedback: &PredictionFeedback) {
        self.emit(&Event::Prediction {
            timestamp: Utc::now(),
            feedback,
        });
    }

    fn show_example(&mut self, label: Label, frame: &Frame) {
        let thumbnail_jpeg = if self.thumbnails {
            thumbnail_field(generate_thumbnail(&frame.image))
        } else {
            None
        };
        self.emit(&Event::Example {
            timestamp: Utc::now(),
            label,
            frame_seq: frame.seq,
            thumbnail_jpeg,
        });
    }
}

/// Base64 payload for an example event; `None` drops the field.
fn thumbnail_field(jpeg: VisionResult<Vec<u8>>) -> Option<String> {
    match jpeg {
        Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        Err(e) => {
            tracing::warn!("Failed to encode thumbnail as JPEG: {e}");
            None
        }
    }
}
