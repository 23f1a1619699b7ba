//! Shared mode cell written by the input surface and read by the capture loop.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::{Label, Mode};

const IDLE: usize = usize::MAX;

/// Single-writer, single-reader mode cell.
///
/// The input surface may run on another thread, so the value is an atomic.
/// The loop reads it exactly once per iteration.
#[derive(Debug)]
pub struct ModeCell {
    raw: AtomicUsize,
}

impl ModeCell {
    pub fn new() -> Self {
        Self {
            raw: AtomicUsize::new(IDLE),
        }
    }

    pub fn get(&self) -> Mode {
        match self.raw.load(Ordering::Acquire) {
            IDLE => Mode::Idle,
            label => Mode::Training(Label(label)),
        }
    }

    /// Store `mode`. Training labels must be below `usize::MAX`, which marks Idle.
    pub fn set(&self, mode: Mode) {
        let raw = match mode {
            Mode::Idle => IDLE,
            Mode::Training(label) => {
                debug_assert!(label.index() != IDLE, "label {label} collides with Idle");
                label.index()
            }
        };
        let previous = self.raw.swap(raw, Ordering::AcqRel);
        if previous != raw {
            tracing::debug!("Mode changed to {mode:?}");
        }
    }
}

impl Default for ModeCell {
    fn default() -> Self {
        Self::new()
    }
}
