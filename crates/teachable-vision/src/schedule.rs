//! Frame pacing between loop iterations.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Hands control back to the host until the next frame is due.
#[async_trait(?Send)]
pub trait FrameScheduler {
    async fn next_frame(&mut self);
}

/// Ticks at a fixed display rate; late ticks are skipped, not bursted.
pub struct FrameRateScheduler {
    ticker: Interval,
}

impl FrameRateScheduler {
    /// Must be created inside a tokio runtime.
    pub fn new(frames_per_second: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / frames_per_second.max(1) as f64);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { ticker }
    }

    pub fn period(&self) -> Duration {
        self.ticker.period()
    }
}

#[async_trait(?Send)]
impl FrameScheduler for FrameRateScheduler {
    async fn next_frame(&mut self) {
        self.ticker.tick().await;
    }
}

/// Yields to the runtime and continues immediately.
#[derive(Debug, Default)]
pub struct YieldScheduler;

#[async_trait(?Send)]
impl FrameScheduler for YieldScheduler {
    async fn next_frame(&mut self) {
        tokio::task::yield_now().await;
    }
}
