//! Frame timing: per-iteration duration and a rolling frames-per-second figure.

use std::time::{Duration, Instant};

const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct FrameStats {
    started: Option<Instant>,
    window_start: Instant,
    window_frames: u64,
    total_frames: u64,
    last_frame: Duration,
    fps: f64,
    report_interval: Duration,
    last_report: Instant,
}

impl FrameStats {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: None,
            window_start: now,
            window_frames: 0,
            total_frames: 0,
            last_frame: Duration::ZERO,
            fps: 0.0,
            report_interval: DEFAULT_REPORT_INTERVAL,
            last_report: now,
        }
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn end(&mut self) {
        let now = Instant::now();
        if let Some(started) = self.started.take() {
            self.last_frame = now.duration_since(started);
        }
        self.total_frames += 1;
        self.window_frames += 1;

        let window = now.duration_since(self.window_start);
        if window >= Duration::from_secs(1) {
            self.fps = self.window_frames as f64 / window.as_secs_f64();
            self.window_start = now;
            self.window_frames = 0;
        }

        if now.duration_since(self.last_report) >= self.report_interval {
            tracing::debug!(
                "{:.1} fps, {:.2} ms/frame, {} frames",
                self.fps,
                self.last_frame.as_secs_f64() * 1000.0,
                self.total_frames
            );
            self.last_report = now;
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn last_frame(&self) -> Duration {
        self.last_frame
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_frames() {
        let mut stats = FrameStats::new();
        for _ in 0..3 {
            stats.begin();
            stats.end();
        }
        assert_eq!(stats.total_frames(), 3);
    }

    #[test]
    fn test_measures_frame_duration() {
        let mut stats = FrameStats::new();
        stats.begin();
        std::thread::sleep(Duration::from_millis(5));
        stats.end();
        assert!(stats.last_frame() >= Duration::from_millis(5));
    }

    #[test]
    fn test_fps_after_window() {
        let mut stats = FrameStats::new().with_report_interval(Duration::from_millis(1));
        stats.window_start = Instant::now() - Duration::from_secs(2);
        for _ in 0..10 {
            stats.begin();
            stats.end();
        }
        assert!(stats.fps() > 0.0);
    }
}
