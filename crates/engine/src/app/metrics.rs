use std::time::{Duration, Instant};

use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub dropped_ticks: u32,
}

impl LoopMetricsSnapshot {
    pub(crate) fn log(&self) {
        info!(
            fps = self.fps,
            tps = self.tps,
            frame_time_ms = self.frame_time_ms,
            dropped_ticks = self.dropped_ticks,
            "loop_metrics"
        );
    }
}

/// Counts frames, ticks and dropped backlog over a rolling interval.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    ticks: u32,
    dropped_ticks: u32,
    frame_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            frames: 0,
            ticks: 0,
            dropped_ticks: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_ticks(&mut self, ticks: u32, dropped: u32) {
        self.ticks = self.ticks.saturating_add(ticks);
        self.dropped_ticks = self.dropped_ticks.saturating_add(dropped);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            frame_time_ms,
            dropped_ticks: self.dropped_ticks,
        };

        *self = Self::new(self.interval, now);
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_averages_over_interval() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);

        accumulator.record_frame(Duration::from_millis(16));
        accumulator.record_frame(Duration::from_millis(16));
        accumulator.record_ticks(3, 0);
        accumulator.record_ticks(1, 2);

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("snapshot should be emitted");

        assert!((snapshot.fps - 2.0).abs() < 0.05);
        assert!((snapshot.tps - 4.0).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 16.0).abs() < 0.001);
        assert_eq!(snapshot.dropped_ticks, 2);
    }

    #[test]
    fn snapshot_waits_for_interval() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(16));

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn counters_reset_after_snapshot() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(10));
        accumulator.record_ticks(5, 1);
        accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("first snapshot");

        let second = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("second snapshot");
        assert_eq!(second.fps, 0.0);
        assert_eq!(second.tps, 0.0);
        assert_eq!(second.frame_time_ms, 0.0);
        assert_eq!(second.dropped_ticks, 0);
    }
}
