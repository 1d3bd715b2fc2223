//! Frame timing utilities
//!
//! CPU-side frame pacing: instantaneous FPS sampled once per second, a
//! rolling average over the last minute of samples, and the min/max frame
//! delta observed since start.

use super::ring_buffer::RingBuffer;

/// Number of one-second FPS samples kept for the rolling average.
pub const FPS_HISTORY_CAPACITY: usize = 60;

/// Accumulation window after which a new FPS sample is taken.
pub const FPS_SAMPLE_WINDOW_MS: f64 = 1000.0;

/// Raw counters owned by [`FrameTimer`].
#[derive(Debug, Clone)]
pub struct FrameStats {
    pub last_timestamp_ms: f64,
    pub frame_count_since_reset: u32,
    pub accumulated_ms: f64,
    pub current_fps: f64,
    pub last_frame_ms: f64,
    pub fps_history: RingBuffer<f64>,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl FrameStats {
    pub fn new(start_ms: f64) -> Self {
        Self {
            last_timestamp_ms: start_ms,
            frame_count_since_reset: 0,
            accumulated_ms: 0.0,
            current_fps: 0.0,
            last_frame_ms: 0.0,
            fps_history: RingBuffer::new(FPS_HISTORY_CAPACITY),
            min_ms: f64::INFINITY,
            max_ms: 0.0,
        }
    }
}

pub struct FrameTimer {
    stats: FrameStats,
}

impl FrameTimer {
    /// Start timing from `start_ms`; the first [`tick`](Self::tick) measures
    /// the delta from this instant.
    pub fn new(start_ms: f64) -> Self {
        Self {
            stats: FrameStats::new(start_ms),
        }
    }

    /// Record a frame at `now_ms` and return its delta in milliseconds.
    pub fn tick(&mut self, now_ms: f64) -> f64 {
        let stats = &mut self.stats;
        let dt = (now_ms - stats.last_timestamp_ms).max(0.0);
        stats.last_timestamp_ms = now_ms;
        stats.last_frame_ms = dt;
        stats.min_ms = stats.min_ms.min(dt);
        stats.max_ms = stats.max_ms.max(dt);

        stats.frame_count_since_reset += 1;
        stats.accumulated_ms += dt;
        if stats.accumulated_ms >= FPS_SAMPLE_WINDOW_MS {
            stats.current_fps =
                f64::from(stats.frame_count_since_reset) * 1000.0 / stats.accumulated_ms;
            stats.fps_history.push(stats.current_fps);
            stats.frame_count_since_reset = 0;
            stats.accumulated_ms = 0.0;
            tracing::trace!(fps = stats.current_fps, "fps sample");
        }

        dt
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Most recent one-second FPS sample.
    pub fn fps(&self) -> f64 {
        self.stats.current_fps
    }

    /// Mean of the FPS history, falling back to the instantaneous FPS.
    pub fn rolling_fps(&self) -> f64 {
        self.stats
            .fps_history
            .average()
            .unwrap_or(self.stats.current_fps)
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.stats.last_frame_ms
    }

    pub fn frame_time_range_ms(&self) -> (f64, f64) {
        (self.stats.min_ms, self.stats.max_ms)
    }
}
