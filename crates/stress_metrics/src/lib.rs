//! Stress Metrics - Measurement primitives for the stress harness
//!
//! - [`FrameTimer`]: CPU frame deltas, one-second FPS samples, rolling average
//! - [`GpuTimer`]: non-blocking GPU elapsed time over [`TimerQueries`]
//! - [`RingBuffer`]: bounded sample history
//!
//! # Usage
//!
//! ```ignore
//! use stress_metrics::FrameTimer;
//!
//! let mut timer = FrameTimer::new(now_ms());
//! loop {
//!     timer.tick(now_ms());
//!     println!("FPS: {:.1} (avg {:.1})", timer.fps(), timer.rolling_fps());
//! }
//! ```

mod frame_timer;
mod gpu_timer;
mod ring_buffer;

pub use frame_timer::{FrameStats, FrameTimer, FPS_HISTORY_CAPACITY, FPS_SAMPLE_WINDOW_MS};
pub use gpu_timer::{GpuTimer, QueryId, QueryStatus, TimerQueries};
pub use ring_buffer::RingBuffer;
