//! Host boundary
//!
//! The harness is mounted into a container it does not own. [`Host`] is that
//! container: it reports its size, schedules frames, delivers resize events
//! and shows the overlay. [`Renderer`] owns the output surface and every GPU
//! resource.

use crate::scene::Scene;
use crate::viewport::{SurfaceSize, Viewport};
use std::ops::Range;
use stress_metrics::TimerQueries;

/// Token for one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Token for a registered resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Memory figures for the overlay, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapUsage {
    pub used: u64,
    pub total: u64,
    pub limit: u64,
}

pub trait Host {
    /// Container size, or `None` if the container cannot be mounted into.
    fn viewport(&self) -> Option<Viewport>;

    /// Monotonic clock in milliseconds.
    fn now_ms(&self) -> f64;

    /// Ask for one frame callback on the next display refresh.
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);

    fn add_resize_listener(&mut self) -> ListenerId;
    fn remove_resize_listener(&mut self, id: ListenerId);

    fn mount_overlay(&mut self);
    fn set_overlay_text(&mut self, text: &str);
    fn unmount_overlay(&mut self);

    /// Memory usage when the host exposes it.
    fn heap_usage(&self) -> Option<HeapUsage> {
        None
    }
}

/// Counters for the last submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderInfo {
    pub draw_calls: u32,
    pub triangles: u64,
    pub points: u64,
    pub lines: u64,
}

/// One frame's worth of input for the renderer.
pub struct FrameView<'a> {
    pub scene: &'a Scene,
    /// Instances whose transforms changed since the last frame.
    pub dirty: Range<usize>,
    /// Overlay block published by the previous frame, empty before it.
    pub overlay: &'a str,
    /// Output pixels per logical pixel.
    pub pixel_ratio: f64,
}

pub trait Renderer {
    type Timer: TimerQueries;

    /// Hand out the timer-query capability, if the context has one.
    /// Called once, right after the surface is acquired.
    fn take_timer_queries(&mut self) -> Option<Self::Timer>;

    /// Upload geometry, material and the full instance set.
    fn prepare(&mut self, scene: &Scene);

    /// Submit one frame. `timer` is present while a GPU query is recording.
    fn render(&mut self, frame: &FrameView<'_>, timer: Option<&mut Self::Timer>) -> RenderInfo;

    fn resize(&mut self, size: SurfaceSize);

    /// Free geometry, material and GPU resources. Must tolerate repeat calls.
    fn release(&mut self);
}
