//! Render loop
//!
//! [`RenderLoop`] is the scheduling state machine: it holds the handle of
//! the one pending frame callback and refuses to reschedule once cancelled.
//! [`FramePipeline`] is the work done in each callback, always in the same
//! order: frame timer, animation, GPU timer begin, render, GPU timer
//! end/poll, overlay.

use crate::animator::InstanceAnimator;
use crate::host::{FrameHandle, FrameView, Host, RenderInfo, Renderer};
use crate::overlay::OverlayReport;
use crate::params::StressParameters;
use crate::scene::Scene;
use stress_metrics::{FrameTimer, GpuTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Cancelled,
}

#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    pending: Option<FrameHandle>,
    frames: u64,
}

impl RenderLoop {
    /// Enter `Running` and schedule the first frame.
    pub fn start<H: Host>(host: &mut H) -> Self {
        let handle = host.request_frame();
        Self {
            state: LoopState::Running,
            pending: Some(handle),
            frames: 0,
        }
    }

    /// Enter `Cancelled` and drop the pending callback. Safe to repeat.
    pub fn stop<H: Host>(&mut self, host: &mut H) {
        if let Some(handle) = self.pending.take() {
            host.cancel_frame(handle);
        }
        self.state = LoopState::Cancelled;
    }

    /// Claim a delivered callback. Stale or post-cancel callbacks are refused.
    pub fn accept(&mut self, handle: FrameHandle) -> bool {
        if self.state != LoopState::Running || self.pending != Some(handle) {
            return false;
        }
        self.pending = None;
        self.frames += 1;
        true
    }

    /// Schedule the next callback unless cancelled meanwhile.
    pub fn schedule_next<H: Host>(&mut self, host: &mut H) {
        if self.state == LoopState::Running && self.pending.is_none() {
            self.pending = Some(host.request_frame());
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Callbacks accepted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Everything a frame touches, owned in one place.
pub struct FramePipeline<R: Renderer> {
    params: StressParameters,
    scene: Scene,
    animator: InstanceAnimator,
    frame_timer: FrameTimer,
    gpu_timer: GpuTimer<R::Timer>,
    renderer: R,
    clock_origin_ms: Option<f64>,
    last_render: RenderInfo,
    overlay_text: String,
}

impl<R: Renderer> FramePipeline<R> {
    pub fn new(
        params: StressParameters,
        scene: Scene,
        mut renderer: R,
        start_ms: f64,
    ) -> Self {
        renderer.prepare(&scene);
        let gpu_timer = GpuTimer::new(renderer.take_timer_queries());
        Self {
            animator: InstanceAnimator::new(&params),
            params,
            scene,
            frame_timer: FrameTimer::new(start_ms),
            gpu_timer,
            renderer,
            clock_origin_ms: None,
            last_render: RenderInfo::default(),
            overlay_text: String::new(),
        }
    }

    /// Run one frame at `now_ms` and publish the overlay.
    pub fn run_frame<H: Host>(&mut self, host: &mut H, now_ms: f64) {
        self.frame_timer.tick(now_ms);

        let origin = *self.clock_origin_ms.get_or_insert(now_ms);
        let t = self.animator.scaled_time((now_ms - origin) / 1000.0);

        self.animator.orbit_camera(&mut self.scene, t);
        self.animator.spin_mesh(&mut self.scene);
        let dirty = self.animator.perturb(&mut self.scene, t);

        let pixel_ratio = host.viewport().map_or(1.0, |v| v.pixel_ratio());
        self.gpu_timer.begin();
        let frame = FrameView {
            scene: &self.scene,
            dirty,
            overlay: &self.overlay_text,
            pixel_ratio,
        };
        self.last_render = self.renderer.render(&frame, self.gpu_timer.recording());
        self.gpu_timer.end();
        self.gpu_timer.poll();

        self.overlay_text = self.report(host).render();
        host.set_overlay_text(&self.overlay_text);
    }

    pub fn report<H: Host>(&self, host: &H) -> OverlayReport {
        let (min_ms, max_ms) = self.frame_timer.frame_time_range_ms();
        OverlayReport {
            params: self.params,
            fps: self.frame_timer.fps(),
            avg_fps: self.frame_timer.rolling_fps(),
            frame_ms: self.frame_timer.frame_time_ms(),
            min_ms,
            max_ms,
            gpu_ms: self.gpu_timer.last_result_ms(),
            render: self.last_render,
            device_pixel_ratio: host.viewport().map_or(1.0, |v| v.device_pixel_ratio),
            heap: host.heap_usage(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn frame_timer(&self) -> &FrameTimer {
        &self.frame_timer
    }

    pub fn gpu_timer(&self) -> &GpuTimer<R::Timer> {
        &self.gpu_timer
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Overlay block from the most recent frame.
    pub fn overlay_text(&self) -> &str {
        &self.overlay_text
    }

    pub fn last_render(&self) -> RenderInfo {
        self.last_render
    }

    /// Discard any in-flight GPU query and free renderer resources.
    pub fn release(&mut self) {
        self.gpu_timer.release();
        self.renderer.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HeapUsage, ListenerId};
    use crate::viewport::Viewport;

    #[derive(Default)]
    struct SchedulerHost {
        next: u64,
        requested: Vec<FrameHandle>,
        cancelled: Vec<FrameHandle>,
    }

    impl Host for SchedulerHost {
        fn viewport(&self) -> Option<Viewport> {
            Some(Viewport::new(640.0, 480.0, 1.0))
        }
        fn now_ms(&self) -> f64 {
            0.0
        }
        fn request_frame(&mut self) -> FrameHandle {
            self.next += 1;
            let handle = FrameHandle(self.next);
            self.requested.push(handle);
            handle
        }
        fn cancel_frame(&mut self, handle: FrameHandle) {
            self.cancelled.push(handle);
        }
        fn add_resize_listener(&mut self) -> ListenerId {
            ListenerId(0)
        }
        fn remove_resize_listener(&mut self, _id: ListenerId) {}
        fn mount_overlay(&mut self) {}
        fn set_overlay_text(&mut self, _text: &str) {}
        fn unmount_overlay(&mut self) {}
        fn heap_usage(&self) -> Option<HeapUsage> {
            None
        }
    }

    #[test]
    fn start_schedules_one_frame() {
        let mut host = SchedulerHost::default();
        let render_loop = RenderLoop::start(&mut host);
        assert!(render_loop.is_running());
        assert_eq!(render_loop.pending(), Some(FrameHandle(1)));
        assert_eq!(host.requested.len(), 1);
    }

    #[test]
    fn accept_then_reschedule() {
        let mut host = SchedulerHost::default();
        let mut render_loop = RenderLoop::start(&mut host);

        assert!(render_loop.accept(FrameHandle(1)));
        assert_eq!(render_loop.pending(), None);
        render_loop.schedule_next(&mut host);
        assert_eq!(render_loop.pending(), Some(FrameHandle(2)));
        assert_eq!(render_loop.frames(), 1);
    }

    #[test]
    fn stale_handles_are_refused() {
        let mut host = SchedulerHost::default();
        let mut render_loop = RenderLoop::start(&mut host);
        assert!(!render_loop.accept(FrameHandle(99)));
        assert_eq!(render_loop.frames(), 0);
    }

    #[test]
    fn stop_cancels_pending_and_blocks_rescheduling() {
        let mut host = SchedulerHost::default();
        let mut render_loop = RenderLoop::start(&mut host);

        render_loop.stop(&mut host);
        assert_eq!(render_loop.state(), LoopState::Cancelled);
        assert_eq!(host.cancelled, vec![FrameHandle(1)]);
        assert!(!render_loop.accept(FrameHandle(1)));

        render_loop.schedule_next(&mut host);
        assert_eq!(host.requested.len(), 1);

        render_loop.stop(&mut host);
        assert_eq!(host.cancelled.len(), 1);
    }

    #[test]
    fn stop_mid_frame_prevents_next_schedule() {
        let mut host = SchedulerHost::default();
        let mut render_loop = RenderLoop::start(&mut host);
        assert!(render_loop.accept(FrameHandle(1)));

        render_loop.stop(&mut host);
        render_loop.schedule_next(&mut host);

        assert_eq!(render_loop.pending(), None);
        assert!(host.cancelled.is_empty());
        assert_eq!(host.requested.len(), 1);
    }
}
