//! Native window host
//!
//! A winit window stands in for the container: its inner size and scale
//! factor give the viewport, redraw requests are the frame callbacks, and
//! the overlay text is drawn by the renderer and summarized in the window
//! title. Memory figures are sampled at the same once-a-second cadence the
//! title is refreshed at.

use std::sync::Arc;
use std::time::{Duration, Instant};
use stress_core::{FrameHandle, HeapUsage, Host, ListenerId, Viewport};
use stress_env::{ProcessMemory, SystemMemory};
use winit::window::Window;

const OVERLAY_PUBLISH_INTERVAL: Duration = Duration::from_secs(1);

/// Whether a throttled refresh last done at `last` is due again at `now`.
fn refresh_due(last: Option<Instant>, now: Instant) -> bool {
    !last.is_some_and(|last| now.duration_since(last) < OVERLAY_PUBLISH_INTERVAL)
}

fn sample_heap() -> Option<HeapUsage> {
    let process = ProcessMemory::sample()?;
    Some(HeapUsage {
        used: process.resident,
        total: process.reserved,
        limit: SystemMemory::detect().total_ram.unwrap_or(process.reserved),
    })
}

/// Window title carrying the FPS, CPU and GPU lines of the overlay.
fn status_title(base: &str, overlay: &str) -> String {
    let status: Vec<String> = overlay
        .lines()
        .filter(|line| ["FPS:", "CPU:", "GPU:"].iter().any(|p| line.starts_with(p)))
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    if status.is_empty() {
        base.to_string()
    } else {
        format!("{base} | {}", status.join(" | "))
    }
}

pub struct WinitHost {
    window: Arc<Window>,
    base_title: String,
    clock: Instant,
    next_frame: u64,
    pending: Option<FrameHandle>,
    next_listener: u64,
    resize_listener: Option<ListenerId>,
    overlay_mounted: bool,
    last_publish: Option<Instant>,
    heap: Option<HeapUsage>,
}

impl WinitHost {
    pub fn new(window: Arc<Window>, base_title: impl Into<String>) -> Self {
        Self {
            window,
            base_title: base_title.into(),
            clock: Instant::now(),
            next_frame: 0,
            pending: None,
            next_listener: 0,
            resize_listener: None,
            overlay_mounted: false,
            last_publish: None,
            heap: sample_heap(),
        }
    }

    /// Claim the frame callback a redraw event stands for.
    pub fn take_pending_frame(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    pub fn is_listening_for_resize(&self) -> bool {
        self.resize_listener.is_some()
    }
}

impl Host for WinitHost {
    fn viewport(&self) -> Option<Viewport> {
        let size = self.window.inner_size();
        let scale = self.window.scale_factor();
        Some(Viewport::new(
            f64::from(size.width) / scale,
            f64::from(size.height) / scale,
            scale,
        ))
    }

    fn now_ms(&self) -> f64 {
        self.clock.elapsed().as_secs_f64() * 1000.0
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next_frame += 1;
        let handle = FrameHandle(self.next_frame);
        self.pending = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.resize_listener = Some(id);
        id
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        if self.resize_listener == Some(id) {
            self.resize_listener = None;
        }
    }

    fn mount_overlay(&mut self) {
        self.overlay_mounted = true;
        self.last_publish = None;
    }

    fn set_overlay_text(&mut self, text: &str) {
        if !self.overlay_mounted {
            return;
        }
        let now = Instant::now();
        if !refresh_due(self.last_publish, now) {
            return;
        }
        self.last_publish = Some(now);
        self.heap = sample_heap();
        self.window.set_title(&status_title(&self.base_title, text));
        tracing::debug!("\n{text}");
    }

    fn unmount_overlay(&mut self) {
        if self.overlay_mounted {
            self.overlay_mounted = false;
            self.window.set_title(&self.base_title);
        }
    }

    fn heap_usage(&self) -> Option<HeapUsage> {
        self.heap
    }
}
