//! Harness lifecycle
//!
//! Mounting acquires the output surface, shows the overlay, builds the
//! scene, starts the render loop and listens for resizes. Teardown undoes
//! all of it, may run at any time and may run more than once.

use crate::host::{FrameHandle, Host, ListenerId, Renderer};
use crate::params::StressParameters;
use crate::render_loop::{FramePipeline, LoopState, RenderLoop};
use crate::scene::{Scene, SceneBuilder};
use crate::viewport::{resize_camera, SurfaceSize, Viewport};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum MountError {
    #[error("container is missing or has an unusable size")]
    InvalidContainer,
    #[error("failed to acquire output surface")]
    Surface(#[source] BoxError),
}

#[derive(Debug, Clone, Copy)]
pub struct MountOptions {
    /// Seed for the instance scatter.
    pub seed: u64,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self { seed: 0x5EED }
    }
}

pub struct Harness<R: Renderer> {
    pipeline: Option<FramePipeline<R>>,
    render_loop: RenderLoop,
    resize_listener: Option<ListenerId>,
    overlay_mounted: bool,
}

fn usable(viewport: &Viewport) -> bool {
    viewport.width.is_finite()
        && viewport.height.is_finite()
        && viewport.width >= 0.0
        && viewport.height >= 0.0
}

impl<R: Renderer> Harness<R> {
    /// Mount into `host`. Nothing is touched unless the container is usable
    /// and the surface could be acquired.
    pub fn mount<H, F, E>(
        host: &mut H,
        params: StressParameters,
        options: MountOptions,
        create_renderer: F,
    ) -> Result<Self, MountError>
    where
        H: Host,
        F: FnOnce(SurfaceSize) -> Result<R, E>,
        E: Into<BoxError>,
    {
        let viewport = host
            .viewport()
            .filter(usable)
            .ok_or(MountError::InvalidContainer)?;

        let renderer =
            create_renderer(viewport.surface_size()).map_err(|e| MountError::Surface(e.into()))?;
        host.mount_overlay();

        let scene = SceneBuilder::new(params)
            .aspect(viewport.aspect())
            .seed(options.seed)
            .build();
        let pipeline = FramePipeline::new(params, scene, renderer, host.now_ms());

        let render_loop = RenderLoop::start(host);
        let resize_listener = host.add_resize_listener();

        tracing::info!(
            count = params.count,
            size = params.size,
            speed = params.speed,
            gpu_timer = pipeline.gpu_timer().is_supported(),
            "stress harness mounted"
        );

        Ok(Self {
            pipeline: Some(pipeline),
            render_loop,
            resize_listener: Some(resize_listener),
            overlay_mounted: true,
        })
    }

    /// Frame callback from the host. Returns whether a frame ran.
    pub fn on_frame<H: Host>(&mut self, host: &mut H, handle: FrameHandle) -> bool {
        if !self.render_loop.accept(handle) {
            return false;
        }
        let Some(pipeline) = self.pipeline.as_mut() else {
            return false;
        };
        let now_ms = host.now_ms();
        pipeline.run_frame(host, now_ms);
        self.render_loop.schedule_next(host);
        true
    }

    /// Resize callback from the host.
    pub fn on_resize<H: Host>(&mut self, host: &mut H) {
        if self.resize_listener.is_none() {
            return;
        }
        let (Some(pipeline), Some(viewport)) = (self.pipeline.as_mut(), host.viewport()) else {
            return;
        };
        let size = resize_camera(&mut pipeline.scene_mut().camera, &viewport);
        pipeline.renderer_mut().resize(size);
    }

    /// Cancel the loop, stop listening, release GPU resources and unmount.
    pub fn teardown<H: Host>(&mut self, host: &mut H) {
        self.render_loop.stop(host);
        if let Some(id) = self.resize_listener.take() {
            host.remove_resize_listener(id);
        }
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.release();
            tracing::info!(frames = self.render_loop.frames(), "stress harness torn down");
        }
        if self.overlay_mounted {
            host.unmount_overlay();
            self.overlay_mounted = false;
        }
    }

    pub fn state(&self) -> LoopState {
        self.render_loop.state()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.render_loop.pending()
    }

    pub fn pipeline(&self) -> Option<&FramePipeline<R>> {
        self.pipeline.as_ref()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.pipeline.as_ref().map(FramePipeline::scene)
    }
}
