//! winit application driving the harness

use crate::host::WinitHost;
use crate::settings::HarnessSettings;
use std::sync::Arc;
use stress_core::{Harness, MountOptions, StressParameters};
use stress_render::window::window_attributes;
use stress_render::WgpuRenderer;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::WindowId;

pub struct App {
    params: StressParameters,
    settings: HarnessSettings,
    host: Option<WinitHost>,
    harness: Option<Harness<WgpuRenderer>>,
    failure: Option<anyhow::Error>,
}

impl App {
    pub fn new(params: StressParameters, settings: HarnessSettings) -> Self {
        Self {
            params,
            settings,
            host: None,
            harness: None,
            failure: None,
        }
    }

    /// Error that stopped the event loop, if any.
    pub fn finish(self) -> anyhow::Result<()> {
        self.failure.map_or(Ok(()), Err)
    }

    fn mount(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let config = self.settings.window_config();
        let window = Arc::new(event_loop.create_window(window_attributes(&config))?);
        let mut host = WinitHost::new(window.clone(), config.title);

        let vsync = self.settings.vsync;
        let harness = Harness::mount(&mut host, self.params, MountOptions::default(), |size| {
            pollster::block_on(WgpuRenderer::new(window, size, vsync))
        })?;

        self.host = Some(host);
        self.harness = Some(harness);
        Ok(())
    }

    fn teardown(&mut self) {
        if let (Some(host), Some(harness)) = (self.host.as_mut(), self.harness.as_mut()) {
            harness.teardown(host);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.host.is_some() || self.failure.is_some() {
            return;
        }
        if let Err(err) = self.mount(event_loop) {
            tracing::error!(error = %err, "failed to start stress harness");
            self.failure = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let (Some(host), Some(harness)) = (self.host.as_mut(), self.harness.as_mut()) else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                harness.teardown(host);
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if host.is_listening_for_resize() {
                    harness.on_resize(host);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(handle) = host.take_pending_frame() {
                    harness.on_frame(host, handle);
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}
