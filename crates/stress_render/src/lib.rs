//! Stress Render
//!
//! wgpu backend for the stress harness: instanced cube renderer, egui text
//! overlay, timestamp query timer, adapter capability probe and window
//! configuration.

pub mod backend;
pub mod overlay;
pub mod renderer;
pub mod timestamp;
pub mod window;

pub use renderer::WgpuRenderer;
pub use timestamp::WgpuTimerQueries;
pub use wgpu;
pub use winit;

use thiserror::Error;

/// What the adapter offers beyond the baseline the harness relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub supports_timestamp_query: bool,
    /// Largest single buffer the device accepts, in bytes.
    pub max_buffer_size: u64,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible graphics adapter found")]
    NoAdapter,
    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported texture formats")]
    IncompatibleSurface,
}
