//! Stress Core
//!
//! Host-agnostic instanced rendering stress harness:
//! - Run parameters from a query string
//! - Scene construction and per-frame instance animation
//! - Render loop state machine and the fixed per-frame pipeline
//! - Text overlay formatting
//! - Mount/teardown lifecycle against a [`Host`] container
//!
//! The GPU backend plugs in through [`Renderer`].

pub mod animator;
pub mod host;
pub mod lifecycle;
pub mod math;
pub mod overlay;
pub mod params;
pub mod render_loop;
pub mod scene;
pub mod viewport;

pub use glam;

pub use host::{FrameHandle, FrameView, HeapUsage, Host, ListenerId, RenderInfo, Renderer};
pub use lifecycle::{Harness, MountError, MountOptions};
pub use params::StressParameters;
pub use render_loop::{FramePipeline, LoopState, RenderLoop};
pub use scene::{Scene, SceneBuilder};
pub use viewport::{SurfaceSize, Viewport};

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
