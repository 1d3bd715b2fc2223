//! Rendering backend capabilities
//!
//! Probed once per adapter; the GPU timer is only offered when the adapter
//! can write timestamps from render passes.

use crate::DeviceCapabilities;

/// Probe available rendering capabilities
pub fn probe_capabilities(adapter: &wgpu::Adapter) -> DeviceCapabilities {
    let info = adapter.get_info();
    let caps = DeviceCapabilities {
        supports_timestamp_query: adapter.features().contains(wgpu::Features::TIMESTAMP_QUERY),
        max_buffer_size: adapter.limits().max_buffer_size,
    };
    tracing::info!(
        backend = ?info.backend,
        adapter = %info.name,
        timestamp_query = caps.supports_timestamp_query,
        max_buffer_size = caps.max_buffer_size,
        "graphics adapter selected"
    );
    caps
}

/// Optional features to request from the device.
pub fn required_features(caps: &DeviceCapabilities) -> wgpu::Features {
    if caps.supports_timestamp_query {
        wgpu::Features::TIMESTAMP_QUERY
    } else {
        wgpu::Features::empty()
    }
}

/// Default limits, with the buffer ceiling set to what the adapter allows.
pub fn required_limits(caps: &DeviceCapabilities) -> wgpu::Limits {
    wgpu::Limits {
        max_buffer_size: caps.max_buffer_size,
        ..wgpu::Limits::default()
    }
}
