// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization for the display sink.
//!
//! Creates a standalone wgpu device. Any backend wgpu finds is accepted; headless
//! machines without an adapter get [`DisplayError::AdapterUnavailable`] so callers
//! can fall back to a CPU sink.

use crate::errors::DisplayError;
use tracing::{debug, info};

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, GL)
    pub backend: wgpu::Backend,
}

/// Create a wgpu device and queue for rendering the preview.
pub async fn create_display_device(
    label: &str,
) -> Result<(wgpu::Device, wgpu::Queue, GpuDeviceInfo), DisplayError> {
    info!(label = label, "Creating GPU device for display");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| DisplayError::AdapterUnavailable(e.to_string()))?;

    let adapter_info = adapter.get_info();
    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected for display"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| DisplayError::DeviceCreation(e.to_string()))?;

    debug!(
        max_texture = device.limits().max_texture_dimension_2d,
        "Display device created"
    );

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
    };

    Ok((device, queue, info))
}
