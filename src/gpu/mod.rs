//! wgpu compute backend.
//!
//! Same pass chain as the CPU renderer, expressed as WGSL compute shaders
//! over storage buffers. One command encoder records every dispatch of a
//! frame; the two surface fields are read back after submission.

mod helpers;
mod renderer;
mod uniforms;

pub use renderer::GpuOceanRenderer;

use log::{error, info};

use crate::error::{OceanError, Result};

/// Headless device and queue
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    adapter_name: String,
}

impl GpuContext {
    /// Request a compute-capable device without a surface
    pub async fn new_headless() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(OceanError::AdapterUnavailable)?;

        let adapter_name = adapter.get_info().name;
        info!("Using GPU adapter: {adapter_name}");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Ocean Compute Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| OceanError::Device(e.to_string()))?;

        device.on_uncaptured_error(Box::new(|e| {
            error!("Uncaptured GPU error: {e}");
        }));

        Ok(Self {
            device,
            queue,
            adapter_name,
        })
    }

    /// Blocking variant of [`GpuContext::new_headless`]
    pub fn request() -> Result<Self> {
        pollster::block_on(Self::new_headless())
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }
}
