//! fft-ocean - tileable ocean surfaces from a Phillips spectrum and an inverse FFT
//!
//! Two interchangeable backends implement [`ocean::OceanBackend`]:
//! [`ocean::OceanRenderer`] on the CPU and [`gpu::GpuOceanRenderer`] on wgpu
//! compute shaders.

pub mod cli;
pub mod error;
pub mod gpu;
pub mod noise;
pub mod ocean;
pub mod params;
pub mod present;
