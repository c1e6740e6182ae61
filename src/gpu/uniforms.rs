//! Uniform and storage element layouts shared with the WGSL shaders.
//!
//! Every uniform is padded to a multiple of 16 bytes.

use bytemuck::{Pod, Zeroable};

use crate::params::SpectrumParameters;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SpectrumUniforms {
    pub wind: [f32; 2],
    pub amplitude: f32,
    pub patch_length: f32,
    pub gravity: f32,
    pub cutoff: f32,
    pub size: u32,
    pub _padding: u32,
}

impl SpectrumUniforms {
    pub fn new(params: &SpectrumParameters, size: u32) -> Self {
        Self {
            wind: params.wind_velocity.to_array(),
            amplitude: params.wave_amplitude,
            patch_length: params.patch_length_m,
            gravity: params.gravity_m_per_s2,
            cutoff: params.small_wave_cutoff_m,
            size,
            _padding: 0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TwiddleUniforms {
    pub size: u32,
    pub stage_count: u32,
    pub _padding: [u32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct EvolutionUniforms {
    pub time: f32,
    pub patch_length: f32,
    pub gravity: f32,
    pub size: u32,
}

/// One butterfly stage; a separate buffer exists per stage
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ButterflyUniforms {
    pub stage: u32,
    /// 0 = rows, 1 = columns
    pub axis: u32,
    /// 1 conjugates the twiddle
    pub inverse: u32,
    pub size: u32,
    pub scale: f32,
    pub cell_count: u32,
    pub _padding: [u32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DisplacementUniforms {
    pub size: u32,
    pub cell_count: u32,
    pub _padding: [u32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct NormalUniforms {
    pub size: u32,
    pub cell_size: f32,
    pub strength: f32,
    pub _padding: u32,
}

/// Twiddle table element: root of unity and (top, bottom) source lanes
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GpuTwiddle {
    pub w: [f32; 2],
    pub lanes: [u32; 2],
}
