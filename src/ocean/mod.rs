//! FFT ocean pipeline.
//!
//! Pass chain, in dependency order every frame:
//! spectrum → time evolution → (twiddle table) → inverse FFT →
//! displacement → normals.

mod evolution;
mod field;
mod ifft;
pub mod kernels;
mod pass;
mod renderer;
mod spectrum;
mod surface;
mod twiddle;

pub use evolution::TimeEvolutionPass;
pub use field::{
    Channel, ComplexGrid, DisplacementField, Grid, NormalField, SpectrumField, SpectrumSample,
    TimeEvolvedField,
};
pub use ifft::{butterfly_stage, transform, FftAxis, InverseFftPass, PingPong};
pub use kernels::{FftDirection, TwiddleFactor};
pub use pass::{OceanPass, PassSlot, PassState};
pub use renderer::OceanRenderer;
pub use spectrum::SpectrumPass;
pub use surface::{SurfaceDisplacementPass, SurfaceNormalPass};
pub use twiddle::{TwiddleFactorPass, TwiddleTable};

use crate::error::Result;
use crate::noise::NoiseSource;
use crate::params::SpectrumParameters;

/// Final fields of one evaluated frame, borrowed until the next call
#[derive(Debug, Clone, Copy)]
pub struct SurfaceMaps<'a> {
    pub displacement: &'a DisplacementField,
    pub normal: &'a NormalField,
}

/// Owned copies of the intermediate results of the last frame
#[derive(Debug, Clone, PartialEq)]
pub struct DebugTaps {
    pub spectrum: SpectrumField,
    pub twiddles: TwiddleTable,
    pub time_evolved: TimeEvolvedField,
    /// Spatial-domain channels, indexed by [`Channel::index`]
    pub inverse_transform: [ComplexGrid; 3],
}

/// Boundary shared by the CPU and GPU renderers
pub trait OceanBackend {
    /// Size the pipeline; equal dimensions perform no reallocation
    fn configure(&mut self, width: u32, height: u32) -> Result<()>;

    fn set_spectrum_parameters(&mut self, params: &SpectrumParameters, noise: &NoiseSource) -> Result<()>;

    /// `Ok(None)` when there is nothing to render this frame
    fn evaluate(&mut self, time_s: f32, normal_strength: f32) -> Result<Option<SurfaceMaps<'_>>>;

    /// Intermediate results of the last rendered frame, if any
    fn debug_taps(&mut self) -> Result<Option<DebugTaps>>;
}
