//! CPU reference backend: runs the pass chain serially each frame.

use log::{debug, info, warn};

use super::evolution::TimeEvolutionPass;
use super::field::{Channel, ComplexGrid, DisplacementField, NormalField, SpectrumField};
use super::ifft::InverseFftPass;
use super::pass::OceanPass;
use super::spectrum::SpectrumPass;
use super::surface::{SurfaceDisplacementPass, SurfaceNormalPass};
use super::twiddle::{TwiddleFactorPass, TwiddleTable};
use super::{DebugTaps, OceanBackend, SurfaceMaps};
use crate::error::{OceanError, Result};
use crate::noise::NoiseSource;
use crate::params::{Resolution, SpectrumParameters};

/// Owns every pass and threads each output into the next
#[derive(Debug, Default)]
pub struct OceanRenderer {
    resolution: Option<Resolution>,
    spectrum: SpectrumPass,
    twiddle: TwiddleFactorPass,
    evolution: TimeEvolutionPass,
    ifft: InverseFftPass,
    displacement: SurfaceDisplacementPass,
    normal: SurfaceNormalPass,
    allocation_generation: u64,
    skipped_frames: u32,
}

impl OceanRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size every pass for a `width`×`height` grid
    ///
    /// Identical dimensions are a no-op. Invalid dimensions leave the
    /// renderer as it was; a failed allocation tears it down.
    pub fn configure(&mut self, width: u32, height: u32) -> Result<()> {
        let resolution = Resolution::new(width, height)?;
        if self.resolution == Some(resolution) {
            return Ok(());
        }

        info!("Configuring ocean pipeline at {width}x{height}");
        if let Err(e) = self.allocate(resolution) {
            self.teardown();
            return Err(e);
        }

        self.resolution = Some(resolution);
        self.allocation_generation += 1;
        self.skipped_frames = 0;
        Ok(())
    }

    fn allocate(&mut self, resolution: Resolution) -> Result<()> {
        self.spectrum.configure_pass(resolution)?;
        self.twiddle.configure_pass(resolution)?;
        self.evolution.configure_pass(resolution)?;
        self.ifft.configure_pass(resolution)?;
        self.displacement.configure_pass(resolution)?;
        self.normal.configure_pass(resolution)?;
        Ok(())
    }

    /// Validate and upload spectrum inputs; the spectrum re-runs on the next
    /// `evaluate` only if something changed
    pub fn set_spectrum_parameters(&mut self, params: &SpectrumParameters, noise: &NoiseSource) -> Result<()> {
        params.validate()?;
        if let Some(resolution) = self.resolution {
            if noise.size() != resolution.size() {
                return Err(OceanError::NoiseResolutionMismatch {
                    expected: resolution.size(),
                    actual: noise.size(),
                });
            }
        }
        self.spectrum.upload(params, noise);
        Ok(())
    }

    /// Run every pass at simulation time `time_s`
    ///
    /// `Ok(None)` means nothing was rendered this frame (unconfigured, or no
    /// noise source matching the configured resolution).
    pub fn evaluate(&mut self, time_s: f32, normal_strength: f32) -> Result<Option<SurfaceMaps<'_>>> {
        if !time_s.is_finite() {
            return Err(OceanError::InvalidParameter {
                name: "time_s",
                value: time_s,
            });
        }
        if !normal_strength.is_finite() {
            return Err(OceanError::InvalidParameter {
                name: "normal_strength",
                value: normal_strength,
            });
        }

        if !self.run_passes(time_s, normal_strength) {
            self.skip_frame();
            return Ok(None);
        }
        self.skipped_frames = 0;
        Ok(self.surface_maps())
    }

    fn run_passes(&mut self, time_s: f32, normal_strength: f32) -> bool {
        let Some(resolution) = self.resolution else {
            return false;
        };
        if !self.spectrum.render() || !self.twiddle.render() {
            return false;
        }

        let (Some(spectrum), Some(&params)) = (self.spectrum.output(), self.spectrum.params()) else {
            return false;
        };
        if !self.evolution.render(spectrum, &params, time_s) {
            return false;
        }

        let (Some(evolved), Some(twiddles)) = (self.evolution.output(), self.twiddle.output()) else {
            return false;
        };
        if !self.ifft.render(evolved, twiddles) {
            return false;
        }

        let (Some(height), Some(x_offset), Some(z_offset)) = (
            self.ifft.output(Channel::Height),
            self.ifft.output(Channel::X),
            self.ifft.output(Channel::Z),
        ) else {
            return false;
        };
        if !self.displacement.render(height, x_offset, z_offset) {
            return false;
        }

        let Some(displacement) = self.displacement.output() else {
            return false;
        };
        let cell_size = params.patch_length_m / resolution.size() as f32;
        self.normal.render(displacement, cell_size, normal_strength)
    }

    fn skip_frame(&mut self) {
        if self.resolution.is_none() {
            return;
        }
        self.skipped_frames += 1;
        if let Err(e) = self.require_noise() {
            debug!("Skipping ocean frame: {e}");
        }
        if self.skipped_frames == 2 {
            warn!(
                "Ocean pipeline configured but skipped {} consecutive frames (no valid noise source?)",
                self.skipped_frames
            );
        }
    }

    fn surface_maps(&self) -> Option<SurfaceMaps<'_>> {
        Some(SurfaceMaps {
            displacement: self.displacement.output()?,
            normal: self.normal.output()?,
        })
    }

    /// Noise source matching the configured resolution
    pub fn require_noise(&self) -> Result<&NoiseSource> {
        let noise = self.spectrum.noise().ok_or(OceanError::MissingNoiseSource)?;
        match self.resolution {
            Some(resolution) if resolution.size() != noise.size() => Err(OceanError::NoiseResolutionMismatch {
                expected: resolution.size(),
                actual: noise.size(),
            }),
            _ => Ok(noise),
        }
    }

    /// Release every pass's resources
    pub fn teardown(&mut self) {
        if self.resolution.is_some() {
            debug!("Tearing down ocean pipeline");
        }
        self.spectrum.release();
        self.twiddle.release();
        self.evolution.release();
        self.ifft.release();
        self.displacement.release();
        self.normal.release();
        self.resolution = None;
        self.skipped_frames = 0;
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    /// Incremented each time pass resources are (re)allocated
    pub fn allocation_generation(&self) -> u64 {
        self.allocation_generation
    }

    /// Consecutive frames skipped since the last rendered one
    pub fn skipped_frames(&self) -> u32 {
        self.skipped_frames
    }

    pub fn spectrum_computations(&self) -> u64 {
        self.spectrum.computation_count()
    }

    pub fn twiddle_computations(&self) -> u64 {
        self.twiddle.computation_count()
    }

    // Debug taps

    pub fn spectrum(&self) -> Option<&SpectrumField> {
        self.spectrum.output()
    }

    pub fn twiddle_table(&self) -> Option<&TwiddleTable> {
        self.twiddle.output()
    }

    pub fn time_evolved(&self, channel: Channel) -> Option<&ComplexGrid> {
        self.evolution.channel(channel)
    }

    pub fn inverse_transform(&self, channel: Channel) -> Option<&ComplexGrid> {
        self.ifft.output(channel)
    }

    pub fn displacement(&self) -> Option<&DisplacementField> {
        self.displacement.output()
    }

    pub fn normal(&self) -> Option<&NormalField> {
        self.normal.output()
    }
}

impl OceanBackend for OceanRenderer {
    fn configure(&mut self, width: u32, height: u32) -> Result<()> {
        Self::configure(self, width, height)
    }

    fn set_spectrum_parameters(&mut self, params: &SpectrumParameters, noise: &NoiseSource) -> Result<()> {
        Self::set_spectrum_parameters(self, params, noise)
    }

    fn evaluate(&mut self, time_s: f32, normal_strength: f32) -> Result<Option<SurfaceMaps<'_>>> {
        Self::evaluate(self, time_s, normal_strength)
    }

    fn debug_taps(&mut self) -> Result<Option<DebugTaps>> {
        let (Some(spectrum), Some(twiddles), Some(evolved)) =
            (self.spectrum.output(), self.twiddle.output(), self.evolution.output())
        else {
            return Ok(None);
        };
        let (Some(height), Some(x_offset), Some(z_offset)) = (
            self.ifft.output(Channel::Height),
            self.ifft.output(Channel::X),
            self.ifft.output(Channel::Z),
        ) else {
            return Ok(None);
        };

        Ok(Some(DebugTaps {
            spectrum: spectrum.clone(),
            twiddles: twiddles.clone(),
            time_evolved: evolved.clone(),
            inverse_transform: [height.clone(), x_offset.clone(), z_offset.clone()],
        }))
    }
}
