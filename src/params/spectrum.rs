//! Wind and wave parameters for the Phillips spectrum.

use glam::Vec2;

use crate::error::{OceanError, Result};

/// Standard gravitational acceleration (m/s²)
pub const STANDARD_GRAVITY_M_PER_S2: f32 = 9.81;

/// Spectrum synthesis parameters
///
/// Equality is structural: the spectrum pass re-runs only when a value
/// differs from the last rendered set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumParameters {
    /// Wind velocity over the patch (m/s)
    /// Direction aligns the waves, magnitude sets the largest wave length V²/g
    pub wind_velocity: Vec2,

    /// Phillips amplitude constant A (dimensionless scale on spectral energy)
    pub wave_amplitude: f32,

    /// Side length of the simulated tileable patch (meters)
    pub patch_length_m: f32,

    /// Gravitational acceleration used by the spectrum and dispersion relation (m/s²)
    pub gravity_m_per_s2: f32,

    /// Waves shorter than roughly this length are damped (meters)
    /// Formula: P(k) *= exp(-|k|² · cutoff²)
    pub small_wave_cutoff_m: f32,
}

impl Default for SpectrumParameters {
    fn default() -> Self {
        Self {
            wind_velocity: Vec2::new(10.0, 0.0),
            wave_amplitude: 1.0,
            patch_length_m: 250.0, // ~1m cells at 256x256
            gravity_m_per_s2: STANDARD_GRAVITY_M_PER_S2,
            small_wave_cutoff_m: 0.1,
        }
    }
}

impl SpectrumParameters {
    /// Create parameters with the given wind and amplitude, other fields default
    pub fn new(wind_velocity: Vec2, wave_amplitude: f32) -> Self {
        Self {
            wind_velocity,
            wave_amplitude,
            ..Self::default()
        }
    }

    /// Largest wave arising from a continuous wind of this speed (meters)
    pub fn largest_wave_m(&self) -> f32 {
        self.wind_velocity.length_squared() / self.gravity_m_per_s2
    }

    /// Reject values the spectrum kernels are undefined for
    pub fn validate(&self) -> Result<()> {
        if !self.wind_velocity.is_finite() {
            return Err(OceanError::InvalidParameter {
                name: "wind_velocity",
                value: self.wind_velocity.length(),
            });
        }
        if !self.wave_amplitude.is_finite() || self.wave_amplitude < 0.0 {
            return Err(OceanError::InvalidParameter {
                name: "wave_amplitude",
                value: self.wave_amplitude,
            });
        }
        if !self.patch_length_m.is_finite() || self.patch_length_m <= 0.0 {
            return Err(OceanError::InvalidParameter {
                name: "patch_length_m",
                value: self.patch_length_m,
            });
        }
        if !self.gravity_m_per_s2.is_finite() || self.gravity_m_per_s2 <= 0.0 {
            return Err(OceanError::InvalidParameter {
                name: "gravity_m_per_s2",
                value: self.gravity_m_per_s2,
            });
        }
        if !self.small_wave_cutoff_m.is_finite() || self.small_wave_cutoff_m < 0.0 {
            return Err(OceanError::InvalidParameter {
                name: "small_wave_cutoff_m",
                value: self.small_wave_cutoff_m,
            });
        }
        Ok(())
    }
}
