//! Tilde-zero spectrum synthesis (static until wind, noise or size change).

use log::debug;

use super::field::{SpectrumField, SpectrumSample};
use super::kernels::{mirror_index, phillips, tilde_zero, wave_vector};
use super::pass::{OceanPass, PassSlot, PassState};
use crate::error::Result;
use crate::noise::{NoiseId, NoiseSource};
use crate::params::{Resolution, SpectrumParameters};

/// Everything the spectrum depends on
#[derive(Debug, Clone, Copy, PartialEq)]
struct SpectrumKey {
    resolution: Resolution,
    params: SpectrumParameters,
    noise: NoiseId,
}

#[derive(Debug, Default)]
pub struct SpectrumPass {
    slot: PassSlot<Resolution, SpectrumField>,
    params: Option<SpectrumParameters>,
    noise: Option<NoiseSource>,
    rendered: Option<SpectrumKey>,
    computations: u64,
}

impl SpectrumPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a copy of the inputs; the noise is copied only when its identity changes
    pub fn upload(&mut self, params: &SpectrumParameters, noise: &NoiseSource) {
        if self.noise.as_ref().map(NoiseSource::id) != Some(noise.id()) {
            debug!("spectrum: uploading {0}x{0} noise", noise.size());
            self.noise = Some(noise.clone());
        }
        self.params = Some(*params);
    }

    pub fn configure_pass(&mut self, resolution: Resolution) -> Result<bool> {
        let label = self.label();
        let reallocated = self
            .slot
            .configure_with(label, &resolution, |r| SpectrumField::try_new(r.size()))?;
        if reallocated {
            self.rendered = None;
        }
        Ok(reallocated)
    }

    pub fn noise(&self) -> Option<&NoiseSource> {
        self.noise.as_ref()
    }

    pub fn params(&self) -> Option<&SpectrumParameters> {
        self.params.as_ref()
    }

    /// Recompute the spectrum if any input changed since the last render
    ///
    /// Returns whether a valid spectrum is available afterwards.
    pub fn render(&mut self) -> bool {
        if !self.is_valid_pass() {
            return false;
        }
        let (Some(&resolution), Some(params), Some(noise)) =
            (self.slot.config(), self.params, self.noise.as_ref())
        else {
            return false;
        };

        let key = SpectrumKey {
            resolution,
            params,
            noise: noise.id(),
        };
        if self.rendered == Some(key) {
            return true;
        }

        let Some(field) = self.slot.get_mut() else {
            return false;
        };
        synthesize(field, &params, noise);
        self.rendered = Some(key);
        self.computations += 1;
        true
    }

    /// Whether the next `render` recomputes
    pub fn is_dirty(&self) -> bool {
        match (self.slot.config(), self.params, self.noise.as_ref()) {
            (Some(&resolution), Some(params), Some(noise)) => {
                self.rendered
                    != Some(SpectrumKey {
                        resolution,
                        params,
                        noise: noise.id(),
                    })
            }
            _ => true,
        }
    }

    pub fn output(&self) -> Option<&SpectrumField> {
        self.rendered.and(self.slot.get())
    }

    /// Number of times the spectrum was recomputed
    pub fn computation_count(&self) -> u64 {
        self.computations
    }
}

impl OceanPass for SpectrumPass {
    fn label(&self) -> &'static str {
        "spectrum"
    }

    fn state(&self) -> PassState {
        self.slot.state()
    }

    fn is_valid_pass(&self) -> bool {
        match (self.slot.config(), self.noise.as_ref()) {
            (Some(resolution), Some(noise)) => {
                self.params.is_some() && noise.size() == resolution.size()
            }
            _ => false,
        }
    }

    fn release(&mut self) {
        self.slot.release();
        self.rendered = None;
    }
}

/// One dispatch over the grid
///
/// The mirrored amplitude is evaluated from the noise at the mirrored cell,
/// so `field[k].h0_mirror_conj == conj(field[-k].h0)` holds exactly.
fn synthesize(field: &mut SpectrumField, params: &SpectrumParameters, noise: &NoiseSource) {
    let size = field.size();
    let amplitude_at = |x: u32, y: u32| {
        let k = wave_vector(x, y, size, params.patch_length_m);
        tilde_zero(phillips(k, params), noise.sample(x, y))
    };

    for y in 0..size {
        for x in 0..size {
            let h0 = amplitude_at(x, y);
            let mirror = amplitude_at(mirror_index(x, size), mirror_index(y, size));
            field.set(
                x,
                y,
                SpectrumSample {
                    h0,
                    h0_mirror_conj: mirror.conj(),
                },
            );
        }
    }
}
