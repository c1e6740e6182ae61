//! Advance the static spectrum to time t.

use super::field::{Channel, ComplexGrid, SpectrumField, TimeEvolvedField};
use super::kernels::{evolve, wave_vector};
use super::pass::{OceanPass, PassSlot, PassState};
use crate::error::Result;
use crate::params::{Resolution, SpectrumParameters};

#[derive(Debug, Default)]
pub struct TimeEvolutionPass {
    slot: PassSlot<Resolution, TimeEvolvedField>,
    rendered: bool,
}

impl TimeEvolutionPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure_pass(&mut self, resolution: Resolution) -> Result<bool> {
        let label = self.label();
        let reallocated = self
            .slot
            .configure_with(label, &resolution, |r| TimeEvolvedField::try_new(r.size()))?;
        if reallocated {
            self.rendered = false;
        }
        Ok(reallocated)
    }

    /// Fill the three channels from the spectrum at `time_s`
    pub fn render(&mut self, spectrum: &SpectrumField, params: &SpectrumParameters, time_s: f32) -> bool {
        if !self.is_valid_pass() {
            return false;
        }
        let Some(evolved) = self.slot.get_mut() else {
            return false;
        };
        if evolved.size() != spectrum.size() {
            return false;
        }

        let size = spectrum.size();
        let [height, x_channel, z_channel] = evolved.channels_mut();
        for (x, y, sample) in spectrum.iter_cells() {
            let k = wave_vector(x, y, size, params.patch_length_m);
            let [h, dx, dz] = evolve(sample.h0, sample.h0_mirror_conj, k, time_s, params.gravity_m_per_s2);
            height.set(x, y, h);
            x_channel.set(x, y, dx);
            z_channel.set(x, y, dz);
        }

        self.rendered = true;
        true
    }

    pub fn output(&self) -> Option<&TimeEvolvedField> {
        self.slot.get().filter(|_| self.rendered)
    }

    pub fn channel(&self, channel: Channel) -> Option<&ComplexGrid> {
        self.output().map(|field| field.channel(channel))
    }
}

impl OceanPass for TimeEvolutionPass {
    fn label(&self) -> &'static str {
        "time_evolution"
    }

    fn state(&self) -> PassState {
        self.slot.state()
    }

    fn is_valid_pass(&self) -> bool {
        self.slot.state() == PassState::Configured
    }

    fn release(&mut self) {
        self.slot.release();
        self.rendered = false;
    }
}
