//! Spatial outputs: packed displacement and derived normals.

use glam::Vec3;

use super::field::{ComplexGrid, DisplacementField, NormalField};
use super::kernels::surface_normal;
use super::pass::{OceanPass, PassSlot, PassState};
use crate::error::Result;
use crate::params::Resolution;

/// Packs (Re Dx, Re h, Re Dz) into one vector field
#[derive(Debug, Default)]
pub struct SurfaceDisplacementPass {
    slot: PassSlot<Resolution, DisplacementField>,
    rendered: bool,
}

impl SurfaceDisplacementPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure_pass(&mut self, resolution: Resolution) -> Result<bool> {
        let label = self.label();
        let reallocated = self
            .slot
            .configure_with(label, &resolution, |r| DisplacementField::try_new(r.size()))?;
        if reallocated {
            self.rendered = false;
        }
        Ok(reallocated)
    }

    pub fn render(&mut self, height: &ComplexGrid, x_offset: &ComplexGrid, z_offset: &ComplexGrid) -> bool {
        if !self.is_valid_pass() {
            return false;
        }
        let Some(field) = self.slot.get_mut() else {
            return false;
        };
        let size = field.size();
        if [height, x_offset, z_offset].iter().any(|grid| grid.size() != size) {
            return false;
        }

        let cells = height.cells().iter().zip(x_offset.cells()).zip(z_offset.cells());
        for (out, ((h, dx), dz)) in field.cells_mut().iter_mut().zip(cells) {
            *out = Vec3::new(dx.re, h.re, dz.re);
        }

        self.rendered = true;
        true
    }

    pub fn output(&self) -> Option<&DisplacementField> {
        self.slot.get().filter(|_| self.rendered)
    }
}

impl OceanPass for SurfaceDisplacementPass {
    fn label(&self) -> &'static str {
        "surface_displacement"
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

/// Central-difference normals with periodic wraparound at the patch edges
#[derive(Debug, Default)]
pub struct SurfaceNormalPass {
    slot: PassSlot<Resolution, NormalField>,
    rendered: bool,
}

impl SurfaceNormalPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure_pass(&mut self, resolution: Resolution) -> Result<bool> {
        let label = self.label();
        let reallocated = self
            .slot
            .configure_with(label, &resolution, |r| NormalField::try_new(r.size()))?;
        if reallocated {
            self.rendered = false;
        }
        Ok(reallocated)
    }

    /// `cell_size` is the world spacing between neighbouring cells (meters)
    pub fn render(&mut self, displacement: &DisplacementField, cell_size: f32, normal_strength: f32) -> bool {
        if !self.is_valid_pass() {
            return false;
        }
        let Some(field) = self.slot.get_mut() else {
            return false;
        };
        if displacement.size() != field.size() {
            return false;
        }

        for (x, y, _) in displacement.iter_cells() {
            let (xi, yi) = (x as i64, y as i64);
            let normal = surface_normal(
                displacement.get_wrapped(xi - 1, yi),
                displacement.get_wrapped(xi + 1, yi),
                displacement.get_wrapped(xi, yi - 1),
                displacement.get_wrapped(xi, yi + 1),
                cell_size,
                normal_strength,
            );
            field.set(x, y, normal);
        }

        self.rendered = true;
        true
    }

    pub fn output(&self) -> Option<&NormalField> {
        self.slot.get().filter(|_| self.rendered)
    }
}

impl OceanPass for SurfaceNormalPass {
    fn label(&self) -> &'static str {
        "surface_normal"
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
