//! Bit-reversal permutation and per-stage twiddle factors.

use super::kernels::{bit_reverse, twiddle_factor, TwiddleFactor};
use super::pass::{OceanPass, PassSlot, PassState};
use crate::error::{OceanError, Result};
use crate::params::Resolution;

/// log2(N) × N butterfly table for an N-point radix-2 transform
#[derive(Debug, Clone, PartialEq)]
pub struct TwiddleTable {
    size: u32,
    stage_count: u32,
    bit_reversal: Vec<u32>,
    factors: Vec<TwiddleFactor>,
}

impl TwiddleTable {
    /// Zeroed table sized for `size`
    fn try_allocate(size: u32) -> Result<Self> {
        let stage_count = size.trailing_zeros();
        let entries = (stage_count * size) as usize;

        let mut bit_reversal = Vec::new();
        let mut factors = Vec::new();
        bit_reversal
            .try_reserve_exact(size as usize)
            .and_then(|_| factors.try_reserve_exact(entries))
            .map_err(|e| OceanError::ResourceAllocation(format!("twiddle table N={size}: {e}")))?;
        bit_reversal.resize(size as usize, 0);
        factors.resize(entries, TwiddleFactor::default());

        Ok(Self {
            size,
            stage_count,
            bit_reversal,
            factors,
        })
    }

    /// Build the full table for an N-point transform (N a power of two)
    pub fn new(size: u32) -> Result<Self> {
        let mut table = Self::try_allocate(size)?;
        table.compute();
        Ok(table)
    }

    /// Reassemble a table read back from elsewhere; `None` if the shapes disagree
    pub fn from_parts(size: u32, bit_reversal: Vec<u32>, factors: Vec<TwiddleFactor>) -> Option<Self> {
        if !size.is_power_of_two() {
            return None;
        }
        let stage_count = size.trailing_zeros();
        let shaped = bit_reversal.len() == size as usize && factors.len() == (stage_count * size) as usize;
        shaped.then_some(Self {
            size,
            stage_count,
            bit_reversal,
            factors,
        })
    }

    fn compute(&mut self) {
        let size = self.size;
        for (i, slot) in self.bit_reversal.iter_mut().enumerate() {
            *slot = bit_reverse(i as u32, self.stage_count);
        }
        for stage in 0..self.stage_count {
            for lane in 0..size {
                self.factors[(stage * size + lane) as usize] =
                    twiddle_factor(stage, lane, size, &self.bit_reversal);
            }
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn stage_count(&self) -> u32 {
        self.stage_count
    }

    pub fn bit_reversal(&self) -> &[u32] {
        &self.bit_reversal
    }

    #[inline]
    pub fn factor(&self, stage: u32, lane: u32) -> TwiddleFactor {
        self.factors[(stage * self.size + lane) as usize]
    }

    /// Stage-major entries, `stage * N + lane`
    pub fn factors(&self) -> &[TwiddleFactor] {
        &self.factors
    }
}

/// Cached per resolution; wind, noise and time never invalidate it
#[derive(Debug, Default)]
pub struct TwiddleFactorPass {
    slot: PassSlot<Resolution, TwiddleTable>,
    rendered: bool,
    computations: u64,
}

impl TwiddleFactorPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure_pass(&mut self, resolution: Resolution) -> Result<bool> {
        let label = self.label();
        let reallocated = self
            .slot
            .configure_with(label, &resolution, |r| TwiddleTable::try_allocate(r.size()))?;
        if reallocated {
            self.rendered = false;
        }
        Ok(reallocated)
    }

    pub fn render(&mut self) -> bool {
        if !self.is_valid_pass() {
            return false;
        }
        if self.rendered {
            return true;
        }
        let Some(table) = self.slot.get_mut() else {
            return false;
        };
        table.compute();
        self.rendered = true;
        self.computations += 1;
        true
    }

    pub fn is_dirty(&self) -> bool {
        !self.rendered
    }

    pub fn output(&self) -> Option<&TwiddleTable> {
        self.slot.get().filter(|_| self.rendered)
    }

    pub fn computation_count(&self) -> u64 {
        self.computations
    }
}

impl OceanPass for TwiddleFactorPass {
    fn label(&self) -> &'static str {
        "twiddle"
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        let table = TwiddleTable::new(64).unwrap();
        assert_eq!(table.stage_count(), 6);
        assert_eq!(table.factors().len(), 6 * 64);
        assert_eq!(table.bit_reversal()[1], 32);
    }

    #[test]
    fn test_factors_are_unit_roots() {
        let table = TwiddleTable::new(256).unwrap();
        for entry in table.factors() {
            assert!((entry.w.norm() - 1.0).abs() < 1e-6);
            assert!(entry.top < 256 && entry.bottom < 256);
        }
    }

    #[test]
    fn test_each_stage_pairs_lanes() {
        // Every lane is read exactly twice per stage (once per wing)
        let table = TwiddleTable::new(128).unwrap();
        for stage in 0..table.stage_count() {
            let mut reads = vec![0u32; 128];
            for lane in 0..128 {
                let entry = table.factor(stage, lane);
                reads[entry.top as usize] += 1;
                reads[entry.bottom as usize] += 1;
            }
            assert!(reads.iter().all(|&r| r == 2), "stage {stage}");
        }
    }

    #[test]
    fn test_pass_computes_once_per_resolution() {
        let mut pass = TwiddleFactorPass::new();
        let resolution = Resolution::square(64).unwrap();
        pass.configure_pass(resolution).unwrap();
        assert!(pass.render());
        assert!(pass.render());
        assert!(!pass.configure_pass(resolution).unwrap());
        pass.render();
        assert_eq!(pass.computation_count(), 1);

        assert!(pass.configure_pass(Resolution::square(128).unwrap()).unwrap());
        pass.render();
        assert_eq!(pass.computation_count(), 2);
        assert_eq!(pass.output().unwrap().size(), 128);
    }
}
