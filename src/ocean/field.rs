//! Grid storage shared by every pass.

use glam::Vec3;
use rustfft::num_complex::Complex32;

use crate::error::{OceanError, Result};

/// Square row-major grid, index = y * N + x
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    size: u32,
    cells: Vec<T>,
}

impl<T: Copy + Default> Grid<T> {
    /// Allocate a zeroed grid, reporting allocation failure instead of aborting
    pub fn try_new(size: u32) -> Result<Self> {
        let len = (size as usize) * (size as usize);
        let mut cells = Vec::new();
        cells.try_reserve_exact(len).map_err(|e| {
            OceanError::ResourceAllocation(format!("{size}x{size} grid: {e}"))
        })?;
        cells.resize(len, T::default());
        Ok(Self { size, cells })
    }

    /// Build from row-major cells; `None` when the length is not `size²`
    pub fn from_cells(size: u32, cells: Vec<T>) -> Option<Self> {
        (cells.len() == (size as usize) * (size as usize)).then_some(Self { size, cells })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y * self.size + x) as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> T {
        self.cells[self.index(x, y)]
    }

    /// Periodic lookup; the spectral domain tiles in both axes
    #[inline]
    pub fn get_wrapped(&self, x: i64, y: i64) -> T {
        let n = self.size as i64;
        self.get(x.rem_euclid(n) as u32, y.rem_euclid(n) as u32)
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let i = self.index(x, y);
        self.cells[i] = value;
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }

    /// Copy another grid of the same size into this one
    pub fn copy_from(&mut self, other: &Grid<T>) {
        debug_assert_eq!(self.size, other.size);
        self.cells.copy_from_slice(&other.cells);
    }

    /// Iterate `(x, y, value)` in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u32, T)> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, v)| (i as u32 % size, i as u32 / size, *v))
    }
}

/// Tilde-zero sample: h0(k) and conj(h0(-k)) stored together
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpectrumSample {
    pub h0: Complex32,
    pub h0_mirror_conj: Complex32,
}

/// The three frequency-domain channels the inverse FFT runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Height = 0,
    X = 1,
    Z = 2,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Height, Channel::X, Channel::Z];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Height => "height",
            Channel::X => "x",
            Channel::Z => "z",
        }
    }
}

pub type ComplexGrid = Grid<Complex32>;
pub type SpectrumField = Grid<SpectrumSample>;
/// x = x-offset, y = height, z = z-offset
pub type DisplacementField = Grid<Vec3>;
pub type NormalField = Grid<Vec3>;

/// Per-frame complex amplitudes for height and horizontal displacement
#[derive(Debug, Clone, PartialEq)]
pub struct TimeEvolvedField {
    channels: [ComplexGrid; 3],
}

impl TimeEvolvedField {
    pub fn try_new(size: u32) -> Result<Self> {
        Ok(Self {
            channels: [
                ComplexGrid::try_new(size)?,
                ComplexGrid::try_new(size)?,
                ComplexGrid::try_new(size)?,
            ],
        })
    }

    /// `None` unless all three grids share one size
    pub fn from_channels(channels: [ComplexGrid; 3]) -> Option<Self> {
        let size = channels[0].size();
        channels
            .iter()
            .all(|c| c.size() == size)
            .then_some(Self { channels })
    }

    pub fn size(&self) -> u32 {
        self.channels[0].size()
    }

    pub fn channel(&self, channel: Channel) -> &ComplexGrid {
        &self.channels[channel.index()]
    }

    pub fn channels_mut(&mut self) -> &mut [ComplexGrid; 3] {
        &mut self.channels
    }
}
