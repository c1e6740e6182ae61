//! Validated grid resolution.

use crate::error::{OceanError, Result};

/// Square power-of-two grid size accepted by the pipeline
///
/// Every intermediate buffer is N×N; the twiddle table has log2(N) stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    size: u32,
}

impl Resolution {
    /// Smallest accepted side length (cells)
    pub const MIN: u32 = 64;

    /// Largest accepted side length (cells)
    pub const MAX: u32 = 1024;

    /// Validate a width/height pair
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let invalid = |reason| OceanError::InvalidResolution {
            width,
            height,
            reason,
        };

        if !width.is_power_of_two() || !height.is_power_of_two() {
            return Err(invalid("dimensions must be powers of two"));
        }
        if !(Self::MIN..=Self::MAX).contains(&width) || !(Self::MIN..=Self::MAX).contains(&height) {
            return Err(invalid("dimensions must be within 64..=1024"));
        }
        if width != height {
            return Err(invalid("grid must be square"));
        }

        Ok(Self { size: width })
    }

    /// Validate a square grid
    pub fn square(size: u32) -> Result<Self> {
        Self::new(size, size)
    }

    /// Side length N (cells)
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Total cell count N²
    pub fn cell_count(&self) -> usize {
        (self.size as usize) * (self.size as usize)
    }

    /// Butterfly stages per direction, log2(N)
    pub fn stage_count(&self) -> u32 {
        self.size.trailing_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_power_of_two() {
        let err = Resolution::new(63, 64).unwrap_err();
        assert!(matches!(
            err,
            OceanError::InvalidResolution {
                width: 63,
                height: 64,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Resolution::new(32, 32).is_err());
        assert!(Resolution::new(2048, 2048).is_err());
        assert!(Resolution::new(0, 0).is_err());
    }

    #[test]
    fn test_rejects_non_square() {
        assert!(Resolution::new(128, 256).is_err());
    }

    #[test]
    fn test_accepts_range_bounds() {
        let low = Resolution::square(64).unwrap();
        let high = Resolution::square(1024).unwrap();
        assert_eq!(low.stage_count(), 6);
        assert_eq!(high.stage_count(), 10);
        assert_eq!(low.cell_count(), 4096);
    }
}
