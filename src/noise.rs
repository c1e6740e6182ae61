//! Gaussian noise input for the spectrum pass.
//!
//! The pipeline only ever reads a `NoiseSource`. Each source carries an
//! identity so the spectrum pass can tell "same noise" from "new noise"
//! without comparing sample data.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{OceanError, Result};

static NEXT_NOISE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a noise source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoiseId(u64);

impl NoiseId {
    fn next() -> Self {
        Self(NEXT_NOISE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// N×N grid of independent standard-normal sample pairs
///
/// Each cell holds the real and imaginary draw of one complex Gaussian.
/// Clones share the identity, since the samples are immutable.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    id: NoiseId,
    size: u32,
    samples: Vec<[f32; 2]>,
}

impl NoiseSource {
    /// Wrap externally generated samples (row-major, `size * size` entries)
    pub fn from_samples(size: u32, samples: Vec<[f32; 2]>) -> Result<Self> {
        let expected = (size as usize) * (size as usize);
        if size == 0 || samples.len() != expected {
            return Err(OceanError::InvalidParameter {
                name: "noise_sample_count",
                value: samples.len() as f32,
            });
        }
        if let Some(bad) = samples.iter().flatten().find(|v| !v.is_finite()) {
            return Err(OceanError::InvalidParameter {
                name: "noise_sample",
                value: *bad,
            });
        }

        Ok(Self {
            id: NoiseId::next(),
            size,
            samples,
        })
    }

    /// Seeded standard-normal noise (deterministic per seed)
    pub fn gaussian(size: u32, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = (size as usize) * (size as usize);
        let samples = (0..count)
            .map(|_| [rng.sample(StandardNormal), rng.sample(StandardNormal)])
            .collect();
        Self::from_samples(size, samples)
    }

    pub fn id(&self) -> NoiseId {
        self.id
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn samples(&self) -> &[[f32; 2]] {
        &self.samples
    }

    /// Sample pair at a cell
    pub fn sample(&self, x: u32, y: u32) -> [f32; 2] {
        self.samples[(y * self.size + x) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_noise_is_deterministic() {
        let a = NoiseSource::gaussian(64, 7).unwrap();
        let b = NoiseSource::gaussian(64, 7).unwrap();
        let c = NoiseSource::gaussian(64, 8).unwrap();

        assert_eq!(a.samples(), b.samples());
        assert_ne!(a.samples(), c.samples());
        // Same content, distinct sources
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_clone_keeps_identity() {
        let a = NoiseSource::gaussian(64, 1).unwrap();
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_noise_statistics() {
        let noise = NoiseSource::gaussian(128, 42).unwrap();
        let values: Vec<f32> = noise.samples().iter().flatten().copied().collect();
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32;

        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((variance - 1.0).abs() < 0.05, "variance {variance}");
    }

    #[test]
    fn test_rejects_wrong_sample_count() {
        assert!(NoiseSource::from_samples(4, vec![[0.0, 0.0]; 15]).is_err());
        assert!(NoiseSource::from_samples(4, vec![[f32::NAN, 0.0]; 16]).is_err());
    }
}
