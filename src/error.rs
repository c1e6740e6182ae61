//! Error taxonomy for the ocean pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OceanError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OceanError {
    #[error("invalid resolution {width}x{height}: {reason}")]
    InvalidResolution {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    #[error("no noise source has been set")]
    MissingNoiseSource,

    #[error("noise source is {actual}x{actual}, pipeline is configured for {expected}x{expected}")]
    NoiseResolutionMismatch { expected: u32, actual: u32 },

    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    #[error("resource allocation failed: {0}")]
    ResourceAllocation(String),

    #[error("no suitable GPU adapter found")]
    AdapterUnavailable,

    #[error("GPU device error: {0}")]
    Device(String),

    #[error("GPU readback failed: {0}")]
    Readback(String),

    #[error("failed to write output: {0}")]
    Present(String),
}
