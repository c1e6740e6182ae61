//! Parameter definitions with physical units and documented semantics.
//!
//! All tunables live here with:
//! - Physical units (meters, seconds, m/s, etc.)
//! - Documented ranges and meanings
//! - Validation where a value would make a pass undefined

mod render;
mod resolution;
mod spectrum;

// Re-export all types
pub use render::BakeConfig;
pub use resolution::Resolution;
pub use spectrum::{SpectrumParameters, STANDARD_GRAVITY_M_PER_S2};
