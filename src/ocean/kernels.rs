//! Per-cell math shared by the passes.
//!
//! Each function here is the body of one compute dispatch: it reads only
//! its inputs and the cell coordinates, so the CPU passes and the WGSL
//! shaders evaluate the same expressions.

use std::f64::consts::TAU;

use glam::{Vec2, Vec3};
use rustfft::num_complex::Complex32;

use crate::params::SpectrumParameters;

/// Wave vectors (and wind speeds) shorter than this are treated as zero
pub const K_EPSILON: f32 = 1e-6;

/// Normals shorter than this fall back to straight up
const NORMAL_EPSILON: f32 = 1e-12;

/// Standard FFT ordering: n < N/2 is positive, the rest wrap negative
#[inline]
pub fn signed_frequency(n: u32, size: u32) -> i32 {
    if n < size / 2 {
        n as i32
    } else {
        n as i32 - size as i32
    }
}

/// Index of -k along one axis
#[inline]
pub fn mirror_index(n: u32, size: u32) -> u32 {
    (size - n) % size
}

/// Wave vector (rad/m) of cell (x, y); x maps to kx, y to kz
#[inline]
pub fn wave_vector(x: u32, y: u32, size: u32, patch_length_m: f32) -> Vec2 {
    let scale = std::f32::consts::TAU / patch_length_m;
    Vec2::new(
        signed_frequency(x, size) as f32 * scale,
        signed_frequency(y, size) as f32 * scale,
    )
}

/// Phillips spectrum P(k)
///
/// `A · exp(-1/(kL)²) / k⁴ · (k̂·ŵ)² · exp(-k²ℓ²)` with L = V²/g.
/// Zero at the DC term and for calm wind.
pub fn phillips(k: Vec2, params: &SpectrumParameters) -> f32 {
    let k_len = k.length();
    let wind_speed = params.wind_velocity.length();
    if k_len < K_EPSILON || wind_speed < K_EPSILON {
        return 0.0;
    }

    let largest_wave = params.largest_wave_m();
    let k_sq = k_len * k_len;
    let kl = k_len * largest_wave;
    let alignment = k.dot(params.wind_velocity) / (k_len * wind_speed);
    let suppression = (-k_sq * params.small_wave_cutoff_m * params.small_wave_cutoff_m).exp();

    params.wave_amplitude * (-1.0 / (kl * kl)).exp() / (k_sq * k_sq)
        * alignment
        * alignment
        * suppression
}

/// h0 = sqrt(P/2) · (ξr + iξi)
#[inline]
pub fn tilde_zero(phillips: f32, xi: [f32; 2]) -> Complex32 {
    Complex32::new(xi[0], xi[1]) * (phillips * 0.5).sqrt()
}

/// Deep-water dispersion ω = sqrt(g|k|)
#[inline]
pub fn dispersion(k_len: f32, gravity: f32) -> f32 {
    (gravity * k_len).sqrt()
}

/// Height, x and z amplitudes of one wave vector at time `t`
///
/// `h = h0·e^{iωt} + conj(h0(-k))·e^{-iωt}`, `Dx = i·kx/|k|·h`, `Dz = i·kz/|k|·h`.
pub fn evolve(h0: Complex32, h0_mirror_conj: Complex32, k: Vec2, time_s: f32, gravity: f32) -> [Complex32; 3] {
    let k_len = k.length();
    if k_len < K_EPSILON {
        return [Complex32::new(0.0, 0.0); 3];
    }

    let phase = dispersion(k_len, gravity) * time_s;
    let (sin, cos) = phase.sin_cos();
    let rotation = Complex32::new(cos, sin);
    let height = h0 * rotation + h0_mirror_conj * rotation.conj();

    [
        height,
        Complex32::new(0.0, k.x / k_len) * height,
        Complex32::new(0.0, k.y / k_len) * height,
    ]
}

/// Reverse the low `bits` bits of `i`
#[inline]
pub fn bit_reverse(i: u32, bits: u32) -> u32 {
    if bits == 0 {
        0
    } else {
        i.reverse_bits() >> (32 - bits)
    }
}

/// One twiddle table entry: root of unity plus the two lanes it combines
///
/// The butterfly at this (stage, lane) computes `p + w·q` with `p` read
/// from lane `top` and `q` from lane `bottom` of the previous stage.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TwiddleFactor {
    pub w: Complex32,
    pub top: u32,
    pub bottom: u32,
}

/// Twiddle entry for a DIT stage; `bit_reversal` is the length-N permutation
pub fn twiddle_factor(stage: u32, lane: u32, size: u32, bit_reversal: &[u32]) -> TwiddleFactor {
    let span = 1u32 << stage;
    let group = span << 1;
    let k = (lane as u64 * (size / group) as u64 % size as u64) as f64;
    let angle = TAU * k / size as f64;
    let w = Complex32::new(angle.cos() as f32, -(angle.sin() as f32));
    let top_wing = lane % group < span;

    let (top, bottom) = match (stage, top_wing) {
        (0, true) => (bit_reversal[lane as usize], bit_reversal[lane as usize + 1]),
        (0, false) => (bit_reversal[lane as usize - 1], bit_reversal[lane as usize]),
        (_, true) => (lane, lane + span),
        (_, false) => (lane - span, lane),
    };

    TwiddleFactor { w, top, bottom }
}

/// Sign convention of a butterfly sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FftDirection {
    /// exp(-2πi·kn/N), unscaled
    Forward,
    /// exp(+2πi·kn/N)
    Inverse,
}

/// Radix-2 butterfly `p + w·q`, conjugating `w` for the inverse sweep
#[inline]
pub fn butterfly(p: Complex32, q: Complex32, w: Complex32, direction: FftDirection) -> Complex32 {
    let w = match direction {
        FftDirection::Forward => w,
        FftDirection::Inverse => w.conj(),
    };
    p + w * q
}

/// Unit normal from the displacements of the four neighbours of a cell
///
/// Tangents span two cells (`2·cell_size`) plus the displacement delta;
/// `strength` scales the horizontal tilt before normalizing.
pub fn surface_normal(left: Vec3, right: Vec3, down: Vec3, up: Vec3, cell_size: f32, strength: f32) -> Vec3 {
    let tangent_x = Vec3::new(2.0 * cell_size, 0.0, 0.0) + (right - left);
    let tangent_z = Vec3::new(0.0, 0.0, 2.0 * cell_size) + (up - down);
    let n = tangent_z.cross(tangent_x);
    let tilted = Vec3::new(n.x * strength, n.y, n.z * strength);

    let len = tilted.length();
    if len <= NORMAL_EPSILON || !len.is_finite() {
        Vec3::Y
    } else {
        tilted / len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_frequency_ordering() {
        assert_eq!(signed_frequency(0, 8), 0);
        assert_eq!(signed_frequency(3, 8), 3);
        assert_eq!(signed_frequency(4, 8), -4);
        assert_eq!(signed_frequency(7, 8), -1);
        assert_eq!(mirror_index(0, 8), 0);
        assert_eq!(mirror_index(1, 8), 7);
        assert_eq!(mirror_index(4, 8), 4);
    }

    #[test]
    fn test_bit_reversal_is_involution() {
        for bits in 6..=10 {
            let size = 1u32 << bits;
            for i in 0..size {
                let j = bit_reverse(i, bits);
                assert!(j < size);
                assert_eq!(bit_reverse(j, bits), i, "N={size} i={i}");
            }
        }
    }

    #[test]
    fn test_phillips_zero_at_dc_and_calm_wind() {
        let params = SpectrumParameters::default();
        assert_eq!(phillips(Vec2::ZERO, &params), 0.0);

        let calm = SpectrumParameters::new(Vec2::ZERO, 1.0);
        assert_eq!(phillips(Vec2::new(0.1, 0.0), &calm), 0.0);
    }

    #[test]
    fn test_phillips_favours_wind_direction() {
        let params = SpectrumParameters::new(Vec2::new(10.0, 0.0), 1.0);
        let along = phillips(Vec2::new(0.1, 0.0), &params);
        let across = phillips(Vec2::new(0.0, 0.1), &params);
        let against = phillips(Vec2::new(-0.1, 0.0), &params);

        assert!(along > 0.0);
        assert!(across.abs() < 1e-12);
        // Squared alignment is symmetric
        assert!((along - against).abs() <= along * 1e-6);
    }

    #[test]
    fn test_evolve_zero_at_dc() {
        let h0 = Complex32::new(1.0, 2.0);
        let out = evolve(h0, h0, Vec2::ZERO, 3.0, 9.81);
        for c in out {
            assert_eq!(c, Complex32::new(0.0, 0.0));
        }
    }

    #[test]
    fn test_evolve_at_time_zero_sums_both_terms() {
        let h0 = Complex32::new(1.0, 0.5);
        let mirror = Complex32::new(0.25, -1.0);
        let k = Vec2::new(0.3, 0.4);
        let [height, dx, dz] = evolve(h0, mirror, k, 0.0, 9.81);

        assert!((height - (h0 + mirror)).norm() < 1e-6);
        // Dx = i·(kx/|k|)·h
        let expected_dx = Complex32::new(0.0, 0.6) * height;
        let expected_dz = Complex32::new(0.0, 0.8) * height;
        assert!((dx - expected_dx).norm() < 1e-6);
        assert!((dz - expected_dz).norm() < 1e-6);
    }

    #[test]
    fn test_twiddle_first_stage_uses_bit_reversed_lanes() {
        let size = 8;
        let rev: Vec<u32> = (0..size).map(|i| bit_reverse(i, 3)).collect();

        let top = twiddle_factor(0, 2, size, &rev);
        assert_eq!((top.top, top.bottom), (rev[2], rev[3]));
        assert!((top.w - Complex32::new(1.0, 0.0)).norm() < 1e-6);

        let bottom = twiddle_factor(0, 3, size, &rev);
        assert_eq!((bottom.top, bottom.bottom), (rev[2], rev[3]));
        assert!((bottom.w - Complex32::new(-1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_twiddle_later_stage_spans() {
        let size = 8;
        let rev: Vec<u32> = (0..size).map(|i| bit_reverse(i, 3)).collect();

        let entry = twiddle_factor(1, 1, size, &rev);
        assert_eq!((entry.top, entry.bottom), (1, 3));
        // k = 1 · 8/4 = 2 → exp(-iπ/2) = -i
        assert!((entry.w - Complex32::new(0.0, -1.0)).norm() < 1e-6);

        let entry = twiddle_factor(2, 6, size, &rev);
        assert_eq!((entry.top, entry.bottom), (2, 6));
    }

    #[test]
    fn test_butterfly_direction_conjugates() {
        let p = Complex32::new(1.0, 0.0);
        let q = Complex32::new(0.0, 1.0);
        let w = Complex32::new(0.0, -1.0);
        assert_eq!(butterfly(p, q, w, FftDirection::Forward), Complex32::new(2.0, 0.0));
        assert_eq!(butterfly(p, q, w, FftDirection::Inverse), Complex32::new(0.0, 0.0));
    }

    #[test]
    fn test_flat_surface_normal_points_up() {
        let n = surface_normal(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, 1.0, 1.0);
        assert!((n - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_slope_tilts_normal_against_gradient() {
        // Height rising toward +x
        let left = Vec3::new(0.0, -1.0, 0.0);
        let right = Vec3::new(0.0, 1.0, 0.0);
        let n = surface_normal(left, right, Vec3::ZERO, Vec3::ZERO, 1.0, 1.0);
        assert!(n.x < 0.0);
        assert!(n.y > 0.0);
        assert!((n.length() - 1.0).abs() < 1e-6);

        let flat = surface_normal(left, right, Vec3::ZERO, Vec3::ZERO, 1.0, 0.0);
        assert!((flat - Vec3::Y).length() < 1e-6);
    }
}
