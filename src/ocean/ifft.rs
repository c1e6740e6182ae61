//! Butterfly 2D inverse FFT over the three evolved channels.
//!
//! Each channel runs `log2 N` row stages then `log2 N` column stages,
//! alternating between the two buffers of its ping-pong pair. Stage `i`
//! reads buffer `i % 2` and writes `(i + 1) % 2`; the buffer holding the
//! result is `total_stages % 2` and is copied to the channel's output.

use super::field::{Channel, ComplexGrid, TimeEvolvedField};
use super::kernels::{butterfly, FftDirection};
use super::pass::{OceanPass, PassSlot, PassState};
use super::twiddle::TwiddleTable;
use crate::error::Result;
use crate::params::Resolution;

/// Which index a stage transforms along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FftAxis {
    /// Along x within each row
    Rows,
    /// Along y within each column
    Columns,
}

/// Two scratch grids indexed by stage parity
pub type PingPong = [ComplexGrid; 2];

#[derive(Debug)]
struct FftBuffers {
    ping_pong: [PingPong; 3],
    outputs: [ComplexGrid; 3],
}

impl FftBuffers {
    fn try_new(size: u32) -> Result<Self> {
        let pair = || -> Result<PingPong> { Ok([ComplexGrid::try_new(size)?, ComplexGrid::try_new(size)?]) };
        Ok(Self {
            ping_pong: [pair()?, pair()?, pair()?],
            outputs: [
                ComplexGrid::try_new(size)?,
                ComplexGrid::try_new(size)?,
                ComplexGrid::try_new(size)?,
            ],
        })
    }
}

/// One butterfly stage from `src` into `dst`
///
/// `scale` multiplies every output; only the last inverse stage passes
/// something other than 1.
pub fn butterfly_stage(
    src: &ComplexGrid,
    dst: &mut ComplexGrid,
    twiddles: &TwiddleTable,
    stage: u32,
    axis: FftAxis,
    direction: FftDirection,
    scale: f32,
) {
    let size = src.size();
    for y in 0..size {
        for x in 0..size {
            let (p, q, w) = match axis {
                FftAxis::Rows => {
                    let tw = twiddles.factor(stage, x);
                    (src.get(tw.top, y), src.get(tw.bottom, y), tw.w)
                }
                FftAxis::Columns => {
                    let tw = twiddles.factor(stage, y);
                    (src.get(x, tw.top), src.get(x, tw.bottom), tw.w)
                }
            };
            dst.set(x, y, butterfly(p, q, w, direction) * scale);
        }
    }
}

/// Full 2D transform of `input` through `ping_pong` into `output`
///
/// The inverse direction is normalized by 1/N² at its final stage; the
/// forward direction is unscaled.
pub fn transform(
    input: &ComplexGrid,
    twiddles: &TwiddleTable,
    direction: FftDirection,
    ping_pong: &mut PingPong,
    output: &mut ComplexGrid,
) {
    let size = twiddles.size();
    let stages = twiddles.stage_count();
    let total_stages = 2 * stages;
    let normalization = 1.0 / (size as f32 * size as f32);

    ping_pong[0].copy_from(input);

    let mut frame = 0;
    for axis in [FftAxis::Rows, FftAxis::Columns] {
        for stage in 0..stages {
            let scale = match direction {
                FftDirection::Inverse if frame + 1 == total_stages => normalization,
                _ => 1.0,
            };
            let [a, b] = &mut *ping_pong;
            let (src, dst) = if frame % 2 == 0 { (&*a, b) } else { (&*b, a) };
            butterfly_stage(src, dst, twiddles, stage, axis, direction, scale);
            frame += 1;
        }
    }

    output.copy_from(&ping_pong[(total_stages % 2) as usize]);
}

#[derive(Debug, Default)]
pub struct InverseFftPass {
    slot: PassSlot<Resolution, FftBuffers>,
    rendered: bool,
}

impl InverseFftPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure_pass(&mut self, resolution: Resolution) -> Result<bool> {
        let label = self.label();
        let reallocated = self
            .slot
            .configure_with(label, &resolution, |r| FftBuffers::try_new(r.size()))?;
        if reallocated {
            self.rendered = false;
        }
        Ok(reallocated)
    }

    /// Transform every channel of `evolved` to the spatial domain
    pub fn render(&mut self, evolved: &TimeEvolvedField, twiddles: &TwiddleTable) -> bool {
        if !self.is_valid_pass() {
            return false;
        }
        let Some(buffers) = self.slot.get_mut() else {
            return false;
        };
        if evolved.size() != twiddles.size() || buffers.outputs[0].size() != twiddles.size() {
            return false;
        }

        let FftBuffers { ping_pong, outputs } = buffers;
        for channel in Channel::ALL {
            let i = channel.index();
            transform(
                evolved.channel(channel),
                twiddles,
                FftDirection::Inverse,
                &mut ping_pong[i],
                &mut outputs[i],
            );
        }

        self.rendered = true;
        true
    }

    /// Spatial-domain result of one channel (real part is the physical value)
    pub fn output(&self, channel: Channel) -> Option<&ComplexGrid> {
        self.slot
            .get()
            .filter(|_| self.rendered)
            .map(|buffers| &buffers.outputs[channel.index()])
    }
}

impl OceanPass for InverseFftPass {
    fn label(&self) -> &'static str {
        "inverse_fft"
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
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rustfft::num_complex::Complex32;
    use rustfft::{FftDirection as ReferenceDirection, FftPlanner};
    use std::f32::consts::TAU;

    const N: u32 = 64;

    /// Row-then-column 2D FFT with rustfft (unnormalized)
    fn reference_fft2d(grid: &ComplexGrid, direction: ReferenceDirection) -> ComplexGrid {
        let n = grid.size() as usize;
        let fft = FftPlanner::<f32>::new().plan_fft(n, direction);
        let mut data = grid.cells().to_vec();
        for row in data.chunks_exact_mut(n) {
            fft.process(row);
        }
        let mut column = vec![Complex32::new(0.0, 0.0); n];
        for x in 0..n {
            for y in 0..n {
                column[y] = data[y * n + x];
            }
            fft.process(&mut column);
            for y in 0..n {
                data[y * n + x] = column[y];
            }
        }
        ComplexGrid::from_cells(grid.size(), data).unwrap()
    }

    fn random_grid(seed: u64) -> ComplexGrid {
        let mut rng = StdRng::seed_from_u64(seed);
        let cells = (0..N * N)
            .map(|_| Complex32::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect();
        ComplexGrid::from_cells(N, cells).unwrap()
    }

    fn run(input: &ComplexGrid, direction: FftDirection) -> ComplexGrid {
        let twiddles = TwiddleTable::new(input.size()).unwrap();
        let mut ping_pong = [
            ComplexGrid::try_new(input.size()).unwrap(),
            ComplexGrid::try_new(input.size()).unwrap(),
        ];
        let mut output = ComplexGrid::try_new(input.size()).unwrap();
        transform(input, &twiddles, direction, &mut ping_pong, &mut output);
        output
    }

    fn max_error(a: &ComplexGrid, b: &ComplexGrid) -> f32 {
        a.cells()
            .iter()
            .zip(b.cells())
            .map(|(x, y)| (x - y).norm())
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_single_frequency_round_trip() {
        let (fx, fz) = (3.0, 5.0);
        let cells = (0..N * N)
            .map(|i| {
                let (x, y) = ((i % N) as f32, (i / N) as f32);
                Complex32::new((TAU * (fx * x + fz * y) / N as f32).cos(), 0.0)
            })
            .collect();
        let sinusoid = ComplexGrid::from_cells(N, cells).unwrap();

        let spectrum = reference_fft2d(&sinusoid, ReferenceDirection::Forward);
        let recovered = run(&spectrum, FftDirection::Inverse);

        let error = max_error(&recovered, &sinusoid);
        assert!(error < 1e-4, "max error {error}");
    }

    #[test]
    fn test_impulse_becomes_plane_wave() {
        let mut spectrum = ComplexGrid::try_new(N).unwrap();
        spectrum.set(3, 5, Complex32::new((N * N) as f32, 0.0));
        let wave = run(&spectrum, FftDirection::Inverse);

        for (x, y, value) in wave.iter_cells() {
            let phase = TAU * (3 * x + 5 * y) as f32 / N as f32;
            let expected = Complex32::new(phase.cos(), phase.sin());
            assert!((value - expected).norm() < 1e-4, "cell ({x}, {y})");
        }
    }

    #[test]
    fn test_random_round_trip() {
        let input = random_grid(17);
        let spectrum = reference_fft2d(&input, ReferenceDirection::Forward);
        let error = max_error(&run(&spectrum, FftDirection::Inverse), &input);
        assert!(error < 1e-4, "max error {error}");
    }

    #[test]
    fn test_forward_matches_reference() {
        let input = random_grid(23);
        let expected = reference_fft2d(&input, ReferenceDirection::Forward);
        let actual = run(&input, FftDirection::Forward);

        // Outputs grow to ~N in magnitude; compare relative to that
        let error = max_error(&actual, &expected);
        assert!(error < 1e-4 * N as f32, "max error {error}");
    }

    #[test]
    fn test_inverse_matches_reference_up_to_scale() {
        let input = random_grid(29);
        let mut expected = reference_fft2d(&input, ReferenceDirection::Inverse);
        let scale = 1.0 / (N * N) as f32;
        for value in expected.cells_mut() {
            *value *= scale;
        }
        let error = max_error(&run(&input, FftDirection::Inverse), &expected);
        assert!(error < 1e-5, "max error {error}");
    }

    #[test]
    fn test_pass_transforms_all_channels() {
        let mut evolved = TimeEvolvedField::try_new(N).unwrap();
        for (i, channel) in evolved.channels_mut().iter_mut().enumerate() {
            channel.set(i as u32 + 1, 0, Complex32::new((N * N) as f32, 0.0));
        }
        let twiddles = TwiddleTable::new(N).unwrap();

        let mut pass = InverseFftPass::new();
        assert!(pass.output(Channel::Height).is_none());
        pass.configure_pass(Resolution::square(N).unwrap()).unwrap();
        assert!(pass.render(&evolved, &twiddles));

        for channel in Channel::ALL {
            let frequency = channel.index() as u32 + 1;
            let out = pass.output(channel).unwrap();
            let phase = TAU * frequency as f32 / N as f32;
            assert!((out.get(1, 7).re - phase.cos()).abs() < 1e-4, "{}", channel.name());
        }
    }
}
