//! Command-line argument parsing.

use clap::{Parser, Subcommand, ValueEnum};
use glam::Vec2;

use crate::params::{BakeConfig, SpectrumParameters};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "fft-ocean")]
#[command(about = "FFT ocean surface baker (Phillips spectrum, CPU or GPU)", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate frames and write height, normal and displacement maps
    Bake(BakeArgs),
}

/// Which pipeline evaluates the frames
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cpu,
    Gpu,
}

#[derive(clap::Args, Debug, Clone)]
pub struct BakeArgs {
    /// Grid resolution (power of two, 64..=1024)
    #[arg(long, value_name = "N", default_value = "256")]
    pub size: u32,

    /// Wind velocity along x (m/s)
    #[arg(long, value_name = "M_PER_S", default_value = "10", allow_hyphen_values = true)]
    pub wind_x: f32,

    /// Wind velocity along z (m/s)
    #[arg(long, value_name = "M_PER_S", default_value = "0", allow_hyphen_values = true)]
    pub wind_z: f32,

    /// Phillips amplitude constant
    #[arg(long, default_value = "1")]
    pub amplitude: f32,

    /// Side length of the tileable patch (meters)
    #[arg(long, value_name = "METERS", default_value = "250")]
    pub patch_length: f32,

    /// Seed for the Gaussian noise source
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Time of the first frame (seconds)
    #[arg(long, value_name = "SECONDS", default_value = "0")]
    pub time: f32,

    /// Multiplier from wall-clock time to simulation time
    #[arg(long, default_value = "1")]
    pub time_scale: f32,

    /// Number of frames to bake
    #[arg(long, default_value = "1")]
    pub frames: usize,

    /// Frames per second of the baked sequence
    #[arg(long, default_value = "30")]
    pub fps: f32,

    /// Normal tilt multiplier
    #[arg(long, default_value = "1")]
    pub normal_strength: f32,

    #[arg(long, value_enum, default_value = "cpu")]
    pub backend: Backend,

    /// Output directory
    #[arg(long, value_name = "DIR", default_value = "bake")]
    pub output_dir: String,

    /// Also write spectrum, twiddle and inverse-FFT images
    #[arg(long)]
    pub debug_taps: bool,
}

impl BakeArgs {
    pub fn spectrum_parameters(&self) -> SpectrumParameters {
        SpectrumParameters {
            patch_length_m: self.patch_length,
            ..SpectrumParameters::new(Vec2::new(self.wind_x, self.wind_z), self.amplitude)
        }
    }

    pub fn bake_config(&self) -> BakeConfig {
        BakeConfig {
            output_dir: self.output_dir.clone(),
            frame_count: self.frames.max(1),
            start_time_s: self.time,
            frame_interval_s: if self.fps > 0.0 { 1.0 / self.fps } else { 0.0 },
            time_scale: self.time_scale,
            normal_strength: self.normal_strength,
            write_debug_taps: self.debug_taps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bake(args: &[&str]) -> BakeArgs {
        let argv = ["fft-ocean", "bake"].iter().chain(args.iter());
        match Args::parse_from(argv).command {
            Command::Bake(bake) => bake,
        }
    }

    #[test]
    fn test_defaults() {
        let args = bake(&[]);
        assert_eq!(args.size, 256);
        assert_eq!(args.backend, Backend::Cpu);

        let params = args.spectrum_parameters();
        assert_eq!(params.wind_velocity, Vec2::new(10.0, 0.0));
        assert_eq!(params, SpectrumParameters::default());
    }

    #[test]
    fn test_bake_config_from_args() {
        let args = bake(&[
            "--time", "3", "--time-scale", "2", "--frames", "4", "--fps", "10", "--backend", "gpu",
            "--wind-z", "-5", "--debug-taps",
        ]);
        assert_eq!(args.backend, Backend::Gpu);
        assert_eq!(args.spectrum_parameters().wind_velocity, Vec2::new(10.0, -5.0));

        let config = args.bake_config();
        assert_eq!(config.frame_count, 4);
        assert!(config.write_debug_taps);
        assert!((config.frame_time(1) - 6.2).abs() < 1e-5);
    }
}
