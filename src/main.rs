//! fft-ocean - bake tileable FFT ocean surfaces to image files

use std::time::Instant;

use clap::Parser;
use log::warn;

use fft_ocean::cli::{Args, Backend, BakeArgs, Command};
use fft_ocean::gpu::GpuOceanRenderer;
use fft_ocean::noise::NoiseSource;
use fft_ocean::ocean::{OceanBackend, OceanRenderer};
use fft_ocean::present::{ImageTarget, PresentPass};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    match args.command {
        Command::Bake(bake_args) => bake(&bake_args),
    }
}

fn bake(args: &BakeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let params = args.spectrum_parameters();
    let config = args.bake_config();

    println!("FFT Ocean Bake");
    println!("  Backend: {:?}", args.backend);
    println!("  Size: {}x{}", args.size, args.size);
    println!(
        "  Wind: ({}, {}) m/s, amplitude {}",
        args.wind_x, args.wind_z, args.amplitude
    );
    println!("  Seed: {}", args.seed);

    let mut backend: Box<dyn OceanBackend> = match args.backend {
        Backend::Cpu => Box::new(OceanRenderer::new()),
        Backend::Gpu => Box::new(GpuOceanRenderer::request()?),
    };

    let noise = NoiseSource::gaussian(args.size, args.seed)?;
    backend.configure(args.size, args.size)?;
    backend.set_spectrum_parameters(&params, &noise)?;

    let debug_target = ImageTarget::new(config.clone())?;
    let mut present = PresentPass::new();
    present.add_target(Box::new(ImageTarget::new(config.clone())?));

    let start = Instant::now();
    for frame in 0..config.frame_count {
        let time_s = config.frame_time(frame);
        match backend.evaluate(time_s, config.normal_strength)? {
            Some(maps) => present.render(frame, &maps)?,
            None => {
                warn!("Frame {frame} skipped: nothing to render");
                continue;
            }
        }

        if config.write_debug_taps {
            if let Some(taps) = backend.debug_taps()? {
                debug_target.write_debug_taps(frame, &taps)?;
            }
        }
    }

    let elapsed = start.elapsed();
    println!("  Frames: {}", present.presented());
    println!("  Output: {}", config.output_dir);
    println!("  Time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);

    Ok(())
}
