//! Present sink: hands finished fields to an external target.
//!
//! The built-in target writes image files (height PNG, normal PNG,
//! displacement EXR) plus optional debug-tap images.

use std::path::Path;

use glam::Vec3;
use image::{GrayImage, ImageBuffer, Luma, Rgb, Rgb32FImage, RgbImage};
use log::{debug, info};

use crate::error::{OceanError, Result};
use crate::ocean::{
    Channel, ComplexGrid, DebugTaps, DisplacementField, NormalField, SpectrumField, SurfaceMaps,
    TwiddleTable,
};
use crate::params::BakeConfig;

/// 16-bit grayscale height map
pub type HeightImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Receives the final fields of each rendered frame
pub trait SurfaceTarget {
    fn present(&mut self, frame: usize, maps: &SurfaceMaps<'_>) -> Result<()>;
}

/// Blits each rendered frame into every registered target
#[derive(Default)]
pub struct PresentPass {
    targets: Vec<Box<dyn SurfaceTarget>>,
    presented: usize,
}

impl PresentPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&mut self, target: Box<dyn SurfaceTarget>) {
        self.targets.push(target);
    }

    /// No targets means nothing to do
    pub fn is_valid_pass(&self) -> bool {
        !self.targets.is_empty()
    }

    pub fn render(&mut self, frame: usize, maps: &SurfaceMaps<'_>) -> Result<()> {
        if !self.is_valid_pass() {
            return Ok(());
        }
        for target in &mut self.targets {
            target.present(frame, maps)?;
        }
        self.presented += 1;
        Ok(())
    }

    /// Frames delivered so far
    pub fn presented(&self) -> usize {
        self.presented
    }
}

/// Writes image files under the bake output directory
pub struct ImageTarget {
    config: BakeConfig,
}

impl ImageTarget {
    pub fn new(config: BakeConfig) -> Result<Self> {
        create_dir(&config.output_dir)?;
        if config.write_debug_taps {
            create_dir(&config.debug_dir())?;
        }
        Ok(Self { config })
    }

    /// Spectrum, twiddle and per-channel inverse-FFT images for a frame
    pub fn write_debug_taps(&self, frame: usize, taps: &DebugTaps) -> Result<()> {
        let dir = self.config.debug_dir();
        save(spectrum_image(&taps.spectrum), format!("{dir}/spectrum_{frame:05}.png"))?;
        save(twiddle_image(&taps.twiddles), format!("{dir}/twiddle_{frame:05}.png"))?;
        for channel in Channel::ALL {
            let name = channel.name();
            save(
                complex_image(taps.time_evolved.channel(channel)),
                format!("{dir}/evolved_{name}_{frame:05}.png"),
            )?;
            save(
                complex_image(&taps.inverse_transform[channel.index()]),
                format!("{dir}/inverse_{name}_{frame:05}.png"),
            )?;
        }
        debug!("Wrote debug taps for frame {frame} to {dir}");
        Ok(())
    }
}

impl SurfaceTarget for ImageTarget {
    fn present(&mut self, frame: usize, maps: &SurfaceMaps<'_>) -> Result<()> {
        save(height_image(maps.displacement), self.config.height_path(frame))?;
        save(normal_image(maps.normal), self.config.normal_path(frame))?;
        save(displacement_image(maps.displacement), self.config.displacement_path(frame))?;
        info!("Frame {frame} written to {}", self.config.output_dir);
        Ok(())
    }
}

fn create_dir(path: &str) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| OceanError::Present(format!("{path}: {e}")))
}

fn save<P>(image: ImageBuffer<P, Vec<P::Subpixel>>, path: impl AsRef<Path>) -> Result<()>
where
    P: image::Pixel + image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
{
    let path = path.as_ref();
    image
        .save(path)
        .map_err(|e| OceanError::Present(format!("{}: {e}", path.display())))
}

/// Min/max of an iterator, `(0, 0)` when empty
fn range(values: impl Iterator<Item = f32>) -> (f32, f32) {
    values.fold(None, |acc: Option<(f32, f32)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
    .unwrap_or((0.0, 0.0))
}

/// Map `v` from `[lo, hi]` to `[0, 1]`; a flat range maps to 0.5
fn normalize(v: f32, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Height channel stretched over the full 16-bit range
pub fn height_image(displacement: &DisplacementField) -> HeightImage {
    let (lo, hi) = range(displacement.cells().iter().map(|d| d.y));
    let size = displacement.size();
    ImageBuffer::from_fn(size, size, |x, y| {
        Luma([(normalize(displacement.get(x, y).y, lo, hi) * u16::MAX as f32).round() as u16])
    })
}

/// Unit normals encoded as `n * 0.5 + 0.5`
pub fn normal_image(normals: &NormalField) -> RgbImage {
    let size = normals.size();
    ImageBuffer::from_fn(size, size, |x, y| {
        let encoded = (normals.get(x, y) * 0.5 + 0.5).clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
        Rgb([
            encoded.x.round() as u8,
            encoded.y.round() as u8,
            encoded.z.round() as u8,
        ])
    })
}

/// Full-precision (x offset, height, z offset)
pub fn displacement_image(displacement: &DisplacementField) -> Rgb32FImage {
    let size = displacement.size();
    ImageBuffer::from_fn(size, size, |x, y| Rgb(displacement.get(x, y).to_array()))
}

/// Log magnitude of h0, shifted so the DC term sits in the centre
pub fn spectrum_image(spectrum: &SpectrumField) -> GrayImage {
    let size = spectrum.size();
    let half = size / 2;
    let magnitude = |x: u32, y: u32| spectrum.get(x, y).h0.norm().ln_1p();
    let (lo, hi) = range(spectrum.iter_cells().map(|(x, y, _)| magnitude(x, y)));

    ImageBuffer::from_fn(size, size, |x, y| {
        let value = magnitude((x + half) % size, (y + half) % size);
        Luma([(normalize(value, lo, hi) * 255.0).round() as u8])
    })
}

/// One row per stage: R/G = twiddle (re, im), B = top lane
pub fn twiddle_image(table: &TwiddleTable) -> RgbImage {
    let size = table.size();
    ImageBuffer::from_fn(size, table.stage_count(), |lane, stage| {
        let entry = table.factor(stage, lane);
        let to_byte = |v: f32| ((v * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgb([
            to_byte(entry.w.re),
            to_byte(entry.w.im),
            ((entry.top as f32 / size as f32) * 255.0) as u8,
        ])
    })
}

/// Real part of a complex grid, stretched to 8 bits
pub fn complex_image(grid: &ComplexGrid) -> GrayImage {
    let size = grid.size();
    let (lo, hi) = range(grid.cells().iter().map(|c| c.re));
    ImageBuffer::from_fn(size, size, |x, y| {
        Luma([(normalize(grid.get(x, y).re, lo, hi) * 255.0).round() as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingTarget(std::rc::Rc<std::cell::Cell<usize>>);

    impl SurfaceTarget for CountingTarget {
        fn present(&mut self, _frame: usize, _maps: &SurfaceMaps<'_>) -> Result<()> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    fn ramp(size: u32) -> DisplacementField {
        let mut field = DisplacementField::try_new(size).unwrap();
        for (i, cell) in field.cells_mut().iter_mut().enumerate() {
            *cell = Vec3::new(0.0, i as f32, 0.0);
        }
        field
    }

    #[test]
    fn test_height_image_spans_full_range() {
        let image = height_image(&ramp(4));
        assert_eq!(image.get_pixel(0, 0).0, [0]);
        assert_eq!(image.get_pixel(3, 3).0, [u16::MAX]);
    }

    #[test]
    fn test_flat_height_maps_to_mid_gray() {
        let field = DisplacementField::try_new(4).unwrap();
        assert_eq!(height_image(&field).get_pixel(1, 1).0, [32768]);
    }

    #[test]
    fn test_up_normal_encoding() {
        let mut normals = NormalField::try_new(2).unwrap();
        normals.cells_mut().fill(Vec3::Y);
        assert_eq!(normal_image(&normals).get_pixel(0, 1).0, [128, 255, 128]);
    }

    #[test]
    fn test_present_pass_forwards_to_targets() {
        let count = std::rc::Rc::new(std::cell::Cell::new(0));
        let field = ramp(4);
        let normals = NormalField::try_new(4).unwrap();
        let maps = SurfaceMaps {
            displacement: &field,
            normal: &normals,
        };

        let mut pass = PresentPass::new();
        assert!(!pass.is_valid_pass());
        pass.render(0, &maps).unwrap();
        assert_eq!(pass.presented(), 0);

        pass.add_target(Box::new(CountingTarget(count.clone())));
        pass.add_target(Box::new(CountingTarget(count.clone())));
        pass.render(1, &maps).unwrap();
        assert_eq!(count.get(), 2);
        assert_eq!(pass.presented(), 1);
    }

    #[test]
    fn test_image_target_writes_files() {
        let dir = std::env::temp_dir().join(format!("fft-ocean-present-{}", std::process::id()));
        let config = BakeConfig {
            output_dir: dir.to_string_lossy().into_owned(),
            ..Default::default()
        };
        let field = ramp(64);
        let mut normals = NormalField::try_new(64).unwrap();
        normals.cells_mut().fill(Vec3::Y);

        let mut target = ImageTarget::new(config.clone()).unwrap();
        target
            .present(
                0,
                &SurfaceMaps {
                    displacement: &field,
                    normal: &normals,
                },
            )
            .unwrap();

        assert!(Path::new(&config.height_path(0)).exists());
        assert!(Path::new(&config.normal_path(0)).exists());
        assert!(Path::new(&config.displacement_path(0)).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
