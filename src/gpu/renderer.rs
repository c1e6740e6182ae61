//! GPU renderer: the ocean pass chain as wgpu compute dispatches.

use glam::Vec3;
use log::{debug, info, warn};
use rustfft::num_complex::Complex32;

use super::helpers::{self, BindingKind};
use super::uniforms::{
    ButterflyUniforms, DisplacementUniforms, EvolutionUniforms, GpuTwiddle, NormalUniforms,
    SpectrumUniforms, TwiddleUniforms,
};
use super::GpuContext;
use crate::error::{OceanError, Result};
use crate::noise::{NoiseId, NoiseSource};
use crate::ocean::{
    ComplexGrid, DebugTaps, DisplacementField, NormalField, OceanBackend, PassSlot, SpectrumField,
    SpectrumSample, SurfaceMaps, TimeEvolvedField, TwiddleFactor, TwiddleTable,
};
use crate::params::{Resolution, SpectrumParameters};

const SPECTRUM_SHADER: &str = include_str!("shaders/spectrum.wgsl");
const TWIDDLE_SHADER: &str = include_str!("shaders/twiddle.wgsl");
const EVOLUTION_SHADER: &str = include_str!("shaders/time_evolution.wgsl");
const BUTTERFLY_SHADER: &str = include_str!("shaders/butterfly.wgsl");
const DISPLACEMENT_SHADER: &str = include_str!("shaders/displacement.wgsl");
const NORMAL_SHADER: &str = include_str!("shaders/normal.wgsl");

/// 2D workgroup edge used by every grid shader
const TILE_SIZE: u32 = 16;
const TWIDDLE_WORKGROUP_SIZE: u32 = 64;

const COMPLEX_BYTES: u64 = 8;
const VEC4_BYTES: u64 = 16;

/// Compiled pipelines, independent of resolution
struct Pipelines {
    spectrum_layout: wgpu::BindGroupLayout,
    spectrum: wgpu::ComputePipeline,
    twiddle_layout: wgpu::BindGroupLayout,
    twiddle: wgpu::ComputePipeline,
    evolution_layout: wgpu::BindGroupLayout,
    evolution: wgpu::ComputePipeline,
    butterfly_layout: wgpu::BindGroupLayout,
    butterfly: wgpu::ComputePipeline,
    displacement_layout: wgpu::BindGroupLayout,
    displacement: wgpu::ComputePipeline,
    normal_layout: wgpu::BindGroupLayout,
    normal: wgpu::ComputePipeline,
}

impl Pipelines {
    fn new(device: &wgpu::Device) -> Self {
        use BindingKind::*;

        let spectrum_layout =
            helpers::create_layout(device, "Spectrum Layout", &[StorageRead, StorageReadWrite, Uniform]);
        let twiddle_layout =
            helpers::create_layout(device, "Twiddle Layout", &[StorageReadWrite, StorageReadWrite, Uniform]);
        let evolution_layout =
            helpers::create_layout(device, "Time Evolution Layout", &[StorageRead, StorageReadWrite, Uniform]);
        let butterfly_layout = helpers::create_layout(
            device,
            "Butterfly Layout",
            &[StorageRead, StorageRead, StorageReadWrite, Uniform],
        );
        let displacement_layout =
            helpers::create_layout(device, "Displacement Layout", &[StorageRead, StorageReadWrite, Uniform]);
        let normal_layout =
            helpers::create_layout(device, "Normal Layout", &[StorageRead, StorageReadWrite, Uniform]);

        Self {
            spectrum: helpers::create_pipeline(device, "Spectrum Pipeline", &spectrum_layout, SPECTRUM_SHADER),
            twiddle: helpers::create_pipeline(device, "Twiddle Pipeline", &twiddle_layout, TWIDDLE_SHADER),
            evolution: helpers::create_pipeline(
                device,
                "Time Evolution Pipeline",
                &evolution_layout,
                EVOLUTION_SHADER,
            ),
            butterfly: helpers::create_pipeline(device, "Butterfly Pipeline", &butterfly_layout, BUTTERFLY_SHADER),
            displacement: helpers::create_pipeline(
                device,
                "Displacement Pipeline",
                &displacement_layout,
                DISPLACEMENT_SHADER,
            ),
            normal: helpers::create_pipeline(device, "Normal Pipeline", &normal_layout, NORMAL_SHADER),
            spectrum_layout,
            twiddle_layout,
            evolution_layout,
            butterfly_layout,
            displacement_layout,
            normal_layout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SpectrumKey {
    params: SpectrumParameters,
    noise: NoiseId,
}

/// Buffers and bind groups sized for one resolution
struct GpuResources {
    size: u32,
    stage_count: u32,

    noise: wgpu::Buffer,
    spectrum: wgpu::Buffer,
    twiddles: wgpu::Buffer,
    bit_reversal: wgpu::Buffer,
    /// Height, x and z channels back to back
    evolved: wgpu::Buffer,
    ping_pong: [wgpu::Buffer; 2],
    resolved: wgpu::Buffer,
    displacement: wgpu::Buffer,
    normals: wgpu::Buffer,
    displacement_staging: wgpu::Buffer,
    normal_staging: wgpu::Buffer,

    spectrum_uniforms: wgpu::Buffer,
    evolution_uniforms: wgpu::Buffer,
    normal_uniforms: wgpu::Buffer,

    spectrum_group: wgpu::BindGroup,
    twiddle_group: wgpu::BindGroup,
    evolution_group: wgpu::BindGroup,
    /// One per butterfly stage, rows then columns
    butterfly_groups: Vec<wgpu::BindGroup>,
    displacement_group: wgpu::BindGroup,
    normal_group: wgpu::BindGroup,

    host_displacement: DisplacementField,
    host_normal: NormalField,

    uploaded_noise: Option<NoiseId>,
    spectrum_key: Option<SpectrumKey>,
    twiddles_ready: bool,
    rendered: bool,
}

impl GpuResources {
    fn new(context: &GpuContext, pipelines: &Pipelines, resolution: Resolution) -> Result<Self> {
        let host_displacement = DisplacementField::try_new(resolution.size())?;
        let host_normal = NormalField::try_new(resolution.size())?;
        let device = &context.device;

        helpers::with_allocation_scope(device, move || {
            Self::create(device, pipelines, resolution, host_displacement, host_normal)
        })
    }

    fn create(
        device: &wgpu::Device,
        pipelines: &Pipelines,
        resolution: Resolution,
        host_displacement: DisplacementField,
        host_normal: NormalField,
    ) -> Self {
        let size = resolution.size();
        let stage_count = resolution.stage_count();
        let cells = resolution.cell_count() as u64;
        let channel_bytes = 3 * cells * COMPLEX_BYTES;

        let noise = helpers::storage_buffer(device, "Noise Buffer", cells * COMPLEX_BYTES);
        let spectrum = helpers::storage_buffer(device, "Spectrum Buffer", cells * VEC4_BYTES);
        let twiddles = helpers::storage_buffer(
            device,
            "Twiddle Buffer",
            (stage_count * size) as u64 * std::mem::size_of::<GpuTwiddle>() as u64,
        );
        let bit_reversal = helpers::storage_buffer(device, "Bit Reversal Buffer", size as u64 * 4);
        let evolved = helpers::storage_buffer(device, "Time Evolved Buffer", channel_bytes);
        let ping_pong = [
            helpers::storage_buffer(device, "Ping Buffer", channel_bytes),
            helpers::storage_buffer(device, "Pong Buffer", channel_bytes),
        ];
        let resolved = helpers::storage_buffer(device, "Inverse FFT Buffer", channel_bytes);
        let displacement = helpers::storage_buffer(device, "Displacement Buffer", cells * VEC4_BYTES);
        let normals = helpers::storage_buffer(device, "Normal Buffer", cells * VEC4_BYTES);
        let displacement_staging = helpers::staging_buffer(device, "Displacement Staging Buffer", cells * VEC4_BYTES);
        let normal_staging = helpers::staging_buffer(device, "Normal Staging Buffer", cells * VEC4_BYTES);

        let spectrum_uniforms = helpers::uniform_buffer(
            device,
            "Spectrum Uniforms",
            &SpectrumUniforms::new(&SpectrumParameters::default(), size),
        );
        let twiddle_uniforms = helpers::uniform_buffer(
            device,
            "Twiddle Uniforms",
            &TwiddleUniforms {
                size,
                stage_count,
                _padding: [0; 2],
            },
        );
        let evolution_uniforms = helpers::uniform_buffer(
            device,
            "Time Evolution Uniforms",
            &EvolutionUniforms {
                time: 0.0,
                patch_length: 1.0,
                gravity: 0.0,
                size,
            },
        );
        let displacement_uniforms = helpers::uniform_buffer(
            device,
            "Displacement Uniforms",
            &DisplacementUniforms {
                size,
                cell_count: cells as u32,
                _padding: [0; 2],
            },
        );
        let normal_uniforms = helpers::uniform_buffer(
            device,
            "Normal Uniforms",
            &NormalUniforms {
                size,
                cell_size: 1.0,
                strength: 1.0,
                _padding: 0,
            },
        );

        // Stage i reads ping_pong[i % 2] and writes ping_pong[(i + 1) % 2]
        let total_stages = 2 * stage_count;
        let normalization = 1.0 / (cells as f32);
        let butterfly_groups = (0..total_stages)
            .map(|i| {
                let uniforms = helpers::uniform_buffer(
                    device,
                    "Butterfly Uniforms",
                    &ButterflyUniforms {
                        stage: i % stage_count,
                        axis: i / stage_count,
                        inverse: 1,
                        size,
                        scale: if i + 1 == total_stages { normalization } else { 1.0 },
                        cell_count: cells as u32,
                        _padding: [0; 2],
                    },
                );
                let src = &ping_pong[(i % 2) as usize];
                let dst = &ping_pong[((i + 1) % 2) as usize];
                helpers::create_bind_group(
                    device,
                    "Butterfly Bind Group",
                    &pipelines.butterfly_layout,
                    &[&twiddles, src, dst, &uniforms],
                )
            })
            .collect();

        let spectrum_group = helpers::create_bind_group(
            device,
            "Spectrum Bind Group",
            &pipelines.spectrum_layout,
            &[&noise, &spectrum, &spectrum_uniforms],
        );
        let twiddle_group = helpers::create_bind_group(
            device,
            "Twiddle Bind Group",
            &pipelines.twiddle_layout,
            &[&twiddles, &bit_reversal, &twiddle_uniforms],
        );
        let evolution_group = helpers::create_bind_group(
            device,
            "Time Evolution Bind Group",
            &pipelines.evolution_layout,
            &[&spectrum, &evolved, &evolution_uniforms],
        );
        let displacement_group = helpers::create_bind_group(
            device,
            "Displacement Bind Group",
            &pipelines.displacement_layout,
            &[&resolved, &displacement, &displacement_uniforms],
        );
        let normal_group = helpers::create_bind_group(
            device,
            "Normal Bind Group",
            &pipelines.normal_layout,
            &[&displacement, &normals, &normal_uniforms],
        );

        Self {
            size,
            stage_count,
            noise,
            spectrum,
            twiddles,
            bit_reversal,
            evolved,
            ping_pong,
            resolved,
            displacement,
            normals,
            displacement_staging,
            normal_staging,
            spectrum_uniforms,
            evolution_uniforms,
            normal_uniforms,
            spectrum_group,
            twiddle_group,
            evolution_group,
            butterfly_groups,
            displacement_group,
            normal_group,
            host_displacement,
            host_normal,
            uploaded_noise: None,
            spectrum_key: None,
            twiddles_ready: false,
            rendered: false,
        }
    }

    /// Record every dispatch and copy of one frame
    fn encode_frame(&self, device: &wgpu::Device, pipelines: &Pipelines, spectrum_dirty: bool) -> wgpu::CommandBuffer {
        let tiles = helpers::workgroups(self.size, TILE_SIZE);
        let channel_bytes = self.evolved.size();
        let vector_bytes = self.displacement.size();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Ocean Frame Encoder"),
        });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Ocean Spectrum Pass"),
                timestamp_writes: None,
            });
            if spectrum_dirty {
                pass.set_pipeline(&pipelines.spectrum);
                pass.set_bind_group(0, &self.spectrum_group, &[]);
                pass.dispatch_workgroups(tiles, tiles, 1);
            }
            if !self.twiddles_ready {
                pass.set_pipeline(&pipelines.twiddle);
                pass.set_bind_group(0, &self.twiddle_group, &[]);
                pass.dispatch_workgroups(
                    helpers::workgroups(self.size * self.stage_count, TWIDDLE_WORKGROUP_SIZE),
                    1,
                    1,
                );
            }
            pass.set_pipeline(&pipelines.evolution);
            pass.set_bind_group(0, &self.evolution_group, &[]);
            pass.dispatch_workgroups(tiles, tiles, 1);
        }

        encoder.copy_buffer_to_buffer(&self.evolved, 0, &self.ping_pong[0], 0, channel_bytes);

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Ocean Butterfly Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipelines.butterfly);
            for group in &self.butterfly_groups {
                pass.set_bind_group(0, group, &[]);
                pass.dispatch_workgroups(tiles, tiles, 3);
            }
        }

        let final_buffer = (self.butterfly_groups.len() % 2) as usize;
        encoder.copy_buffer_to_buffer(&self.ping_pong[final_buffer], 0, &self.resolved, 0, channel_bytes);

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Ocean Surface Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipelines.displacement);
            pass.set_bind_group(0, &self.displacement_group, &[]);
            pass.dispatch_workgroups(tiles, tiles, 1);
            pass.set_pipeline(&pipelines.normal);
            pass.set_bind_group(0, &self.normal_group, &[]);
            pass.dispatch_workgroups(tiles, tiles, 1);
        }

        encoder.copy_buffer_to_buffer(&self.displacement, 0, &self.displacement_staging, 0, vector_bytes);
        encoder.copy_buffer_to_buffer(&self.normals, 0, &self.normal_staging, 0, vector_bytes);

        encoder.finish()
    }
}

/// Split a three-channel complex buffer into grids
fn complex_channels(values: &[[f32; 2]], size: u32) -> Result<[ComplexGrid; 3]> {
    let cells = (size as usize) * (size as usize);
    if values.len() != 3 * cells {
        return Err(OceanError::Readback(format!(
            "expected {} complex values, got {}",
            3 * cells,
            values.len()
        )));
    }

    let channel = |c: usize| {
        let data = values[c * cells..(c + 1) * cells]
            .iter()
            .map(|v| Complex32::new(v[0], v[1]))
            .collect();
        ComplexGrid::from_cells(size, data).ok_or_else(|| OceanError::Readback("channel size".into()))
    };
    Ok([channel(0)?, channel(1)?, channel(2)?])
}

/// Compute-shader backend with the same boundary as [`crate::ocean::OceanRenderer`]
pub struct GpuOceanRenderer {
    context: GpuContext,
    pipelines: Pipelines,
    resources: PassSlot<Resolution, GpuResources>,
    params: Option<SpectrumParameters>,
    noise: Option<NoiseSource>,
    allocation_generation: u64,
    skipped_frames: u32,
}

impl GpuOceanRenderer {
    /// Compile every pipeline on an existing device
    pub fn new(context: GpuContext) -> Result<Self> {
        let pipelines = helpers::with_allocation_scope(&context.device, || Pipelines::new(&context.device))?;
        Ok(Self {
            context,
            pipelines,
            resources: PassSlot::new(),
            params: None,
            noise: None,
            allocation_generation: 0,
            skipped_frames: 0,
        })
    }

    /// Request a headless device and build the renderer on it
    pub fn request() -> Result<Self> {
        Self::new(GpuContext::request()?)
    }

    pub fn configure(&mut self, width: u32, height: u32) -> Result<()> {
        let resolution = Resolution::new(width, height)?;
        let (context, pipelines) = (&self.context, &self.pipelines);
        let reallocated = self
            .resources
            .configure_with("gpu_ocean", &resolution, |r| GpuResources::new(context, pipelines, *r))?;

        if reallocated {
            info!("Configured GPU ocean pipeline at {width}x{height}");
            self.allocation_generation += 1;
            self.skipped_frames = 0;
        }
        Ok(())
    }

    pub fn set_spectrum_parameters(&mut self, params: &SpectrumParameters, noise: &NoiseSource) -> Result<()> {
        params.validate()?;
        if let Some(resolution) = self.resources.config() {
            if noise.size() != resolution.size() {
                return Err(OceanError::NoiseResolutionMismatch {
                    expected: resolution.size(),
                    actual: noise.size(),
                });
            }
        }
        if self.noise.as_ref().map(NoiseSource::id) != Some(noise.id()) {
            self.noise = Some(noise.clone());
        }
        self.params = Some(*params);
        Ok(())
    }

    pub fn evaluate(&mut self, time_s: f32, normal_strength: f32) -> Result<Option<SurfaceMaps<'_>>> {
        if !time_s.is_finite() {
            return Err(OceanError::InvalidParameter {
                name: "time_s",
                value: time_s,
            });
        }
        if !normal_strength.is_finite() {
            return Err(OceanError::InvalidParameter {
                name: "normal_strength",
                value: normal_strength,
            });
        }

        if !self.run_frame(time_s, normal_strength)? {
            self.skip_frame();
            return Ok(None);
        }
        self.skipped_frames = 0;
        Ok(self.surface_maps())
    }

    fn run_frame(&mut self, time_s: f32, normal_strength: f32) -> Result<bool> {
        let Some(&resolution) = self.resources.config() else {
            return Ok(false);
        };
        let (Some(params), Some(noise)) = (self.params, self.noise.as_ref()) else {
            return Ok(false);
        };
        if noise.size() != resolution.size() {
            return Ok(false);
        }
        let Some(res) = self.resources.get_mut() else {
            return Ok(false);
        };
        let GpuContext { device, queue, .. } = &self.context;

        if res.uploaded_noise != Some(noise.id()) {
            queue.write_buffer(&res.noise, 0, bytemuck::cast_slice(noise.samples()));
            res.uploaded_noise = Some(noise.id());
        }

        let key = SpectrumKey {
            params,
            noise: noise.id(),
        };
        let spectrum_dirty = res.spectrum_key != Some(key);
        if spectrum_dirty {
            debug!("gpu_ocean: recomputing spectrum");
            queue.write_buffer(
                &res.spectrum_uniforms,
                0,
                bytemuck::bytes_of(&SpectrumUniforms::new(&params, res.size)),
            );
        }
        queue.write_buffer(
            &res.evolution_uniforms,
            0,
            bytemuck::bytes_of(&EvolutionUniforms {
                time: time_s,
                patch_length: params.patch_length_m,
                gravity: params.gravity_m_per_s2,
                size: res.size,
            }),
        );
        queue.write_buffer(
            &res.normal_uniforms,
            0,
            bytemuck::bytes_of(&NormalUniforms {
                size: res.size,
                cell_size: params.patch_length_m / res.size as f32,
                strength: normal_strength,
                _padding: 0,
            }),
        );

        queue.submit(Some(res.encode_frame(device, &self.pipelines, spectrum_dirty)));

        let displacement: Vec<[f32; 4]> = helpers::map_read(device, &res.displacement_staging)?;
        let normals: Vec<[f32; 4]> = helpers::map_read(device, &res.normal_staging)?;
        for (cell, v) in res.host_displacement.cells_mut().iter_mut().zip(&displacement) {
            *cell = Vec3::new(v[0], v[1], v[2]);
        }
        for (cell, v) in res.host_normal.cells_mut().iter_mut().zip(&normals) {
            *cell = Vec3::new(v[0], v[1], v[2]);
        }

        res.spectrum_key = Some(key);
        res.twiddles_ready = true;
        res.rendered = true;
        Ok(true)
    }

    fn skip_frame(&mut self) {
        if self.resources.config().is_none() {
            return;
        }
        self.skipped_frames += 1;
        if self.skipped_frames == 2 {
            warn!(
                "GPU ocean pipeline configured but skipped {} consecutive frames (no valid noise source?)",
                self.skipped_frames
            );
        }
    }

    fn surface_maps(&self) -> Option<SurfaceMaps<'_>> {
        let res = self.resources.get().filter(|r| r.rendered)?;
        Some(SurfaceMaps {
            displacement: &res.host_displacement,
            normal: &res.host_normal,
        })
    }

    fn rendered_resources(&self) -> Option<&GpuResources> {
        self.resources.get().filter(|r| r.rendered)
    }

    pub fn teardown(&mut self) {
        self.resources.release();
        self.skipped_frames = 0;
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resources.config().copied()
    }

    pub fn allocation_generation(&self) -> u64 {
        self.allocation_generation
    }

    pub fn skipped_frames(&self) -> u32 {
        self.skipped_frames
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    // Debug readbacks; `None` until a frame has been rendered

    pub fn read_spectrum(&self) -> Result<Option<SpectrumField>> {
        let Some(res) = self.rendered_resources() else {
            return Ok(None);
        };
        let values: Vec<[f32; 4]> = helpers::read_buffer(&self.context.device, &self.context.queue, &res.spectrum)?;
        let samples = values
            .iter()
            .map(|v| SpectrumSample {
                h0: Complex32::new(v[0], v[1]),
                h0_mirror_conj: Complex32::new(v[2], v[3]),
            })
            .collect();
        SpectrumField::from_cells(res.size, samples)
            .map(Some)
            .ok_or_else(|| OceanError::Readback("spectrum size".into()))
    }

    pub fn read_twiddle_table(&self) -> Result<Option<TwiddleTable>> {
        let Some(res) = self.rendered_resources() else {
            return Ok(None);
        };
        let GpuContext { device, queue, .. } = &self.context;
        let entries: Vec<GpuTwiddle> = helpers::read_buffer(device, queue, &res.twiddles)?;
        let bit_reversal: Vec<u32> = helpers::read_buffer(device, queue, &res.bit_reversal)?;
        let factors = entries
            .iter()
            .map(|e| TwiddleFactor {
                w: Complex32::new(e.w[0], e.w[1]),
                top: e.lanes[0],
                bottom: e.lanes[1],
            })
            .collect();
        TwiddleTable::from_parts(res.size, bit_reversal, factors)
            .map(Some)
            .ok_or_else(|| OceanError::Readback("twiddle table shape".into()))
    }

    pub fn read_time_evolved(&self) -> Result<Option<TimeEvolvedField>> {
        let Some(res) = self.rendered_resources() else {
            return Ok(None);
        };
        let values: Vec<[f32; 2]> = helpers::read_buffer(&self.context.device, &self.context.queue, &res.evolved)?;
        TimeEvolvedField::from_channels(complex_channels(&values, res.size)?)
            .map(Some)
            .ok_or_else(|| OceanError::Readback("time evolved channels".into()))
    }

    pub fn read_inverse_transform(&self) -> Result<Option<[ComplexGrid; 3]>> {
        let Some(res) = self.rendered_resources() else {
            return Ok(None);
        };
        let values: Vec<[f32; 2]> = helpers::read_buffer(&self.context.device, &self.context.queue, &res.resolved)?;
        complex_channels(&values, res.size).map(Some)
    }
}

impl OceanBackend for GpuOceanRenderer {
    fn configure(&mut self, width: u32, height: u32) -> Result<()> {
        Self::configure(self, width, height)
    }

    fn set_spectrum_parameters(&mut self, params: &SpectrumParameters, noise: &NoiseSource) -> Result<()> {
        Self::set_spectrum_parameters(self, params, noise)
    }

    fn evaluate(&mut self, time_s: f32, normal_strength: f32) -> Result<Option<SurfaceMaps<'_>>> {
        Self::evaluate(self, time_s, normal_strength)
    }

    fn debug_taps(&mut self) -> Result<Option<DebugTaps>> {
        let (Some(spectrum), Some(twiddles), Some(time_evolved), Some(inverse_transform)) = (
            self.read_spectrum()?,
            self.read_twiddle_table()?,
            self.read_time_evolved()?,
            self.read_inverse_transform()?,
        ) else {
            return Ok(None);
        };
        Ok(Some(DebugTaps {
            spectrum,
            twiddles,
            time_evolved,
            inverse_transform,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocean::{Channel, OceanRenderer};
    use glam::Vec2;

    /// `None` on machines without a usable adapter
    fn gpu_renderer() -> Option<GpuOceanRenderer> {
        match GpuContext::request() {
            Ok(context) => Some(GpuOceanRenderer::new(context).expect("pipelines compile")),
            Err(OceanError::AdapterUnavailable | OceanError::Device(_)) => {
                eprintln!("skipping: no GPU adapter available");
                None
            }
            Err(e) => panic!("GPU context setup failed: {e}"),
        }
    }

    fn inputs(size: u32) -> (SpectrumParameters, NoiseSource) {
        (
            SpectrumParameters::new(Vec2::new(10.0, 0.0), 1.0),
            NoiseSource::gaussian(size, 77).unwrap(),
        )
    }

    #[test]
    fn test_gpu_matches_cpu() {
        let Some(mut gpu) = gpu_renderer() else {
            return;
        };
        let (params, noise) = inputs(64);

        let mut cpu = OceanRenderer::new();
        cpu.configure(64, 64).unwrap();
        cpu.set_spectrum_parameters(&params, &noise).unwrap();
        let expected = cpu.evaluate(2.0, 1.0).unwrap().unwrap();

        gpu.configure(64, 64).unwrap();
        gpu.set_spectrum_parameters(&params, &noise).unwrap();
        let actual = gpu.evaluate(2.0, 1.0).unwrap().unwrap();

        let peak = expected
            .displacement
            .cells()
            .iter()
            .fold(0.0f32, |m, d| m.max(d.abs().max_element()));
        for (a, e) in actual.displacement.cells().iter().zip(expected.displacement.cells()) {
            assert!((*a - *e).length() <= peak * 1e-3 + 1e-6, "{a} vs {e}");
        }
        for (a, e) in actual.normal.cells().iter().zip(expected.normal.cells()) {
            assert!((*a - *e).length() < 1e-3, "{a} vs {e}");
        }
    }

    #[test]
    fn test_gpu_twiddle_table_matches_cpu() {
        let Some(mut gpu) = gpu_renderer() else {
            return;
        };
        let (params, noise) = inputs(128);
        gpu.configure(128, 128).unwrap();
        assert!(gpu.read_twiddle_table().unwrap().is_none());
        gpu.set_spectrum_parameters(&params, &noise).unwrap();
        gpu.evaluate(0.0, 1.0).unwrap();

        let actual = gpu.read_twiddle_table().unwrap().unwrap();
        let expected = TwiddleTable::new(128).unwrap();
        assert_eq!(actual.bit_reversal(), expected.bit_reversal());
        for (a, e) in actual.factors().iter().zip(expected.factors()) {
            assert_eq!((a.top, a.bottom), (e.top, e.bottom));
            assert!((a.w - e.w).norm() < 1e-5);
        }
    }

    #[test]
    fn test_gpu_inverse_transform_is_real() {
        let Some(mut gpu) = gpu_renderer() else {
            return;
        };
        let (params, noise) = inputs(64);
        gpu.configure(64, 64).unwrap();
        gpu.set_spectrum_parameters(&params, &noise).unwrap();
        gpu.evaluate(4.0, 1.0).unwrap();

        let channels = gpu.read_inverse_transform().unwrap().unwrap();
        let height = &channels[Channel::Height.index()];
        let peak_re = height.cells().iter().fold(0.0f32, |m, c| m.max(c.re.abs()));
        let peak_im = height.cells().iter().fold(0.0f32, |m, c| m.max(c.im.abs()));
        assert!(peak_im < peak_re * 1e-2);
    }

    #[test]
    fn test_gpu_configure_and_skip() {
        let Some(mut gpu) = gpu_renderer() else {
            return;
        };
        assert!(matches!(
            gpu.configure(63, 64),
            Err(OceanError::InvalidResolution { .. })
        ));

        gpu.configure(64, 64).unwrap();
        let generation = gpu.allocation_generation();
        gpu.configure(64, 64).unwrap();
        assert_eq!(gpu.allocation_generation(), generation);

        assert!(gpu.evaluate(0.0, 1.0).unwrap().is_none());
        assert!(gpu.evaluate(0.0, 1.0).unwrap().is_none());
        assert_eq!(gpu.skipped_frames(), 2);
    }
}
