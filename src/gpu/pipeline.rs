//! The assembled GPU pipeline.
//!
//! Per frame, in order:
//!
//! 1. update: current state -> previous state, swap
//! 2. trail: current display -> previous display (faded), swap
//! 3. draw: current state -> current display (additive)
//! 4. present: current display -> screen
//!
//! [`render`](GpuPipeline::render) records all four into one encoder. Each
//! stage is also exposed on its own, which is what the headless tests use.

use glam::Vec4;
use tracing::debug;

use super::draw::DrawStage;
use super::present::{PresentMode, PresentStage};
use super::readback::read_texture;
use super::simulation::SimulationStage;
use super::targets::RenderTargetPool;
use super::trails::TrailStage;
use super::{decode_state, GpuContext, CAPTURE_FORMAT};
use crate::driver::{FrameInputs, FramePipeline};
use crate::error::{ConfigurationError, GpuError, PipelineError, ShaderError};
use crate::layout::TextureLayout;
use crate::params::SimulationParameters;
use crate::shader::ShaderSet;
use crate::uniforms::{DrawUniforms, InitUniforms, TrailUniforms, UpdateUniforms};
use crate::viewport::DisplaySize;

/// A presentable texture view with its size.
pub struct ScreenTarget {
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

pub struct GpuPipeline {
    context: GpuContext,
    pool: RenderTargetPool,
    simulation: SimulationStage,
    trails: TrailStage,
    draw: DrawStage,
    present: PresentStage,
    capture: PresentStage,
}

impl GpuPipeline {
    /// Validate `shaders` and build every stage. Buffers are allocated by the
    /// first [`resize_particles`](FramePipeline::resize_particles) and
    /// [`resize_display`](FramePipeline::resize_display); until then every
    /// stage is a no-op.
    pub fn new(
        context: GpuContext,
        shaders: &ShaderSet,
        screen_format: wgpu::TextureFormat,
        max_row_width: u32,
    ) -> Result<Self, PipelineError> {
        shaders.validate()?;
        let pool = RenderTargetPool::new(
            max_row_width,
            context.max_texture_dimension(),
            context.state_format,
        )?;

        // Sources that pass naga can still disagree with the bind group
        // layouts or target formats; catch that here rather than at draw time.
        let device = &context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let simulation = SimulationStage::new(
            device,
            &shaders.init_positions,
            &shaders.update_positions,
            context.state_format,
        );
        let trails = TrailStage::new(device, &shaders.canvas_preprocess);
        let draw = DrawStage::new(device, &shaders.draw_particles);
        let present = PresentStage::new(device, &shaders.present, screen_format);
        let capture = PresentStage::new(device, &shaders.present, CAPTURE_FORMAT);
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Link {
                message: e.to_string(),
            }
            .into());
        }

        Ok(Self {
            context,
            pool,
            simulation,
            trails,
            draw,
            present,
            capture,
        })
    }

    /// A pipeline on a headless device, presenting to [`CAPTURE_FORMAT`] targets.
    pub fn headless(shaders: &ShaderSet, max_row_width: u32) -> Result<Self, PipelineError> {
        let context = pollster::block_on(GpuContext::headless())?;
        Self::new(context, shaders, CAPTURE_FORMAT, max_row_width)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.context.queue
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Layout of the allocated particle state.
    pub fn layout(&self) -> Option<TextureLayout> {
        self.pool.particles().map(|p| p.layout)
    }

    /// Size of the allocated display buffers.
    pub fn display_size(&self) -> Option<DisplaySize> {
        self.pool.display().map(|d| d.size)
    }

    /// Run the init pass on the current particle state.
    pub fn init_particles(&mut self) {
        let Some(particles) = self.pool.particles() else {
            return;
        };
        let mut encoder = self.encoder("Init Encoder");
        self.simulation.encode_init(
            &self.context.device,
            &self.context.queue,
            &mut encoder,
            particles.surfaces.current(),
            &InitUniforms::new(&particles.layout),
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));
        debug!(particles = particles.layout.particle_count, "particles initialized");
    }

    /// Advance the particle state by one step.
    pub fn simulate(&mut self, params: &SimulationParameters, time_ms: f32, delta_ms: f32) {
        let mut encoder = self.encoder("Simulate Encoder");
        self.encode_simulate(&mut encoder, params, time_ms, delta_ms);
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Fade the previous display buffer into the next one.
    pub fn composite(&mut self, params: &SimulationParameters) {
        let mut encoder = self.encoder("Composite Encoder");
        self.encode_composite(&mut encoder, params);
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Draw the current particle state onto the current display buffer.
    pub fn draw(&mut self, params: &SimulationParameters) {
        let mut encoder = self.encoder("Draw Encoder");
        self.encode_draw(&mut encoder, params);
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Copy the current display buffer to `target`.
    pub fn present(&self, params: &SimulationParameters, target: &ScreenTarget) {
        let mut encoder = self.encoder("Present Encoder");
        self.encode_present(&mut encoder, params, target);
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Fill both display buffers with `background`.
    pub fn clear_display(&self, background: Vec4) {
        let Some(display) = self.pool.display() else {
            return;
        };
        let [r, g, b, a] = background.to_array();
        let color = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        };
        let mut encoder = self.encoder("Clear Encoder");
        for surface in display.surfaces.both() {
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Display Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Read every texel of the current particle state, row-major.
    /// Texels past the particle count are included.
    pub fn read_particle_state(&self) -> Result<Vec<[f32; 4]>, GpuError> {
        let Some(particles) = self.pool.particles() else {
            return Ok(Vec::new());
        };
        let format = self.pool.state_format();
        let bytes = read_texture(
            &self.context.device,
            &self.context.queue,
            &particles.surfaces.current().texture,
            format.block_copy_size(None).unwrap_or(16),
        )?;
        Ok(decode_state(&bytes, format))
    }

    /// Render the current display buffer at its own size, stretched and
    /// unfiltered, and read it back as 8-bit RGBA.
    pub fn capture(&self, params: &SimulationParameters) -> Result<image::RgbaImage, PipelineError> {
        let Some(display) = self.pool.display() else {
            return Err(ConfigurationError::ZeroDisplay.into());
        };
        let size = display.size;

        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Texture"),
            size: size.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CAPTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.encoder("Capture Encoder");
        self.capture.encode(
            &self.context.device,
            &self.context.queue,
            &mut encoder,
            display.surfaces.current(),
            &view,
            size.width,
            size.height,
            PresentMode {
                stretch: true,
                smooth: false,
                background: params.background_color.to_array(),
            },
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let bytes = read_texture(&self.context.device, &self.context.queue, &texture, 4)?;
        image::RgbaImage::from_raw(size.width, size.height, bytes).ok_or_else(|| {
            PipelineError::Capture(image::ImageError::Parameter(
                image::error::ParameterError::from_kind(
                    image::error::ParameterErrorKind::DimensionMismatch,
                ),
            ))
        })
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    fn encode_simulate(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        params: &SimulationParameters,
        time_ms: f32,
        delta_ms: f32,
    ) {
        let Some(particles) = self.pool.particles_mut() else {
            return;
        };
        let (previous, next) = particles.surfaces.read_write();
        self.simulation.encode_update(
            &self.context.device,
            &self.context.queue,
            encoder,
            previous,
            next,
            &UpdateUniforms::new(params, time_ms, delta_ms),
        );
        particles.surfaces.swap();
    }

    fn encode_composite(&mut self, encoder: &mut wgpu::CommandEncoder, params: &SimulationParameters) {
        let Some(display) = self.pool.display_mut() else {
            return;
        };
        let (previous, next) = display.surfaces.read_write();
        self.trails.encode(
            &self.context.device,
            &self.context.queue,
            encoder,
            previous,
            next,
            &TrailUniforms::new(params),
        );
        display.surfaces.swap();
    }

    fn encode_draw(&mut self, encoder: &mut wgpu::CommandEncoder, params: &SimulationParameters) {
        let Some((particles, display)) = self.pool.both_mut() else {
            return;
        };
        let uniforms = DrawUniforms::new(params, &particles.layout, display.size);
        self.draw.encode(
            &self.context.device,
            &self.context.queue,
            encoder,
            particles.surfaces.current(),
            display.surfaces.current(),
            &uniforms,
        );
    }

    fn encode_present(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        params: &SimulationParameters,
        target: &ScreenTarget,
    ) {
        let Some(display) = self.pool.display() else {
            return;
        };
        self.present.encode(
            &self.context.device,
            &self.context.queue,
            encoder,
            display.surfaces.current(),
            &target.view,
            target.width,
            target.height,
            present_mode(params),
        );
    }
}

fn present_mode(params: &SimulationParameters) -> PresentMode {
    PresentMode {
        stretch: params.canvas_scale,
        smooth: params.canvas_smooth,
        background: params.background_color.to_array(),
    }
}

impl FramePipeline for GpuPipeline {
    type Target = ScreenTarget;

    fn resize_particles(&mut self, particle_count: u32) -> Result<TextureLayout, ConfigurationError> {
        self.pool
            .resize_particle_buffers(&self.context.device, particle_count)
    }

    fn resize_display(&mut self, size: DisplaySize, background: Vec4) -> Result<(), ConfigurationError> {
        self.pool.resize_display_buffers(&self.context.device, size)?;
        self.clear_display(background);
        Ok(())
    }

    fn init_particles(&mut self) {
        GpuPipeline::init_particles(self);
    }

    fn render(&mut self, frame: &FrameInputs<'_>, target: &ScreenTarget) {
        let mut encoder = self.encoder("Frame Encoder");
        self.encode_simulate(&mut encoder, frame.params, frame.time_ms, frame.delta_ms);
        self.encode_composite(&mut encoder, frame.params);
        self.encode_draw(&mut encoder, frame.params);
        self.encode_present(&mut encoder, frame.params, target);
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    fn redisplay(&mut self, frame: &FrameInputs<'_>, target: &ScreenTarget) {
        self.present(frame.params, target);
    }
}

