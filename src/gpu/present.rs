//! Present pass: copy the display buffer to a screen-sized target.
//!
//! With `canvas_scale` the buffer is stretched over the whole target, sampled
//! nearest or linear depending on `canvas_smooth`. Without it the buffer is
//! shown 1:1 from the top-left corner and the rest of the target is filled
//! with the background color.

use super::targets::RenderSurface;
use super::{fullscreen_pipeline, texture_entry, uniform_buffer, uniform_entry};
use crate::shader::create_module;
use crate::uniforms::PresentUniforms;
use crate::viewport::DisplaySize;

/// How the display buffer maps onto the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentMode {
    pub stretch: bool,
    pub smooth: bool,
    pub background: [f32; 4],
}

pub struct PresentStage {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniforms: wgpu::Buffer,
    nearest: wgpu::Sampler,
    linear: wgpu::Sampler,
}

impl PresentStage {
    /// Build for a specific target format (the surface, or the capture texture).
    pub fn new(device: &wgpu::Device, source: &str, target_format: wgpu::TextureFormat) -> Self {
        let module = create_module(device, "Present Shader", source);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Present Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX),
                texture_entry(1, wgpu::ShaderStages::FRAGMENT, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline = fullscreen_pipeline(
            device,
            "Present Pipeline",
            &module,
            &bind_group_layout,
            target_format,
        );

        Self {
            pipeline,
            bind_group_layout,
            uniforms: uniform_buffer::<PresentUniforms>(device, "Present Uniforms"),
            nearest: create_sampler(device, "Present Sampler (Nearest)", wgpu::FilterMode::Nearest),
            linear: create_sampler(device, "Present Sampler (Linear)", wgpu::FilterMode::Linear),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        display: &RenderSurface,
        target: &wgpu::TextureView,
        target_width: u32,
        target_height: u32,
        mode: PresentMode,
    ) {
        let display_size = DisplaySize {
            width: display.width,
            height: display.height,
        };
        let (viewport_width, viewport_height, uniforms) = if mode.stretch {
            (target_width, target_height, PresentUniforms::STRETCH)
        } else {
            let width = display.width.min(target_width);
            let height = display.height.min(target_height);
            (width, height, PresentUniforms::unscaled(display_size, width, height))
        };
        queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let sampler = if mode.smooth { &self.linear } else { &self.nearest };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Present Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&display.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let [r, g, b, a] = mode.background;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Present Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        if viewport_width > 0 && viewport_height > 0 {
            pass.set_viewport(0.0, 0.0, viewport_width as f32, viewport_height as f32, 0.0, 1.0);
            pass.draw(0..3, 0..1);
        }
    }
}

fn create_sampler(device: &wgpu::Device, label: &str, filter: wgpu::FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
