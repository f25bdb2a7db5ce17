//! Trail pass.
//!
//! Copies the previous display buffer into the next one while fading it
//! toward the background color. With trails disabled the output is the
//! background alone, so each frame starts from a clean canvas.

use super::targets::RenderSurface;
use super::{fullscreen_pass, fullscreen_pipeline, texture_entry, uniform_buffer, uniform_entry, DISPLAY_FORMAT};
use crate::shader::create_module;
use crate::uniforms::TrailUniforms;

pub struct TrailStage {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniforms: wgpu::Buffer,
}

impl TrailStage {
    pub fn new(device: &wgpu::Device, source: &str) -> Self {
        let module = create_module(device, "Canvas Preprocess Shader", source);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Canvas Preprocess Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1, wgpu::ShaderStages::FRAGMENT, false),
            ],
        });
        let pipeline = fullscreen_pipeline(
            device,
            "Canvas Preprocess Pipeline",
            &module,
            &bind_group_layout,
            DISPLAY_FORMAT,
        );

        Self {
            pipeline,
            bind_group_layout,
            uniforms: uniform_buffer::<TrailUniforms>(device, "Trail Uniforms"),
        }
    }

    pub fn encode(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        previous: &RenderSurface,
        next: &RenderSurface,
        uniforms: &TrailUniforms,
    ) {
        queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Canvas Preprocess Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&previous.view),
                },
            ],
        });

        fullscreen_pass(encoder, "Canvas Preprocess Pass", &next.view, &self.pipeline, &bind_group);
    }
}
