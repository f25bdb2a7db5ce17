//! Particle-state passes: initialization and the per-frame update.
//!
//! Both are fullscreen passes over the state texture, one fragment per
//! particle. The update reads the current state and writes the other half of
//! the pair; the caller swaps afterwards.

use super::targets::RenderSurface;
use super::{fullscreen_pass, fullscreen_pipeline, texture_entry, uniform_buffer, uniform_entry};
use crate::shader::create_module;
use crate::uniforms::{InitUniforms, UpdateUniforms};

pub struct SimulationStage {
    init_pipeline: wgpu::RenderPipeline,
    init_layout: wgpu::BindGroupLayout,
    init_uniforms: wgpu::Buffer,
    update_pipeline: wgpu::RenderPipeline,
    update_layout: wgpu::BindGroupLayout,
    update_uniforms: wgpu::Buffer,
}

impl SimulationStage {
    pub fn new(
        device: &wgpu::Device,
        init_source: &str,
        update_source: &str,
        state_format: wgpu::TextureFormat,
    ) -> Self {
        let init_module = create_module(device, "Init Positions Shader", init_source);
        let init_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Init Positions Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT)],
        });
        let init_pipeline = fullscreen_pipeline(
            device,
            "Init Positions Pipeline",
            &init_module,
            &init_layout,
            state_format,
        );

        let update_module = create_module(device, "Update Positions Shader", update_source);
        let update_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Update Positions Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1, wgpu::ShaderStages::FRAGMENT, false),
            ],
        });
        let update_pipeline = fullscreen_pipeline(
            device,
            "Update Positions Pipeline",
            &update_module,
            &update_layout,
            state_format,
        );

        Self {
            init_pipeline,
            init_layout,
            init_uniforms: uniform_buffer::<InitUniforms>(device, "Init Uniforms"),
            update_pipeline,
            update_layout,
            update_uniforms: uniform_buffer::<UpdateUniforms>(device, "Update Uniforms"),
        }
    }

    /// Write the starting distribution into `target`.
    pub fn encode_init(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &RenderSurface,
        uniforms: &InitUniforms,
    ) {
        queue.write_buffer(&self.init_uniforms, 0, bytemuck::bytes_of(uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Init Positions Bind Group"),
            layout: &self.init_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.init_uniforms.as_entire_binding(),
            }],
        });

        fullscreen_pass(encoder, "Init Positions Pass", &target.view, &self.init_pipeline, &bind_group);
    }

    /// Advance every particle from `previous` into `next`.
    pub fn encode_update(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        previous: &RenderSurface,
        next: &RenderSurface,
        uniforms: &UpdateUniforms,
    ) {
        queue.write_buffer(&self.update_uniforms, 0, bytemuck::bytes_of(uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Update Positions Bind Group"),
            layout: &self.update_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.update_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&previous.view),
                },
            ],
        });

        fullscreen_pass(encoder, "Update Positions Pass", &next.view, &self.update_pipeline, &bind_group);
    }
}
