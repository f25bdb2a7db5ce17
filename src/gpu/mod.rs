//! GPU side of the pipeline.
//!
//! [`GpuContext`] owns the device and queue, created either for a window or
//! headless for tests and offline capture. The stages live in their own
//! modules and are assembled by [`GpuPipeline`].

mod buffer_pair;
mod draw;
#[cfg(feature = "egui")]
pub mod egui_integration;
mod pipeline;
mod present;
mod readback;
mod simulation;
mod targets;
mod trails;

use std::sync::Arc;

use tracing::{info, warn};
use winit::window::Window;

use crate::error::GpuError;

pub use buffer_pair::BufferPair;
pub use pipeline::{GpuPipeline, ScreenTarget};
pub use targets::{DisplaySurfacePair, ParticleStateBuffer, RenderSurface, RenderTargetPool};

/// Particle state: position in `xy`, normalized index in `z`, alive flag in `w`.
pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
/// Particle state on adapters that cannot render to 32-bit float (GL, most mobile).
pub const STATE_FORMAT_FALLBACK: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Display/trail buffers. Half float keeps slow fades from banding and is blendable.
pub const DISPLAY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Offscreen format used by [`GpuPipeline::capture`].
pub const CAPTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Device and queue shared by every stage.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    /// Format of the particle-state pair on this adapter.
    pub state_format: wgpu::TextureFormat,
}

/// Window surface and its current configuration.
pub struct WindowSurface {
    surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Create a context without a surface.
    pub async fn headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        Self::from_adapter(&adapter, "Headless Device").await
    }

    /// Create a context and a configured surface for `window`.
    pub async fn for_window(window: Arc<Window>) -> Result<(Self, WindowSurface), GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let context = Self::from_adapter(&adapter, "Device").await?;

        // Present is a straight copy, so avoid an sRGB re-encode on the way out
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(GpuError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &config);
        info!(format = ?surface_format, width = config.width, height = config.height, "surface configured");

        Ok((context, WindowSurface { surface, config }))
    }

    async fn from_adapter(adapter: &wgpu::Adapter, label: &str) -> Result<Self, GpuError> {
        let adapter_info = adapter.get_info();
        info!(adapter = %adapter_info.name, backend = ?adapter_info.backend, "using adapter");

        let state_format = select_formats(|format| adapter.get_texture_format_features(format))?;
        if state_format != STATE_FORMAT {
            warn!(format = ?state_format, "32-bit float targets unsupported, particle state at reduced precision");
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some(label),
                    required_features: wgpu::Features::empty(),
                    // Allow display buffers as large as the adapter can hold
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_info,
            state_format,
        })
    }

    /// Largest side of a 2D texture on this device.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

/// Check the display format and pick the particle-state format.
///
/// The display pair must be renderable, sampleable and blendable. The state
/// pair only needs to be renderable and sampleable, and falls back to
/// [`STATE_FORMAT_FALLBACK`] when [`STATE_FORMAT`] is not.
pub fn select_formats(
    features: impl Fn(wgpu::TextureFormat) -> wgpu::TextureFormatFeatures,
) -> Result<wgpu::TextureFormat, GpuError> {
    let target = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;

    let display = features(DISPLAY_FORMAT);
    if !display.allowed_usages.contains(target)
        || !display.flags.contains(wgpu::TextureFormatFeatureFlags::BLENDABLE)
    {
        return Err(GpuError::UnsupportedFormat {
            format: DISPLAY_FORMAT,
            needs: "a blendable render target",
        });
    }

    [STATE_FORMAT, STATE_FORMAT_FALLBACK]
        .into_iter()
        .find(|&format| features(format).allowed_usages.contains(target))
        .ok_or(GpuError::UnsupportedFormat {
            format: STATE_FORMAT_FALLBACK,
            needs: "a render target",
        })
}

/// Decode particle-state texels read back from a `format` texture.
pub(crate) fn decode_state(bytes: &[u8], format: wgpu::TextureFormat) -> Vec<[f32; 4]> {
    if format == STATE_FORMAT_FALLBACK {
        bytes
            .chunks_exact(8)
            .map(|texel| {
                let mut out = [0.0; 4];
                for (value, half) in out.iter_mut().zip(texel.chunks_exact(2)) {
                    *value = f16_to_f32(u16::from_le_bytes([half[0], half[1]]));
                }
                out
            })
            .collect()
    } else {
        bytemuck::pod_collect_to_vec(bytes)
    }
}

/// IEEE 754 binary16 to f32.
fn f16_to_f32(bits: u16) -> f32 {
    let sign = ((bits as u32) & 0x8000) << 16;
    let exponent = ((bits >> 10) & 0x1f) as u32;
    let mantissa = (bits & 0x3ff) as u32;

    let magnitude = match exponent {
        0 => {
            // Subnormal: mantissa * 2^-24
            let value = mantissa as f32 * f32::from_bits(0x3380_0000);
            return f32::from_bits(sign | value.to_bits());
        }
        0x1f => 0x7f80_0000 | (mantissa << 13),
        _ => ((exponent + 112) << 23) | (mantissa << 13),
    };
    f32::from_bits(sign | magnitude)
}

impl WindowSurface {
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Reconfigure for a new window size. Zero sizes are ignored.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(device, &self.config);
    }

    /// Reconfigure with the current size, after the surface was lost.
    pub fn reconfigure(&self, device: &wgpu::Device) {
        self.surface.configure(device, &self.config);
    }

    pub fn acquire(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }
}

/// Bind group layout entry for a uniform buffer.
pub(crate) fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Bind group layout entry for a 2D float texture.
pub(crate) fn texture_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    filterable: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Uniform buffer sized for `T`, written each frame.
pub(crate) fn uniform_buffer<T: bytemuck::Pod>(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<T>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Pipeline drawing one fullscreen triangle with `vs_main`/`fs_main`.
pub(crate) fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    module: &wgpu::ShaderModule,
    bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Fullscreen pass writing every texel of `target`.
pub(crate) fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(usages: wgpu::TextureUsages, blendable: bool) -> wgpu::TextureFormatFeatures {
        wgpu::TextureFormatFeatures {
            allowed_usages: usages,
            flags: if blendable {
                wgpu::TextureFormatFeatureFlags::BLENDABLE | wgpu::TextureFormatFeatureFlags::FILTERABLE
            } else {
                wgpu::TextureFormatFeatureFlags::empty()
            },
        }
    }

    fn renderable() -> wgpu::TextureUsages {
        wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST
    }

    fn sample_only() -> wgpu::TextureUsages {
        wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST
    }

    #[test]
    fn test_full_float_state_when_renderable() {
        let format = select_formats(|_| features(renderable(), true)).unwrap();
        assert_eq!(format, STATE_FORMAT);
    }

    #[test]
    fn test_half_float_state_on_gl_like_adapter() {
        // llvmpipe on GL: Rgba32Float can be sampled but not rendered to
        let format = select_formats(|format| match format {
            wgpu::TextureFormat::Rgba32Float => features(sample_only(), false),
            _ => features(renderable(), true),
        })
        .unwrap();
        assert_eq!(format, STATE_FORMAT_FALLBACK);
    }

    #[test]
    fn test_unblendable_display_is_rejected() {
        let result = select_formats(|format| features(renderable(), format != DISPLAY_FORMAT));
        assert!(matches!(
            result,
            Err(GpuError::UnsupportedFormat { format: DISPLAY_FORMAT, .. })
        ));
    }

    #[test]
    fn test_decode_half_state() {
        let halves: [u16; 8] = [0x3c00, 0xb800, 0x3400, 0x0000, 0x0001, 0x8000, 0x7bff, 0xc000];
        let bytes: Vec<u8> = halves.iter().flat_map(|h| h.to_le_bytes()).collect();
        let texels = decode_state(&bytes, STATE_FORMAT_FALLBACK);
        assert_eq!(texels.len(), 2);
        assert_eq!(texels[0], [1.0, -0.5, 0.25, 0.0]);
        assert_eq!(texels[1][0], 2.0f32.powi(-24));
        assert_eq!(texels[1][1].to_bits(), (-0.0f32).to_bits());
        assert_eq!(texels[1][2], 65504.0);
        assert_eq!(texels[1][3], -2.0);
    }

    #[test]
    fn test_decode_full_state() {
        let values = [0.1f32, -0.7, 0.5, 1.0];
        let texels = decode_state(bytemuck::cast_slice(&values[..]), STATE_FORMAT);
        assert_eq!(texels, vec![values]);
    }
}
