//! Render-target pool: the particle-state pair and the display pair.
//!
//! Both pairs are (re)allocated here and nowhere else. Sizes are validated
//! against the device before anything is created, so a rejected resize leaves
//! the previous buffers in place.

use tracing::info;

use super::{BufferPair, DISPLAY_FORMAT};
use crate::error::ConfigurationError;
use crate::layout::TextureLayout;
use crate::viewport::DisplaySize;

/// A texture usable as both render target and shader input.
pub struct RenderSurface {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl RenderSurface {
    fn new(
        device: &wgpu::Device,
        label: &str,
        extent: wgpu::Extent3d,
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width: extent.width,
            height: extent.height,
        }
    }
}

/// Ping-pong pair holding particle positions.
pub struct ParticleStateBuffer {
    pub layout: TextureLayout,
    pub surfaces: BufferPair<RenderSurface>,
}

/// Ping-pong pair holding the accumulated image.
pub struct DisplaySurfacePair {
    pub size: DisplaySize,
    pub surfaces: BufferPair<RenderSurface>,
}

/// Owner of every ping-pong pair.
pub struct RenderTargetPool {
    max_row_width: u32,
    max_dimension: u32,
    state_format: wgpu::TextureFormat,
    particles: Option<ParticleStateBuffer>,
    display: Option<DisplaySurfacePair>,
}

impl RenderTargetPool {
    /// Create an empty pool. Nothing is allocated until the first resize.
    pub fn new(
        max_row_width: u32,
        max_dimension: u32,
        state_format: wgpu::TextureFormat,
    ) -> Result<Self, ConfigurationError> {
        if max_row_width == 0 {
            return Err(ConfigurationError::ZeroRowWidth);
        }
        Ok(Self {
            max_row_width,
            max_dimension,
            state_format,
            particles: None,
            display: None,
        })
    }

    /// Reallocate the particle-state pair for `particle_count` particles.
    ///
    /// The new pair is uninitialized; run the init pass before simulating.
    pub fn resize_particle_buffers(
        &mut self,
        device: &wgpu::Device,
        particle_count: u32,
    ) -> Result<TextureLayout, ConfigurationError> {
        let layout = TextureLayout::new(particle_count, self.max_row_width);
        layout.validate(self.max_dimension)?;

        let extent = layout.extent();
        let format = self.state_format;
        let surfaces = allocate_pair(device, "particle state", || {
            BufferPair::new(
                RenderSurface::new(device, "Particle State A", extent, format),
                RenderSurface::new(device, "Particle State B", extent, format),
            )
        })?;
        info!(
            particles = particle_count,
            row_width = layout.row_width,
            row_count = layout.row_count,
            "particle buffers allocated"
        );
        self.particles = Some(ParticleStateBuffer { layout, surfaces });
        Ok(layout)
    }

    /// Reallocate the display pair. Trail history is lost.
    pub fn resize_display_buffers(
        &mut self,
        device: &wgpu::Device,
        size: DisplaySize,
    ) -> Result<(), ConfigurationError> {
        size.validate(self.max_dimension)?;

        let extent = size.extent();
        let surfaces = allocate_pair(device, "display buffers", || {
            BufferPair::new(
                RenderSurface::new(device, "Display A", extent, DISPLAY_FORMAT),
                RenderSurface::new(device, "Display B", extent, DISPLAY_FORMAT),
            )
        })?;
        info!(width = size.width, height = size.height, "display buffers allocated");
        self.display = Some(DisplaySurfacePair { size, surfaces });
        Ok(())
    }

    pub fn particles(&self) -> Option<&ParticleStateBuffer> {
        self.particles.as_ref()
    }

    pub fn particles_mut(&mut self) -> Option<&mut ParticleStateBuffer> {
        self.particles.as_mut()
    }

    pub fn display(&self) -> Option<&DisplaySurfacePair> {
        self.display.as_ref()
    }

    pub fn display_mut(&mut self) -> Option<&mut DisplaySurfacePair> {
        self.display.as_mut()
    }

    /// Both pairs, once both have been allocated.
    pub fn both_mut(&mut self) -> Option<(&mut ParticleStateBuffer, &mut DisplaySurfacePair)> {
        match (&mut self.particles, &mut self.display) {
            (Some(particles), Some(display)) => Some((particles, display)),
            _ => None,
        }
    }

    pub fn state_format(&self) -> wgpu::TextureFormat {
        self.state_format
    }
}

/// Create a pair inside validation and out-of-memory error scopes.
fn allocate_pair(
    device: &wgpu::Device,
    what: &'static str,
    create: impl FnOnce() -> BufferPair<RenderSurface>,
) -> Result<BufferPair<RenderSurface>, ConfigurationError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pair = create();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());

    match validation.or(out_of_memory) {
        Some(e) => Err(ConfigurationError::Allocation {
            what,
            message: e.to_string(),
        }),
        None => Ok(pair),
    }
}
