//! Texel-grid layout of the particle-state texture.
//!
//! Particles are packed row-major into a 2D texture whose rows are
//! `max_row_width` texels wide. Particle `i` lives at texel
//! `(i % row_width, i / row_width)`.

use crate::error::ConfigurationError;

/// Default maximum width of one particle-state row.
pub const DEFAULT_MAX_ROW_WIDTH: u32 = 1024;

/// Shape of a particle-state texture holding `particle_count` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureLayout {
    pub row_width: u32,
    pub row_count: u32,
    pub particle_count: u32,
}

impl TextureLayout {
    /// Compute the layout for `particle_count` particles.
    ///
    /// A count of zero yields a single empty row. A `max_row_width` of zero is
    /// treated as one; [`validate`](Self::validate) rejects both cases before
    /// anything is allocated.
    pub fn new(particle_count: u32, max_row_width: u32) -> Self {
        let row_width = max_row_width.max(1);
        let row_count = particle_count.div_ceil(row_width).max(1);
        Self {
            row_width,
            row_count,
            particle_count,
        }
    }

    /// Number of texels in the texture, used or not.
    pub fn capacity(&self) -> u64 {
        self.row_width as u64 * self.row_count as u64
    }

    /// Texel coordinate of particle `index`.
    #[inline]
    pub fn texel_of(&self, index: u32) -> (u32, u32) {
        (index % self.row_width, index / self.row_width)
    }

    /// Texel coordinates the draw stage samples, in instance order.
    pub fn texels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.particle_count).map(move |i| self.texel_of(i))
    }

    /// Texture extent for allocation.
    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.row_width,
            height: self.row_count,
            depth_or_array_layers: 1,
        }
    }

    /// Check that this layout can be allocated on a device whose 2D textures
    /// are limited to `max_dimension` texels per side.
    pub fn validate(&self, max_dimension: u32) -> Result<(), ConfigurationError> {
        if self.particle_count == 0 {
            return Err(ConfigurationError::ZeroParticles);
        }
        check_extent("Particle state", self.row_width, self.row_count, max_dimension)
    }
}

/// Reject textures with a side longer than `max_dimension`.
pub(crate) fn check_extent(
    what: &'static str,
    width: u32,
    height: u32,
    max_dimension: u32,
) -> Result<(), ConfigurationError> {
    if width > max_dimension || height > max_dimension {
        return Err(ConfigurationError::ExtentTooLarge {
            what,
            width,
            height,
            max: max_dimension,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_single_row() {
        let layout = TextureLayout::new(4, 1024);
        assert_eq!((layout.row_width, layout.row_count), (1024, 1));
    }

    #[test]
    fn test_exact_multiple() {
        let layout = TextureLayout::new(2048, 1024);
        assert_eq!(layout.row_count, 2);
        assert_eq!(layout.texel_of(2047), (1023, 1));
    }

    #[test]
    fn test_partial_last_row() {
        let layout = TextureLayout::new(1025, 1024);
        assert_eq!(layout.row_count, 2);
        assert_eq!(layout.texel_of(1024), (0, 1));
    }

    #[test]
    fn test_zero_particles_is_one_empty_row() {
        let layout = TextureLayout::new(0, 256);
        assert_eq!((layout.row_width, layout.row_count), (256, 1));
        assert_eq!(layout.texels().count(), 0);
        assert_eq!(layout.validate(8192), Err(ConfigurationError::ZeroParticles));
    }

    #[test]
    fn test_texels_cover_first_and_last() {
        let layout = TextureLayout::new(10, 3);
        let texels: Vec<_> = layout.texels().collect();
        assert_eq!(texels.len(), 10);
        assert_eq!(texels[0], (0, 0));
        assert_eq!(texels[9], (0, 3));

        let distinct: HashSet<_> = texels.iter().copied().collect();
        assert_eq!(distinct.len(), 10);
    }

    #[test]
    fn test_validate_against_limit() {
        let layout = TextureLayout::new(1024 * 9000, 1024);
        assert!(matches!(
            layout.validate(8192),
            Err(ConfigurationError::ExtentTooLarge { height: 9000, .. })
        ));

        let wide = TextureLayout::new(10, 16384);
        assert!(wide.validate(8192).is_err());
        assert!(TextureLayout::new(10, 1024).validate(8192).is_ok());
    }
}
