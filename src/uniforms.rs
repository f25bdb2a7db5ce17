//! Uniform records, one per shader program.
//!
//! Each record is uploaded whole with `queue.write_buffer` and mirrors the
//! WGSL struct bound at `@group(0) @binding(0)` of its program. Palette
//! vectors are widened to `vec4` so both sides agree on alignment without
//! hand-placed padding.

use bytemuck::{Pod, Zeroable};

use crate::layout::TextureLayout;
use crate::params::SimulationParameters;
use crate::viewport::DisplaySize;

/// Seed of the deterministic starting distribution.
pub const INIT_SEED: u32 = 0x9e37_79b9;

/// `init_positions.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InitUniforms {
    pub row_width: u32,
    pub row_count: u32,
    pub particle_count: u32,
    pub seed: u32,
}

impl InitUniforms {
    pub fn new(layout: &TextureLayout) -> Self {
        Self {
            row_width: layout.row_width,
            row_count: layout.row_count,
            particle_count: layout.particle_count,
            seed: INIT_SEED,
        }
    }
}

/// `update_positions.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct UpdateUniforms {
    pub time_ms: f32,
    pub delta_ms: f32,
    pub speed_step: f32,
    pub field_frequency: f32,
    pub field_shift: [f32; 2],
    pub field_gain: f32,
    pub field_lacunarity: f32,
    pub field_octaves: u32,
    pub _pad: [u32; 3],
}

impl UpdateUniforms {
    pub fn new(params: &SimulationParameters, time_ms: f32, delta_ms: f32) -> Self {
        let field = params.field();
        Self {
            time_ms,
            delta_ms,
            speed_step: params.speed_step,
            field_frequency: field.frequency,
            field_shift: field.shift.to_array(),
            field_gain: field.gain,
            field_lacunarity: field.lacunarity,
            field_octaves: field.octaves,
            _pad: [0; 3],
        }
    }
}

/// `canvas_preprocess.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TrailUniforms {
    pub background: [f32; 4],
    pub fade: f32,
    pub enabled: u32,
    pub _pad: [u32; 2],
}

impl TrailUniforms {
    pub fn new(params: &SimulationParameters) -> Self {
        Self {
            background: params.background_color.to_array(),
            fade: params.effective_fade(),
            enabled: params.trail_enabled as u32,
            _pad: [0; 2],
        }
    }
}

/// `draw_particles.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub palette_luminosity: [f32; 4],
    pub palette_contrast: [f32; 4],
    pub palette_frequency: [f32; 4],
    pub palette_phase: [f32; 4],
    pub resolution: [f32; 2],
    pub point_size: f32,
    pub particle_count: u32,
    pub row_width: u32,
    pub _pad: [u32; 3],
}

impl DrawUniforms {
    pub fn new(params: &SimulationParameters, layout: &TextureLayout, display: DisplaySize) -> Self {
        let palette = params.palette();
        Self {
            palette_luminosity: palette.luminosity.extend(0.0).to_array(),
            palette_contrast: palette.contrast.extend(0.0).to_array(),
            palette_frequency: palette.frequency.extend(0.0).to_array(),
            palette_phase: palette.phase.extend(0.0).to_array(),
            resolution: [display.width as f32, display.height as f32],
            point_size: params.point_size.max(0.0),
            particle_count: layout.particle_count,
            row_width: layout.row_width,
            _pad: [0; 3],
        }
    }
}

/// `present.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PresentUniforms {
    /// Fraction of the display buffer shown across the viewport.
    pub uv_scale: [f32; 2],
    pub _pad: [f32; 2],
}

impl PresentUniforms {
    /// Stretch the whole buffer over the viewport.
    pub const STRETCH: Self = Self {
        uv_scale: [1.0, 1.0],
        _pad: [0.0; 2],
    };

    /// Show the buffer 1:1 in a viewport of `viewport_width`x`viewport_height`
    /// pixels, cropping whatever does not fit.
    pub fn unscaled(display: DisplaySize, viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            uv_scale: [
                viewport_width as f32 / display.width.max(1) as f32,
                viewport_height as f32 / display.height.max(1) as f32,
            ],
            _pad: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn test_sizes_are_uniform_aligned() {
        assert_eq!(size_of::<InitUniforms>(), 16);
        assert_eq!(size_of::<UpdateUniforms>(), 48);
        assert_eq!(size_of::<TrailUniforms>(), 32);
        assert_eq!(size_of::<DrawUniforms>(), 96);
        assert_eq!(size_of::<PresentUniforms>(), 16);
    }

    #[test]
    fn test_update_field_offsets() {
        let u = UpdateUniforms::new(&SimulationParameters::default(), 0.0, 0.0);
        let base = &u as *const _ as usize;
        // WGSL places vec2<f32> on an 8-byte boundary
        assert_eq!(&u.field_shift as *const _ as usize - base, 16);
        assert_eq!(&u.field_octaves as *const _ as usize - base, 32);
    }

    #[test]
    fn test_trail_disabled_forces_full_fade() {
        let params = SimulationParameters {
            trail_enabled: false,
            trail_fade_speed: 0.2,
            ..Default::default()
        };
        let u = TrailUniforms::new(&params);
        assert_eq!(u.enabled, 0);
        assert_eq!(u.fade, 1.0);
    }

    #[test]
    fn test_draw_uniforms_carry_layout() {
        let layout = TextureLayout::new(4, 1024);
        let display = DisplaySize { width: 64, height: 32 };
        let u = DrawUniforms::new(&SimulationParameters::default(), &layout, display);
        assert_eq!(u.row_width, 1024);
        assert_eq!(u.particle_count, 4);
        assert_eq!(u.resolution, [64.0, 32.0]);
        assert_eq!(u.palette_frequency[..3], [2.0, 0.5, 0.5]);
    }

    #[test]
    fn test_unscaled_present_crops() {
        let display = DisplaySize { width: 200, height: 100 };
        let u = PresentUniforms::unscaled(display, 100, 100);
        assert_eq!(u.uv_scale, [0.5, 1.0]);
    }
}
