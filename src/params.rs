//! Live configuration of the effect.
//!
//! [`SimulationParameters`] is the flat record the parameter panel edits. It
//! serializes with the same camelCase names the panel exposes, and every field
//! is defaulted so partial presets load.
//!
//! ```ignore
//! let mut params = SimulationParameters::load("presets/calm.json")?;
//! params.trail_fade_speed = 0.05;
//! params.save("presets/calm.json")?;
//! ```

use std::f32::consts::TAU;
use std::fs;
use std::path::Path;

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::ParamsError;

/// Every tunable value of the effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationParameters {
    pub particle_count: u32,
    #[serde(rename = "withHDPI")]
    pub with_hdpi: bool,
    /// Display buffer size as a percentage of the window (1-100).
    pub canvas_resolution: u32,
    /// Stretch the display buffer over the whole window.
    pub canvas_scale: bool,
    /// Linear instead of nearest filtering when stretching.
    pub canvas_smooth: bool,
    pub fps_display: bool,
    pub palette_luminosity: Vec3,
    pub palette_contrast: Vec3,
    pub palette_freq: Vec3,
    pub palette_phase: Vec3,
    pub background_color: Vec4,
    pub speed_step: f32,
    pub point_size: f32,
    pub anim_run: bool,
    pub field_frequence: f32,
    pub field_octaves: u32,
    pub field_gain: f32,
    pub field_lacunarity: f32,
    pub field_shift_x: f32,
    pub field_shift_y: f32,
    pub trail_enabled: bool,
    pub trail_fade_speed: f32,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            particle_count: 1000,
            with_hdpi: true,
            canvas_resolution: 100,
            canvas_scale: true,
            canvas_smooth: false,
            fps_display: false,
            palette_luminosity: Vec3::new(1.0, 1.0, 0.1),
            palette_contrast: Vec3::new(1.0, 1.0, 1.0),
            palette_freq: Vec3::new(2.0, 0.5, 0.5),
            palette_phase: Vec3::new(0.5, 0.5, 0.5),
            background_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            speed_step: 0.0001,
            point_size: 1.0,
            anim_run: true,
            field_frequence: 1.0,
            field_octaves: 1,
            field_gain: 0.5,
            field_lacunarity: 2.0,
            field_shift_x: 0.0,
            field_shift_y: 0.0,
            trail_enabled: true,
            trail_fade_speed: 0.01,
        }
    }
}

impl SimulationParameters {
    /// Defaults adjusted for the display's pixel ratio.
    ///
    /// HDPI displays get two-pixel points so particles keep their apparent size.
    pub fn for_pixel_ratio(scale_factor: f64) -> Self {
        Self {
            point_size: if scale_factor > 1.0 { 2.0 } else { 1.0 },
            ..Self::default()
        }
    }

    /// Load a JSON preset. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the parameters as a pretty-printed JSON preset.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ParamsError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Vector-field shape consumed by the update pass.
    pub fn field(&self) -> FieldParams {
        FieldParams {
            frequency: self.field_frequence,
            octaves: self.field_octaves,
            gain: self.field_gain,
            lacunarity: self.field_lacunarity,
            shift: Vec2::new(self.field_shift_x, self.field_shift_y),
        }
    }

    /// Cosine palette consumed by the draw pass.
    pub fn palette(&self) -> PaletteParams {
        PaletteParams {
            luminosity: self.palette_luminosity,
            contrast: self.palette_contrast,
            frequency: self.palette_freq,
            phase: self.palette_phase,
        }
    }

    /// Fade factor actually applied per frame. Disabled trails clear fully.
    pub fn effective_fade(&self) -> f32 {
        if self.trail_enabled {
            self.trail_fade_speed.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// Shape of the procedural vector field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldParams {
    pub frequency: f32,
    pub octaves: u32,
    pub gain: f32,
    pub lacunarity: f32,
    pub shift: Vec2,
}

/// Cosine palette: `luminosity + contrast * cos(2π(frequency·t + phase))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteParams {
    pub luminosity: Vec3,
    pub contrast: Vec3,
    pub frequency: Vec3,
    pub phase: Vec3,
}

impl PaletteParams {
    /// Evaluate the palette at `t`, clamped to displayable range.
    ///
    /// Mirrors the draw shader so the panel can preview the gradient.
    pub fn color_at(&self, t: f32) -> Vec3 {
        let angle = (self.frequency * t + self.phase) * TAU;
        let raw = self.luminosity
            + self.contrast * Vec3::new(angle.x.cos(), angle.y.cos(), angle.z.cos());
        raw.clamp(Vec3::ZERO, Vec3::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_panel() {
        let params = SimulationParameters::default();
        assert_eq!(params.particle_count, 1000);
        assert_eq!(params.canvas_resolution, 100);
        assert!(params.anim_run);
        assert!(params.trail_enabled);
        assert_eq!(params.trail_fade_speed, 0.01);
        assert_eq!(params.field().octaves, 1);
    }

    #[test]
    fn test_hdpi_point_size() {
        assert_eq!(SimulationParameters::for_pixel_ratio(2.0).point_size, 2.0);
        assert_eq!(SimulationParameters::for_pixel_ratio(1.0).point_size, 1.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let params: SimulationParameters =
            serde_json::from_str(r#"{ "particleCount": 4, "withHDPI": false, "trailFadeSpeed": 0.2 }"#)
                .unwrap();
        assert_eq!(params.particle_count, 4);
        assert!(!params.with_hdpi);
        assert_eq!(params.trail_fade_speed, 0.2);
        assert_eq!(params.field_lacunarity, 2.0);
    }

    #[test]
    fn test_json_uses_camel_case_names() {
        let json = serde_json::to_value(SimulationParameters::default()).unwrap();
        assert!(json.get("canvasResolution").is_some());
        assert!(json.get("paletteLuminosity").is_some());
        assert!(json.get("withHDPI").is_some());
        assert!(json.get("fieldFrequence").is_some());
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("flowtrail-params-{}.json", std::process::id()));
        let params = SimulationParameters {
            particle_count: 77,
            field_shift_x: 0.25,
            ..Default::default()
        };
        params.save(&path).unwrap();
        let loaded = SimulationParameters::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, params);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SimulationParameters::load("/nonexistent/flowtrail.json").unwrap_err();
        assert!(matches!(err, ParamsError::Io(_)));
    }

    #[test]
    fn test_disabled_trail_clears() {
        let mut params = SimulationParameters::default();
        assert_eq!(params.effective_fade(), 0.01);
        params.trail_enabled = false;
        assert_eq!(params.effective_fade(), 1.0);
    }

    #[test]
    fn test_palette_formula() {
        let palette = PaletteParams {
            luminosity: Vec3::splat(0.5),
            contrast: Vec3::splat(0.5),
            frequency: Vec3::ONE,
            phase: Vec3::ZERO,
        };
        // cos(0) = 1, cos(π) = -1
        assert!((palette.color_at(0.0) - Vec3::ONE).length() < 1e-6);
        assert!(palette.color_at(0.5).length() < 1e-6);
    }

    #[test]
    fn test_palette_clamps() {
        let palette = SimulationParameters::default().palette();
        for i in 0..=10 {
            let c = palette.color_at(i as f32 / 10.0);
            assert!(c.min_element() >= 0.0 && c.max_element() <= 1.0);
        }
    }
}
