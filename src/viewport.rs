//! Window geometry and the display-buffer size derived from it.

use crate::error::ConfigurationError;
use crate::layout::check_extent;
use crate::params::SimulationParameters;

/// Physical window size and pixel ratio, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale_factor: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, scale_factor: f64) -> Self {
        Self {
            width,
            height,
            scale_factor,
        }
    }

    /// Window size in logical (device-independent) pixels.
    pub fn logical_size(&self) -> (f64, f64) {
        let scale = if self.scale_factor > 0.0 { self.scale_factor } else { 1.0 };
        (self.width as f64 / scale, self.height as f64 / scale)
    }
}

/// Size of the display/trail buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

impl DisplaySize {
    /// Resolution percentage of the logical window, times the pixel ratio when
    /// `with_hdpi` is set. Each side is at least one pixel.
    pub fn compute(viewport: &Viewport, params: &SimulationParameters) -> Self {
        let (logical_w, logical_h) = viewport.logical_size();
        let percent = params.canvas_resolution.clamp(1, 100) as f64 / 100.0;
        let ratio = if params.with_hdpi && viewport.scale_factor > 0.0 {
            viewport.scale_factor
        } else {
            1.0
        };
        Self {
            width: ((logical_w * percent * ratio).round() as u32).max(1),
            height: ((logical_h * percent * ratio).round() as u32).max(1),
        }
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    pub fn validate(&self, max_dimension: u32) -> Result<(), ConfigurationError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigurationError::ZeroDisplay);
        }
        check_extent("Display buffer", self.width, self.height, max_dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(resolution: u32, hdpi: bool) -> SimulationParameters {
        SimulationParameters {
            canvas_resolution: resolution,
            with_hdpi: hdpi,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_resolution_hdpi() {
        let viewport = Viewport::new(2560, 1440, 2.0);
        let size = DisplaySize::compute(&viewport, &params(100, true));
        assert_eq!(size, DisplaySize { width: 2560, height: 1440 });
    }

    #[test]
    fn test_without_hdpi_uses_logical_pixels() {
        let viewport = Viewport::new(2560, 1440, 2.0);
        let size = DisplaySize::compute(&viewport, &params(100, false));
        assert_eq!(size, DisplaySize { width: 1280, height: 720 });
    }

    #[test]
    fn test_resolution_percentage() {
        let viewport = Viewport::new(800, 600, 1.0);
        let size = DisplaySize::compute(&viewport, &params(50, true));
        assert_eq!(size, DisplaySize { width: 400, height: 300 });
    }

    #[test]
    fn test_never_zero() {
        let viewport = Viewport::new(1, 1, 1.0);
        let size = DisplaySize::compute(&viewport, &params(1, false));
        assert_eq!(size, DisplaySize { width: 1, height: 1 });

        let minimized = Viewport::new(0, 0, 1.0);
        let size = DisplaySize::compute(&minimized, &params(100, true));
        assert!(size.validate(8192).is_ok());
    }

    #[test]
    fn test_validate_limit() {
        let size = DisplaySize { width: 10000, height: 100 };
        assert!(size.validate(8192).is_err());
        assert_eq!(
            DisplaySize { width: 0, height: 5 }.validate(8192),
            Err(ConfigurationError::ZeroDisplay)
        );
    }
}
