//! Error types for flowtrail.
//!
//! Every error here is fatal for the pipeline as a whole: allocation and shader
//! problems abort setup instead of leaving a half-built pipeline behind.
//! Per-frame surface hiccups are not errors; the frame is simply dropped.

use std::fmt;
use std::io;

/// Requested buffer dimensions are invalid or exceed what the device supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A particle buffer was requested for zero particles.
    ZeroParticles,
    /// The maximum row width of the particle-state texture was zero.
    ZeroRowWidth,
    /// A display buffer was requested with a zero dimension.
    ZeroDisplay,
    /// A texture would be larger than the device's 2D texture limit.
    ExtentTooLarge {
        what: &'static str,
        width: u32,
        height: u32,
        max: u32,
    },
    /// The device refused to create a buffer pair.
    Allocation { what: &'static str, message: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::ZeroParticles => write!(f, "Particle count must be at least 1"),
            ConfigurationError::ZeroRowWidth => write!(f, "Maximum row width must be at least 1"),
            ConfigurationError::ZeroDisplay => write!(f, "Display buffers must be at least 1x1"),
            ConfigurationError::ExtentTooLarge { what, width, height, max } => write!(
                f,
                "{} of {}x{} exceeds the device texture limit of {}",
                what, width, height, max
            ),
            ConfigurationError::Allocation { what, message } => {
                write!(f, "Failed to allocate {}: {}", what, message)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// A shader program could not be loaded or did not validate.
#[derive(Debug)]
pub enum ShaderError {
    /// Failed to read a shader source file.
    Load { name: &'static str, source: io::Error },
    /// The WGSL failed to parse or validate.
    Compile { name: &'static str, message: String },
    /// The programs validated on their own but the device rejected a stage
    /// pipeline built from them.
    Link { message: String },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Load { name, source } => {
                write!(f, "Failed to read {} shader: {}", name, source)
            }
            ShaderError::Compile { name, message } => {
                write!(f, "{} shader failed to compile:\n{}", name, message)
            }
            ShaderError::Link { message } => {
                write!(f, "Stage pipelines failed to link:\n{}", message)
            }
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShaderError::Load { source, .. } => Some(source),
            ShaderError::Compile { .. } | ShaderError::Link { .. } => None,
        }
    }
}

/// Errors that can occur during GPU initialization and readback.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to map buffer for reading.
    BufferMapping(String),
    /// The adapter cannot use a texture format the way the pipeline needs.
    UnsupportedFormat {
        format: wgpu::TextureFormat,
        needs: &'static str,
    },
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {}", msg),
            GpuError::UnsupportedFormat { format, needs } => {
                write!(f, "Adapter does not support {:?} as {}", format, needs)
            }
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can occur when loading or saving a parameter preset.
#[derive(Debug)]
pub enum ParamsError {
    /// Failed to read or write the preset file.
    Io(io::Error),
    /// The preset is not valid JSON for [`SimulationParameters`](crate::SimulationParameters).
    Json(serde_json::Error),
}

impl fmt::Display for ParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamsError::Io(e) => write!(f, "Failed to access preset file: {}", e),
            ParamsError::Json(e) => write!(f, "Invalid preset: {}", e),
        }
    }
}

impl std::error::Error for ParamsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParamsError::Io(e) => Some(e),
            ParamsError::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for ParamsError {
    fn from(e: io::Error) -> Self {
        ParamsError::Io(e)
    }
}

impl From<serde_json::Error> for ParamsError {
    fn from(e: serde_json::Error) -> Self {
        ParamsError::Json(e)
    }
}

/// Top-level error for building and running the effect.
#[derive(Debug)]
pub enum PipelineError {
    /// Invalid buffer dimensions.
    Configuration(ConfigurationError),
    /// A shader failed to load or compile.
    Shader(ShaderError),
    /// GPU initialization or readback failed.
    Gpu(GpuError),
    /// A parameter preset could not be loaded.
    Params(ParamsError),
    /// Failed to encode or write a captured frame.
    Capture(image::ImageError),
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Configuration(e) => write!(f, "Configuration error: {}", e),
            PipelineError::Shader(e) => write!(f, "Shader error: {}", e),
            PipelineError::Gpu(e) => write!(f, "GPU error: {}", e),
            PipelineError::Params(e) => write!(f, "Parameter error: {}", e),
            PipelineError::Capture(e) => write!(f, "Failed to save capture: {}", e),
            PipelineError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            PipelineError::Window(e) => write!(f, "Failed to create window: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Configuration(e) => Some(e),
            PipelineError::Shader(e) => Some(e),
            PipelineError::Gpu(e) => Some(e),
            PipelineError::Params(e) => Some(e),
            PipelineError::Capture(e) => Some(e),
            PipelineError::EventLoop(e) => Some(e),
            PipelineError::Window(e) => Some(e),
        }
    }
}

impl From<ConfigurationError> for PipelineError {
    fn from(e: ConfigurationError) -> Self {
        PipelineError::Configuration(e)
    }
}

impl From<ShaderError> for PipelineError {
    fn from(e: ShaderError) -> Self {
        PipelineError::Shader(e)
    }
}

impl From<GpuError> for PipelineError {
    fn from(e: GpuError) -> Self {
        PipelineError::Gpu(e)
    }
}

impl From<ParamsError> for PipelineError {
    fn from(e: ParamsError) -> Self {
        PipelineError::Params(e)
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(e: image::ImageError) -> Self {
        PipelineError::Capture(e)
    }
}

impl From<winit::error::EventLoopError> for PipelineError {
    fn from(e: winit::error::EventLoopError) -> Self {
        PipelineError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for PipelineError {
    fn from(e: winit::error::OsError) -> Self {
        PipelineError::Window(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_message_names_limit() {
        let err = ConfigurationError::ExtentTooLarge {
            what: "Particle state",
            width: 1024,
            height: 9000,
            max: 8192,
        };
        assert_eq!(
            err.to_string(),
            "Particle state of 1024x9000 exceeds the device texture limit of 8192"
        );
    }

    #[test]
    fn test_pipeline_error_keeps_source() {
        let err: PipelineError = ConfigurationError::ZeroParticles.into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("at least 1"));
    }
}
