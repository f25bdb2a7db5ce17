//! # flowtrail
//!
//! A GPU particle effect: particles drift through an evolving fractal noise
//! field and leave fading trails on an accumulation canvas.
//!
//! Everything runs as fullscreen passes over textures. Particle positions live
//! in a ping-pong pair of float textures, one texel per particle; the image
//! lives in a second pair of display buffers.
//!
//! ## Quick Start
//!
//! ```ignore
//! use flowtrail::prelude::*;
//!
//! fn main() -> Result<(), PipelineError> {
//!     let params = SimulationParameters {
//!         particle_count: 50_000,
//!         trail_fade_speed: 0.02,
//!         ..Default::default()
//!     };
//!     App::new(Some(params), ShaderSet::builtin(), DEFAULT_MAX_ROW_WIDTH).run()
//! }
//! ```
//!
//! ## Frame
//!
//! Each running frame the [`FrameDriver`] drains configuration changes and
//! then runs, in order:
//!
//! 1. **Update**: advance every particle along the noise field
//! 2. **Trail**: fade the previous image toward the background
//! 3. **Draw**: splat particles additively onto the faded image
//! 4. **Present**: copy the image to the window
//!
//! While paused nothing is simulated or drawn; the window is only
//! re-presented when it has to be.
//!
//! ## Configuration
//!
//! [`SimulationParameters`] is edited through a [`Configurator`], which turns
//! each edit into a typed [`ConfigEvent`]. Changing the particle count
//! reallocates and re-seeds the particles; changing the resolution reallocates
//! the display buffers and clears the trails. Everything else applies on the
//! next frame.
//!
//! ## Headless use
//!
//! ```ignore
//! use flowtrail::prelude::*;
//!
//! let mut pipeline = GpuPipeline::headless(&ShaderSet::builtin(), DEFAULT_MAX_ROW_WIDTH)?;
//! let params = SimulationParameters::default();
//! pipeline.resize_particles(params.particle_count)?;
//! pipeline.resize_display(DisplaySize { width: 256, height: 256 }, params.background_color)?;
//! pipeline.init_particles();
//! pipeline.simulate(&params, 16.0, 16.0);
//! pipeline.composite(&params);
//! pipeline.draw(&params);
//! pipeline.capture(&params)?.save("frame.png")?;
//! ```

pub mod app;
pub mod driver;
pub mod error;
pub mod events;
pub mod gpu;
pub mod layout;
#[cfg(feature = "egui")]
pub mod panel;
pub mod params;
pub mod shader;
pub mod time;
pub mod uniforms;
pub mod viewport;

pub use app::App;
pub use driver::{DriverState, FrameDriver, FrameInputs, FramePipeline};
pub use error::{ConfigurationError, GpuError, ParamsError, PipelineError, ShaderError};
pub use events::{ChangeKind, ConfigEvent, Configurator};
pub use glam::{Vec2, Vec3, Vec4};
pub use gpu::{BufferPair, GpuContext, GpuPipeline, ScreenTarget};
pub use layout::{TextureLayout, DEFAULT_MAX_ROW_WIDTH};
pub use params::SimulationParameters;
pub use shader::ShaderSet;
pub use time::Clock;
pub use viewport::{DisplaySize, Viewport};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use flowtrail::prelude::*;
/// ```
pub mod prelude {
    pub use crate::app::App;
    pub use crate::driver::{DriverState, FrameDriver, FramePipeline};
    pub use crate::error::PipelineError;
    pub use crate::events::{channel, Configurator};
    pub use crate::gpu::{GpuPipeline, ScreenTarget};
    pub use crate::layout::{TextureLayout, DEFAULT_MAX_ROW_WIDTH};
    pub use crate::params::SimulationParameters;
    pub use crate::shader::ShaderSet;
    pub use crate::viewport::{DisplaySize, Viewport};
    pub use crate::{Vec2, Vec3, Vec4};
    #[cfg(feature = "egui")]
    pub use egui;
}
