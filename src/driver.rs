//! Frame driver.
//!
//! The driver owns the authoritative [`SimulationParameters`] and the clock.
//! Once per redraw it drains pending [`ConfigEvent`]s, reallocates whatever
//! they require, advances the clock, and hands the pipeline a read-only
//! [`FrameInputs`] snapshot. Events that arrive after [`tick`](FrameDriver::tick)
//! are seen on the next frame, never halfway through one.
//!
//! The GPU sits behind [`FramePipeline`] so the driver can be exercised
//! without a device.

use std::sync::mpsc::Receiver;
use std::time::Instant;

use glam::Vec4;
use tracing::{debug, info};

use crate::error::ConfigurationError;
use crate::events::ConfigEvent;
use crate::layout::TextureLayout;
use crate::params::SimulationParameters;
use crate::time::Clock;
use crate::viewport::{DisplaySize, Viewport};

/// Everything a pipeline needs to render one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    pub params: &'a SimulationParameters,
    pub layout: TextureLayout,
    pub display: DisplaySize,
    /// Accumulated simulation time.
    pub time_ms: f32,
    /// Simulation time advanced by this frame. Zero while paused.
    pub delta_ms: f32,
}

/// The stages the driver sequences, as seen from the driver.
pub trait FramePipeline {
    /// Where [`render`](Self::render) and [`redisplay`](Self::redisplay) present to.
    type Target;

    /// Reallocate the particle-state pair. Contents are undefined until
    /// [`init_particles`](Self::init_particles) runs.
    fn resize_particles(&mut self, particle_count: u32) -> Result<TextureLayout, ConfigurationError>;

    /// Reallocate the display pair and clear it to `background`.
    fn resize_display(&mut self, size: DisplaySize, background: Vec4) -> Result<(), ConfigurationError>;

    /// Write the starting distribution into the current particle state.
    fn init_particles(&mut self);

    /// Simulate, fade, draw, and present one frame.
    fn render(&mut self, frame: &FrameInputs<'_>, target: &Self::Target);

    /// Present the current display buffer without touching any buffer.
    fn redisplay(&mut self, frame: &FrameInputs<'_>, target: &Self::Target);
}

/// Whether frames advance the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Paused,
}

/// Sequences configuration changes, the clock, and the pipeline.
pub struct FrameDriver<P: FramePipeline> {
    pipeline: P,
    params: SimulationParameters,
    viewport: Viewport,
    layout: TextureLayout,
    display: DisplaySize,
    clock: Clock,
    state: DriverState,
    events: Receiver<ConfigEvent>,
}

impl<P: FramePipeline> FrameDriver<P> {
    /// Allocate both buffer pairs, initialize the particles, and start the clock.
    pub fn new(
        mut pipeline: P,
        params: SimulationParameters,
        viewport: Viewport,
        events: Receiver<ConfigEvent>,
        now: Instant,
    ) -> Result<Self, ConfigurationError> {
        let layout = pipeline.resize_particles(params.particle_count)?;
        let display_size = DisplaySize::compute(&viewport, &params);
        pipeline.resize_display(display_size, params.background_color)?;
        pipeline.init_particles();

        let state = if params.anim_run {
            DriverState::Running
        } else {
            DriverState::Paused
        };
        info!(
            particles = layout.particle_count,
            width = display_size.width,
            height = display_size.height,
            ?state,
            "frame driver ready"
        );

        Ok(Self {
            pipeline,
            params,
            viewport,
            layout,
            display: display_size,
            clock: Clock::new(now),
            state,
            events,
        })
    }

    /// Apply pending configuration and advance the clock.
    ///
    /// An error means a buffer could not be reallocated; the previous buffers
    /// are still in place but the configuration can no longer be honored.
    pub fn tick(&mut self, now: Instant) -> Result<DriverState, ConfigurationError> {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event)?;
        }

        let state = if self.params.anim_run {
            DriverState::Running
        } else {
            DriverState::Paused
        };
        if state != self.state {
            info!(?state, "animation state changed");
            self.state = state;
        }

        self.clock.tick(now, state == DriverState::Running);
        Ok(state)
    }

    /// Render a frame if running. Returns whether anything was rendered.
    pub fn render(&mut self, target: &P::Target) -> bool {
        if self.state == DriverState::Paused {
            return false;
        }
        let frame = FrameInputs {
            params: &self.params,
            layout: self.layout,
            display: self.display,
            time_ms: self.clock.accumulated_ms(),
            delta_ms: self.clock.delta_ms(),
        };
        self.pipeline.render(&frame, target);
        true
    }

    /// Re-present the last frame, e.g. after the window was exposed while paused.
    pub fn redisplay(&mut self, target: &P::Target) {
        let frame = FrameInputs {
            params: &self.params,
            layout: self.layout,
            display: self.display,
            time_ms: self.clock.accumulated_ms(),
            delta_ms: 0.0,
        };
        self.pipeline.redisplay(&frame, target);
    }

    /// [`tick`](Self::tick) followed by [`render`](Self::render).
    pub fn frame(&mut self, now: Instant, target: &P::Target) -> Result<DriverState, ConfigurationError> {
        let state = self.tick(now)?;
        self.render(target);
        Ok(state)
    }

    fn apply(&mut self, event: ConfigEvent) -> Result<(), ConfigurationError> {
        debug!(kind = ?event.kind(), "applying configuration change");
        match event {
            ConfigEvent::ParameterChanged(params) => {
                self.params = params;
            }
            ConfigEvent::ResolutionChanged { params, viewport } => {
                let display = DisplaySize::compute(&viewport, &params);
                self.pipeline.resize_display(display, params.background_color)?;
                self.params = params;
                self.viewport = viewport;
                self.display = display;
            }
            ConfigEvent::CountChanged(params) => {
                let layout = self.pipeline.resize_particles(params.particle_count)?;
                self.pipeline.init_particles();
                self.params = params;
                self.layout = layout;
            }
        }
        Ok(())
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn layout(&self) -> TextureLayout {
        self.layout
    }

    pub fn display_size(&self) -> DisplaySize {
        self.display
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{channel, Configurator};
    use crate::layout::DEFAULT_MAX_ROW_WIDTH;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        ResizeParticles(u32),
        ResizeDisplay(DisplaySize),
        Init,
        Render { time_ms: f32, point_size: f32 },
        Redisplay,
    }

    /// Records calls and models buffer contents as a frame counter.
    #[derive(Default)]
    struct RecordingPipeline {
        calls: Vec<Call>,
        frames_written: u32,
    }

    impl FramePipeline for RecordingPipeline {
        type Target = ();

        fn resize_particles(&mut self, particle_count: u32) -> Result<TextureLayout, ConfigurationError> {
            let layout = TextureLayout::new(particle_count, DEFAULT_MAX_ROW_WIDTH);
            layout.validate(8192)?;
            self.calls.push(Call::ResizeParticles(particle_count));
            Ok(layout)
        }

        fn resize_display(&mut self, size: DisplaySize, _background: Vec4) -> Result<(), ConfigurationError> {
            size.validate(8192)?;
            self.calls.push(Call::ResizeDisplay(size));
            Ok(())
        }

        fn init_particles(&mut self) {
            self.frames_written = 0;
            self.calls.push(Call::Init);
        }

        fn render(&mut self, frame: &FrameInputs<'_>, _target: &()) {
            self.frames_written += 1;
            self.calls.push(Call::Render {
                time_ms: frame.time_ms,
                point_size: frame.params.point_size,
            });
        }

        fn redisplay(&mut self, _frame: &FrameInputs<'_>, _target: &()) {
            self.calls.push(Call::Redisplay);
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup(params: SimulationParameters) -> (FrameDriver<RecordingPipeline>, Configurator, Instant) {
        let viewport = Viewport::new(800, 600, 1.0);
        let (config, rx) = channel(params.clone(), viewport);
        let start = Instant::now();
        let driver = FrameDriver::new(RecordingPipeline::default(), params, viewport, rx, start).unwrap();
        (driver, config, start)
    }

    fn renders(driver: &FrameDriver<RecordingPipeline>) -> usize {
        driver
            .pipeline()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Render { .. }))
            .count()
    }

    #[test]
    fn test_startup_allocates_then_inits() {
        let (driver, _config, _) = setup(SimulationParameters::default());
        assert_eq!(
            driver.pipeline().calls,
            vec![
                Call::ResizeParticles(1000),
                Call::ResizeDisplay(DisplaySize { width: 800, height: 600 }),
                Call::Init,
            ]
        );
        assert_eq!(driver.state(), DriverState::Running);
    }

    #[test]
    fn test_paused_frames_touch_nothing() {
        let (mut driver, mut config, start) = setup(SimulationParameters::default());
        driver.frame(start + ms(16), &()).unwrap();
        config.edit(|p| p.anim_run = false);

        let before = driver.pipeline().calls.len();
        for i in 2..10 {
            assert_eq!(driver.frame(start + ms(i * 16), &()).unwrap(), DriverState::Paused);
        }
        assert_eq!(driver.pipeline().calls.len(), before);
        assert_eq!(driver.pipeline().frames_written, 1);
        assert_eq!(driver.clock().accumulated(), ms(16));
    }

    #[test]
    fn test_resume_does_not_jump() {
        let (mut driver, mut config, start) = setup(SimulationParameters::default());
        driver.frame(start + ms(10), &()).unwrap();
        config.edit(|p| p.anim_run = false);
        driver.frame(start + ms(20), &()).unwrap();
        driver.frame(start + ms(10_020), &()).unwrap();
        config.edit(|p| p.anim_run = true);
        driver.frame(start + ms(10_036), &()).unwrap();

        assert_eq!(driver.clock().delta(), ms(16));
        assert_eq!(driver.clock().accumulated(), ms(26));
    }

    #[test]
    fn test_count_change_reallocates_and_reinits() {
        let (mut driver, mut config, start) = setup(SimulationParameters::default());
        driver.frame(start + ms(16), &()).unwrap();
        config.edit(|p| p.particle_count = 5000);
        driver.tick(start + ms(32)).unwrap();

        let calls = &driver.pipeline().calls;
        assert_eq!(&calls[calls.len() - 2..], &[Call::ResizeParticles(5000), Call::Init]);
        assert_eq!(driver.layout().row_count, 5);
    }

    #[test]
    fn test_count_round_trip_matches_fresh_layout() {
        let (mut driver, mut config, start) = setup(SimulationParameters::default());
        config.edit(|p| p.particle_count = 5000);
        driver.tick(start + ms(16)).unwrap();
        config.edit(|p| p.particle_count = 1000);
        driver.tick(start + ms(32)).unwrap();

        assert_eq!(driver.layout(), TextureLayout::new(1000, DEFAULT_MAX_ROW_WIDTH));
        let calls = &driver.pipeline().calls;
        assert_eq!(
            &calls[3..],
            &[
                Call::ResizeParticles(5000),
                Call::Init,
                Call::ResizeParticles(1000),
                Call::Init,
            ]
        );
    }

    #[test]
    fn test_resolution_change_only_touches_display() {
        let (mut driver, mut config, start) = setup(SimulationParameters::default());
        config.edit(|p| p.canvas_resolution = 50);
        driver.tick(start + ms(16)).unwrap();

        let last = driver.pipeline().calls.last().cloned();
        assert_eq!(last, Some(Call::ResizeDisplay(DisplaySize { width: 400, height: 300 })));
        assert_eq!(driver.display_size(), DisplaySize { width: 400, height: 300 });
        let inits = driver.pipeline().calls.iter().filter(|c| **c == Call::Init).count();
        assert_eq!(inits, 1);
    }

    #[test]
    fn test_window_resize_round_trip() {
        let (mut driver, mut config, start) = setup(SimulationParameters::default());
        let original = driver.display_size();

        config.set_viewport(Viewport::new(1920, 1080, 1.0));
        driver.tick(start + ms(16)).unwrap();
        assert_eq!(driver.display_size(), DisplaySize { width: 1920, height: 1080 });

        config.set_viewport(Viewport::new(800, 600, 1.0));
        driver.tick(start + ms(32)).unwrap();
        assert_eq!(driver.display_size(), original);
        assert_eq!(driver.layout(), TextureLayout::new(1000, DEFAULT_MAX_ROW_WIDTH));
    }

    #[test]
    fn test_frame_sees_consistent_snapshot() {
        let (mut driver, mut config, start) = setup(SimulationParameters::default());
        driver.tick(start + ms(16)).unwrap();
        // Arrives between tick and render
        config.edit(|p| p.point_size = 7.0);
        driver.render(&());
        driver.frame(start + ms(32), &()).unwrap();

        let sizes: Vec<f32> = driver
            .pipeline()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Render { point_size, .. } => Some(*point_size),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![1.0, 7.0]);
    }

    #[test]
    fn test_render_receives_accumulated_time() {
        let (mut driver, _config, start) = setup(SimulationParameters::default());
        driver.frame(start + ms(100), &()).unwrap();
        driver.frame(start + ms(250), &()).unwrap();
        match driver.pipeline().calls.last() {
            Some(Call::Render { time_ms, .. }) => assert!((time_ms - 250.0).abs() < 1e-3),
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[test]
    fn test_redisplay_while_paused() {
        let params = SimulationParameters {
            anim_run: false,
            ..Default::default()
        };
        let (mut driver, _config, start) = setup(params);
        driver.frame(start + ms(16), &()).unwrap();
        driver.redisplay(&());
        assert_eq!(driver.pipeline().calls.last(), Some(&Call::Redisplay));
        assert_eq!(renders(&driver), 0);
    }

    #[test]
    fn test_zero_particles_is_fatal() {
        let (mut driver, mut config, start) = setup(SimulationParameters::default());
        config.edit(|p| p.particle_count = 0);
        assert_eq!(driver.tick(start + ms(16)), Err(ConfigurationError::ZeroParticles));
        // Previous allocation is still what the driver reports
        assert_eq!(driver.layout().particle_count, 1000);
    }

    #[test]
    fn test_startup_rejects_zero_particles() {
        let params = SimulationParameters {
            particle_count: 0,
            ..Default::default()
        };
        let viewport = Viewport::new(800, 600, 1.0);
        let (_config, rx) = channel(params.clone(), viewport);
        let result = FrameDriver::new(RecordingPipeline::default(), params, viewport, rx, Instant::now());
        assert!(matches!(result, Err(ConfigurationError::ZeroParticles)));
    }
}
