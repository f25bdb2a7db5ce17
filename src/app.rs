//! Windowed application: winit event loop around the frame driver.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::driver::{DriverState, FrameDriver};
use crate::error::PipelineError;
use crate::events::{self, Configurator};
use crate::gpu::{GpuContext, GpuPipeline, ScreenTarget, WindowSurface};
use crate::params::SimulationParameters;
use crate::shader::ShaderSet;
use crate::viewport::Viewport;

#[cfg(feature = "egui")]
use crate::gpu::egui_integration::EguiIntegration;
#[cfg(feature = "egui")]
use crate::panel::ParameterPanel;

const TITLE: &str = "flowtrail";

/// Everything that exists once the window does.
struct Running {
    window: Arc<Window>,
    surface: WindowSurface,
    driver: FrameDriver<GpuPipeline>,
    config: Configurator,
    #[cfg(feature = "egui")]
    egui: EguiIntegration,
    #[cfg(feature = "egui")]
    panel: ParameterPanel,
    /// The window must be repainted even if the animation is paused.
    needs_redisplay: bool,
    title: String,
    captures: u32,
}

/// The flowtrail window.
pub struct App {
    /// Preset to start from; `None` uses defaults for the display's pixel ratio.
    preset: Option<SimulationParameters>,
    shaders: ShaderSet,
    max_row_width: u32,
    running: Option<Running>,
    error: Option<PipelineError>,
}

impl App {
    pub fn new(preset: Option<SimulationParameters>, shaders: ShaderSet, max_row_width: u32) -> Self {
        Self {
            preset,
            shaders,
            max_row_width,
            running: None,
            error: None,
        }
    }

    /// Open the window and run until it is closed.
    pub fn run(mut self) -> Result<(), PipelineError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop.run_app(&mut self)?;

        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<Running, PipelineError> {
        let window_attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let params = self
            .preset
            .clone()
            .unwrap_or_else(|| SimulationParameters::for_pixel_ratio(window.scale_factor()));

        let (context, surface) = pollster::block_on(GpuContext::for_window(window.clone()))?;
        let pipeline = GpuPipeline::new(context, &self.shaders, surface.format(), self.max_row_width)?;

        let size = window.inner_size();
        let viewport = Viewport::new(size.width, size.height, window.scale_factor());
        let (config, receiver) = events::channel(params.clone(), viewport);
        let driver = FrameDriver::new(pipeline, params, viewport, receiver, Instant::now())?;

        #[cfg(feature = "egui")]
        let egui = EguiIntegration::new(driver.pipeline().device(), surface.format(), &window);
        #[cfg(feature = "egui")]
        let panel = ParameterPanel::new(driver.params());

        window.request_redraw();

        Ok(Running {
            window,
            surface,
            driver,
            config,
            #[cfg(feature = "egui")]
            egui,
            #[cfg(feature = "egui")]
            panel,
            needs_redisplay: true,
            title: TITLE.to_string(),
            captures: 0,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: PipelineError) {
        error!("{}", e);
        self.error = Some(e);
        event_loop.exit();
    }
}

impl Running {
    fn on_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Space) => {
                self.config.edit(|p| p.anim_run = !p.anim_run);
                self.window.request_redraw();
            }
            PhysicalKey::Code(KeyCode::KeyP) => self.save_capture(),
            PhysicalKey::Code(KeyCode::Escape) => event_loop.exit(),
            _ => {}
        }
    }

    fn on_resize(&mut self, width: u32, height: u32, scale_factor: f64) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface
            .resize(self.driver.pipeline().device(), width, height);
        self.config
            .set_viewport(Viewport::new(width, height, scale_factor));
        self.needs_redisplay = true;
        self.window.request_redraw();
    }

    fn save_capture(&mut self) {
        let image = match self.driver.pipeline().capture(self.driver.params()) {
            Ok(image) => image,
            Err(e) => {
                warn!("capture failed: {}", e);
                return;
            }
        };
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = format!("flowtrail-{}-{}.png", stamp, self.captures);
        self.captures += 1;
        match image.save(&path) {
            Ok(()) => info!(path = %path, width = image.width(), height = image.height(), "frame captured"),
            Err(e) => warn!("failed to save {}: {}", path, e),
        }
    }

    fn update_title(&mut self) {
        let title = if self.driver.params().fps_display {
            format!("{} - {:.0} fps", TITLE, self.driver.clock().fps())
        } else {
            TITLE.to_string()
        };
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }

    /// Returns an error only when the pipeline can no longer continue.
    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<(), PipelineError> {
        let state = self.driver.tick(Instant::now())?;
        self.update_title();

        let overlay = cfg!(feature = "egui");
        if state == DriverState::Paused && !self.needs_redisplay && !overlay {
            return Ok(());
        }

        let frame = match self.surface.acquire() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost, reconfiguring");
                self.surface.reconfigure(self.driver.pipeline().device());
                self.window.request_redraw();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory");
                event_loop.exit();
                return Ok(());
            }
            Err(e) => {
                warn!("dropped frame: {:?}", e);
                self.window.request_redraw();
                return Ok(());
            }
        };

        let target = ScreenTarget {
            view: frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            width: self.surface.config.width,
            height: self.surface.config.height,
        };

        if !self.driver.render(&target) {
            self.driver.redisplay(&target);
        }

        #[cfg(feature = "egui")]
        let overlay_repaint = {
            let fps = self.driver.clock().fps();
            let panel = &mut self.panel;
            let config = &mut self.config;
            let output = self.egui.run(&self.window, |ctx| panel.show(ctx, config, fps));
            let pipeline = self.driver.pipeline();
            self.egui.paint(
                pipeline.device(),
                pipeline.queue(),
                &target.view,
                [target.width, target.height],
                &output,
            );
            self.egui.wants_repaint()
        };
        #[cfg(not(feature = "egui"))]
        let overlay_repaint = false;

        self.window.pre_present_notify();
        frame.present();
        self.needs_redisplay = false;

        if state == DriverState::Running || overlay_repaint {
            self.window.request_redraw();
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        #[cfg(feature = "egui")]
        {
            if running.egui.on_window_event(&running.window, &event) {
                running.window.request_redraw();
                return;
            }
            running.window.request_redraw();
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let scale_factor = running.window.scale_factor();
                running.on_resize(size.width, size.height, scale_factor);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let size = running.window.inner_size();
                running.on_resize(size.width, size.height, scale_factor);
            }
            WindowEvent::KeyboardInput { event, .. } => running.on_key(event_loop, &event),
            WindowEvent::Occluded(false) => {
                running.needs_redisplay = true;
                running.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = running.redraw(event_loop) {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }
}
