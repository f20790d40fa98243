//! Swarm builder and windowed runner.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{CursorGrabMode, Window, WindowId},
};

use crate::camera::ControlScheme;
use crate::config::SwarmConfig;
use crate::error::SwarmError;
use crate::gpu::{GpuState, RenderCamera};
use crate::input::InputEvent;
use crate::session::{FrameMode, Session};
use crate::time::FrameTimer;
use crate::Vec2;

const TITLE: &str = "Neon Swarm";

/// A swarm visualization builder.
///
/// Use method chaining to configure, then call `.run()` to open the window.
///
/// ```ignore
/// Swarm::new()
///     .with_node_count(500)
///     .with_seed(7)
///     .with_control_scheme(ControlScheme::PointerLockFreeFly)
///     .run()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Swarm {
    config: SwarmConfig,
}

impl Swarm {
    /// Create a swarm with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: SwarmConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of nodes.
    pub fn with_node_count(mut self, count: usize) -> Self {
        self.config.simulation.num_points = count;
        self
    }

    /// Set the boundary sphere radius.
    pub fn with_sphere_radius(mut self, radius: f32) -> Self {
        self.config.simulation.sphere_radius = radius;
        self
    }

    /// Fix the random seed for a reproducible session.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn with_control_scheme(mut self, scheme: ControlScheme) -> Self {
        self.config.camera.scheme = scheme;
        self
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Validate the configuration and build a headless session from it.
    pub fn build(self) -> Result<Session, SwarmError> {
        self.config.validate()?;
        Ok(Session::new(self.config))
    }

    /// Open a window and run until it is closed.
    pub fn run(self) -> Result<(), SwarmError> {
        let session = self.build()?;

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App::new(session);
        event_loop.run_app(&mut app)?;

        match app.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    session: Session,
    timer: FrameTimer,
    cursor_locked: bool,
    error: Option<SwarmError>,
}

impl App {
    fn new(session: Session) -> Self {
        Self {
            window: None,
            gpu_state: None,
            session,
            timer: FrameTimer::new(),
            cursor_locked: false,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SwarmError> {
        let window_attrs = Window::default_attributes()
            .with_title(window_title(FrameMode::FirstPerson))
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let size = window.inner_size();
        self.session.set_viewport(size.width as f32, size.height as f32);
        self.window = Some(window.clone());

        let camera = RenderCamera::from_config(&self.session.config().camera);
        let radius = self.session.nodes().sphere_radius();
        self.gpu_state = Some(pollster::block_on(GpuState::new(window, camera, radius))?);
        Ok(())
    }

    /// Match the cursor grab to what the controller wants.
    fn sync_cursor(&mut self) {
        let wants = self.session.controller().wants_pointer_lock();
        if wants == self.cursor_locked {
            return;
        }
        let Some(window) = &self.window else {
            return;
        };

        let result = if wants {
            window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
        } else {
            window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(e) = result {
            log::warn!("Cursor grab failed: {}", e);
        }
        window.set_cursor_visible(!wants);
        self.cursor_locked = wants;
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (_, dt) = self.timer.update();

        // A rejected tick has already been rolled back and logged
        if let Ok(report) = self.session.tick(dt) {
            if report.mode_changed {
                if let Some(window) = &self.window {
                    window.set_title(&window_title(report.mode));
                }
            }

            if let Some(gpu_state) = &mut self.gpu_state {
                match gpu_state.render(&self.session.view()) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        log::warn!("Surface lost, reconfiguring");
                        gpu_state.reconfigure();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory, exiting");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }

        self.sync_cursor();
    }
}

fn window_title(mode: FrameMode) -> String {
    format!("{} - {}", TITLE, mode.label())
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            log::error!("Startup failed: {}", err);
            self.error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                self.session
                    .set_viewport(physical_size.width as f32, physical_size.height as f32);
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            other => self.session.handle_window_event(&other),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        // Raw motion only matters while the pointer is captured
        if !self.cursor_locked {
            return;
        }
        if let DeviceEvent::MouseMotion { delta } = event {
            let delta = Vec2::new(delta.0 as f32, delta.1 as f32);
            self.session.push_input(InputEvent::PointerDelta { delta });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_config() {
        let swarm = Swarm::new()
            .with_node_count(42)
            .with_sphere_radius(800.0)
            .with_seed(9)
            .with_control_scheme(ControlScheme::PointerLockFreeFly);

        let config = swarm.config();
        assert_eq!(config.simulation.num_points, 42);
        assert_eq!(config.simulation.sphere_radius, 800.0);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.camera.scheme, ControlScheme::PointerLockFreeFly);
    }

    #[test]
    fn test_build_validates() {
        assert!(Swarm::new().with_node_count(0).build().is_err());

        let session = Swarm::new().with_node_count(12).with_seed(1).build().unwrap();
        assert_eq!(session.nodes().len(), 12);
    }

    #[test]
    fn test_window_title() {
        assert_eq!(window_title(FrameMode::Idle), "Neon Swarm - Idle Mode");
    }
}
