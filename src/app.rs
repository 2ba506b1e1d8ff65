//! Windowed host
//!
//! Drives a [`Viewport`] from winit: the window is the host container, redraw
//! requests are the frame clock, and mouse input feeds the orbit controls.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::camera::{PointerButton, PointerEvent};
use crate::capture::{LogReporter, MediaDevices, NokhwaDevices};
use crate::config::ViewportConfig;
use crate::error::RenderError;
use crate::render::GpuRenderer;
use crate::surface::Host;
use crate::viewport::Viewport;

/// Pixels treated as one wheel line for touchpad scrolling
const PIXELS_PER_LINE: f64 = 40.0;

/// [`Host`] over a winit window
pub struct WindowHost {
    window: Arc<Window>,
}

impl WindowHost {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl Host for WindowHost {
    fn client_size(&self) -> (u32, u32) {
        let logical: LogicalSize<u32> = self.window.inner_size().to_logical(self.window.scale_factor());
        (logical.width, logical.height)
    }

    fn pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }

    fn request_frame(&self) {
        self.window.request_redraw();
    }
}

/// Application state machine
enum AppState {
    /// Before the window exists
    Uninitialized,
    /// Window, GPU context and viewport are live
    Running {
        host: WindowHost,
        renderer: GpuRenderer,
        viewport: Viewport,
    },
}

/// winit application handler owning one viewport
pub struct ViewportApp {
    config: ViewportConfig,
    state: AppState,
    started_at: Instant,
    /// Last cursor position in logical pixels
    cursor: (f32, f32),
}

impl ViewportApp {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            state: AppState::Uninitialized,
            started_at: Instant::now(),
            cursor: (0.0, 0.0),
        }
    }

    fn init(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window_attributes = WindowAttributes::default()
            .with_title(self.config.window_title.clone())
            .with_inner_size(LogicalSize::new(self.config.window_width, self.config.window_height));
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let mut renderer = pollster::block_on(GpuRenderer::new(window.clone(), &self.config))?;
        let host = WindowHost::new(window);

        let nokhwa = NokhwaDevices::new();
        let devices: Option<&dyn MediaDevices> = if self.config.capture.enabled {
            Some(&nokhwa)
        } else {
            None
        };

        let viewport = Viewport::new(
            self.config.clone(),
            &host,
            &mut renderer,
            devices,
            Box::new(LogReporter),
        );

        Ok(AppState::Running {
            host,
            renderer,
            viewport,
        })
    }
}

impl ApplicationHandler for ViewportApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let AppState::Uninitialized = &self.state {
            match self.init(event_loop) {
                Ok(state) => {
                    log::info!("Press ESC to exit, F11 for fullscreen");
                    self.started_at = Instant::now();
                    self.state = state;
                }
                Err(e) => {
                    log::error!("Failed to start viewport: {:#}", e);
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let AppState::Running {
            host,
            renderer,
            viewport,
        } = &mut self.state
        else {
            return;
        };
        let host: &WindowHost = host;

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting...");
                viewport.stop();
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match key_code {
                KeyCode::Escape => {
                    log::info!("Escape pressed, exiting...");
                    viewport.stop();
                    event_loop.exit();
                }
                KeyCode::F11 => {
                    if host.window.fullscreen().is_some() {
                        host.window.set_fullscreen(None);
                        log::info!("Exiting fullscreen");
                    } else {
                        host.window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                        log::info!("Entering fullscreen");
                    }
                }
                _ => {}
            },

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                viewport.handle_resize(host, renderer);
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = pointer_button(button) else { return };
                let event = match state {
                    ElementState::Pressed => {
                        let (x, y) = self.cursor;
                        PointerEvent::Down { button, x, y }
                    }
                    ElementState::Released => PointerEvent::Up { button },
                };
                viewport.handle_pointer(event, host);
            }

            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(host.window.scale_factor());
                self.cursor = (logical.x, logical.y);
                viewport.handle_pointer(
                    PointerEvent::Move {
                        x: logical.x,
                        y: logical.y,
                    },
                    host,
                );
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
                };
                viewport.handle_pointer(PointerEvent::Wheel { delta: lines }, host);
            }

            WindowEvent::RedrawRequested => {
                let time = self.started_at.elapsed().as_secs_f64() * 1000.0;
                match viewport.frame(time, host, renderer) {
                    Ok(()) => {}
                    Err(RenderError::SurfaceLost) => {
                        log::warn!("Surface lost, reconfiguring...");
                        renderer.recover_surface();
                        viewport.handle_resize(host, renderer);
                    }
                    Err(RenderError::OutOfMemory) => {
                        log::error!("Out of GPU memory!");
                        viewport.stop();
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::warn!("Surface error: {}", e);
                    }
                }
            }

            _ => {}
        }
    }
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}
