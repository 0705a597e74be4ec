//=========================================================================
// Platform Subsystem
//
// Reference platform adapter: hosts one map view in a Winit window.
//
// Architecture:
// ```text
//  Main Thread (Winit event loop):        Render Thread:
//  ┌───────────────────────────────┐     ┌──────────────────────┐
//  │  MapShell                     │     │  RenderLoop          │
//  │   ├─ Resized / Occluded ──────┼──┐  │   ├─ create surface  │
//  │   ├─ Touch / Mouse / Wheel    │  │  │   ├─ on_draw_frame   │
//  │   │    ↓                      │  │  │   └─ present         │
//  │   │  InputProcessor           │  │  └──────────────────────┘
//  │   │    ↓                      │  │             ↑
//  │   └─ MapView ◄────────────────┼──┘   start / stop / redraw
//  │                               │
//  │  user_event(ShellEvent) ◄─────┼──── WinitHost (EventLoopProxy)
//  │   ├─ RunTask → run            │       ├─ run_on_ui_thread
//  │   └─ FrameRequested → redraw  │       └─ schedule_frame
//  └───────────────────────────────┘
// ```
//
// Responsibilities:
// - Create the window and the surface backend bound to it
// - Build the view at the window's scale factor
// - Map window lifecycle events onto view lifecycle calls
// - Convert Winit input into view pointer input (logical units)
// - Run UI tasks posted by the view on the main thread
//
// Notes:
// Winit mandates the main thread on macOS/iOS, so `MapShell::run` must be
// called from it.
//
//=========================================================================

//=== Submodules ==========================================================

mod host;
mod input_processor;

pub use host::{ShellEvent, WinitHost};
pub use input_processor::{PointerInput, MOUSE_POINTER_ID};

//=== External Crates =====================================================

use std::sync::Arc;

use log::*;
use thiserror::Error;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition},
    error::EventLoopError,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

//=== Internal Imports ====================================================

use crate::core::engine::MapEngine;
use crate::core::errors::{SurfaceError, ViewError};
use crate::core::platform_bridge::SurfaceBackend;
use crate::{MapView, MapViewBuilder};
use input_processor::InputProcessor;

//=== ShellError ==========================================================

/// Event loop errors. Fatal: without an event loop there is no window.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Event loop creation failed: {0}")]
    EventLoopCreation(#[source] EventLoopError),

    #[error("Event loop error: {0}")]
    EventLoopExecution(#[source] EventLoopError),
}

//=== BackendFactory ======================================================

/// Builds the surface backend for a freshly created window.
pub type BackendFactory<B> = Box<dyn FnMut(Arc<Window>) -> Result<B, SurfaceError>>;

//=== MapShell ============================================================

/// Window host for a single map view.
///
/// # Lifecycle
///
/// 1. **Construction**: `MapShell::run(builder, engine, factory)`
/// 2. **First resume**: window, backend and view are created; the view is
///    made visible
/// 3. **Event processing**: Winit calls `ApplicationHandler` methods
/// 4. **Shutdown**: close request tears the view down and exits the loop
pub struct MapShell<B: SurfaceBackend> {
    builder: Option<MapViewBuilder<B>>,
    engine: Arc<dyn MapEngine>,
    factory: BackendFactory<B>,
    host: Arc<WinitHost>,

    /// Created lazily in `resumed()` (mobile compatibility).
    window: Option<Arc<Window>>,
    view: Option<MapView<B>>,
    input: InputProcessor,
}

impl<B: SurfaceBackend> MapShell<B> {
    //--- Execution --------------------------------------------------------

    /// Runs the event loop until the window is closed.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError`] if the event loop cannot be created or fails
    /// while running.
    ///
    /// # Panics
    ///
    /// Panics if called off the main thread (macOS/iOS Winit requirement).
    pub fn run(
        builder: MapViewBuilder<B>,
        engine: Arc<dyn MapEngine>,
        factory: BackendFactory<B>,
    ) -> Result<(), ShellError> {
        debug!(target: "platform", "Starting Winit event loop");

        let event_loop = EventLoop::<ShellEvent>::with_user_event()
            .build()
            .map_err(ShellError::EventLoopCreation)?;
        let host = Arc::new(WinitHost::new(event_loop.create_proxy()));

        let mut shell = Self {
            builder: Some(builder),
            engine,
            factory,
            host,
            window: None,
            view: None,
            input: InputProcessor::new(),
        };

        event_loop
            .run_app(&mut shell)
            .map_err(ShellError::EventLoopExecution)
    }

    //--- Internal Helpers -------------------------------------------------

    fn create_view(&mut self, event_loop: &ActiveEventLoop) {
        let Some(builder) = self.builder.take() else {
            return;
        };

        let attrs = WindowAttributes::default()
            .with_title("Map View")
            .with_inner_size(LogicalSize::new(800, 600));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!(target: "platform", "Window creation failed: {}", e);
                event_loop.exit();
                return;
            }
        };
        info!(
            target: "platform",
            "Window created: {}x{} @ {}x DPI",
            window.inner_size().width,
            window.inner_size().height,
            window.scale_factor()
        );

        let backend = match (self.factory)(window.clone()) {
            Ok(backend) => backend,
            Err(e) => {
                error!(target: "platform", "Surface backend creation failed: {}", e);
                event_loop.exit();
                return;
            }
        };

        let view = builder
            .with_scale(window.scale_factor() as f32)
            .build(backend, self.engine.clone(), self.host.clone());
        report("show view", view.on_visibility_changed(true));

        self.window = Some(window);
        self.view = Some(view);
    }

    /// Converts a physical window position to view units.
    fn to_logical(&self, position: PhysicalPosition<f64>) -> (f32, f32) {
        let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
        let logical = position.to_logical::<f32>(scale);
        (logical.x, logical.y)
    }

    fn apply(&self, input: Option<PointerInput>) {
        if let (Some(input), Some(view)) = (input, &self.view) {
            trace!(target: "platform::input", "{:?}", input);
            input.apply(view);
        }
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(view) = self.view.take() {
            view.teardown();
        }
        event_loop.exit();
    }
}

fn report(what: &str, result: Result<(), ViewError>) {
    if let Err(e) = result {
        error!(target: "platform", "Failed to {}: {}", what, e);
    }
}

//=== Winit Integration ===================================================

impl<B: SurfaceBackend> ApplicationHandler<ShellEvent> for MapShell<B> {
    /// Called on startup and when a mobile app returns to the foreground.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        match &self.view {
            Some(view) => {
                debug!(target: "platform", "Resuming existing view");
                report("resume view", view.on_resume());
            }
            None => self.create_view(event_loop),
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(view) = &self.view {
            view.on_suspend();
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ShellEvent) {
        match event {
            ShellEvent::RunTask(task) => task(),
            ShellEvent::FrameRequested => {
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!(target: "platform", "Window close requested");
                self.close(event_loop);
            }

            WindowEvent::Resized(size) => {
                debug!(target: "platform", "Window resized to {}x{}", size.width, size.height);
                if let Some(view) = &self.view {
                    report("resize view", view.on_size_changed());
                }
            }

            WindowEvent::Occluded(occluded) => {
                if let Some(view) = &self.view {
                    report("change visibility", view.on_visibility_changed(!occluded));
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(view) = &self.view {
                    view.render_pending_frame();
                }
            }

            WindowEvent::Touch(touch) => {
                let (x, y) = self.to_logical(touch.location);
                let input = self.input.process_touch(touch.phase, touch.id, x, y);
                self.apply(Some(input));
            }

            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = self.to_logical(position);
                let input = self.input.process_cursor_moved(x, y);
                self.apply(input);
            }

            WindowEvent::CursorLeft { .. } | WindowEvent::Focused(false) => {
                let input = self.input.release_mouse();
                self.apply(input);
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let input = self.input.process_mouse_button(button, state);
                self.apply(input);
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let input = self.input.process_wheel(delta);
                self.apply(input);
            }

            _ => {
                // Ignore: keyboard, focus gain, scale changes, etc.
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(view) = self.view.take() {
            view.teardown();
        }
        info!(target: "platform", "Event loop exiting");
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
