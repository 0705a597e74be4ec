//=========================================================================
// Map Engine Interface
//=========================================================================
//
// The native map engine as seen from the view shell.
//
// The engine renders and owns all map state; the shell only forwards
// lifecycle, draw and input calls to it and relays its redraw requests.
// Calls arrive from two threads:
//
// ```text
//   UI thread:      on_input_event, on_wheel_event, finish_rendering
//   render thread:  on_surface_created, on_surface_changed,
//                   on_draw_frame, on_surface_destroyed
// ```
//
// Every call goes through `guarded`, so a panicking engine is logged at
// the dispatch boundary instead of unwinding into platform code.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::error;

//=== Internal Dependencies ===============================================

use crate::core::input::{ActionEvent, WheelEvent};

//=== MapEngine ===========================================================

/// Callback the engine invokes, from any thread, when it wants a new frame.
pub type RedrawListener = Arc<dyn Fn() + Send + Sync + 'static>;

/// Lifecycle, draw and input entry points of the map engine.
///
/// Surface callbacks are always invoked with the GPU context current on
/// the calling thread.
pub trait MapEngine: Send + Sync + 'static {
    /// A fresh surface exists; (re)create GPU resources.
    fn on_surface_created(&self);

    /// The drawable size changed. Only called on actual changes.
    fn on_surface_changed(&self, width: u32, height: u32);

    /// Render one frame into the current surface.
    fn on_draw_frame(&self);

    /// The surface is about to be destroyed.
    fn on_surface_destroyed(&self);

    /// A normalized pointer action; see [`ActionKind`](crate::core::input::ActionKind)
    /// for codes. Unused coordinates are `-1`.
    fn on_input_event(&self, action: i32, x1: f32, y1: f32, x2: f32, y2: f32);

    /// A discrete zoom step at `(x, y)`.
    fn on_wheel_event(&self, delta: i32, x: f32, y: f32);

    /// Installs or clears the redraw callback.
    fn set_redraw_request_listener(&self, listener: Option<RedrawListener>);

    /// Flushes pending GPU work before the application is backgrounded.
    fn finish_rendering(&self) {}
}

//=== Dispatch ============================================================

/// Runs an engine callback, catching and logging any panic.
///
/// Returns `None` when the callback panicked.
pub(crate) fn guarded<R>(call: &str, f: impl FnOnce() -> R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            error!(
                target: "mapview::engine",
                "MapEngine::{} panicked: {}",
                call,
                panic_message(payload.as_ref())
            );
            None
        }
    }
}

/// Forwards a normalized action to the engine.
pub(crate) fn forward_action(engine: &dyn MapEngine, action: &ActionEvent) {
    let (code, x1, y1, x2, y2) = action.to_wire();
    guarded("on_input_event", || engine.on_input_event(code, x1, y1, x2, y2));
}

/// Forwards a wheel step to the engine.
pub(crate) fn forward_wheel(engine: &dyn MapEngine, wheel: &WheelEvent) {
    guarded("on_wheel_event", || {
        engine.on_wheel_event(wheel.delta, wheel.pos.x, wheel.pos.y)
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

//=== Tests ===============================================================
