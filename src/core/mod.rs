//=========================================================================
// View Core
//
// Platform-neutral state and machinery behind a single map view.
//
// Responsibilities:
// - Normalize pointer input into the engine's action protocol (`input`)
// - Own the GPU context and render surface lifecycle (`surface`)
// - Produce frames on demand, independently of the UI thread (`render`)
// - Relay engine redraw requests back to the view (`redraw_bridge`)
//
// Notes:
// Everything the UI thread and the render thread both touch (surface
// state, surface handle, cached size, pointer slots) lives in one
// `ViewCore` behind one mutex. The redraw flag is the exception: it has
// its own lock inside `RedrawSignal`, because the engine requests redraws
// from callbacks that already run under the view lock.
//
//=========================================================================

//=== Standard Library Imports ============================================
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

//=== Internal Modules ====================================================
pub mod engine;
pub mod errors;
pub mod input;
pub mod platform_bridge;
pub mod redraw_bridge;
pub mod render;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

use input::InputDispatcher;
use platform_bridge::SurfaceBackend;
use surface::SurfaceLifecycleManager;

//=== ViewCore ============================================================
//
// The single consistency domain of a view, shared between the UI thread
// and the render thread.
//
pub struct ViewCore<B: SurfaceBackend> {
    pub surface: SurfaceLifecycleManager<B>,
    pub input: InputDispatcher,
}

impl<B: SurfaceBackend> ViewCore<B> {
    pub fn new(surface: SurfaceLifecycleManager<B>) -> Self {
        Self {
            surface,
            input: InputDispatcher::new(),
        }
    }
}

/// A `ViewCore` behind the view lock.
pub type SharedCore<B> = Arc<Mutex<ViewCore<B>>>;

//--- lock() --------------------------------------------------------------
//
// Engine callbacks are panic-guarded, so a poisoned lock can only follow a
// bug in this crate. The data stays consistent between statements, so
// keep going with it.
//
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
