//=========================================================================
// Platform Bridge Interface
//=========================================================================
//
// The capability set a platform provides to host a map view.
//
// Split along the thread boundary:
// ```text
//   SurfaceBackend  (owned by the view, used under the view lock)
//     create_context, make_current, create_surface, present,
//     destroy_surface, drawable_size
//
//   ViewHost        (shared, callable from any thread)
//     run_on_ui_thread, spawn_render_thread, schedule_frame
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::io;
use std::thread::{self, JoinHandle};

//=== Internal Dependencies ===============================================

use crate::core::errors::SurfaceError;

//=== DrawableSize ========================================================

/// Size of the presentable area in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DrawableSize {
    pub width: u32,
    pub height: u32,
}

impl DrawableSize {
    pub const ZERO: Self = Self { width: 0, height: 0 };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Converts a size in device-independent units to pixels, rounding to
    /// the nearest pixel.
    pub fn from_dips(width: f64, height: f64, scale: f64) -> Self {
        Self {
            width: to_pixels(width, scale),
            height: to_pixels(height, scale),
        }
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

fn to_pixels(dips: f64, scale: f64) -> u32 {
    // Negative and NaN inputs saturate to zero.
    (dips * scale + 0.5) as u32
}

//=== SurfaceBackend ======================================================

/// GPU half of the platform adapter.
///
/// Owned by a single view and only ever called with that view's lock
/// held, so implementations need no internal synchronization. The
/// `Surface` handle is moved into the view on creation and handed back
/// only to be destroyed.
pub trait SurfaceBackend: Send + 'static {
    /// GPU context (EGL context, GL context, wgpu device, ...).
    type Context: Send + 'static;

    /// Presentable surface bound to the platform view.
    type Surface: Send + 'static;

    fn create_context(&mut self) -> Result<Self::Context, SurfaceError>;

    /// Re-initializes a context after device loss. Backends whose contexts
    /// survive surface loss can keep the default.
    fn reset_context(&mut self, context: &mut Self::Context) -> Result<(), SurfaceError> {
        let _ = context;
        Ok(())
    }

    fn destroy_context(&mut self, context: Self::Context) {
        drop(context);
    }

    fn create_surface(
        &mut self,
        context: &Self::Context,
        size: DrawableSize,
    ) -> Result<Self::Surface, SurfaceError>;

    /// Binds `context` and `surface` to the calling thread.
    fn make_current(
        &mut self,
        context: &Self::Context,
        surface: &Self::Surface,
    ) -> Result<(), SurfaceError>;

    /// Swaps or presents the frame just drawn. An error means the surface
    /// or context was lost.
    fn present(&mut self, context: &Self::Context, surface: &Self::Surface) -> Result<(), SurfaceError>;

    fn destroy_surface(&mut self, context: &Self::Context, surface: Self::Surface);

    /// Current drawable size of the platform view.
    fn drawable_size(&self) -> DrawableSize;
}

//=== ViewHost ============================================================

/// Work item executed on the platform's UI thread.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Threading half of the platform adapter.
pub trait ViewHost: Send + Sync + 'static {
    /// Queues `task` for execution on the UI thread.
    fn run_on_ui_thread(&self, task: UiTask);

    /// Asks the platform for a frame callback. Used by on-demand views,
    /// whose frames are driven by the platform.
    fn schedule_frame(&self);

    /// Starts the dedicated render thread.
    fn spawn_render_thread(
        &self,
        name: &str,
        body: Box<dyn FnOnce() + Send + 'static>,
    ) -> io::Result<JoinHandle<()>> {
        thread::Builder::new().name(name.to_owned()).spawn(body)
    }
}

//=== Tests ===============================================================
