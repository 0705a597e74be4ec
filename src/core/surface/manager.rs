//=========================================================================
// Surface Lifecycle Manager
//=========================================================================
//
// Owns a view's GPU context and presentable surface and drives the
// engine's surface callbacks.
//
// Lifecycle:
// ```text
//   create_surface ──> notify_surface_created ──> resize / present ...
//                                                      │ present fails
//                                                      v
//                           recover: destroy → reset context → create
//                                    → notify created → forced resize
// ```
//
// Every method expects the caller to hold the view lock; the manager
// itself is not synchronized. Making the context current is explicit and
// tracked per thread, so repeated calls on the same thread are free.
//
// Creation failures are fatal for the view: later presents are skipped
// and later creates report `SurfaceError::Unavailable`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;
use std::thread::{self, ThreadId};

use log::{debug, error, info, trace, warn};

//=== Internal Dependencies ===============================================

use super::shared_context::SharedContext;
use super::state::SurfaceState;
use crate::core::engine::{guarded, MapEngine};
use crate::core::errors::SurfaceError;
use crate::core::platform_bridge::{DrawableSize, SurfaceBackend};

//=== FrameOutcome ========================================================

/// Result of a render attempt that did not lose the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The engine drew and the frame was presented.
    Presented,
    /// Nothing to draw into (no active surface, or the view failed fatally).
    Skipped,
}

//=== ContextSlot =========================================================

enum ContextSlot<C> {
    Empty,
    Owned(C),
    Shared(SharedContext<C>),
}

/// Runs `f` with the view's context, locking it first when shared.
fn with_context<B, R>(
    backend: &mut B,
    slot: &ContextSlot<B::Context>,
    f: impl FnOnce(&mut B, &B::Context) -> Result<R, SurfaceError>,
) -> Result<R, SurfaceError>
where
    B: SurfaceBackend,
{
    match slot {
        ContextSlot::Owned(context) => f(backend, context),
        ContextSlot::Shared(shared) => match shared.lock().as_ref() {
            Some(context) => f(backend, context),
            None => Err(SurfaceError::NoContext),
        },
        ContextSlot::Empty => Err(SurfaceError::NoContext),
    }
}

//=== SurfaceLifecycleManager =============================================

pub struct SurfaceLifecycleManager<B: SurfaceBackend> {
    backend: B,
    engine: Arc<dyn MapEngine>,
    context: ContextSlot<B::Context>,
    surface: Option<B::Surface>,
    state: SurfaceState,
    /// Last size forwarded to the engine.
    cached_size: Option<DrawableSize>,
    /// Last size the surface was created or resized at.
    latest_size: DrawableSize,
    /// Thread the context was last made current on.
    current_on: Option<ThreadId>,
    fatal: bool,
}

impl<B: SurfaceBackend> SurfaceLifecycleManager<B> {
    //--- Construction -----------------------------------------------------

    /// A manager that creates and owns its own context.
    pub fn new(backend: B, engine: Arc<dyn MapEngine>) -> Self {
        Self::with_slot(backend, engine, ContextSlot::Empty)
    }

    /// A manager that uses (and lazily initializes) a shared context.
    pub fn with_shared_context(
        backend: B,
        engine: Arc<dyn MapEngine>,
        shared: SharedContext<B::Context>,
    ) -> Self {
        Self::with_slot(backend, engine, ContextSlot::Shared(shared))
    }

    fn with_slot(backend: B, engine: Arc<dyn MapEngine>, context: ContextSlot<B::Context>) -> Self {
        Self {
            backend,
            engine,
            context,
            surface: None,
            state: SurfaceState::NoSurface,
            cached_size: None,
            latest_size: DrawableSize::ZERO,
            current_on: None,
            fatal: false,
        }
    }

    //--- Queries ----------------------------------------------------------

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Whether context or surface creation failed for this view.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn cached_size(&self) -> Option<DrawableSize> {
        self.cached_size
    }

    pub fn latest_size(&self) -> DrawableSize {
        self.latest_size
    }

    /// Current drawable size as reported by the platform.
    pub fn drawable_size(&self) -> DrawableSize {
        self.backend.drawable_size()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    //--- Lifecycle --------------------------------------------------------

    /// Allocates the context (if needed) and a surface of `size`.
    ///
    /// Returns `Ok(false)` without doing anything when `size` has zero area
    /// or a surface already exists.
    pub fn create_surface(&mut self, size: DrawableSize) -> Result<bool, SurfaceError> {
        if self.fatal {
            return Err(SurfaceError::Unavailable);
        }
        if size.is_empty() {
            debug!(target: "mapview::surface", "Not creating surface with zero area {:?}", size);
            return Ok(false);
        }
        if self.surface.is_some() {
            trace!(target: "mapview::surface", "Surface already exists");
            return Ok(false);
        }

        if let Err(err) = self.ensure_context() {
            return Err(self.mark_fatal(err));
        }

        let created = with_context(&mut self.backend, &self.context, |backend, context| {
            backend.create_surface(context, size)
        });
        match created {
            Ok(surface) => self.surface = Some(surface),
            Err(err) => return Err(self.mark_fatal(err)),
        }

        self.latest_size = size;
        self.cached_size = None;
        self.current_on = None;
        self.transition(SurfaceState::Created);
        info!(target: "mapview::surface", "Surface created at {}x{}", size.width, size.height);
        Ok(true)
    }

    /// Binds the context and surface to the calling thread.
    pub fn make_current(&mut self) -> Result<(), SurfaceError> {
        let this_thread = thread::current().id();
        if self.current_on == Some(this_thread) {
            return Ok(());
        }

        let surface = self.surface.as_ref().ok_or(SurfaceError::NoSurface)?;
        with_context(&mut self.backend, &self.context, |backend, context| {
            backend.make_current(context, surface)
        })?;

        self.current_on = Some(this_thread);
        Ok(())
    }

    /// Tells the engine about the new surface. Only valid once per create.
    pub fn notify_surface_created(&mut self) -> bool {
        if self.state != SurfaceState::Created {
            warn!(
                target: "mapview::surface",
                "Surface-created notification ignored in state {:?}",
                self.state
            );
            return false;
        }
        if let Err(err) = self.make_current() {
            error!(target: "mapview::surface", "Cannot notify surface creation: {}", err);
            return false;
        }

        guarded("on_surface_created", || self.engine.on_surface_created());
        self.cached_size = None;
        self.transition(SurfaceState::Active);
        true
    }

    /// Forwards `size` to the engine if it differs from the last forwarded
    /// size. Returns whether the engine was notified.
    pub fn resize(&mut self, size: DrawableSize) -> bool {
        if self.state != SurfaceState::Active || size.is_empty() {
            return false;
        }
        if self.cached_size == Some(size) {
            return false;
        }
        if let Err(err) = self.make_current() {
            warn!(target: "mapview::surface", "Skipping resize: {}", err);
            return false;
        }

        debug!(target: "mapview::surface", "Surface changed to {}x{}", size.width, size.height);
        guarded("on_surface_changed", || {
            self.engine.on_surface_changed(size.width, size.height)
        });
        self.cached_size = Some(size);
        self.latest_size = size;
        true
    }

    /// Like [`resize`](Self::resize), but always forwards.
    pub fn force_resize(&mut self, size: DrawableSize) -> bool {
        self.cached_size = None;
        self.resize(size)
    }

    /// Draws one frame and presents it.
    ///
    /// An error means the surface was lost; the state is then `Lost` and
    /// [`recover`](Self::recover) must run before anything is drawn again.
    pub fn present(&mut self) -> Result<FrameOutcome, SurfaceError> {
        if self.fatal || self.state != SurfaceState::Active {
            return Ok(FrameOutcome::Skipped);
        }
        if let Err(err) = self.make_current() {
            return Err(self.mark_lost(err));
        }

        guarded("on_draw_frame", || self.engine.on_draw_frame());

        let Some(surface) = self.surface.as_ref() else {
            return Ok(FrameOutcome::Skipped);
        };
        let presented = with_context(&mut self.backend, &self.context, |backend, context| {
            backend.present(context, surface)
        });

        match presented {
            Ok(()) => Ok(FrameOutcome::Presented),
            Err(err) => Err(self.mark_lost(err)),
        }
    }

    /// Rebuilds the surface after a loss.
    ///
    /// Destroys the old surface, resets the context, recreates the surface
    /// at the platform's current size and replays the created and resize
    /// callbacks. Returns `Ok(false)` if the view currently has zero area;
    /// the surface is then recreated by the next non-empty size change.
    pub fn recover(&mut self) -> Result<bool, SurfaceError> {
        if self.fatal {
            return Err(SurfaceError::Unavailable);
        }
        info!(target: "mapview::surface", "Recovering surface from state {:?}", self.state);

        self.release_surface();
        if let Err(err) = self.reset_context() {
            return Err(self.mark_fatal(err));
        }

        let size = self.backend.drawable_size();
        if !self.create_surface(size)? {
            info!(target: "mapview::surface", "Recovery deferred until the view has a size");
            return Ok(false);
        }
        self.notify_surface_created();
        self.force_resize(size);
        Ok(true)
    }

    /// Releases the surface and, if no other view shares it, the context.
    /// Safe to call any number of times.
    pub fn destroy_surface(&mut self) {
        if self.state == SurfaceState::Active {
            if let Err(err) = self.make_current() {
                warn!(target: "mapview::surface", "Destroying surface without current context: {}", err);
            }
            guarded("on_surface_destroyed", || self.engine.on_surface_destroyed());
        }

        let had_surface = self.surface.is_some();
        self.release_surface();
        self.release_context();

        if had_surface {
            info!(target: "mapview::surface", "Surface destroyed");
        }
    }

    /// Lets the engine flush GPU work before the app is backgrounded.
    pub fn finish_rendering(&mut self) {
        if self.state != SurfaceState::Active {
            return;
        }
        if let Err(err) = self.make_current() {
            warn!(target: "mapview::surface", "Cannot finish rendering: {}", err);
            return;
        }
        guarded("finish_rendering", || self.engine.finish_rendering());
    }

    //--- Internal ---------------------------------------------------------

    fn ensure_context(&mut self) -> Result<(), SurfaceError> {
        if let ContextSlot::Empty = self.context {
            let context = self.backend.create_context()?;
            self.context = ContextSlot::Owned(context);
            debug!(target: "mapview::surface", "Created owned GPU context");
            return Ok(());
        }

        if let ContextSlot::Shared(shared) = &self.context {
            let mut guard = shared.lock();
            if guard.is_none() {
                *guard = Some(self.backend.create_context()?);
                debug!(target: "mapview::surface", "Created shared GPU context");
            }
        }
        Ok(())
    }

    fn reset_context(&mut self) -> Result<(), SurfaceError> {
        match &mut self.context {
            ContextSlot::Owned(context) => self.backend.reset_context(context),
            ContextSlot::Shared(shared) if shared.users() == 1 => {
                match shared.lock().as_mut() {
                    Some(context) => self.backend.reset_context(context),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    /// Destroys the surface handle without involving the engine.
    fn release_surface(&mut self) {
        if let Some(surface) = self.surface.take() {
            let released = with_context(&mut self.backend, &self.context, |backend, context| {
                backend.destroy_surface(context, surface);
                Ok(())
            });
            if let Err(err) = released {
                warn!(target: "mapview::surface", "Surface dropped without a context: {}", err);
            }
        }

        self.cached_size = None;
        self.current_on = None;
        if self.state != SurfaceState::NoSurface {
            self.transition(SurfaceState::NoSurface);
        }
    }

    fn release_context(&mut self) {
        match std::mem::replace(&mut self.context, ContextSlot::Empty) {
            ContextSlot::Owned(context) => {
                self.backend.destroy_context(context);
                debug!(target: "mapview::surface", "Destroyed owned GPU context");
            }
            ContextSlot::Shared(shared) => {
                if shared.users() == 1 {
                    if let Some(context) = shared.lock().take() {
                        self.backend.destroy_context(context);
                        debug!(target: "mapview::surface", "Destroyed shared GPU context");
                    }
                }
                // Keep the handle so a recreated surface joins the same context.
                self.context = ContextSlot::Shared(shared);
            }
            ContextSlot::Empty => {}
        }
    }

    fn mark_fatal(&mut self, err: SurfaceError) -> SurfaceError {
        error!(target: "mapview::surface", "Surface setup failed, view disabled: {}", err);
        self.fatal = true;
        err
    }

    fn mark_lost(&mut self, err: SurfaceError) -> SurfaceError {
        error!(target: "mapview::surface", "Surface lost: {}", err);
        self.current_on = None;
        self.transition(SurfaceState::Lost);
        if err.is_surface_loss() {
            err
        } else {
            SurfaceError::PresentFailed(err.to_string())
        }
    }

    fn transition(&mut self, next: SurfaceState) {
        if !self.state.can_transition_to(next) {
            warn!(
                target: "mapview::surface",
                "Ignoring invalid surface transition {:?} -> {:?}",
                self.state,
                next
            );
            return;
        }
        trace!(target: "mapview::surface", "{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

impl<B: SurfaceBackend> std::fmt::Debug for SurfaceLifecycleManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceLifecycleManager")
            .field("state", &self.state)
            .field("cached_size", &self.cached_size)
            .field("latest_size", &self.latest_size)
            .field("fatal", &self.fatal)
            .finish_non_exhaustive()
    }
}

//=== Tests ===============================================================
