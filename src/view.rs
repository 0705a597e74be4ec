//=========================================================================
// Map View
//
// Per-view facade that ties the engine, the platform adapter and the view
// core together.
//
// Architecture:
// ```text
//     MapViewBuilder  ──build()──>  MapView
//         │                           │
//         ├─ with_render_mode()       ├─ UI thread:  visibility, size, suspend/resume,
//         ├─ with_recovery_mode()     │              pointer + wheel input, teardown
//         ├─ with_scale()             │
//         ├─ with_thread_name()       ├─ render thread (Threaded) or platform frame
//         ├─ with_shared_context()    │  callback (OnDemand): RenderLoop
//         └─ with_interactive()       │
//                                     └─ engine redraw listener ─> RedrawRequestBridge
// ```
//
// Thread model:
// - Lifecycle and input entry points are called from the platform's UI
//   thread.
// - In `Threaded` mode frames are produced on a dedicated render thread
//   spawned through `ViewHost::spawn_render_thread`; the thread creates
//   the surface on its first frame.
// - In `OnDemand` mode redraw requests ask the host for a frame callback
//   and the platform calls `render_pending_frame` from it.
//
// Surface loss:
// - `RecoveryMode::Synchronous` recovers on the render thread itself.
// - `RecoveryMode::UiDispatched` ends the render thread and posts the
//   recovery to the UI thread, which stops, recovers and restarts.
// - A loss on the first frame after a recovery halts rendering until the
//   view is re-triggered (visibility, size, resume or `recover`).
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, trace, warn};

//=== Internal Dependencies ===============================================

use crate::core::engine::{forward_action, forward_wheel, guarded, MapEngine};
use crate::core::errors::ViewError;
use crate::core::input::{ActionEvent, InputDispatcher, PointerId, ScreenPos, WheelEvent};
use crate::core::platform_bridge::{SurfaceBackend, ViewHost};
use crate::core::redraw_bridge::{FrameScheduler, RedrawRequestBridge, RedrawTarget};
use crate::core::render::{LoopExit, RedrawSignal, RenderLoop};
use crate::core::surface::{FrameOutcome, SharedContext, SurfaceLifecycleManager, SurfaceState};
use crate::core::{lock, SharedCore, ViewCore};

//=== Configuration =======================================================

/// Where frames are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// A dedicated render thread waits for redraw requests.
    #[default]
    Threaded,
    /// The platform drives frames through `MapView::render_pending_frame`.
    OnDemand,
}

/// Where surface recovery runs after a presentation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryMode {
    /// The render thread recovers in place and keeps going.
    #[default]
    Synchronous,
    /// The render thread exits; the UI thread recovers and restarts it.
    UiDispatched,
}

/// Resolved view configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    pub render_mode: RenderMode,
    pub recovery_mode: RecoveryMode,
    /// View units to drawable pixels.
    pub scale: f32,
    pub thread_name: String,
    pub interactive: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Threaded,
            recovery_mode: RecoveryMode::Synchronous,
            scale: 1.0,
            thread_name: "mapview-render".to_owned(),
            interactive: true,
        }
    }
}

//=== MapViewBuilder ======================================================

/// Builder for configuring and constructing a [`MapView`].
///
/// # Default Values
///
/// - **Render mode**: `Threaded`
/// - **Recovery mode**: `Synchronous`
/// - **Scale**: 1.0
/// - **Render thread name**: `"mapview-render"`
/// - **Interactive**: true
/// - **Context**: owned by the view
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use mapview_shell::prelude::*;
/// # fn demo<B: SurfaceBackend>(backend: B, engine: Arc<dyn MapEngine>) {
/// let (host, pump) = ChannelHost::channel();
/// let view = MapViewBuilder::new()
///     .with_scale(2.0)
///     .with_thread_name("map-render")
///     .build(backend, engine, Arc::new(host));
///
/// view.on_visibility_changed(true).expect("render thread");
/// loop {
///     pump.pump();
///     # break;
/// }
/// # }
/// ```
pub struct MapViewBuilder<B: SurfaceBackend> {
    config: ViewConfig,
    shared_context: Option<SharedContext<B::Context>>,
}

impl<B: SurfaceBackend> MapViewBuilder<B> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ViewConfig::default(),
            shared_context: None,
        }
    }

    /// Selects threaded or platform-driven rendering.
    ///
    /// Default: `RenderMode::Threaded`
    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.config.render_mode = mode;
        self
    }

    /// Selects where surface recovery runs.
    ///
    /// Default: `RecoveryMode::Synchronous`
    pub fn with_recovery_mode(mut self, mode: RecoveryMode) -> Self {
        self.config.recovery_mode = mode;
        self
    }

    /// Sets the factor converting view units (points, DIPs, CSS pixels)
    /// into drawable pixels for input coordinates.
    ///
    /// Default: 1.0
    ///
    /// # Panics
    ///
    /// Panics if `scale` is not a positive, finite number.
    pub fn with_scale(mut self, scale: f32) -> Self {
        assert!(
            scale.is_finite() && scale > 0.0,
            "Scale must be positive, got {}",
            scale
        );
        self.config.scale = scale;
        self
    }

    /// Names the render thread.
    ///
    /// Default: `"mapview-render"`
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn with_thread_name(mut self, name: &str) -> Self {
        assert!(!name.is_empty(), "Render thread name must not be empty");
        self.config.thread_name = name.to_owned();
        self
    }

    /// Renders through a GPU context shared with other views.
    pub fn with_shared_context(mut self, shared: SharedContext<B::Context>) -> Self {
        self.shared_context = Some(shared);
        self
    }

    /// Enables or disables pointer and wheel input.
    ///
    /// Default: true
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.config.interactive = interactive;
        self
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Builds the view and installs its redraw listener into `engine`.
    ///
    /// Nothing is rendered until the view is made visible.
    pub fn build(self, backend: B, engine: Arc<dyn MapEngine>, host: Arc<dyn ViewHost>) -> MapView<B> {
        let surface = match self.shared_context {
            Some(shared) => SurfaceLifecycleManager::with_shared_context(backend, engine.clone(), shared),
            None => SurfaceLifecycleManager::new(backend, engine.clone()),
        };
        let core = Arc::new(Mutex::new(ViewCore::new(surface)));
        let signal = Arc::new(RedrawSignal::new());

        let (redraw_target, bridge) = match self.config.render_mode {
            RenderMode::Threaded => (
                signal.clone() as Arc<dyn RedrawTarget>,
                RedrawRequestBridge::attach(&signal),
            ),
            RenderMode::OnDemand => {
                let scheduler = Arc::new(FrameScheduler::new(signal.clone(), host.clone()));
                let bridge = RedrawRequestBridge::attach(&scheduler);
                (scheduler as Arc<dyn RedrawTarget>, bridge)
            }
        };

        let listener = bridge.listener();
        guarded("set_redraw_request_listener", || {
            engine.set_redraw_request_listener(Some(listener))
        });

        info!(
            target: "mapview::view",
            "Map view created ({:?}, {:?} recovery)",
            self.config.render_mode,
            self.config.recovery_mode
        );

        MapView {
            inner: Arc::new(ViewInner {
                config: self.config,
                core,
                signal,
                engine,
                host,
                bridge,
                redraw_target,
                render_thread: Mutex::new(None),
                loop_active: AtomicBool::new(false),
                visible: AtomicBool::new(false),
                halted: AtomicBool::new(false),
                recovered_without_frame: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
            }),
        }
    }
}

impl<B: SurfaceBackend> Default for MapViewBuilder<B> {
    fn default() -> Self {
        Self::new()
    }
}

//=== MapView =============================================================

/// A map view hosted by a platform.
///
/// Dropping the view tears it down.
pub struct MapView<B: SurfaceBackend> {
    inner: Arc<ViewInner<B>>,
}

impl<B: SurfaceBackend> MapView<B> {
    //--- Lifecycle --------------------------------------------------------

    /// The view became visible or hidden.
    ///
    /// Becoming visible clears a previous halt and starts rendering;
    /// becoming hidden stops the render loop but keeps the surface.
    pub fn on_visibility_changed(&self, visible: bool) -> Result<(), ViewError> {
        let inner = &self.inner;
        if inner.is_torn_down() {
            return Ok(());
        }
        debug!(target: "mapview::view", "Visibility changed: {}", visible);

        inner.visible.store(visible, Ordering::SeqCst);
        if visible {
            inner.clear_halt();
            ViewInner::start_rendering(inner)
        } else {
            inner.stop_render_loop();
            Ok(())
        }
    }

    /// The platform view was resized; the new size is read from the
    /// backend.
    ///
    /// A zero-area view loses its surface; any other size is picked up by
    /// the next frame.
    pub fn on_size_changed(&self) -> Result<(), ViewError> {
        let inner = &self.inner;
        if inner.is_torn_down() {
            return Ok(());
        }

        let size = lock(&inner.core).surface.drawable_size();
        debug!(target: "mapview::view", "Size changed to {}x{}", size.width, size.height);

        if size.is_empty() {
            inner.stop_render_loop();
            lock(&inner.core).surface.destroy_surface();
            return Ok(());
        }

        inner.clear_halt();
        ViewInner::start_rendering(inner)
    }

    /// The application is going to the background.
    pub fn on_suspend(&self) {
        let inner = &self.inner;
        if inner.is_torn_down() {
            return;
        }
        info!(target: "mapview::view", "Suspending view");
        inner.stop_render_loop();
        lock(&inner.core).surface.finish_rendering();
    }

    /// The application returned to the foreground.
    pub fn on_resume(&self) -> Result<(), ViewError> {
        let inner = &self.inner;
        if inner.is_torn_down() {
            return Ok(());
        }
        info!(target: "mapview::view", "Resuming view");
        inner.clear_halt();
        ViewInner::start_rendering(inner)
    }

    /// Stops rendering, recovers the surface and resumes.
    pub fn recover(&self) -> Result<bool, ViewError> {
        self.inner.clear_halt();
        ViewInner::recover_now(&self.inner, false)
    }

    /// Releases everything the view holds. Safe to call more than once.
    ///
    /// The redraw bridge is detached before anything else, so engine
    /// requests arriving mid-teardown are dropped.
    pub fn teardown(&self) {
        let inner = &self.inner;
        if inner.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(target: "mapview::view", "Tearing down view");

        inner.bridge.detach();
        guarded("set_redraw_request_listener", || {
            inner.engine.set_redraw_request_listener(None)
        });
        inner.stop_render_loop();

        let mut core = lock(&inner.core);
        core.surface.destroy_surface();
        core.input.reset();
    }

    //--- Rendering --------------------------------------------------------

    /// Requests a new frame.
    pub fn request_redraw(&self) {
        if !self.inner.is_torn_down() {
            self.inner.redraw_target.request_redraw();
        }
    }

    /// Frame callback for `OnDemand` views: renders one frame if one is
    /// pending. Returns whether a frame was presented.
    pub fn render_pending_frame(&self) -> bool {
        let inner = &self.inner;
        if inner.config.render_mode != RenderMode::OnDemand {
            trace!(target: "mapview::view", "Frame callback ignored by threaded view");
            return false;
        }
        if inner.is_torn_down() || inner.is_halted() || !inner.visible.load(Ordering::SeqCst) {
            return false;
        }
        if !inner.signal.take() {
            return false;
        }

        let render_loop = inner.render_loop();
        match render_loop.render_frame() {
            Ok(FrameOutcome::Presented) => {
                inner.recovered_without_frame.store(false, Ordering::SeqCst);
                true
            }
            Ok(FrameOutcome::Skipped) => false,
            Err(err) => {
                if inner.recovered_without_frame.swap(false, Ordering::SeqCst) {
                    inner.halt(&err.to_string());
                    return false;
                }
                match render_loop.recover() {
                    Ok(true) => {
                        inner.recovered_without_frame.store(true, Ordering::SeqCst);
                        inner.redraw_target.request_redraw();
                    }
                    Ok(false) => {}
                    Err(err) => inner.halt(&err.to_string()),
                }
                false
            }
        }
    }

    //--- Input ------------------------------------------------------------

    /// A pointer touched down at view coordinates `(x, y)`.
    ///
    /// Input methods return whether the view consumed the event.
    pub fn on_pointer_down(&self, id: PointerId, x: f32, y: f32) -> bool {
        let pos = self.inner.to_pixels(x, y);
        self.inner.dispatch(|input| input.on_down(id, pos.x, pos.y))
    }

    pub fn on_pointer_move(&self, id: PointerId, x: f32, y: f32) -> bool {
        let pos = self.inner.to_pixels(x, y);
        self.inner.dispatch(|input| input.on_move(id, pos.x, pos.y))
    }

    pub fn on_pointer_up(&self, id: PointerId, x: f32, y: f32) -> bool {
        let pos = self.inner.to_pixels(x, y);
        self.inner.dispatch(|input| input.on_up(id, pos.x, pos.y))
    }

    pub fn on_pointer_cancel(&self) -> bool {
        self.inner.dispatch(|input| Some(input.on_cancel()))
    }

    /// A discrete zoom step (`+1` in, `-1` out) at view coordinates.
    pub fn on_wheel(&self, delta: i32, x: f32, y: f32) -> bool {
        let inner = &self.inner;
        if !inner.accepts_input() {
            return false;
        }
        let wheel = WheelEvent {
            delta,
            pos: inner.to_pixels(x, y),
        };
        trace!(target: "mapview::input", "Wheel {:?}", wheel);
        forward_wheel(inner.engine.as_ref(), &wheel);
        true
    }

    //--- Queries ----------------------------------------------------------

    pub fn config(&self) -> &ViewConfig {
        &self.inner.config
    }

    pub fn surface_state(&self) -> SurfaceState {
        lock(&self.inner.core).surface.state()
    }

    /// Whether frames are currently being produced.
    pub fn is_render_loop_running(&self) -> bool {
        let inner = &self.inner;
        match inner.config.render_mode {
            RenderMode::Threaded => inner.loop_running(&lock(&inner.render_thread)),
            RenderMode::OnDemand => {
                inner.visible.load(Ordering::SeqCst) && !inner.is_halted() && !inner.is_torn_down()
            }
        }
    }

    /// Whether rendering stopped after an unrecoverable loss.
    pub fn is_halted(&self) -> bool {
        self.inner.is_halted()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.is_torn_down()
    }

    /// The subscription the engine's redraw listener goes through.
    pub fn redraw_bridge(&self) -> RedrawRequestBridge {
        self.inner.bridge.clone()
    }
}

impl<B: SurfaceBackend> Drop for MapView<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

//=== ViewInner ===========================================================

struct ViewInner<B: SurfaceBackend> {
    config: ViewConfig,
    core: SharedCore<B>,
    signal: Arc<RedrawSignal>,
    engine: Arc<dyn MapEngine>,
    host: Arc<dyn ViewHost>,
    bridge: RedrawRequestBridge,
    /// Strong owner of what the bridge points at.
    redraw_target: Arc<dyn RedrawTarget>,
    render_thread: Mutex<Option<JoinHandle<()>>>,
    /// Cleared by the render thread, under the `render_thread` lock, once
    /// its loop has returned. The thread may linger after that.
    loop_active: AtomicBool,
    visible: AtomicBool,
    halted: AtomicBool,
    /// Set by a recovery until the next frame is presented.
    recovered_without_frame: AtomicBool,
    torn_down: AtomicBool,
}

impl<B: SurfaceBackend> ViewInner<B> {
    //--- State ------------------------------------------------------------

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    fn halt(&self, reason: &str) {
        error!(
            target: "mapview::view",
            "Rendering halted until the view is re-triggered: {}",
            reason
        );
        self.halted.store(true, Ordering::SeqCst);
    }

    fn clear_halt(&self) {
        self.halted.store(false, Ordering::SeqCst);
        self.recovered_without_frame.store(false, Ordering::SeqCst);
    }

    fn render_loop(&self) -> RenderLoop<B> {
        RenderLoop::new(self.core.clone(), self.signal.clone())
    }

    //--- Render Thread ----------------------------------------------------

    /// Starts producing frames if the view is visible.
    fn start_rendering(inner: &Arc<Self>) -> Result<(), ViewError> {
        if inner.is_torn_down() || !inner.visible.load(Ordering::SeqCst) {
            return Ok(());
        }
        match inner.config.render_mode {
            RenderMode::Threaded => {
                Self::spawn_render_thread(inner)?;
                inner.signal.raise();
            }
            RenderMode::OnDemand => inner.redraw_target.request_redraw(),
        }
        Ok(())
    }

    /// Whether a render loop is running. A thread whose loop already
    /// returned does not count, even before it terminates.
    fn loop_running(&self, slot: &Option<JoinHandle<()>>) -> bool {
        self.loop_active.load(Ordering::SeqCst) && slot.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn spawn_render_thread(inner: &Arc<Self>) -> Result<(), ViewError> {
        let mut slot = lock(&inner.render_thread);
        if inner.loop_running(&slot) {
            return Ok(());
        }
        if let Some(stale) = slot.take() {
            if stale.join().is_err() {
                error!(target: "mapview::render", "Previous render thread panicked");
            }
        }

        // A halt recorded by the previous loop after the caller cleared it
        // is superseded by the new loop.
        inner.halted.store(false, Ordering::SeqCst);
        inner.signal.clear_stop();
        inner.loop_active.store(true, Ordering::SeqCst);
        let render_loop = inner.render_loop();
        let recovery_mode = inner.config.recovery_mode;
        let view = Arc::downgrade(inner);

        let handle = inner.host.spawn_render_thread(
            &inner.config.thread_name,
            Box::new(move || {
                debug!(target: "mapview::render", "Render thread started");
                let exit = match recovery_mode {
                    RecoveryMode::Synchronous => render_loop.run(),
                    RecoveryMode::UiDispatched => render_loop.run_until_lost(),
                };
                debug!(target: "mapview::render", "Render thread exiting: {:?}", exit);
                if let Some(view) = view.upgrade() {
                    let _slot = lock(&view.render_thread);
                    view.loop_active.store(false, Ordering::SeqCst);
                    Self::on_loop_exit(&view, exit);
                }
            }),
        );

        match handle {
            Ok(handle) => {
                *slot = Some(handle);
                Ok(())
            }
            Err(err) => {
                inner.loop_active.store(false, Ordering::SeqCst);
                Err(err.into())
            }
        }
    }

    /// Stops and joins the render thread; an in-flight frame completes.
    fn stop_render_loop(&self) {
        let Some(handle) = lock(&self.render_thread).take() else {
            return;
        };
        self.signal.request_stop();

        if handle.thread().id() == thread::current().id() {
            warn!(target: "mapview::render", "Render loop stopped from its own thread, not joining");
            return;
        }
        if handle.join().is_err() {
            error!(target: "mapview::render", "Render thread panicked");
        }
        self.loop_active.store(false, Ordering::SeqCst);
        debug!(target: "mapview::render", "Render loop stopped");
    }

    fn on_loop_exit(inner: &Arc<Self>, exit: LoopExit) {
        match exit {
            LoopExit::Stopped => {}
            LoopExit::AwaitingSurface => {
                if lock(&inner.core).surface.drawable_size().is_empty() {
                    info!(target: "mapview::render", "Render loop waiting for a non-empty size");
                    return;
                }
                // The size came back while the loop was returning.
                let view = Arc::downgrade(inner);
                inner.host.run_on_ui_thread(Box::new(move || {
                    if let Some(view) = view.upgrade() {
                        if let Err(err) = Self::start_rendering(&view) {
                            warn!(target: "mapview::render", "Render loop restart failed: {}", err);
                        }
                    }
                }));
            }
            LoopExit::Halted => inner.halt("surface could not be recovered"),
            LoopExit::SurfaceLost { frames_presented } => {
                if inner.is_torn_down() {
                    return;
                }
                if frames_presented > 0 {
                    inner.recovered_without_frame.store(false, Ordering::SeqCst);
                } else if inner.recovered_without_frame.load(Ordering::SeqCst) {
                    inner.halt("surface lost again right after recovery");
                    return;
                }

                let view = Arc::downgrade(inner);
                inner.host.run_on_ui_thread(Box::new(move || {
                    if let Some(view) = view.upgrade() {
                        if let Err(err) = Self::recover_now(&view, true) {
                            warn!(target: "mapview::render", "Dispatched recovery failed: {}", err);
                        }
                    }
                }));
            }
        }
    }

    //--- Recovery ---------------------------------------------------------

    /// Stops the loop, recovers under the view lock and restarts.
    fn recover_now(inner: &Arc<Self>, after_loss: bool) -> Result<bool, ViewError> {
        if inner.is_torn_down() {
            return Err(ViewError::TornDown);
        }
        inner.stop_render_loop();

        let recovered = lock(&inner.core).surface.recover();
        match recovered {
            Ok(true) => {
                inner
                    .recovered_without_frame
                    .store(after_loss, Ordering::SeqCst);
                Self::start_rendering(inner)?;
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(err) => {
                inner.halt(&err.to_string());
                Err(err.into())
            }
        }
    }

    //--- Input ------------------------------------------------------------

    fn accepts_input(&self) -> bool {
        self.config.interactive && !self.is_torn_down()
    }

    fn to_pixels(&self, x: f32, y: f32) -> ScreenPos {
        ScreenPos::new(x * self.config.scale, y * self.config.scale)
    }

    /// Updates pointer slots under the view lock, then forwards the action
    /// with the lock released.
    fn dispatch(&self, event: impl FnOnce(&mut InputDispatcher) -> Option<ActionEvent>) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let action = event(&mut lock(&self.core).input);
        if let Some(action) = action {
            trace!(target: "mapview::input", "Dispatching {:?}", action);
            forward_action(self.engine.as_ref(), &action);
        }
        true
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
