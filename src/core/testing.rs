//=========================================================================
// Test Support
//=========================================================================
//
// Recording engine, scripted backend and polling helpers shared by the
// unit tests of the view core.
//
//=========================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::engine::{MapEngine, RedrawListener};
use crate::core::errors::SurfaceError;
use crate::core::platform_bridge::{DrawableSize, SurfaceBackend};

//=== Logging =============================================================

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Polls `condition` until it holds or five seconds pass.
pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

//=== RecordingEngine =====================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EngineCall {
    SurfaceCreated,
    SurfaceChanged(u32, u32),
    DrawFrame,
    SurfaceDestroyed,
    Input(i32, f32, f32, f32, f32),
    Wheel(i32, f32, f32),
    ListenerSet(bool),
    FinishRendering,
}

/// A `MapEngine` that records every call.
#[derive(Default)]
pub(crate) struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    listener: Mutex<Option<RedrawListener>>,
    panic_on_input: AtomicBool,
    panic_on_draw: AtomicBool,
    redraw_on_draw: AtomicBool,
}

impl RecordingEngine {
    pub(crate) fn new() -> Arc<Self> {
        init_logging();
        Arc::new(Self::default())
    }

    pub(crate) fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub(crate) fn count(&self, call: &EngineCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub(crate) fn draws(&self) -> usize {
        self.count(&EngineCall::DrawFrame)
    }

    pub(crate) fn surface_changes(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, EngineCall::SurfaceChanged(..)))
            .collect()
    }

    pub(crate) fn inputs(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, EngineCall::Input(..) | EngineCall::Wheel(..)))
            .collect()
    }

    pub(crate) fn panic_on_input(&self, enabled: bool) {
        self.panic_on_input.store(enabled, Ordering::SeqCst);
    }

    pub(crate) fn panic_on_draw(&self, enabled: bool) {
        self.panic_on_draw.store(enabled, Ordering::SeqCst);
    }

    /// Makes every draw request another frame, like a running animation.
    pub(crate) fn redraw_on_draw(&self, enabled: bool) {
        self.redraw_on_draw.store(enabled, Ordering::SeqCst);
    }

    pub(crate) fn has_listener(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }

    /// Fires the installed redraw listener, as the engine would.
    pub(crate) fn request_redraw(&self) -> bool {
        let listener = self.listener.lock().unwrap().clone();
        match listener {
            Some(listener) => {
                listener();
                true
            }
            None => false,
        }
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MapEngine for RecordingEngine {
    fn on_surface_created(&self) {
        self.record(EngineCall::SurfaceCreated);
    }

    fn on_surface_changed(&self, width: u32, height: u32) {
        self.record(EngineCall::SurfaceChanged(width, height));
    }

    fn on_draw_frame(&self) {
        if self.panic_on_draw.load(Ordering::SeqCst) {
            panic!("draw exploded");
        }
        self.record(EngineCall::DrawFrame);
        if self.redraw_on_draw.load(Ordering::SeqCst) {
            self.request_redraw();
        }
    }

    fn on_surface_destroyed(&self) {
        self.record(EngineCall::SurfaceDestroyed);
    }

    fn on_input_event(&self, action: i32, x1: f32, y1: f32, x2: f32, y2: f32) {
        if self.panic_on_input.load(Ordering::SeqCst) {
            panic!("input exploded");
        }
        self.record(EngineCall::Input(action, x1, y1, x2, y2));
    }

    fn on_wheel_event(&self, delta: i32, x: f32, y: f32) {
        self.record(EngineCall::Wheel(delta, x, y));
    }

    fn set_redraw_request_listener(&self, listener: Option<RedrawListener>) {
        self.record(EngineCall::ListenerSet(listener.is_some()));
        *self.listener.lock().unwrap() = listener;
    }

    fn finish_rendering(&self) {
        self.record(EngineCall::FinishRendering);
    }
}

//=== MockBackend =========================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BackendOp {
    CreateContext(u32),
    ResetContext(u32),
    DestroyContext(u32),
    CreateSurface(u32, DrawableSize),
    MakeCurrent(u32),
    Present(u32),
    DestroySurface(u32),
}

#[derive(Debug)]
pub(crate) struct MockContext(u32);

#[derive(Debug)]
pub(crate) struct MockSurface(u32);

type Hook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Script {
    ops: Vec<BackendOp>,
    next_id: u32,
    size: DrawableSize,
    failing_presents: usize,
    fail_context: bool,
    fail_surface: bool,
    on_create_surface: Option<Hook>,
}

/// Scripted backend. Clones share the same script, so a test keeps one
/// clone to inspect and steer the one owned by the view.
#[derive(Clone, Default)]
pub(crate) struct MockBackend {
    script: Arc<Mutex<Script>>,
}

impl MockBackend {
    pub(crate) fn new(size: DrawableSize) -> Self {
        let backend = Self::default();
        backend.set_size(size);
        backend
    }

    pub(crate) fn ops(&self) -> Vec<BackendOp> {
        self.script.lock().unwrap().ops.clone()
    }

    pub(crate) fn clear_ops(&self) {
        self.script.lock().unwrap().ops.clear();
    }

    pub(crate) fn count(&self, predicate: impl Fn(&BackendOp) -> bool) -> usize {
        self.script.lock().unwrap().ops.iter().filter(|op| predicate(op)).count()
    }

    pub(crate) fn set_size(&self, size: DrawableSize) {
        self.script.lock().unwrap().size = size;
    }

    pub(crate) fn fail_next_presents(&self, count: usize) {
        self.script.lock().unwrap().failing_presents = count;
    }

    pub(crate) fn fail_context_creation(&self) {
        self.script.lock().unwrap().fail_context = true;
    }

    pub(crate) fn fail_surface_creation(&self) {
        self.script.lock().unwrap().fail_surface = true;
    }

    /// Runs `hook` every time a surface is created.
    pub(crate) fn on_create_surface(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.script.lock().unwrap().on_create_surface = Some(Arc::new(hook));
    }

    fn next_id(script: &mut Script) -> u32 {
        script.next_id += 1;
        script.next_id
    }
}

impl SurfaceBackend for MockBackend {
    type Context = MockContext;
    type Surface = MockSurface;

    fn create_context(&mut self) -> Result<MockContext, SurfaceError> {
        let mut script = self.script.lock().unwrap();
        if script.fail_context {
            return Err(SurfaceError::ContextCreation("scripted".into()));
        }
        let id = Self::next_id(&mut script);
        script.ops.push(BackendOp::CreateContext(id));
        Ok(MockContext(id))
    }

    fn reset_context(&mut self, context: &mut MockContext) -> Result<(), SurfaceError> {
        self.script.lock().unwrap().ops.push(BackendOp::ResetContext(context.0));
        Ok(())
    }

    fn destroy_context(&mut self, context: MockContext) {
        self.script.lock().unwrap().ops.push(BackendOp::DestroyContext(context.0));
    }

    fn create_surface(
        &mut self,
        _context: &MockContext,
        size: DrawableSize,
    ) -> Result<MockSurface, SurfaceError> {
        let hook = {
            let mut script = self.script.lock().unwrap();
            if script.fail_surface {
                return Err(SurfaceError::SurfaceCreation("scripted".into()));
            }
            let id = Self::next_id(&mut script);
            script.ops.push(BackendOp::CreateSurface(id, size));
            (script.on_create_surface.clone(), id)
        };
        if let Some(hook) = hook.0 {
            hook();
        }
        Ok(MockSurface(hook.1))
    }

    fn make_current(&mut self, _context: &MockContext, surface: &MockSurface) -> Result<(), SurfaceError> {
        self.script.lock().unwrap().ops.push(BackendOp::MakeCurrent(surface.0));
        Ok(())
    }

    fn present(&mut self, _context: &MockContext, surface: &MockSurface) -> Result<(), SurfaceError> {
        let mut script = self.script.lock().unwrap();
        script.ops.push(BackendOp::Present(surface.0));
        if script.failing_presents > 0 {
            script.failing_presents -= 1;
            return Err(SurfaceError::PresentFailed("scripted".into()));
        }
        Ok(())
    }

    fn destroy_surface(&mut self, _context: &MockContext, surface: MockSurface) {
        self.script.lock().unwrap().ops.push(BackendOp::DestroySurface(surface.0));
    }

    fn drawable_size(&self) -> DrawableSize {
        self.script.lock().unwrap().size
    }
}
