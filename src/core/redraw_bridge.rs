//=========================================================================
// Redraw Request Bridge
//=========================================================================
//
// Relays the engine's "redraw requested" callback to the view's render
// trigger through a revocable, non-owning reference.
//
// ```text
//   engine (any thread) ── listener ──> bridge ──Weak──> RedrawTarget
//                                         │                 ├─ RedrawSignal     (threaded)
//                                         └─ detach()       └─ FrameScheduler   (on-demand)
// ```
//
// Resolution and revocation share one lock. Once `detach` has returned,
// no request can reach the target, even one that started concurrently.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::{Arc, Mutex, Weak};

use log::{debug, trace};

//=== Internal Dependencies ===============================================

use crate::core::engine::RedrawListener;
use crate::core::lock;
use crate::core::platform_bridge::ViewHost;
use crate::core::render::RedrawSignal;

//=== RedrawTarget ========================================================

/// Something that can turn a redraw request into a frame.
pub trait RedrawTarget: Send + Sync + 'static {
    fn request_redraw(&self);
}

impl RedrawTarget for RedrawSignal {
    fn request_redraw(&self) {
        self.raise();
    }
}

/// Redraw target for views whose frames are driven by the platform:
/// marks the frame pending and asks the host for a frame callback.
pub struct FrameScheduler {
    signal: Arc<RedrawSignal>,
    host: Arc<dyn ViewHost>,
}

impl FrameScheduler {
    pub fn new(signal: Arc<RedrawSignal>, host: Arc<dyn ViewHost>) -> Self {
        Self { signal, host }
    }
}

impl RedrawTarget for FrameScheduler {
    fn request_redraw(&self) {
        self.signal.raise();
        self.host.schedule_frame();
    }
}

//=== RedrawRequestBridge =================================================

/// Revocable subscription from the engine to a view's redraw trigger.
///
/// Clones share the same subscription.
#[derive(Clone)]
pub struct RedrawRequestBridge {
    target: Arc<Mutex<Option<Weak<dyn RedrawTarget>>>>,
}

impl RedrawRequestBridge {
    /// Subscribes to `target` without keeping it alive.
    pub fn attach<T: RedrawTarget>(target: &Arc<T>) -> Self {
        let weak: Weak<T> = Arc::downgrade(target);
        let weak: Weak<dyn RedrawTarget> = weak;
        Self {
            target: Arc::new(Mutex::new(Some(weak))),
        }
    }

    /// Forwards a redraw request if the subscription is still live.
    ///
    /// Safe from any thread at any time; returns whether the request was
    /// delivered.
    pub fn on_redraw_requested(&self) -> bool {
        let guard = lock(&self.target);
        match guard.as_ref().and_then(Weak::upgrade) {
            Some(target) => {
                target.request_redraw();
                true
            }
            None => {
                trace!(target: "mapview::bridge", "Redraw request after detach ignored");
                false
            }
        }
    }

    /// Revokes the subscription. Returns whether it was still attached.
    pub fn detach(&self) -> bool {
        let was_attached = lock(&self.target).take().is_some();
        if was_attached {
            debug!(target: "mapview::bridge", "Redraw bridge detached");
        }
        was_attached
    }

    pub fn is_attached(&self) -> bool {
        lock(&self.target)
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// The callback to install with `MapEngine::set_redraw_request_listener`.
    pub fn listener(&self) -> RedrawListener {
        let bridge = self.clone();
        Arc::new(move || {
            bridge.on_redraw_requested();
        })
    }
}

impl std::fmt::Debug for RedrawRequestBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedrawRequestBridge")
            .field("attached", &self.is_attached())
            .finish()
    }
}

//=== Tests ===============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform_bridge::ChannelHost;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Default)]
    struct CountingTarget(AtomicUsize);

    impl RedrawTarget for CountingTarget {
        fn request_redraw(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn live_bridge_forwards_requests() {
        let target = Arc::new(CountingTarget::default());
        let bridge = RedrawRequestBridge::attach(&target);

        assert!(bridge.on_redraw_requested());
        assert!(bridge.on_redraw_requested());
        assert_eq!(target.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concrete_signal_attaches_as_target() {
        let signal = Arc::new(RedrawSignal::new());
        let bridge = RedrawRequestBridge::attach(&signal);

        (bridge.listener())();

        assert!(signal.take());
        assert!(bridge.is_attached());
    }

    #[test]
    fn detach_then_request_is_noop() {
        let target = Arc::new(CountingTarget::default());
        let bridge = RedrawRequestBridge::attach(&target);

        assert!(bridge.detach());
        assert!(!bridge.on_redraw_requested());
        assert!(!bridge.detach(), "Second detach is harmless");
        assert_eq!(target.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn bridge_does_not_keep_target_alive() {
        let target = Arc::new(CountingTarget::default());
        let bridge = RedrawRequestBridge::attach(&target);
        assert!(bridge.is_attached());

        drop(target);

        assert!(!bridge.is_attached());
        assert!(!bridge.on_redraw_requested());
    }

    #[test]
    fn listener_shares_subscription() {
        let signal = Arc::new(RedrawSignal::new());
        let bridge = RedrawRequestBridge::attach(&signal);
        let listener = bridge.listener();

        listener();
        assert!(signal.take());

        bridge.detach();
        listener();
        assert!(!signal.is_pending(), "Listener revoked along with bridge");
    }

    #[test]
    fn requests_from_many_threads_after_detach_never_land() {
        let target = Arc::new(CountingTarget::default());
        let bridge = RedrawRequestBridge::attach(&target);
        bridge.detach();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let listener = bridge.listener();
                thread::spawn(move || (0..100).for_each(|_| listener()))
            })
            .collect();
        handles.into_iter().for_each(|h| h.join().unwrap());

        assert_eq!(target.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn frame_scheduler_raises_and_schedules() {
        let (host, pump) = ChannelHost::channel();
        let signal = Arc::new(RedrawSignal::new());
        let scheduler = Arc::new(FrameScheduler::new(signal.clone(), Arc::new(host)));
        let bridge = RedrawRequestBridge::attach(&scheduler);

        bridge.on_redraw_requested();

        assert!(signal.is_pending());
        assert!(pump.pump().frame_requested);
    }
}
