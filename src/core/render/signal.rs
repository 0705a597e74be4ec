//=========================================================================
// Redraw Signal
//=========================================================================
//
// Single-slot coalescing semaphore between redraw requesters and the
// render loop.
//
// Any number of raises before the loop consumes the flag collapse into
// one pending frame. A stop request wakes a waiting loop without
// consuming the pending flag, so requests made while the loop is stopped
// survive until it restarts.
//
// The flag has its own lock. Engines request redraws from inside their
// draw and input callbacks, which run while the view lock is held.
//
//=========================================================================

use std::sync::{Condvar, Mutex};

use log::trace;

use crate::core::lock;

#[derive(Debug, Default)]
struct SignalState {
    pending: bool,
    stop: bool,
}

/// Coalescing redraw flag with a blocking wait for the render thread.
#[derive(Debug, Default)]
pub struct RedrawSignal {
    state: Mutex<SignalState>,
    wakeup: Condvar,
}

impl RedrawSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a frame as pending and wakes the render loop.
    pub fn raise(&self) {
        let mut state = lock(&self.state);
        if !state.pending {
            trace!(target: "mapview::render", "Redraw pending");
        }
        state.pending = true;
        self.wakeup.notify_all();
    }

    /// Consumes the pending flag without blocking.
    pub fn take(&self) -> bool {
        std::mem::take(&mut lock(&self.state).pending)
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending
    }

    /// Blocks until a frame is pending or a stop is requested.
    ///
    /// Returns `true` (and clears the flag) for a pending frame, `false`
    /// when stopping.
    pub(crate) fn wait(&self) -> bool {
        let mut state = lock(&self.state);
        while !state.pending && !state.stop {
            state = self
                .wakeup
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        if state.stop {
            return false;
        }
        state.pending = false;
        true
    }

    /// Asks a waiting render loop to exit.
    pub(crate) fn request_stop(&self) {
        lock(&self.state).stop = true;
        self.wakeup.notify_all();
    }

    /// Clears a previous stop request before a new loop starts.
    pub(crate) fn clear_stop(&self) {
        lock(&self.state).stop = false;
    }

    pub fn is_stop_requested(&self) -> bool {
        lock(&self.state).stop
    }
}

//=== Tests ===============================================================
