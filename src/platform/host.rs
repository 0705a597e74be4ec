//=========================================================================
// Winit Host
//=========================================================================
//
// `ViewHost` over a Winit event loop proxy.
//
// UI tasks and frame requests travel as user events into the event loop,
// which runs them on the main thread in `MapShell::user_event`.
//
//=========================================================================

//=== External Crates =====================================================

use std::sync::Mutex;

use log::warn;
use winit::event_loop::EventLoopProxy;

//=== Internal Imports ====================================================

use crate::core::lock;
use crate::core::platform_bridge::{UiTask, ViewHost};

//=== ShellEvent ==========================================================

/// User events delivered to the shell's event loop.
pub enum ShellEvent {
    /// Run a task on the main thread.
    RunTask(UiTask),

    /// Request a redraw of the window, which drives on-demand frames.
    FrameRequested,
}

impl std::fmt::Debug for ShellEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunTask(_) => f.write_str("RunTask(..)"),
            Self::FrameRequested => f.write_str("FrameRequested"),
        }
    }
}

//=== WinitHost ===========================================================

pub struct WinitHost {
    proxy: Mutex<EventLoopProxy<ShellEvent>>,
}

impl WinitHost {
    pub fn new(proxy: EventLoopProxy<ShellEvent>) -> Self {
        Self {
            proxy: Mutex::new(proxy),
        }
    }

    /// Sends `event` to the loop. A closed loop drops it with a warning,
    /// so render threads outliving the window never panic.
    fn send(&self, event: ShellEvent) {
        if lock(&self.proxy).send_event(event).is_err() {
            warn!(target: "mapview::host", "Event loop closed, dropping host request");
        }
    }
}

impl ViewHost for WinitHost {
    fn run_on_ui_thread(&self, task: UiTask) {
        self.send(ShellEvent::RunTask(task));
    }

    fn schedule_frame(&self) {
        self.send(ShellEvent::FrameRequested);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_event_debug_hides_task() {
        let task = ShellEvent::RunTask(Box::new(|| {}));
        assert_eq!(format!("{:?}", task), "RunTask(..)");
        assert_eq!(format!("{:?}", ShellEvent::FrameRequested), "FrameRequested");
    }

    #[test]
    fn winit_host_is_shareable() {
        fn assert_view_host<T: ViewHost>() {}
        assert_view_host::<WinitHost>();
    }
}
