//=========================================================================
// UI Queue
//=========================================================================
//
// Channel-backed `ViewHost` for platforms that pump their own UI loop.
//
// Architecture:
//   any thread ── ChannelHost ──> Sender<HostMessage>
//   UI thread  ── HostPump::pump() ──> runs tasks, reports frame requests
//
// Draining is bounded per pump so a flood of tasks cannot starve the UI
// loop. Frame requests are coalesced into a single flag per pump.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{trace, warn};

//=== Internal Dependencies ===============================================

use super::interface::{UiTask, ViewHost};

//=== HostMessage =========================================================

/// Messages queued for the UI thread.
pub enum HostMessage {
    RunTask(UiTask),
    FrameRequested,
}

impl std::fmt::Debug for HostMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunTask(_) => f.write_str("RunTask(..)"),
            Self::FrameRequested => f.write_str("FrameRequested"),
        }
    }
}

//=== ChannelHost =========================================================

/// Sending side; cheap to clone and share across threads.
#[derive(Debug, Clone)]
pub struct ChannelHost {
    sender: Sender<HostMessage>,
}

impl ChannelHost {
    /// Creates a connected host/pump pair.
    pub fn channel() -> (ChannelHost, HostPump) {
        let (sender, receiver) = unbounded();
        (ChannelHost { sender }, HostPump { receiver })
    }

    fn send(&self, message: HostMessage) {
        if self.sender.send(message).is_err() {
            warn!(target: "mapview::host", "UI queue disconnected, dropping message");
        }
    }
}

impl ViewHost for ChannelHost {
    fn run_on_ui_thread(&self, task: UiTask) {
        self.send(HostMessage::RunTask(task));
    }

    fn schedule_frame(&self) {
        self.send(HostMessage::FrameRequested);
    }
}

//=== HostPump ============================================================

/// Result of one pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PumpReport {
    /// Number of tasks executed.
    pub tasks_run: usize,
    /// At least one frame was requested since the last pump.
    pub frame_requested: bool,
    /// Every `ChannelHost` has been dropped and the queue is empty.
    pub disconnected: bool,
}

/// Receiving side, owned by the UI thread.
#[derive(Debug)]
pub struct HostPump {
    receiver: Receiver<HostMessage>,
}

impl HostPump {
    /// Upper bound on messages handled by a single pump.
    pub const MAX_MESSAGES_PER_PUMP: usize = 100;

    /// Handles queued messages without blocking.
    pub fn pump(&self) -> PumpReport {
        let mut report = PumpReport::default();
        let mut drained = 0;

        while drained < Self::MAX_MESSAGES_PER_PUMP {
            match self.receiver.try_recv() {
                Ok(message) => {
                    Self::handle(message, &mut report);
                    drained += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    report.disconnected = true;
                    break;
                }
            }
        }

        if drained >= Self::MAX_MESSAGES_PER_PUMP {
            warn!(target: "mapview::host", "UI queue backlog: drained {} messages this pump", drained);
        }

        report
    }

    /// Waits up to `timeout` for the first message, then pumps.
    pub fn pump_timeout(&self, timeout: Duration) -> PumpReport {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => {
                let mut first = PumpReport::default();
                Self::handle(message, &mut first);
                let rest = self.pump();
                PumpReport {
                    tasks_run: first.tasks_run + rest.tasks_run,
                    frame_requested: first.frame_requested || rest.frame_requested,
                    disconnected: rest.disconnected,
                }
            }
            Err(RecvTimeoutError::Timeout) => PumpReport::default(),
            Err(RecvTimeoutError::Disconnected) => PumpReport {
                disconnected: true,
                ..PumpReport::default()
            },
        }
    }

    fn handle(message: HostMessage, report: &mut PumpReport) {
        match message {
            HostMessage::RunTask(task) => {
                trace!(target: "mapview::host", "Running UI task");
                task();
                report.tasks_run += 1;
            }
            HostMessage::FrameRequested => report.frame_requested = true,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
