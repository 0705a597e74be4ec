//=========================================================================
// Render Loop
//=========================================================================
//
// Frame production for one view, independent of the UI thread.
//
// Loop instance:
// ```text
//   ┌──> lock view ── sync drawable size ── draw + present ── unlock
//   │                                            │
//   │                                            └─ lost → end instance
//   └── wait on RedrawSignal (stop → end instance)
// ```
//
// `run` supervises instances on the render thread itself: after a loss it
// recovers under the view lock and starts a fresh instance. If the first
// present after a recovery fails too, the loop halts instead of retrying.
// `run_until_lost` leaves recovery to the caller.
//
// A stop request only takes effect between frames; an in-flight present
// always completes.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;

use log::{debug, error, info, trace};

//=== Internal Dependencies ===============================================

use super::signal::RedrawSignal;
use crate::core::errors::SurfaceError;
use crate::core::surface::{FrameOutcome, SurfaceState};
use crate::core::platform_bridge::SurfaceBackend;
use crate::core::{lock, SharedCore};

//=== LoopExit ============================================================

/// Why a render loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A stop was requested.
    Stopped,
    /// The surface was lost and recovery is up to the caller.
    SurfaceLost { frames_presented: u64 },
    /// Recovery left the view without a surface because it has no size.
    AwaitingSurface,
    /// Recovery failed, or the surface was lost again right after one.
    Halted,
}

enum InstanceExit {
    Stopped,
    Lost { frames_presented: u64 },
}

//=== RenderLoop ==========================================================

pub struct RenderLoop<B: SurfaceBackend> {
    core: SharedCore<B>,
    signal: Arc<RedrawSignal>,
}

impl<B: SurfaceBackend> RenderLoop<B> {
    pub fn new(core: SharedCore<B>, signal: Arc<RedrawSignal>) -> Self {
        Self { core, signal }
    }

    /// Renders a single frame under the view lock.
    ///
    /// Creates and announces the surface if the view has none yet, forwards
    /// a size change to the engine, then draws and presents. An error means
    /// the surface is lost (now or from an earlier frame).
    pub fn render_frame(&self) -> Result<FrameOutcome, SurfaceError> {
        let mut core = lock(&self.core);
        let surface = &mut core.surface;
        let size = surface.drawable_size();

        match surface.state() {
            SurfaceState::Lost => {
                return Err(SurfaceError::PresentFailed("surface lost before frame".into()));
            }
            SurfaceState::NoSurface if !surface.is_fatal() => {
                if let Err(err) = surface.create_surface(size) {
                    debug!(target: "mapview::render", "Frame without surface, presents skip: {}", err);
                }
            }
            _ => {}
        }
        if surface.state() == SurfaceState::Created {
            surface.notify_surface_created();
        }

        surface.resize(size);
        surface.present()
    }

    /// Runs the surface recovery cycle under the view lock.
    pub fn recover(&self) -> Result<bool, SurfaceError> {
        lock(&self.core).surface.recover()
    }

    /// Renders until stopped, recovering from surface loss in place.
    pub fn run(&self) -> LoopExit {
        let mut recovered = false;

        loop {
            match self.run_instance() {
                InstanceExit::Stopped => return LoopExit::Stopped,
                InstanceExit::Lost { frames_presented } => {
                    if recovered && frames_presented == 0 {
                        error!(
                            target: "mapview::render",
                            "Surface lost again right after recovery, halting render loop"
                        );
                        return LoopExit::Halted;
                    }
                    if self.signal.is_stop_requested() {
                        debug!(target: "mapview::render", "Stop requested, leaving recovery to restart");
                        return LoopExit::Stopped;
                    }

                    match self.recover() {
                        Ok(true) => {
                            info!(target: "mapview::render", "Surface recovered, restarting loop instance");
                            recovered = true;
                        }
                        Ok(false) => return LoopExit::AwaitingSurface,
                        Err(err) => {
                            error!(target: "mapview::render", "Surface recovery failed: {}", err);
                            return LoopExit::Halted;
                        }
                    }
                }
            }
        }
    }

    /// Renders until stopped or the surface is lost.
    pub fn run_until_lost(&self) -> LoopExit {
        match self.run_instance() {
            InstanceExit::Stopped => LoopExit::Stopped,
            InstanceExit::Lost { frames_presented } => LoopExit::SurfaceLost { frames_presented },
        }
    }

    fn run_instance(&self) -> InstanceExit {
        let mut frames_presented = 0;

        if self.signal.is_stop_requested() {
            return InstanceExit::Stopped;
        }

        loop {
            match self.render_frame() {
                Ok(FrameOutcome::Presented) => frames_presented += 1,
                Ok(FrameOutcome::Skipped) => trace!(target: "mapview::render", "Frame skipped"),
                Err(_) => return InstanceExit::Lost { frames_presented },
            }

            if !self.signal.wait() {
                return InstanceExit::Stopped;
            }
        }
    }
}

//=== Tests ===============================================================
