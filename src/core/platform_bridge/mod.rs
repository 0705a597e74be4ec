//=========================================================================
// Platform Bridge
//=========================================================================
//
// Bridges the platform layer (winit, mobile view toolkits, browsers) with
// the view core.
//
// This module defines the contract between platform implementations and
// the core, so platform backends can be swapped without changing it.
//
// Components:
// - `interface`: the adapter traits (`SurfaceBackend`, `ViewHost`)
// - `ui_queue`: channel-backed `ViewHost` for self-pumped UI loops
//
//=========================================================================

//=== Module Declarations =================================================

pub mod interface;
pub mod ui_queue;

//=== Public API ==========================================================

pub use interface::{DrawableSize, SurfaceBackend, UiTask, ViewHost};
pub use ui_queue::{ChannelHost, HostMessage, HostPump, PumpReport};
