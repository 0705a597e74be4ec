//=========================================================================
// Surface
//=========================================================================
//
// Render surface and GPU context lifecycle.
//
// Components:
// - `state`: the NoSurface / Created / Active / Lost state machine
// - `manager`: `SurfaceLifecycleManager`, owner of context and surface
// - `shared_context`: a context shared by several views
//
//=========================================================================

pub mod manager;
pub mod shared_context;
pub mod state;

pub use manager::{FrameOutcome, SurfaceLifecycleManager};
pub use shared_context::SharedContext;
pub use state::SurfaceState;
