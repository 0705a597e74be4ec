//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use mapview_shell::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// View facade
pub use crate::view::{MapView, MapViewBuilder, RecoveryMode, RenderMode, ViewConfig};

// Engine seam
pub use crate::core::engine::{MapEngine, RedrawListener};

// Errors
pub use crate::core::errors::{SurfaceError, ViewError};

// Platform seams
pub use crate::core::platform_bridge::{
    ChannelHost, DrawableSize, HostPump, SurfaceBackend, UiTask, ViewHost,
};

// Surface
pub use crate::core::surface::{SharedContext, SurfaceState};

// Input
pub use crate::core::input::PointerId;

// Winit shell
pub use crate::platform::{BackendFactory, MapShell, ShellError};
