//=========================================================================
// Errors
//=========================================================================
//
// Error types shared by the surface, render and view layers.
//
// `SurfaceError` comes from the platform backend and the surface manager.
// Only presentation-side failures count as surface loss; creation
// failures are fatal for the view that hit them.
//
//=========================================================================

use thiserror::Error;

//=== SurfaceError ========================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("GPU context creation failed: {0}")]
    ContextCreation(String),

    #[error("render surface creation failed: {0}")]
    SurfaceCreation(String),

    #[error("could not make the GPU context current: {0}")]
    MakeCurrent(String),

    #[error("frame presentation failed: {0}")]
    PresentFailed(String),

    #[error("no GPU context available")]
    NoContext,

    #[error("no render surface exists")]
    NoSurface,

    #[error("surface creation previously failed for this view")]
    Unavailable,
}

impl SurfaceError {
    /// Whether the error means the context or surface was lost and a
    /// recovery cycle should run.
    pub fn is_surface_loss(&self) -> bool {
        matches!(self, Self::PresentFailed(_) | Self::MakeCurrent(_))
    }
}

//=== ViewError ===========================================================

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("failed to spawn render thread: {0}")]
    RenderThread(#[from] std::io::Error),

    #[error("view has been torn down")]
    TornDown,
}

//=== Tests ===============================================================
