//=========================================================================
// Render
//=========================================================================
//
// Redraw signalling and the render loop that consumes it.
//
//=========================================================================

pub mod render_loop;
pub mod signal;

pub use render_loop::{LoopExit, RenderLoop};
pub use signal::RedrawSignal;
