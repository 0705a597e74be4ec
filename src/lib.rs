//=========================================================================
// MapView Shell — Library Root
//
// This crate hosts a native map engine inside a platform view.
//
// Responsibilities:
// - Expose the per-view facade (`MapView`, built by `MapViewBuilder`)
// - Keep the platform-neutral machinery (`core`) separate from the
//   reference Winit adapter (`platform`)
// - Define the seams a platform implements (`SurfaceBackend`, `ViewHost`)
//   and the seam the engine implements (`MapEngine`)
//
// Typical usage:
// ```no_run
// use std::sync::Arc;
// use mapview_shell::prelude::*;
//
// fn run<B: SurfaceBackend>(engine: Arc<dyn MapEngine>, factory: BackendFactory<B>) {
//     MapShell::run(MapViewBuilder::new(), engine, factory).expect("event loop");
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the view's state machines and threads (input dispatch,
// surface lifecycle, render loop, redraw bridge). It is exposed for
// platform adapters other than the bundled Winit one.
//
pub mod core;

//--- Platform Adapter ----------------------------------------------------
//
// `platform` is the reference Winit shell: window, event loop and input
// conversion for desktop targets.
//
pub mod platform;

//--- Internal Modules ----------------------------------------------------
//
// `view` defines the per-view facade and its builder.
//
mod view;

pub mod prelude;

//--- Public Exports ------------------------------------------------------
//
// Re-exports the facade so users can simply `use mapview_shell::MapView;`
// without knowing the internal module structure.
//
pub use view::{MapView, MapViewBuilder, RecoveryMode, RenderMode, ViewConfig};
