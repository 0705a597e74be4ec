//=========================================================================
// Input
//=========================================================================
//
// Pointer normalization for the engine's input callback.
//
// Architecture:
// ```text
//   platform touch / mouse  ──>  InputDispatcher  ──>  ActionEvent
//                                 (two slots)           └─ to_wire() → engine
//   platform wheel          ──>  WheelEvent::from_scroll ──> engine
// ```
//
//=========================================================================

pub mod action;
pub mod dispatcher;

pub use action::{ActionEvent, ActionKind, ScreenPos, WheelEvent, NO_COORDINATE};
pub use dispatcher::{InputDispatcher, PointerId, PointerSlot, MAX_POINTERS};
