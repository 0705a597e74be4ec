//=========================================================================
// Input Processor
//=========================================================================
//
// Converts Winit touch, mouse and wheel events into view pointer input.
//
// Architecture:
//   Winit Events → InputProcessor → PointerInput → MapView
//
// Stateful tracking: the last cursor position and the left button state
// are cached so that a mouse can drive the view as one more pointer. Other
// mouse buttons are filtered (returns None).
//
//=========================================================================

//=== External Dependencies ===============================================

use log::trace;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase};

//=== Internal Dependencies ===============================================

use crate::core::input::{PointerId, ScreenPos, WheelEvent};
use crate::core::platform_bridge::SurfaceBackend;
use crate::MapView;

//=== Constants ===========================================================

/// Pointer id reserved for the emulated mouse pointer.
pub const MOUSE_POINTER_ID: PointerId = u64::MAX;

/// Pixel scroll distances at or below this are treated as jitter.
const PIXEL_SCROLL_THRESHOLD: f32 = 1.0;

//=== PointerInput ========================================================

/// One pointer event in view units, ready for a [`MapView`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Down { id: PointerId, x: f32, y: f32 },
    Move { id: PointerId, x: f32, y: f32 },
    Up { id: PointerId, x: f32, y: f32 },
    Cancel,
    Wheel(WheelEvent),
}

impl PointerInput {
    /// Feeds the event to `view`. Returns whether the view consumed it.
    pub fn apply<B: SurfaceBackend>(self, view: &MapView<B>) -> bool {
        match self {
            Self::Down { id, x, y } => view.on_pointer_down(id, x, y),
            Self::Move { id, x, y } => view.on_pointer_move(id, x, y),
            Self::Up { id, x, y } => view.on_pointer_up(id, x, y),
            Self::Cancel => view.on_pointer_cancel(),
            Self::Wheel(wheel) => view.on_wheel(wheel.delta, wheel.pos.x, wheel.pos.y),
        }
    }
}

//=== InputProcessor ======================================================

/// Converts Winit events to pointer input, emulating a touch pointer with
/// the left mouse button.
#[derive(Debug, Default)]
pub(crate) struct InputProcessor {
    cursor: ScreenPos,
    mouse_pressed: bool,
}

impl InputProcessor {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new() -> Self {
        Self::default()
    }

    //--- Event Processing -------------------------------------------------

    /// Maps a touch to the pointer event of its phase.
    pub(crate) fn process_touch(&self, phase: TouchPhase, id: u64, x: f32, y: f32) -> PointerInput {
        let ScreenPos { x, y } = clamp_to_view(x, y);
        match phase {
            TouchPhase::Started => PointerInput::Down { id, x, y },
            TouchPhase::Moved => PointerInput::Move { id, x, y },
            TouchPhase::Ended => PointerInput::Up { id, x, y },
            TouchPhase::Cancelled => PointerInput::Cancel,
        }
    }

    /// Tracks the cursor; yields a move while the left button is held.
    ///
    /// A captured drag keeps reporting past the window edge, so positions
    /// are clamped to the view's origin.
    pub(crate) fn process_cursor_moved(&mut self, x: f32, y: f32) -> Option<PointerInput> {
        self.cursor = clamp_to_view(x, y);
        let ScreenPos { x, y } = self.cursor;
        self.mouse_pressed.then_some(PointerInput::Move {
            id: MOUSE_POINTER_ID,
            x,
            y,
        })
    }

    /// Left button press/release at the last cursor position.
    pub(crate) fn process_mouse_button(
        &mut self,
        button: MouseButton,
        state: ElementState,
    ) -> Option<PointerInput> {
        if button != MouseButton::Left {
            trace!(target: "platform::input", "Ignoring {:?} button", button);
            return None;
        }

        let ScreenPos { x, y } = self.cursor;
        match (state, self.mouse_pressed) {
            (ElementState::Pressed, false) => {
                self.mouse_pressed = true;
                Some(PointerInput::Down { id: MOUSE_POINTER_ID, x, y })
            }
            (ElementState::Released, true) => {
                self.mouse_pressed = false;
                Some(PointerInput::Up { id: MOUSE_POINTER_ID, x, y })
            }
            _ => None,
        }
    }

    /// Quantizes a scroll into one zoom step at the last cursor position.
    ///
    /// Line deltas zoom on any movement; pixel deltas (touchpads) only
    /// past a small threshold.
    pub(crate) fn process_wheel(&self, delta: MouseScrollDelta) -> Option<PointerInput> {
        let wheel = match delta {
            MouseScrollDelta::LineDelta(_, lines) => WheelEvent::from_scroll(lines, 0.0, self.cursor),
            MouseScrollDelta::PixelDelta(pixels) => {
                WheelEvent::from_scroll(pixels.y as f32, PIXEL_SCROLL_THRESHOLD, self.cursor)
            }
        };
        wheel.map(PointerInput::Wheel)
    }

    /// The mouse left the window or the window lost focus mid-drag.
    pub(crate) fn release_mouse(&mut self) -> Option<PointerInput> {
        if !self.mouse_pressed {
            return None;
        }
        self.mouse_pressed = false;
        Some(PointerInput::Cancel)
    }
}

/// Negative coordinates would collide with the engine's absent-position
/// sentinel.
fn clamp_to_view(x: f32, y: f32) -> ScreenPos {
    ScreenPos::new(x.max(0.0), y.max(0.0))
}

//=========================================================================
// Unit Tests
//=========================================================================
