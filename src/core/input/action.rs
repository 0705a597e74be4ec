//=========================================================================
// Engine Action Protocol
//=========================================================================
//
// Normalized actions handed to the map engine.
//
// Every accepted pointer event becomes exactly one `ActionEvent`: a kind
// plus up to two positions. On the wire the engine receives
// `(code, x1, y1, x2, y2)`, with `-1` in every unused coordinate slot.
//
// Wheel input is quantized separately into single zoom steps.
//
//=========================================================================

//=== ScreenPos ===========================================================

/// Coordinate value sent to the engine for an absent position.
///
/// Never produced by real input: positions are view-relative and
/// non-negative.
pub const NO_COORDINATE: f32 = -1.0;

/// A position in drawable pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPos {
    pub x: f32,
    pub y: f32,
}

impl ScreenPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

//=== ActionKind ==========================================================

/// Action codes understood by the engine's input callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ActionKind {
    Pointer1Down = 0,
    Pointer2Down = 1,
    Move = 2,
    Cancel = 3,
    Pointer1Up = 4,
    Pointer2Up = 5,
}

impl ActionKind {
    /// Wire code passed as the first argument of `on_input_event`.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Pointer1Down),
            1 => Some(Self::Pointer2Down),
            2 => Some(Self::Move),
            3 => Some(Self::Cancel),
            4 => Some(Self::Pointer1Up),
            5 => Some(Self::Pointer2Up),
            _ => None,
        }
    }
}

//=== ActionEvent =========================================================

/// One normalized input action.
///
/// `pos1` always belongs to the pointer in slot 0 (or the pointer being
/// released from slot 0), `pos2` to the second pointer when one is live.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionEvent {
    pub kind: ActionKind,
    pub pos1: Option<ScreenPos>,
    pub pos2: Option<ScreenPos>,
}

impl ActionEvent {
    pub fn new(kind: ActionKind, pos1: Option<ScreenPos>, pos2: Option<ScreenPos>) -> Self {
        Self { kind, pos1, pos2 }
    }

    /// The coordinate-free cancel action.
    pub fn cancel() -> Self {
        Self::new(ActionKind::Cancel, None, None)
    }

    /// Flattens the event into the engine's `(code, x1, y1, x2, y2)` form.
    pub fn to_wire(&self) -> (i32, f32, f32, f32, f32) {
        let (x1, y1) = flatten(self.pos1);
        let (x2, y2) = flatten(self.pos2);
        (self.kind.code(), x1, y1, x2, y2)
    }
}

fn flatten(pos: Option<ScreenPos>) -> (f32, f32) {
    pos.map_or((NO_COORDINATE, NO_COORDINATE), |p| (p.x, p.y))
}

//=== WheelEvent ==========================================================

/// A single discrete zoom step at a position.
///
/// `delta` is `+1` for zooming in and `-1` for zooming out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub delta: i32,
    pub pos: ScreenPos,
}

impl WheelEvent {
    /// Quantizes a raw scroll distance into a zoom step.
    ///
    /// `scroll_up` is positive when the wheel moves away from the user.
    /// Distances whose magnitude does not exceed `threshold` are dropped, so
    /// high-resolution touchpads don't zoom on jitter.
    pub fn from_scroll(scroll_up: f32, threshold: f32, pos: ScreenPos) -> Option<Self> {
        let delta = if scroll_up > threshold {
            1
        } else if scroll_up < -threshold {
            -1
        } else {
            return None;
        };
        Some(Self { delta, pos })
    }
}

//=== Tests ===============================================================
