//=========================================================================
// Input Dispatcher
//=========================================================================
//
// Two-slot pointer tracker that turns platform pointer events into the
// engine's action stream.
//
// Slot layout:
// ```text
//   slots[0]  first live pointer  → pos1 of every action
//   slots[1]  second live pointer → pos2 of every action
// ```
//
// Invariants:
// - At most two pointers are tracked; a third is ignored outright.
// - slots[1] is only occupied while slots[0] is. Releasing the first
//   pointer promotes the second one into slot 0.
// - Every accepted event yields exactly one action. Events for ids that
//   are not tracked change nothing and yield nothing.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::trace;

//=== Internal Dependencies ===============================================

use super::action::{ActionEvent, ActionKind, ScreenPos};

//=== PointerSlot =========================================================

/// Platform-assigned pointer identifier (touch id, mouse id, ...).
pub type PointerId = u64;

/// Maximum number of simultaneously tracked pointers.
pub const MAX_POINTERS: usize = 2;

/// A tracked pointer and its last known position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSlot {
    pub id: PointerId,
    pub pos: ScreenPos,
}

//=== InputDispatcher =====================================================

/// Tracks up to [`MAX_POINTERS`] pointers and emits normalized actions.
#[derive(Debug, Default)]
pub struct InputDispatcher {
    slots: [Option<PointerSlot>; MAX_POINTERS],
}

impl InputDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    //--- Events -----------------------------------------------------------

    /// A pointer touched down.
    ///
    /// A repeated down for an id that is already tracked replaces the stale
    /// entry. Returns `None` when both slots are taken.
    pub fn on_down(&mut self, id: PointerId, x: f32, y: f32) -> Option<ActionEvent> {
        if let Some(index) = self.slot_of(id) {
            trace!(target: "mapview::input", "Dropping stale pointer {} from slot {}", id, index);
            self.vacate(index);
        }

        let pos = ScreenPos::new(x, y);
        match self.slots {
            [None, _] => {
                self.slots[0] = Some(PointerSlot { id, pos });
                Some(ActionEvent::new(ActionKind::Pointer1Down, Some(pos), None))
            }
            [Some(first), None] => {
                self.slots[1] = Some(PointerSlot { id, pos });
                Some(ActionEvent::new(ActionKind::Pointer2Down, Some(first.pos), Some(pos)))
            }
            [Some(_), Some(_)] => {
                trace!(target: "mapview::input", "Ignoring pointer {}: both slots occupied", id);
                None
            }
        }
    }

    /// A tracked pointer moved.
    pub fn on_move(&mut self, id: PointerId, x: f32, y: f32) -> Option<ActionEvent> {
        let index = self.slot_of(id)?;
        if let Some(slot) = self.slots[index].as_mut() {
            slot.pos = ScreenPos::new(x, y);
        }
        Some(ActionEvent::new(
            ActionKind::Move,
            self.position(0),
            self.position(1),
        ))
    }

    /// A tracked pointer lifted.
    pub fn on_up(&mut self, id: PointerId, x: f32, y: f32) -> Option<ActionEvent> {
        let index = self.slot_of(id)?;
        let pos = ScreenPos::new(x, y);

        let action = if index == 0 {
            ActionEvent::new(ActionKind::Pointer1Up, Some(pos), self.position(1))
        } else {
            ActionEvent::new(ActionKind::Pointer2Up, self.position(0), Some(pos))
        };

        self.vacate(index);
        Some(action)
    }

    /// The gesture was cancelled by the platform. Always yields an action.
    pub fn on_cancel(&mut self) -> ActionEvent {
        self.reset();
        ActionEvent::cancel()
    }

    /// Forgets every tracked pointer without emitting anything.
    pub fn reset(&mut self) {
        self.slots = [None; MAX_POINTERS];
    }

    //--- Queries ----------------------------------------------------------

    /// Number of live pointers.
    pub fn pointer_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// The pointer occupying `index`, if any.
    pub fn slot(&self, index: usize) -> Option<PointerSlot> {
        self.slots.get(index).copied().flatten()
    }

    pub fn is_tracking(&self, id: PointerId) -> bool {
        self.slot_of(id).is_some()
    }

    //--- Internal ---------------------------------------------------------

    fn slot_of(&self, id: PointerId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.is_some_and(|s| s.id == id))
    }

    fn position(&self, index: usize) -> Option<ScreenPos> {
        self.slot(index).map(|s| s.pos)
    }

    /// Clears `index`, promoting slot 1 into slot 0 when the first slot
    /// is vacated.
    fn vacate(&mut self, index: usize) {
        if index == 0 {
            self.slots[0] = self.slots[1].take();
        } else {
            self.slots[index] = None;
        }
    }
}

//=== Tests ===============================================================

#[cfg(test)]
mod tests {
    use super::*;

    //--- Test Helpers -----------------------------------------------------

    fn pos(x: f32, y: f32) -> Option<ScreenPos> {
        Some(ScreenPos::new(x, y))
    }

    fn action(kind: ActionKind, p1: Option<ScreenPos>, p2: Option<ScreenPos>) -> Option<ActionEvent> {
        Some(ActionEvent::new(kind, p1, p2))
    }

    //=====================================================================
    // Single Pointer
    //=====================================================================

    #[test]
    fn single_pointer_down_move_up() {
        let mut input = InputDispatcher::new();

        assert_eq!(
            input.on_down(7, 1.0, 2.0),
            action(ActionKind::Pointer1Down, pos(1.0, 2.0), None)
        );
        assert_eq!(
            input.on_move(7, 3.0, 4.0),
            action(ActionKind::Move, pos(3.0, 4.0), None)
        );
        assert_eq!(
            input.on_up(7, 5.0, 6.0),
            action(ActionKind::Pointer1Up, pos(5.0, 6.0), None)
        );
        assert_eq!(input.pointer_count(), 0);
    }

    #[test]
    fn untracked_ids_are_ignored() {
        let mut input = InputDispatcher::new();
        assert_eq!(input.on_move(1, 0.0, 0.0), None);
        assert_eq!(input.on_up(1, 0.0, 0.0), None);

        input.on_down(1, 0.0, 0.0);
        assert_eq!(input.on_move(99, 5.0, 5.0), None);
        assert_eq!(input.on_up(99, 5.0, 5.0), None);
        assert_eq!(input.slot(0).map(|s| s.pos), pos(0.0, 0.0), "State must be untouched");
    }

    #[test]
    fn repeated_down_replaces_stale_entry() {
        let mut input = InputDispatcher::new();
        input.on_down(1, 0.0, 0.0);

        let again = input.on_down(1, 8.0, 9.0);

        assert_eq!(again, action(ActionKind::Pointer1Down, pos(8.0, 9.0), None));
        assert_eq!(input.pointer_count(), 1);
    }

    //=====================================================================
    // Two Pointers
    //=====================================================================

    #[test]
    fn first_pointer_up_promotes_second() {
        let mut input = InputDispatcher::new();

        assert_eq!(
            input.on_down(1, 10.0, 10.0),
            action(ActionKind::Pointer1Down, pos(10.0, 10.0), None)
        );
        assert_eq!(
            input.on_down(2, 20.0, 20.0),
            action(ActionKind::Pointer2Down, pos(10.0, 10.0), pos(20.0, 20.0))
        );

        let up = input.on_up(1, 20.0, 20.0).expect("pointer 1 is tracked");
        assert_eq!(up.kind, ActionKind::Pointer1Up);
        assert_eq!(up.pos1, pos(20.0, 20.0));
        assert_eq!(up.pos2, pos(20.0, 20.0), "Remaining pointer reported as pos2");

        assert_eq!(input.slot(0).map(|s| s.id), Some(2), "Pointer 2 promoted");
        assert_eq!(input.slot(1), None);
        assert_eq!(
            input.on_move(2, 30.0, 30.0),
            action(ActionKind::Move, pos(30.0, 30.0), None)
        );
    }

    #[test]
    fn second_pointer_up_reports_first_position() {
        let mut input = InputDispatcher::new();
        input.on_down(1, 1.0, 1.0);
        input.on_down(2, 2.0, 2.0);

        assert_eq!(
            input.on_up(2, 3.0, 3.0),
            action(ActionKind::Pointer2Up, pos(1.0, 1.0), pos(3.0, 3.0))
        );
        assert_eq!(input.slot(0).map(|s| s.id), Some(1));
    }

    #[test]
    fn move_reports_both_live_positions() {
        let mut input = InputDispatcher::new();
        input.on_down(1, 1.0, 1.0);
        input.on_down(2, 2.0, 2.0);

        assert_eq!(
            input.on_move(2, 5.0, 6.0),
            action(ActionKind::Move, pos(1.0, 1.0), pos(5.0, 6.0))
        );
        assert_eq!(
            input.on_move(1, 7.0, 8.0),
            action(ActionKind::Move, pos(7.0, 8.0), pos(5.0, 6.0))
        );
    }

    #[test]
    fn third_pointer_is_ignored() {
        let mut input = InputDispatcher::new();
        input.on_down(1, 1.0, 1.0);
        input.on_down(2, 2.0, 2.0);

        assert_eq!(input.on_down(3, 3.0, 3.0), None);
        assert_eq!(input.pointer_count(), 2);
        assert!(!input.is_tracking(3));
        assert_eq!(input.on_move(3, 4.0, 4.0), None, "Ignored pointer stays untracked");
    }

    #[test]
    fn stale_first_pointer_down_keeps_slots_compact() {
        let mut input = InputDispatcher::new();
        input.on_down(1, 1.0, 1.0);
        input.on_down(2, 2.0, 2.0);

        // Pointer 1 reported down again without an up in between.
        assert_eq!(
            input.on_down(1, 9.0, 9.0),
            action(ActionKind::Pointer2Down, pos(2.0, 2.0), pos(9.0, 9.0))
        );
        assert_eq!(input.slot(0).map(|s| s.id), Some(2));
        assert_eq!(input.slot(1).map(|s| s.id), Some(1));
    }

    //=====================================================================
    // Cancel
    //=====================================================================

    #[test]
    fn cancel_clears_everything() {
        let mut input = InputDispatcher::new();
        input.on_down(1, 1.0, 1.0);
        input.on_down(2, 2.0, 2.0);

        assert_eq!(input.on_cancel(), ActionEvent::cancel());
        assert_eq!(input.pointer_count(), 0);
        assert_eq!(input.on_move(1, 0.0, 0.0), None);
    }

    #[test]
    fn cancel_without_pointers_still_emits() {
        let mut input = InputDispatcher::new();
        assert_eq!(input.on_cancel().kind, ActionKind::Cancel);
    }

    //=====================================================================
    // Sequences
    //=====================================================================

    /// Every accepted event yields one action whose positions come only
    /// from live slots.
    #[test]
    fn interleaved_sequence_uses_live_slots_only() {
        let mut input = InputDispatcher::new();
        let mut emitted = Vec::new();

        emitted.extend(input.on_down(10, 0.0, 0.0));
        emitted.extend(input.on_down(11, 1.0, 1.0));
        emitted.extend(input.on_up(11, 1.5, 1.5));
        emitted.extend(input.on_move(10, 2.0, 2.0));
        emitted.extend(input.on_down(12, 3.0, 3.0));
        emitted.extend(input.on_up(10, 4.0, 4.0));
        emitted.extend(input.on_move(12, 5.0, 5.0));
        emitted.extend(input.on_up(12, 6.0, 6.0));

        let kinds: Vec<_> = emitted.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::Pointer1Down,
                ActionKind::Pointer2Down,
                ActionKind::Pointer2Up,
                ActionKind::Move,
                ActionKind::Pointer2Down,
                ActionKind::Pointer1Up,
                ActionKind::Move,
                ActionKind::Pointer1Up,
            ]
        );
        assert_eq!(emitted[6].pos1, pos(5.0, 5.0));
        assert_eq!(emitted[6].pos2, None);
        assert_eq!(input.pointer_count(), 0);
    }
}
