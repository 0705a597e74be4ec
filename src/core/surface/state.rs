//=========================================================================
// Surface State
//=========================================================================

/// Lifecycle state of a view's render surface.
///
/// ```text
///   NoSurface ──create──> Created ──notify──> Active ──present fails──> Lost
///       ^                    │                  │                        │
///       └────────── destroy ─┴──────────────────┴──── destroy/recover ───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SurfaceState {
    #[default]
    NoSurface,
    Created,
    Active,
    Lost,
}

impl SurfaceState {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_transition_to(self, next: SurfaceState) -> bool {
        use SurfaceState::*;
        matches!(
            (self, next),
            (NoSurface, Created)
                | (Created, Active)
                | (Active, Lost)
                | (Created, NoSurface)
                | (Active, NoSurface)
                | (Lost, NoSurface)
        )
    }

    /// Whether a surface handle exists in this state.
    pub fn has_surface(self) -> bool {
        !matches!(self, SurfaceState::NoSurface)
    }
}
