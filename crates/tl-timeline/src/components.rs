//! Components for timeline entities.

/// Marks an entity as the playhead.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayheadTag;

/// Position on the unit axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPosition {
    pub unit: f64,
    /// Whether the projection system mirrors this into a
    /// [`ViewportPosition`].
    pub projectable: bool,
}

impl Default for UnitPosition {
    fn default() -> Self {
        Self {
            unit: 0.0,
            projectable: true,
        }
    }
}

/// Pixel position within the current chunk, derived from [`UnitPosition`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportPosition {
    pub px: f64,
}

/// Frame-driven playback state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Playable {
    pub is_playing: bool,
}

tl_ecs::components! {
    PlayheadTag => "playhead",
    UnitPosition => "unit-position",
    ViewportPosition => "viewport-position",
    Playable => "playable",
}
