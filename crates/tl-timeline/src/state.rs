/// Position/chunk state owned by the [`crate::Timeline`] store.
///
/// Invariant: `chunk_start <= current < chunk_start + chunk_duration` once a
/// viewport with nonzero width is connected.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimelineState {
    /// Current position on the unit axis.
    pub current: f64,
    /// Index of the chunk containing `current`.
    pub chunk_index: i64,
    /// First unit of the current chunk.
    pub chunk_start: f64,
    /// Units spanned by one chunk (`visible_range * chunk_size`).
    pub chunk_duration: f64,
}
