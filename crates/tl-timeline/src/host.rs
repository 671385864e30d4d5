use std::sync::Arc;

use tl_signal::Subscription;

/// Opaque handle for a scheduled frame callback.
pub type FrameHandle = u64;

/// Frame-scheduling primitive supplied by the embedding environment.
///
/// Stands in for the host UI loop's animation-frame facility; tests drive it
/// manually, real hosts forward to their render loop.
pub trait FrameScheduler: Send + Sync {
    /// Schedules `callback` for the next frame.
    fn request_frame(&self, callback: Box<dyn FnOnce() + Send>) -> FrameHandle;

    /// Cancels a pending frame. Unknown or already-fired handles are ignored.
    fn cancel_frame(&self, handle: FrameHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    /// Middle mouse button; starts a viewport drag.
    Auxiliary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

/// A pointer event delivered by the embedding container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub button: PointerButton,
    /// Position relative to the container, in pixels.
    pub x: f64,
    pub y: f64,
    /// Horizontal movement since the previous event.
    pub movement_x: f64,
}

pub type ResizeCallback = Arc<dyn Fn(f64) + Send + Sync>;
pub type PointerCallback = Arc<dyn Fn(&PointerEvent) + Send + Sync>;

/// The container element the timeline is rendered into.
///
/// Abstracts size observation and pointer input of whatever surface hosts
/// the viewport. Implementations push a resize notification whenever the
/// container width changes.
pub trait ViewportHost: Send + Sync {
    /// Current container width in pixels.
    fn width_px(&self) -> f64;

    /// Registers a callback invoked with the new width on every resize.
    fn on_resize(&self, callback: ResizeCallback) -> Subscription;

    /// Registers a callback for pointer events within the container.
    fn on_pointer(&self, callback: PointerCallback) -> Subscription;
}
