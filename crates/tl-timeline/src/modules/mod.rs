mod minimap;
mod playhead;
mod ruler;
mod viewport_drag;

pub use minimap::{MinimapModule, MinimapOptions, MinimapState, Side, TotalRange};
pub use playhead::{PlayheadModule, PlayheadOptions, PlayheadState};
pub use ruler::{RulerModule, RulerOptions, RulerState};
pub use viewport_drag::{ViewportDragModule, ViewportDragState};
