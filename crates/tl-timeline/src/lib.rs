//! Timeline orchestration: chunked coordinate mapping, viewport state and
//! pluggable modules
//!
//! The [`Timeline`] maps an unbounded unit axis onto a finite pixel
//! viewport through a sliding chunk window. It owns the position store, a
//! [`Viewport`] fed by a [`ViewportHost`], an ECS world for timeline
//! entities, and a typed registry of [`TimelineModule`]s (ruler, minimap,
//! playhead, drag panning).

mod chunk;
mod components;
mod entities;
mod error;
mod host;
mod module;
mod modules;
mod state;
mod systems;
mod timeline;
mod viewport;

pub use chunk::{compute_chunk, Chunk};
pub use components::{Playable, PlayheadTag, UnitPosition, ViewportPosition};
pub use entities::create_playhead;
pub use error::TimelineError;
pub use host::{
    FrameHandle, FrameScheduler, PointerButton, PointerCallback, PointerEvent, PointerPhase,
    ResizeCallback, ViewportHost,
};
pub use module::TimelineModule;
pub use modules::{
    MinimapModule, MinimapOptions, MinimapState, PlayheadModule, PlayheadOptions, PlayheadState,
    RulerModule, RulerOptions, RulerState, Side, TotalRange, ViewportDragModule, ViewportDragState,
};
pub use state::TimelineState;
pub use systems::viewport_projection_system;
pub use timeline::{Bounds, Timeline, TimelineOptions, WeakTimeline};
pub use viewport::{Viewport, ViewportOptions, ViewportState};
