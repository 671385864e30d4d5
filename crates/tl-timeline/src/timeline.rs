use std::any::{Any, TypeId};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tl_ecs::World;
use tl_signal::{Store, Subscription};
use tracing::debug;

use crate::chunk::compute_chunk;
use crate::error::TimelineError;
use crate::host::ViewportHost;
use crate::module::TimelineModule;
use crate::state::TimelineState;
use crate::viewport::{Viewport, ViewportOptions};

/// Construction options for a [`Timeline`].
///
/// `min_visible_range` and `max_visible_range` bound the zoom axis and have
/// no defaults. Everything else can be left at `Default` via struct update
/// syntax on [`TimelineOptions::new`].
#[derive(Debug, Clone, Copy)]
pub struct TimelineOptions {
    pub current_position: f64,
    pub header_offset_px: f64,
    /// Initial visible range; defaults to `max_visible_range`.
    pub visible_range: Option<f64>,
    pub min_visible_range: f64,
    pub max_visible_range: f64,
    /// Chunk width as a multiple of viewport widths. Minimum 2: one width
    /// on screen, at least one materialized ahead of it.
    pub chunk_size: f64,
}

impl TimelineOptions {
    pub fn new(min_visible_range: f64, max_visible_range: f64) -> Self {
        Self {
            current_position: 0.0,
            header_offset_px: 0.0,
            visible_range: None,
            min_visible_range,
            max_visible_range,
            chunk_size: 2.0,
        }
    }

    pub(crate) fn effective_chunk_size(&self) -> f64 {
        self.chunk_size.max(2.0)
    }
}

/// The unit span currently visible, as axis positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub start: f64,
    pub end: f64,
}

struct RegisteredModule {
    type_id: TypeId,
    name: &'static str,
    module: Arc<dyn TimelineModule>,
    as_any: Arc<dyn Any + Send + Sync>,
}

struct TimelineInner {
    options: TimelineOptions,
    store: Store<TimelineState>,
    viewport: Viewport,
    world: Arc<World>,
    modules: Mutex<Vec<RegisteredModule>>,
    _viewport_sub: Subscription,
}

/// Single source of truth for position, viewport and chunk state.
///
/// Composes the position store, the [`Viewport`], an ECS [`World`] for
/// timeline entities, and a registry of [`TimelineModule`]s keyed by module
/// type. Handles are cheap clones of one shared instance.
#[derive(Clone)]
pub struct Timeline {
    inner: Arc<TimelineInner>,
}

/// Non-owning handle used by modules to reach back into their timeline
/// without keeping it alive.
#[derive(Clone)]
pub struct WeakTimeline {
    inner: Weak<TimelineInner>,
}

impl WeakTimeline {
    pub fn upgrade(&self) -> Option<Timeline> {
        self.inner.upgrade().map(|inner| Timeline { inner })
    }
}

impl Timeline {
    pub fn new(options: TimelineOptions) -> Self {
        let store = Store::new(TimelineState {
            current: options.current_position.max(0.0),
            ..TimelineState::default()
        });

        let viewport = Viewport::new(ViewportOptions {
            visible_range: options.visible_range.unwrap_or(options.max_visible_range),
            header_offset_px: options.header_offset_px,
            min_visible_range: options.min_visible_range,
            max_visible_range: options.max_visible_range,
        });

        // Every viewport emission re-derives the chunk window against the
        // unchanged current position; resizing never moves the position.
        let chunk_size = options.effective_chunk_size();
        let chunk_store = store.clone();
        let viewport_sub = viewport.subscribe(move |state| {
            let chunk = compute_chunk(
                chunk_store.select(|s| s.current),
                state.px_per_unit,
                (chunk_size - 1.0) * state.width_px,
            );
            let chunk_duration = state.visible_range * chunk_size;
            chunk_store.update(|prev| TimelineState {
                chunk_index: chunk.index,
                chunk_start: chunk.start,
                chunk_duration,
                ..*prev
            });
        });

        Self {
            inner: Arc::new(TimelineInner {
                options,
                store,
                viewport,
                world: Arc::new(World::new()),
                modules: Mutex::new(Vec::new()),
                _viewport_sub: viewport_sub,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakTimeline {
        WeakTimeline {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /* -------------------- state access -------------------- */

    pub fn options(&self) -> &TimelineOptions {
        &self.inner.options
    }

    pub fn store(&self) -> Store<TimelineState> {
        self.inner.store.clone()
    }

    pub fn select<S>(&self, selector: impl FnOnce(&TimelineState) -> S) -> S {
        self.inner.store.select(selector)
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&TimelineState) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.store.subscribe(listener)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.inner.viewport
    }

    pub fn world(&self) -> &Arc<World> {
        &self.inner.world
    }

    /* -------------------- module registry -------------------- */

    /// Registers a module and attaches it. Registering the same type twice
    /// creates two live attachments; the registry resolves to the first.
    pub fn register_module<M: TimelineModule>(&self, module: Arc<M>) {
        module.detach();
        module.attach(self);
        let name = std::any::type_name::<M>();
        debug!(module = name, "registered module");
        self.inner.modules.lock().push(RegisteredModule {
            type_id: TypeId::of::<M>(),
            name,
            module: module.clone(),
            as_any: module,
        });
    }

    /// Resolves a registered module by type.
    pub fn module<M: TimelineModule>(&self) -> Result<Arc<M>, TimelineError> {
        let target = TypeId::of::<M>();
        self.inner
            .modules
            .lock()
            .iter()
            .find(|registered| registered.type_id == target)
            .and_then(|registered| registered.as_any.clone().downcast::<M>().ok())
            .ok_or_else(|| TimelineError::ModuleNotFound(std::any::type_name::<M>()))
    }

    /// Detaches every module in registration order and clears the registry.
    /// The viewport connection is left to the caller.
    pub fn destroy(&self) {
        let modules = std::mem::take(&mut *self.inner.modules.lock());
        for registered in &modules {
            debug!(module = registered.name, "detaching module");
            registered.module.detach();
        }
    }

    /* -------------------- viewport lifecycle -------------------- */

    pub fn connect(&self, host: Arc<dyn ViewportHost>) {
        self.inner.viewport.connect(host);
    }

    pub fn disconnect(&self) {
        self.inner.viewport.disconnect();
    }

    /* -------------------- operations -------------------- */

    /// Moves the current position, re-deriving the chunk window.
    ///
    /// The position is floored and clamped to `>= 0`. The chunk span is
    /// `(chunk_size - 1)` viewport widths: the deliberate shrink allocates a
    /// new chunk before the visible window can reach the trailing edge of
    /// the materialized one.
    pub fn set_current_position(&self, position: f64) {
        let normalized = position.floor().max(0.0);
        let chunk = compute_chunk(
            normalized,
            self.inner.viewport.select(|s| s.px_per_unit),
            (self.inner.options.effective_chunk_size() - 1.0) * self.inner.viewport.width_px(),
        );
        self.inner.store.update(|prev| TimelineState {
            current: normalized,
            chunk_index: chunk.index,
            chunk_start: chunk.start,
            ..*prev
        });
    }

    /// Zooms via a normalized slider: 0 maps to `max_visible_range`, 1 to
    /// `min_visible_range`. The point under `center_px` stays visually
    /// fixed; pass 0 to pin the left edge.
    pub fn set_zoom(&self, value: f64, center_px: f64) {
        let value = value.clamp(0.0, 1.0);
        let min = self.inner.viewport.min_visible_range();
        let max = self.inner.viewport.max_visible_range();
        let width_px = self.inner.viewport.width_px();
        let current = self.select(|s| s.current);

        let center_px = center_px.min(width_px);
        let new_visible_range = max - value * (max - min);
        let delta_range = new_visible_range - self.inner.viewport.visible_range();
        let center_delta = if width_px > 0.0 { center_px / width_px } else { 0.0 };

        self.inner.viewport.set_visible_range(new_visible_range);
        self.set_current_position(current - delta_range * center_delta);
    }

    /// Normalized zoom, the inverse of [`set_zoom`](Self::set_zoom).
    pub fn zoom_level(&self) -> f64 {
        let min = self.inner.viewport.min_visible_range();
        let max = self.inner.viewport.max_visible_range();
        (max - self.inner.viewport.visible_range()) / (max - min)
    }

    pub fn pan_by_units(&self, delta_units: f64) {
        let current = self.select(|s| s.current);
        self.set_current_position(current + delta_units);
    }

    pub fn pan_by_px(&self, delta_px: f64) {
        self.pan_by_units(self.px_to_unit(delta_px));
    }

    /* -------------------- projections -------------------- */

    /// Projects a unit to pixel space within the current chunk. Returns 0
    /// while no viewport is connected.
    pub fn project_to_chunk(&self, unit: f64) -> f64 {
        if !self.inner.viewport.is_connected() {
            return 0.0;
        }
        let px_per_unit = self.inner.viewport.select(|s| s.px_per_unit);
        let chunk_start = self.select(|s| s.chunk_start);
        (unit - chunk_start) * px_per_unit
    }

    /// Inverse of [`project_to_chunk`](Self::project_to_chunk): a pixel
    /// position within the chunk back to a unit.
    pub fn project_to_unit(&self, px: f64) -> f64 {
        if !self.inner.viewport.is_connected() {
            return 0.0;
        }
        let px_per_unit = self.inner.viewport.select(|s| s.px_per_unit);
        let chunk_start = self.select(|s| s.chunk_start);
        chunk_start + px / px_per_unit
    }

    pub fn unit_to_px(&self, unit: f64) -> f64 {
        unit * self.inner.viewport.select(|s| s.px_per_unit)
    }

    /// Pixels to units; 0 while the viewport is unmeasured.
    pub fn px_to_unit(&self, px: f64) -> f64 {
        let px_per_unit = self.inner.viewport.select(|s| s.px_per_unit);
        if px_per_unit <= 0.0 {
            return 0.0;
        }
        px / px_per_unit
    }

    /* -------------------- derived geometry -------------------- */

    /// Pixel translation of the viewport inside the current chunk.
    pub fn translate_px(&self) -> f64 {
        let current = self.select(|s| s.current);
        self.project_to_chunk(current)
    }

    /// Full chunk width in pixels (`chunk_size` viewport widths).
    pub fn chunk_width_px(&self) -> f64 {
        self.inner.options.effective_chunk_size() * self.inner.viewport.width_px()
    }

    /// Units covered by one chunk.
    pub fn chunk_range(&self) -> f64 {
        self.select(|s| s.chunk_duration)
    }

    /// The visible unit span, `[current, current + visible_range)`.
    pub fn bounds(&self) -> Bounds {
        let current = self.select(|s| s.current);
        let visible_range = self.inner.viewport.visible_range();
        Bounds {
            start: current,
            end: current + visible_range,
        }
    }

    pub fn visible_range(&self) -> f64 {
        self.inner.viewport.visible_range()
    }

    /// Sets the visible range, clamped to the configured min/max.
    pub fn set_visible_range(&self, visible_range: f64) {
        let clamped = visible_range.clamp(
            self.inner.viewport.min_visible_range(),
            self.inner.viewport.max_visible_range(),
        );
        self.inner.viewport.set_visible_range(clamped);
    }
}
