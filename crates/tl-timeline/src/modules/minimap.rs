use std::sync::Arc;

use parking_lot::Mutex;
use tl_signal::{Store, Subscription};

use crate::module::TimelineModule;
use crate::{Timeline, WeakTimeline};

/// Minimap window as ratios of its total range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapState {
    /// Total unit span the minimap represents.
    pub total_range: f64,
    /// Visible window start as a 0..1 ratio of `total_range`.
    pub visible_start_ratio: f64,
    /// Visible window size as a 0..1 ratio of `total_range`.
    pub visible_size_ratio: f64,
    /// Explicit overflow past `total_range`, when the range callback
    /// reports one.
    pub overflow_amount: Option<f64>,
}

/// Total range reported by a [`MinimapOptions::compute_total_range`]
/// callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TotalRange {
    pub range: f64,
    pub overflow: Option<f64>,
}

impl TotalRange {
    pub fn fixed(range: f64) -> Self {
        Self {
            range,
            overflow: None,
        }
    }
}

type ComputeTotalRange = Arc<dyn Fn(&Timeline) -> TotalRange + Send + Sync>;

#[derive(Clone, Default)]
pub struct MinimapOptions {
    /// Defaults to 10000 units when unset.
    pub initial_total_range: Option<f64>,
    /// Recomputed on every timeline state change; enables minimaps whose
    /// total range grows as the user scrolls past the current bound.
    pub compute_total_range: Option<ComputeTotalRange>,
}

/// A ratio-space view and controller over the timeline's own state.
///
/// The minimap never stores a position of its own: ratio edits translate
/// straight into [`Timeline::set_current_position`] /
/// [`Timeline::set_visible_range`] calls, and the ratios are re-derived
/// from timeline state on every emission.
pub struct MinimapModule {
    options: MinimapOptions,
    store: Store<MinimapState>,
    timeline: Mutex<Option<WeakTimeline>>,
    sub: Mutex<Option<Subscription>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl MinimapModule {
    pub fn new(options: MinimapOptions) -> Self {
        let store = Store::new(MinimapState {
            total_range: options.initial_total_range.unwrap_or(10_000.0),
            visible_start_ratio: 0.0,
            visible_size_ratio: 0.0,
            overflow_amount: None,
        });
        Self {
            options,
            store,
            timeline: Mutex::new(None),
            sub: Mutex::new(None),
        }
    }

    pub fn store(&self) -> Store<MinimapState> {
        self.store.clone()
    }

    pub fn state(&self) -> MinimapState {
        self.store.get()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&MinimapState) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.subscribe(listener)
    }

    fn upgrade(&self) -> Option<Timeline> {
        self.timeline.lock().as_ref().and_then(WeakTimeline::upgrade)
    }

    pub fn set_total_range(&self, total_range: f64) {
        self.store.update(|prev| MinimapState {
            total_range,
            ..*prev
        });
        let weak = self.timeline.lock().clone();
        if let Some(weak) = weak {
            recompute(&weak, &self.store);
        }
    }

    pub fn set_overflow_amount(&self, overflow_amount: Option<f64>) {
        self.store.update(|prev| MinimapState {
            overflow_amount,
            ..*prev
        });
    }

    /// Moves the window's left edge to `ratio`, clamped so the window stays
    /// inside `[0, 1]`.
    pub fn set_visible_start_ratio(&self, ratio: f64) {
        let Some(timeline) = self.upgrade() else {
            return;
        };
        let state = self.store.get();
        let normalized = ratio.clamp(0.0, (1.0 - state.visible_size_ratio).max(0.0));
        timeline.set_current_position(state.total_range * normalized);
    }

    /// Resizes the window to `ratio` of the total range, clamped to `[0, 1]`.
    pub fn set_visible_size_ratio(&self, ratio: f64) {
        let Some(timeline) = self.upgrade() else {
            return;
        };
        let total_range = self.store.select(|s| s.total_range);
        timeline.set_visible_range(total_range * ratio.clamp(0.0, 1.0));
    }

    /// Centers the window on `left_delta`, keeping the center inside the
    /// reachable part of the track.
    pub fn move_center_to(&self, left_delta: f64) {
        let Some(timeline) = self.upgrade() else {
            return;
        };
        let state = self.store.get();
        let half = state.visible_size_ratio / 2.0;
        let normalized = left_delta.clamp(half, 1.0 - half);
        let overflow = state.overflow_amount.unwrap_or(0.0);
        let visible_range = timeline.visible_range();
        timeline
            .set_current_position((state.total_range - overflow) * normalized - visible_range / 2.0);
    }

    /// Grows or shrinks the window from one edge, keeping the size within
    /// the ratios derived from the timeline's min/max visible range and the
    /// window inside `[0, 1]`.
    pub fn extend_visible_range(&self, delta: f64, side: Side) {
        let Some(timeline) = self.upgrade() else {
            return;
        };
        let state = self.store.get();

        match side {
            Side::Right => {
                self.set_visible_size_ratio(
                    (state.visible_size_ratio + delta).min(1.0 - state.visible_start_ratio),
                );
            }
            Side::Left => {
                let new_size = (state.visible_size_ratio + delta)
                    .min(self.max_size_ratio())
                    .max(self.min_size_ratio());
                let new_start = (state.visible_start_ratio - delta).max(0.0);
                let clamped_start = new_start.clamp(0.0, (1.0 - new_size).max(0.0));
                timeline.set_current_position(state.total_range * clamped_start);
                timeline.set_visible_range(state.total_range * new_size);
            }
        }
    }

    pub fn is_overflowing(&self) -> bool {
        let Some(timeline) = self.upgrade() else {
            return false;
        };
        let state = self.store.get();
        match state.overflow_amount {
            Some(amount) => amount > 0.0,
            None => timeline.bounds().end > state.total_range,
        }
    }

    pub fn overflow_amount(&self) -> f64 {
        let Some(timeline) = self.upgrade() else {
            return 0.0;
        };
        let state = self.store.get();
        state
            .overflow_amount
            .unwrap_or_else(|| (timeline.bounds().end - state.total_range).max(0.0))
    }

    /// Smallest allowed window size, from the timeline's minimum visible
    /// range.
    pub fn min_size_ratio(&self) -> f64 {
        let Some(timeline) = self.upgrade() else {
            return 0.0;
        };
        timeline.options().min_visible_range / self.store.select(|s| s.total_range)
    }

    /// Largest allowed window size, from the timeline's maximum visible
    /// range.
    pub fn max_size_ratio(&self) -> f64 {
        let Some(timeline) = self.upgrade() else {
            return 1.0;
        };
        timeline.options().max_visible_range / self.store.select(|s| s.total_range)
    }
}

impl TimelineModule for MinimapModule {
    fn attach(&self, timeline: &Timeline) {
        let weak = timeline.downgrade();
        *self.timeline.lock() = Some(weak.clone());

        let store = self.store.clone();
        let compute_total_range = self.options.compute_total_range.clone();
        *self.sub.lock() = Some(timeline.subscribe(move |_| {
            recompute(&weak, &store);
            recompute_total_range(&weak, &store, compute_total_range.as_deref());
        }));
    }

    fn detach(&self) {
        *self.timeline.lock() = None;
        *self.sub.lock() = None;
    }
}

fn recompute(weak: &WeakTimeline, store: &Store<MinimapState>) {
    let Some(timeline) = weak.upgrade() else {
        return;
    };

    let total_range = store.select(|s| s.total_range);
    let current = timeline.select(|s| s.current);
    let visible_range = timeline.visible_range();

    let visible_size_ratio = visible_range / total_range;
    let visible_start_ratio =
        (current / total_range).clamp(0.0, (1.0 - visible_size_ratio).max(0.0));

    store.update(|prev| MinimapState {
        visible_start_ratio,
        visible_size_ratio,
        ..*prev
    });
}

fn recompute_total_range(
    weak: &WeakTimeline,
    store: &Store<MinimapState>,
    compute: Option<&(dyn Fn(&Timeline) -> TotalRange + Send + Sync)>,
) {
    let (Some(timeline), Some(compute)) = (weak.upgrade(), compute) else {
        return;
    };

    let TotalRange { range, overflow } = compute(&timeline);
    store.update(|prev| MinimapState {
        total_range: range,
        overflow_amount: overflow,
        ..*prev
    });
    recompute(weak, store);
}
