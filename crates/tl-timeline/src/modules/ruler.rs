use parking_lot::Mutex;
use tl_signal::{Store, Subscription};

use crate::module::TimelineModule;
use crate::{Timeline, WeakTimeline};

/// Tick layout for the current chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct RulerState {
    /// Selected tick interval in units; -1 before the first recompute.
    pub interval: f64,
    /// Tick unit-positions within `[chunk_start, chunk_start + chunk_range)`.
    pub ticks: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct RulerOptions {
    /// Minimum pixel distance between ticks; keeps the ruler readable at
    /// any zoom.
    pub min_tick_interval_px: f64,
}

impl Default for RulerOptions {
    fn default() -> Self {
        Self {
            min_tick_interval_px: 100.0,
        }
    }
}

/// Computes tick marks for the timeline ruler.
///
/// On every timeline or viewport emission, picks the smallest "nice"
/// duration whose on-screen width clears the configured minimum, then lays
/// ticks at multiples of it across the current chunk.
pub struct RulerModule {
    options: RulerOptions,
    store: Store<RulerState>,
    timeline: Mutex<Option<WeakTimeline>>,
    subs: Mutex<Vec<Subscription>>,
}

impl RulerModule {
    pub fn new(options: RulerOptions) -> Self {
        Self {
            options,
            store: Store::new(RulerState {
                interval: -1.0,
                ticks: Vec::new(),
            }),
            timeline: Mutex::new(None),
            subs: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> Store<RulerState> {
        self.store.clone()
    }

    pub fn state(&self) -> RulerState {
        self.store.get()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&RulerState) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.subscribe(listener)
    }
}

impl TimelineModule for RulerModule {
    fn attach(&self, timeline: &Timeline) {
        let weak = timeline.downgrade();
        *self.timeline.lock() = Some(weak.clone());

        let min_px = self.options.min_tick_interval_px;
        let mut subs = self.subs.lock();
        let (store, weak_a) = (self.store.clone(), weak.clone());
        subs.push(timeline.subscribe(move |_| recompute(&weak_a, &store, min_px)));
        let store = self.store.clone();
        subs.push(
            timeline
                .viewport()
                .subscribe(move |_| recompute(&weak, &store, min_px)),
        );
    }

    fn detach(&self) {
        self.subs.lock().clear();
        *self.timeline.lock() = None;
    }
}

fn recompute(weak: &WeakTimeline, store: &Store<RulerState>, min_tick_interval_px: f64) {
    let Some(timeline) = weak.upgrade() else {
        return;
    };

    let start = timeline.select(|s| s.chunk_start);
    let end = start + timeline.chunk_range();
    let interval = tick_interval(|unit| timeline.unit_to_px(unit), min_tick_interval_px);

    store.set(RulerState {
        interval,
        ticks: compute_ticks(start, end, interval),
    });
}

/// The ascending ladder of "nice" durations, in milliseconds: sub-second
/// steps, then second/minute/hour/day/week/month/year multiples.
fn available_durations() -> impl Iterator<Item = f64> {
    const SECOND: f64 = 1_000.0;
    const MINUTE: f64 = 60.0 * SECOND;
    const HOUR: f64 = 60.0 * MINUTE;
    const DAY: f64 = 24.0 * HOUR;

    let sub_second = [100.0, 500.0].into_iter();
    let seconds = [1.0, 2.0, 5.0, 10.0, 15.0, 20.0, 30.0]
        .into_iter()
        .map(|n| n * SECOND);
    let minutes = [1.0, 2.0, 5.0, 10.0, 15.0, 20.0, 30.0]
        .into_iter()
        .map(|n| n * MINUTE);
    let hours = [1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 12.0]
        .into_iter()
        .map(|n| n * HOUR);
    let days = (1..=7).map(|n| n as f64 * DAY);
    let weeks = (1..=5).map(|n| n as f64 * 7.0 * DAY);
    let months = (1..=5).map(|n| n as f64 * 30.0 * DAY);
    let years = (1..=5).map(|n| n as f64 * 365.0 * DAY);

    sub_second
        .chain(seconds)
        .chain(minutes)
        .chain(hours)
        .chain(days)
        .chain(weeks)
        .chain(months)
        .chain(years)
}

/// Smallest ladder duration whose pixel width clears `expected_width_px`,
/// or 0 when even a 5-year span is too narrow.
fn tick_interval(unit_to_px: impl Fn(f64) -> f64, expected_width_px: f64) -> f64 {
    available_durations()
        .find(|&duration| unit_to_px(duration) >= expected_width_px)
        .unwrap_or(0.0)
}

fn compute_ticks(start: f64, end: f64, interval: f64) -> Vec<f64> {
    if interval <= 0.0 {
        return Vec::new();
    }
    let mut ticks = Vec::new();
    let mut tick = (start / interval).ceil() * interval;
    while tick < end {
        ticks.push(tick);
        tick += interval;
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_is_strictly_ascending() {
        let durations: Vec<f64> = available_durations().collect();
        assert!(durations.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(durations[0], 100.0);
    }

    #[test]
    fn interval_picks_smallest_wide_enough_duration() {
        // 0.025 px/unit: 4000 units reach 100px, first ladder entry above
        // that is 5 seconds.
        let interval = tick_interval(|unit| unit * 0.025, 100.0);
        assert_eq!(interval, 5_000.0);
    }

    #[test]
    fn interval_is_zero_when_ladder_is_exhausted() {
        assert_eq!(tick_interval(|_| 0.0, 100.0), 0.0);
    }

    #[test]
    fn ticks_start_at_first_multiple_at_or_after_start() {
        assert_eq!(
            compute_ticks(0.0, 40_000.0, 5_000.0),
            vec![0.0, 5_000.0, 10_000.0, 15_000.0, 20_000.0, 25_000.0, 30_000.0, 35_000.0]
        );
        assert_eq!(compute_ticks(1.0, 15_000.0, 5_000.0), vec![5_000.0, 10_000.0]);
    }

    #[test]
    fn zero_interval_yields_no_ticks() {
        assert!(compute_ticks(0.0, 1_000.0, 0.0).is_empty());
    }
}
