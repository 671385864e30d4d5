use std::sync::Arc;

use parking_lot::Mutex;
use tl_signal::{Store, Subscription};
use tracing::trace;

use crate::host::{FrameHandle, FrameScheduler};
use crate::module::TimelineModule;
use crate::{Timeline, WeakTimeline};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayheadState {
    /// Playhead position in units, never negative.
    pub position: f64,
    pub is_playing: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayheadOptions {
    pub initial_position: f64,
}

type FrameSlot = Arc<Mutex<Option<FrameHandle>>>;
type TimelineSlot = Arc<Mutex<Option<WeakTimeline>>>;

/// Drives the playhead position, including frame-by-frame playback.
///
/// Playback is a cooperative tick loop on the host's [`FrameScheduler`]:
/// each frame advances the position by a fixed delta and reschedules, until
/// [`pause`](Self::pause) cancels the pending frame. [`play`](Self::play)
/// while already playing is a no-op.
pub struct PlayheadModule {
    scheduler: Arc<dyn FrameScheduler>,
    store: Store<PlayheadState>,
    frame: FrameSlot,
    timeline: TimelineSlot,
}

impl PlayheadModule {
    pub fn new(scheduler: Arc<dyn FrameScheduler>, options: PlayheadOptions) -> Self {
        Self {
            scheduler,
            store: Store::new(PlayheadState {
                position: options.initial_position.max(0.0),
                is_playing: false,
            }),
            frame: Arc::new(Mutex::new(None)),
            timeline: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> Store<PlayheadState> {
        self.store.clone()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&PlayheadState) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.subscribe(listener)
    }

    fn attached(&self) -> bool {
        self.timeline
            .lock()
            .as_ref()
            .and_then(WeakTimeline::upgrade)
            .is_some()
    }

    /// Moves the playhead; clamped to `>= 0`. No-op before attach.
    pub fn set_position(&self, unit: f64) {
        if !self.attached() {
            return;
        }
        trace!(unit, "playhead position");
        self.store.update(|prev| PlayheadState {
            position: unit.max(0.0),
            ..*prev
        });
    }

    /// Current position; 0 before attach.
    pub fn position(&self) -> f64 {
        if !self.attached() {
            return 0.0;
        }
        self.store.select(|s| s.position)
    }

    pub fn move_forward(&self, delta: f64) {
        self.set_position(self.position() + delta);
    }

    pub fn move_backward(&self, delta: f64) {
        self.set_position(self.position() - delta);
    }

    pub fn is_playing(&self) -> bool {
        self.store.select(|s| s.is_playing)
    }

    /// Starts continuous playback, advancing by `delta` units each frame.
    /// Idempotent while a frame is pending.
    pub fn play(&self, delta: f64) {
        if self.frame.lock().is_some() {
            return;
        }
        schedule_step(
            &self.scheduler,
            &self.frame,
            &self.store,
            &self.timeline,
            delta,
        );
        self.set_playing(true);
    }

    /// Cancels the pending frame and stops playback.
    pub fn pause(&self) {
        if let Some(handle) = self.frame.lock().take() {
            self.scheduler.cancel_frame(handle);
        }
        self.set_playing(false);
    }

    fn set_playing(&self, is_playing: bool) {
        if !self.attached() {
            return;
        }
        self.store.update(|prev| PlayheadState {
            is_playing,
            ..*prev
        });
    }
}

fn schedule_step(
    scheduler: &Arc<dyn FrameScheduler>,
    frame: &FrameSlot,
    store: &Store<PlayheadState>,
    timeline: &TimelineSlot,
    delta: f64,
) {
    let callback = {
        let scheduler = scheduler.clone();
        let frame = frame.clone();
        let store = store.clone();
        let timeline = timeline.clone();
        Box::new(move || {
            // Pause may have raced the frame; a cleared slot means stop.
            if frame.lock().is_none() {
                return;
            }
            let attached = timeline
                .lock()
                .as_ref()
                .and_then(WeakTimeline::upgrade)
                .is_some();
            if attached {
                store.update(|prev| PlayheadState {
                    position: (prev.position + delta).max(0.0),
                    ..*prev
                });
            }
            schedule_step(&scheduler, &frame, &store, &timeline, delta);
        })
    };
    let handle = scheduler.request_frame(callback);
    *frame.lock() = Some(handle);
}

impl TimelineModule for PlayheadModule {
    fn attach(&self, timeline: &Timeline) {
        *self.timeline.lock() = Some(timeline.downgrade());
    }

    fn detach(&self) {
        self.pause();
        *self.timeline.lock() = None;
    }
}
