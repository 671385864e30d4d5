use std::sync::Arc;

use parking_lot::Mutex;
use tl_signal::{Store, Subscription};

use crate::host::{PointerButton, PointerEvent, PointerPhase};
use crate::module::TimelineModule;
use crate::Timeline;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportDragState {
    pub is_dragging: bool,
}

/// Middle-button drag panning over the viewport.
///
/// While the auxiliary button is held, every pointer movement pans the
/// timeline by the negated horizontal delta. Pointer wiring follows the
/// viewport's connection state: connecting the viewport hooks the host,
/// disconnecting (or detaching the module) releases it.
pub struct ViewportDragModule {
    store: Store<ViewportDragState>,
    viewport_sub: Mutex<Option<Subscription>>,
    pointer_sub: Arc<Mutex<Option<Subscription>>>,
}

impl Default for ViewportDragModule {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportDragModule {
    pub fn new() -> Self {
        Self {
            store: Store::new(ViewportDragState { is_dragging: false }),
            viewport_sub: Mutex::new(None),
            pointer_sub: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> Store<ViewportDragState> {
        self.store.clone()
    }

    pub fn is_dragging(&self) -> bool {
        self.store.select(|s| s.is_dragging)
    }
}

impl TimelineModule for ViewportDragModule {
    fn attach(&self, timeline: &Timeline) {
        let weak = timeline.downgrade();
        let store = self.store.clone();
        let pointer_sub = self.pointer_sub.clone();
        let prev_connected = Mutex::new(false);

        *self.viewport_sub.lock() = Some(timeline.viewport().subscribe(move |state| {
            // Any emission first tears down the old pointer hookup.
            *pointer_sub.lock() = None;

            let mut prev = prev_connected.lock();
            let became_connected = state.connected && !*prev;
            *prev = state.connected;
            if !became_connected {
                return;
            }

            let Some(timeline) = weak.upgrade() else {
                return;
            };
            let Some(host) = timeline.viewport().host() else {
                return;
            };

            let store = store.clone();
            let weak = weak.clone();
            *pointer_sub.lock() = Some(host.on_pointer(Arc::new(move |event: &PointerEvent| {
                let Some(timeline) = weak.upgrade() else {
                    return;
                };
                match event.phase {
                    PointerPhase::Down => {
                        if event.button == PointerButton::Auxiliary {
                            store.set(ViewportDragState { is_dragging: true });
                        }
                    }
                    PointerPhase::Move => {
                        if store.get().is_dragging {
                            timeline.pan_by_px(-event.movement_x);
                        }
                    }
                    PointerPhase::Up => {
                        store.set(ViewportDragState { is_dragging: false });
                    }
                }
            })));
        }));
    }

    fn detach(&self) {
        *self.viewport_sub.lock() = None;
        *self.pointer_sub.lock() = None;
        self.store.set(ViewportDragState { is_dragging: false });
    }
}
