use std::sync::Arc;

use parking_lot::Mutex;
use tl_signal::{Store, Subscription};

use crate::host::ViewportHost;

/// Pixel-window state owned by the [`Viewport`] store.
///
/// Invariant: `px_per_unit == width_px / visible_range` whenever
/// `width_px > 0`; both are zero while unmeasured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// Usable width in pixels, excluding the header offset.
    pub width_px: f64,
    /// Units visible in the viewport; inversely related to zoom.
    pub visible_range: f64,
    /// Scale in pixels per unit; 0 while unmeasured.
    pub px_per_unit: f64,
    /// Pixels reserved at the leading edge for headers.
    pub header_offset_px: f64,
    pub connected: bool,
    pub min_visible_range: f64,
    pub max_visible_range: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ViewportOptions {
    pub visible_range: f64,
    pub header_offset_px: f64,
    pub min_visible_range: f64,
    pub max_visible_range: f64,
}

struct HostConnection {
    host: Arc<dyn ViewportHost>,
    _resize_sub: Subscription,
}

/// Maps a sub-range of the unit axis onto container pixels.
///
/// Width tracking is push-based: the connected [`ViewportHost`] reports
/// resizes, and the viewport re-derives `px_per_unit` from them. Range
/// clamping is the caller's job ([`crate::Timeline::set_visible_range`]),
/// not the viewport's.
pub struct Viewport {
    store: Store<ViewportState>,
    connection: Mutex<Option<HostConnection>>,
}

impl Viewport {
    pub fn new(options: ViewportOptions) -> Self {
        Self {
            store: Store::new(ViewportState {
                width_px: 0.0,
                visible_range: options.visible_range,
                px_per_unit: 0.0,
                header_offset_px: options.header_offset_px,
                connected: false,
                min_visible_range: options.min_visible_range,
                max_visible_range: options.max_visible_range,
            }),
            connection: Mutex::new(None),
        }
    }

    /// Connects a container. Measures immediately, then follows resizes.
    /// Reconnecting the same host is a no-op.
    pub fn connect(&self, host: Arc<dyn ViewportHost>) {
        if let Some(connection) = self.connection.lock().as_ref() {
            if Arc::ptr_eq(&connection.host, &host) {
                return;
            }
        }
        self.disconnect();

        let store = self.store.clone();
        let apply_width = move |raw_width: f64| {
            let state = store.get();
            let width = raw_width - state.header_offset_px;
            if width <= 0.0 || width == state.width_px {
                return;
            }
            store.update(|prev| ViewportState {
                width_px: width,
                px_per_unit: width / prev.visible_range,
                ..*prev
            });
        };

        apply_width(host.width_px());
        let resize_sub = host.on_resize(Arc::new(apply_width));

        *self.connection.lock() = Some(HostConnection {
            host,
            _resize_sub: resize_sub,
        });
        self.store.update(|prev| ViewportState {
            connected: true,
            ..*prev
        });
    }

    /// Drops the container; width and scale reset to unmeasured.
    pub fn disconnect(&self) {
        let had_connection = self.connection.lock().take().is_some();
        if had_connection || self.store.get().connected {
            self.store.update(|prev| ViewportState {
                width_px: 0.0,
                px_per_unit: 0.0,
                connected: false,
                ..*prev
            });
        }
    }

    /// The connected container, if any.
    pub fn host(&self) -> Option<Arc<dyn ViewportHost>> {
        self.connection.lock().as_ref().map(|c| c.host.clone())
    }

    /// Sets the visible range, re-deriving the scale. Does not clamp.
    pub fn set_visible_range(&self, visible_range: f64) {
        self.store.update(|prev| ViewportState {
            visible_range,
            px_per_unit: if prev.width_px > 0.0 {
                prev.width_px / visible_range
            } else {
                0.0
            },
            ..*prev
        });
    }

    pub fn set_header_offset_px(&self, offset_px: f64) {
        self.store.update(|prev| ViewportState {
            header_offset_px: offset_px,
            ..*prev
        });
    }

    pub fn set_min_visible_range(&self, min_visible_range: f64) {
        self.store.update(|prev| ViewportState {
            min_visible_range,
            ..*prev
        });
    }

    pub fn set_max_visible_range(&self, max_visible_range: f64) {
        self.store.update(|prev| ViewportState {
            max_visible_range,
            ..*prev
        });
    }

    pub fn visible_range(&self) -> f64 {
        self.store.select(|s| s.visible_range)
    }

    pub fn min_visible_range(&self) -> f64 {
        self.store.select(|s| s.min_visible_range)
    }

    pub fn max_visible_range(&self) -> f64 {
        self.store.select(|s| s.max_visible_range)
    }

    pub fn header_offset_px(&self) -> f64 {
        self.store.select(|s| s.header_offset_px)
    }

    pub fn width_px(&self) -> f64 {
        self.store.select(|s| s.width_px)
    }

    pub fn is_connected(&self) -> bool {
        self.store.select(|s| s.connected)
    }

    pub fn store(&self) -> Store<ViewportState> {
        self.store.clone()
    }

    pub fn select<T>(&self, selector: impl FnOnce(&ViewportState) -> T) -> T {
        self.store.select(selector)
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&ViewportState) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.subscribe(listener)
    }
}
