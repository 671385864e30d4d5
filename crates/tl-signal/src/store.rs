use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::Subscription;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Keeps a derived signal's source alive and wired up.
///
/// Dropping the derived signal drops the link, which both detaches the
/// listener from the source and releases the source itself.
struct UpstreamLink {
    _subscription: Subscription,
    _source: Arc<dyn Any + Send + Sync>,
}

struct Inner<T> {
    value: RwLock<T>,
    listeners: Mutex<Vec<(u64, Listener<T>)>>,
    next_listener_id: AtomicU64,
    upstream: Mutex<Vec<UpstreamLink>>,
}

impl<T> Inner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn new(initial: T) -> Arc<Self> {
        Arc::new(Self {
            value: RwLock::new(initial),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
            upstream: Mutex::new(Vec::new()),
        })
    }

    fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Stores `value` and notifies, unless it equals the current value.
    fn set(&self, value: T) {
        {
            let mut current = self.value.write();
            if *current == value {
                return;
            }
            *current = value.clone();
        }
        self.notify(&value);
    }

    /// Notifies with the current value, bypassing the equality gate.
    ///
    /// This is the pulse path used by `filter`/`changed`, whose `()` payload
    /// could never pass an equality check.
    fn pulse(&self) {
        let value = self.get();
        self.notify(&value);
    }

    /// Calls every listener, in registration order, outside any lock.
    ///
    /// The listener list is snapshotted first so a listener may subscribe,
    /// unsubscribe, or even set this same store re-entrantly.
    fn notify(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(value);
        }
    }

    fn subscribe(self: &Arc<Self>, listener: Listener<T>) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, listener.clone()));

        // Replay-on-subscribe: the listener sees the current value at once.
        let current = self.get();
        listener(&current);

        let weak = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.lock().retain(|(lid, _)| *lid != id);
            }
        })
    }
}

fn map_impl<T, U>(source: &Arc<Inner<T>>, f: impl Fn(&T) -> U + Send + Sync + 'static) -> Signal<U>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    U: Clone + PartialEq + Send + Sync + 'static,
{
    let derived = Inner::new(f(&source.get()));
    let sink = Arc::downgrade(&derived);
    let subscription = source.subscribe(Arc::new(move |value: &T| {
        if let Some(sink) = sink.upgrade() {
            sink.set(f(value));
        }
    }));
    derived.upstream.lock().push(UpstreamLink {
        _subscription: subscription,
        _source: source.clone(),
    });
    Signal { inner: derived }
}

fn filter_impl<T>(
    source: &Arc<Inner<T>>,
    predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
) -> Signal<()>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let derived = Inner::new(());
    let sink = Arc::downgrade(&derived);
    let subscription = source.subscribe(Arc::new(move |value: &T| {
        if predicate(value) {
            if let Some(sink) = sink.upgrade() {
                sink.pulse();
            }
        }
    }));
    derived.upstream.lock().push(UpstreamLink {
        _subscription: subscription,
        _source: source.clone(),
    });
    Signal { inner: derived }
}

/// A writable reactive value container.
///
/// Cheap to clone (all clones share one value). `set` is equality gated:
/// writing a value equal to the current one notifies nobody. Subscribers are
/// invoked synchronously, in subscription order, before `set` returns.
pub struct Store<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Store<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            inner: Inner::new(initial),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Stores a new value and synchronously notifies subscribers.
    ///
    /// No-op when `value` equals the current value.
    pub fn set(&self, value: T) {
        self.inner.set(value);
    }

    /// Updates the value through a function of the previous value.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.get());
        self.set(next);
    }

    /// Reads a slice of the state through a selector.
    pub fn select<S>(&self, selector: impl FnOnce(&T) -> S) -> S {
        let value = self.get();
        selector(&value)
    }

    /// Subscribes to value changes.
    ///
    /// The listener is called immediately with the current value, then on
    /// every subsequent change until the returned handle is dropped.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.inner.subscribe(Arc::new(listener))
    }

    /// Creates a derived signal kept in sync through `f`.
    ///
    /// The derived signal owns the upstream subscription: dropping every
    /// handle to it detaches the link.
    pub fn map<U>(&self, f: impl Fn(&T) -> U + Send + Sync + 'static) -> Signal<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
    {
        map_impl(&self.inner, f)
    }

    /// Creates a void signal pulsing whenever `predicate` holds.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Signal<()> {
        filter_impl(&self.inner, predicate)
    }

    /// Creates a void signal pulsing on every emission.
    pub fn changed(&self) -> Signal<()> {
        self.filter(|_| true)
    }

    /// Returns a read-only view of this store.
    pub fn signal(&self) -> Signal<T> {
        Signal {
            inner: self.inner.clone(),
        }
    }
}

/// A read-only handle to a reactive value.
pub struct Signal<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// See [`Store::subscribe`].
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.inner.subscribe(Arc::new(listener))
    }

    /// See [`Store::map`].
    pub fn map<U>(&self, f: impl Fn(&T) -> U + Send + Sync + 'static) -> Signal<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
    {
        map_impl(&self.inner, f)
    }

    /// See [`Store::filter`].
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Signal<()> {
        filter_impl(&self.inner, predicate)
    }

    /// See [`Store::changed`].
    pub fn changed(&self) -> Signal<()> {
        self.filter(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn replay_on_subscribe() {
        let store = Store::new(7);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = store.subscribe(move |v| sink.lock().push(*v));

        assert_eq!(*seen.lock(), vec![7]);

        store.set(8);
        assert_eq!(*seen.lock(), vec![7, 8]);
    }

    #[test]
    fn equality_gates_notification() {
        let store = Store::new(vec![1, 2, 3]);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let _sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set(vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "replay only");

        store.set(vec![1, 2, 3, 4]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn update_and_select() {
        let store = Store::new(10);
        store.update(|prev| prev + 5);
        assert_eq!(store.get(), 15);
        assert_eq!(store.select(|v| v * 2), 30);
    }

    #[test]
    fn subscribers_called_in_subscription_order() {
        let store = Store::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = order.clone();
        let _a = store.subscribe(move |v| first.lock().push(("a", *v)));
        let second = order.clone();
        let _b = store.subscribe(move |v| second.lock().push(("b", *v)));

        order.lock().clear();
        store.set(1);
        assert_eq!(*order.lock(), vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();
        store.set(1);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "only the replay call");
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let store = Store::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        {
            let _sub = store.subscribe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        store.set(1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn map_tracks_source() {
        let store = Store::new(2);
        let doubled = store.map(|v| v * 2);
        assert_eq!(doubled.get(), 4);

        store.set(5);
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn dropping_derived_signal_detaches_it() {
        let store = Store::new(0);
        let observed = Arc::new(AtomicUsize::new(0));

        {
            let counter = observed.clone();
            let derived = store.map(move |v| {
                counter.fetch_add(1, Ordering::SeqCst);
                *v
            });
            let _ = derived.get();
        }

        let before = observed.load(Ordering::SeqCst);
        store.set(1);
        store.set(2);
        assert_eq!(observed.load(Ordering::SeqCst), before);
    }

    #[test]
    fn filter_pulses_when_predicate_holds() {
        let store = Store::new(0);
        let pulses = store.filter(|v| *v % 2 == 0);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let _sub = pulses.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let after_subscribe = calls.load(Ordering::SeqCst);

        store.set(1); // odd, no pulse
        assert_eq!(calls.load(Ordering::SeqCst), after_subscribe);

        store.set(2); // even, pulse
        assert_eq!(calls.load(Ordering::SeqCst), after_subscribe + 1);

        store.set(4); // even again: pulses are not equality gated
        assert_eq!(calls.load(Ordering::SeqCst), after_subscribe + 2);
    }

    #[test]
    fn changed_pulses_on_every_emission() {
        let store = Store::new(0);
        let pulses = store.changed();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let _sub = pulses.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let baseline = calls.load(Ordering::SeqCst);

        store.set(1);
        store.set(1); // gated at the source store
        store.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), baseline + 2);
    }

    #[test]
    fn reentrant_set_from_subscriber() {
        let store = Store::new(0);
        let clamped = store.clone();
        let _sub = store.subscribe(move |v| {
            // Clamp to 10 from inside the notification.
            if *v > 10 {
                clamped.set(10);
            }
        });

        store.set(99);
        assert_eq!(store.get(), 10);
    }

    #[test]
    fn chained_derivations_stay_alive_through_the_tail() {
        let store = Store::new(1);
        // The intermediate map signal is dropped immediately; the pulse
        // signal must keep the whole chain wired.
        let pulses = store.map(|v| v * 10).changed();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let _sub = pulses.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let baseline = calls.load(Ordering::SeqCst);

        store.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), baseline + 1);
    }
}
