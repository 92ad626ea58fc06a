//! Core Signal type and operations.

use crate::storage::{
    notify_observers, read_signal_storage, with_signal_storage, Observer, SignalId, SubscriberId,
};
use futures::channel::mpsc;
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;

/// Anything observers can read from and subscribe to.
///
/// Implemented by [`Signal`], [`ReadOnlySignal`] and [`crate::Derived`], which
/// lets derived views use any of them as a source.
pub trait Readable: Copy + 'static {
    type Value: Clone + 'static;

    /// Get a clone of the current value.
    fn get(&self) -> Self::Value;

    /// Register an observer for future changes only.
    fn watch(&self, observer: impl Fn(&Self::Value) + 'static) -> Subscription;

    /// Register an observer, calling it once right away with the current value.
    fn subscribe(&self, observer: impl Fn(&Self::Value) + 'static) -> Subscription {
        let observer = Rc::new(observer);
        let subscription = self.watch({
            let observer = observer.clone();
            move |value| observer(value)
        });
        observer(&self.get());
        subscription
    }

    /// Stream every value the source takes, starting with the current one.
    ///
    /// The observer behind the stream removes itself on the first change after
    /// the receiver is dropped.
    fn changes(&self) -> mpsc::UnboundedReceiver<Self::Value> {
        let (tx, rx) = mpsc::unbounded();
        let registered: Rc<Cell<Option<SubscriberId>>> = Rc::new(Cell::new(None));

        let subscription = self.watch({
            let tx = tx.clone();
            let registered = registered.clone();
            move |value| {
                if tx.unbounded_send(value.clone()).is_err() {
                    if let Some(id) = registered.take() {
                        Subscription { id }.unsubscribe();
                    }
                }
            }
        });
        registered.set(Some(subscription.id));

        // The receiver is still held here, so the seed value is always queued.
        let _ = tx.unbounded_send(self.get());
        rx
    }
}

/// Handle returned by `subscribe`/`watch`. Dropping it keeps the observer
/// registered; call [`Subscription::unsubscribe`] to remove it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: SubscriberId,
}

impl Subscription {
    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    /// Deregister the observer. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        with_signal_storage(|storage| storage.unsubscribe(self.id))
    }

    /// Whether the observer is still registered.
    pub fn is_active(&self) -> bool {
        read_signal_storage(|storage| storage.is_subscribed(self.id))
    }
}

/// A reactive signal that holds a value of type `T`.
///
/// Signals are Copy-able handles to reactive state. `set` and `update` always
/// notify every observer synchronously, in registration order, before
/// returning.
///
/// Observers may write to signals, including the one that is notifying them.
/// A nested write runs its own full pass before returning, and every observer
/// is handed the value current at the moment it is called, so observers later
/// in the outer pass see the nested write. An observer that unconditionally
/// writes back to its own source never terminates.
///
/// ```rust,no_run
/// use dashboard_signals::prelude::*;
///
/// let count = Signal::new(0);
/// let sub = count.subscribe(|n| println!("count = {n}"));
/// count.update(|n| *n += 1);
/// sub.unsubscribe();
/// ```
pub struct Signal<T> {
    id: SignalId,
    _phantom: PhantomData<T>,
}

impl<T> Copy for Signal<T> {}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Signal<T> {}

impl<T> Hash for Signal<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Signal<bool> {
    /// Toggle the boolean value of the signal.
    pub fn toggle(&self) {
        self.update(|v| *v = !*v);
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        let id = with_signal_storage(|storage| storage.insert(value));
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    /// Get a clone of the current value of the signal.
    ///
    /// # Panics
    ///
    /// Panics if the signal has been disposed.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Set the signal to a new value.
    ///
    /// This will notify all subscribers, whether or not the value changed.
    pub fn set(&self, value: T) {
        if with_signal_storage(|storage| storage.replace(self.id, value)) {
            self.notify();
        }
    }

    /// Set the signal only if the value has changed.
    ///
    /// Returns true if the value was updated.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        let should_update = self.with(|current| current != &value);
        if should_update {
            self.set(value);
        }
        should_update
    }

    /// Update the signal's value in place.
    ///
    /// This will notify all subscribers of the change.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.update_with(f);
    }

    /// Update the signal's value in place and return a result.
    ///
    /// Returns `None` without calling `f` if the signal has been disposed.
    pub fn update_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        // Take the value out so `f` runs without the storage borrowed.
        let mut value = with_signal_storage(|storage| storage.get::<T>(self.id).cloned())?;
        let result = f(&mut value);
        if with_signal_storage(|storage| storage.replace(self.id, value)) {
            self.notify();
            Some(result)
        } else {
            None
        }
    }

    /// Read the signal's value with a closure.
    ///
    /// The closure may read other signals but must not write to any.
    ///
    /// # Panics
    ///
    /// Panics if the signal has been disposed.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        read_signal_storage(|storage| {
            let value = storage.get::<T>(self.id).expect("Signal value not found");
            f(value)
        })
    }

    /// Subscribe to the signal, receiving the current value immediately.
    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        Readable::subscribe(self, observer)
    }

    /// Subscribe to future changes only.
    pub fn watch(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        Readable::watch(self, observer)
    }

    /// Convert this signal to a read-only signal.
    pub fn read_only(self) -> ReadOnlySignal<T> {
        ReadOnlySignal { inner: self }
    }

    /// Whether this handle still points at a live value.
    pub fn is_alive(&self) -> bool {
        read_signal_storage(|storage| storage.contains(self.id))
    }

    /// Free the signal's slot along with its observers.
    ///
    /// Returns false if it was already disposed.
    pub fn dispose(self) -> bool {
        with_signal_storage(|storage| storage.remove(self.id))
    }

    /// Get the underlying signal ID (mainly for debugging).
    pub fn id(&self) -> SignalId {
        self.id
    }

    pub(crate) fn attach_upstream(&self, subscription: &Subscription) {
        with_signal_storage(|storage| storage.attach_upstream(self.id, subscription.id()));
    }

    fn notify(&self) {
        notify_observers::<T>(self.id);
    }
}

impl<T: Clone + 'static> Readable for Signal<T> {
    type Value = T;

    fn get(&self) -> T {
        Signal::get(self)
    }

    fn watch(&self, observer: impl Fn(&Self::Value) + 'static) -> Subscription {
        let observer: Observer = Rc::new(move |value: &dyn Any| {
            if let Some(value) = value.downcast_ref::<T>() {
                observer(value);
            }
        });
        let id = with_signal_storage(|storage| storage.subscribe(self.id, observer))
            .expect("Signal value not found");
        Subscription { id }
    }
}

impl<T: Clone + Default + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Signal");
        out.field("id", &self.id);
        if self.is_alive() {
            out.field("value", &self.get());
        }
        out.finish()
    }
}

/// A read-only view of a signal.
///
/// Stores hand these out so collaborators can read and subscribe but have to
/// go through the store's mutators to write.
pub struct ReadOnlySignal<T> {
    inner: Signal<T>,
}

impl<T> Copy for ReadOnlySignal<T> {}

impl<T> Clone for ReadOnlySignal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for ReadOnlySignal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Eq for ReadOnlySignal<T> {}

impl<T> Hash for ReadOnlySignal<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<T: Clone + 'static> ReadOnlySignal<T> {
    /// Get the current value of the signal.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Read the signal's value with a closure.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    /// Subscribe to the signal, receiving the current value immediately.
    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        self.inner.subscribe(observer)
    }

    /// Subscribe to future changes only.
    pub fn watch(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        self.inner.watch(observer)
    }
}

impl<T: Clone + 'static> Readable for ReadOnlySignal<T> {
    type Value = T;

    fn get(&self) -> T {
        self.inner.get()
    }

    fn watch(&self, observer: impl Fn(&Self::Value) + 'static) -> Subscription {
        self.inner.watch(observer)
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for ReadOnlySignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlySignal")
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use std::cell::RefCell;
    use std::sync::Arc;

    #[test]
    fn test_signal_creation() {
        let signal = Signal::new(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn test_signal_set() {
        let signal = Signal::new(0);
        signal.set(10);
        assert_eq!(signal.get(), 10);
    }

    #[test]
    fn test_signal_update() {
        let signal = Signal::new(5);
        signal.update(|n| *n *= 2);
        assert_eq!(signal.get(), 10);
    }

    #[test]
    fn test_signal_update_with() {
        let signal = Signal::new(5);
        let result = signal.update_with(|n| {
            *n += 2;
            *n
        });
        assert_eq!(result, Some(7));
        assert_eq!(signal.get(), 7);
    }

    #[test]
    fn test_signal_with() {
        let signal = Signal::new(String::from("hello"));
        let len = signal.with(|s| s.len());
        assert_eq!(len, 5);
    }

    #[test]
    fn test_subscribe_delivers_current_value_first() {
        let signal = Signal::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let _sub = signal.subscribe({
            let seen = seen.clone();
            move |v| seen.borrow_mut().push(*v)
        });
        signal.set(2);
        signal.update(|v| *v += 1);

        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_set_notifies_even_when_equal() {
        let signal = Signal::new(0);
        let count = Arc::new(Mutex::new(0));

        let _sub = signal.watch({
            let count = count.clone();
            move |_| *count.lock() += 1
        });

        signal.set(1);
        signal.set(1);
        signal.set(1);

        assert_eq!(*count.lock(), 3);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let signal = Signal::new(0);
        let count = Rc::new(Cell::new(0));

        let sub = signal.watch({
            let count = count.clone();
            move |_| count.set(count.get() + 1)
        });
        signal.set(1);
        assert!(sub.is_active());
        assert!(sub.unsubscribe());
        signal.set(2);

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_observers_run_in_registration_order() {
        let signal = Signal::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let order = order.clone();
            let _ = signal.watch(move |_| order.borrow_mut().push(tag));
        }
        signal.set(1);

        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_observer_may_write_other_signal() {
        let source = Signal::new(1);
        let mirror = Signal::new(0);

        let _sub = source.subscribe(move |v| mirror.set(*v * 10));
        assert_eq!(mirror.get(), 10);

        source.set(4);
        assert_eq!(mirror.get(), 40);
    }

    #[test]
    fn test_observer_may_write_own_signal() {
        let signal = Signal::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        // Clamp to 100; the nested write converges after one extra pass.
        let _clamp = signal.watch(move |v| {
            if *v > 100 {
                signal.set(100);
            }
        });
        let _log = signal.watch({
            let seen = seen.clone();
            move |v| seen.borrow_mut().push(*v)
        });
        signal.set(250);

        assert_eq!(signal.get(), 100);
        // The outer pass resumes after the clamp and hands over the clamped value.
        assert_eq!(*seen.borrow(), vec![100, 100]);
    }

    #[test]
    fn test_observer_may_unsubscribe_later_observer() {
        let signal = Signal::new(0);
        let hits = Rc::new(Cell::new(0));
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let _killer = signal.watch({
            let victim = victim.clone();
            move |_| {
                if let Some(sub) = victim.borrow_mut().take() {
                    sub.unsubscribe();
                }
            }
        });
        *victim.borrow_mut() = Some(signal.watch({
            let hits = hits.clone();
            move |_| hits.set(hits.get() + 1)
        }));

        signal.set(1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_read_only_signal() {
        let signal = Signal::new(42);
        let read_only = signal.read_only();
        assert_eq!(read_only.get(), 42);
        signal.set(43);
        assert_eq!(read_only.with(|v| *v + 1), 44);
    }

    #[test]
    fn test_signal_toggle() {
        let signal = Signal::new(false);
        signal.toggle();
        assert!(signal.get());
        signal.toggle();
        assert!(!signal.get());
    }

    #[test]
    fn test_signal_set_if_changed() {
        let signal = Signal::new(5);
        assert!(!signal.set_if_changed(5));
        assert_eq!(signal.get(), 5);
        assert!(signal.set_if_changed(6));
        assert_eq!(signal.get(), 6);
    }

    #[test]
    fn test_signal_eq() {
        let s1 = Signal::new(10);
        let s2 = s1;
        let s3 = Signal::new(10); // Different signal, same value

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);
    }

    #[test]
    fn test_dispose() {
        let signal = Signal::new(String::from("gone"));
        assert!(signal.is_alive());
        assert!(signal.dispose());
        assert!(!signal.is_alive());
        assert!(!signal.dispose());
        assert_eq!(signal.update_with(|s| s.len()), None);
        // Writes to a disposed handle are ignored.
        signal.set(String::from("still gone"));
    }

    #[test]
    fn test_changes_stream() {
        let signal = Signal::new(1);
        let stream = signal.changes();

        signal.set(2);
        signal.set(3);

        let values: Vec<i32> = block_on(stream.take(3).collect());
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_changes_stream_detaches_after_drop() {
        let signal = Signal::new(1);
        let stream = signal.changes();
        drop(stream);

        // The first write notices the closed channel and detaches.
        signal.set(2);
        let observers = read_signal_storage(|storage| storage.observers(signal.id()).len());
        assert_eq!(observers, 0);
    }
}
