//! Generational arena storage for signals.
//!
//! Uses a slot map with generational indices to provide memory-safe Copy handles
//! to signal values. This prevents use-after-free bugs when signals are disposed
//! and their slots are reused.

use slotmap::{new_key_type, SlotMap};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

new_key_type! {
    /// Unique identifier for a signal in the storage.
    pub struct SignalId;

    /// Unique identifier for a registered observer.
    pub struct SubscriberId;
}

/// Observer callback, type-erased over the signal's value.
pub(crate) type Observer = Rc<dyn Fn(&dyn Any)>;

/// A type-erased signal value together with its observers.
pub(crate) struct SignalSlot {
    /// The actual value, boxed and type-erased.
    value: Box<dyn Any>,
    /// Observers in registration order.
    observers: Vec<(SubscriberId, Observer)>,
    /// Subscriptions this signal holds on other signals (derived views).
    upstream: Vec<SubscriberId>,
}

/// Thread-local storage for all signals.
///
/// This is the backing store for all signal values and their observers.
/// Handles never hold a borrow across observer dispatch, so observers are free
/// to read and write any signal.
pub(crate) struct SignalStorage {
    /// Arena of signal values indexed by SignalId.
    values: SlotMap<SignalId, SignalSlot>,
    /// Owning signal of every live observer.
    subscribers: SlotMap<SubscriberId, SignalId>,
}

impl SignalStorage {
    /// Create a new empty signal storage.
    pub fn new() -> Self {
        Self {
            values: SlotMap::with_key(),
            subscribers: SlotMap::with_key(),
        }
    }

    /// Insert a new signal value and return its ID.
    pub fn insert<T: 'static>(&mut self, value: T) -> SignalId {
        self.values.insert(SignalSlot {
            value: Box::new(value),
            observers: Vec::new(),
            upstream: Vec::new(),
        })
    }

    /// Whether the signal still lives in the arena.
    pub fn contains(&self, id: SignalId) -> bool {
        self.values.contains_key(id)
    }

    /// Get a reference to a signal value.
    pub fn get<T: 'static>(&self, id: SignalId) -> Option<&T> {
        self.values
            .get(id)
            .and_then(|slot| slot.value.downcast_ref())
    }

    /// Get a mutable reference to a signal value.
    pub fn get_mut<T: 'static>(&mut self, id: SignalId) -> Option<&mut T> {
        self.values
            .get_mut(id)
            .and_then(|slot| slot.value.downcast_mut())
    }

    /// Replace a signal value. Returns false if the handle is stale.
    pub fn replace<T: 'static>(&mut self, id: SignalId, value: T) -> bool {
        match self.get_mut::<T>(id) {
            Some(current) => {
                *current = value;
                true
            }
            None => false,
        }
    }

    /// Snapshot the observers of a signal for dispatch outside the borrow.
    pub fn observers(&self, id: SignalId) -> Vec<(SubscriberId, Observer)> {
        self.values
            .get(id)
            .map(|slot| slot.observers.clone())
            .unwrap_or_default()
    }

    /// Register an observer on a signal.
    pub fn subscribe(&mut self, id: SignalId, observer: Observer) -> Option<SubscriberId> {
        if !self.values.contains_key(id) {
            return None;
        }
        let subscriber = self.subscribers.insert(id);
        if let Some(slot) = self.values.get_mut(id) {
            slot.observers.push((subscriber, observer));
        }
        Some(subscriber)
    }

    /// Remove an observer. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, subscriber: SubscriberId) -> bool {
        let Some(id) = self.subscribers.remove(subscriber) else {
            return false;
        };
        if let Some(slot) = self.values.get_mut(id) {
            slot.observers.retain(|(key, _)| *key != subscriber);
        }
        true
    }

    /// Whether an observer is still registered.
    pub fn is_subscribed(&self, subscriber: SubscriberId) -> bool {
        self.subscribers.contains_key(subscriber)
    }

    /// Record that `owner` holds `subscriber` on some other signal, so that
    /// disposing `owner` also detaches it from its sources.
    pub fn attach_upstream(&mut self, owner: SignalId, subscriber: SubscriberId) {
        if let Some(slot) = self.values.get_mut(owner) {
            slot.upstream.push(subscriber);
        }
    }

    /// Remove a signal, its observers and its upstream subscriptions.
    pub fn remove(&mut self, id: SignalId) -> bool {
        let Some(slot) = self.values.remove(id) else {
            return false;
        };
        for (subscriber, _) in slot.observers {
            self.subscribers.remove(subscriber);
        }
        for subscriber in slot.upstream {
            self.unsubscribe(subscriber);
        }
        true
    }

    /// Number of live signals.
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

thread_local! {
    static STORAGE: RefCell<SignalStorage> = RefCell::new(SignalStorage::new());
}

/// Mutably access the thread-local signal storage.
pub(crate) fn with_signal_storage<R>(f: impl FnOnce(&mut SignalStorage) -> R) -> R {
    STORAGE.with(|storage| f(&mut storage.borrow_mut()))
}

/// Read the thread-local signal storage. Nested reads are allowed.
pub(crate) fn read_signal_storage<R>(f: impl FnOnce(&SignalStorage) -> R) -> R {
    STORAGE.with(|storage| f(&storage.borrow()))
}

/// Dispatch the current value of a signal to every observer.
///
/// The observer list is snapshotted before dispatch and no borrow is held while
/// observers run. The value is read again before each call, so an observer
/// that follows a nested write sees the value that write left behind. An
/// observer removed by an earlier observer in the same pass is skipped, and the
/// pass stops if the signal is disposed.
pub(crate) fn notify_observers<T: Clone + 'static>(id: SignalId) {
    let observers = read_signal_storage(|storage| storage.observers(id));

    for (subscriber, observer) in observers {
        let current = read_signal_storage(|storage| {
            storage
                .is_subscribed(subscriber)
                .then(|| storage.get::<T>(id).cloned())
        });
        match current {
            Some(Some(value)) => observer(&value),
            Some(None) => return,
            None => {}
        }
    }
}

/// Number of live signals on this thread.
pub fn live_signal_count() -> usize {
    read_signal_storage(|storage| storage.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_insert_and_get() {
        with_signal_storage(|storage| {
            let id = storage.insert(42i32);
            assert_eq!(storage.get::<i32>(id), Some(&42));
            assert_eq!(storage.get::<String>(id), None);
        });
    }

    #[test]
    fn test_replace() {
        with_signal_storage(|storage| {
            let id = storage.insert(10i32);
            assert!(storage.replace(id, 15i32));
            assert_eq!(storage.get::<i32>(id), Some(&15));
        });
    }

    #[test]
    fn test_subscribe_and_notify() {
        let called = Rc::new(Cell::new(0));
        let id = with_signal_storage(|storage| storage.insert(0i32));

        let seen = called.clone();
        with_signal_storage(|storage| {
            storage.subscribe(
                id,
                Rc::new(move |value: &dyn Any| {
                    if let Some(v) = value.downcast_ref::<i32>() {
                        seen.set(*v);
                    }
                }),
            )
        });

        with_signal_storage(|storage| storage.replace(id, 7i32));
        notify_observers::<i32>(id);
        assert_eq!(called.get(), 7);
    }

    #[test]
    fn test_unsubscribe_skips_observer() {
        let called = Rc::new(Cell::new(false));
        let id = with_signal_storage(|storage| storage.insert(()));

        let seen = called.clone();
        let subscriber = with_signal_storage(|storage| {
            storage.subscribe(id, Rc::new(move |_: &dyn Any| seen.set(true)))
        })
        .unwrap();

        assert!(with_signal_storage(|storage| storage.unsubscribe(subscriber)));
        assert!(!with_signal_storage(|storage| storage.unsubscribe(subscriber)));

        notify_observers::<()>(id);
        assert!(!called.get());
    }

    #[test]
    fn test_remove_detaches_upstream() {
        with_signal_storage(|storage| {
            let source = storage.insert(1u8);
            let derived = storage.insert(2u8);
            let subscriber = storage
                .subscribe(source, Rc::new(|_: &dyn Any| {}))
                .unwrap();
            storage.attach_upstream(derived, subscriber);

            assert!(storage.remove(derived));
            assert!(!storage.is_subscribed(subscriber));
            assert!(storage.observers(source).is_empty());
            assert!(!storage.contains(derived));
            assert!(storage.subscribe(derived, Rc::new(|_: &dyn Any| {})).is_none());
        });
    }
}
