//! Derived views computed from other signals.

use crate::signal::{Readable, Signal, Subscription};
use futures::channel::mpsc;
use std::hash::{Hash, Hasher};
use std::{fmt, marker::PhantomData};

/// A read-only signal whose value is a pure projection of one or more sources.
///
/// Every notification from any source re-runs the projection and notifies the
/// view's own observers, even if the new value equals the old one. A view can
/// itself be the source of another view. In a diamond (two views over one
/// source feeding a third) the bottom view recomputes once per incoming edge.
///
/// Views have no mutators and can only be built over sources that already
/// exist, so the dependency graph is acyclic and every cascade terminates.
///
/// ```rust,no_run
/// use dashboard_signals::prelude::*;
///
/// let count = Signal::new(5);
/// let doubled = Derived::new(&count, |n| n * 2);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Derived<T> {
    signal: Signal<T>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Copy for Derived<T> {}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Derived<T> {
    fn eq(&self, other: &Self) -> bool {
        self.signal == other.signal
    }
}

impl<T> Eq for Derived<T> {}

impl<T> Hash for Derived<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signal.hash(state);
    }
}

impl<T: Clone + 'static> Derived<T> {
    /// Derive a view from a single source.
    pub fn new<S: Readable>(source: &S, project: impl Fn(&S::Value) -> T + 'static) -> Self {
        let signal = Signal::new(project(&source.get()));

        let subscription = source.watch(move |value| signal.set(project(value)));
        signal.attach_upstream(&subscription);

        Self {
            signal,
            _phantom: PhantomData,
        }
    }

    /// Derive a view from two sources.
    ///
    /// When one source notifies, the other is read at that moment.
    pub fn from2<A: Readable, B: Readable>(
        a: &A,
        b: &B,
        project: impl Fn(&A::Value, &B::Value) -> T + 'static,
    ) -> Self {
        let signal = Signal::new(project(&a.get(), &b.get()));
        let project = std::rc::Rc::new(project);

        let (a, b) = (*a, *b);
        let from_a = a.watch({
            let project = project.clone();
            move |a_value| signal.set(project(a_value, &b.get()))
        });
        let from_b = b.watch(move |b_value| signal.set(project(&a.get(), b_value)));
        signal.attach_upstream(&from_a);
        signal.attach_upstream(&from_b);

        Self {
            signal,
            _phantom: PhantomData,
        }
    }

    /// Get the current derived value.
    pub fn get(&self) -> T {
        self.signal.get()
    }

    /// Read the derived value with a closure.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    /// Subscribe, receiving the current value immediately.
    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        self.signal.subscribe(observer)
    }

    /// Subscribe to future recomputations only.
    pub fn watch(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        self.signal.watch(observer)
    }

    /// Stream of values, starting with the current one.
    pub fn changes(&self) -> mpsc::UnboundedReceiver<T> {
        Readable::changes(&self.signal)
    }

    /// Detach from all sources and free the view.
    pub fn dispose(self) -> bool {
        self.signal.dispose()
    }
}

impl<T: Clone + 'static> Readable for Derived<T> {
    type Value = T;

    fn get(&self) -> T {
        self.signal.get()
    }

    fn watch(&self, observer: impl Fn(&Self::Value) + 'static) -> Subscription {
        self.signal.watch(observer)
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("signal", &self.signal)
            .finish()
    }
}
