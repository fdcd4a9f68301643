//! Push-based observables and the bridge that turns one into a local value.
//!
//! External collaborators (the chat setup in particular) expose their state
//! as an [`Observable`]: something you hand a callback to and get a
//! [`Subscription`] back. [`ObservableState`] keeps the latest emitted value
//! in a `watch` channel so it can be read synchronously or awaited.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;

pub type Handler<T> = Box<dyn Fn(T) + Send + Sync>;

/// A push-based source of values.
pub trait Observable<T>: Send + Sync {
    fn subscribe(&self, handler: Handler<T>) -> Subscription;
}

/// Handle returned by [`Observable::subscribe`]. Unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn empty() -> Self {
        Self { teardown: None }
    }

    pub fn unsubscribe(mut self) {
        self.run_teardown();
    }

    fn run_teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_teardown();
    }
}

struct SubjectInner<T> {
    handlers: BTreeMap<u64, Arc<Handler<T>>>,
    next_id: u64,
    latest: Option<T>,
    completed: bool,
}

/// Multicast observable that replays its latest value to new subscribers.
pub struct Subject<T> {
    inner: Arc<Mutex<SubjectInner<T>>>,
}

impl<T: Clone + Send + 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SubjectInner {
                handlers: BTreeMap::new(),
                next_id: 0,
                latest: None,
                completed: false,
            })),
        }
    }

    pub fn with_value(value: T) -> Self {
        let subject = Self::new();
        subject.next(value);
        subject
    }

    /// Emit a value to every current subscriber, synchronously.
    pub fn next(&self, value: T) {
        let handlers: Vec<Arc<Handler<T>>> = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.completed {
                return;
            }
            inner.latest = Some(value.clone());
            inner.handlers.values().cloned().collect()
        };

        // Handlers run outside the lock so they may unsubscribe themselves.
        for handler in handlers {
            handler(value.clone());
        }
    }

    /// Drop every subscriber and ignore further emissions.
    pub fn complete(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.completed = true;
        inner.handlers.clear();
    }

    pub fn latest(&self) -> Option<T> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .len()
    }
}

impl<T: Clone + Send + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Observable<T> for Subject<T> {
    fn subscribe(&self, handler: Handler<T>) -> Subscription {
        let handler = Arc::new(handler);
        let (id, replay) = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.completed {
                return Subscription::empty();
            }
            let id = inner.next_id;
            inner.next_id += 1;
            inner.handlers.insert(id, handler.clone());
            (id, inner.latest.clone())
        };

        if let Some(value) = replay {
            handler(value);
        }

        let weak: Weak<Mutex<SubjectInner<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .handlers
                    .remove(&id);
            }
        })
    }
}

fn same_source<T>(a: &Arc<dyn Observable<T>>, b: &Arc<dyn Observable<T>>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Local mirror of an optional observable: starts at an initial value and
/// follows whatever the bound source emits, latest value wins.
pub struct ObservableState<T> {
    tx: Arc<watch::Sender<T>>,
    source: Option<Arc<dyn Observable<T>>>,
    subscription: Option<Subscription>,
}

impl<T: Clone + Send + Sync + 'static> ObservableState<T> {
    pub fn new(source: Option<Arc<dyn Observable<T>>>, start_with: T) -> Self {
        let (tx, _rx) = watch::channel(start_with);
        let mut state = Self {
            tx: Arc::new(tx),
            source: None,
            subscription: None,
        };
        state.bind(source);
        state
    }

    /// Point the bridge at another source. The previous subscription is
    /// released first; binding the same source again is a no-op.
    pub fn bind(&mut self, source: Option<Arc<dyn Observable<T>>>) {
        let unchanged = match (&self.source, &source) {
            (Some(current), Some(next)) => same_source(current, next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }

        self.subscription = source.as_ref().map(|observable| {
            let tx = self.tx.clone();
            observable.subscribe(Box::new(move |value| {
                tx.send_replace(value);
            }))
        });
        self.source = source;
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Receiver that wakes on every emission.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn is_bound(&self) -> bool {
        self.subscription.is_some()
    }
}
