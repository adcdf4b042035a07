//! Observable state slices
//!
//! Each slice of the analysis store is an [`Observable`]: a lock-free
//! current value plus its own subscriber list. Writes compare against the
//! current value first; an unchanged write keeps the existing `Arc` and
//! notifies nobody, so consumers can detect "no change" by pointer
//! equality and skip redundant work.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

type Callback<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

struct Subscriber<T> {
    id: u64,
    callback: Callback<T>,
}

/// A single observable state slice
pub struct Observable<T> {
    value: ArcSwap<T>,
    subscribers: Arc<Mutex<Vec<Subscriber<T>>>>,
    next_id: AtomicU64,
}

impl<T: PartialEq + Send + Sync + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: ArcSwap::new(Arc::new(initial)),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// The current value
    ///
    /// Lock-free; safe to call from any thread, including subscriber
    /// callbacks.
    pub fn get(&self) -> Arc<T> {
        self.value.load_full()
    }

    /// Replace the value, notifying subscribers only on a real change
    ///
    /// Returns whether the value changed. When `next` equals the current
    /// value the stored `Arc` is left untouched.
    pub fn set(&self, next: T) -> bool {
        {
            let current = self.value.load();
            if **current == next {
                return false;
            }
        }

        let next = Arc::new(next);
        self.value.store(Arc::clone(&next));
        self.notify(&next);
        true
    }

    /// Register a change callback; dropping the returned [`Subscription`]
    /// unsubscribes
    pub fn subscribe(&self, callback: impl Fn(&Arc<T>) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push(Subscriber {
            id,
            callback: Arc::new(callback),
        });

        let subscribers = Arc::clone(&self.subscribers);
        Subscription {
            cancel: Some(Box::new(move || {
                subscribers.lock().retain(|s| s.id != id);
            })),
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn notify(&self, value: &Arc<T>) {
        // Snapshot the callbacks so a callback may subscribe or
        // unsubscribe without deadlocking
        let callbacks: Vec<Callback<T>> = self
            .subscribers
            .lock()
            .iter()
            .map(|s| Arc::clone(&s.callback))
            .collect();

        for callback in callbacks {
            callback(value);
        }
    }
}

/// Guard for an active subscription
///
/// The callback stays registered for as long as the guard lives.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Explicitly unsubscribe (equivalent to dropping the guard)
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
