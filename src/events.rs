//! Typed publish/subscribe emitter with synchronous fan-out.
//!
//! Replaces host-toolkit event emitters with a plain observable: listeners
//! subscribe with a closure and receive every subsequent `emit` on the
//! emitting thread. A [`Subscription`] guard unsubscribes on drop, so wiring
//! between long-lived objects is released automatically when the owning side
//! is torn down.

use std::sync::{Arc, Mutex};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

/// A multi-listener event source. Cloning shares the listener list, so an
/// owner can hand out clones to closures that need to fire it later.
pub struct EventEmitter<T> {
    inner: Arc<Mutex<Listeners<T>>>,
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a listener. The returned guard removes it again when dropped;
    /// call [`Subscription::detach`] to keep it alive for the emitter's
    /// lifetime instead.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.lock().expect("listener lock poisoned");
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((id, Arc::new(listener)));
            id
        };

        let weak = Arc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut inner = inner.lock().expect("listener lock poisoned");
                    inner.entries.retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Deliver `payload` to every current listener, in subscription order.
    ///
    /// Listeners run outside the internal lock, so they may subscribe,
    /// unsubscribe, or emit again re-entrantly.
    pub fn emit(&self, payload: &T) {
        let listeners: Vec<Listener<T>> = {
            let inner = self.inner.lock().expect("listener lock poisoned");
            inner.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener(payload);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().expect("listener lock poisoned").entries.len()
    }
}

/// Guard for one registered listener. Dropping it unsubscribes.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Consume the guard without unsubscribing; the listener then lives as
    /// long as the emitter does.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}
