//! Typed event bus with explicit unsubscribe handles.
//!
//! Each event kind (status, data, log) has its own registry of closure
//! listeners. Listeners are invoked in registration order, and a listener
//! that panics is caught and reported without disturbing the emitter or the
//! remaining listeners -- one broken subscriber must not break delivery to
//! the others.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use glowlink_core::{DataEvent, LogEntry, StatusEvent};
use tracing::error;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A registry of listeners for one event kind.
pub(crate) struct ListenerSet<E> {
    listeners: Mutex<Vec<(u64, Listener<E>)>>,
    next_id: AtomicU64,
}

impl<E: 'static> ListenerSet<E> {
    fn new() -> Arc<Self> {
        Arc::new(ListenerSet {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        })
    }

    fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(&E) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));

        let set: Weak<ListenerSet<E>> = Arc::downgrade(self);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(set) = set.upgrade() {
                    set.listeners
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .retain(|(listener_id, _)| *listener_id != id);
                }
            })),
        }
    }

    fn emit(&self, event: &E) {
        // Snapshot under the lock, invoke outside it, so listeners may
        // subscribe or unsubscribe re-entrantly.
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!("serial event listener panicked");
            }
        }
    }
}

/// Handle for removing a registered listener.
///
/// Call [`unsubscribe`](Subscription::unsubscribe) to remove the listener.
/// Dropping the handle without calling it leaves the listener registered
/// for the lifetime of the manager.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Remove the listener this handle was returned for.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// The manager's event bus: one listener set per event kind.
pub(crate) struct EventBus {
    status: Arc<ListenerSet<StatusEvent>>,
    data: Arc<ListenerSet<DataEvent>>,
    log: Arc<ListenerSet<LogEntry>>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        EventBus {
            status: ListenerSet::new(),
            data: ListenerSet::new(),
            log: ListenerSet::new(),
        }
    }

    pub(crate) fn on_status(
        &self,
        listener: impl Fn(&StatusEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.status.subscribe(listener)
    }

    pub(crate) fn on_data(
        &self,
        listener: impl Fn(&DataEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.data.subscribe(listener)
    }

    pub(crate) fn on_log(
        &self,
        listener: impl Fn(&LogEntry) + Send + Sync + 'static,
    ) -> Subscription {
        self.log.subscribe(listener)
    }

    pub(crate) fn emit_status(&self, event: &StatusEvent) {
        self.status.emit(event);
    }

    pub(crate) fn emit_data(&self, event: &DataEvent) {
        self.data.emit(event);
    }

    pub(crate) fn emit_log(&self, entry: &LogEntry) {
        self.log.emit(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowlink_core::ConnectionStatus;

    fn status_event(status: ConnectionStatus) -> StatusEvent {
        StatusEvent {
            status,
            error: None,
        }
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let calls = Arc::clone(&calls);
            let _sub = bus.on_status(move |_| {
                calls.lock().unwrap().push(tag);
            });
        }

        bus.emit_status(&status_event(ConnectionStatus::Connecting));
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(0usize));

        let sub = {
            let calls = Arc::clone(&calls);
            bus.on_status(move |_| {
                *calls.lock().unwrap() += 1;
            })
        };

        bus.emit_status(&status_event(ConnectionStatus::Connecting));
        sub.unsubscribe();
        bus.emit_status(&status_event(ConnectionStatus::Connected));

        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn dropping_subscription_keeps_listener_registered() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(0usize));

        {
            let calls = Arc::clone(&calls);
            let sub = bus.on_status(move |_| {
                *calls.lock().unwrap() += 1;
            });
            drop(sub);
        }

        bus.emit_status(&status_event(ConnectionStatus::Connecting));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn panicking_listener_does_not_break_siblings() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(0usize));

        let _bad = bus.on_status(|_| panic!("listener bug"));
        let _good = {
            let calls = Arc::clone(&calls);
            bus.on_status(move |_| {
                *calls.lock().unwrap() += 1;
            })
        };

        bus.emit_status(&status_event(ConnectionStatus::Connecting));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn kinds_are_independent() {
        let bus = EventBus::new();
        let data_calls = Arc::new(Mutex::new(0usize));

        let _sub = {
            let data_calls = Arc::clone(&data_calls);
            bus.on_data(move |_| {
                *data_calls.lock().unwrap() += 1;
            })
        };

        bus.emit_status(&status_event(ConnectionStatus::Connected));
        assert_eq!(*data_calls.lock().unwrap(), 0);

        bus.emit_data(&DataEvent {
            line: "ping".into(),
            value: None,
        });
        assert_eq!(*data_calls.lock().unwrap(), 1);
    }
}
