//! Synchronous in-process event bus.
//!
//! Handlers are keyed by event name and invoked in registration order on the
//! emitting thread. A failing handler (an `Err` or a panic) is logged and
//! skipped; it never reaches the emitter or the other handlers. After the
//! local handlers, the single listener-agent runner slot (if installed) sees
//! every event.
//!
//! Construct one bus per process (or per test) and pass it explicitly to the
//! engine and the listener dispatcher.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::types::LifecycleEvent;

/// Local handler, called with `(payload, event_name)`.
pub type Handler = Arc<dyn Fn(&Value, &str) -> Result<()> + Send + Sync>;

/// Listener-agent runner, called with `(event_name, payload)`.
pub type ListenerRunner = Arc<dyn Fn(&str, &Value) -> Result<()> + Send + Sync>;

/// Wrap a closure as a [`Handler`]. Keep the returned `Arc` to unsubscribe.
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Value, &str) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<String, Vec<Handler>>>,
    listener_runner: Mutex<Option<ListenerRunner>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = lock(&self.handlers);
        let counts: HashMap<&str, usize> = handlers
            .iter()
            .map(|(event, list)| (event.as_str(), list.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("handlers", &counts)
            .field("listener_runner", &lock(&self.listener_runner).is_some())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`. Registering the same `Arc` twice is a no-op.
    pub fn subscribe(&self, event: &str, handler: Handler) {
        let mut handlers = lock(&self.handlers);
        let list = handlers.entry(event.to_string()).or_default();
        if list.iter().any(|existing| Arc::ptr_eq(existing, &handler)) {
            return;
        }
        list.push(handler);
    }

    /// Remove `handler` from `event`. The event entry is dropped with its last handler.
    pub fn unsubscribe(&self, event: &str, handler: &Handler) {
        let mut handlers = lock(&self.handlers);
        let Some(list) = handlers.get_mut(event) else {
            return;
        };
        list.retain(|existing| !Arc::ptr_eq(existing, handler));
        if list.is_empty() {
            handlers.remove(event);
        }
    }

    /// Install or replace the listener-agent runner. Last writer wins.
    pub fn set_agent_listener_runner(&self, runner: ListenerRunner) {
        *lock(&self.listener_runner) = Some(runner);
    }

    pub fn handler_count(&self, event: &str) -> usize {
        lock(&self.handlers).get(event).map_or(0, Vec::len)
    }

    /// Dispatch `event` synchronously. Never fails.
    pub fn emit(&self, event: &str, payload: &Value) {
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let handlers: Vec<Handler> = lock(&self.handlers)
            .get(event)
            .cloned()
            .unwrap_or_default();
        debug!(event, handlers = handlers.len(), "emit");

        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(payload, event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(event, err = %format!("{err:#}"), "event handler failed"),
                Err(_) => warn!(event, "event handler panicked"),
            }
        }

        let runner = lock(&self.listener_runner).clone();
        if let Some(runner) = runner {
            match catch_unwind(AssertUnwindSafe(|| runner(event, payload))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(event, err = %format!("{err:#}"), "agent listener runner failed");
                }
                Err(_) => warn!(event, "agent listener runner panicked"),
            }
        }
    }

    pub fn emit_lifecycle(&self, event: LifecycleEvent, payload: &Value) {
        self.emit(event.as_str(), payload);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
