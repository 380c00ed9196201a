use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::{error, trace};

pub type Handler = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

type Registry = HashMap<String, Vec<Handler>>;

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One-shot teardown handle. Clones share the same action; only the first
/// `dispose` runs it.
#[derive(Clone)]
pub struct Disposer {
    action: Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>,
}

impl Disposer {
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Arc::new(Mutex::new(Some(Box::new(action)))),
        }
    }

    /// Runs the teardown. Returns `false` when it already ran.
    pub fn dispose(&self) -> bool {
        let action = lock(&self.action).take();
        match action {
            Some(f) => {
                f();
                true
            }
            None => false,
        }
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.action).is_none()
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, event: &str, f: F) -> Disposer
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(f))
    }

    /// Subscribing the same `Arc` twice keeps a single registration.
    pub fn subscribe(&self, event: &str, handler: Handler) -> Disposer {
        {
            let mut registry = lock(&self.inner);
            let handlers = registry.entry(event.to_string()).or_default();
            if !handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
                handlers.push(handler.clone());
            }
        }

        let weak: Weak<Mutex<Registry>> = Arc::downgrade(&self.inner);
        let event = event.to_string();
        Disposer::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut registry = lock(&inner);
            if let Some(handlers) = registry.get_mut(&event) {
                handlers.retain(|h| !Arc::ptr_eq(h, &handler));
                if handlers.is_empty() {
                    registry.remove(&event);
                }
            }
        })
    }

    pub fn emit(&self, event: &str, data: &Value) {
        // Snapshot so handlers may (un)subscribe while we iterate.
        let handlers: Vec<Handler> = match lock(&self.inner).get(event) {
            Some(list) => list.clone(),
            None => return,
        };
        trace!(event, handlers = handlers.len(), "emit");
        for handler in handlers {
            if let Err(e) = handler(data) {
                error!(event, error = %e, "event handler failed");
            }
        }
    }

    pub fn off(&self, event: &str) {
        lock(&self.inner).remove(event);
    }

    pub fn clear(&self) {
        lock(&self.inner).clear();
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        lock(&self.inner).get(event).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = lock(&self.inner);
        f.debug_struct("EventBus")
            .field("events", &registry.keys().collect::<Vec<_>>())
            .finish()
    }
}
