use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::error;

use crate::events::lock;

pub type Listener = Arc<dyn Fn(&DomEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    None,
    Mouse(Point),
    Touch {
        touches: Vec<Point>,
        changed: Vec<Point>,
    },
    Custom(Value),
}

#[derive(Debug)]
pub struct DomEvent {
    pub kind: String,
    /// Milliseconds, same clock for every event of one gesture.
    pub timestamp_ms: f64,
    pub detail: EventDetail,
    default_prevented: AtomicBool,
}

impl DomEvent {
    pub fn new(kind: impl Into<String>, timestamp_ms: f64, detail: EventDetail) -> Self {
        Self {
            kind: kind.into(),
            timestamp_ms,
            detail,
            default_prevented: AtomicBool::new(false),
        }
    }

    pub fn mouse(kind: &str, x: f64, y: f64, timestamp_ms: f64) -> Self {
        Self::new(kind, timestamp_ms, EventDetail::Mouse(Point::new(x, y)))
    }

    pub fn touch(kind: &str, x: f64, y: f64, timestamp_ms: f64) -> Self {
        let p = Point::new(x, y);
        let touches = if kind == "touchend" || kind == "touchcancel" {
            Vec::new()
        } else {
            vec![p]
        };
        Self::new(
            kind,
            timestamp_ms,
            EventDetail::Touch {
                touches,
                changed: vec![p],
            },
        )
    }

    pub fn click(timestamp_ms: f64) -> Self {
        Self::new("click", timestamp_ms, EventDetail::None)
    }

    /// Click on a control carrying `data-{key}`, e.g. `data-action="reload"`.
    pub fn control(kind: &str, key: &str, value: &str, timestamp_ms: f64) -> Self {
        Self::new(
            kind,
            timestamp_ms,
            EventDetail::Custom(serde_json::json!({ key: value })),
        )
    }

    /// Reads a `data-*` attribute of the event target.
    pub fn data(&self, key: &str) -> Option<&str> {
        match &self.detail {
            EventDetail::Custom(v) => v.get(key).and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::Relaxed);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
struct ElementInner {
    id: String,
    html: String,
    styles: BTreeMap<String, String>,
    listeners: Vec<(ListenerId, String, Listener)>,
    next_listener: u64,
}

/// Shared handle to one node; clones refer to the same node.
#[derive(Clone)]
pub struct Element {
    inner: Arc<Mutex<ElementInner>>,
}

impl Element {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ElementInner {
                id: id.into(),
                ..ElementInner::default()
            })),
        }
    }

    pub fn id(&self) -> String {
        lock(&self.inner).id.clone()
    }

    pub fn same_node(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn set_inner_html(&self, html: impl Into<String>) {
        lock(&self.inner).html = html.into();
    }

    pub fn inner_html(&self) -> String {
        lock(&self.inner).html.clone()
    }

    pub fn set_style(&self, property: &str, value: impl Into<String>) {
        lock(&self.inner)
            .styles
            .insert(property.to_string(), value.into());
    }

    pub fn style(&self, property: &str) -> Option<String> {
        lock(&self.inner).styles.get(property).cloned()
    }

    pub fn add_event_listener(&self, event: &str, listener: Listener) -> ListenerId {
        let mut inner = lock(&self.inner);
        inner.next_listener += 1;
        let id = ListenerId(inner.next_listener);
        inner.listeners.push((id, event.to_string(), listener));
        id
    }

    /// Returns `false` when the listener was already removed.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut inner = lock(&self.inner);
        let before = inner.listeners.len();
        inner.listeners.retain(|(l, _, _)| *l != id);
        inner.listeners.len() != before
    }

    pub fn listener_count(&self, event: Option<&str>) -> usize {
        let inner = lock(&self.inner);
        match event {
            Some(e) => inner.listeners.iter().filter(|(_, k, _)| k == e).count(),
            None => inner.listeners.len(),
        }
    }

    /// Invokes every listener for `event.kind`, returning how many ran.
    pub fn dispatch(&self, event: &DomEvent) -> usize {
        let listeners: Vec<Listener> = lock(&self.inner)
            .listeners
            .iter()
            .filter(|(_, k, _)| *k == event.kind)
            .map(|(_, _, l)| l.clone())
            .collect();
        for listener in &listeners {
            if let Err(e) = listener(event) {
                error!(event = %event.kind, error = %e, "dom listener failed");
            }
        }
        listeners.len()
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Element")
            .field("id", &inner.id)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn dispatch_runs_matching_listeners_only() {
        let el = Element::new("card");
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        el.add_event_listener(
            "click",
            Arc::new(move |_: &DomEvent| -> anyhow::Result<()> {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        el.add_event_listener(
            "mousedown",
            Arc::new(|_: &DomEvent| -> anyhow::Result<()> { anyhow::bail!("unused") }),
        );
        assert_eq!(el.dispatch(&DomEvent::click(0.0)), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_listener_is_idempotent() {
        let el = Element::new("card");
        let id = el.add_event_listener(
            "click",
            Arc::new(|_: &DomEvent| -> anyhow::Result<()> { Ok(()) }),
        );
        assert!(el.remove_event_listener(id));
        assert!(!el.remove_event_listener(id));
        assert_eq!(el.listener_count(None), 0);
    }

    #[test]
    fn touch_end_has_no_active_touches() {
        let ev = DomEvent::touch("touchend", 5.0, 6.0, 10.0);
        match ev.detail {
            EventDetail::Touch { touches, changed } => {
                assert!(touches.is_empty());
                assert_eq!(changed, vec![Point::new(5.0, 6.0)]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clones_share_the_node() {
        let a = Element::new("root");
        let b = a.clone();
        b.set_inner_html("<p>hi</p>");
        b.set_style("transform", "none");
        assert_eq!(a.inner_html(), "<p>hi</p>");
        assert_eq!(a.style("transform").as_deref(), Some("none"));
        assert!(a.same_node(&b));
    }
}
