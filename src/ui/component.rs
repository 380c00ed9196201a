use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::dom::{Element, Listener};
use crate::events::{Disposer, EventBus, Handler};

pub const COMPONENT_MOUNTED: &str = "component:mounted";
pub const COMPONENT_STATE_CHANGED: &str = "component:state-changed";
pub const COMPONENT_UNMOUNTED: &str = "component:unmounted";

#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("{0}: no container bound")]
    NoContainer(&'static str),

    #[error("{0}: already mounted")]
    AlreadyMounted(&'static str),

    #[error("{0}: not mounted")]
    NotMounted(&'static str),

    #[error("{component}: mount hook failed: {source}")]
    Hook {
        component: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// A visual unit. `render` has no default: every component supplies its
/// own markup.
pub trait Component: Send {
    type State: Clone + Serialize + Send;

    fn name(&self) -> &'static str;

    fn render(&self, state: &Self::State) -> String;

    fn on_mount(&mut self, _ctx: &mut MountContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_unmount(&mut self) {}

    fn on_update(&mut self, _prev: &Self::State, _next: &Self::State) {}
}

/// Registration surface handed to [`Component::on_mount`]. Everything
/// registered here is torn down on unmount.
pub struct MountContext<'a> {
    container: &'a Element,
    bus: &'a EventBus,
    teardown: &'a mut Vec<Disposer>,
}

impl MountContext<'_> {
    pub fn container(&self) -> &Element {
        self.container
    }

    pub fn bus(&self) -> &EventBus {
        self.bus
    }

    pub fn add_event_listener(
        &mut self,
        element: &Element,
        event: &str,
        listener: Listener,
    ) -> Disposer {
        listen(self.teardown, element, event, listener)
    }

    pub fn subscribe(&mut self, event: &str, handler: Handler) -> Disposer {
        let d = self.bus.subscribe(event, handler);
        self.teardown.push(d.clone());
        d
    }
}

fn listen(
    teardown: &mut Vec<Disposer>,
    element: &Element,
    event: &str,
    listener: Listener,
) -> Disposer {
    let id = element.add_event_listener(event, listener);
    let el = element.clone();
    let d = Disposer::new(move || {
        el.remove_event_listener(id);
    });
    teardown.push(d.clone());
    d
}

pub trait Mountable: Send {
    fn name(&self) -> &'static str;
    fn mount(&mut self) -> Result<(), ComponentError>;
    fn unmount(&mut self);
    fn is_mounted(&self) -> bool;
}

pub struct ComponentHost<C: Component> {
    id: Uuid,
    component: C,
    state: C::State,
    container: Option<Element>,
    mounted: bool,
    children: Vec<Box<dyn Mountable>>,
    teardown: Vec<Disposer>,
    bus: EventBus,
}

impl<C: Component> ComponentHost<C> {
    pub fn new(component: C, state: C::State, bus: EventBus) -> Self {
        Self {
            id: Uuid::new_v4(),
            component,
            state,
            container: None,
            mounted: false,
            children: Vec::new(),
            teardown: Vec::new(),
            bus,
        }
    }

    pub fn with_container(mut self, container: Element) -> Self {
        self.container = Some(container);
        self
    }

    /// Rebinding only takes effect on the next mount.
    pub fn bind(&mut self, container: Element) {
        self.container = Some(container);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &C::State {
        &self.state
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn container(&self) -> Option<&Element> {
        self.container.as_ref()
    }

    pub fn add_child(&mut self, mut child: Box<dyn Mountable>) -> Result<(), ComponentError> {
        if self.mounted {
            child.mount()?;
        }
        self.children.push(child);
        Ok(())
    }

    pub fn children(&self) -> &[Box<dyn Mountable>] {
        &self.children
    }

    /// Applies `update` and re-renders. On an unmounted host this is a
    /// no-op and returns `false`.
    pub fn set_state(&mut self, update: impl FnOnce(&mut C::State)) -> bool {
        let Some(container) = self.container.as_ref().filter(|_| self.mounted) else {
            warn!(
                component = self.component.name(),
                "set_state on unmounted component ignored"
            );
            return false;
        };

        let before = self.state.clone();
        update(&mut self.state);
        container.set_inner_html(self.component.render(&self.state));

        for child in &mut self.children {
            child.unmount();
            if let Err(e) = child.mount() {
                warn!(
                    component = self.component.name(),
                    child = child.name(),
                    error = %e,
                    "child remount failed"
                );
            }
        }

        self.component.on_update(&before, &self.state);
        self.announce(
            COMPONENT_STATE_CHANGED,
            json!({
                "before": serde_json::to_value(&before).unwrap_or(Value::Null),
                "after": serde_json::to_value(&self.state).unwrap_or(Value::Null),
            }),
        );
        true
    }

    pub fn add_event_listener(
        &mut self,
        element: &Element,
        event: &str,
        listener: Listener,
    ) -> Result<Disposer, ComponentError> {
        if !self.mounted {
            return Err(ComponentError::NotMounted(self.component.name()));
        }
        Ok(listen(&mut self.teardown, element, event, listener))
    }

    pub fn subscribe(&mut self, event: &str, handler: Handler) -> Result<Disposer, ComponentError> {
        if !self.mounted {
            return Err(ComponentError::NotMounted(self.component.name()));
        }
        let d = self.bus.subscribe(event, handler);
        self.teardown.push(d.clone());
        Ok(d)
    }

    fn run_teardown(&mut self) {
        for d in self.teardown.drain(..) {
            d.dispose();
        }
    }

    fn announce(&self, event: &str, extra: Value) {
        let mut payload = json!({
            "component": self.component.name(),
            "id": self.id.to_string(),
        });
        if let (Some(obj), Value::Object(more)) = (payload.as_object_mut(), extra) {
            obj.extend(more);
        }
        self.bus.emit(event, &payload);
    }
}

impl<C: Component> Mountable for ComponentHost<C> {
    fn name(&self) -> &'static str {
        self.component.name()
    }

    fn mount(&mut self) -> Result<(), ComponentError> {
        let name = self.component.name();
        let Some(container) = self.container.clone() else {
            return Err(ComponentError::NoContainer(name));
        };
        if self.mounted {
            return Err(ComponentError::AlreadyMounted(name));
        }

        container.set_inner_html(self.component.render(&self.state));
        if let Some(err) = self.children.iter_mut().find_map(|child| child.mount().err()) {
            for child in &mut self.children {
                child.unmount();
            }
            container.set_inner_html("");
            return Err(err);
        }
        self.mounted = true;

        let mut ctx = MountContext {
            container: &container,
            bus: &self.bus,
            teardown: &mut self.teardown,
        };
        if let Err(source) = self.component.on_mount(&mut ctx) {
            self.run_teardown();
            for child in &mut self.children {
                child.unmount();
            }
            container.set_inner_html("");
            self.mounted = false;
            return Err(ComponentError::Hook {
                component: name,
                source,
            });
        }

        debug!(component = name, id = %self.id, "mounted");
        self.announce(COMPONENT_MOUNTED, Value::Null);
        Ok(())
    }

    fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.component.on_unmount();
        for child in &mut self.children {
            child.unmount();
        }
        self.run_teardown();
        if let Some(container) = &self.container {
            container.set_inner_html("");
        }
        self.mounted = false;
        debug!(component = self.component.name(), id = %self.id, "unmounted");
        self.announce(COMPONENT_UNMOUNTED, Value::Null);
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }
}

impl<C: Component> Drop for ComponentHost<C> {
    fn drop(&mut self) {
        self.unmount();
    }
}
