use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::component::{Component, MountContext};
use super::dom::DomEvent;
use crate::recipes::formatter::escape;

pub const APP_RELOAD: &str = "app:reload";

#[derive(Debug, Clone, Default, Serialize)]
pub struct FatalErrorState {
    /// Logged, never shown verbatim.
    #[serde(skip)]
    pub detail: Option<String>,
    pub message: String,
}

impl FatalErrorState {
    pub fn generic() -> Self {
        Self {
            detail: None,
            message: "We hit an unexpected problem. Reloading usually fixes it.".into(),
        }
    }
}

/// Full-screen fallback for faults nothing else handled.
#[derive(Debug, Default)]
pub struct FatalErrorScreen;

impl Component for FatalErrorScreen {
    type State = FatalErrorState;

    fn name(&self) -> &'static str {
        "fatal-error"
    }

    fn render(&self, state: &FatalErrorState) -> String {
        format!(
            concat!(
                "<div class=\"fatal-error\" role=\"alert\">",
                "<h1>Something went wrong</h1>",
                "<p>{}</p>",
                "<button class=\"fatal-error-reload\" data-action=\"reload\">Reload</button>",
                "</div>"
            ),
            escape(&state.message)
        )
    }

    fn on_mount(&mut self, ctx: &mut MountContext<'_>) -> anyhow::Result<()> {
        let bus = ctx.bus().clone();
        let screen = ctx.container().clone();
        ctx.add_event_listener(
            &screen,
            "click",
            Arc::new(move |ev: &DomEvent| -> anyhow::Result<()> {
                if ev.data("action") == Some("reload") {
                    bus.emit(APP_RELOAD, &json!({}));
                }
                Ok(())
            }),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::ui::component::{ComponentHost, Mountable};
    use crate::ui::dom::Element;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn reload_control_emits_reload() {
        let bus = EventBus::new();
        let reloads = Arc::new(AtomicUsize::new(0));
        let r = reloads.clone();
        bus.on(APP_RELOAD, move |_| {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let root = Element::new("app");
        let mut host = ComponentHost::new(
            FatalErrorScreen,
            FatalErrorState {
                detail: Some("panicked at src/app.rs".into()),
                ..FatalErrorState::generic()
            },
            bus.clone(),
        )
        .with_container(root.clone());
        host.mount().expect("mount");
        assert!(root.inner_html().contains("Something went wrong"));
        assert!(!root.inner_html().contains("panicked"));

        root.dispatch(&DomEvent::click(0.0));
        root.dispatch(&DomEvent::control("click", "action", "reload", 1.0));
        assert_eq!(reloads.load(Ordering::SeqCst), 1);
    }
}
