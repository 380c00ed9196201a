use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::component::{Component, MountContext};
use crate::recipes::formatter::escape;
use crate::swipe::{SWIPE_END, SWIPE_MOVE};
use crate::vibes::Vibe;

const LIKE_GLOW: &str = "#4CAF50";
const DISLIKE_GLOW: &str = "#F44336";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VibeCardState {
    pub vibe: Option<Vibe>,
    /// 1-based number of the card on screen.
    pub round: u32,
    pub max_rounds: u32,
    pub hint: String,
}

/// The swipeable card. Glow follows `swipe:move` intensity and resets on
/// `swipe:end`.
#[derive(Debug, Default)]
pub struct VibeCard;

impl Component for VibeCard {
    type State = VibeCardState;

    fn name(&self) -> &'static str {
        "vibe-card"
    }

    fn render(&self, state: &VibeCardState) -> String {
        let Some(vibe) = &state.vibe else {
            return "<div class=\"vibe-card vibe-card--empty\"><p>That's every vibe. Let's cook!</p></div>"
                .to_string();
        };
        format!(
            concat!(
                "<div class=\"vibe-card\" style=\"--vibe-color: {color}\">",
                "<div class=\"vibe-progress\">{round} / {max}</div>",
                "<img class=\"vibe-image\" src=\"{image}\" alt=\"{name}\">",
                "<div class=\"vibe-emoji\">{emoji}</div>",
                "<h2 class=\"vibe-name\">{name}</h2>",
                "<p class=\"vibe-description\">{description}</p>",
                "<p class=\"vibe-hint\">{hint}</p>",
                "</div>"
            ),
            color = escape(&vibe.color),
            round = state.round,
            max = state.max_rounds,
            image = escape(&vibe.image),
            name = escape(&vibe.name),
            emoji = vibe.emoji,
            description = escape(&vibe.description),
            hint = escape(&state.hint),
        )
    }

    fn on_mount(&mut self, ctx: &mut MountContext<'_>) -> anyhow::Result<()> {
        let card = ctx.container().clone();
        ctx.subscribe(
            SWIPE_MOVE,
            Arc::new(move |data: &Value| -> anyhow::Result<()> {
                let intensity = data["intensity"].as_f64().unwrap_or(0.0);
                let glow = if data["offsetX"].as_f64().unwrap_or(0.0) >= 0.0 {
                    LIKE_GLOW
                } else {
                    DISLIKE_GLOW
                };
                card.set_style("--glow-color", glow);
                card.set_style("--glow-opacity", format!("{intensity:.2}"));
                Ok(())
            }),
        );

        let card = ctx.container().clone();
        ctx.subscribe(
            SWIPE_END,
            Arc::new(move |_: &Value| -> anyhow::Result<()> {
                card.set_style("--glow-opacity", "0");
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
    use crate::vibes::catalog;
    use serde_json::json;

    fn state(name: &str) -> VibeCardState {
        VibeCardState {
            vibe: catalog::find(name).cloned(),
            round: 2,
            max_rounds: 5,
            hint: "Swipe right to like".into(),
        }
    }

    #[test]
    fn renders_vibe_and_progress() {
        let html = VibeCard.render(&state("Cozy"));
        assert!(html.contains("<h2 class=\"vibe-name\">Cozy</h2>"));
        assert!(html.contains("2 / 5"));
        assert!(VibeCard.render(&VibeCardState::default()).contains("vibe-card--empty"));
    }

    #[test]
    fn glow_tracks_swipe_while_mounted() {
        let bus = EventBus::new();
        let root = Element::new("vibe");
        let mut host =
            ComponentHost::new(VibeCard, state("Fresh"), bus.clone()).with_container(root.clone());
        host.mount().expect("mount");

        bus.emit(SWIPE_MOVE, &json!({"offsetX": -75.0, "offsetY": 0.0, "intensity": 0.5}));
        assert_eq!(root.style("--glow-opacity").as_deref(), Some("0.50"));
        assert_eq!(root.style("--glow-color").as_deref(), Some(DISLIKE_GLOW));

        bus.emit(SWIPE_END, &json!({"decision": "cancelled"}));
        assert_eq!(root.style("--glow-opacity").as_deref(), Some("0"));

        host.unmount();
        bus.emit(SWIPE_MOVE, &json!({"offsetX": 10.0, "intensity": 0.9}));
        assert_eq!(root.style("--glow-opacity").as_deref(), Some("0"));
        assert_eq!(bus.subscriber_count(SWIPE_MOVE), 0);
    }
}
