use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::component::{Component, MountContext};
use super::dom::DomEvent;
use crate::recipes::{format, FormatOptions};

pub const RECIPE_TOGGLE: &str = "recipe:toggle";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeCardState {
    pub recipe: String,
    pub hide_title: bool,
    pub show_ingredients: bool,
    pub show_instructions: bool,
}

impl RecipeCardState {
    pub fn new(recipe: impl Into<String>) -> Self {
        Self {
            recipe: recipe.into(),
            hide_title: false,
            show_ingredients: true,
            show_instructions: true,
        }
    }

    /// Flips a section's visibility. A recipe without sections has nothing
    /// to toggle.
    pub fn toggle(&mut self, section: &str) -> bool {
        if format(&self.recipe, FormatOptions::default()).is_degraded() {
            return false;
        }
        match section {
            "ingredients" => self.show_ingredients = !self.show_ingredients,
            "instructions" => self.show_instructions = !self.show_instructions,
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Default)]
pub struct RecipeCard;

impl Component for RecipeCard {
    type State = RecipeCardState;

    fn name(&self) -> &'static str {
        "recipe-card"
    }

    fn render(&self, state: &RecipeCardState) -> String {
        let formatted = format(
            &state.recipe,
            FormatOptions {
                hide_title: state.hide_title,
            },
        );
        if formatted.is_degraded() {
            return format!(
                "<div class=\"recipe-card recipe-card--plain\">{}</div>",
                formatted.html
            );
        }

        let mut classes = String::from("recipe-card");
        if !state.show_ingredients {
            classes.push_str(" recipe-card--hide-ingredients");
        }
        if !state.show_instructions {
            classes.push_str(" recipe-card--hide-instructions");
        }

        let mut toggles = String::from("<div class=\"recipe-toggles\">");
        if formatted.has_ingredients {
            toggles.push_str(&toggle_button("ingredients", "Ingredients", state.show_ingredients));
        }
        if formatted.has_instructions {
            toggles.push_str(&toggle_button(
                "instructions",
                "Instructions",
                state.show_instructions,
            ));
        }
        toggles.push_str("</div>");

        format!("<div class=\"{classes}\">{toggles}{}</div>", formatted.html)
    }

    fn on_mount(&mut self, ctx: &mut MountContext<'_>) -> anyhow::Result<()> {
        let bus = ctx.bus().clone();
        let card = ctx.container().clone();
        ctx.add_event_listener(
            &card,
            "click",
            Arc::new(move |ev: &DomEvent| -> anyhow::Result<()> {
                if let Some(section) = ev.data("toggle") {
                    bus.emit(RECIPE_TOGGLE, &json!({ "section": section }));
                }
                Ok(())
            }),
        );
        Ok(())
    }
}

fn toggle_button(section: &str, label: &str, pressed: bool) -> String {
    format!(
        "<button class=\"recipe-toggle\" data-toggle=\"{section}\" aria-pressed=\"{pressed}\">{label}</button>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{lock, EventBus};
    use crate::ui::component::{ComponentHost, Mountable};
    use crate::ui::dom::Element;
    use std::sync::Mutex;

    const RECIPE: &str = "Garlic Rice\n===\nIngredients:\n• rice\n• garlic\nInstructions:\n1. fry garlic\n2. add rice";

    #[test]
    fn sectioned_recipe_gets_toggles() {
        let html = RecipeCard.render(&RecipeCardState::new(RECIPE));
        assert!(html.contains("data-toggle=\"ingredients\""));
        assert!(html.contains("data-toggle=\"instructions\""));
        assert!(html.contains("<h2 class=\"recipe-title\">Garlic Rice</h2>"));
    }

    #[test]
    fn degraded_recipe_has_no_toggles() {
        let mut state = RecipeCardState::new("Just boil some pasta & eat it.");
        let html = RecipeCard.render(&state);
        assert_eq!(
            html,
            "<div class=\"recipe-card recipe-card--plain\"><p>Just boil some pasta &amp; eat it.</p></div>"
        );
        assert!(!state.toggle("ingredients"));
    }

    #[test]
    fn toggle_hides_section_on_rerender() {
        let bus = EventBus::new();
        let root = Element::new("recipe");
        let mut host = ComponentHost::new(RecipeCard, RecipeCardState::new(RECIPE), bus.clone())
            .with_container(root.clone());
        host.mount().expect("mount");

        let toggled = Arc::new(Mutex::new(Vec::new()));
        let toggled_in = toggled.clone();
        bus.on(RECIPE_TOGGLE, move |v| {
            lock(&toggled_in).push(v["section"].as_str().unwrap_or_default().to_string());
            Ok(())
        });
        root.dispatch(&DomEvent::control("click", "toggle", "ingredients", 0.0));
        root.dispatch(&DomEvent::click(1.0));

        let sections = lock(&toggled).clone();
        assert_eq!(sections, vec!["ingredients"]);
        host.set_state(|s| {
            s.toggle(&sections[0]);
        });
        assert!(root.inner_html().contains("recipe-card--hide-ingredients"));
        assert!(root.inner_html().contains("aria-pressed=\"false\""));
    }
}
