use crate::state::{Diet, Preferences};
use crate::vibes::Vibe;

const FALLBACK_OPENING: &str = "Create a delicious, well-balanced recipe that anyone would enjoy.";

const RECIPE_TEMPLATE: &str = "\
Format your reply exactly like this, with no other text:
Recipe Name
===
Ingredients:
• ingredient 1
• ingredient 2
Instructions:
1. first step
2. second step";

fn opening(vibes: &[Vibe]) -> String {
    if vibes.is_empty() {
        return FALLBACK_OPENING.to_string();
    }
    let clause = vibes
        .iter()
        .map(|v| v.prompt.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(", ");
    format!("Create a recipe that feels {clause}.")
}

/// Diet, budget, seasonal and on-hand clauses, in that order.
fn context_clauses(prefs: &Preferences, ingredients_at_home: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    if prefs.diet != Diet::None {
        clauses.push(format!(
            "The recipe must be strictly {}.",
            prefs.diet.label().to_lowercase()
        ));
    }
    if prefs.budget.is_set() {
        clauses.push("Keep it budget-friendly, using affordable everyday ingredients.".into());
    }
    if prefs.seasonal_king.is_set() {
        clauses.push("Prioritize seasonal ingredients that are at their best right now.".into());
    }
    let ingredients = ingredients_at_home.trim();
    if !ingredients.is_empty() {
        clauses.push(format!(
            "Try to use these ingredients I already have at home: {ingredients}."
        ));
    }
    clauses
}

pub fn generate_personalized_prompt(
    vibes: &[Vibe],
    prefs: &Preferences,
    ingredients_at_home: &str,
) -> String {
    let mut parts = vec![opening(vibes)];
    parts.extend(context_clauses(prefs, ingredients_at_home));
    parts.push(RECIPE_TEMPLATE.to_string());
    parts.join("\n")
}

/// Stage-one prompt asking for `count` short title + description pairs as a
/// JSON array.
pub fn generate_suggestion_prompt(
    vibes: &[Vibe],
    prefs: &Preferences,
    ingredients_at_home: &str,
    count: usize,
) -> String {
    let mut parts = vec![
        format!("Suggest exactly {count} different recipe ideas."),
        opening(vibes),
    ];
    parts.extend(context_clauses(prefs, ingredients_at_home));
    parts.push(format!(
        "Reply with only a JSON array of {count} objects, each with a \"title\" \
         (at most 6 words) and a \"description\" (one sentence), like:\n\
         [{{\"title\": \"Recipe title\", \"description\": \"Why it fits.\"}}]"
    ));
    parts.join("\n")
}

/// Stage-two prompt for the full recipe of a chosen suggestion.
pub fn generate_full_recipe_prompt(
    title: &str,
    vibes: &[Vibe],
    prefs: &Preferences,
    ingredients_at_home: &str,
) -> String {
    let mut parts = vec![
        format!("Write the full recipe for \"{}\".", title.trim()),
        opening(vibes),
    ];
    parts.extend(context_clauses(prefs, ingredients_at_home));
    parts.push(RECIPE_TEMPLATE.replace("Recipe Name", title.trim()));
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::formatter::{format, FormatOptions};
    use crate::state::Flag;
    use crate::vibes::VIBES;

    #[test]
    fn empty_profile_uses_fallback_opening() {
        let p = generate_personalized_prompt(&[], &Preferences::default(), "");
        assert!(p.starts_with(FALLBACK_OPENING));
        assert!(!p.contains("strictly"));
        assert!(!p.contains("at home"));
        assert!(p.contains("Ingredients:"));
    }

    #[test]
    fn clauses_appear_in_fixed_order() {
        let prefs = Preferences {
            diet: Diet::Vegan,
            budget: Flag::Yes,
            seasonal_king: Flag::Yes,
        };
        let p = generate_personalized_prompt(&VIBES[..2], &prefs, "rice, garlic");
        let first = VIBES[0].prompt.to_lowercase();
        let second = VIBES[1].prompt.to_lowercase();
        assert!(p.contains(&format!("feels {first}, {second}.")));

        let diet = p.find("strictly vegan").expect("diet clause");
        let budget = p.find("budget-friendly").expect("budget clause");
        let seasonal = p.find("seasonal").expect("seasonal clause");
        let home = p.find("rice, garlic").expect("ingredients clause");
        let template = p.find("===").expect("template");
        assert!(diet < budget && budget < seasonal && seasonal < home && home < template);
    }

    #[test]
    fn template_is_parseable_by_formatter() {
        let p = generate_full_recipe_prompt("Garlic Rice", &[], &Preferences::default(), "");
        let template = &p[p.find("Garlic Rice\n===").expect("template title")..];
        let r = format(template, FormatOptions::default());
        assert_eq!(r.title.as_deref(), Some("Garlic Rice"));
        assert_eq!(r.ingredient_lines, vec!["ingredient 1", "ingredient 2"]);
        assert_eq!(r.instruction_lines, vec!["first step", "second step"]);
    }

    #[test]
    fn suggestion_prompt_requests_json() {
        let p = generate_suggestion_prompt(&VIBES[..1], &Preferences::default(), "eggs", 5);
        assert!(p.starts_with("Suggest exactly 5"));
        assert!(p.contains("JSON array of 5 objects"));
        assert!(p.contains("eggs"));
        assert!(p.contains(&VIBES[0].prompt.to_lowercase()));
    }
}
