use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::formatter::{format, FormatOptions, FormattedRecipe};
use super::generator::RecipeGenerator;
use super::prompt::{generate_full_recipe_prompt, generate_suggestion_prompt};
use super::reply::{parse_suggestion_reply, SuggestionDraft, SuggestionList};
use crate::api::ApiError;
use crate::config::AppConfig;
use crate::state::{Preferences, StateManager};
use crate::vibes::Vibe;

const TITLE_ONLY_DESCRIPTION: &str = "A recipe picked just for your vibe.";

const FALLBACK_SUGGESTIONS: [(&str, &str); 2] = [
    (
        "Comforting Pasta Bake",
        "A cheesy, golden pasta bake that works with whatever you have on hand.",
    ),
    (
        "Quick Veggie Stir-Fry",
        "Crisp vegetables tossed in a savory sauce, ready in twenty minutes.",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullRecipe {
    pub text: String,
    pub formatted: FormattedRecipe,
}

impl FullRecipe {
    pub fn from_text(text: String) -> Self {
        let formatted = format(&text, FormatOptions::default());
        Self { text, formatted }
    }

    pub fn title(&self) -> Option<&str> {
        self.formatted.title.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSuggestion {
    pub id: Uuid,
    pub index: usize,
    pub title: String,
    pub description: String,
    pub full_recipe: Option<FullRecipe>,
}

#[derive(Error, Debug)]
pub enum SuggestionError {
    #[error("suggestion {0} not found")]
    NotFound(Uuid),

    #[error("recipe generation failed: {0}")]
    Generation(#[from] ApiError),
}

/// Two-stage generation: a batch of short suggestions, then one full
/// recipe per selected suggestion, cached on the suggestion.
pub struct RecipeSuggestionService {
    generator: Arc<dyn RecipeGenerator>,
    state: StateManager,
    suggestions: Vec<RecipeSuggestion>,
    count: usize,
    request_timeout: Duration,
    recipe_timeout: Duration,
}

impl RecipeSuggestionService {
    pub fn new(
        generator: Arc<dyn RecipeGenerator>,
        state: StateManager,
        config: &AppConfig,
    ) -> Self {
        Self {
            generator,
            state,
            suggestions: Vec::new(),
            count: config.suggestion_count,
            request_timeout: config.api.request_timeout,
            recipe_timeout: config.api.recipe_timeout,
        }
    }

    pub fn suggestions(&self) -> &[RecipeSuggestion] {
        &self.suggestions
    }

    pub fn get(&self, id: Uuid) -> Option<&RecipeSuggestion> {
        self.suggestions.iter().find(|s| s.id == id)
    }

    pub fn clear(&mut self) {
        self.suggestions.clear();
    }

    fn context(&self) -> (Vec<Vibe>, Preferences, String) {
        self.state.with_state(|s| {
            (
                s.vibe_profile.clone(),
                s.preferences,
                s.ingredients_at_home.clone(),
            )
        })
    }

    /// Replaces the current batch. Never fails: any generation error or
    /// unusable reply yields the built-in suggestions.
    #[instrument(skip(self))]
    pub async fn generate_suggestions(&mut self) -> &[RecipeSuggestion] {
        self.suggestions.clear();
        let (vibes, prefs, ingredients) = self.context();
        let prompt = generate_suggestion_prompt(&vibes, &prefs, &ingredients, self.count);

        let reply = match self.generator.generate(&prompt, self.request_timeout).await {
            Ok(text) => parse_suggestion_reply(&text),
            Err(e) => {
                warn!(error = %e, "suggestion generation failed; using fallback");
                SuggestionList::Fallback
            }
        };

        self.suggestions = self.records(reply);
        info!(count = self.suggestions.len(), "suggestions ready");
        &self.suggestions
    }

    fn records(&self, reply: SuggestionList) -> Vec<RecipeSuggestion> {
        let drafts: Vec<(SuggestionDraft, Option<FullRecipe>)> = match reply {
            SuggestionList::Suggestions(d) | SuggestionList::Text(d) => d
                .into_iter()
                .take(self.count)
                .map(|d| (d, None))
                .collect(),
            SuggestionList::FullRecipe(recipe) => {
                let full = FullRecipe::from_text(recipe.to_text());
                vec![(
                    SuggestionDraft {
                        title: recipe.title,
                        description: recipe.description,
                    },
                    Some(full),
                )]
            }
            SuggestionList::Title(title) => vec![(
                SuggestionDraft {
                    title,
                    description: TITLE_ONLY_DESCRIPTION.into(),
                },
                None,
            )],
            SuggestionList::Fallback => FALLBACK_SUGGESTIONS
                .iter()
                .map(|(t, d)| {
                    (
                        SuggestionDraft {
                            title: t.to_string(),
                            description: d.to_string(),
                        },
                        None,
                    )
                })
                .collect(),
        };

        drafts
            .into_iter()
            .enumerate()
            .map(|(i, (draft, full_recipe))| RecipeSuggestion {
                id: Uuid::new_v4(),
                index: i + 1,
                title: draft.title,
                description: draft.description,
                full_recipe,
            })
            .collect()
    }

    /// Returns the cached recipe when the suggestion was already expanded.
    #[instrument(skip(self))]
    pub async fn generate_full_recipe(&mut self, id: Uuid) -> Result<FullRecipe, SuggestionError> {
        let pos = self
            .suggestions
            .iter()
            .position(|s| s.id == id)
            .ok_or(SuggestionError::NotFound(id))?;

        if let Some(cached) = &self.suggestions[pos].full_recipe {
            debug!(%id, "full recipe served from cache");
            return Ok(cached.clone());
        }

        let (vibes, prefs, ingredients) = self.context();
        let prompt =
            generate_full_recipe_prompt(&self.suggestions[pos].title, &vibes, &prefs, &ingredients);
        let text = self.generator.generate(&prompt, self.recipe_timeout).await?;

        let full = FullRecipe::from_text(text);
        self.suggestions[pos].full_recipe = Some(full.clone());
        info!(%id, has_sections = !full.formatted.is_degraded(), "full recipe generated");
        Ok(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::state::StatePatch;
    use crate::testing::FakeGenerator;
    use std::collections::HashSet;

    const FIVE: &str = r#"[
        {"title": "Garlic Rice", "description": "a"},
        {"title": "Rice Pilaf", "description": "b"},
        {"title": "Congee", "description": "c"},
        {"title": "Fried Rice", "description": "d"},
        {"title": "Rice Salad", "description": "e"},
        {"title": "Sixth", "description": "f"}
    ]"#;

    fn service(generator: Arc<FakeGenerator>) -> RecipeSuggestionService {
        let state = StateManager::new(EventBus::new());
        state.set_state(StatePatch::new().ingredients_at_home("rice, garlic"), true);
        RecipeSuggestionService::new(generator, state, &AppConfig::default())
    }

    #[tokio::test]
    async fn stage_one_yields_five_unique_records() {
        let gen = Arc::new(FakeGenerator::with_replies([Ok(FIVE.to_string())]));
        let mut svc = service(gen.clone());
        let list = svc.generate_suggestions().await.to_vec();
        assert_eq!(list.len(), 5);
        let ids: HashSet<_> = list.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(list.iter().map(|s| s.index).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);

        let (prompt, timeout) = gen.last_call().expect("called");
        assert!(prompt.contains("rice, garlic"));
        assert_eq!(timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn failure_falls_back_to_builtin_list() {
        let gen = Arc::new(FakeGenerator::with_replies([Err(ApiError::Timeout(
            Duration::from_secs(5),
        ))]));
        let mut svc = service(gen);
        let list = svc.generate_suggestions().await;
        assert_eq!(list.len(), FALLBACK_SUGGESTIONS.len());
        assert_eq!(list[0].title, "Comforting Pasta Bake");
    }

    #[tokio::test]
    async fn full_recipe_is_cached_per_suggestion() {
        let recipe = "Garlic Rice\n===\nIngredients:\n• rice\nInstructions:\n1. cook";
        let gen = Arc::new(FakeGenerator::with_replies([
            Ok(FIVE.to_string()),
            Ok(recipe.to_string()),
        ]));
        let mut svc = service(gen.clone());
        let id = svc.generate_suggestions().await[0].id;

        let first = svc.generate_full_recipe(id).await.expect("recipe");
        assert_eq!(first.title(), Some("Garlic Rice"));
        let (prompt, timeout) = gen.last_call().expect("called");
        assert!(prompt.contains("\"Garlic Rice\""));
        assert_eq!(timeout, Duration::from_secs(60));

        let again = svc.generate_full_recipe(id).await.expect("cached");
        assert_eq!(again, first);
        assert_eq!(gen.call_count(), 2);
    }

    #[tokio::test]
    async fn regenerate_invalidates_old_ids() {
        let gen = Arc::new(FakeGenerator::with_replies([
            Ok(FIVE.to_string()),
            Ok(FIVE.to_string()),
        ]));
        let mut svc = service(gen);
        let stale = svc.generate_suggestions().await[0].id;
        svc.generate_suggestions().await;
        let err = svc.generate_full_recipe(stale).await.unwrap_err();
        assert!(matches!(err, SuggestionError::NotFound(id) if id == stale));
    }

    #[tokio::test]
    async fn full_recipe_reply_is_cached_immediately() {
        let reply = r#"{"title": "Stew", "ingredients": ["beef"], "instructions": ["simmer"]}"#;
        let gen = Arc::new(FakeGenerator::with_replies([Ok(reply.to_string())]));
        let mut svc = service(gen.clone());
        let list = svc.generate_suggestions().await.to_vec();
        assert_eq!(list.len(), 1);
        let full = svc.generate_full_recipe(list[0].id).await.expect("cached");
        assert_eq!(full.formatted.ingredient_lines, vec!["beef"]);
        assert_eq!(gen.call_count(), 1);
    }

    #[tokio::test]
    async fn stage_two_error_surfaces() {
        let gen = Arc::new(FakeGenerator::with_replies([
            Ok(FIVE.to_string()),
            Err(ApiError::Status {
                status: 500,
                message: "backend down".into(),
            }),
        ]));
        let mut svc = service(gen);
        let id = svc.generate_suggestions().await[1].id;
        let err = svc.generate_full_recipe(id).await.unwrap_err();
        assert!(matches!(err, SuggestionError::Generation(ApiError::Status { status: 500, .. })));
        assert!(svc.get(id).and_then(|s| s.full_recipe.as_ref()).is_none());
    }
}
