use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::api::{
    ApiError, ApiService, Favorite, FavoritePatch, FavoritesApi, NewFavorite, ProfileApi,
};
use crate::config::AppConfig;
use crate::device::Presenter;
use crate::events::{lock, Disposer, EventBus};
use crate::recipes::prompt::generate_personalized_prompt;
use crate::recipes::{
    format, FormatOptions, FullRecipe, RecipeGenerator, RecipeSuggestion,
    RecipeSuggestionService, SuggestionError,
};
use crate::state::{
    normalize_ingredients, Preferences, StateKey, StateManager, StatePatch, FAVORITES_LIMIT,
};
use crate::swipe::{SwipeDecision, SWIPE_END};
use crate::ui::VibeCardState;
use crate::vibes::{Vibe, VibeEngine, VIBES};

pub const VIBES_COMPLETE: &str = "vibes:complete";

/// Keys cleared when a new vibe session starts.
const SESSION_KEYS: [StateKey; 5] = [
    StateKey::VibeProfile,
    StateKey::CurrentVibeRound,
    StateKey::CurrentRecipe,
    StateKey::Error,
    StateKey::IsLoading,
];

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("no vibe card is showing")]
    NoActiveVibe,

    #[error("there is no recipe to save yet")]
    NoRecipe,

    #[error(transparent)]
    Suggestion(#[from] SuggestionError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl FlowError {
    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::Api(e) | FlowError::Suggestion(SuggestionError::Generation(e)) => {
                e.is_retryable()
            }
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub generator: Arc<dyn RecipeGenerator>,
    pub favorites: Arc<dyn FavoritesApi>,
    pub profile: Arc<dyn ProfileApi>,
}

impl Services {
    pub fn from_api(api: Arc<ApiService>) -> Self {
        Self {
            generator: api.clone(),
            favorites: api.clone(),
            profile: api,
        }
    }
}

pub struct RecipeFlow {
    config: AppConfig,
    presenter: Presenter,
    state: StateManager,
    services: Services,
    vibes: VibeEngine,
    current: Option<Vibe>,
    suggestions: RecipeSuggestionService,
    selected_title: Option<String>,
    pending_swipes: Arc<Mutex<VecDeque<SwipeDecision>>>,
    swipe_binding: Option<Disposer>,
}

impl RecipeFlow {
    pub fn new(
        config: AppConfig,
        presenter: Presenter,
        state: StateManager,
        services: Services,
    ) -> Self {
        let vibes = VibeEngine::new(VIBES.clone(), config.max_vibe_rounds);
        Self::with_engine(config, presenter, state, services, vibes)
    }

    pub fn with_engine(
        config: AppConfig,
        presenter: Presenter,
        state: StateManager,
        services: Services,
        vibes: VibeEngine,
    ) -> Self {
        let suggestions =
            RecipeSuggestionService::new(services.generator.clone(), state.clone(), &config);
        Self {
            config,
            presenter,
            state,
            services,
            vibes,
            current: None,
            suggestions,
            selected_title: None,
            pending_swipes: Arc::new(Mutex::new(VecDeque::new())),
            swipe_binding: None,
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn bus(&self) -> &EventBus {
        self.state.bus()
    }

    pub fn presenter(&self) -> Presenter {
        self.presenter
    }

    #[instrument(skip(self))]
    pub fn start(&mut self) -> Option<Vibe> {
        self.vibes.reset();
        self.suggestions.clear();
        self.selected_title = None;
        lock(&self.pending_swipes).clear();
        self.state.reset(Some(&SESSION_KEYS[..]));
        self.current = self.vibes.next_vibe();
        info!(max_rounds = self.vibes.max_rounds(), "vibe session started");
        self.current.clone()
    }

    pub fn current_vibe(&self) -> Option<&Vibe> {
        self.current.as_ref()
    }

    pub fn vibes_done(&self) -> bool {
        self.current.is_none() && self.vibes.round() > 0
    }

    pub fn vibe_card_state(&self) -> VibeCardState {
        VibeCardState {
            vibe: self.current.clone(),
            round: self.vibes.round(),
            max_rounds: self.vibes.max_rounds(),
            hint: self.presenter.swipe_hint().to_string(),
        }
    }

    /// Applies one decision to the card on screen and returns the next card.
    /// A cancelled swipe keeps the same card.
    pub fn swipe(&mut self, decision: SwipeDecision) -> Result<Option<Vibe>, FlowError> {
        let Some(vibe) = self.current.take() else {
            return Err(FlowError::NoActiveVibe);
        };
        if decision == SwipeDecision::Cancelled {
            self.current = Some(vibe);
            return Ok(self.current.clone());
        }

        let (mut profile, round) =
            self.state.with_state(|s| (s.vibe_profile.clone(), s.current_vibe_round));
        let mut patch = StatePatch::new().current_vibe_round(round + 1);
        if decision == SwipeDecision::Liked {
            profile.push(vibe.clone());
            patch = patch.vibe_profile(profile);
        }
        self.state.set_state(patch, false);
        debug!(vibe = %vibe.name, decision = decision.as_str(), "vibe decided");

        self.current = self.vibes.next_vibe();
        if self.current.is_none() {
            let liked: Vec<String> =
                self.state.with_state(|s| s.vibe_profile.iter().map(|v| v.name.clone()).collect());
            info!(liked = ?liked, "vibe session complete");
            self.bus().emit(VIBES_COMPLETE, &json!({ "liked": liked }));
        }
        Ok(self.current.clone())
    }

    /// Queues every `swipe:end` decision for [`RecipeFlow::process_pending_swipes`].
    pub fn bind_swipes(&mut self) {
        if let Some(old) = self.swipe_binding.take() {
            old.dispose();
        }
        let queue = self.pending_swipes.clone();
        let binding = self.bus().on(SWIPE_END, move |data: &Value| {
            let decision = data["decision"]
                .as_str()
                .and_then(SwipeDecision::parse)
                .ok_or_else(|| anyhow::anyhow!("swipe:end without a decision: {data}"))?;
            lock(&queue).push_back(decision);
            Ok(())
        });
        self.swipe_binding = Some(binding);
    }

    pub fn unbind_swipes(&mut self) {
        if let Some(binding) = self.swipe_binding.take() {
            binding.dispose();
        }
    }

    /// Drains queued decisions. Decisions arriving after the last card are
    /// dropped.
    pub fn process_pending_swipes(&mut self) -> Option<Vibe> {
        let pending: Vec<SwipeDecision> = lock(&self.pending_swipes).drain(..).collect();
        for decision in pending {
            if let Err(e) = self.swipe(decision) {
                debug!(error = %e, "late swipe ignored");
                break;
            }
        }
        self.current.clone()
    }

    pub fn set_ingredients(&self, raw: &str) -> String {
        let normalized = normalize_ingredients(raw);
        self.state
            .set_state(StatePatch::new().ingredients_at_home(normalized.clone()), false);
        normalized
    }

    /// Applies locally first, then syncs. A failed sync keeps the local value.
    #[instrument(skip(self))]
    pub async fn set_preferences(&self, preferences: Preferences) -> Result<(), FlowError> {
        self.state
            .set_state(StatePatch::new().preferences(preferences), false);
        if self.state.with_state(|s| s.username.is_none()) {
            return Ok(());
        }
        if let Err(e) = self.services.profile.update_preferences(&preferences.into()).await {
            warn!(error = %e, "preferences sync failed");
            return Err(e.into());
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn load_profile(&self) -> Result<(), FlowError> {
        let profile = self.services.profile.me().await?;
        let mut favorites = profile.favorites;
        favorites.truncate(FAVORITES_LIMIT);
        info!(username = %profile.username, favorites = favorites.len(), "profile loaded");
        let mut patch = StatePatch::new()
            .username(Some(profile.username))
            .preferences(profile.preferences)
            .favorites(favorites);
        // empty server-side fields keep what the user already entered
        let pantry = normalize_ingredients(&profile.ingredients_at_home);
        if !pantry.is_empty() {
            patch = patch.ingredients_at_home(pantry);
        }
        if !profile.vibe_profile.is_empty() {
            patch = patch.vibe_profile(profile.vibe_profile);
        }
        self.state.set_state(patch, false);
        Ok(())
    }

    /// One-shot recipe from the liked vibes, skipping the suggestion stage.
    #[instrument(skip(self))]
    pub async fn generate_recipe(&mut self) -> Result<FullRecipe, FlowError> {
        let prompt = self.state.with_state(|s| {
            generate_personalized_prompt(&s.vibe_profile, &s.preferences, &s.ingredients_at_home)
        });
        self.begin_loading();
        let result = self
            .services
            .generator
            .generate(&prompt, self.config.api.recipe_timeout)
            .await;
        match result {
            Ok(text) => {
                let full = FullRecipe::from_text(text);
                self.selected_title = full.title().map(str::to_string);
                self.finish_with_recipe(&full);
                Ok(full)
            }
            Err(e) => Err(self.finish_with_error(e.into())),
        }
    }

    /// Never fails; falls back to built-in suggestions.
    pub async fn request_suggestions(&mut self) -> Vec<RecipeSuggestion> {
        self.begin_loading();
        self.selected_title = None;
        let list = self.suggestions.generate_suggestions().await.to_vec();
        self.state.set_state(StatePatch::new().is_loading(false), false);
        list
    }

    pub fn suggestions(&self) -> &[RecipeSuggestion] {
        self.suggestions.suggestions()
    }

    #[instrument(skip(self))]
    pub async fn select_suggestion(&mut self, id: Uuid) -> Result<FullRecipe, FlowError> {
        self.begin_loading();
        match self.suggestions.generate_full_recipe(id).await {
            Ok(full) => {
                self.selected_title = self.suggestions.get(id).map(|s| s.title.clone());
                self.finish_with_recipe(&full);
                Ok(full)
            }
            Err(e) => Err(self.finish_with_error(e.into())),
        }
    }

    fn begin_loading(&self) {
        self.state
            .set_state(StatePatch::new().is_loading(true).error(None), false);
    }

    fn finish_with_recipe(&self, full: &FullRecipe) {
        self.state.set_state(
            StatePatch::new()
                .is_loading(false)
                .current_recipe(Some(full.text.clone())),
            false,
        );
    }

    fn finish_with_error(&self, e: FlowError) -> FlowError {
        warn!(error = %e, "recipe generation failed");
        self.state.set_state(
            StatePatch::new()
                .is_loading(false)
                .error(Some(e.to_string())),
            false,
        );
        e
    }

    /// Saves the recipe on screen. The title comes from the recipe text,
    /// else from the chosen suggestion.
    #[instrument(skip(self, note))]
    pub async fn save_favorite(
        &self,
        rating: Option<u8>,
        note: Option<String>,
    ) -> Result<Favorite, FlowError> {
        let recipe_text = self
            .state
            .with_state(|s| s.current_recipe.clone())
            .ok_or(FlowError::NoRecipe)?;
        let title = format(&recipe_text, FormatOptions::default())
            .title
            .or_else(|| self.selected_title.clone())
            .unwrap_or_default();
        let favorite = NewFavorite {
            recipe_text,
            title,
            rating,
            note: note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        };
        let saved = self.services.favorites.add_favorite(&favorite).await?;
        info!(id = %saved.id, title = %saved.title, "favorite saved");
        self.state.push_favorite(saved.clone());
        Ok(saved)
    }

    pub async fn rate_favorite(&self, id: &str, rating: u8) -> Result<Favorite, FlowError> {
        crate::api::validate_rating(Some(rating))?;
        let patch = FavoritePatch {
            rating: Some(rating),
            note: None,
        };
        self.update_favorite(id, &patch).await
    }

    pub async fn annotate_favorite(&self, id: &str, note: &str) -> Result<Favorite, FlowError> {
        let patch = FavoritePatch {
            rating: None,
            note: Some(note.trim().to_string()),
        };
        self.update_favorite(id, &patch).await
    }

    async fn update_favorite(
        &self,
        id: &str,
        patch: &FavoritePatch,
    ) -> Result<Favorite, FlowError> {
        let updated = self.services.favorites.update_favorite(id, patch).await?;
        let mut favorites = self.state.with_state(|s| s.favorites.clone());
        if let Some(slot) = favorites.iter_mut().find(|f| f.id == updated.id) {
            *slot = updated.clone();
            self.state
                .set_state(StatePatch::new().favorites(favorites), false);
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn remove_favorite(&self, id: &str) -> Result<(), FlowError> {
        self.services.favorites.delete_favorite(id).await?;
        let mut favorites = self.state.with_state(|s| s.favorites.clone());
        favorites.retain(|f| f.id != id);
        self.state
            .set_state(StatePatch::new().favorites(favorites), false);
        Ok(())
    }

    pub async fn load_favorites(&self) -> Result<Vec<Favorite>, FlowError> {
        let mut favorites = self.services.favorites.list_favorites().await?;
        favorites.truncate(FAVORITES_LIMIT);
        self.state
            .set_state(StatePatch::new().favorites(favorites.clone()), false);
        Ok(favorites)
    }
}

impl Drop for RecipeFlow {
    fn drop(&mut self) {
        self.unbind_swipes();
    }
}
