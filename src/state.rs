use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use time::OffsetDateTime;
use tracing::{debug, error};

use crate::api::dto::Favorite;
use crate::events::{lock, Disposer, EventBus};
use crate::vibes::Vibe;

pub const STATE_CHANGED: &str = "state:changed";
pub const FAVORITES_LIMIT: usize = 20;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diet {
    #[default]
    None,
    Vegetarian,
    Vegan,
    Pescatarian,
    #[serde(rename = "Gluten-Free")]
    GlutenFree,
    #[serde(rename = "Dairy-Free")]
    DairyFree,
    Keto,
}

impl Diet {
    pub fn label(&self) -> &'static str {
        match self {
            Diet::None => "None",
            Diet::Vegetarian => "Vegetarian",
            Diet::Vegan => "Vegan",
            Diet::Pescatarian => "Pescatarian",
            Diet::GlutenFree => "Gluten-Free",
            Diet::DairyFree => "Dairy-Free",
            Diet::Keto => "Keto",
        }
    }

    pub fn parse(s: &str) -> Option<Diet> {
        let all = [
            Diet::None,
            Diet::Vegetarian,
            Diet::Vegan,
            Diet::Pescatarian,
            Diet::GlutenFree,
            Diet::DairyFree,
            Diet::Keto,
        ];
        all.into_iter().find(|d| d.label().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    #[default]
    No,
    Yes,
}

impl Flag {
    pub fn is_set(&self) -> bool {
        matches!(self, Flag::Yes)
    }
}

impl From<bool> for Flag {
    fn from(v: bool) -> Self {
        if v {
            Flag::Yes
        } else {
            Flag::No
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub diet: Diet,
    #[serde(default)]
    pub budget: Flag,
    #[serde(default)]
    pub seasonal_king: Flag,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationState {
    pub username: Option<String>,
    pub vibe_profile: Vec<Vibe>,
    pub ingredients_at_home: String,
    pub favorites: Vec<Favorite>,
    pub preferences: Preferences,
    pub current_vibe_round: u32,
    pub is_loading: bool,
    pub error: Option<String>,
    pub current_recipe: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateKey {
    Username,
    VibeProfile,
    IngredientsAtHome,
    Favorites,
    Preferences,
    CurrentVibeRound,
    IsLoading,
    Error,
    CurrentRecipe,
}

impl StateKey {
    pub const ALL: [StateKey; 9] = [
        StateKey::Username,
        StateKey::VibeProfile,
        StateKey::IngredientsAtHome,
        StateKey::Favorites,
        StateKey::Preferences,
        StateKey::CurrentVibeRound,
        StateKey::IsLoading,
        StateKey::Error,
        StateKey::CurrentRecipe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::Username => "username",
            StateKey::VibeProfile => "vibeProfile",
            StateKey::IngredientsAtHome => "ingredientsAtHome",
            StateKey::Favorites => "favorites",
            StateKey::Preferences => "preferences",
            StateKey::CurrentVibeRound => "currentVibeRound",
            StateKey::IsLoading => "isLoading",
            StateKey::Error => "error",
            StateKey::CurrentRecipe => "currentRecipe",
        }
    }
}

/// Shallow partial update. `Some` marks a key as present in the update;
/// nullable keys use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibe_profile: Option<Vec<Vibe>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients_at_home: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorites: Option<Vec<Favorite>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_vibe_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_loading: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_recipe: Option<Option<String>>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn username(mut self, v: Option<String>) -> Self {
        self.username = Some(v);
        self
    }
    pub fn vibe_profile(mut self, v: Vec<Vibe>) -> Self {
        self.vibe_profile = Some(v);
        self
    }
    pub fn ingredients_at_home(mut self, v: impl Into<String>) -> Self {
        self.ingredients_at_home = Some(v.into());
        self
    }
    pub fn favorites(mut self, v: Vec<Favorite>) -> Self {
        self.favorites = Some(v);
        self
    }
    pub fn preferences(mut self, v: Preferences) -> Self {
        self.preferences = Some(v);
        self
    }
    pub fn current_vibe_round(mut self, v: u32) -> Self {
        self.current_vibe_round = Some(v);
        self
    }
    pub fn is_loading(mut self, v: bool) -> Self {
        self.is_loading = Some(v);
        self
    }
    pub fn error(mut self, v: Option<String>) -> Self {
        self.error = Some(v);
        self
    }
    pub fn current_recipe(mut self, v: Option<String>) -> Self {
        self.current_recipe = Some(v);
        self
    }

    pub fn defaults_for(keys: &[StateKey]) -> Self {
        let d = ApplicationState::default();
        keys.iter().fold(Self::new(), |p, key| match key {
            StateKey::Username => p.username(d.username.clone()),
            StateKey::VibeProfile => p.vibe_profile(Vec::new()),
            StateKey::IngredientsAtHome => p.ingredients_at_home(String::new()),
            StateKey::Favorites => p.favorites(Vec::new()),
            StateKey::Preferences => p.preferences(Preferences::default()),
            StateKey::CurrentVibeRound => p.current_vibe_round(0),
            StateKey::IsLoading => p.is_loading(false),
            StateKey::Error => p.error(None),
            StateKey::CurrentRecipe => p.current_recipe(None),
        })
    }

    pub fn keys(&self) -> Vec<StateKey> {
        let present = [
            self.username.is_some(),
            self.vibe_profile.is_some(),
            self.ingredients_at_home.is_some(),
            self.favorites.is_some(),
            self.preferences.is_some(),
            self.current_vibe_round.is_some(),
            self.is_loading.is_some(),
            self.error.is_some(),
            self.current_recipe.is_some(),
        ];
        StateKey::ALL
            .into_iter()
            .zip(present)
            .filter_map(|(k, p)| p.then_some(k))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub keys: Vec<StateKey>,
    pub delta: Value,
}

pub type KeyHandler = Arc<dyn Fn(&Value, &Value) -> anyhow::Result<()> + Send + Sync>;

struct Inner {
    state: ApplicationState,
    history: VecDeque<HistoryEntry>,
    history_limit: usize,
    subscribers: HashMap<StateKey, Vec<(u64, KeyHandler)>>,
    next_id: u64,
}

/// Single owner of [`ApplicationState`]. Cloning yields another handle to
/// the same state.
#[derive(Clone)]
pub struct StateManager {
    inner: Arc<Mutex<Inner>>,
    bus: EventBus,
}

impl StateManager {
    pub fn new(bus: EventBus) -> Self {
        Self::with_history_limit(bus, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(bus: EventBus, history_limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: ApplicationState::default(),
                history: VecDeque::with_capacity(history_limit),
                history_limit,
                subscribers: HashMap::new(),
                next_id: 0,
            })),
            bus,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn get_state(&self) -> ApplicationState {
        lock(&self.inner).state.clone()
    }

    pub fn get(&self, key: StateKey) -> Value {
        let inner = lock(&self.inner);
        field_value(&inner.state, key)
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&ApplicationState) -> T) -> T {
        f(&lock(&self.inner).state)
    }

    pub fn set_state(&self, patch: StatePatch, silent: bool) {
        let keys = patch.keys();
        if keys.is_empty() {
            return;
        }
        let delta = serde_json::to_value(&patch).unwrap_or(Value::Null);

        let (changes, handlers) = {
            let mut inner = lock(&self.inner);
            let old: Vec<Value> = keys.iter().map(|k| field_value(&inner.state, *k)).collect();
            apply(&mut inner.state, patch);
            let changes: Vec<(StateKey, Value, Value)> = keys
                .iter()
                .zip(old)
                .map(|(k, old)| (*k, field_value(&inner.state, *k), old))
                .collect();

            if inner.history_limit > 0 {
                while inner.history.len() >= inner.history_limit {
                    inner.history.pop_front();
                }
                inner.history.push_back(HistoryEntry {
                    at: OffsetDateTime::now_utc(),
                    keys: keys.clone(),
                    delta: delta.clone(),
                });
            }

            let handlers: HashMap<StateKey, Vec<KeyHandler>> = keys
                .iter()
                .filter_map(|k| {
                    inner
                        .subscribers
                        .get(k)
                        .map(|list| (*k, list.iter().map(|(_, h)| h.clone()).collect()))
                })
                .collect();
            (changes, handlers)
        };

        debug!(keys = ?keys, silent, "state updated");
        if silent {
            return;
        }

        for (key, new, old) in &changes {
            let Some(list) = handlers.get(key) else {
                continue;
            };
            for handler in list {
                if let Err(e) = handler(new, old) {
                    error!(key = key.as_str(), error = %e, "state subscriber failed");
                }
            }
        }
        self.bus.emit(STATE_CHANGED, &delta);
    }

    /// Calls `handler(new, old)` whenever `key` is part of an update.
    pub fn subscribe<F>(&self, key: StateKey, handler: F) -> Disposer
    where
        F: Fn(&Value, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = {
            let mut inner = lock(&self.inner);
            inner.next_id += 1;
            let id = inner.next_id;
            inner
                .subscribers
                .entry(key)
                .or_default()
                .push((id, Arc::new(handler)));
            id
        };
        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                if let Some(list) = lock(&inner).subscribers.get_mut(&key) {
                    list.retain(|(i, _)| *i != id);
                }
            }
        })
    }

    /// Restores defaults for `keys`, or for every key when `None`.
    pub fn reset(&self, keys: Option<&[StateKey]>) {
        let keys = keys.unwrap_or(&StateKey::ALL);
        self.set_state(StatePatch::defaults_for(keys), false);
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        lock(&self.inner).history.iter().cloned().collect()
    }

    pub fn push_favorite(&self, favorite: Favorite) {
        let mut favorites = self.with_state(|s| s.favorites.clone());
        favorites.retain(|f| f.id != favorite.id);
        favorites.insert(0, favorite);
        favorites.truncate(FAVORITES_LIMIT);
        self.set_state(StatePatch::new().favorites(favorites), false);
    }
}

fn apply(state: &mut ApplicationState, patch: StatePatch) {
    let StatePatch {
        username,
        vibe_profile,
        ingredients_at_home,
        favorites,
        preferences,
        current_vibe_round,
        is_loading,
        error,
        current_recipe,
    } = patch;
    if let Some(v) = username {
        state.username = v;
    }
    if let Some(v) = vibe_profile {
        state.vibe_profile = v;
    }
    if let Some(v) = ingredients_at_home {
        state.ingredients_at_home = v;
    }
    if let Some(mut v) = favorites {
        v.truncate(FAVORITES_LIMIT);
        state.favorites = v;
    }
    if let Some(v) = preferences {
        state.preferences = v;
    }
    if let Some(v) = current_vibe_round {
        state.current_vibe_round = v;
    }
    if let Some(v) = is_loading {
        state.is_loading = v;
    }
    if let Some(v) = error {
        state.error = v;
    }
    if let Some(v) = current_recipe {
        state.current_recipe = v;
    }
}

fn field_value(state: &ApplicationState, key: StateKey) -> Value {
    let v = match key {
        StateKey::Username => serde_json::to_value(&state.username),
        StateKey::VibeProfile => serde_json::to_value(&state.vibe_profile),
        StateKey::IngredientsAtHome => Ok(json!(state.ingredients_at_home)),
        StateKey::Favorites => serde_json::to_value(&state.favorites),
        StateKey::Preferences => serde_json::to_value(state.preferences),
        StateKey::CurrentVibeRound => Ok(json!(state.current_vibe_round)),
        StateKey::IsLoading => Ok(json!(state.is_loading)),
        StateKey::Error => serde_json::to_value(&state.error),
        StateKey::CurrentRecipe => serde_json::to_value(&state.current_recipe),
    };
    v.unwrap_or(Value::Null)
}

/// Splits free text on commas/newlines, trims, drops empties and
/// case-insensitive duplicates, and joins with ", ".
pub fn normalize_ingredients(raw: &str) -> String {
    let mut seen = HashSet::new();
    raw.split([',', '\n', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn delta_keys(delta: &Value) -> Vec<String> {
    delta
        .as_object()
        .map(Map::keys)
        .map(|keys| keys.cloned().collect())
        .unwrap_or_default()
}
