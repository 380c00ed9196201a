use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::api::{
    ApiError, Favorite, FavoritePatch, FavoritesApi, NewFavorite, PreferencesPatch, ProfileApi,
    UserProfile,
};
use crate::events::lock;
use crate::recipes::RecipeGenerator;
use crate::state::Preferences;

#[derive(Default)]
pub struct FakeGenerator {
    replies: Mutex<VecDeque<Result<String, ApiError>>>,
    calls: Mutex<Vec<(String, Duration)>>,
}

impl FakeGenerator {
    pub fn with_replies(replies: impl IntoIterator<Item = Result<String, ApiError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, reply: Result<String, ApiError>) {
        lock(&self.replies).push_back(reply);
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn last_call(&self) -> Option<(String, Duration)> {
        lock(&self.calls).last().cloned()
    }
}

#[async_trait]
impl RecipeGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, ApiError> {
        lock(&self.calls).push((prompt.to_string(), timeout));
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Decode("no scripted reply".into())))
    }
}

#[derive(Default)]
pub struct FakeFavorites {
    items: Mutex<Vec<Favorite>>,
    next_id: Mutex<u32>,
}

impl FakeFavorites {
    pub fn stored(&self) -> Vec<Favorite> {
        lock(&self.items).clone()
    }
}

#[async_trait]
impl FavoritesApi for FakeFavorites {
    async fn list_favorites(&self) -> Result<Vec<Favorite>, ApiError> {
        Ok(self.stored())
    }

    async fn add_favorite(&self, favorite: &NewFavorite) -> Result<Favorite, ApiError> {
        crate::api::validate_new_favorite(favorite)?;
        let id = {
            let mut next = lock(&self.next_id);
            *next += 1;
            format!("fav-{}", *next)
        };
        let saved = Favorite {
            id,
            recipe_text: favorite.recipe_text.clone(),
            title: favorite.title.clone(),
            rating: favorite.rating,
            note: favorite.note.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        let mut items = lock(&self.items);
        items.insert(0, saved.clone());
        items.truncate(crate::state::FAVORITES_LIMIT);
        Ok(saved)
    }

    async fn update_favorite(&self, id: &str, patch: &FavoritePatch) -> Result<Favorite, ApiError> {
        let mut items = lock(&self.items);
        let fav = items
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(ApiError::NotFound)?;
        if patch.rating.is_some() {
            fav.rating = patch.rating;
        }
        if patch.note.is_some() {
            fav.note = patch.note.clone();
        }
        Ok(fav.clone())
    }

    async fn delete_favorite(&self, id: &str) -> Result<(), ApiError> {
        let mut items = lock(&self.items);
        let before = items.len();
        items.retain(|f| f.id != id);
        if items.len() == before {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}

/// Profile endpoint stand-in. `me` fails with `Unauthorized` until a
/// profile is set.
#[derive(Default)]
pub struct FakeProfile {
    profile: Mutex<Option<UserProfile>>,
    patches: Mutex<Vec<PreferencesPatch>>,
}

impl FakeProfile {
    pub fn signed_in(profile: UserProfile) -> Self {
        Self {
            profile: Mutex::new(Some(profile)),
            patches: Mutex::new(Vec::new()),
        }
    }

    pub fn patch_count(&self) -> usize {
        lock(&self.patches).len()
    }
}

#[async_trait]
impl ProfileApi for FakeProfile {
    async fn me(&self) -> Result<UserProfile, ApiError> {
        lock(&self.profile).clone().ok_or(ApiError::Unauthorized)
    }

    async fn update_preferences(&self, patch: &PreferencesPatch) -> Result<Preferences, ApiError> {
        lock(&self.patches).push(patch.clone());
        let mut profile = lock(&self.profile);
        let profile = profile.as_mut().ok_or(ApiError::Unauthorized)?;
        if let Some(diet) = patch.diet {
            profile.preferences.diet = diet;
        }
        if let Some(budget) = patch.budget {
            profile.preferences.budget = budget;
        }
        if let Some(seasonal) = patch.seasonal_king {
            profile.preferences.seasonal_king = seasonal;
        }
        Ok(profile.preferences)
    }
}
