pub mod client;
pub mod dto;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use client::ApiService;
pub use dto::{Favorite, FavoritePatch, NewFavorite, PreferencesPatch, UserProfile};

use crate::state::Preferences;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("not authenticated")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// Failures the user can retry with "Try Again".
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout(_) | ApiError::Transport(_) | ApiError::Status { .. }
        )
    }
}

/// Favorites persistence as served by the external API.
#[async_trait]
pub trait FavoritesApi: Send + Sync {
    async fn list_favorites(&self) -> Result<Vec<Favorite>, ApiError>;
    async fn add_favorite(&self, favorite: &NewFavorite) -> Result<Favorite, ApiError>;
    async fn update_favorite(&self, id: &str, patch: &FavoritePatch)
        -> Result<Favorite, ApiError>;
    async fn delete_favorite(&self, id: &str) -> Result<(), ApiError>;
}

/// Session profile and preference sync.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn me(&self) -> Result<UserProfile, ApiError>;
    async fn update_preferences(&self, patch: &PreferencesPatch) -> Result<Preferences, ApiError>;
}

pub(crate) fn validate_new_favorite(favorite: &NewFavorite) -> Result<(), ApiError> {
    if favorite.title.trim().is_empty() {
        return Err(ApiError::Validation("recipe title is required".into()));
    }
    if favorite.recipe_text.trim().is_empty() {
        return Err(ApiError::Validation("recipe text is required".into()));
    }
    validate_rating(favorite.rating)
}

pub(crate) fn validate_rating(rating: Option<u8>) -> Result<(), ApiError> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(ApiError::Validation(format!(
            "rating must be between 1 and 5, got {r}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(None).is_ok());
        assert!(validate_rating(Some(1)).is_ok());
        assert!(validate_rating(Some(5)).is_ok());
        assert!(matches!(validate_rating(Some(0)), Err(ApiError::Validation(_))));
        assert!(matches!(validate_rating(Some(6)), Err(ApiError::Validation(_))));
    }

    #[test]
    fn favorite_requires_title_and_text() {
        let mut fav = NewFavorite {
            recipe_text: "text".into(),
            title: "  ".into(),
            rating: None,
            note: None,
        };
        assert!(validate_new_favorite(&fav).is_err());
        fav.title = "Soup".into();
        assert!(validate_new_favorite(&fav).is_ok());
        fav.recipe_text.clear();
        assert!(validate_new_favorite(&fav).is_err());
    }

    #[test]
    fn timeout_message_is_readable() {
        let e = ApiError::Timeout(Duration::from_secs(5));
        assert_eq!(e.to_string(), "request timed out after 5000ms");
        assert!(e.is_retryable());
        assert!(!ApiError::NotFound.is_retryable());
    }
}
