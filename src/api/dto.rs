use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::state::{Diet, Flag, Preferences};
use crate::vibes::Vibe;

/// Saved recipe, owned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: String,
    pub recipe_text: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Response of `GET /api/me`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub vibe_profile: Vec<Vibe>,
    #[serde(default)]
    pub ingredients_at_home: String,
    #[serde(default)]
    pub favorites: Vec<Favorite>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

/// Request body for login.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Request body for `POST /api/favorites`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFavorite {
    pub recipe_text: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Request body for `PATCH /api/favorites/:id`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FavoritePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Request body for `PATCH /api/preferences`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diet: Option<Diet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Flag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonal_king: Option<Flag>,
}

impl From<Preferences> for PreferencesPatch {
    fn from(p: Preferences) -> Self {
        Self {
            diet: Some(p.diet),
            budget: Some(p.budget),
            seasonal_king: Some(p.seasonal_king),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub recipe: String,
}

#[derive(Debug, Deserialize)]
pub struct FavoritesResponse {
    pub favorites: Vec<Favorite>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteResponse {
    pub favorite: Favorite,
}

#[derive(Debug, Deserialize)]
pub struct PreferencesResponse {
    pub preferences: Preferences,
}

#[derive(Debug, Deserialize)]
pub struct OkResponse {
    #[serde(default)]
    pub ok: bool,
}

/// Error body surfaced by the server, e.g. `{error, details}` on a failed
/// generation.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        match (&self.error, &self.details) {
            (Some(e), Some(d)) => Some(format!("{e}: {d}")),
            (Some(e), None) => Some(e.clone()),
            (None, Some(d)) => Some(d.clone()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorite_deserializes_wire_shape() {
        let json = r#"{
            "id": "f1",
            "recipeText": "Soup\n===\nIngredients:\n• water",
            "title": "Soup",
            "rating": 4,
            "createdAt": "2024-03-01T12:00:00Z"
        }"#;
        let fav: Favorite = serde_json::from_str(json).expect("favorite");
        assert_eq!(fav.rating, Some(4));
        assert!(fav.note.is_none());
        assert_eq!(fav.created_at.year(), 2024);
    }

    #[test]
    fn profile_tolerates_missing_optional_fields() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"username": "ana"}"#).expect("profile");
        assert_eq!(profile.username, "ana");
        assert!(profile.favorites.is_empty());
        assert_eq!(profile.preferences, Preferences::default());
        assert!(profile.last_login.is_none());
    }

    #[test]
    fn new_favorite_omits_empty_annotations() {
        let body = NewFavorite {
            recipe_text: "x".into(),
            title: "X".into(),
            rating: None,
            note: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"recipeText":"x","title":"X"}"#);
    }

    #[test]
    fn error_body_message_joins_details() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error": "Generation failed", "details": "upstream 503"}"#)
                .unwrap();
        assert_eq!(body.message().as_deref(), Some("Generation failed: upstream 503"));
    }
}
