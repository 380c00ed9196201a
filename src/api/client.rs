use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::dto::{
    ErrorBody, Favorite, FavoritePatch, FavoriteResponse, FavoritesResponse, GenerateRequest,
    GenerateResponse, LoginRequest, NewFavorite, OkResponse, PreferencesPatch,
    PreferencesResponse, UserProfile,
};
use super::{validate_new_favorite, validate_rating, ApiError, FavoritesApi, ProfileApi};
use crate::config::ApiConfig;
use crate::recipes::generator::RecipeGenerator;
use crate::state::Preferences;

#[derive(Clone)]
pub struct ApiService {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl ApiService {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    /// Sends the request and reads the body, both within `timeout`.
    async fn execute(&self, req: RequestBuilder, timeout: Duration) -> Result<String, ApiError> {
        let call = async {
            let res = req.send().await?;
            let status = res.status();
            let body = res.text().await?;
            if status.is_success() {
                return Ok(body);
            }
            Err(status_error(status, &body))
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "request timed out");
                Err(ApiError::Timeout(timeout))
            }
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let body = self.execute(req, timeout).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn call_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.call(self.request(method, path).json(body), self.request_timeout)
            .await
    }

    /// Sets the session cookie on success.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "username and password are required".into(),
            ));
        }
        let body = LoginRequest {
            username: username.trim(),
            password,
        };
        self.execute(
            self.request(Method::POST, "/login").json(&body),
            self.request_timeout,
        )
        .await?;
        debug!("logged in");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.execute(self.request(Method::POST, "/logout"), self.request_timeout)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.call(self.request(Method::GET, "/api/me"), self.request_timeout)
            .await
    }

    #[instrument(skip(self))]
    pub async fn preferences(&self) -> Result<Preferences, ApiError> {
        let res: PreferencesResponse = self
            .call(
                self.request(Method::GET, "/api/preferences"),
                self.request_timeout,
            )
            .await?;
        Ok(res.preferences)
    }

    #[instrument(skip(self))]
    pub async fn update_preferences(
        &self,
        patch: &PreferencesPatch,
    ) -> Result<Preferences, ApiError> {
        let res: PreferencesResponse = self
            .call_json(Method::PATCH, "/api/preferences", patch)
            .await?;
        Ok(res.preferences)
    }

    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn generate_recipe(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, ApiError> {
        let req = self
            .request(Method::POST, "/api/generateRecipe")
            .json(&GenerateRequest { prompt });
        let res: GenerateResponse = self.call(req, timeout).await?;
        Ok(res.recipe)
    }
}

#[async_trait]
impl FavoritesApi for ApiService {
    #[instrument(skip(self))]
    async fn list_favorites(&self) -> Result<Vec<Favorite>, ApiError> {
        let res: FavoritesResponse = self
            .call(
                self.request(Method::GET, "/api/favorites"),
                self.request_timeout,
            )
            .await?;
        Ok(res.favorites)
    }

    #[instrument(skip(self, favorite), fields(title = %favorite.title))]
    async fn add_favorite(&self, favorite: &NewFavorite) -> Result<Favorite, ApiError> {
        validate_new_favorite(favorite)?;
        let res: FavoriteResponse = self
            .call_json(Method::POST, "/api/favorites", favorite)
            .await?;
        Ok(res.favorite)
    }

    #[instrument(skip(self, patch))]
    async fn update_favorite(
        &self,
        id: &str,
        patch: &FavoritePatch,
    ) -> Result<Favorite, ApiError> {
        validate_rating(patch.rating)?;
        let res: FavoriteResponse = self
            .call_json(Method::PATCH, &format!("/api/favorites/{id}"), patch)
            .await?;
        Ok(res.favorite)
    }

    #[instrument(skip(self))]
    async fn delete_favorite(&self, id: &str) -> Result<(), ApiError> {
        let res: OkResponse = self
            .call(
                self.request(Method::DELETE, &format!("/api/favorites/{id}")),
                self.request_timeout,
            )
            .await?;
        if !res.ok {
            return Err(ApiError::Decode("delete was not acknowledged".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileApi for ApiService {
    async fn me(&self) -> Result<UserProfile, ApiError> {
        ApiService::me(self).await
    }

    async fn update_preferences(&self, patch: &PreferencesPatch) -> Result<Preferences, ApiError> {
        ApiService::update_preferences(self, patch).await
    }
}

#[async_trait]
impl RecipeGenerator for ApiService {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, ApiError> {
        self.generate_recipe(prompt, timeout).await
    }
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound,
        _ => {
            let message = serde_json::from_str::<ErrorBody>(body)
                .ok()
                .and_then(|b| b.message())
                .or_else(|| {
                    let text = body.trim();
                    (!text.is_empty()).then(|| text.chars().take(200).collect())
                })
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            ApiError::Status {
                status: status.as_u16(),
                message,
            }
        }
    }
}
