use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub recipe_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            request_timeout: Duration::from_millis(5_000),
            recipe_timeout: Duration::from_millis(60_000),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub max_vibe_rounds: u32,
    pub state_history_limit: usize,
    pub suggestion_count: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            max_vibe_rounds: 5,
            state_history_limit: 50,
            suggestion_count: 5,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let api = ApiConfig {
            base_url: std::env::var("API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api.base_url),
            request_timeout: env_parse::<u64>("REQUEST_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.api.request_timeout),
            recipe_timeout: env_parse::<u64>("RECIPE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.api.recipe_timeout),
        };
        let config = Self {
            api,
            max_vibe_rounds: env_parse("MAX_VIBE_ROUNDS").unwrap_or(defaults.max_vibe_rounds),
            state_history_limit: env_parse("STATE_HISTORY_LIMIT")
                .unwrap_or(defaults.state_history_limit),
            suggestion_count: env_parse("SUGGESTION_COUNT").unwrap_or(defaults.suggestion_count),
        };
        anyhow::ensure!(config.max_vibe_rounds > 0, "MAX_VIBE_ROUNDS must be positive");
        anyhow::ensure!(config.suggestion_count > 0, "SUGGESTION_COUNT must be positive");
        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
