use std::time::Duration;

use async_trait::async_trait;

use crate::api::ApiError;

/// Prompt-in/text-out generation backend.
#[async_trait]
pub trait RecipeGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, ApiError>;
}
