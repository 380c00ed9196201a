pub mod catalog;
pub mod engine;

use serde::{Deserialize, Serialize};

pub use catalog::VIBES;
pub use engine::{VibeEngine, VibeEngineState};

/// Mood/cuisine card a user accepts or rejects with a swipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vibe {
    pub name: String,
    pub emoji: String,
    pub description: String,
    /// Fragment spliced into the generation prompt.
    pub prompt: String,
    pub color: String,
    pub image: String,
}
