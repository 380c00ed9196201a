pub mod api;
pub mod app;
pub mod config;
pub mod device;
pub mod events;
pub mod recipes;
pub mod state;
pub mod swipe;
pub mod ui;
pub mod vibes;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{FlowError, RecipeFlow, Services};
pub use config::AppConfig;
pub use events::{Disposer, EventBus};
pub use state::StateManager;
