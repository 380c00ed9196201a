pub mod component;
pub mod dom;
pub mod fallback;
pub mod recipe_card;
pub mod vibe_card;

pub use component::{Component, ComponentError, ComponentHost, MountContext, Mountable};
pub use dom::{DomEvent, Element, EventDetail, Point};
pub use fallback::{FatalErrorScreen, FatalErrorState, APP_RELOAD};
pub use recipe_card::{RecipeCard, RecipeCardState, RECIPE_TOGGLE};
pub use vibe_card::{VibeCard, VibeCardState};
