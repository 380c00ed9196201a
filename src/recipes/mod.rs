pub mod formatter;
pub mod generator;
pub mod prompt;
pub mod reply;
pub mod suggestions;

pub use formatter::{format, FormatOptions, FormattedRecipe};
pub use generator::RecipeGenerator;
pub use suggestions::{FullRecipe, RecipeSuggestion, RecipeSuggestionService, SuggestionError};
