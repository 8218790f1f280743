mod recipe;
mod short_link;
mod user;

pub use recipe::{
    Ingredient, IngredientAmount, Recipe, RecipeBrief, RecipeFilter, RecipeIngredient,
    RecipeList, RecipeRequest, RecipeView, ShoppingItem, Tag, MAX_AMOUNT, MIN_AMOUNT,
    RECIPE_NAME_MAX_LENGTH,
};
pub use short_link::{ShortLink, ShortLinkResponse};
pub use user::{NewUser, SubscriptionView, User, UserView};
