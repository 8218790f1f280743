use crate::models::{
    Ingredient, NewUser, Recipe, RecipeBrief, RecipeFilter, RecipeIngredient, RecipeList,
    RecipeRequest, ShoppingItem, ShortLink, Tag, User,
};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            _ => StorageError::Other(err.into()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    // Short links

    /// Find the mapping for a full URL
    async fn find_short_link_by_url(&self, full_url: &str) -> Result<Option<ShortLink>>;

    /// Find the mapping for a code
    async fn find_short_link(&self, code: &str) -> Result<Option<ShortLink>>;

    /// Check whether a code is already taken
    async fn short_code_exists(&self, code: &str) -> Result<bool>;

    /// Insert a mapping. Returns `Conflict` when the code or the URL is already stored.
    async fn create_short_link(&self, code: &str, full_url: &str) -> StorageResult<ShortLink>;

    // Users

    /// Create a user authenticated by the given token digest
    async fn create_user(&self, user: &NewUser, token_digest: &str) -> StorageResult<User>;

    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    async fn find_user_by_token(&self, token_digest: &str) -> Result<Option<User>>;

    /// Replace the token digest of a user. Returns false when the username is unknown.
    async fn set_user_token(&self, username: &str, token_digest: &str) -> Result<bool>;

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>>;

    // Subscriptions

    /// Returns false when the subscription already existed
    async fn subscribe(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Returns false when there was nothing to remove
    async fn unsubscribe(&self, user_id: i64, author_id: i64) -> Result<bool>;

    async fn is_subscribed(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Authors a user follows, ordered by id
    async fn list_subscriptions(&self, user_id: i64, limit: i64, offset: i64)
        -> Result<Vec<User>>;

    // Tags and ingredients

    async fn create_tag(&self, name: &str, slug: &str) -> StorageResult<Tag>;

    async fn get_tag(&self, id: i64) -> Result<Option<Tag>>;

    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Number of distinct ids among `ids` that name an existing tag
    async fn count_tags(&self, ids: &[i64]) -> Result<i64>;

    async fn create_ingredient(&self, name: &str, measurement_unit: &str)
        -> StorageResult<Ingredient>;

    async fn get_ingredient(&self, id: i64) -> Result<Option<Ingredient>>;

    /// Ingredients whose name contains `name` (case-insensitive), or all of them
    async fn search_ingredients(&self, name: Option<&str>) -> Result<Vec<Ingredient>>;

    /// Number of distinct ids among `ids` that name an existing ingredient
    async fn count_ingredients(&self, ids: &[i64]) -> Result<i64>;

    // Recipes

    /// Create a recipe with its tags and ingredient amounts in one transaction
    async fn create_recipe(&self, author_id: i64, recipe: &RecipeRequest) -> Result<Recipe>;

    /// Replace fields, tags and ingredients of a recipe. Returns None when it does not exist.
    async fn update_recipe(&self, id: i64, recipe: &RecipeRequest) -> Result<Option<Recipe>>;

    /// Delete a recipe together with everything that references it
    async fn delete_recipe(&self, id: i64) -> Result<bool>;

    async fn get_recipe(&self, id: i64) -> Result<Option<Recipe>>;

    /// Recipes matching the filter, newest first
    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>>;

    /// Newest recipes of an author in brief form; all of them when `limit` is None
    async fn author_recipes(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<RecipeBrief>>;

    async fn count_author_recipes(&self, author_id: i64) -> Result<i64>;

    async fn recipe_tags(&self, recipe_id: i64) -> Result<Vec<Tag>>;

    async fn recipe_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>>;

    // Favorites and shopping cart

    /// Returns false when the recipe was already in the list
    async fn add_to_list(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Returns false when the recipe was not in the list
    async fn remove_from_list(&self, list: RecipeList, user_id: i64, recipe_id: i64)
        -> Result<bool>;

    async fn is_in_list(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Ingredient totals over every recipe in the user's shopping cart, ordered by name
    async fn shopping_cart_totals(&self, user_id: i64) -> Result<Vec<ShoppingItem>>;
}
