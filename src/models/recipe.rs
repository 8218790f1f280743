use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;

use super::UserView;

pub const RECIPE_NAME_MAX_LENGTH: usize = 150;
pub const TAG_NAME_MAX_LENGTH: usize = 50;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 150;
pub const MEASUREMENT_UNIT_MAX_LENGTH: usize = 10;
pub const MIN_AMOUNT: i64 = 1;
pub const MAX_AMOUNT: i64 = 32766;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

impl Tag {
    /// Checks a new tag's name and slug (`[-a-zA-Z0-9_]+`)
    pub fn validate_new(name: &str, slug: &str) -> Result<(), String> {
        if name.trim().is_empty() || name.chars().count() > TAG_NAME_MAX_LENGTH {
            return Err(format!(
                "Tag name must be 1-{TAG_NAME_MAX_LENGTH} characters"
            ));
        }
        let slug_ok = !slug.is_empty()
            && slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !slug_ok {
            return Err("Tag slug may only contain letters, digits, '-' and '_'".to_string());
        }
        Ok(())
    }
}

impl Ingredient {
    pub fn validate_new(name: &str, measurement_unit: &str) -> Result<(), String> {
        if name.trim().is_empty() || name.chars().count() > INGREDIENT_NAME_MAX_LENGTH {
            return Err(format!(
                "Ingredient name must be 1-{INGREDIENT_NAME_MAX_LENGTH} characters"
            ));
        }
        if measurement_unit.trim().is_empty()
            || measurement_unit.chars().count() > MEASUREMENT_UNIT_MAX_LENGTH
        {
            return Err(format!(
                "Measurement unit must be 1-{MEASUREMENT_UNIT_MAX_LENGTH} characters"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub created_at: i64,
}

/// An ingredient with the amount one recipe uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RecipeIngredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub id: i64,
    pub amount: i64,
}

/// Body of recipe create and update requests.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeRequest {
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub tags: Vec<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

impl RecipeRequest {
    /// Checks everything that does not need the database.
    /// Whether the referenced tags and ingredients exist is checked by the caller.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Recipe name cannot be empty".to_string());
        }
        if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
            return Err(format!(
                "Recipe name must be at most {RECIPE_NAME_MAX_LENGTH} characters"
            ));
        }
        if self.text.trim().is_empty() {
            return Err("Recipe text cannot be empty".to_string());
        }
        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&self.cooking_time) {
            return Err(format!(
                "Cooking time must be between {MIN_AMOUNT} and {MAX_AMOUNT} minutes"
            ));
        }

        if self.tags.is_empty() {
            return Err("At least one tag is required".to_string());
        }
        let mut seen_tags = HashSet::new();
        if !self.tags.iter().all(|id| seen_tags.insert(*id)) {
            return Err("Tags must not repeat".to_string());
        }

        if self.ingredients.is_empty() {
            return Err("At least one ingredient is required".to_string());
        }
        let mut seen_ingredients = HashSet::new();
        for item in &self.ingredients {
            if !seen_ingredients.insert(item.id) {
                return Err("Ingredients must not repeat".to_string());
            }
            if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&item.amount) {
                return Err(format!(
                    "Ingredient amount must be between {MIN_AMOUNT} and {MAX_AMOUNT}"
                ));
            }
        }

        Ok(())
    }

    pub fn ingredient_ids(&self) -> Vec<i64> {
        self.ingredients.iter().map(|item| item.id).collect()
    }
}

/// Full recipe as returned by the detail, create and update endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecipeBrief {
    pub id: i64,
    pub name: String,
    pub cooking_time: i64,
}

impl From<&Recipe> for RecipeBrief {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<i64>,
    /// Tag slugs; a recipe matches when it carries any of them
    pub tags: Vec<String>,
    pub favorited_by: Option<i64>,
    pub in_cart_of: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

/// Per-user recipe collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    pub fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping cart",
        }
    }
}

/// Total amount of one ingredient across a shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> RecipeRequest {
        RecipeRequest {
            name: "Borscht".to_string(),
            text: "Boil the beets.".to_string(),
            cooking_time: 90,
            tags: vec![1, 2],
            ingredients: vec![
                IngredientAmount { id: 1, amount: 300 },
                IngredientAmount { id: 2, amount: 2 },
            ],
        }
    }

    #[test]
    fn test_tag_validation() {
        assert!(Tag::validate_new("Завтрак", "breakfast").is_ok());
        assert!(Tag::validate_new("Lunch", "lunch_2-go").is_ok());
        assert!(Tag::validate_new("", "empty").is_err());
        assert!(Tag::validate_new("Dinner", "din ner").is_err());
        assert!(Tag::validate_new("Dinner", "ужин").is_err());
    }

    #[test]
    fn test_ingredient_validation() {
        assert!(Ingredient::validate_new("соль", "г").is_ok());
        assert!(Ingredient::validate_new("соль", "").is_err());
        assert!(Ingredient::validate_new("  ", "г").is_err());
        assert!(Ingredient::validate_new("соль", "столовых ложек").is_err());
    }

    #[test]
    fn test_valid_request() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_rejects_blank_name_and_text() {
        let mut request = valid_request();
        request.name = "   ".to_string();
        assert!(request.validate().is_err());

        let mut request = valid_request();
        request.text = String::new();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_rejects_long_name() {
        let mut request = valid_request();
        request.name = "ж".repeat(RECIPE_NAME_MAX_LENGTH);
        assert!(request.validate().is_ok());

        request.name.push('ж');
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_cooking_time_bounds() {
        let mut request = valid_request();
        request.cooking_time = 0;
        assert!(request.validate().is_err());

        request.cooking_time = MAX_AMOUNT;
        assert!(request.validate().is_ok());

        request.cooking_time = MAX_AMOUNT + 1;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_rejects_missing_or_repeated_tags() {
        let mut request = valid_request();
        request.tags.clear();
        assert!(request.validate().is_err());

        request.tags = vec![3, 3];
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_ingredients() {
        let mut request = valid_request();
        request.ingredients.clear();
        assert!(request.validate().is_err());

        let mut request = valid_request();
        request.ingredients[1].id = 1;
        assert!(request.validate().is_err());

        let mut request = valid_request();
        request.ingredients[0].amount = 0;
        assert!(request.validate().is_err());
    }
}
