use crate::models::{
    Ingredient, NewUser, Recipe, RecipeBrief, RecipeFilter, RecipeIngredient, RecipeList,
    RecipeRequest, ShoppingItem, ShortLink, Tag, User,
};
use crate::storage::trait_def::unix_now;
use crate::storage::{like_contains_pattern, Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, created_at";
const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.text, r.cooking_time, r.created_at";

async fn insert_recipe_links(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    recipe: &RecipeRequest,
) -> Result<()> {
    for tag_id in &recipe.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
    }

    for item in &recipe.ingredients {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES ($1, $2, $3)",
        )
        .bind(recipe_id)
        .bind(item.id)
        .bind(item.amount)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                token_digest TEXT NOT NULL UNIQUE,
                created_at BIGINT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, author_id),
                CHECK (user_id <> author_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                slug TEXT NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS ingredients (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                measurement_unit TEXT NOT NULL,
                search_name TEXT NOT NULL,
                UNIQUE (name, measurement_unit)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS recipes (
                id BIGSERIAL PRIMARY KEY,
                author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                text TEXT NOT NULL,
                cooking_time BIGINT NOT NULL,
                created_at BIGINT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_recipes_author ON recipes(author_id)",
            r#"
            CREATE TABLE IF NOT EXISTS recipe_tags (
                recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                tag_id BIGINT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (recipe_id, tag_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS recipe_ingredients (
                recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                ingredient_id BIGINT NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
                amount BIGINT NOT NULL,
                PRIMARY KEY (recipe_id, ingredient_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS favorites (
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, recipe_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS shopping_cart (
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, recipe_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS short_links (
                id BIGSERIAL PRIMARY KEY,
                code TEXT NOT NULL UNIQUE,
                full_url TEXT NOT NULL UNIQUE,
                created_at BIGINT NOT NULL
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(self.pool.as_ref()).await?;
        }

        Ok(())
    }

    async fn find_short_link_by_url(&self, full_url: &str) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(
            "SELECT id, code, full_url, created_at FROM short_links WHERE full_url = $1",
        )
        .bind(full_url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn find_short_link(&self, code: &str) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(
            "SELECT id, code, full_url, created_at FROM short_links WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn short_code_exists(&self, code: &str) -> Result<bool> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM short_links WHERE code = $1")
                .bind(code)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(count > 0)
    }

    async fn create_short_link(&self, code: &str, full_url: &str) -> StorageResult<ShortLink> {
        let created_at = unix_now();

        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            INSERT INTO short_links (code, full_url, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            RETURNING id, code, full_url, created_at
            "#,
        )
        .bind(code)
        .bind(full_url)
        .bind(created_at)
        .fetch_optional(self.pool.as_ref())
        .await?;

        link.ok_or(StorageError::Conflict)
    }

    async fn create_user(&self, user: &NewUser, token_digest: &str) -> StorageResult<User> {
        let created_at = unix_now();

        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, token_digest, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(token_digest)
        .bind(created_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(created)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn find_user_by_token(&self, token_digest: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE token_digest = $1"
        ))
        .bind(token_digest)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn set_user_token(&self, username: &str, token_digest: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET token_digest = $1 WHERE username = $2")
            .bind(token_digest)
            .bind(username)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(users)
    }

    async fn subscribe(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(author_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn unsubscribe(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
                .bind(user_id)
                .bind(author_id)
                .execute(self.pool.as_ref())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_subscribed(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM subscriptions WHERE user_id = $1 AND author_id = $2",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count > 0)
    }

    async fn list_subscriptions(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.created_at
            FROM subscriptions s
            JOIN users u ON u.id = s.author_id
            WHERE s.user_id = $1
            ORDER BY u.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(users)
    }

    async fn create_tag(&self, name: &str, slug: &str) -> StorageResult<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(tag)
    }

    async fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(tag)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags ORDER BY name")
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(tags)
    }

    async fn count_tags(&self, ids: &[i64]) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT id) FROM tags WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn create_ingredient(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> StorageResult<Ingredient> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (name, measurement_unit, search_name)
            VALUES ($1, $2, $3)
            RETURNING id, name, measurement_unit
            "#,
        )
        .bind(name)
        .bind(measurement_unit)
        .bind(name.to_lowercase())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(ingredient)
    }

    async fn get_ingredient(&self, id: i64) -> Result<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(ingredient)
    }

    async fn search_ingredients(&self, name: Option<&str>) -> Result<Vec<Ingredient>> {
        let ingredients = match name {
            Some(fragment) => {
                sqlx::query_as::<_, Ingredient>(
                    r#"
                    SELECT id, name, measurement_unit
                    FROM ingredients
                    WHERE search_name LIKE $1 ESCAPE '\'
                    ORDER BY name, measurement_unit
                    "#,
                )
                .bind(like_contains_pattern(fragment))
                .fetch_all(self.pool.as_ref())
                .await?
            }
            None => {
                sqlx::query_as::<_, Ingredient>(
                    "SELECT id, name, measurement_unit FROM ingredients ORDER BY name, measurement_unit",
                )
                .fetch_all(self.pool.as_ref())
                .await?
            }
        };

        Ok(ingredients)
    }

    async fn count_ingredients(&self, ids: &[i64]) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT id) FROM ingredients WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn create_recipe(&self, author_id: i64, recipe: &RecipeRequest) -> Result<Recipe> {
        let created_at = unix_now();

        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (author_id, name, text, cooking_time, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, author_id, name, text, cooking_time, created_at
            "#,
        )
        .bind(author_id)
        .bind(recipe.name.trim())
        .bind(&recipe.text)
        .bind(recipe.cooking_time)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await?;

        insert_recipe_links(&mut tx, created.id, recipe).await?;
        tx.commit().await?;

        Ok(created)
    }

    async fn update_recipe(&self, id: i64, recipe: &RecipeRequest) -> Result<Option<Recipe>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Recipe>(
            r#"
            UPDATE recipes
            SET name = $1, text = $2, cooking_time = $3
            WHERE id = $4
            RETURNING id, author_id, name, text, cooking_time, created_at
            "#,
        )
        .bind(recipe.name.trim())
        .bind(&recipe.text)
        .bind(recipe.cooking_time)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_recipe_links(&mut tx, id, recipe).await?;
        tx.commit().await?;

        Ok(Some(updated))
    }

    async fn delete_recipe(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        for table in ["recipe_tags", "recipe_ingredients", "favorites", "shopping_cart"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE recipe_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_recipe(&self, id: i64) -> Result<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(recipe)
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE 1 = 1"
        ));

        if let Some(author_id) = filter.author {
            query.push(" AND r.author_id = ").push_bind(author_id);
        }

        if !filter.tags.is_empty() {
            query
                .push(
                    " AND r.id IN (SELECT rt.recipe_id FROM recipe_tags rt \
                     JOIN tags t ON t.id = rt.tag_id WHERE t.slug = ANY(",
                )
                .push_bind(filter.tags.clone())
                .push("))");
        }

        if let Some(user_id) = filter.favorited_by {
            query
                .push(" AND r.id IN (SELECT recipe_id FROM favorites WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }

        if let Some(user_id) = filter.in_cart_of {
            query
                .push(" AND r.id IN (SELECT recipe_id FROM shopping_cart WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }

        query
            .push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let recipes = query
            .build_query_as::<Recipe>()
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(recipes)
    }

    async fn author_recipes(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<RecipeBrief>> {
        // LIMIT NULL returns every row
        let recipes = sqlx::query_as::<_, RecipeBrief>(
            r#"
            SELECT id, name, cooking_time
            FROM recipes
            WHERE author_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(recipes)
    }

    async fn count_author_recipes(&self, author_id: i64) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
                .bind(author_id)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(count)
    }

    async fn recipe_tags(&self, recipe_id: i64) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name, t.slug
            FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(recipe_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(tags)
    }

    async fn recipe_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        let ingredients = sqlx::query_as::<_, RecipeIngredient>(
            r#"
            SELECT i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = $1
            ORDER BY i.name
            "#,
        )
        .bind(recipe_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(ingredients)
    }

    async fn add_to_list(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<bool> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            list.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_from_list(
        &self,
        list: RecipeList,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<bool> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            list.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_in_list(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = $1 AND recipe_id = $2",
            list.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count > 0)
    }

    async fn shopping_cart_totals(&self, user_id: i64) -> Result<Vec<ShoppingItem>> {
        let items = sqlx::query_as::<_, ShoppingItem>(
            r#"
            SELECT i.name, i.measurement_unit, SUM(ri.amount)::BIGINT AS amount
            FROM shopping_cart sc
            JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE sc.user_id = $1
            GROUP BY i.name, i.measurement_unit
            ORDER BY i.name, i.measurement_unit
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(items)
    }
}
