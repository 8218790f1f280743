//! Integration tests for the storage layer
//!
//! Tests can be filtered by database backend using the DATABASE_BACKEND environment variable:
//! - `DATABASE_BACKEND=sqlite cargo test` - Run only SQLite tests
//! - `DATABASE_BACKEND=postgres cargo test` - Run only PostgreSQL tests (needs DATABASE_URL)
//! - By default, both backends are tested

use larder::models::{IngredientAmount, NewUser, RecipeFilter, RecipeList, RecipeRequest};
use larder::storage::{PostgresStorage, SqliteStorage, Storage, StorageError};
use std::sync::Arc;

/// Get the database backend to test from environment variable
fn should_test_backend(backend: &str) -> bool {
    match std::env::var("DATABASE_BACKEND") {
        Ok(val) => val.to_lowercase() == backend.to_lowercase(),
        Err(_) => true, // Test all backends if not specified
    }
}

async fn create_sqlite_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

async fn create_postgres_storage() -> Option<Arc<dyn Storage>> {
    let db_url = std::env::var("DATABASE_URL").ok()?;
    if !db_url.starts_with("postgres") {
        return None;
    }
    let storage = PostgresStorage::new(&db_url, 5).await.ok()?;
    storage.init().await.ok()?;
    Some(Arc::new(storage))
}

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@example.org"),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
    }
}

fn recipe_request(name: &str, tags: Vec<i64>, ingredients: &[(i64, i64)]) -> RecipeRequest {
    RecipeRequest {
        name: name.to_string(),
        text: "Mix and serve.".to_string(),
        cooking_time: 15,
        tags,
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
    }
}

fn unlimited() -> RecipeFilter {
    RecipeFilter {
        limit: 100,
        ..Default::default()
    }
}

async fn run_short_link_uniqueness(storage: Arc<dyn Storage>, suffix: &str) {
    let url = format!("https://example.org/recipes/{suffix}/");
    let code = format!("a{suffix}");

    let link = storage.create_short_link(&code, &url).await.unwrap();
    assert_eq!(link.code, code);
    assert_eq!(link.full_url, url);

    // Same code, different URL
    let result = storage
        .create_short_link(&code, &format!("{url}other"))
        .await;
    assert!(matches!(result, Err(StorageError::Conflict)));

    // Same URL, different code
    let result = storage.create_short_link(&format!("b{suffix}"), &url).await;
    assert!(matches!(result, Err(StorageError::Conflict)));

    assert!(storage.short_code_exists(&code).await.unwrap());
    assert!(!storage.short_code_exists(&format!("b{suffix}")).await.unwrap());

    let by_code = storage.find_short_link(&code).await.unwrap().unwrap();
    assert_eq!(by_code.full_url, url);
    let by_url = storage.find_short_link_by_url(&url).await.unwrap().unwrap();
    assert_eq!(by_url.code, code);

    // Codes are case-sensitive
    assert!(storage
        .find_short_link(&code.to_uppercase())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_short_link_uniqueness_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    run_short_link_uniqueness(create_sqlite_storage().await, "1").await;
}

#[tokio::test]
async fn test_short_link_uniqueness_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        return;
    };
    let suffix = format!("{}", std::process::id());
    run_short_link_uniqueness(storage, &suffix).await;
}

#[tokio::test]
async fn test_concurrent_short_link_creation_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }

    let storage = create_sqlite_storage().await;

    let mut handles = vec![];
    for i in 0..10 {
        let storage_clone = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            storage_clone
                .create_short_link(&format!("code{i}"), "https://example.org/recipes/1/")
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            // Conflicts, or lock contention on the shared in-memory database
            Err(_) => {}
        }
    }

    assert!(created <= 1, "at most one mapping per URL, got {created}");
}

#[tokio::test]
async fn test_user_token_lookup_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    let storage = create_sqlite_storage().await;

    let alice = storage
        .create_user(&new_user("alice"), "digest-1")
        .await
        .unwrap();

    let found = storage.find_user_by_token("digest-1").await.unwrap().unwrap();
    assert_eq!(found.id, alice.id);
    assert!(storage.find_user_by_token("digest-2").await.unwrap().is_none());

    let duplicate = storage.create_user(&new_user("alice"), "digest-3").await;
    assert!(matches!(duplicate, Err(StorageError::Conflict)));

    assert!(storage.set_user_token("alice", "digest-2").await.unwrap());
    assert!(storage.find_user_by_token("digest-1").await.unwrap().is_none());
    assert_eq!(
        storage
            .find_user_by_token("digest-2")
            .await
            .unwrap()
            .unwrap()
            .id,
        alice.id
    );
    assert!(!storage.set_user_token("nobody", "digest-4").await.unwrap());
}

#[tokio::test]
async fn test_subscriptions_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    let storage = create_sqlite_storage().await;

    let alice = storage.create_user(&new_user("alice"), "a").await.unwrap();
    let bob = storage.create_user(&new_user("bob"), "b").await.unwrap();
    let carol = storage.create_user(&new_user("carol"), "c").await.unwrap();

    assert!(storage.subscribe(alice.id, bob.id).await.unwrap());
    assert!(!storage.subscribe(alice.id, bob.id).await.unwrap());
    assert!(storage.subscribe(alice.id, carol.id).await.unwrap());

    assert!(storage.is_subscribed(alice.id, bob.id).await.unwrap());
    assert!(!storage.is_subscribed(bob.id, alice.id).await.unwrap());

    let authors = storage.list_subscriptions(alice.id, 10, 0).await.unwrap();
    let ids: Vec<i64> = authors.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![bob.id, carol.id]);

    let page = storage.list_subscriptions(alice.id, 1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, carol.id);

    assert!(storage.unsubscribe(alice.id, bob.id).await.unwrap());
    assert!(!storage.unsubscribe(alice.id, bob.id).await.unwrap());
}

#[tokio::test]
async fn test_ingredient_search_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    let storage = create_sqlite_storage().await;

    storage.create_ingredient("Сахар", "г").await.unwrap();
    storage.create_ingredient("сахарная пудра", "г").await.unwrap();
    storage.create_ingredient("соль", "г").await.unwrap();
    storage.create_ingredient("100% juice", "ml").await.unwrap();

    let duplicate = storage.create_ingredient("соль", "г").await;
    assert!(matches!(duplicate, Err(StorageError::Conflict)));

    let sugar = storage.search_ingredients(Some("сах")).await.unwrap();
    assert_eq!(sugar.len(), 2);

    let upper = storage.search_ingredients(Some("САХ")).await.unwrap();
    assert_eq!(upper.len(), 2);

    // Matches anywhere in the name, not only at the start
    let powdered = storage.search_ingredients(Some("ПУДР")).await.unwrap();
    assert_eq!(powdered.len(), 1);
    assert_eq!(powdered[0].name, "сахарная пудра");

    // LIKE wildcards in the search text are matched literally
    assert_eq!(storage.search_ingredients(Some("%")).await.unwrap().len(), 1);
    assert!(storage.search_ingredients(Some("_")).await.unwrap().is_empty());
    assert_eq!(storage.search_ingredients(Some("0% j")).await.unwrap().len(), 1);

    assert_eq!(storage.search_ingredients(None).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_recipe_lifecycle_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    let storage = create_sqlite_storage().await;

    let author = storage.create_user(&new_user("chef"), "chef").await.unwrap();
    let fan = storage.create_user(&new_user("fan"), "fan").await.unwrap();
    let breakfast = storage.create_tag("Breakfast", "breakfast").await.unwrap();
    let dinner = storage.create_tag("Dinner", "dinner").await.unwrap();
    let eggs = storage.create_ingredient("eggs", "pcs").await.unwrap();
    let milk = storage.create_ingredient("milk", "ml").await.unwrap();

    assert_eq!(
        storage
            .count_tags(&[breakfast.id, dinner.id, 999])
            .await
            .unwrap(),
        2
    );
    assert_eq!(storage.count_ingredients(&[]).await.unwrap(), 0);

    let recipe = storage
        .create_recipe(
            author.id,
            &recipe_request("Omelette", vec![breakfast.id], &[(eggs.id, 3), (milk.id, 50)]),
        )
        .await
        .unwrap();

    let tags = storage.recipe_tags(recipe.id).await.unwrap();
    assert_eq!(tags, vec![breakfast.clone()]);
    let ingredients = storage.recipe_ingredients(recipe.id).await.unwrap();
    assert_eq!(ingredients.len(), 2);
    assert_eq!(ingredients[0].name, "eggs");
    assert_eq!(ingredients[0].amount, 3);

    let updated = storage
        .update_recipe(
            recipe.id,
            &recipe_request("Big omelette", vec![dinner.id], &[(eggs.id, 6)]),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Big omelette");
    assert_eq!(updated.author_id, author.id);
    assert_eq!(storage.recipe_tags(recipe.id).await.unwrap(), vec![dinner]);
    assert_eq!(storage.recipe_ingredients(recipe.id).await.unwrap().len(), 1);

    assert!(storage
        .update_recipe(999, &recipe_request("Ghost", vec![breakfast.id], &[(eggs.id, 1)]))
        .await
        .unwrap()
        .is_none());

    assert!(storage
        .add_to_list(RecipeList::Favorites, fan.id, recipe.id)
        .await
        .unwrap());
    assert!(storage
        .add_to_list(RecipeList::ShoppingCart, fan.id, recipe.id)
        .await
        .unwrap());

    assert!(storage.delete_recipe(recipe.id).await.unwrap());
    assert!(!storage.delete_recipe(recipe.id).await.unwrap());
    assert!(storage.get_recipe(recipe.id).await.unwrap().is_none());
    assert!(!storage
        .is_in_list(RecipeList::Favorites, fan.id, recipe.id)
        .await
        .unwrap());
    assert!(storage.shopping_cart_totals(fan.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_recipe_filters_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    let storage = create_sqlite_storage().await;

    let alice = storage.create_user(&new_user("alice"), "a").await.unwrap();
    let bob = storage.create_user(&new_user("bob"), "b").await.unwrap();
    let breakfast = storage.create_tag("Breakfast", "breakfast").await.unwrap();
    let lunch = storage.create_tag("Lunch", "lunch").await.unwrap();
    let dinner = storage.create_tag("Dinner", "dinner").await.unwrap();
    let salt = storage.create_ingredient("salt", "g").await.unwrap();

    let porridge = storage
        .create_recipe(alice.id, &recipe_request("Porridge", vec![breakfast.id], &[(salt.id, 1)]))
        .await
        .unwrap();
    let soup = storage
        .create_recipe(alice.id, &recipe_request("Soup", vec![lunch.id, dinner.id], &[(salt.id, 5)]))
        .await
        .unwrap();
    let steak = storage
        .create_recipe(bob.id, &recipe_request("Steak", vec![dinner.id], &[(salt.id, 3)]))
        .await
        .unwrap();

    // Newest first
    let all = storage.list_recipes(&unlimited()).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![steak.id, soup.id, porridge.id]);

    let by_alice = storage
        .list_recipes(&RecipeFilter {
            author: Some(alice.id),
            ..unlimited()
        })
        .await
        .unwrap();
    assert_eq!(by_alice.len(), 2);

    // Any of the tags matches, without duplicates
    let tagged = storage
        .list_recipes(&RecipeFilter {
            tags: vec!["lunch".to_string(), "dinner".to_string()],
            ..unlimited()
        })
        .await
        .unwrap();
    let ids: Vec<i64> = tagged.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![steak.id, soup.id]);

    storage
        .add_to_list(RecipeList::Favorites, bob.id, porridge.id)
        .await
        .unwrap();
    let favorites = storage
        .list_recipes(&RecipeFilter {
            favorited_by: Some(bob.id),
            ..unlimited()
        })
        .await
        .unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, porridge.id);

    let page = storage
        .list_recipes(&RecipeFilter {
            limit: 1,
            offset: 1,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, soup.id);

    assert_eq!(storage.count_author_recipes(alice.id).await.unwrap(), 2);
    assert_eq!(storage.author_recipes(alice.id, None).await.unwrap().len(), 2);
    let latest = storage.author_recipes(alice.id, Some(1)).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, soup.id);
}

#[tokio::test]
async fn test_shopping_cart_totals_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    let storage = create_sqlite_storage().await;

    let cook = storage.create_user(&new_user("cook"), "cook").await.unwrap();
    let tag = storage.create_tag("Baking", "baking").await.unwrap();
    let flour = storage.create_ingredient("flour", "g").await.unwrap();
    let eggs = storage.create_ingredient("eggs", "pcs").await.unwrap();
    let sugar = storage.create_ingredient("sugar", "g").await.unwrap();

    let bread = storage
        .create_recipe(cook.id, &recipe_request("Bread", vec![tag.id], &[(flour.id, 500)]))
        .await
        .unwrap();
    let cake = storage
        .create_recipe(
            cook.id,
            &recipe_request("Cake", vec![tag.id], &[(flour.id, 200), (eggs.id, 4), (sugar.id, 150)]),
        )
        .await
        .unwrap();

    for recipe in [&bread, &cake] {
        assert!(storage
            .add_to_list(RecipeList::ShoppingCart, cook.id, recipe.id)
            .await
            .unwrap());
    }
    assert!(!storage
        .add_to_list(RecipeList::ShoppingCart, cook.id, cake.id)
        .await
        .unwrap());

    let totals = storage.shopping_cart_totals(cook.id).await.unwrap();
    let flat: Vec<(String, String, i64)> = totals
        .into_iter()
        .map(|item| (item.name, item.measurement_unit, item.amount))
        .collect();
    assert_eq!(
        flat,
        vec![
            ("eggs".to_string(), "pcs".to_string(), 4),
            ("flour".to_string(), "g".to_string(), 700),
            ("sugar".to_string(), "g".to_string(), 150),
        ]
    );

    assert!(storage
        .remove_from_list(RecipeList::ShoppingCart, cook.id, cake.id)
        .await
        .unwrap());
    assert!(!storage
        .remove_from_list(RecipeList::ShoppingCart, cook.id, cake.id)
        .await
        .unwrap());
    let totals = storage.shopping_cart_totals(cook.id).await.unwrap();
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].amount, 500);
}
