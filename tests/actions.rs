//! Actions against a real Postgres database. Skipped without `DATABASE_URL`.

mod support;

use foodgram_sdk::{
    actions::{
        add_to_favorites, add_to_shopping_cart, delete_recipe, download_shopping_cart,
        follow_user, get_recipe_detail, is_favorite, is_in_shopping_cart, list_subscriptions,
        list_users, remove_from_favorites, unfollow_user, update_recipe,
    },
    form::SubscriptionFilter,
    pagination::PageRequest,
};
use support::{count, ingredient, recipe, recipe_form, test_database, user};

#[tokio::test]
async fn duplicate_favorite_and_cart_entries_are_rejected() {
    let Some(db) = test_database().await else {
        return;
    };
    let pool = &db.pool;

    let cook = user(pool, "cook").await;
    let flour = ingredient(pool, "flour", "g").await;
    let bread = recipe(pool, &cook, "Bread", &[(flour, 500)]).await;

    let short = add_to_favorites(bread.id, &cook, pool).await.unwrap();
    assert_eq!(short.name, "Bread");
    assert_eq!(add_to_favorites(bread.id, &cook, pool).await.unwrap_err().code, 400);
    assert!(is_favorite(cook.user_id, bread.id, pool).await.unwrap());

    add_to_shopping_cart(bread.id, &cook, pool).await.unwrap();
    assert_eq!(add_to_shopping_cart(bread.id, &cook, pool).await.unwrap_err().code, 400);

    remove_from_favorites(bread.id, &cook, pool).await.unwrap();
    assert_eq!(remove_from_favorites(bread.id, &cook, pool).await.unwrap_err().code, 400);
    assert_eq!(add_to_favorites(bread.id + 1000, &cook, pool).await.unwrap_err().code, 404);

    db.close().await;
}

#[tokio::test]
async fn duplicate_and_self_follows_are_rejected() {
    let Some(db) = test_database().await else {
        return;
    };
    let pool = &db.pool;

    let reader = user(pool, "reader").await;
    let author = user(pool, "author").await;
    let flour = ingredient(pool, "flour", "g").await;
    recipe(pool, &author, "Bread", &[(flour, 500)]).await;
    recipe(pool, &author, "Buns", &[(flour, 300)]).await;

    let filter = SubscriptionFilter { recipes_limit: 1 };
    let subscription = follow_user(&reader, author.user_id, &filter, pool).await.unwrap();
    assert_eq!(subscription.recipes_count, 2);
    assert_eq!(subscription.recipes.len(), 1);
    assert!(subscription.author.is_subscribed);

    assert_eq!(follow_user(&reader, author.user_id, &filter, pool).await.unwrap_err().code, 400);
    assert_eq!(follow_user(&reader, reader.user_id, &filter, pool).await.unwrap_err().code, 400);
    assert_eq!(follow_user(&reader, author.user_id + 1000, &filter, pool).await.unwrap_err().code, 404);

    let page = list_subscriptions(&reader, &filter, PageRequest::default(), pool).await.unwrap();
    assert_eq!(page.count, 1);

    unfollow_user(&reader, author.user_id, pool).await.unwrap();
    assert_eq!(unfollow_user(&reader, author.user_id, pool).await.unwrap_err().code, 400);

    db.close().await;
}

#[tokio::test]
async fn deleting_a_recipe_cascades_to_its_links() {
    let Some(db) = test_database().await else {
        return;
    };
    let pool = &db.pool;

    let cook = user(pool, "cook").await;
    let flour = ingredient(pool, "flour", "g").await;
    let bread = recipe(pool, &cook, "Bread", &[(flour, 500)]).await;
    add_to_favorites(bread.id, &cook, pool).await.unwrap();
    add_to_shopping_cart(bread.id, &cook, pool).await.unwrap();

    let stranger = user(pool, "stranger").await;
    assert_eq!(delete_recipe(bread.id, &stranger, pool).await.unwrap_err().code, 403);

    delete_recipe(bread.id, &cook, pool).await.unwrap();

    assert_eq!(count(pool, "recipe_ingredients", bread.id).await, 0);
    assert_eq!(count(pool, "favorite_recipes", bread.id).await, 0);
    assert_eq!(count(pool, "shopping_cart", bread.id).await, 0);
    assert_eq!(get_recipe_detail(bread.id, None, pool).await.unwrap_err().code, 404);

    db.close().await;
}

#[tokio::test]
async fn update_replaces_ingredients_atomically() {
    let Some(db) = test_database().await else {
        return;
    };
    let pool = &db.pool;

    let cook = user(pool, "cook").await;
    let flour = ingredient(pool, "flour", "g").await;
    let milk = ingredient(pool, "milk", "ml").await;
    let pancakes = recipe(pool, &cook, "Pancakes", &[(flour, 200)]).await;

    let updated = update_recipe(pancakes.id, recipe_form("Pancakes", &[(milk, 300)]), &cook, pool)
        .await
        .unwrap();
    assert_eq!(updated.ingredients.len(), 1);
    assert_eq!(updated.ingredients[0].id, milk);
    assert_eq!(updated.ingredients[0].amount, 300);

    let error = update_recipe(
        pancakes.id,
        recipe_form("Crepes", &[(flour, 100), (milk + 1000, 1)]),
        &cook,
        pool,
    )
    .await
    .unwrap_err();
    assert_eq!(error.code, 404);

    let unchanged = get_recipe_detail(pancakes.id, None, pool).await.unwrap();
    assert_eq!(unchanged.name, "Pancakes");
    assert_eq!(unchanged.ingredients, updated.ingredients);

    db.close().await;
}

#[tokio::test]
async fn download_sums_cart_and_clears_listed_recipes() {
    let Some(db) = test_database().await else {
        return;
    };
    let pool = &db.pool;

    let cook = user(pool, "cook").await;
    let flour = ingredient(pool, "flour", "g").await;
    let egg = ingredient(pool, "egg", "pcs").await;
    let bread = recipe(pool, &cook, "Bread", &[(flour, 200)]).await;
    let cake = recipe(pool, &cook, "Cake", &[(flour, 100), (egg, 3)]).await;
    add_to_shopping_cart(bread.id, &cook, pool).await.unwrap();
    add_to_shopping_cart(cake.id, &cook, pool).await.unwrap();

    let list = download_shopping_cart(&cook, false, pool).await.unwrap();
    assert_eq!(list.recipe_count(), 2);
    assert_eq!(list.total("flour", "g"), Some(300));
    assert_eq!(list.total("egg", "pcs"), Some(3));
    assert!(is_in_shopping_cart(cook.user_id, bread.id, pool).await.unwrap());

    download_shopping_cart(&cook, true, pool).await.unwrap();
    assert!(!is_in_shopping_cart(cook.user_id, bread.id, pool).await.unwrap());
    assert!(download_shopping_cart(&cook, false, pool).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn page_past_the_end_is_not_found() {
    let Some(db) = test_database().await else {
        return;
    };
    let pool = &db.pool;

    let cook = user(pool, "cook").await;
    user(pool, "baker").await;

    let page = list_users(pool, Some(cook.user_id), PageRequest::new(1, 6)).await.unwrap();
    assert_eq!(page.count, 2);

    let error = list_users(pool, None, PageRequest::new(5, 6)).await.unwrap_err();
    assert_eq!(error.code, 404);

    db.close().await;
}
