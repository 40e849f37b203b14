use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::{Error, HtmlError, QueryError},
    form::SubscriptionFilter,
    jwt::SessionData,
    pagination::{Page, PageRequest},
    schema::{AuthorRecipe, Id, ShortRecipe, Subscription, SubscriptionRow, UserProfile},
    validation::validate_follow,
};

use super::get_user_by_id;

pub async fn is_following(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result: Option<(Id,)> =
        sqlx::query_as("SELECT id FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(result.is_some())
}

/// Subscribes the session user to `author_id`. Returns the author with a
/// preview of `filter.recipes_limit` of their recipes.
pub async fn follow_user(
    session: &SessionData,
    author_id: Id,
    filter: &SubscriptionFilter,
    pool: &Pool<Postgres>,
) -> Result<Subscription, Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let user_id = session.user_id;
    validate_follow(user_id, author_id)?;

    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(HtmlError::NotFound.new("No user exists with specified id"));
    }

    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING *;",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("You already follow this user"));
    }

    log::debug!("User {user_id} followed {author_id}");

    let page = list_subscriptions_of(
        user_id,
        Some(author_id),
        filter.recipes_limit,
        PageRequest::default(),
        pool,
    )
    .await?;
    page.results
        .into_iter()
        .next()
        .ok_or_else(|| HtmlError::NotFound.new("No user exists with specified id"))
}

pub async fn unfollow_user(
    session: &SessionData,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("You don't follow this user"));
    }

    Ok(())
}

/// Authors the session user follows, each with up to
/// `filter.recipes_limit` of their newest recipes.
pub async fn list_subscriptions(
    session: &SessionData,
    filter: &SubscriptionFilter,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Page<Subscription>, Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    list_subscriptions_of(session.user_id, None, filter.recipes_limit, page, pool).await
}

async fn list_subscriptions_of(
    user_id: Id,
    author_id: Option<Id>,
    recipes_limit: i64,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Page<Subscription>, Error> {
    let rows: Vec<SubscriptionRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
            COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1 AND ($2::INTEGER IS NULL OR f.author_id = $2)
        ORDER BY u.username
        LIMIT $3 OFFSET $4
    ",
    )
    .bind(user_id)
    .bind(author_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let author_ids: Vec<Id> = rows.iter().map(|r| r.id).collect();

    let recipes: Vec<AuthorRecipe> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time FROM (
            SELECT r.author_id, r.id, r.name, r.image, r.cooking_time,
                ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE position <= $2
        ORDER BY author_id, position
    ",
    )
    .bind(&author_ids)
    .bind(recipes_limit.max(0))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut previews: HashMap<Id, Vec<ShortRecipe>> = HashMap::new();
    for recipe in recipes {
        previews
            .entry(recipe.author_id)
            .or_default()
            .push(recipe.into());
    }

    let subscriptions = rows
        .into_iter()
        .map(|row| Subscription {
            recipes: previews.remove(&row.id).unwrap_or_default(),
            recipes_count: row.recipes_count,
            author: UserProfile {
                id: row.id,
                email: row.email,
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
                is_subscribed: true,
            },
        })
        .collect();

    Page::from_rows(subscriptions, total_count, page)
}
