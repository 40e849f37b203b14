use std::collections::BTreeSet;

use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::{Error, QueryError},
    jwt::SessionData,
    schema::{CartIngredientRow, Id},
    shopping_list::ShoppingList,
};

/// Every ingredient row of every recipe in the user's cart. Recipes without
/// ingredients produce a single row with empty ingredient columns.
pub async fn list_cart_ingredients(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartIngredientRow>, Error> {
    let rows: Vec<CartIngredientRow> = sqlx::query_as(
        "
        SELECT r.id AS recipe_id, r.name AS recipe_name,
            i.name, i.measurement_unit, ri.amount
        FROM shopping_cart s
        INNER JOIN recipes r ON r.id = s.recipe_id
        LEFT JOIN recipe_ingredients ri ON ri.recipe_id = r.id
        LEFT JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE s.user_id = $1
        ORDER BY s.id, i.name
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Builds the consolidated shopping list for the session's cart. With
/// `clear` set, the recipes that went into the list are removed from the
/// cart; recipes added meanwhile stay.
pub async fn download_shopping_cart(
    session: &SessionData,
    clear: bool,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, Error> {
    session.authenticate(ActionType::ManageOwnCart)?;

    let rows = list_cart_ingredients(session.user_id, pool).await?;
    let recipe_ids: Vec<Id> = rows
        .iter()
        .map(|row| row.recipe_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let list = ShoppingList::aggregate(rows);

    log::debug!(
        "Built shopping list of {} lines from {} recipes for user {}",
        list.lines.len(),
        list.recipe_count(),
        session.user_id
    );

    if clear && !recipe_ids.is_empty() {
        sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = ANY($2)")
            .bind(session.user_id)
            .bind(&recipe_ids)
            .execute(pool)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(list)
}

pub async fn clear_shopping_cart(session: &SessionData, pool: &Pool<Postgres>) -> Result<u64, Error> {
    session.authenticate(ActionType::ManageOwnCart)?;

    let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1")
        .bind(session.user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected())
}
