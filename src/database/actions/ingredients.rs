use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    cache::cache::{CacheKeyType, CacheLifetime, RedisValue},
    error::{Error, HtmlError, QueryError},
    form::IngredientFilter,
    jwt::SessionData,
    schema::{Id, Ingredient, IngredientForm},
    validation::validate_ingredient,
};

/// Ingredients whose name contains the `name` search, case-insensitively,
/// ordered by name.
pub async fn list_ingredients(
    filter: &IngredientFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let pattern = format!("%{}%", escape_like(filter.name.as_deref().unwrap_or("")));

    let rows: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, measurement_unit",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Same as [`list_ingredients`], searching a cached copy of the full list.
/// Only the full list is stored, so searches add no cache keys.
pub async fn list_ingredients_cached(
    filter: &IngredientFilter,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Ingredient>, Error> {
    let value = RedisValue::get_or(CacheKeyType::Ingredient.new("all"), cache, || async move {
        let all = IngredientFilter::default();
        list_ingredients(&all, pool).await
    })
    .await?;

    Ok(filter_by_name(value.value, filter.name.as_deref()))
}

fn filter_by_name(list: Vec<Ingredient>, name: Option<&str>) -> Vec<Ingredient> {
    match name.map(str::to_lowercase) {
        Some(name) => list
            .into_iter()
            .filter(|ingredient| ingredient.name.to_lowercase().contains(&name))
            .collect(),
        None => list,
    }
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_ingredient(
    form: IngredientForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Ingredient, Error> {
    session.authenticate(ActionType::ManageIngredients)?;
    validate_ingredient(&form)?;

    let row: Option<Ingredient> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING *
    ",
    )
    .bind(form.name.trim())
    .bind(form.measurement_unit.trim())
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let ingredient =
        row.ok_or_else(|| HtmlError::InvalidRequest.new("Ingredient already exists"))?;

    CacheLifetime::BindIngredientCache.invalidate(cache).await?;

    Ok(ingredient)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("flour"), "flour");
    }

    fn ingredient(id: Id, name: &str) -> Ingredient {
        Ingredient {
            id,
            name: name.to_string(),
            measurement_unit: String::from("g"),
        }
    }

    #[test]
    fn cached_list_is_searched_case_insensitively() {
        let list = vec![
            ingredient(1, "Flour"),
            ingredient(2, "Rye flour"),
            ingredient(3, "Sugar"),
        ];

        let found = filter_by_name(list.clone(), Some("FLO"));
        assert_eq!(found.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(filter_by_name(list, None).len(), 3);
    }
}
