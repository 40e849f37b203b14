use std::collections::{HashMap, HashSet};

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    authentication::permissions::ActionType,
    error::{Error, HtmlError, QueryError},
    form::RecipeFilter,
    jwt::SessionData,
    pagination::{Page, PageRequest},
    schema::{Id, Recipe, RecipeDetail, RecipeForm, RecipeIngredient, RecipeRow, Tag, UserProfile},
    validation::validate_recipe,
};

#[derive(sqlx::FromRow)]
struct LinkedTag {
    recipe_id: Id,
    id: Id,
    name: String,
    color: String,
    slug: String,
}

#[derive(sqlx::FromRow)]
struct LinkedIngredient {
    recipe_id: Id,
    id: Id,
    name: String,
    measurement_unit: String,
    amount: i32,
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let recipe: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(recipe)
}

/// Loads a recipe the session may edit. Authors may edit their own recipes,
/// moderators and admins any recipe.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match get_recipe(id, pool).await? {
        Some(recipe) => {
            session.authenticate_owner(recipe.author_id, ActionType::ManageAllRecipes)?;
            Ok(recipe)
        }
        None => Err(HtmlError::NotFound.new("No recipe exists with specified id")),
    }
}

pub async fn get_recipe_detail(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, Error> {
    let row: Option<RecipeRow> = sqlx::query_as(
        "
        SELECT r.*,
            EXISTS(SELECT 1 FROM favorite_recipes f WHERE f.recipe_id = r.id AND f.user_id = $2) AS is_favorited,
            EXISTS(SELECT 1 FROM shopping_cart s WHERE s.recipe_id = r.id AND s.user_id = $2) AS is_in_shopping_cart,
            1::BIGINT AS count
        FROM recipes r
        WHERE r.id = $1
    ",
    )
    .bind(id)
    .bind(viewer)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let row = row.ok_or_else(|| HtmlError::NotFound.new("No recipe exists with specified id"))?;

    load_details(vec![row], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| HtmlError::NotFound.new("No recipe exists with specified id"))
}

/// Newest recipes first, filtered by `filter` and flagged for `viewer`.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    page: PageRequest,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Page<RecipeDetail>, Error> {
    if viewer.is_none() && (filter.is_favorited || filter.is_in_shopping_cart) {
        return Ok(Page::no_rows(0));
    }

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.*, EXISTS(SELECT 1 FROM favorite_recipes f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    query.push_bind(viewer);
    query.push(
        ") AS is_favorited, EXISTS(SELECT 1 FROM shopping_cart s WHERE s.recipe_id = r.id AND s.user_id = ",
    );
    query.push_bind(viewer);
    query.push(") AS is_in_shopping_cart, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if !filter.tags.is_empty() {
        query.push(
            " AND EXISTS(SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        query.push_bind(filter.tags.clone());
        query.push("))");
    }

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ");
        query.push_bind(author);
    }

    if filter.is_favorited {
        query.push(" AND EXISTS(SELECT 1 FROM favorite_recipes f WHERE f.recipe_id = r.id AND f.user_id = ");
        query.push_bind(viewer);
        query.push(")");
    }

    if filter.is_in_shopping_cart {
        query.push(" AND EXISTS(SELECT 1 FROM shopping_cart s WHERE s.recipe_id = r.id AND s.user_id = ");
        query.push_bind(viewer);
        query.push(")");
    }

    query.push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ");
    query.push_bind(page.limit);
    query.push(" OFFSET ");
    query.push_bind(page.offset());

    let rows: Vec<RecipeRow> = query
        .build_query_as::<RecipeRow>()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let details = load_details(rows, viewer, pool).await?;

    Page::from_rows(details, total_count, page)
}

/// Attaches author, tags and ingredients to each row, keeping row order.
async fn load_details(
    rows: Vec<RecipeRow>,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, Error> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Id> = rows.iter().map(|r| r.id).collect();
    let author_ids: Vec<Id> = rows
        .iter()
        .map(|r| r.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let authors: Vec<UserProfile> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM follows f WHERE f.author_id = u.id AND f.user_id = $2) AS is_subscribed
        FROM users u
        WHERE u.id = ANY($1)
    ",
    )
    .bind(&author_ids)
    .bind(viewer)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let tags: Vec<LinkedTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
    ",
    )
    .bind(&recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let ingredients: Vec<LinkedIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY i.name
    ",
    )
    .bind(&recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let authors: HashMap<Id, UserProfile> = authors.into_iter().map(|a| (a.id, a)).collect();

    let mut tag_map: HashMap<Id, Vec<Tag>> = HashMap::new();
    for tag in tags {
        tag_map.entry(tag.recipe_id).or_default().push(Tag {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        });
    }

    let mut ingredient_map: HashMap<Id, Vec<RecipeIngredient>> = HashMap::new();
    for ingredient in ingredients {
        ingredient_map
            .entry(ingredient.recipe_id)
            .or_default()
            .push(RecipeIngredient {
                id: ingredient.id,
                name: ingredient.name,
                measurement_unit: ingredient.measurement_unit,
                amount: ingredient.amount,
            });
    }

    rows.into_iter()
        .map(|row| -> Result<RecipeDetail, Error> {
            let author = authors.get(&row.author_id).cloned().ok_or_else(|| {
                log::error!("Recipe {} has no author {}", row.id, row.author_id);
                HtmlError::InternalServerError.default()
            })?;

            Ok(RecipeDetail {
                id: row.id,
                author,
                tags: tag_map.remove(&row.id).unwrap_or_default(),
                ingredients: ingredient_map.remove(&row.id).unwrap_or_default(),
                is_favorited: row.is_favorited,
                is_in_shopping_cart: row.is_in_shopping_cart,
                name: row.name,
                image: row.image,
                text: row.text,
                cooking_time: row.cooking_time,
                pub_date: row.pub_date,
            })
        })
        .collect()
}

fn cooking_time(form: &RecipeForm) -> Result<i16, Error> {
    i16::try_from(form.cooking_time)
        .map_err(|_| HtmlError::InvalidRequest.new("Cooking time is out of range"))
}

/// Fails with 404 when any ingredient or tag in `form` does not exist.
async fn check_references(
    form: &RecipeForm,
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let ingredient_ids: Vec<Id> = form.ingredients.iter().map(|i| i.id).collect();

    let (found,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ingredients WHERE id = ANY($1)")
        .bind(&ingredient_ids)
        .fetch_one(&mut **tr)
        .await
        .map_err(QueryError::from)?;
    if found != ingredient_ids.len() as i64 {
        return Err(HtmlError::NotFound.new("No ingredient exists with specified id"));
    }

    if !form.tags.is_empty() {
        let (found,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
            .bind(&form.tags)
            .fetch_one(&mut **tr)
            .await
            .map_err(QueryError::from)?;
        if found != form.tags.len() as i64 {
            return Err(HtmlError::NotFound.new("No tag exists with specified id"));
        }
    }

    Ok(())
}

async fn insert_recipe_parts(
    recipe_id: Id,
    form: &RecipeForm,
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(form.ingredients.iter(), |mut b, ingredient| {
        b.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });
    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    if !form.tags.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        query_builder.push_values(form.tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        query_builder
            .build()
            .execute(&mut **tr)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

pub async fn create_recipe(
    form: RecipeForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    validate_recipe(&form)?;
    let cooking_time = cooking_time(&form)?;

    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    check_references(&form, &mut tr).await?;

    let (id,): (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5) RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(form.name.trim())
    .bind(&form.image)
    .bind(&form.text)
    .bind(cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    insert_recipe_parts(id, &form, &mut tr).await?;

    tr.commit().await.map_err(|e| {
        log::error!("Could not commit recipe: {e}");
        QueryError::new("Could not commit transaction".to_owned())
    })?;

    log::info!("User {} created recipe {id}", session.user_id);

    get_recipe_detail(id, Some(session.user_id), pool).await
}

/// Replaces every field of the recipe, including its ingredients and tags.
pub async fn update_recipe(
    id: Id,
    form: RecipeForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, Error> {
    get_recipe_mut(id, session, pool).await?;
    validate_recipe(&form)?;
    let cooking_time = cooking_time(&form)?;

    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    check_references(&form, &mut tr).await?;

    sqlx::query("UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4 WHERE id = $5")
        .bind(form.name.trim())
        .bind(&form.image)
        .bind(&form.text)
        .bind(cooking_time)
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    insert_recipe_parts(id, &form, &mut tr).await?;

    tr.commit().await.map_err(|e| {
        log::error!("Could not commit recipe {id}: {e}");
        QueryError::new("Could not commit transaction".to_owned())
    })?;

    get_recipe_detail(id, Some(session.user_id), pool).await
}

pub async fn delete_recipe(id: Id, session: &SessionData, pool: &Pool<Postgres>) -> Result<(), Error> {
    get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("User {} deleted recipe {id}", session.user_id);

    Ok(())
}
