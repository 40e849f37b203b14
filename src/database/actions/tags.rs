use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    cache::cache::{CacheKeyType, CacheLifetime, RedisValue},
    error::{Error, HtmlError, QueryError},
    jwt::SessionData,
    schema::{Id, Tag, TagForm},
    validation::validate_tag,
};

pub async fn create_tag(
    form: TagForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Tag, Error> {
    session.authenticate(ActionType::ManageTags)?;
    validate_tag(&form)?;

    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(form.name.trim())
    .bind(form.color.to_uppercase())
    .bind(form.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let tag = tag.ok_or_else(|| {
        HtmlError::InvalidRequest.new("A tag with that name, color or slug already exists")
    })?;

    CacheLifetime::BindTagCache.invalidate(cache).await?;

    Ok(tag)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_tags_cached(
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Tag>, Error> {
    let value = RedisValue::get_or(CacheKeyType::Tag.new("all"), cache, || list_tags(pool)).await?;

    Ok(value.value)
}
