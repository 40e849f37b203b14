use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{SessionData, SessionKey},
    },
    error::{Error, HtmlError, QueryError},
    pagination::{Page, PageRequest},
    schema::{Id, NewUser, User, UserProfile, UserProfileRow},
    validation::{validate_new_user, validate_password},
};

use sqlx::{Pool, Postgres};

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Public profile of `user_id`, with `is_subscribed` telling whether
/// `viewer` follows them.
pub async fn get_user_profile(
    pool: &Pool<Postgres>,
    user_id: Id,
    viewer: Option<Id>,
) -> Result<UserProfile, Error> {
    let row: Option<UserProfile> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM follows f WHERE f.author_id = u.id AND f.user_id = $2) AS is_subscribed
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(user_id)
    .bind(viewer)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| HtmlError::NotFound.new("No user exists with specified id"))
}

pub async fn list_users(
    pool: &Pool<Postgres>,
    viewer: Option<Id>,
    page: PageRequest,
) -> Result<Page<UserProfile>, Error> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM follows f WHERE f.author_id = u.id AND f.user_id = $1) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let rows = rows.into_iter().map(UserProfile::from).collect();
    Page::from_rows(rows, total_count, page)
}

/// Creates a user with a hashed password. Taken emails and usernames are
/// rejected.
pub async fn register_user(form: NewUser, pool: &Pool<Postgres>) -> Result<User, Error> {
    validate_new_user(&form)?;

    let password = hash_password(&form.password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        HtmlError::InternalServerError.new("Failed to hash password")
    })?;

    let user: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(form.email.trim().to_lowercase())
    .bind(form.username.trim())
    .bind(form.first_name.trim())
    .bind(form.last_name.trim())
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match user {
        Some(user) => {
            log::info!("Registered user {} ({})", user.username, user.id);
            Ok(user)
        }
        None => Err(HtmlError::InvalidRequest
            .new("A user with that email or username already exists")),
    }
}

pub async fn login_user(
    email: &str,
    password: &str,
    key: &SessionKey,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = match get_user_by_email(pool, email).await? {
        Some(user) => user,
        None => return Err(HtmlError::InvalidRequest.new("Invalid credentials")),
    };

    let authenticated = verify_password(password, &user.password).map_err(|e| {
        log::error!("Stored password hash of user {} is unreadable: {e}", user.id);
        HtmlError::InternalServerError.default()
    })?;
    if !authenticated {
        return Err(HtmlError::InvalidRequest.new("Invalid credentials"));
    }

    key.generate_jwt_session(&user)
}

pub async fn set_password(
    session: &SessionData,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let user_id = session.user_id;
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("No user exists with specified id"))?;

    let authenticated = verify_password(current_password, &user.password)
        .map_err(|_| HtmlError::InternalServerError.default())?;
    if !authenticated {
        return Err(HtmlError::InvalidRequest.new("Current password is incorrect"));
    }

    validate_password(new_password)?;
    let password = hash_password(new_password)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to hash password"))?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
