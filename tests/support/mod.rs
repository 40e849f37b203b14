//! Throwaway Postgres databases for action tests.
//!
//! Each test gets a fresh database created on the server named by
//! `DATABASE_URL` and migrated with the crate's migrations. Without
//! `DATABASE_URL` the tests are skipped.

use std::str::FromStr;

use foodgram_sdk::{
    actions::{create_recipe, register_user},
    jwt::SessionData,
    schema::{Id, IngredientAmountForm, NewUser, RecipeDetail, RecipeForm, UserRole},
};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Connection, Executor, PgConnection, Pool, Postgres,
};

pub struct TestDatabase {
    pub pool: Pool<Postgres>,
    admin_url: String,
    name: String,
}

impl TestDatabase {
    pub async fn close(self) {
        self.pool.close().await;

        match PgConnection::connect(&self.admin_url).await {
            Ok(mut admin) => {
                let drop = format!("DROP DATABASE IF EXISTS {}", self.name);
                if let Err(e) = (&mut admin).execute(drop.as_str()).await {
                    eprintln!("failed to drop {}: {e}", self.name);
                }
            }
            Err(e) => eprintln!("failed to drop {}: {e}", self.name),
        }
    }
}

pub async fn test_database() -> Option<TestDatabase> {
    let admin_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("SKIP-TEST-DATABASE: DATABASE_URL is not set");
            return None;
        }
    };
    let name = format!("foodgram_test_{}", uuid::Uuid::new_v4().simple());

    let mut admin = PgConnection::connect(&admin_url)
        .await
        .expect("failed to connect to DATABASE_URL");
    let create = format!("CREATE DATABASE {name}");
    (&mut admin)
        .execute(create.as_str())
        .await
        .expect("failed to create test database");

    let options = PgConnectOptions::from_str(&admin_url)
        .expect("invalid DATABASE_URL")
        .database(&name);
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .expect("failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to migrate test database");

    Some(TestDatabase {
        pool,
        admin_url,
        name,
    })
}

pub async fn user(pool: &Pool<Postgres>, username: &str) -> SessionData {
    let user = register_user(
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password: String::from("correct horse battery"),
        },
        pool,
    )
    .await
    .expect("failed to register user");

    SessionData {
        user_id: user.id,
        username: user.username,
        role: UserRole::User,
        is_moderator: false,
        is_admin: false,
    }
}

pub async fn ingredient(pool: &Pool<Postgres>, name: &str, unit: &str) -> Id {
    let (id,): (Id,) = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(unit)
    .fetch_one(pool)
    .await
    .expect("failed to insert ingredient");

    id
}

pub fn recipe_form(name: &str, ingredients: &[(Id, i32)]) -> RecipeForm {
    RecipeForm {
        name: name.to_string(),
        image: String::new(),
        text: String::from("Mix and cook"),
        cooking_time: 15,
        tags: vec![],
        ingredients: ingredients
            .iter()
            .map(|&(id, amount)| IngredientAmountForm { id, amount })
            .collect(),
    }
}

pub async fn recipe(
    pool: &Pool<Postgres>,
    author: &SessionData,
    name: &str,
    ingredients: &[(Id, i32)],
) -> RecipeDetail {
    create_recipe(recipe_form(name, ingredients), author, pool)
        .await
        .expect("failed to create recipe")
}

pub async fn count(pool: &Pool<Postgres>, table: &str, recipe_id: Id) -> i64 {
    let query = format!("SELECT COUNT(*) FROM {table} WHERE recipe_id = $1");
    let (count,): (i64,) = sqlx::query_as(&query)
        .bind(recipe_id)
        .fetch_one(pool)
        .await
        .expect("failed to count rows");

    count
}
