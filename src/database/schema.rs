use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Id = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
    pub date_joined: DateTime<Utc>,
}

/// Public view of a user as seen by `viewer`.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct UserProfile {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct UserProfileRow {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,

    pub count: i64,
}

impl From<UserProfileRow> for UserProfile {
    fn from(row: UserProfileRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            is_subscribed: row.is_subscribed,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i16,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i16,
    pub pub_date: DateTime<Utc>,

    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,

    #[serde(skip_serializing)]
    pub count: i64,
}

/// Ingredient of one recipe together with the amount the recipe needs.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecipeIngredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: Id,
    pub author: UserProfile,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i16,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShortRecipe {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i16,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct AuthorRecipe {
    pub author_id: Id,
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i16,
}

impl From<AuthorRecipe> for ShortRecipe {
    fn from(row: AuthorRecipe) -> Self {
        Self {
            id: row.id,
            name: row.name,
            image: row.image,
            cooking_time: row.cooking_time,
        }
    }
}

/// An author the user follows, with a preview of their recipes.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct SubscriptionRow {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub recipes_count: i64,

    pub count: i64,
}

/// One cart recipe joined with one of its ingredient rows. The ingredient
/// columns are empty for a recipe without ingredients.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CartIngredientRow {
    pub recipe_id: Id,
    pub recipe_name: String,
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
    pub amount: Option<i32>,
}

// Request payloads

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IngredientAmountForm {
    pub id: Id,
    pub amount: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeForm {
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    #[serde(default)]
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmountForm>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientForm {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagForm {
    pub name: String,
    pub color: String,
    pub slug: String,
}
