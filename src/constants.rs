pub const DEFAULT_PAGE_LIMIT: i64 = 6;
pub const MAX_PAGE_LIMIT: i64 = 100;
/// Highest page number whose offset still fits in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_LIMIT;
pub const DEFAULT_RECIPES_LIMIT: i64 = 3;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const RECIPE_TEXT_MAX_LENGTH: usize = 2000;
pub const COOKING_TIME_MIN: i32 = 1;
pub const COOKING_TIME_MAX: i32 = 300;
pub const INGREDIENT_AMOUNT_MIN: i32 = 1;

pub const INGREDIENT_NAME_MAX_LENGTH: usize = 200;
pub const MEASUREMENT_UNIT_MAX_LENGTH: usize = 20;

pub const TAG_NAME_MAX_LENGTH: usize = 200;
pub const TAG_SLUG_MAX_LENGTH: usize = 200;

pub const EMAIL_MAX_LENGTH: usize = 254;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const NAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;

pub const SESSION_COOKIE: &str = "session";
pub const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 24;

pub const SHOPPING_LIST_FILENAME: &str = "shopping-list.txt";
