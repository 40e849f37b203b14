use std::collections::HashSet;

use super::{
    error::{Error, HtmlError},
    schema::{Id, IngredientForm, NewUser, RecipeForm, TagForm},
};
use crate::constants::{
    COOKING_TIME_MAX, COOKING_TIME_MIN, EMAIL_MAX_LENGTH, INGREDIENT_AMOUNT_MIN,
    INGREDIENT_NAME_MAX_LENGTH, MEASUREMENT_UNIT_MAX_LENGTH, NAME_MAX_LENGTH,
    PASSWORD_MIN_LENGTH, RECIPE_NAME_MAX_LENGTH, RECIPE_TEXT_MAX_LENGTH, TAG_NAME_MAX_LENGTH,
    TAG_SLUG_MAX_LENGTH, USERNAME_MAX_LENGTH,
};

fn invalid(info: &str) -> Error {
    HtmlError::InvalidRequest.new(info)
}

fn check_length(value: &str, max: usize, field: &str) -> Result<(), Error> {
    let length = value.trim().chars().count();
    if length == 0 {
        return Err(invalid(&format!("{field} may not be blank")));
    }
    if length > max {
        return Err(invalid(&format!(
            "{field} may not be longer than {max} characters"
        )));
    }
    Ok(())
}

fn has_duplicates<T: Eq + std::hash::Hash>(items: impl IntoIterator<Item = T>) -> bool {
    let mut seen = HashSet::new();
    items.into_iter().any(|item| !seen.insert(item))
}

pub fn validate_recipe(form: &RecipeForm) -> Result<(), Error> {
    check_length(&form.name, RECIPE_NAME_MAX_LENGTH, "Name")?;

    if form.text.chars().count() > RECIPE_TEXT_MAX_LENGTH {
        return Err(invalid(&format!(
            "Text may not be longer than {RECIPE_TEXT_MAX_LENGTH} characters"
        )));
    }

    if !(COOKING_TIME_MIN..=COOKING_TIME_MAX).contains(&form.cooking_time) {
        return Err(invalid(&format!(
            "Cooking time must be between {COOKING_TIME_MIN} and {COOKING_TIME_MAX} minutes"
        )));
    }

    if has_duplicates(form.tags.iter()) {
        return Err(invalid("Tags may not repeat"));
    }

    if form.ingredients.is_empty() {
        return Err(invalid("A recipe needs at least one ingredient"));
    }

    if has_duplicates(form.ingredients.iter().map(|i| i.id)) {
        return Err(invalid("Ingredients may not repeat"));
    }

    if form
        .ingredients
        .iter()
        .any(|i| i.amount < INGREDIENT_AMOUNT_MIN)
    {
        return Err(invalid(&format!(
            "Ingredient amount must be at least {INGREDIENT_AMOUNT_MIN}"
        )));
    }

    Ok(())
}

pub fn validate_ingredient(form: &IngredientForm) -> Result<(), Error> {
    check_length(&form.name, INGREDIENT_NAME_MAX_LENGTH, "Name")?;
    check_length(
        &form.measurement_unit,
        MEASUREMENT_UNIT_MAX_LENGTH,
        "Measurement unit",
    )
}

fn is_valid_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn validate_tag(form: &TagForm) -> Result<(), Error> {
    check_length(&form.name, TAG_NAME_MAX_LENGTH, "Name")?;

    if !is_valid_color(&form.color) {
        return Err(invalid("Color must be a hex value like #49B64E"));
    }

    if form.slug.len() > TAG_SLUG_MAX_LENGTH || !is_valid_slug(&form.slug) {
        return Err(invalid(
            "Slug may only contain letters, numbers, hyphens and underscores",
        ));
    }

    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
}

pub fn validate_new_user(form: &NewUser) -> Result<(), Error> {
    check_length(&form.email, EMAIL_MAX_LENGTH, "Email")?;
    if !is_valid_email(&form.email) {
        return Err(invalid("Enter a valid email address"));
    }

    check_length(&form.username, USERNAME_MAX_LENGTH, "Username")?;
    if !is_valid_username(&form.username) {
        return Err(invalid(
            "Username may only contain letters, digits and @/./+/-/_",
        ));
    }

    if form.first_name.chars().count() > NAME_MAX_LENGTH
        || form.last_name.chars().count() > NAME_MAX_LENGTH
    {
        return Err(invalid(&format!(
            "Names may not be longer than {NAME_MAX_LENGTH} characters"
        )));
    }

    validate_password(&form.password)
}

pub fn validate_password(password: &str) -> Result<(), Error> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(invalid(&format!(
            "Password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_follow(user_id: Id, author_id: Id) -> Result<(), Error> {
    if user_id == author_id {
        return Err(invalid("You can't follow yourself"));
    }
    Ok(())
}
