use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use super::error::{Error, TypeError};
use crate::{constants::DEFAULT_RECIPES_LIMIT, schema::Id};

/// Query parameters of a request. Repeated keys (`?tags=a&tags=b`) are
/// collected into an array.
#[derive(Debug, Default, Clone)]
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut inner: HashMap<String, Value> = HashMap::new();

        for (key, value) in pairs {
            match inner.get_mut(&key) {
                Some(Value::Array(list)) => list.push(Value::String(value)),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, Value::String(value)]);
                }
                None => {
                    inner.insert(key, Value::String(value));
                }
            }
        }

        Self { inner }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get_number<T>(&self, key: &str) -> Result<T, Error>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => v
                    .trim()
                    .parse()
                    .map_err(|_e| TypeError::new("Invalid type conversion").into()),
                None => Err(TypeError::new("Failed to parse value as str").into()),
            },
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    pub fn get_optional_number<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: FromStr,
    {
        if self.contains(key) {
            self.get_number(key).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Trimmed string value; missing and blank values are `None`.
    pub fn get_optional_str(&self, key: &str) -> Result<Option<String>, TypeError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) if v.trim().is_empty() => Ok(None),
                Some(v) => Ok(Some(v.trim().to_string())),
                None => Err(TypeError::new("Failed to parse value as str")),
            },
            None => Ok(None),
        }
    }

    /// Missing flags are `false`. Accepts `1/0` and `true/false`.
    pub fn get_bool(&self, key: &str) -> Result<bool, TypeError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str().map(|v| v.trim().to_lowercase()) {
                Some(v) if v == "1" || v == "true" => Ok(true),
                Some(v) if v == "0" || v == "false" => Ok(false),
                _ => Err(TypeError::new("Invalid boolean")),
            },
            None => Ok(false),
        }
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.inner.get(key) {
            Some(Value::Array(list)) => list
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
            Some(Value::String(v)) => vec![v.to_string()],
            _ => vec![],
        }
    }
}

/// Filters accepted by the recipe listing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Id>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl TryFrom<&Form> for RecipeFilter {
    type Error = Error;

    fn try_from(form: &Form) -> Result<Self, Self::Error> {
        Ok(Self {
            tags: form.get_list("tags"),
            author: form.get_optional_number("author")?,
            is_favorited: form.get_bool("is_favorited")?,
            is_in_shopping_cart: form.get_bool("is_in_shopping_cart")?,
        })
    }
}

/// `?name=` search of the ingredient listing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngredientFilter {
    pub name: Option<String>,
}

impl TryFrom<&Form> for IngredientFilter {
    type Error = Error;

    fn try_from(form: &Form) -> Result<Self, Self::Error> {
        Ok(Self {
            name: form.get_optional_str("name")?,
        })
    }
}

/// `?recipes_limit=` of the subscription endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub recipes_limit: i64,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self {
            recipes_limit: DEFAULT_RECIPES_LIMIT,
        }
    }
}

impl TryFrom<&Form> for SubscriptionFilter {
    type Error = Error;

    fn try_from(form: &Form) -> Result<Self, Self::Error> {
        let recipes_limit = form
            .get_optional_number("recipes_limit")?
            .unwrap_or(DEFAULT_RECIPES_LIMIT);
        if recipes_limit < 0 {
            return Err(TypeError::new("recipes_limit may not be negative").into());
        }

        Ok(Self { recipes_limit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn repeated_keys_become_lists() {
        let form = Form::from_pairs(pairs(&[
            ("tags", "breakfast"),
            ("tags", "lunch"),
            ("tags", "dinner"),
        ]));

        assert_eq!(form.get_list("tags"), vec!["breakfast", "lunch", "dinner"]);
        assert!(form.get_list("missing").is_empty());
    }

    #[test]
    fn recipe_filter_from_query() {
        let form = Form::from_pairs(pairs(&[
            ("tags", "breakfast"),
            ("author", "7"),
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "false"),
        ]));

        let filter = RecipeFilter::try_from(&form).unwrap();
        assert_eq!(
            filter,
            RecipeFilter {
                tags: vec![String::from("breakfast")],
                author: Some(7),
                is_favorited: true,
                is_in_shopping_cart: false,
            }
        );
    }

    #[test]
    fn empty_query_is_an_empty_filter() {
        let filter = RecipeFilter::try_from(&Form::default()).unwrap();
        assert_eq!(filter, RecipeFilter::default());
    }

    #[test]
    fn invalid_author_is_rejected() {
        let form = Form::from_pairs(pairs(&[("author", "me")]));
        let error = RecipeFilter::try_from(&form).unwrap_err();
        assert_eq!(error.code, 400);
    }

    #[test]
    fn invalid_flag_is_rejected() {
        let form = Form::from_pairs(pairs(&[("is_favorited", "maybe")]));
        assert!(form.get_bool("is_favorited").is_err());
    }

    #[test]
    fn ingredient_search_from_query() {
        let form = Form::from_pairs(pairs(&[("name", "  Flo ")]));
        assert_eq!(
            IngredientFilter::try_from(&form).unwrap().name.as_deref(),
            Some("Flo")
        );

        let form = Form::from_pairs(pairs(&[("name", " ")]));
        assert_eq!(IngredientFilter::try_from(&form).unwrap().name, None);
        assert_eq!(IngredientFilter::try_from(&Form::default()).unwrap().name, None);
    }

    #[test]
    fn recipes_limit_defaults_and_parses() {
        assert_eq!(
            SubscriptionFilter::try_from(&Form::default()).unwrap().recipes_limit,
            DEFAULT_RECIPES_LIMIT
        );

        let form = Form::from_pairs(pairs(&[("recipes_limit", "10")]));
        assert_eq!(SubscriptionFilter::try_from(&form).unwrap().recipes_limit, 10);

        let form = Form::from_pairs(pairs(&[("recipes_limit", "-1")]));
        assert_eq!(SubscriptionFilter::try_from(&form).unwrap_err().code, 400);
    }
}
