//! Consolidated ingredient list for the recipes in a user's cart.
//!
//! Quantities are summed per `(ingredient name, measurement unit)`, so the
//! same ingredient measured in two different units stays on two lines.

use std::collections::BTreeMap;

use serde::Serialize;
use warp::{
    http::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE},
    reply::{Reply, Response},
};

use super::schema::{CartIngredientRow, Id};
use crate::constants::SHOPPING_LIST_FILENAME;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShoppingList {
    pub recipes: Vec<String>,
    pub lines: Vec<ShoppingListLine>,
}

impl ShoppingList {
    pub fn aggregate<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = CartIngredientRow>,
    {
        let mut recipes: BTreeMap<Id, String> = BTreeMap::new();
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();

        for row in rows {
            recipes.entry(row.recipe_id).or_insert(row.recipe_name);

            if let (Some(name), Some(unit), Some(amount)) =
                (row.name, row.measurement_unit, row.amount)
            {
                *totals.entry((name, unit)).or_insert(0) += i64::from(amount);
            }
        }

        Self {
            recipes: recipes.into_values().collect(),
            lines: totals
                .into_iter()
                .map(|((name, measurement_unit), total)| ShoppingListLine {
                    name,
                    measurement_unit,
                    total,
                })
                .collect(),
        }
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self, name: &str, measurement_unit: &str) -> Option<i64> {
        self.lines
            .iter()
            .find(|line| line.name == name && line.measurement_unit == measurement_unit)
            .map(|line| line.total)
    }

    pub fn header(&self) -> String {
        if self.recipes.is_empty() {
            return String::from("Shopping list (0 recipes)");
        }
        let noun = if self.recipe_count() == 1 {
            "recipe"
        } else {
            "recipes"
        };
        format!(
            "Shopping list ({} {noun}): {}",
            self.recipe_count(),
            self.recipes.join(", ")
        )
    }

    pub fn to_text(&self) -> String {
        let mut text = self.header();
        text.push('\n');

        for line in &self.lines {
            text.push_str(&format!(
                "{} ({}) – {}\n",
                line.name, line.measurement_unit, line.total
            ));
        }

        text
    }

    /// Plain-text download of the list.
    pub fn into_attachment(self) -> Response {
        let mut response = self.to_text().into_response();
        let headers = response.headers_mut();

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        if let Ok(value) =
            HeaderValue::from_str(&format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""))
        {
            headers.insert(CONTENT_DISPOSITION, value);
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(recipe_id: Id, recipe: &str, name: &str, unit: &str, amount: i32) -> CartIngredientRow {
        CartIngredientRow {
            recipe_id,
            recipe_name: recipe.to_string(),
            name: Some(name.to_string()),
            measurement_unit: Some(unit.to_string()),
            amount: Some(amount),
        }
    }

    fn bare(recipe_id: Id, recipe: &str) -> CartIngredientRow {
        CartIngredientRow {
            recipe_id,
            recipe_name: recipe.to_string(),
            name: None,
            measurement_unit: None,
            amount: None,
        }
    }

    #[test]
    fn same_ingredient_and_unit_is_summed() {
        let list = ShoppingList::aggregate(vec![
            row(1, "Bread", "flour", "g", 200),
            row(2, "Cake", "flour", "g", 100),
        ]);

        assert_eq!(list.recipe_count(), 2);
        assert_eq!(
            list.lines,
            vec![ShoppingListLine {
                name: String::from("flour"),
                measurement_unit: String::from("g"),
                total: 300,
            }]
        );
    }

    #[test]
    fn different_units_stay_separate() {
        let list = ShoppingList::aggregate(vec![
            row(1, "Bread", "milk", "ml", 250),
            row(2, "Cake", "milk", "cup", 1),
        ]);

        assert_eq!(list.lines.len(), 2);
        assert_eq!(list.total("milk", "ml"), Some(250));
        assert_eq!(list.total("milk", "cup"), Some(1));
    }

    #[test]
    fn totals_equal_sum_over_cart() {
        let rows: Vec<CartIngredientRow> = (1..=10)
            .flat_map(|recipe| {
                vec![
                    row(recipe, "r", "sugar", "g", recipe * 10),
                    row(recipe, "r", "egg", "pcs", recipe % 3 + 1),
                ]
            })
            .collect();
        let sugar: i64 = rows
            .iter()
            .filter(|r| r.name.as_deref() == Some("sugar"))
            .filter_map(|r| r.amount)
            .map(i64::from)
            .sum();
        let eggs: i64 = rows
            .iter()
            .filter(|r| r.name.as_deref() == Some("egg"))
            .filter_map(|r| r.amount)
            .map(i64::from)
            .sum();

        let list = ShoppingList::aggregate(rows);
        assert_eq!(list.total("sugar", "g"), Some(sugar));
        assert_eq!(list.total("egg", "pcs"), Some(eggs));
        assert_eq!(list.recipe_count(), 10);
    }

    #[test]
    fn empty_cart_is_header_only() {
        let list = ShoppingList::aggregate(Vec::new());

        assert!(list.is_empty());
        assert_eq!(list.recipe_count(), 0);
        assert_eq!(list.to_text(), "Shopping list (0 recipes)\n");
    }

    #[test]
    fn recipe_without_ingredients_is_still_counted() {
        let list = ShoppingList::aggregate(vec![bare(3, "Water"), row(4, "Tea", "tea", "g", 5)]);

        assert_eq!(list.recipes, vec!["Water", "Tea"]);
        assert_eq!(list.lines.len(), 1);
    }

    #[test]
    fn single_recipe_header_is_singular() {
        let list = ShoppingList::aggregate(vec![row(1, "Omelette", "egg", "pcs", 3)]);
        assert_eq!(list.header(), "Shopping list (1 recipe): Omelette");
    }

    #[test]
    fn text_lists_lines_by_name() {
        let list = ShoppingList::aggregate(vec![
            row(1, "Omelette", "milk", "ml", 50),
            row(1, "Omelette", "egg", "pcs", 3),
            row(2, "Pancakes", "egg", "pcs", 2),
        ]);

        assert_eq!(
            list.to_text(),
            "Shopping list (2 recipes): Omelette, Pancakes\n\
             egg (pcs) – 5\n\
             milk (ml) – 50\n"
        );
    }

    #[test]
    fn attachment_headers() {
        let response = ShoppingList::default().into_attachment();

        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"shopping-list.txt\""
        );
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }
}
