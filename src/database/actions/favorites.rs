use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::{Error, HtmlError, QueryError},
    jwt::SessionData,
    schema::{Id, ShortRecipe},
};

/// Per-user recipe sets that share the same add/remove rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorite_recipes",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    fn action(self) -> ActionType {
        match self {
            RecipeList::Favorites => ActionType::ManageOwnFavorites,
            RecipeList::ShoppingCart => ActionType::ManageOwnCart,
        }
    }

    fn name(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping cart",
        }
    }

    async fn contains(self, user_id: Id, recipe_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = $1 AND recipe_id = $2)",
            self.table()
        );
        let (found,): (bool,) = sqlx::query_as(&query)
            .bind(user_id)
            .bind(recipe_id)
            .fetch_one(pool)
            .await
            .map_err(QueryError::from)?;

        Ok(found)
    }

    async fn add(
        self,
        recipe_id: Id,
        session: &SessionData,
        pool: &Pool<Postgres>,
    ) -> Result<ShortRecipe, Error> {
        session.authenticate(self.action())?;

        let recipe: Option<ShortRecipe> =
            sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
                .bind(recipe_id)
                .fetch_optional(pool)
                .await
                .map_err(QueryError::from)?;
        let recipe =
            recipe.ok_or_else(|| HtmlError::NotFound.new("No recipe exists with specified id"))?;

        let query = format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            self.table()
        );
        let result = sqlx::query(&query)
            .bind(session.user_id)
            .bind(recipe_id)
            .execute(pool)
            .await
            .map_err(QueryError::from)?;

        if result.rows_affected() == 0 {
            return Err(HtmlError::InvalidRequest.new(&format!(
                "Recipe is already in {}",
                self.name()
            )));
        }

        log::debug!("User {} added recipe {recipe_id} to {}", session.user_id, self.name());

        Ok(recipe)
    }

    async fn remove(
        self,
        recipe_id: Id,
        session: &SessionData,
        pool: &Pool<Postgres>,
    ) -> Result<(), Error> {
        session.authenticate(self.action())?;

        let query = format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            self.table()
        );
        let result = sqlx::query(&query)
            .bind(session.user_id)
            .bind(recipe_id)
            .execute(pool)
            .await
            .map_err(QueryError::from)?;

        if result.rows_affected() == 0 {
            return Err(HtmlError::InvalidRequest.new(&format!(
                "Recipe is not in {}",
                self.name()
            )));
        }

        Ok(())
    }
}

pub async fn add_to_favorites(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<ShortRecipe, Error> {
    RecipeList::Favorites.add(recipe_id, session, pool).await
}

pub async fn remove_from_favorites(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    RecipeList::Favorites.remove(recipe_id, session, pool).await
}

pub async fn is_favorite(user_id: Id, recipe_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    RecipeList::Favorites.contains(user_id, recipe_id, pool).await
}

pub async fn add_to_shopping_cart(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<ShortRecipe, Error> {
    RecipeList::ShoppingCart.add(recipe_id, session, pool).await
}

pub async fn remove_from_shopping_cart(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    RecipeList::ShoppingCart.remove(recipe_id, session, pool).await
}

pub async fn is_in_shopping_cart(
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    RecipeList::ShoppingCart.contains(user_id, recipe_id, pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_map_to_their_tables() {
        assert_eq!(RecipeList::Favorites.table(), "favorite_recipes");
        assert_eq!(RecipeList::ShoppingCart.table(), "shopping_cart");
        assert_eq!(RecipeList::ShoppingCart.action(), ActionType::ManageOwnCart);
    }
}
