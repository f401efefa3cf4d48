//! Recipe service - owned recipe records

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, NewRecipe, Recipe};
use crate::ports::Repository;

/// Recipe service for creating and reading recipes
pub struct RecipeService {
    repository: Arc<dyn Repository>,
}

impl RecipeService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Create a recipe owned by `owner`
    ///
    /// The owner must already be persisted. Title and description are stored
    /// as given; the price keeps its exact decimal value.
    pub fn create_recipe(&self, owner: &Account, fields: NewRecipe) -> Result<Recipe> {
        if self.repository.get_account_by_id(owner.id)?.is_none() {
            return Err(Error::validation(format!(
                "recipe owner {} does not exist",
                owner.id
            )));
        }

        let recipe = Recipe::new(owner.id, fields);
        recipe.validate()?;

        self.repository.insert_recipe(&recipe)?;
        Ok(recipe)
    }

    /// Display string of a recipe: its title, unchanged
    pub fn display(recipe: &Recipe) -> String {
        recipe.to_string()
    }

    /// Get a recipe by id
    pub fn get_recipe(&self, id: Uuid) -> Result<Recipe> {
        self.repository
            .get_recipe_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("recipe {}", id)))
    }

    /// Get all recipes of an owner, oldest first
    pub fn list_recipes_for_owner(&self, owner_id: Uuid) -> Result<Vec<Recipe>> {
        self.repository.get_recipes_by_owner(owner_id)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;

    fn setup() -> (Arc<DuckDbRepository>, RecipeService) {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        let service = RecipeService::new(repo.clone());
        (repo, service)
    }

    fn persisted_owner(repo: &DuckDbRepository) -> Account {
        let owner = Account::new("test@example.com", "$argon2id$stub");
        repo.insert_account(&owner).unwrap();
        owner
    }

    #[test]
    fn test_create_recipe() {
        let (repo, service) = setup();
        let owner = persisted_owner(&repo);

        let recipe = service
            .create_recipe(
                &owner,
                NewRecipe::new("sample recipe title", 5, Decimal::from_str("99.9").unwrap())
                    .with_description("sample recipe ddescription"),
            )
            .unwrap();

        assert_eq!(RecipeService::display(&recipe), recipe.title);
        assert_eq!(recipe.owner_id, owner.id);

        let stored = service.get_recipe(recipe.id).unwrap();
        assert_eq!(stored.price, Decimal::from_str("99.9").unwrap());
        assert_eq!(stored.price.to_string(), "99.9");
        assert_eq!(stored.description.as_deref(), Some("sample recipe ddescription"));
    }

    #[test]
    fn test_unpersisted_owner_rejected() {
        let (_repo, service) = setup();
        let stranger = Account::new("stranger@example.com", "$argon2id$stub");

        let result = service.create_recipe(&stranger, NewRecipe::new("t", 1, Decimal::ONE));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_invalid_price_rejected() {
        let (repo, service) = setup();
        let owner = persisted_owner(&repo);

        let result = service.create_recipe(
            &owner,
            NewRecipe::new("t", 1, Decimal::from_str("1.005").unwrap()),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(service.list_recipes_for_owner(owner.id).unwrap().is_empty());
    }

    #[test]
    fn test_empty_title_and_negative_price_accepted() {
        let (repo, service) = setup();
        let owner = persisted_owner(&repo);

        let untitled = service
            .create_recipe(&owner, NewRecipe::new("", 5, Decimal::from_str("99.9").unwrap()))
            .unwrap();
        assert_eq!(RecipeService::display(&untitled), "");

        let refund = service
            .create_recipe(&owner, NewRecipe::new("t", 1, Decimal::from(-5)))
            .unwrap();
        assert_eq!(service.get_recipe(refund.id).unwrap().price, Decimal::from(-5));
    }

    #[test]
    fn test_large_time_minutes_persisted() {
        let (repo, service) = setup();
        let owner = persisted_owner(&repo);

        let recipe = service
            .create_recipe(&owner, NewRecipe::new("t", 3_000_000_000, Decimal::ONE))
            .unwrap();
        assert_eq!(service.get_recipe(recipe.id).unwrap().time_minutes, 3_000_000_000);
    }

    #[test]
    fn test_missing_recipe_not_found() {
        let (_repo, service) = setup();
        assert!(matches!(
            service.get_recipe(Uuid::new_v4()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_recipes_for_owner() {
        let (repo, service) = setup();
        let owner = persisted_owner(&repo);
        let other = Account::new("other@example.com", "$argon2id$stub");
        repo.insert_account(&other).unwrap();

        service
            .create_recipe(&owner, NewRecipe::new("first", 10, Decimal::new(500, 2)))
            .unwrap();
        service
            .create_recipe(&owner, NewRecipe::new("second", 20, Decimal::new(750, 2)))
            .unwrap();
        service
            .create_recipe(&other, NewRecipe::new("theirs", 30, Decimal::ONE))
            .unwrap();

        let mine = service.list_recipes_for_owner(owner.id).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| r.owner_id == owner.id));
    }
}
