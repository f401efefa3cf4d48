//! Repository port - persistence abstraction

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Account, Recipe};

/// Persistence collaborator for accounts and recipes
///
/// Implementations (adapters) provide the actual storage. Getters return
/// `Ok(None)` when nothing matches; services decide whether that is an error.
pub trait Repository: Send + Sync {
    // === Accounts ===

    /// Insert a new account
    ///
    /// Must fail with `Error::UniquenessViolation` when an account with the
    /// same (normalized) email already exists. The check has to be atomic
    /// with the insert.
    fn insert_account(&self, account: &Account) -> Result<()>;

    /// Replace the stored fields of an existing account
    fn update_account(&self, account: &Account) -> Result<()>;

    /// Get account by ID
    fn get_account_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Get account by normalized email
    fn get_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Get all accounts, ordered by email
    fn list_accounts(&self) -> Result<Vec<Account>>;

    // === Recipes ===

    /// Insert a new recipe
    fn insert_recipe(&self, recipe: &Recipe) -> Result<()>;

    /// Get recipe by ID
    fn get_recipe_by_id(&self, id: Uuid) -> Result<Option<Recipe>>;

    /// Get recipes owned by an account, oldest first
    fn get_recipes_by_owner(&self, owner_id: Uuid) -> Result<Vec<Recipe>>;
}
