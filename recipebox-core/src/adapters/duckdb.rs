//! DuckDB repository implementation

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Recipe};
use crate::ports::Repository;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str = "account_id, email, name, password_hash, is_active, is_staff,
                               is_superuser, created_at, updated_at";

const RECIPE_COLUMNS: &str = "recipe_id, owner_id, title, time_minutes, price, description,
                              link, created_at, updated_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Check if an error message comes from a PRIMARY KEY or UNIQUE constraint
fn is_unique_violation(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("duplicate key") || lower.contains("unique constraint")
}

/// Map a DuckDB error into the core error taxonomy
fn db_err(e: duckdb::Error) -> Error {
    let msg = e.to_string();
    if is_unique_violation(&msg) {
        Error::uniqueness(msg)
    } else {
        Error::database(msg)
    }
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process (e.g. a second `rb` invocation) holds
    /// the database open.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self { conn: Mutex::new(conn) });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[recipebox] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(db_err(e));
                }
            }
        }

        Err(last_error.map(db_err).unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a private in-memory database (tests, throwaway sessions)
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default()
            .enable_autoload_extension(false)
            .map_err(db_err)?;
        let conn = Connection::open_in_memory_with_flags(config).map_err(db_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Attempt to open a database connection (called by new() with retry logic)
    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Disable extension autoloading; everything needed is statically linked
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::database(format!("Migration failed: {:#}", e)))
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    fn row_to_account(row: &duckdb::Row) -> duckdb::Result<Account> {
        // Column order follows ACCOUNT_COLUMNS
        let id: String = row.get(0)?;
        let created: String = row.get(7)?;
        let updated: String = row.get(8)?;

        Ok(Account {
            id: parse_uuid(0, &id)?,
            email: row.get(1)?,
            name: row.get(2)?,
            password_hash: row.get(3)?,
            is_active: row.get(4)?,
            is_staff: row.get(5)?,
            is_superuser: row.get(6)?,
            created_at: parse_timestamp(7, &created)?,
            updated_at: parse_timestamp(8, &updated)?,
        })
    }

    fn row_to_recipe(row: &duckdb::Row) -> duckdb::Result<Recipe> {
        // Column order follows RECIPE_COLUMNS
        let id: String = row.get(0)?;
        let owner_id: String = row.get(1)?;
        let time_minutes: i64 = row.get(3)?;
        let price: String = row.get(4)?;
        let created: String = row.get(7)?;
        let updated: String = row.get(8)?;

        Ok(Recipe {
            id: parse_uuid(0, &id)?,
            owner_id: parse_uuid(1, &owner_id)?,
            title: row.get(2)?,
            time_minutes: u32::try_from(time_minutes)
                .map_err(|e| duckdb::Error::FromSqlConversionFailure(3, Type::BigInt, Box::new(e)))?,
            price: Decimal::from_str(&price)
                .map_err(|e| duckdb::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
            description: row.get(5)?,
            link: row.get(6)?,
            created_at: parse_timestamp(7, &created)?,
            updated_at: parse_timestamp(8, &updated)?,
        })
    }

    fn query_accounts(&self, sql: &str, params: &[&dyn duckdb::ToSql]) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params, Self::row_to_account)
            .map_err(db_err)?;
        rows.collect::<duckdb::Result<Vec<_>>>().map_err(db_err)
    }

    fn query_recipes(&self, sql: &str, params: &[&dyn duckdb::ToSql]) -> Result<Vec<Recipe>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params, Self::row_to_recipe)
            .map_err(db_err)?;
        rows.collect::<duckdb::Result<Vec<_>>>().map_err(db_err)
    }
}

impl Repository for DuckDbRepository {
    // === Account operations ===

    fn insert_account(&self, account: &Account) -> Result<()> {
        let conn = self.conn()?;
        // The UNIQUE index on email makes the duplicate check atomic with the insert
        conn.execute(
            &format!(
                "INSERT INTO sys_accounts ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                ACCOUNT_COLUMNS
            ),
            params![
                account.id.to_string(),
                account.email,
                account.name,
                account.password_hash,
                account.is_active,
                account.is_staff,
                account.is_superuser,
                account.created_at.to_rfc3339(),
                account.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| match db_err(e) {
            Error::UniquenessViolation(_) => Error::uniqueness(format!(
                "an account with email {} already exists",
                account.email
            )),
            other => other,
        })?;

        Ok(())
    }

    /// Email is the identity key and is never rewritten here
    fn update_account(&self, account: &Account) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE sys_accounts
                 SET name = ?, password_hash = ?, is_active = ?, is_staff = ?,
                     is_superuser = ?, updated_at = ?
                 WHERE account_id = ?",
                params![
                    account.name,
                    account.password_hash,
                    account.is_active,
                    account.is_staff,
                    account.is_superuser,
                    account.updated_at.to_rfc3339(),
                    account.id.to_string(),
                ],
            )
            .map_err(db_err)?;

        if updated == 0 {
            return Err(Error::not_found(format!("account {}", account.id)));
        }
        Ok(())
    }

    fn get_account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM sys_accounts WHERE account_id = ?", ACCOUNT_COLUMNS);
        Ok(self
            .query_accounts(&sql, &[&id.to_string()])?
            .into_iter()
            .next())
    }

    fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM sys_accounts WHERE email = ?", ACCOUNT_COLUMNS);
        Ok(self.query_accounts(&sql, &[&email])?.into_iter().next())
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let sql = format!("SELECT {} FROM sys_accounts ORDER BY email", ACCOUNT_COLUMNS);
        self.query_accounts(&sql, &[])
    }

    // === Recipe operations ===

    fn insert_recipe(&self, recipe: &Recipe) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO sys_recipes ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                RECIPE_COLUMNS
            ),
            params![
                recipe.id.to_string(),
                recipe.owner_id.to_string(),
                recipe.title,
                i64::from(recipe.time_minutes),
                recipe.price.to_string(),
                recipe.description,
                recipe.link,
                recipe.created_at.to_rfc3339(),
                recipe.updated_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn get_recipe_by_id(&self, id: Uuid) -> Result<Option<Recipe>> {
        let sql = format!("SELECT {} FROM sys_recipes WHERE recipe_id = ?", RECIPE_COLUMNS);
        Ok(self
            .query_recipes(&sql, &[&id.to_string()])?
            .into_iter()
            .next())
    }

    fn get_recipes_by_owner(&self, owner_id: Uuid) -> Result<Vec<Recipe>> {
        let sql = format!(
            "SELECT {} FROM sys_recipes WHERE owner_id = ? ORDER BY created_at, recipe_id",
            RECIPE_COLUMNS
        );
        self.query_recipes(&sql, &[&owner_id.to_string()])
    }
}

// Helper functions

fn parse_uuid(idx: usize, s: &str) -> duckdb::Result<Uuid> {
    Uuid::parse_str(s)
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_timestamp(idx: usize, s: &str) -> duckdb::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file: Resource temporarily unavailable"));
        assert!(is_retryable_error("The process cannot access the file because it is being used by another process"));
        assert!(!is_retryable_error("Parser Error: syntax error at or near \"SELEC\""));
    }

    #[test]
    fn test_unique_violation_detection() {
        assert!(is_unique_violation(
            "Constraint Error: Duplicate key \"email: a@example.com\" violates unique constraint."
        ));
        assert!(!is_unique_violation("Catalog Error: Table with name foo does not exist!"));
    }

    #[test]
    fn test_account_round_trip() {
        let repo = repo();
        let mut account = Account::new("Test@example.com", "$argon2id$hash");
        account.name = "Test".to_string();
        repo.insert_account(&account).unwrap();

        let by_id = repo.get_account_by_id(account.id).unwrap().unwrap();
        assert_eq!(by_id.email, "Test@example.com");
        assert_eq!(by_id.name, "Test");
        assert_eq!(by_id.password_hash, "$argon2id$hash");
        assert!(by_id.is_active);

        let by_email = repo.get_account_by_email("Test@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, account.id);

        // Email lookups are exact; normalization happens before the repository
        assert!(repo.get_account_by_email("test@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_is_uniqueness_violation() {
        let repo = repo();
        repo.insert_account(&Account::new("dup@example.com", "h1")).unwrap();

        let result = repo.insert_account(&Account::new("dup@example.com", "h2"));
        assert!(matches!(result, Err(Error::UniquenessViolation(_))));
        assert_eq!(repo.list_accounts().unwrap().len(), 1);
    }

    #[test]
    fn test_update_account() {
        let repo = repo();
        let mut account = Account::new("staff@example.com", "h1");
        repo.insert_account(&account).unwrap();

        account.is_staff = true;
        account.password_hash = "h2".to_string();
        repo.update_account(&account).unwrap();

        let stored = repo.get_account_by_id(account.id).unwrap().unwrap();
        assert!(stored.is_staff);
        assert_eq!(stored.password_hash, "h2");
    }

    #[test]
    fn test_update_missing_account_is_not_found() {
        let repo = repo();
        let account = Account::new("ghost@example.com", "h");
        assert!(matches!(repo.update_account(&account), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_recipe_price_stored_exactly() {
        use crate::domain::NewRecipe;

        let repo = repo();
        let owner = Account::new("chef@example.com", "h");
        repo.insert_account(&owner).unwrap();

        let recipe = Recipe::new(
            owner.id,
            NewRecipe::new("soup", 5, Decimal::from_str("99.9").unwrap()),
        );
        repo.insert_recipe(&recipe).unwrap();

        let stored = repo.get_recipe_by_id(recipe.id).unwrap().unwrap();
        assert_eq!(stored.price.to_string(), "99.9");
        assert_eq!(stored.time_minutes, 5);
        assert!(stored.description.is_none());
        assert_eq!(repo.get_recipes_by_owner(owner.id).unwrap().len(), 1);
    }

    #[test]
    fn test_recipe_time_minutes_full_range() {
        use crate::domain::NewRecipe;

        let repo = repo();
        let owner = Account::new("slow@example.com", "h");
        repo.insert_account(&owner).unwrap();

        let recipe = Recipe::new(owner.id, NewRecipe::new("stock", u32::MAX, Decimal::ONE));
        repo.insert_recipe(&recipe).unwrap();

        let stored = repo.get_recipe_by_id(recipe.id).unwrap().unwrap();
        assert_eq!(stored.time_minutes, u32::MAX);
    }

    #[test]
    fn test_missing_rows_are_none() {
        let repo = repo();
        assert!(repo.get_account_by_id(Uuid::new_v4()).unwrap().is_none());
        assert!(repo.get_recipe_by_id(Uuid::new_v4()).unwrap().is_none());
        assert!(repo.get_recipes_by_owner(Uuid::new_v4()).unwrap().is_empty());
    }
}
