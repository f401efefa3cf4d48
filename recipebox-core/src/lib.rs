//! RecipeBox Core - account and recipe data model
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Core entities (Account, Recipe) and password hashing
//! - **ports**: Trait definitions for external dependencies (Repository)
//! - **services**: Business logic orchestration (accounts, recipes, logging)
//! - **adapters**: Concrete implementations (DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use domain::PasswordHasher;
use services::{AccountService, RecipeService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{Account, Argon2Params, NewAccount, NewRecipe, Recipe};
pub use services::{EntryPoint, EventCount, LogEvent, LogFilter, LoggingService};

/// Database file name inside the data directory
pub const DB_FILENAME: &str = "recipebox.duckdb";

/// Main context for RecipeBox operations
///
/// Holds the configuration, the repository, and the services built on it.
pub struct RecipeBoxContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub account_service: AccountService,
    pub recipe_service: RecipeService,
}

impl RecipeBoxContext {
    /// Create a context over the data directory
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir).map_err(|e| Error::Config(format!("{:#}", e)))?;

        let repository = if config.in_memory {
            DuckDbRepository::open_in_memory()?
        } else {
            DuckDbRepository::new(&data_dir.join(DB_FILENAME))?
        };

        Self::with_repository(config, Arc::new(repository))
    }

    /// Create a context from an already opened repository
    pub fn with_repository(config: Config, repository: Arc<DuckDbRepository>) -> Result<Self> {
        repository.ensure_schema()?;

        let hasher = PasswordHasher::new(config.password_hashing)?;
        let account_service = AccountService::new(repository.clone(), hasher);
        let recipe_service = RecipeService::new(repository.clone());

        Ok(Self {
            config,
            repository,
            account_service,
            recipe_service,
        })
    }
}
