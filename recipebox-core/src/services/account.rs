//! Account service - user and superuser creation, credential checks

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, NewAccount, PasswordHasher};
use crate::ports::Repository;

/// Account service for creating and authenticating users
pub struct AccountService {
    repository: Arc<dyn Repository>,
    hasher: PasswordHasher,
}

impl AccountService {
    pub fn new(repository: Arc<dyn Repository>, hasher: PasswordHasher) -> Self {
        Self { repository, hasher }
    }

    /// Create a regular user
    ///
    /// The email is normalized (domain lowercased) and the password is stored
    /// only as a salted Argon2id hash.
    pub fn create_account(&self, email: &str, password: &str) -> Result<Account> {
        self.create_account_with(NewAccount::new(email, password))
    }

    /// Create a user with staff and superuser flags set
    pub fn create_superuser(&self, email: &str, password: &str) -> Result<Account> {
        self.create_account_with(NewAccount::new(email, password).superuser())
    }

    /// Create an account from a builder
    ///
    /// Fails with `Error::Validation` for an empty email and
    /// `Error::UniquenessViolation` when the normalized email is taken.
    pub fn create_account_with(&self, new: NewAccount) -> Result<Account> {
        let email = Account::parse_email(&new.email)?;
        let password_hash = self.hasher.hash(&new.password)?;

        let mut account = Account::new(email, password_hash);
        if let Some(name) = new.name {
            account.name = name;
        }
        account.is_staff = new.is_staff;
        account.is_superuser = new.is_superuser;
        account.validate()?;

        self.repository.insert_account(&account)?;
        Ok(account)
    }

    /// Check a candidate password against the account's stored hash
    pub fn verify_password(&self, account: &Account, candidate: &str) -> bool {
        self.hasher.verify(candidate, &account.password_hash)
    }

    /// Look up an account by email, normalizing the input first
    pub fn get_account_by_email(&self, email: &str) -> Result<Account> {
        let email = Account::parse_email(email)?;
        self.repository
            .get_account_by_email(&email)?
            .ok_or_else(|| Error::not_found(format!("no account with email {}", email)))
    }

    /// Look up an account by id
    pub fn get_account(&self, id: Uuid) -> Result<Account> {
        self.repository
            .get_account_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("account {}", id)))
    }

    /// Resolve credentials to an active account
    ///
    /// Returns `Ok(None)` for an unknown email, a wrong password, or an
    /// inactive account.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<Account>> {
        let account = match self.get_account_by_email(email) {
            Ok(account) => account,
            Err(Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        if account.is_active && self.verify_password(&account, password) {
            Ok(Some(account))
        } else {
            Ok(None)
        }
    }

    /// Replace an account's password
    pub fn set_password(&self, id: Uuid, new_password: &str) -> Result<Account> {
        let mut account = self.get_account(id)?;
        account.password_hash = self.hasher.hash(new_password)?;
        account.updated_at = Utc::now();
        self.repository.update_account(&account)?;
        Ok(account)
    }

    /// Get all accounts, ordered by email
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        self.repository.list_accounts()
    }
}
