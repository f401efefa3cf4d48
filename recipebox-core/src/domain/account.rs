//! Account domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// A user account identified by its normalized email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Normalized email (domain lowercased), unique across accounts
    pub email: String,
    pub name: String,
    /// Argon2id PHC string; the plaintext is never kept
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a regular account from an already normalized email and hash
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: String::new(),
            password_hash: password_hash.into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Normalize an email address
    ///
    /// The part after the last `@` is lowercased, the local part is kept
    /// verbatim. Input without an `@` passes through unchanged.
    pub fn normalize_email(email: &str) -> String {
        match email.rsplit_once('@') {
            Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
            None => email.to_string(),
        }
    }

    /// Validate and normalize a raw email input
    pub fn parse_email(email: &str) -> Result<String> {
        if email.trim().is_empty() {
            return Err(Error::validation("users must have an email address"));
        }
        Ok(Self::normalize_email(email))
    }

    /// Validate account data
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(Error::validation("users must have an email address"));
        }
        if self.password_hash.is_empty() {
            return Err(Error::validation("password hash cannot be empty"));
        }
        if self.is_superuser && !self.is_staff {
            return Err(Error::validation("superusers must be staff"));
        }
        Ok(())
    }
}

/// Builder for a new account, consumed by the account service
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewAccount {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mark as superuser (which implies staff)
    pub fn superuser(mut self) -> Self {
        self.is_staff = true;
        self.is_superuser = true;
        self
    }
}
