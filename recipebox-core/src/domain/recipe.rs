//! Recipe domain model

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Maximum title length in characters
pub const MAX_TITLE_LENGTH: usize = 255;

/// Price column precision: DECIMAL(5, 2)
pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// A recipe owned by exactly one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub time_minutes: u32,
    /// Exact decimal price, serialized as a string
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub description: Option<String>,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// Build a recipe for an owner from its creation fields
    pub fn new(owner_id: Uuid, fields: NewRecipe) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: fields.title,
            time_minutes: fields.time_minutes,
            price: fields.price,
            description: fields.description,
            link: fields.link,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check that a price fits the DECIMAL(5, 2) column
    ///
    /// Negative values fit the column and are accepted.
    pub fn validate_price(price: Decimal) -> Result<()> {
        let normalized = price.normalize();
        if normalized.scale() > PRICE_DECIMAL_PLACES {
            return Err(Error::validation(format!(
                "price must have at most {} decimal places",
                PRICE_DECIMAL_PLACES
            )));
        }

        let max_whole = Decimal::from(10u64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
        if normalized.abs().trunc() >= max_whole {
            return Err(Error::validation(format!(
                "price must have at most {} digits",
                PRICE_MAX_DIGITS
            )));
        }

        Ok(())
    }

    /// Validate recipe data against the column limits
    pub fn validate(&self) -> Result<()> {
        if self.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(Error::validation(format!(
                "recipe title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        Self::validate_price(self.price)
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Creation fields for a recipe
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: u32,
    pub price: Decimal,
    pub description: Option<String>,
    pub link: Option<String>,
}

impl NewRecipe {
    pub fn new(title: impl Into<String>, time_minutes: u32, price: Decimal) -> Self {
        Self {
            title: title.into(),
            time_minutes,
            price,
            description: None,
            link: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}
