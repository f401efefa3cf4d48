//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod password;
mod recipe;
pub mod result;

pub use account::{Account, NewAccount};
pub use password::{Argon2Params, PasswordHasher};
pub use recipe::{NewRecipe, Recipe};
