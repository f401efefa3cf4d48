//! Event log database migrations
//!
//! Kept separate from the main schema because logs live in their own
//! `logs.duckdb` file. Applied by the same `MigrationService` runner.

use crate::migrations::{MigrationSet, BOOTSTRAP};

pub const LOG_MIGRATIONS: MigrationSet = MigrationSet {
    name: "logs",
    migrations: &[
        (BOOTSTRAP, include_str!("000_migrations.sql")),
        ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
    ],
};
