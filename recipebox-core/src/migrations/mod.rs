//! Database migrations - embedded SQL files
//!
//! Each schema is a named `MigrationSet` of `(filename, sql)` pairs compiled
//! in with `include_str!` and applied in listed order. The first entry of
//! every set must be the `000_migrations.sql` bootstrap that creates
//! `sys_migrations`.

/// Filename of the bootstrap migration shared by every set
pub const BOOTSTRAP: &str = "000_migrations.sql";

/// An ordered, named list of embedded migrations
#[derive(Debug, Clone, Copy)]
pub struct MigrationSet {
    /// Schema name, used in error context
    pub name: &'static str,
    pub migrations: &'static [(&'static str, &'static str)],
}

impl MigrationSet {
    /// SQL of the bootstrap migration, if the set carries one
    pub fn bootstrap(&self) -> Option<&'static str> {
        self.migrations
            .iter()
            .find(|(name, _)| *name == BOOTSTRAP)
            .map(|(_, sql)| *sql)
    }
}

/// Account and recipe schema in `recipebox.duckdb`
///
/// When adding a migration, create `NNN_description.sql` and append it here.
pub const MIGRATIONS: MigrationSet = MigrationSet {
    name: "recipebox",
    migrations: &[
        (BOOTSTRAP, include_str!("000_migrations.sql")),
        ("001_accounts.sql", include_str!("001_accounts.sql")),
        ("002_recipes.sql", include_str!("002_recipes.sql")),
    ],
};
