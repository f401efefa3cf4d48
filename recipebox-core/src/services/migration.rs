//! Migration service - applies an embedded `MigrationSet` to a connection
//!
//! Every migration runs in its own transaction together with its
//! `sys_migrations` record, so a failing file leaves neither schema changes
//! nor a record behind and is retried on the next open.

use anyhow::{anyhow, Context, Result};
use duckdb::Connection;

use crate::migrations::{MigrationSet, BOOTSTRAP, MIGRATIONS};

/// Outcome of `MigrationService::run_pending`
#[derive(Debug)]
pub struct MigrationResult {
    /// Migrations applied by this run, in order
    pub applied: Vec<String>,
    /// Migrations that were recorded before this run
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
    set: MigrationSet,
}

impl<'a> MigrationService<'a> {
    /// Migration service for the account and recipe schema
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    pub fn with_migrations(conn: &'a Connection, set: MigrationSet) -> Self {
        Self { conn, set }
    }

    /// Bring the schema up to date
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut applied = Vec::new();

        if !self.is_bootstrapped()? {
            let sql = self
                .set
                .bootstrap()
                .ok_or_else(|| anyhow!("{} migrations have no bootstrap file", self.set.name))?;
            self.apply(BOOTSTRAP, sql)?;
            applied.push(BOOTSTRAP.to_string());
        }

        let recorded = self.get_applied()?;
        let already_applied = recorded.len() - applied.len();

        for (name, sql) in self.set.migrations {
            if recorded.iter().any(|r| r == name) {
                continue;
            }
            self.apply(name, sql)?;
            applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied,
            already_applied,
        })
    }

    /// Names recorded in sys_migrations
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Names of the set not yet recorded, in application order
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let recorded = if self.is_bootstrapped()? {
            self.get_applied()?
        } else {
            Vec::new()
        };
        Ok(self
            .set
            .migrations
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !recorded.contains(name))
            .collect())
    }

    fn is_bootstrapped(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;

        let outcome = self.conn.execute_batch(sql).and_then(|_| {
            self.conn
                .execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])
                .map(|_| ())
        });

        match outcome {
            Ok(()) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e).with_context(|| format!("{} migration {} failed", self.set.name, name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_migrations::LOG_MIGRATIONS;

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), MIGRATIONS.migrations.len());
        assert_eq!(result.applied[0], BOOTSTRAP);
        assert_eq!(result.already_applied, 0);

        let again = service.run_pending().unwrap();
        assert!(again.applied.is_empty());
        assert_eq!(again.already_applied, MIGRATIONS.migrations.len());
    }

    #[test]
    fn test_get_pending_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        assert_eq!(service.get_pending().unwrap().len(), MIGRATIONS.migrations.len());
        service.run_pending().unwrap();
        assert!(service.get_pending().unwrap().is_empty());
    }

    #[test]
    fn test_log_migration_set() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::with_migrations(&conn, LOG_MIGRATIONS);

        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), LOG_MIGRATIONS.migrations.len());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_failed_migration_is_rolled_back() {
        const BROKEN: MigrationSet = MigrationSet {
            name: "broken",
            migrations: &[
                (BOOTSTRAP, include_str!("../migrations/000_migrations.sql")),
                (
                    "001_half.sql",
                    "CREATE TABLE half_done (id INTEGER); SELEC oops;",
                ),
            ],
        };

        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::with_migrations(&conn, BROKEN);

        let err = service.run_pending().unwrap_err();
        assert!(format!("{:#}", err).contains("broken migration 001_half.sql failed"));

        assert_eq!(service.get_applied().unwrap(), vec![BOOTSTRAP.to_string()]);
        assert_eq!(service.get_pending().unwrap(), vec!["001_half.sql".to_string()]);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'half_done'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn test_set_without_bootstrap_is_rejected() {
        const HEADLESS: MigrationSet = MigrationSet {
            name: "headless",
            migrations: &[("001_only.sql", "CREATE TABLE only_table (id INTEGER);")],
        };

        let conn = Connection::open_in_memory().unwrap();
        let err = MigrationService::with_migrations(&conn, HEADLESS)
            .run_pending()
            .unwrap_err();
        assert!(err.to_string().contains("no bootstrap"));
    }

    #[test]
    fn test_schema_enforces_unique_email() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationService::new(&conn).run_pending().unwrap();

        let insert = "INSERT INTO sys_accounts (account_id, email, password_hash, created_at, updated_at)
                      VALUES (?, 'a@example.com', 'h', 'now', 'now')";
        conn.execute(insert, ["id-1"]).unwrap();
        assert!(conn.execute(insert, ["id-2"]).is_err());
    }
}
