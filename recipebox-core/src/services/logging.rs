//! Logging service - structured event logging to DuckDB
//!
//! Stores privacy-safe events in logs.duckdb. No user data (emails,
//! passwords, recipe titles, prices) is ever logged; events only name what
//! happened and, for failures, the error kind.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::domain::result::Error;
use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::MigrationService;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    let timestamp = now_ms().max(0) as u64;

    // Lower 16 bits hold the counter (65536 unique IDs per millisecond)
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Current unix timestamp in milliseconds
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Detect the current platform
fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Entry point for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Library,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Library => "library",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogEvent {
    /// Create a new log event with just an event name
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            command: None,
            error_kind: None,
            error_message: None,
        }
    }

    /// Set the command context (for CLI events)
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attach a core error
    ///
    /// Only the error kind is kept for errors whose message can carry user
    /// data (validation, uniqueness, not-found messages echo inputs).
    pub fn with_error(mut self, error: &Error) -> Self {
        self.error_kind = Some(error.kind().to_string());
        self.error_message = match error {
            Error::Database(_) | Error::Config(_) | Error::Io(_) | Error::Json(_) => {
                Some(error.to_string())
            }
            _ => None,
        };
        self
    }
}

/// Selects log entries; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Exact event name, e.g. `recipe_created_failed`
    pub event: Option<String>,
    /// Exact error kind, e.g. `uniqueness_violation`
    pub error_kind: Option<String>,
    /// Only entries that carry an error kind
    pub errors_only: bool,
}

impl LogFilter {
    fn where_clause(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut args = Vec::new();

        if let Some(event) = &self.event {
            conditions.push("event = ?");
            args.push(event.clone());
        }
        if let Some(kind) = &self.error_kind {
            conditions.push("error_kind = ?");
            args.push(kind.clone());
        } else if self.errors_only {
            conditions.push("error_kind IS NOT NULL");
        }

        if conditions.is_empty() {
            (String::new(), args)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), args)
        }
    }
}

/// Number of entries sharing an event name or error kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    pub name: String,
    pub count: u64,
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

const ENTRY_COLUMNS: &str = "id, timestamp, entry_point, app_version, platform,
                             event, command, error_kind, error_message";

/// Service for structured event logging
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Create a new logging service
    ///
    /// Opens or creates logs.duckdb in the data directory and runs any
    /// pending log migrations.
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        })
    }

    /// Log an event
    ///
    /// The entry_point, app_version, and platform are added from the service
    /// configuration.
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        conn.execute(
            &format!(
                "INSERT INTO sys_logs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                ENTRY_COLUMNS
            ),
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.command,
                &event.error_kind,
                &event.error_message,
            ],
        )?;

        Ok(())
    }

    /// Log a simple event with just a name
    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// Log a CLI command execution
    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_command(command))
    }

    /// Log a failed operation
    pub fn log_error(&self, event: &str, error: &Error) -> Result<()> {
        self.log(LogEvent::new(event).with_error(error))
    }

    /// Entries matching `filter`, newest first
    pub fn query(&self, filter: &LogFilter, limit: usize) -> Result<Vec<LogEntry>> {
        let (clause, args) = filter.where_clause();
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_logs {} ORDER BY timestamp DESC, id DESC LIMIT {}",
            ENTRY_COLUMNS, clause, limit
        ))?;

        let entries = stmt
            .query_map(duckdb::params_from_iter(args.iter()), |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    entry_point: row.get(2)?,
                    app_version: row.get(3)?,
                    platform: row.get(4)?,
                    event: row.get(5)?,
                    command: row.get(6)?,
                    error_kind: row.get(7)?,
                    error_message: row.get(8)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Entry counts per event name, busiest first
    pub fn event_counts(&self) -> Result<Vec<EventCount>> {
        self.grouped_counts(
            "SELECT event, COUNT(*) AS n FROM sys_logs
             GROUP BY event ORDER BY n DESC, event",
        )
    }

    /// Failure counts per error kind, most frequent first
    pub fn error_kind_counts(&self) -> Result<Vec<EventCount>> {
        self.grouped_counts(
            "SELECT error_kind, COUNT(*) AS n FROM sys_logs
             WHERE error_kind IS NOT NULL
             GROUP BY error_kind ORDER BY n DESC, error_kind",
        )
    }

    fn grouped_counts(&self, sql: &str) -> Result<Vec<EventCount>> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let mut stmt = conn.prepare(sql)?;
        let counts = stmt
            .query_map([], |row| {
                Ok(EventCount {
                    name: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(counts)
    }

    /// Delete logs older than the specified timestamp (unix ms)
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    /// Get the path to the logs database
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn total(service: &LoggingService) -> usize {
        service.query(&LogFilter::default(), 1000).unwrap().len()
    }

    fn errors_only() -> LogFilter {
        LogFilter {
            errors_only: true,
            ..LogFilter::default()
        }
    }

    #[test]
    fn test_logging_service_creation() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        assert!(service.db_path().exists());
    }

    #[test]
    fn test_reopen_keeps_entries() {
        let dir = tempdir().unwrap();
        {
            let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();
            service.log_event("account_created").unwrap();
        }
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();
        assert_eq!(total(&service), 1);
    }

    #[test]
    fn test_log_event() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log_event("recipe_created").unwrap();

        let entries = service.query(&LogFilter::default(), 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "recipe_created");
        assert_eq!(entries[0].entry_point, "cli");
        assert_eq!(entries[0].app_version, "1.0.0");
    }

    #[test]
    fn test_log_command() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Library, "2.0.0").unwrap();

        service.log_command("user create").unwrap();

        let entries = service.query(&LogFilter::default(), 10).unwrap();
        assert_eq!(entries[0].event, "command_executed");
        assert_eq!(entries[0].command.as_deref(), Some("user create"));
        assert_eq!(entries[0].entry_point, "library");
    }

    #[test]
    fn test_log_error_drops_user_data() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        let err = Error::uniqueness("an account with email secret@example.com already exists");
        service.log_error("account_create_failed", &err).unwrap();

        let errors = service.query(&errors_only(), 10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].event, "account_create_failed");
        assert_eq!(errors[0].error_kind.as_deref(), Some("uniqueness_violation"));
        assert!(errors[0].error_message.is_none());
    }

    #[test]
    fn test_log_error_keeps_database_message() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service
            .log_error("open_failed", &Error::database("file is already open"))
            .unwrap();

        let errors = service.query(&errors_only(), 10).unwrap();
        assert_eq!(errors[0].error_kind.as_deref(), Some("database"));
        assert!(errors[0].error_message.as_deref().unwrap().contains("already open"));
    }

    #[test]
    fn test_count_and_delete() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log_event("event1").unwrap();
        service.log_event("event2").unwrap();
        service.log_event("event3").unwrap();

        assert_eq!(total(&service), 3);

        // Delete all logs (using future timestamp)
        let deleted = service.delete_before(now_ms() + 1000).unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(total(&service), 0);
    }

    #[test]
    fn test_query_by_event_and_kind() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log_event("account_created").unwrap();
        service
            .log_error("account_created_failed", &Error::uniqueness("taken"))
            .unwrap();
        service
            .log_error("recipe_created_failed", &Error::validation("bad price"))
            .unwrap();

        let by_event = LogFilter {
            event: Some("account_created_failed".to_string()),
            ..LogFilter::default()
        };
        let entries = service.query(&by_event, 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].error_kind.as_deref(), Some("uniqueness_violation"));

        let by_kind = LogFilter {
            error_kind: Some("validation".to_string()),
            ..LogFilter::default()
        };
        let entries = service.query(&by_kind, 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "recipe_created_failed");

        assert_eq!(service.query(&errors_only(), 10).unwrap().len(), 2);
        assert_eq!(service.query(&LogFilter::default(), 2).unwrap().len(), 2);
    }

    #[test]
    fn test_grouped_counts() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap();

        service.log_command("user create").unwrap();
        service.log_command("recipe new").unwrap();
        service.log_event("account_created").unwrap();
        service
            .log_error("recipe_created_failed", &Error::validation("bad price"))
            .unwrap();

        let events = service.event_counts().unwrap();
        assert_eq!(
            events[0],
            EventCount {
                name: "command_executed".to_string(),
                count: 2
            }
        );
        assert_eq!(events.len(), 3);

        let kinds = service.error_kind_counts().unwrap();
        assert_eq!(
            kinds,
            vec![EventCount {
                name: "validation".to_string(),
                count: 1
            }]
        );
    }
}
