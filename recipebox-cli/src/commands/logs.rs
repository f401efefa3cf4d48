//! Logs command - inspect the privacy-safe event log
//!
//! Events are named after what happened (`account_created`,
//! `recipe_created_failed`, `command_executed`); failures also carry the
//! core error kind, so both are offered as filters and as stats groupings.

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use recipebox_core::{EntryPoint, EventCount, LogFilter, LoggingService};

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Only this event name (e.g. account_created_failed)
        #[arg(long)]
        event: Option<String>,
        /// Only failures of this error kind (e.g. uniqueness_violation)
        #[arg(long)]
        kind: Option<String>,
        /// Only failures
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Count events by name and failures by error kind
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete events older than a number of days
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let service = LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?;

    match command {
        LogsCommands::List {
            limit,
            event,
            kind,
            errors,
            json,
        } => {
            let filter = LogFilter {
                event,
                error_kind: kind,
                errors_only: errors,
            };
            list(&service, &filter, limit, json)
        }
        LogsCommands::Stats { json } => stats(&service, json),
        LogsCommands::Clear {
            older_than_days,
            force,
        } => clear(&service, older_than_days, force),
    }
}

fn list(service: &LoggingService, filter: &LogFilter, limit: usize, json: bool) -> Result<()> {
    let entries = service.query(filter, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No matching events.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Command", "Kind", "Detail"]);
    for entry in entries {
        let time = Utc
            .timestamp_millis_opt(entry.timestamp)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let kind = entry
            .error_kind
            .map(|k| k.red().to_string())
            .unwrap_or_default();

        table.add_row(vec![
            time,
            entry.event,
            entry.command.unwrap_or_default(),
            kind,
            entry.error_message.unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn stats(service: &LoggingService, json: bool) -> Result<()> {
    let events = service.event_counts()?;
    let kinds = service.error_kind_counts()?;
    let total: u64 = events.iter().map(|c| c.count).sum();
    let size_bytes = std::fs::metadata(service.db_path())
        .map(|m| m.len())
        .unwrap_or(0);

    if json {
        let stats = serde_json::json!({
            "total": total,
            "events": events,
            "errorKinds": kinds,
            "databasePath": service.db_path(),
            "databaseSizeBytes": size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!(
        "{} events in {} ({})",
        total,
        service.db_path().display(),
        output::format_size(size_bytes)
    );
    print_counts("Event", &events);
    if !kinds.is_empty() {
        print_counts("Error kind", &kinds);
    }
    Ok(())
}

fn print_counts(header: &str, counts: &[EventCount]) {
    let mut table = output::create_table();
    table.set_header(vec![header, "Count"]);
    for count in counts {
        table.add_row(vec![count.name.clone(), count.count.to_string()]);
    }
    println!("{}", table);
}

fn clear(service: &LoggingService, older_than_days: i64, force: bool) -> Result<()> {
    let cutoff = Utc::now() - Duration::days(older_than_days);

    if !force
        && !Confirm::new()
            .with_prompt(format!("Delete events before {}?", cutoff.format("%Y-%m-%d")))
            .default(false)
            .interact()?
    {
        return Ok(());
    }

    let deleted = service.delete_before(cutoff.timestamp_millis())?;
    output::success(&format!("Deleted {} event(s)", deleted));
    Ok(())
}
