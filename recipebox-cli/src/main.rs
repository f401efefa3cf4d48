//! RecipeBox CLI - manage accounts and recipes from your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{logs, recipe, user};

/// RecipeBox - accounts and recipes from your terminal
#[derive(Parser)]
#[command(name = "rb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Manage recipes
    Recipe {
        #[command(subcommand)]
        command: recipe::RecipeCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is::<commands::AlreadyReported>() => ExitCode::FAILURE,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // `rb logs` reads the log; recording itself there would skew its output
    match &cli.command {
        Commands::User { command } => commands::log_command(command.name()),
        Commands::Recipe { command } => commands::log_command(command.name()),
        Commands::Logs { .. } => {}
    }

    match cli.command {
        Commands::User { command } => user::run(command),
        Commands::Recipe { command } => recipe::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
