//! User command - create accounts and check credentials

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use recipebox_core::{Account, NewAccount, OperationResult};

use super::{get_context, get_logger, log_outcome, password_or_prompt, print_envelope};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a regular user
    Create {
        /// Email address (domain part is lowercased)
        email: String,
        /// Password (prompted for if omitted)
        #[arg(long, env = "RECIPEBOX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a superuser (staff + all permissions)
    #[command(name = "createsuperuser")]
    CreateSuperuser {
        /// Email address (domain part is lowercased)
        email: String,
        /// Password (prompted for if omitted)
        #[arg(long, env = "RECIPEBOX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a password against a user's stored hash
    CheckPassword {
        email: String,
        #[arg(long, env = "RECIPEBOX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Replace a user's password
    SetPassword {
        email: String,
        #[arg(long, env = "RECIPEBOX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// List all users
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl UserCommands {
    /// Command path as typed, for the event log
    pub fn name(&self) -> &'static str {
        match self {
            UserCommands::Create { .. } => "user create",
            UserCommands::CreateSuperuser { .. } => "user createsuperuser",
            UserCommands::CheckPassword { .. } => "user check-password",
            UserCommands::SetPassword { .. } => "user set-password",
            UserCommands::List { .. } => "user list",
        }
    }
}

pub fn run(command: UserCommands) -> Result<()> {
    match command {
        UserCommands::Create { email, password, name, json } => {
            let password = password_or_prompt(password, true)?;
            let mut new = NewAccount::new(email, password);
            if let Some(name) = name {
                new = new.with_name(name);
            }
            run_create(new, "account_created", json)
        }
        UserCommands::CreateSuperuser { email, password, json } => {
            let password = password_or_prompt(password, true)?;
            run_create(NewAccount::new(email, password).superuser(), "superuser_created", json)
        }
        UserCommands::CheckPassword { email, password } => run_check_password(&email, password),
        UserCommands::SetPassword { email, password } => run_set_password(&email, password),
        UserCommands::List { json } => run_list(json),
    }
}

fn run_create(new: NewAccount, event: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let result = ctx.account_service.create_account_with(new);
    log_outcome(&logger, event, &result);

    if json {
        let envelope: OperationResult<Account> = result.into();
        return print_envelope(&envelope);
    }

    let account = result?;
    let kind = if account.is_superuser { "Superuser" } else { "User" };
    output::success(&format!("{} created", kind));
    println!("  ID: {}", account.id);
    println!("  Email: {}", account.email);
    if !account.name.is_empty() {
        println!("  Name: {}", account.name);
    }
    Ok(())
}

fn run_check_password(email: &str, password: Option<String>) -> Result<()> {
    let ctx = get_context()?;
    let account = ctx.account_service.get_account_by_email(email)?;
    let password = password_or_prompt(password, false)?;

    if ctx.account_service.verify_password(&account, &password) {
        output::success("Password matches");
        Ok(())
    } else {
        bail!("Password does not match")
    }
}

fn run_set_password(email: &str, password: Option<String>) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let account = ctx.account_service.get_account_by_email(email)?;
    let password = password_or_prompt(password, true)?;

    let result = ctx.account_service.set_password(account.id, &password);
    log_outcome(&logger, "password_changed", &result);
    result?;

    output::success("Password updated");
    Ok(())
}

fn run_list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let accounts = ctx.account_service.list_accounts()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Email", "Name", "Active", "Staff", "Superuser", "Created"]);
    for account in &accounts {
        table.add_row(vec![
            account.email.clone(),
            account.name.clone(),
            output::flag(account.is_active),
            output::flag(account.is_staff),
            output::flag(account.is_superuser),
            account.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    println!("{}", table);
    println!("{}", format!("{} user(s)", accounts.len()).dimmed());
    Ok(())
}
