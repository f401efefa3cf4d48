//! CLI command implementations

pub mod logs;
pub mod recipe;
pub mod user;

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::Password;
use recipebox_core::{EntryPoint, LoggingService, OperationResult, RecipeBoxContext};
use serde::Serialize;

/// A failure whose details were already written to stdout
///
/// `main` exits non-zero on it without printing anything else.
#[derive(Debug)]
pub struct AlreadyReported;

impl fmt::Display for AlreadyReported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation failed")
    }
}

impl std::error::Error for AlreadyReported {}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log the outcome of a core operation under `<event>` or `<event>_failed`
///
/// Logging errors are ignored; they should never break the app.
pub fn log_outcome<T>(
    logger: &Option<LoggingService>,
    event: &str,
    result: &recipebox_core::Result<T>,
) {
    if let Some(logger) = logger {
        let _ = match result {
            Ok(_) => logger.log_event(event),
            Err(e) => logger.log_error(&format!("{}_failed", event), e),
        };
    }
}

/// Record which command ran; errors are ignored
pub fn log_command(command: &str) {
    if let Some(logger) = get_logger() {
        let _ = logger.log_command(command);
    }
}

/// Print a `--json` envelope, failing with `AlreadyReported` when it holds an error
pub fn print_envelope<T: Serialize>(envelope: &OperationResult<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    if envelope.success {
        Ok(())
    } else {
        Err(AlreadyReported.into())
    }
}

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RECIPEBOX_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".recipebox"))
        .context("Could not find home directory; set RECIPEBOX_DIR")
}

/// Get or create the RecipeBox context
pub fn get_context() -> Result<RecipeBoxContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    RecipeBoxContext::new(&data_dir).context("Failed to initialize recipebox context")
}

/// Use the given password or prompt for one without echo
pub fn password_or_prompt(password: Option<String>, confirm: bool) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipebox_core::Error;

    #[test]
    fn test_failed_envelope_is_already_reported() {
        let failed: OperationResult<u32> =
            recipebox_core::Result::<u32>::Err(Error::validation("email cannot be empty")).into();
        let err = print_envelope(&failed).unwrap_err();
        assert!(err.is::<AlreadyReported>());
    }

    #[test]
    fn test_successful_envelope_is_ok() {
        let ok: OperationResult<u32> = OperationResult::ok(7);
        assert!(print_envelope(&ok).is_ok());
    }

    #[test]
    fn test_command_names() {
        let list = user::UserCommands::List { json: false };
        assert_eq!(list.name(), "user list");

        let show = recipe::RecipeCommands::Show {
            id: "x".to_string(),
            json: true,
        };
        assert_eq!(show.name(), "recipe show");
    }
}
