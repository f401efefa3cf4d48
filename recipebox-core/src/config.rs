//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "app": { "inMemory": false, ... },
//!   "passwordHashing": { "memoryCost": 19456, "timeCost": 2, "parallelism": 1 }
//! }
//! ```
//! Keys the library does not manage are preserved when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::Argon2Params;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    password_hashing: Option<Argon2Params>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    in_memory: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// RecipeBox configuration (simplified view of settings)
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Use a throwaway in-memory database instead of recipebox.duckdb
    pub in_memory: bool,
    /// Argon2id cost parameters for new password hashes
    pub password_hashing: Argon2Params,
    /// Value forced by RECIPEBOX_IN_MEMORY at load time
    in_memory_override: Option<bool>,
}

/// Parse a boolean environment override
fn env_flag(name: &str) -> Option<bool> {
    match std::env::var(name).ok().as_deref() {
        Some("true" | "1" | "yes" | "TRUE" | "YES") => Some(true),
        Some("false" | "0" | "no" | "FALSE" | "NO") => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// In-memory mode can be enabled via:
    /// 1. Settings file (`app.inMemory`)
    /// 2. Environment variable RECIPEBOX_IN_MEMORY (for CI/testing)
    ///
    /// A malformed settings file is an error rather than silently ignored,
    /// since it may carry hashing costs.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        Ok(Self::from_settings(raw, env_flag("RECIPEBOX_IN_MEMORY")))
    }

    fn from_settings(raw: SettingsFile, in_memory_override: Option<bool>) -> Self {
        Self {
            in_memory: in_memory_override.unwrap_or(raw.app.in_memory),
            password_hashing: raw.password_hashing.unwrap_or_default(),
            in_memory_override,
        }
    }

    /// Save config to the data directory
    ///
    /// Preserves other settings that the library doesn't manage. An
    /// environment override of `in_memory` is not written back unless the
    /// caller changed the value after loading.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        match self.in_memory_override {
            Some(forced) if forced == self.in_memory => {}
            _ => settings.app.in_memory = self.in_memory,
        }
        settings.password_hashing = Some(self.password_hashing);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join("settings.json"), content)?;
        Ok(())
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    let settings = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid {}: {}", settings_path.display(), e))?;
    Ok(settings)
}
