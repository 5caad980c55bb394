// Runtime settings
//
// Layered with the `config` crate: built-in defaults, then an optional TOML file, then
// `MEGAMAIL_*` environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::utils::logging::mask_sensitive;
use crate::utils::path_resolver;

pub const DEFAULT_API_BASE_URL: &str = "https://api.elasticemail.com/v4";

/// Recounts are never debounced for less than this.
pub const MIN_RECOUNT_DEBOUNCE_MS: u64 = 250;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub request_timeout_secs: u64,
    pub recount_debounce_ms: u64,
    pub read_retries: usize,
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: String::new(),
            request_timeout_secs: 30,
            recount_debounce_ms: 300,
            read_retries: 3,
            log_dir: None,
        }
    }
}

impl Settings {
    /// Load settings. `file` overrides the default `<config_dir>/megamail/config.toml`.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = config::Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("api_key", defaults.api_key)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("recount_debounce_ms", defaults.recount_debounce_ms)?
            .set_default("read_retries", defaults.read_retries as u64)?;

        match file {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(path) = path_resolver::default_config_file() {
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        builder
            .add_source(config::Environment::with_prefix("MEGAMAIL"))
            .build()
            .context("Failed to read MegaMail settings")?
            .try_deserialize()
            .context("Invalid MegaMail settings")
    }

    /// One-line summary for the log, with the API key masked.
    pub fn summary(&self) -> String {
        format!(
            "api_base_url={} api_key={} debounce_ms={}",
            self.api_base_url,
            mask_sensitive(&self.api_key),
            self.recount_debounce().as_millis()
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn recount_debounce(&self) -> Duration {
        Duration::from_millis(self.recount_debounce_ms.max(MIN_RECOUNT_DEBOUNCE_MS))
    }
}
