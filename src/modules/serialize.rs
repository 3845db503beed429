use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use crate::modules::form::ConfigForm;

pub const DEFAULT_GATEWAY: &str = "http://localhost:8080";

/// Console settings file (`console.toml`).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConsoleSettings {
    pub gateway: String,
    /// Explicit stats socket address; derived from `gateway` when unset.
    pub stats_url: Option<String>,
    /// `0` disables the timeout.
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            gateway: DEFAULT_GATEWAY.to_string(),
            stats_url: None,
            request_timeout_secs: 30,
            log_level: "INFO".to_string(),
        }
    }
}

impl ConsoleSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

pub fn load_settings(path: &str) -> Result<ConsoleSettings, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let settings: ConsoleSettings = toml::from_str(&text)?;
    Ok(settings)
}

pub fn save_settings(path: &str, settings: &ConsoleSettings) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(settings)?;
    fs::write(path, toml_str)?;
    Ok(())
}

/// Reads a form profile: the values a user would type into the form.
pub fn load_form_profile(path: &str) -> Result<ConfigForm, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let form: ConfigForm = toml::from_str(&text)?;
    Ok(form)
}

pub fn is_not_found(err: &Box<dyn std::error::Error>) -> bool {
    err.downcast_ref::<std::io::Error>()
        .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}
