//! Shared configuration for mvikit applications.
//!
//! TOML file + environment loading, validation, and translation into
//! `mvikit_core::RuntimeConfig`. The core never reads files itself; the
//! binary loads a [`Config`] here and hands the runtime half to the core.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mvikit_core::{GenericErrorText, RuntimeConfig};

/// Environment variable prefix; nested keys are separated by `__`
/// (`MVIKIT_CHANNELS__EVENT_CAPACITY=128`).
pub const ENV_PREFIX: &str = "MVIKIT_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub channels: Channels,

    #[serde(default)]
    pub notifications: Notifications,

    #[serde(default)]
    pub errors: Errors,

    #[serde(default)]
    pub demo: Demo,
}

/// Buffer sizes of each controller's channels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Channels {
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default = "default_output_capacity")]
    pub navigation_capacity: usize,

    #[serde(default = "default_output_capacity")]
    pub effect_capacity: usize,

    #[serde(default = "default_event_capacity")]
    pub state_history_capacity: usize,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            navigation_capacity: default_output_capacity(),
            effect_capacity: default_output_capacity(),
            state_history_capacity: default_event_capacity(),
        }
    }
}

fn default_event_capacity() -> usize {
    64
}
fn default_output_capacity() -> usize {
    16
}

/// Snackbar display times, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Notifications {
    #[serde(default = "default_short_ms")]
    pub short_ms: u64,

    #[serde(default = "default_long_ms")]
    pub long_ms: u64,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            short_ms: default_short_ms(),
            long_ms: default_long_ms(),
        }
    }
}

fn default_short_ms() -> u64 {
    4_000
}
fn default_long_ms() -> u64 {
    10_000
}

/// Text of the generic error popup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Errors {
    #[serde(default = "default_error_title")]
    pub title: String,

    #[serde(default = "default_error_message")]
    pub message: String,
}

impl Default for Errors {
    fn default() -> Self {
        Self {
            title: default_error_title(),
            message: default_error_message(),
        }
    }
}

fn default_error_title() -> String {
    GenericErrorText::default().title
}
fn default_error_message() -> String {
    GenericErrorText::default().message
}

/// Behavior of the demo's mock repository service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Demo {
    /// Username the scripted session logs in with.
    #[serde(default = "default_username")]
    pub username: String,

    /// Simulated latency of every service call.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Make repository listing fail (recovered locally by the home screen).
    #[serde(default)]
    pub fail_fetch: bool,

    /// Make profile loading fail (reaches the generic error popup).
    #[serde(default)]
    pub fail_profile: bool,
}

impl Default for Demo {
    fn default() -> Self {
        Self {
            username: default_username(),
            latency_ms: default_latency_ms(),
            fail_fetch: false,
            fail_profile: false,
        }
    }
}

fn default_username() -> String {
    "octocat".into()
}
fn default_latency_ms() -> u64 {
    150
}

impl Config {
    /// Reject settings the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacities = [
            ("channels.event_capacity", self.channels.event_capacity),
            ("channels.navigation_capacity", self.channels.navigation_capacity),
            ("channels.effect_capacity", self.channels.effect_capacity),
            (
                "channels.state_history_capacity",
                self.channels.state_history_capacity,
            ),
        ];
        for (field, value) in capacities {
            if value == 0 {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: "must be at least 1".into(),
                });
            }
        }

        if self.notifications.short_ms == 0 || self.notifications.long_ms == 0 {
            return Err(ConfigError::Validation {
                field: "notifications".into(),
                reason: "display times must be at least 1 ms".into(),
            });
        }

        if self.errors.title.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "errors.title".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// The part of the configuration the core consumes.
    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            event_capacity: self.channels.event_capacity,
            navigation_capacity: self.channels.navigation_capacity,
            effect_capacity: self.channels.effect_capacity,
            state_history_capacity: self.channels.state_history_capacity,
            short_notification: Duration::from_millis(self.notifications.short_ms),
            long_notification: Duration::from_millis(self.notifications.long_ms),
            generic_error: GenericErrorText {
                title: self.errors.title.clone(),
                message: self.errors.message.clone(),
            },
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "mvikit", "mvikit").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("mvikit");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate the Config from `path` + environment. A missing file
/// is not an error: defaults and environment still apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent dirs.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core_defaults() {
        assert_eq!(Config::default().to_runtime_config(), RuntimeConfig::default());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut cfg = Config::default();
        cfg.channels.effect_capacity = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("channels.effect_capacity"));
    }

    #[test]
    fn blank_error_title_is_rejected() {
        let mut cfg = Config::default();
        cfg.errors.title = "   ".into();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }
}
