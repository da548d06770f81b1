//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use mvikit_config::ConfigError;
use mvikit_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const SESSION: i32 = 4;
    pub const TIMEOUT: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration is invalid")]
    #[diagnostic(
        code(mvikit::config),
        help(
            "Inspect the effective settings with: mvikit config show\n\
             Environment overrides use the MVIKIT_ prefix with __ between sections."
        )
    )]
    Config(#[from] ConfigError),

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(mvikit::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── Session ──────────────────────────────────────────────────────

    #[error("Sign-in was rejected: {reason}")]
    #[diagnostic(
        code(mvikit::login_rejected),
        help("The mock service accepts any non-empty username and password.")
    )]
    LoginRejected { reason: String },

    #[error("Timed out during the {step} step")]
    #[diagnostic(
        code(mvikit::session_timeout),
        help("Lower --latency-ms or rerun with -vv to see controller activity.")
    )]
    SessionTimeout { step: &'static str },

    #[error("Screen closed during the {step} step")]
    #[diagnostic(code(mvikit::session_aborted))]
    SessionAborted { step: &'static str },

    // ── Core / output ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(mvikit::core))]
    Core(#[from] CoreError),

    #[error("Failed to render output: {reason}")]
    #[diagnostic(code(mvikit::render))]
    Render { reason: String },

    #[error("IO error: {0}")]
    #[diagnostic(code(mvikit::io))]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::ConfigExists { .. } => exit_code::CONFIG,
            Self::LoginRejected { .. } | Self::SessionAborted { .. } => exit_code::SESSION,
            Self::SessionTimeout { .. } => exit_code::TIMEOUT,
            Self::Core(_) | Self::Render { .. } | Self::Io(_) => exit_code::GENERAL,
        }
    }
}
