//! Clap derive structures for the `mvikit` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// mvikit -- headless repository-viewer demo of the MVI state/event core
#[derive(Debug, Parser)]
#[command(
    name = "mvikit",
    version,
    about = "Drive a scripted MVI screen session from the terminal",
    long_about = "Runs the repository-viewer demo without a UI toolkit.\n\n\
        Login, home, and profile controllers talk to a mock repository\n\
        service; a console host prints state, snackbars, and popups.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "MVIKIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "text", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write JSON logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines, printed live
    Text,
    /// Pretty-printed JSON document at the end
    Json,
    /// Compact single-line JSON at the end
    JsonCompact,
    /// YAML document at the end
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the scripted login → home → profile session
    Run(RunArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Username to sign in with (overrides config)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Password to sign in with; empty is rejected by the login screen
    #[arg(long, default_value = "hunter2")]
    pub password: String,

    /// Simulated service latency in milliseconds (overrides config)
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Make repository listing fail (home screen recovers locally)
    #[arg(long)]
    pub fail_fetch: bool,

    /// Make profile loading fail (surfaces the generic error popup)
    #[arg(long)]
    pub fail_profile: bool,

    /// Rename the profile to this display name before going back
    #[arg(long)]
    pub rename: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (file + environment + defaults)
    Show,

    /// Print the config file path
    Path,

    /// Write a config file populated with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
