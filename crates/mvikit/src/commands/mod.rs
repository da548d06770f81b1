//! Command handlers: bridge CLI args to the runtime and output formatting.

pub mod config_cmd;
pub mod run;
