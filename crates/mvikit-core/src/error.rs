// ── Core error types ──
//
// Errors surfaced by the state/event core. Handler bodies return these
// to signal failures they did not recover from locally; the controller
// funnels them into its failure hook. Registry errors are programmer
// errors and are never papered over with defaults.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Listener registry ────────────────────────────────────────────
    #[error("No listener registered under token '{token}'")]
    ListenerNotFound { token: String },

    #[error("Listener '{token}' is a {found}, not the requested {expected}")]
    ListenerTypeMismatch {
        token: String,
        expected: &'static str,
        found: &'static str,
    },

    // ── Controller lifecycle ─────────────────────────────────────────
    #[error("Controller has been disposed")]
    ControllerDisposed,

    #[error("The {channel} channel already has an observer")]
    AlreadyObserved { channel: Channel },

    #[error("The {channel} channel is closed")]
    ChannelClosed { channel: Channel },

    #[error("Handler '{handler}' panicked")]
    HandlerPanicked { handler: String },

    // ── Work performed by handlers ───────────────────────────────────
    #[error("Service call failed: {message}")]
    Service { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a failed external service call.
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    /// Whether this error signals a caller bug rather than a runtime failure.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::ListenerNotFound { .. }
                | Self::ListenerTypeMismatch { .. }
                | Self::AlreadyObserved { .. }
        )
    }
}

/// Output channels of a controller, named in error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    Event,
    State,
    Navigation,
    Effect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_render_lowercase() {
        let err = CoreError::AlreadyObserved {
            channel: Channel::Navigation,
        };
        assert_eq!(err.to_string(), "The navigation channel already has an observer");
    }

    #[test]
    fn registry_failures_are_programmer_errors() {
        let missing = CoreError::ListenerNotFound {
            token: "listener-9".into(),
        };
        assert!(missing.is_programmer_error());
        assert!(!CoreError::service("timeout").is_programmer_error());
    }
}
