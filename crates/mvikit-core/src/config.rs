// ── Runtime tuning ──
//
// Capacities and timings used by controllers and the notification broker.
// The core never reads config files: the application builds a
// `RuntimeConfig` (usually through `mvikit-config`) and hands it in.

use std::time::Duration;

/// Fixed de-duplication key of the generic error popup.
///
/// Repeated uncaught failures collapse into one visible error card.
pub const GENERIC_ERROR_KEY: &str = "generic-error";

/// Tuning shared by every controller and the broker of one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Buffered UI events per controller before `emit_event` overflows
    /// into its FIFO backlog.
    pub event_capacity: usize,
    /// Buffered navigation events before `navigate` suspends.
    pub navigation_capacity: usize,
    /// Buffered effects before `send_effect` suspends.
    pub effect_capacity: usize,
    /// State replacements a slow subscriber may fall behind before it
    /// skips ahead.
    pub state_history_capacity: usize,
    /// Display time of `NotificationDuration::Short`.
    pub short_notification: Duration,
    /// Display time of `NotificationDuration::Long`.
    pub long_notification: Duration,
    /// User-facing text of the generic error popup.
    pub generic_error: GenericErrorText,
}

/// Title and body of the generic full-screen error card.
///
/// Deliberately carries no diagnostic detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericErrorText {
    pub title: String,
    pub message: String,
}

impl Default for GenericErrorText {
    fn default() -> Self {
        Self {
            title: "Something went wrong".into(),
            message: "An unexpected error occurred. Please try again.".into(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_capacity: 64,
            navigation_capacity: 16,
            effect_capacity: 16,
            state_history_capacity: 64,
            short_notification: Duration::from_secs(4),
            long_notification: Duration::from_secs(10),
            generic_error: GenericErrorText::default(),
        }
    }
}
