//! Reactive state/event core for MVI-style screens.
//!
//! Each screen owns a [`Controller`] that turns UI events into state
//! replacements and one-shot outputs. Two process-wide services, bundled in
//! an [`AppContext`], let controllers cooperate without knowing each other:
//!
//! - **[`Controller`]**: built with [`Controller::builder`]. Accepts events
//!   through [`emit_event()`](Controller::emit_event) (never blocks, never
//!   drops) and publishes on three channels with different contracts:
//!   [`observe_state()`](Controller::observe_state) replays the latest value
//!   to every subscriber, [`observe_navigation()`](Controller::observe_navigation)
//!   buffers transitions for the single router, and
//!   [`observe_effects()`](Controller::observe_effects) delivers each effect
//!   exactly once. Handlers run as long-lived tasks behind a per-event failure
//!   boundary; uncaught failures become one generic error popup.
//!
//! - **[`ListenerRegistry`]**: token → typed callback directory. Tokens are
//!   plain strings, so they travel inside navigation parameters and resolve
//!   back into `Arc<dyn Capability>` on the other screen.
//!
//! - **[`NotificationBroker`]**: single rendering slot for transient
//!   notifications (FIFO [`SnackbarQueue`]) and modal popups
//!   ([`PopupStack`], replace-on-show with key de-duplication).

pub mod broker;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod registry;
pub mod stream;

mod isolate;
mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use broker::{
    Notification, NotificationBroker, NotificationContent, NotificationDuration, NotificationId,
    NotificationLevel, NotificationRequest, Popup, PopupContent, PopupId, PopupSpec, PopupStack,
    ShowOutcome, SnackbarQueue,
};
pub use config::{GENERIC_ERROR_KEY, GenericErrorText, RuntimeConfig};
pub use context::AppContext;
pub use controller::{Contract, Controller, ControllerBuilder, Scope};
pub use error::{Channel, CoreError};
pub use registry::{ListenerRegistry, ListenerToken};
pub use stream::{EffectStream, NavigationStream, StateStream};
