// ── Notification broker ──
//
// Application-wide owner of transient notifications (snackbar queue) and
// modal popups (popup stack). Controllers publish through it; one rendering
// host subscribes. Also the sink for uncaught handler failures.

mod popup;
mod snackbar;

pub use popup::{Popup, PopupContent, PopupId, PopupSpec, PopupStack, ShowOutcome};
pub use snackbar::{
    Notification, NotificationContent, NotificationDuration, NotificationId, NotificationLevel,
    NotificationRequest, SnackbarQueue,
};

use tracing::debug;

use crate::config::{GENERIC_ERROR_KEY, GenericErrorText, RuntimeConfig};
use crate::error::CoreError;

/// Façade over the snackbar queue and popup stack.
///
/// Cheaply cloneable; clones share both surfaces.
#[derive(Clone)]
pub struct NotificationBroker {
    snackbars: SnackbarQueue,
    popups: PopupStack,
    generic_error: GenericErrorText,
}

impl Default for NotificationBroker {
    fn default() -> Self {
        Self::new(&RuntimeConfig::default())
    }
}

impl NotificationBroker {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            snackbars: SnackbarQueue::new(config.short_notification, config.long_notification),
            popups: PopupStack::new(),
            generic_error: config.generic_error.clone(),
        }
    }

    pub fn notify(&self, request: impl Into<NotificationRequest>) -> NotificationId {
        self.snackbars.enqueue(request)
    }

    pub fn show_popup(&self, spec: PopupSpec) -> ShowOutcome {
        self.popups.show(spec)
    }

    /// Surface an uncaught failure as the generic error popup.
    ///
    /// The popup is keyed, so a burst of failures shows one card. The error
    /// itself stays in the logs and is never shown to the user.
    pub fn report_failure(&self, error: &CoreError) -> ShowOutcome {
        debug!(error = %error, "reporting failure as generic error popup");
        self.popups.show(
            PopupSpec::error(&self.generic_error.title, &self.generic_error.message)
                .key(GENERIC_ERROR_KEY),
        )
    }

    pub fn snackbars(&self) -> &SnackbarQueue {
        &self.snackbars
    }

    pub fn popups(&self) -> &PopupStack {
        &self.popups
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn repeated_failures_collapse_into_one_popup() {
        let broker = NotificationBroker::default();
        let first = broker.report_failure(&CoreError::service("timeout"));
        let second = broker.report_failure(&CoreError::service("timeout again"));

        assert!(first.is_shown());
        assert!(!second.is_shown());

        let popup = broker.popups().current().unwrap();
        assert_eq!(popup.key.as_deref(), Some(GENERIC_ERROR_KEY));
        assert_eq!(
            popup.content,
            PopupContent::Error {
                title: "Something went wrong".into(),
                message: "An unexpected error occurred. Please try again.".into(),
            }
        );
    }

    #[test]
    fn failure_text_never_leaks_into_the_popup() {
        let broker = NotificationBroker::default();
        broker.report_failure(&CoreError::service("db password rejected"));
        let rendered = serde_json::to_string(&*broker.popups().current().unwrap()).unwrap();
        assert!(!rendered.contains("password"));
    }

    #[test]
    fn notify_goes_through_the_queue() {
        let broker = NotificationBroker::default();
        let id = broker.notify("saved");
        assert_eq!(broker.snackbars().current().unwrap().id, id);
    }
}
