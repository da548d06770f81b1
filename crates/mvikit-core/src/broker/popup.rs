// ── Popup stack ──
//
// At most one modal popup is visible. A new popup replaces the current one
// unless both carry the same de-duplication key, in which case the new one
// is dropped. Dismissal callbacks fire exactly once per shown popup,
// outside the stack lock and behind a panic boundary.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::isolate::run_isolated;

/// Identity of one popup instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PopupId(Uuid);

impl fmt::Display for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the rendering host should draw inside the popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PopupContent {
    /// Full-screen error card.
    Error { title: String, message: String },
    Custom {
        kind: String,
        payload: serde_json::Value,
    },
}

/// A popup as seen by the rendering host. Callbacks stay inside the stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub id: PopupId,
    pub key: Option<String>,
    pub content: PopupContent,
    pub auto_dismiss: Option<Duration>,
    pub dismiss_on_outside_tap: bool,
}

type DismissCallback = Box<dyn FnOnce() + Send>;

/// Builder for a popup, submitted through [`PopupStack::show`].
pub struct PopupSpec {
    popup: Popup,
    on_dismiss: Option<DismissCallback>,
}

impl fmt::Debug for PopupSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupSpec")
            .field("popup", &self.popup)
            .field("on_dismiss", &self.on_dismiss.is_some())
            .finish()
    }
}

impl PopupSpec {
    pub fn new(content: PopupContent) -> Self {
        Self {
            popup: Popup {
                id: PopupId(Uuid::new_v4()),
                key: None,
                content,
                auto_dismiss: None,
                dismiss_on_outside_tap: true,
            },
            on_dismiss: None,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(PopupContent::Error {
            title: title.into(),
            message: message.into(),
        })
    }

    pub fn custom(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(PopupContent::Custom {
            kind: kind.into(),
            payload,
        })
    }

    /// Popups with equal keys never stack on each other.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.popup.key = Some(key.into());
        self
    }

    pub fn auto_dismiss(mut self, after: Duration) -> Self {
        self.popup.auto_dismiss = Some(after);
        self
    }

    pub fn dismiss_on_outside_tap(mut self, enabled: bool) -> Self {
        self.popup.dismiss_on_outside_tap = enabled;
        self
    }

    pub fn on_dismiss(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_dismiss = Some(Box::new(callback));
        self
    }

    /// Id the popup will carry once shown.
    pub fn id(&self) -> PopupId {
        self.popup.id
    }
}

/// Result of [`PopupStack::show`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    Shown(PopupId),
    /// A popup with the same key was already visible; the request was dropped.
    Suppressed { current: PopupId },
}

impl ShowOutcome {
    pub fn is_shown(&self) -> bool {
        matches!(self, Self::Shown(_))
    }
}

struct ActivePopup {
    popup: Arc<Popup>,
    on_dismiss: Option<DismissCallback>,
}

struct PopupInner {
    active: Mutex<Option<ActivePopup>>,
    current: watch::Sender<Option<Arc<Popup>>>,
}

/// Single-slot modal popup holder.
#[derive(Clone)]
pub struct PopupStack {
    inner: Arc<PopupInner>,
}

impl Default for PopupStack {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupStack {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            inner: Arc::new(PopupInner {
                active: Mutex::new(None),
                current,
            }),
        }
    }

    /// Show `spec`, replacing the current popup unless the keys match.
    ///
    /// A replaced popup's dismissal callback runs before this returns.
    pub fn show(&self, spec: PopupSpec) -> ShowOutcome {
        let PopupSpec { popup, on_dismiss } = spec;
        let popup = Arc::new(popup);

        let replaced = {
            let mut active = self.inner.active.lock();
            if let Some(current) = active.as_ref() {
                if popup.key.is_some() && current.popup.key == popup.key {
                    debug!(key = ?popup.key, "popup suppressed: same key already visible");
                    return ShowOutcome::Suppressed {
                        current: current.popup.id,
                    };
                }
            }
            let replaced = active.replace(ActivePopup {
                popup: Arc::clone(&popup),
                on_dismiss,
            });
            self.inner.current.send_replace(Some(Arc::clone(&popup)));
            replaced
        };

        debug!(id = %popup.id, key = ?popup.key, "popup shown");
        if let Some(previous) = replaced {
            Self::fire_dismissed(previous);
        }
        if let Some(after) = popup.auto_dismiss {
            self.schedule_auto_dismiss(popup.id, after);
        }
        ShowOutcome::Shown(popup.id)
    }

    /// Dismiss the current popup if it matches.
    ///
    /// The current popup goes if its id equals `id` or its key equals `key`.
    /// With neither given, whatever is visible goes.
    pub fn dismiss(&self, id: Option<PopupId>, key: Option<&str>) -> bool {
        let removed = {
            let mut active = self.inner.active.lock();
            let Some(current) = active.as_ref() else {
                return false;
            };
            let by_id = id.is_some_and(|id| id == current.popup.id);
            let by_key = key.is_some() && current.popup.key.as_deref() == key;
            let unconditional = id.is_none() && key.is_none();
            if !(by_id || by_key || unconditional) {
                return false;
            }
            let removed = active.take();
            self.inner.current.send_replace(None);
            removed
        };

        match removed {
            Some(previous) => {
                debug!(id = %previous.popup.id, "popup dismissed");
                Self::fire_dismissed(previous);
                true
            }
            None => false,
        }
    }

    pub fn dismiss_by_id(&self, id: PopupId) -> bool {
        self.dismiss(Some(id), None)
    }

    pub fn dismiss_by_key(&self, key: &str) -> bool {
        self.dismiss(None, Some(key))
    }

    pub fn dismiss_current(&self) -> bool {
        self.dismiss(None, None)
    }

    /// Outside tap from the host. Dismisses only popups that opted in.
    pub fn tap_outside(&self) -> bool {
        let Some(current) = self.current() else {
            return false;
        };
        if !current.dismiss_on_outside_tap {
            return false;
        }
        self.dismiss_by_id(current.id)
    }

    pub fn current(&self) -> Option<Arc<Popup>> {
        self.inner.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Popup>>> {
        self.inner.current.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn fire_dismissed(previous: ActivePopup) {
        if let Some(callback) = previous.on_dismiss {
            run_isolated("popup on_dismiss", callback);
        }
    }

    fn schedule_auto_dismiss(&self, id: PopupId, after: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(%id, "no runtime; popup auto-dismiss left to host");
            return;
        };
        let stack = self.clone();
        runtime.spawn(async move {
            tokio::time::sleep(after).await;
            stack.dismiss_by_id(id);
        });
    }
}
