// ── Snackbar queue ──
//
// Transient messages share one display slot. The first request shows
// immediately; later ones wait in strict FIFO order and are promoted as
// each displayed message completes (dismissal, timeout, or advance).

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

/// Identity of one enqueued notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Urgency of a message notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// How long a notification occupies the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationDuration {
    #[default]
    Short,
    Long,
    /// Stays until completed explicitly.
    Indefinite,
    Custom(Duration),
}

/// What the rendering host should display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotificationContent {
    Message {
        text: String,
        level: NotificationLevel,
    },
    /// Arbitrary directive interpreted by the rendering host.
    Custom {
        kind: String,
        payload: serde_json::Value,
    },
}

/// Builder for a notification, submitted through [`SnackbarQueue::enqueue`].
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    content: NotificationContent,
    duration: NotificationDuration,
}

impl NotificationRequest {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            content: NotificationContent::Message {
                text: text.into(),
                level: NotificationLevel::Info,
            },
            duration: NotificationDuration::Short,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::message(text).level(NotificationLevel::Success)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::message(text).level(NotificationLevel::Error)
    }

    pub fn custom(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            content: NotificationContent::Custom {
                kind: kind.into(),
                payload,
            },
            duration: NotificationDuration::Short,
        }
    }

    /// Set the urgency. No effect on custom content.
    pub fn level(mut self, level: NotificationLevel) -> Self {
        if let NotificationContent::Message { level: ref mut l, .. } = self.content {
            *l = level;
        }
        self
    }

    pub fn duration(mut self, duration: NotificationDuration) -> Self {
        self.duration = duration;
        self
    }
}

impl From<&str> for NotificationRequest {
    fn from(text: &str) -> Self {
        Self::message(text)
    }
}

impl From<String> for NotificationRequest {
    fn from(text: String) -> Self {
        Self::message(text)
    }
}

/// A notification as seen by the rendering host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub content: NotificationContent,
    pub duration: NotificationDuration,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Message text, if this is a message notification.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            NotificationContent::Message { text, .. } => Some(text),
            NotificationContent::Custom { .. } => None,
        }
    }
}

#[derive(Default)]
struct QueueState {
    showing: Option<Arc<Notification>>,
    pending: VecDeque<Arc<Notification>>,
}

struct SnackbarInner {
    short: Duration,
    long: Duration,
    /// Slot flag and backlog mutate together under this lock.
    state: Mutex<QueueState>,
    current: watch::Sender<Option<Arc<Notification>>>,
}

/// Single-slot FIFO of transient notifications.
///
/// Cheaply cloneable. Operations never fail the caller.
#[derive(Clone)]
pub struct SnackbarQueue {
    inner: Arc<SnackbarInner>,
}

impl SnackbarQueue {
    pub fn new(short: Duration, long: Duration) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            inner: Arc::new(SnackbarInner {
                short,
                long,
                state: Mutex::new(QueueState::default()),
                current,
            }),
        }
    }

    /// Append a request. Shown at once if the slot is idle, queued otherwise.
    pub fn enqueue(&self, request: impl Into<NotificationRequest>) -> NotificationId {
        let request = request.into();
        let notification = Arc::new(Notification {
            id: NotificationId(Uuid::new_v4()),
            content: request.content,
            duration: request.duration,
            created_at: Utc::now(),
        });
        let id = notification.id;

        let shown = {
            let mut state = self.inner.state.lock();
            if state.showing.is_none() {
                state.showing = Some(Arc::clone(&notification));
                self.inner
                    .current
                    .send_replace(Some(Arc::clone(&notification)));
                true
            } else {
                state.pending.push_back(Arc::clone(&notification));
                false
            }
        };

        if shown {
            debug!(%id, "notification shown");
            self.schedule_timeout(&notification);
        } else {
            debug!(%id, "notification queued");
        }
        id
    }

    /// Mark notification `id` as done and promote the next one.
    ///
    /// Completing anything other than the displayed notification is a no-op,
    /// which makes late timers and double dismissals harmless.
    pub fn complete(&self, id: NotificationId) -> bool {
        let promoted = {
            let mut state = self.inner.state.lock();
            if state.showing.as_ref().map(|n| n.id) != Some(id) {
                return false;
            }
            self.promote_next(&mut state)
        };
        debug!(%id, "notification completed");
        if let Some(next) = promoted {
            self.schedule_timeout(&next);
        }
        true
    }

    /// Complete whatever is displayed. Returns the completed id.
    pub fn advance(&self) -> Option<NotificationId> {
        let (completed, promoted) = {
            let mut state = self.inner.state.lock();
            let completed = state.showing.as_ref().map(|n| n.id)?;
            (completed, self.promote_next(&mut state))
        };
        if let Some(next) = promoted {
            self.schedule_timeout(&next);
        }
        Some(completed)
    }

    /// Drop the displayed notification and everything queued behind it.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.pending.clear();
        state.showing = None;
        self.inner.current.send_replace(None);
    }

    /// Currently displayed notification.
    pub fn current(&self) -> Option<Arc<Notification>> {
        self.inner.current.borrow().clone()
    }

    /// Number of notifications waiting behind the displayed one.
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Subscribe to slot changes (replace-on-write, not a queue).
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Notification>>> {
        self.inner.current.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn promote_next(&self, state: &mut QueueState) -> Option<Arc<Notification>> {
        let next = state.pending.pop_front();
        state.showing.clone_from(&next);
        self.inner.current.send_replace(next.clone());
        next
    }

    fn display_time(&self, duration: NotificationDuration) -> Option<Duration> {
        match duration {
            NotificationDuration::Short => Some(self.inner.short),
            NotificationDuration::Long => Some(self.inner.long),
            NotificationDuration::Indefinite => None,
            NotificationDuration::Custom(d) => Some(d),
        }
    }

    /// Auto-complete timed notifications. Needs a tokio runtime; without one
    /// the host must complete them itself.
    fn schedule_timeout(&self, notification: &Notification) {
        let Some(after) = self.display_time(notification.duration) else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(id = %notification.id, "no runtime; notification timeout left to host");
            return;
        };
        let queue = self.clone();
        let id = notification.id;
        runtime.spawn(async move {
            tokio::time::sleep(after).await;
            queue.complete(id);
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn queue() -> SnackbarQueue {
        SnackbarQueue::new(Duration::from_secs(4), Duration::from_secs(10))
    }

    fn shown_text(queue: &SnackbarQueue) -> Option<String> {
        queue.current().and_then(|n| n.text().map(str::to_owned))
    }

    #[test]
    fn first_request_shows_immediately() {
        let q = queue();
        let id = q.enqueue("hello");
        assert_eq!(q.current().unwrap().id, id);
        assert_eq!(q.pending_len(), 0);
    }

    #[test]
    fn requests_display_in_fifo_order() {
        let q = queue();
        let first = q.enqueue("r0");
        q.enqueue("r1");
        q.enqueue("r2");
        q.enqueue("r3");
        assert_eq!(q.pending_len(), 3);

        let mut seen = Vec::new();
        assert!(q.complete(first));
        while let Some(text) = shown_text(&q) {
            seen.push(text);
            q.advance();
        }
        assert_eq!(seen, vec!["r1", "r2", "r3"]);
        assert!(q.current().is_none());
    }

    #[test]
    fn completing_a_stale_id_is_a_no_op() {
        let q = queue();
        let first = q.enqueue("a");
        let second = q.enqueue("b");

        assert!(!q.complete(second));
        assert_eq!(q.current().unwrap().id, first);
        assert!(q.complete(first));
        assert!(!q.complete(first));
        assert_eq!(q.current().unwrap().id, second);
    }

    #[test]
    fn clear_idles_the_slot() {
        let q = queue();
        q.enqueue("a");
        q.enqueue("b");
        q.clear();
        assert!(q.current().is_none());
        assert_eq!(q.pending_len(), 0);
        assert!(q.advance().is_none());
    }

    #[test]
    fn builder_sets_level_and_duration() {
        let q = queue();
        q.enqueue(NotificationRequest::error("nope").duration(NotificationDuration::Indefinite));
        let shown = q.current().unwrap();
        assert_eq!(shown.duration, NotificationDuration::Indefinite);
        assert_eq!(
            shown.content,
            NotificationContent::Message {
                text: "nope".into(),
                level: NotificationLevel::Error,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timed_notifications_advance_on_their_own() {
        let q = queue();
        q.enqueue("short");
        q.enqueue(NotificationRequest::message("long").duration(NotificationDuration::Long));
        q.enqueue(NotificationRequest::message("sticky").duration(NotificationDuration::Indefinite));

        tokio::time::sleep(Duration::from_millis(4_100)).await;
        assert_eq!(shown_text(&q).as_deref(), Some("long"));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(shown_text(&q).as_deref(), Some("sticky"));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(shown_text(&q).as_deref(), Some("sticky"));
    }

    #[tokio::test(start_paused = true)]
    async fn early_completion_disarms_the_old_timer() {
        let q = queue();
        let first = q.enqueue("first");
        tokio::time::sleep(Duration::from_secs(3)).await;
        q.complete(first);
        q.enqueue("second");

        // The first timer fires at t=4s and must not clip "second".
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(shown_text(&q).as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn subscribers_see_slot_changes() {
        let q = queue();
        let mut rx = q.subscribe();
        let id = q.enqueue(NotificationRequest::message("x").duration(NotificationDuration::Indefinite));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().id, id);

        q.advance();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
