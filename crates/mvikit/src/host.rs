//! Console rendering host.
//!
//! Stands in for a UI toolkit: prints screen changes, state snapshots,
//! effects, snackbars, and popups as they happen (text mode), and keeps a
//! transcript for the structured formats rendered at the end.

use std::sync::Arc;

use owo_colors::OwoColorize;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use mvikit_core::{
    Notification, NotificationBroker, NotificationContent, NotificationId, NotificationLevel,
    Popup, PopupContent, PopupId,
};

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output::{print_output, render_document};
use crate::session::SessionSummary;

// ── Transcript ───────────────────────────────────────────────────────

/// One thing the host displayed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    Screen {
        name: String,
    },
    State {
        screen: String,
        state: serde_json::Value,
    },
    Effect {
        screen: String,
        effect: String,
    },
    Navigation {
        screen: String,
        route: String,
    },
    Snackbar {
        text: String,
        level: NotificationLevel,
    },
    Popup {
        key: Option<String>,
        title: String,
        message: String,
    },
}

#[derive(Serialize)]
struct Report<'a> {
    transcript: &'a [HostEvent],
    summary: &'a SessionSummary,
}

// ── Host ─────────────────────────────────────────────────────────────

pub struct ConsoleHost {
    format: OutputFormat,
    color: bool,
    transcript: Mutex<Vec<HostEvent>>,
    /// The popup as last drawn, which is what a user can react to.
    on_screen: watch::Sender<Option<Arc<Popup>>>,
}

impl ConsoleHost {
    pub fn new(format: OutputFormat, color: bool) -> Self {
        Self {
            format,
            color,
            transcript: Mutex::new(Vec::new()),
            on_screen: watch::channel(None).0,
        }
    }

    /// The popup currently drawn by this host.
    pub fn displayed_popup(&self) -> watch::Receiver<Option<Arc<Popup>>> {
        self.on_screen.subscribe()
    }

    pub fn record_screen(&self, name: &str) {
        self.record(HostEvent::Screen {
            name: name.to_owned(),
        });
    }

    pub fn record_state<S: Serialize>(&self, screen: &str, state: &S) {
        match serde_json::to_value(state) {
            Ok(state) => self.record(HostEvent::State {
                screen: screen.to_owned(),
                state,
            }),
            Err(err) => debug!(screen, error = %err, "state not serializable; skipped"),
        }
    }

    pub fn record_effect(&self, screen: &str, effect: &impl std::fmt::Debug) {
        self.record(HostEvent::Effect {
            screen: screen.to_owned(),
            effect: format!("{effect:?}"),
        });
    }

    pub fn record_navigation(&self, screen: &str, route: &impl std::fmt::Debug) {
        self.record(HostEvent::Navigation {
            screen: screen.to_owned(),
            route: format!("{route:?}"),
        });
    }

    fn record_snackbar(&self, notification: &Notification) {
        let (text, level) = match &notification.content {
            NotificationContent::Message { text, level } => (text.clone(), *level),
            NotificationContent::Custom { kind, .. } => (format!("<{kind}>"), NotificationLevel::Info),
        };
        self.record(HostEvent::Snackbar { text, level });
    }

    fn record_popup(&self, popup: &Popup) {
        let (title, message) = match &popup.content {
            PopupContent::Error { title, message } => (title.clone(), message.clone()),
            PopupContent::Custom { kind, payload } => (kind.clone(), payload.to_string()),
        };
        self.record(HostEvent::Popup {
            key: popup.key.clone(),
            title,
            message,
        });
    }

    fn record(&self, event: HostEvent) {
        if self.format == OutputFormat::Text {
            print_output(&self.line(&event));
        }
        self.transcript.lock().push(event);
    }

    /// Snapshot of everything displayed so far.
    pub fn transcript(&self) -> Vec<HostEvent> {
        self.transcript.lock().clone()
    }

    // ── Broker watchers ──────────────────────────────────────────────

    /// Follow the broker's snackbar slot and popup slot until `cancel`.
    ///
    /// A console has no visible lifetime for snackbars, so each one is
    /// completed as soon as it is printed.
    pub fn watch_broker(
        self: &Arc<Self>,
        broker: NotificationBroker,
        cancel: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        let snackbars = {
            let host = Arc::clone(self);
            let broker = broker.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let queue = broker.snackbars();
                let mut slot = queue.subscribe();
                let mut last: Option<NotificationId> = None;
                loop {
                    let showing = slot.borrow_and_update().clone();
                    if let Some(notification) = showing.filter(|n| Some(n.id) != last) {
                        last = Some(notification.id);
                        host.record_snackbar(&notification);
                        queue.complete(notification.id);
                    }
                    if !wait_changed(&mut slot, &cancel).await {
                        break;
                    }
                }
            })
        };

        let popups = {
            let host = Arc::clone(self);
            tokio::spawn(async move {
                let mut slot = broker.popups().subscribe();
                let mut last: Option<PopupId> = None;
                loop {
                    let showing = slot.borrow_and_update().clone();
                    if let Some(popup) = showing.as_ref().filter(|p| Some(p.id) != last) {
                        last = Some(popup.id);
                        host.record_popup(popup);
                    }
                    host.on_screen.send_replace(showing);
                    if !wait_changed(&mut slot, &cancel).await {
                        break;
                    }
                }
            })
        };

        vec![snackbars, popups]
    }

    // ── Final output ─────────────────────────────────────────────────

    pub fn finish(&self, summary: &SessionSummary) -> Result<(), CliError> {
        if self.format == OutputFormat::Text {
            for line in summary.text_lines() {
                print_output(&self.paint_summary(&line));
            }
            return Ok(());
        }
        let transcript = self.transcript();
        let report = Report {
            transcript: &transcript,
            summary,
        };
        print_output(&render_document(self.format, &report)?);
        Ok(())
    }

    // ── Text rendering ───────────────────────────────────────────────

    fn line(&self, event: &HostEvent) -> String {
        match event {
            HostEvent::Screen { name } => format!("{} {name}", self.tag("screen", Tone::Screen)),
            HostEvent::State { screen, state } => {
                format!("{} {screen} {state}", self.tag("state", Tone::Muted))
            }
            HostEvent::Effect { screen, effect } => {
                format!("{} {screen} {effect}", self.tag("effect", Tone::Muted))
            }
            HostEvent::Navigation { screen, route } => {
                format!("{} {screen} -> {route}", self.tag("navigate", Tone::Screen))
            }
            HostEvent::Snackbar { text, level } => {
                let tone = match level {
                    NotificationLevel::Info => Tone::Muted,
                    NotificationLevel::Success => Tone::Good,
                    NotificationLevel::Warning => Tone::Warn,
                    NotificationLevel::Error => Tone::Bad,
                };
                format!("{} {text}", self.tag(&format!("snackbar:{level}"), tone))
            }
            HostEvent::Popup { title, message, .. } => {
                format!("{} {title}: {message}", self.tag("popup", Tone::Bad))
            }
        }
    }

    fn tag(&self, label: &str, tone: Tone) -> String {
        let label = format!("[{label}]");
        if !self.color {
            return label;
        }
        match tone {
            Tone::Screen => label.cyan().bold().to_string(),
            Tone::Muted => label.dimmed().to_string(),
            Tone::Good => label.green().to_string(),
            Tone::Warn => label.yellow().to_string(),
            Tone::Bad => label.red().bold().to_string(),
        }
    }

    fn paint_summary(&self, line: &str) -> String {
        if self.color {
            line.bold().to_string()
        } else {
            line.to_owned()
        }
    }
}

#[derive(Clone, Copy)]
enum Tone {
    Screen,
    Muted,
    Good,
    Warn,
    Bad,
}

/// `false` once cancelled or the sender is gone. Pending changes win over
/// cancellation so nothing published before shutdown goes unrendered.
async fn wait_changed<T>(slot: &mut watch::Receiver<T>, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        changed = slot.changed() => changed.is_ok(),
        () = cancel.cancelled() => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use mvikit_core::{NotificationRequest, PopupSpec};

    use super::*;

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn snackbars_are_printed_in_order_and_completed() {
        let host = Arc::new(ConsoleHost::new(OutputFormat::Json, false));
        let broker = NotificationBroker::default();
        let cancel = CancellationToken::new();
        let watchers = host.watch_broker(broker.clone(), cancel.clone());

        broker.notify("one");
        broker.notify(NotificationRequest::error("two"));
        settle().await;

        let texts: Vec<_> = host
            .transcript()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::Snackbar { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(texts, ["one", "two"]);
        assert!(broker.snackbars().current().is_none());

        cancel.cancel();
        for w in watchers {
            w.await.unwrap();
        }
    }

    #[tokio::test]
    async fn each_popup_is_recorded_once() {
        let host = Arc::new(ConsoleHost::new(OutputFormat::Json, false));
        let broker = NotificationBroker::default();
        let cancel = CancellationToken::new();
        let watchers = host.watch_broker(broker.clone(), cancel.clone());

        broker.show_popup(PopupSpec::error("Oops", "Try again").key("k"));
        broker.show_popup(PopupSpec::error("Oops", "Try again").key("k"));
        settle().await;

        let popups = host
            .transcript()
            .iter()
            .filter(|e| matches!(e, HostEvent::Popup { .. }))
            .count();
        assert_eq!(popups, 1);

        cancel.cancel();
        for w in watchers {
            w.await.unwrap();
        }
    }

    #[test]
    fn plain_tags_without_color() {
        let host = ConsoleHost::new(OutputFormat::Text, false);
        let line = host.line(&HostEvent::Screen {
            name: "home".into(),
        });
        assert_eq!(line, "[screen] home");
    }
}
