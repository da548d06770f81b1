#![allow(clippy::unwrap_used)]
// Integration tests for the notification broker: snackbar FIFO and popup
// arbitration as seen by a rendering host.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;

use mvikit_core::{
    AppContext, NotificationBroker, NotificationDuration, NotificationRequest, PopupSpec,
    RuntimeConfig, ShowOutcome,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn broker() -> NotificationBroker {
    NotificationBroker::new(&RuntimeConfig::default())
}

fn shown_text(broker: &NotificationBroker) -> Option<String> {
    broker
        .snackbars()
        .current()
        .and_then(|n| n.text().map(str::to_owned))
}

// ── Snackbars ───────────────────────────────────────────────────────

#[test]
fn queued_requests_display_in_submission_order() {
    let broker = broker();
    let sticky = |text: &str| NotificationRequest::message(text).duration(NotificationDuration::Indefinite);

    let r0 = broker.notify(sticky("r0"));
    broker.notify(sticky("r1"));
    broker.notify(sticky("r2"));
    broker.notify(sticky("r3"));

    let mut order = vec![shown_text(&broker).unwrap()];
    assert!(broker.snackbars().complete(r0));
    while let Some(text) = shown_text(&broker) {
        order.push(text);
        broker.snackbars().advance();
    }
    assert_eq!(order, vec!["r0", "r1", "r2", "r3"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_enqueues_never_share_the_slot() {
    let broker = broker();
    let mut tasks = Vec::new();
    for n in 0..16 {
        let broker = broker.clone();
        tasks.push(tokio::spawn(async move {
            broker.notify(
                NotificationRequest::message(format!("n{n}"))
                    .duration(NotificationDuration::Indefinite),
            )
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(broker.snackbars().current().is_some());
    assert_eq!(broker.snackbars().pending_len(), 15);
}

#[tokio::test(start_paused = true)]
async fn short_and_long_durations_follow_runtime_config() {
    let broker = NotificationBroker::new(&RuntimeConfig {
        short_notification: Duration::from_secs(1),
        long_notification: Duration::from_secs(3),
        ..RuntimeConfig::default()
    });
    broker.notify(NotificationRequest::message("long").duration(NotificationDuration::Long));
    broker.notify("short");

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(shown_text(&broker).as_deref(), Some("long"));

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(shown_text(&broker).as_deref(), Some("short"));

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert!(broker.snackbars().current().is_none());
}

// ── Popups ──────────────────────────────────────────────────────────

#[test]
fn duplicate_key_leaves_original_popup_current() {
    let broker = broker();
    let original = broker.show_popup(PopupSpec::error("Offline", "first").key("offline"));
    let duplicate = broker.show_popup(PopupSpec::error("Offline", "second").key("offline"));

    let ShowOutcome::Shown(id) = original else {
        panic!("original popup should show");
    };
    assert_eq!(duplicate, ShowOutcome::Suppressed { current: id });
    assert_eq!(broker.popups().current().unwrap().id, id);
}

#[test]
fn replacement_runs_previous_dismissal_exactly_once() {
    let broker = broker();
    let dismissed = Arc::new(AtomicUsize::new(0));
    let hook = Arc::clone(&dismissed);

    broker.show_popup(PopupSpec::custom("sheet", serde_json::json!({})).on_dismiss(move || {
        hook.fetch_add(1, Ordering::SeqCst);
    }));
    broker.show_popup(PopupSpec::error("Heads up", "replaced").key("b"));
    broker.show_popup(PopupSpec::error("Heads up", "replaced again").key("c"));
    broker.popups().dismiss_current();

    assert_eq!(dismissed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn host_subscription_sees_replace_on_write() {
    let context = AppContext::default();
    let popups = context.broker().popups();
    let mut host = popups.subscribe();

    context.broker().show_popup(PopupSpec::error("a", "a").key("a"));
    context.broker().show_popup(PopupSpec::error("b", "b").key("b"));

    host.changed().await.unwrap();
    let seen = host.borrow_and_update().clone().unwrap();
    assert_eq!(seen.key.as_deref(), Some("b"));
}

#[tokio::test(start_paused = true)]
async fn auto_dismiss_timer_is_guarded_against_staleness() {
    let broker = broker();
    broker.show_popup(PopupSpec::error("a", "a").auto_dismiss(Duration::from_secs(2)));
    tokio::time::sleep(Duration::from_secs(1)).await;

    let ShowOutcome::Shown(second) =
        broker.show_popup(PopupSpec::error("b", "b").auto_dismiss(Duration::from_secs(5)))
    else {
        panic!("replacement should show");
    };

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(broker.popups().current().unwrap().id, second);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(broker.popups().current().is_none());
}
