// ── Screen state store ──
//
// Holds the single current state of one controller. Updates are atomic
// read-modify-write transforms committed under the watch channel's write
// lock; each committed value is also pushed onto a bounded history
// broadcast so subscribers observe every replacement in order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::trace;

use crate::error::CoreError;
use crate::stream::StateStream;

/// Single-value reactive store with replay-one subscriptions.
pub(crate) struct StateStore<S: Send + Sync + 'static> {
    /// Latest committed value. Its lock doubles as the update lock.
    current: watch::Sender<Arc<S>>,

    /// Ordered replacements for subscribers. `None` once frozen.
    history: Mutex<Option<broadcast::Sender<Arc<S>>>>,

    /// Set on controller disposal; later updates are rejected.
    frozen: AtomicBool,
}

impl<S: Send + Sync + 'static> StateStore<S> {
    pub(crate) fn new(initial: S, history_capacity: usize) -> Self {
        let (current, _) = watch::channel(Arc::new(initial));
        let (history, _) = broadcast::channel(history_capacity.max(1));
        Self {
            current,
            history: Mutex::new(Some(history)),
            frozen: AtomicBool::new(false),
        }
    }

    pub(crate) fn get(&self) -> Arc<S> {
        Arc::clone(&self.current.borrow())
    }

    /// Apply `transform` to the current value and commit the result.
    ///
    /// Concurrent callers are serialized: each transform sees the value
    /// committed by the previous one.
    pub(crate) fn update(&self, transform: impl FnOnce(&S) -> S) -> Result<Arc<S>, CoreError> {
        let mut committed = None;
        self.current.send_if_modified(|slot| {
            if self.frozen.load(Ordering::Acquire) {
                return false;
            }
            let next = Arc::new(transform(slot));
            if let Some(history) = self.history.lock().as_ref() {
                // No receivers is fine: nobody is observing yet.
                let _ = history.send(Arc::clone(&next));
            }
            *slot = Arc::clone(&next);
            committed = Some(next);
            true
        });

        let committed = committed.ok_or(CoreError::ControllerDisposed)?;
        trace!("state committed");
        Ok(committed)
    }

    /// Snapshot plus every later replacement.
    pub(crate) fn subscribe(&self) -> StateStream<S> {
        // Holding the read guard blocks commits, so no replacement can
        // land between the snapshot and the history subscription.
        let guard = self.current.borrow();
        let initial = Arc::clone(&guard);
        let history = self.history.lock().as_ref().map(broadcast::Sender::subscribe);
        drop(guard);
        StateStream::new(initial, history, self.current.subscribe())
    }

    /// Reject further updates and end every subscription.
    pub(crate) fn freeze(&self) {
        self.current.send_if_modified(|_| {
            self.frozen.store(true, Ordering::Release);
            self.history.lock().take();
            false
        });
    }

    pub(crate) fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn update_sees_previous_commit() {
        let store = StateStore::new(0_u32, 8);
        store.update(|n| n + 1).unwrap();
        let v = store.update(|n| n * 10).unwrap();
        assert_eq!(*v, 10);
        assert_eq!(*store.get(), 10);
    }

    #[test]
    fn frozen_store_rejects_updates() {
        let store = StateStore::new("idle".to_owned(), 8);
        store.freeze();
        let err = store.update(|_| "loading".to_owned()).unwrap_err();
        assert!(matches!(err, CoreError::ControllerDisposed));
        assert_eq!(*store.get(), "idle");
        assert!(store.is_frozen());
    }

    #[tokio::test]
    async fn late_subscriber_gets_latest_then_the_rest() {
        let store = StateStore::new(0_u32, 8);
        for _ in 0..3 {
            store.update(|n| n + 1).unwrap();
        }

        let mut stream = store.subscribe();
        store.update(|n| n + 1).unwrap();
        store.update(|n| n + 1).unwrap();

        assert_eq!(*stream.next().await.unwrap(), 3);
        assert_eq!(*stream.next().await.unwrap(), 4);
        assert_eq!(*stream.next().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn freeze_ends_subscriptions() {
        let store = StateStore::new(1_u8, 8);
        let mut stream = store.subscribe();
        store.freeze();

        assert_eq!(*stream.next().await.unwrap(), 1);
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn next_waits_for_a_commit_after_the_snapshot() {
        let store = StateStore::new(7_u8, 8);
        let mut stream = store.subscribe();
        assert_eq!(*tokio_test::block_on(stream.next()).unwrap(), 7);

        let mut next = tokio_test::task::spawn(stream.next());
        tokio_test::assert_pending!(next.poll());

        store.update(|n| n + 1).unwrap();
        assert!(next.is_woken());
        let value = tokio_test::assert_ready!(next.poll());
        assert_eq!(*value.unwrap(), 8);
    }
}
