// ── Controller output streams ──
//
// Three subscriptions with different delivery contracts:
//   StateStream       replay-one, fan-out to any number of subscribers
//   NavigationStream  buffered until the single router attaches, no replay
//   EffectStream      single delivery to the one collector, no replay

use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

// ── State ────────────────────────────────────────────────────────────

/// A subscription to one controller's state.
///
/// Yields the value current at subscription time first, then every later
/// replacement in commit order. Ends when the controller is disposed.
pub struct StateStream<S: Send + Sync + 'static> {
    current: Arc<S>,
    initial: Option<Arc<S>>,
    history: Option<broadcast::Receiver<Arc<S>>>,
    latest: watch::Receiver<Arc<S>>,
}

impl<S: Send + Sync + 'static> StateStream<S> {
    pub(crate) fn new(
        initial: Arc<S>,
        history: Option<broadcast::Receiver<Arc<S>>>,
        latest: watch::Receiver<Arc<S>>,
    ) -> Self {
        Self {
            current: Arc::clone(&initial),
            initial: Some(initial),
            history,
            latest,
        }
    }

    /// The value most recently yielded (or the snapshot, before the first `next`).
    pub fn current(&self) -> &Arc<S> {
        &self.current
    }

    /// The controller's state right now, skipping anything not yet yielded.
    pub fn latest(&self) -> Arc<S> {
        Arc::clone(&self.latest.borrow())
    }

    /// Wait for the next state. Returns `None` once the controller is disposed
    /// and everything committed before that has been yielded.
    pub async fn next(&mut self) -> Option<Arc<S>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        let history = self.history.as_mut()?;
        loop {
            match history.recv().await {
                Ok(state) => {
                    self.current = Arc::clone(&state);
                    return Some(state);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "state subscriber lagging; skipping ahead");
                }
                Err(RecvError::Closed) => {
                    self.history = None;
                    return None;
                }
            }
        }
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> impl Stream<Item = Arc<S>> + Send {
        futures_util::stream::unfold(self, |mut stream| async move {
            let state = stream.next().await?;
            Some((state, stream))
        })
    }
}

// ── Navigation ───────────────────────────────────────────────────────

/// The navigation subscription of one controller.
///
/// Events emitted before the router attached are buffered and delivered
/// first. Only one of these exists per controller.
pub struct NavigationStream<N> {
    receiver: mpsc::Receiver<N>,
}

impl<N: Send + 'static> NavigationStream<N> {
    pub(crate) fn new(receiver: mpsc::Receiver<N>) -> Self {
        Self { receiver }
    }

    /// Next navigation event; `None` after disposal once the buffer drains.
    pub async fn recv(&mut self) -> Option<N> {
        self.receiver.recv().await
    }

    /// Non-blocking poll of the buffer.
    pub fn try_recv(&mut self) -> Option<N> {
        self.receiver.try_recv().ok()
    }

    pub fn into_stream(self) -> ReceiverStream<N> {
        ReceiverStream::new(self.receiver)
    }
}

// ── Effects ──────────────────────────────────────────────────────────

/// The effect subscription of one controller. Each effect is delivered here
/// exactly once and never replayed.
pub struct EffectStream<F> {
    receiver: mpsc::Receiver<F>,
}

impl<F: Send + 'static> EffectStream<F> {
    pub(crate) fn new(receiver: mpsc::Receiver<F>) -> Self {
        Self { receiver }
    }

    pub async fn recv(&mut self) -> Option<F> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<F> {
        self.receiver.try_recv().ok()
    }

    pub fn into_stream(self) -> ReceiverStream<F> {
        ReceiverStream::new(self.receiver)
    }
}
