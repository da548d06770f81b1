// ── Event intake ──
//
// Bounded entry queue for UI events. `emit` never blocks and never drops:
// when the bounded queue is full, events go to an unbounded backlog lane
// that a forwarder task drains into the queue with suspending sends. While
// the lane exists every new event goes through it, so emission order is
// preserved end to end.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tracing::debug;

use crate::error::CoreError;

type Backlog<E> = Arc<Mutex<Option<mpsc::UnboundedSender<E>>>>;

pub(crate) struct EventIntake<E: Send + 'static> {
    tx: RwLock<Option<mpsc::Sender<E>>>,
    backlog: Backlog<E>,
    runtime: Handle,
}

impl<E: Send + 'static> EventIntake<E> {
    pub(crate) fn new(capacity: usize, runtime: Handle) -> (Self, mpsc::Receiver<E>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let intake = Self {
            tx: RwLock::new(Some(tx)),
            backlog: Arc::new(Mutex::new(None)),
            runtime,
        };
        (intake, rx)
    }

    /// Accept `event` without blocking. Fails only once the intake is closed.
    pub(crate) fn emit(&self, event: E) -> Result<(), CoreError> {
        let tx = self.sender()?;
        let mut backlog = self.backlog.lock();

        if let Some(lane) = backlog.as_ref() {
            return lane.send(event).map_err(|_| CoreError::ControllerDisposed);
        }

        match tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(CoreError::ControllerDisposed),
            Err(TrySendError::Full(event)) => {
                debug!("event intake full; spilling into backlog");
                let (lane, pending) = mpsc::unbounded_channel();
                lane.send(event).map_err(|_| CoreError::ControllerDisposed)?;
                *backlog = Some(lane);
                self.runtime
                    .spawn(forward_backlog(tx, pending, Arc::clone(&self.backlog)));
                Ok(())
            }
        }
    }

    /// Accept `event`, suspending while the intake is full.
    pub(crate) async fn send(&self, event: E) -> Result<(), CoreError> {
        let tx = self.sender()?;
        {
            let backlog = self.backlog.lock();
            if let Some(lane) = backlog.as_ref() {
                return lane.send(event).map_err(|_| CoreError::ControllerDisposed);
            }
        }
        tx.send(event)
            .await
            .map_err(|_| CoreError::ControllerDisposed)
    }

    /// Stop accepting events. Already-accepted events may still be in flight.
    pub(crate) fn close(&self) {
        self.tx.write().take();
        self.backlog.lock().take();
    }

    fn sender(&self) -> Result<mpsc::Sender<E>, CoreError> {
        self.tx.read().clone().ok_or(CoreError::ControllerDisposed)
    }
}

/// Move backlog events into the bounded queue, then retire the lane.
async fn forward_backlog<E: Send + 'static>(
    tx: mpsc::Sender<E>,
    mut pending: mpsc::UnboundedReceiver<E>,
    backlog: Backlog<E>,
) {
    while let Some(event) = next_or_retire(&mut pending, &backlog) {
        if tx.send(event).await.is_err() {
            return;
        }
    }
    debug!("event backlog drained");
}

/// Next backlog event, or `None` after retiring the lane. Retirement happens
/// under the backlog lock so no emitter can slip an event into a lane that
/// nobody drains.
fn next_or_retire<E>(
    pending: &mut mpsc::UnboundedReceiver<E>,
    backlog: &Mutex<Option<mpsc::UnboundedSender<E>>>,
) -> Option<E> {
    match pending.try_recv() {
        Ok(event) => return Some(event),
        Err(TryRecvError::Disconnected) => return None,
        Err(TryRecvError::Empty) => {}
    }
    let mut guard = backlog.lock();
    match pending.try_recv() {
        Ok(event) => Some(event),
        Err(_) => {
            guard.take();
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn overflow_preserves_order_and_loses_nothing() {
        let (intake, mut rx) = EventIntake::new(2, Handle::current());
        for n in 0..50_u32 {
            intake.emit(n).unwrap();
        }

        let mut seen = Vec::new();
        while seen.len() < 50 {
            seen.push(rx.recv().await.unwrap());
        }
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn lane_retires_once_drained() {
        let (intake, mut rx) = EventIntake::new(1, Handle::current());
        intake.emit(1_u8).unwrap();
        intake.emit(2).unwrap();
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));

        tokio::task::yield_now().await;
        assert!(intake.backlog.lock().is_none());

        intake.emit(3).unwrap();
        assert_eq!(rx.recv().await, Some(3));
    }

    #[tokio::test]
    async fn closed_intake_rejects_events() {
        let (intake, _rx) = EventIntake::new(4, Handle::current());
        intake.close();
        assert!(matches!(intake.emit(1_u8), Err(CoreError::ControllerDisposed)));
        assert!(matches!(intake.send(2).await, Err(CoreError::ControllerDisposed)));
    }
}
