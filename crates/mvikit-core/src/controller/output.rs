// ── Single-consumer output lanes ──
//
// Navigation events and effects are buffered in a bounded queue until
// their one observer attaches. Producers suspend while the buffer is full.

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::error::{Channel, CoreError};

pub(crate) struct OutputLane<T> {
    channel: Channel,
    tx: RwLock<Option<mpsc::Sender<T>>>,
    rx: Mutex<Option<mpsc::Receiver<T>>>,
}

impl<T: Send + 'static> OutputLane<T> {
    pub(crate) fn new(channel: Channel, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            channel,
            tx: RwLock::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    pub(crate) async fn send(&self, value: T) -> Result<(), CoreError> {
        let tx = self
            .tx
            .read()
            .clone()
            .ok_or(CoreError::ControllerDisposed)?;
        tx.send(value).await.map_err(|_| CoreError::ChannelClosed {
            channel: self.channel,
        })
    }

    /// Hand out the receiver. Only the first caller gets it.
    pub(crate) fn take_receiver(&self) -> Result<mpsc::Receiver<T>, CoreError> {
        self.rx.lock().take().ok_or(CoreError::AlreadyObserved {
            channel: self.channel,
        })
    }

    /// Stop accepting values. The observer still drains what was buffered.
    pub(crate) fn close(&self) {
        self.tx.write().take();
    }
}
