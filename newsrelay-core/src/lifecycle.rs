//! Readiness signalling between the process bootstrap and the poll loop.

use tokio::sync::watch;

/// Sender half: flipped once the surrounding runtime is ready.
#[derive(Debug)]
pub struct ReadyHandle {
    tx: watch::Sender<bool>,
}

/// Receiver half awaited by the poll loop before its first tick.
#[derive(Debug, Clone)]
pub struct ReadyGate {
    rx: watch::Receiver<bool>,
}

/// Create a connected readiness pair.
#[must_use]
pub fn readiness() -> (ReadyHandle, ReadyGate) {
    let (tx, rx) = watch::channel(false);
    (ReadyHandle { tx }, ReadyGate { rx })
}

impl ReadyHandle {
    /// Declare the runtime ready. Idempotent.
    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }
}

impl ReadyGate {
    /// A gate that is already open.
    #[must_use]
    pub fn open() -> Self {
        let (handle, gate) = readiness();
        handle.mark_ready();
        gate
    }

    /// Whether readiness has been declared.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until ready. Returns `false` if the handle was dropped first.
    pub async fn wait(&mut self) -> bool {
        if self.is_ready() {
            return true;
        }
        self.rx.wait_for(|ready| *ready).await.is_ok()
    }
}
