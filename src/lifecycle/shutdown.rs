//! Shutdown coordination for the gateway.
//!
//! One `Shutdown` per process; every long-running task (listener, admin API,
//! health monitor, reload loop) holds its own `ShutdownSignal`.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
            fired: false,
        }
    }

    /// Tell every subscribed task to stop.
    pub fn trigger(&self) {
        let tasks = self.tx.send(()).unwrap_or(0);
        tracing::info!(tasks, "Shutdown triggered");
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// A task's handle on the shutdown broadcast.
///
/// Fires once `Shutdown::trigger` is called or the coordinator is dropped,
/// and stays fired: later `recv` calls return immediately.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: broadcast::Receiver<()>,
    fired: bool,
}

impl ShutdownSignal {
    /// Wait until shutdown is requested.
    pub async fn recv(&mut self) {
        if self.fired {
            return;
        }
        // Closed (coordinator dropped) and lagged both mean stop.
        let _ = self.rx.recv().await;
        self.fired = true;
    }

    /// Another handle for a child task; a fired signal hands out fired children.
    pub fn resubscribe(&self) -> Self {
        Self {
            rx: self.rx.resubscribe(),
            fired: self.fired,
        }
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }
}
