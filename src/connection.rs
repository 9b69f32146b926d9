use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::backend::ExecutionBackend;
use crate::sync::lock_unpoisoned;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

/// Tracks whether the runner service is believed reachable.
///
/// There is no background re-probe: the status changes only through
/// [`ConnectionMonitor::probe`] or [`ConnectionMonitor::mark_disconnected`].
pub struct ConnectionMonitor {
    backend: Arc<dyn ExecutionBackend>,
    status: Mutex<ConnectionStatus>,
}

impl ConnectionMonitor {
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            backend,
            status: Mutex::new(ConnectionStatus::Unknown),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *lock_unpoisoned(&self.status)
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Checks service health. Transport failures and unhealthy responses
    /// both yield `Disconnected`.
    pub async fn probe(&self) -> ConnectionStatus {
        let next = match self.backend.health().await {
            Ok(()) => ConnectionStatus::Connected,
            Err(error) => {
                debug!(%error, "health probe failed");
                ConnectionStatus::Disconnected
            }
        };

        *lock_unpoisoned(&self.status) = next;
        debug!(status = ?next, "connection probed");
        next
    }

    pub fn mark_disconnected(&self) {
        let mut status = lock_unpoisoned(&self.status);
        let previous = *status;
        if previous != ConnectionStatus::Disconnected {
            warn!(?previous, "runner marked disconnected");
        }
        *status = ConnectionStatus::Disconnected;
    }
}
