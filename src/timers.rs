//! Cancellable one-shot tasks owned by a session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::sync::lock_unpoisoned;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredKind {
    LoginRedirect,
    SaveNoticeClear,
}

/// At most one pending task per [`DeferredKind`]. Scheduling a kind that is
/// already pending aborts the earlier task.
#[derive(Debug, Default)]
pub struct DeferredTasks {
    handles: Mutex<HashMap<DeferredKind, JoinHandle<()>>>,
    closed: AtomicBool,
}

impl DeferredTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` after `delay` on the current tokio runtime.
    ///
    /// Returns `false` when the set is closed or no runtime is available.
    pub fn schedule<F>(&self, kind: DeferredKind, delay: Duration, action: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            debug!(?kind, "deferred task rejected after close");
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!(?kind, "no async runtime; deferred task dropped");
            return false;
        };

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });

        let mut handles = lock_unpoisoned(&self.handles);
        // Re-check under the lock so cancel_all cannot miss this handle.
        if self.closed.load(Ordering::Acquire) {
            handle.abort();
            return false;
        }
        if let Some(previous) = handles.insert(kind, handle) {
            previous.abort();
        }
        debug!(?kind, delay_ms = delay.as_millis() as u64, "deferred task scheduled");
        true
    }

    pub fn cancel(&self, kind: DeferredKind) -> bool {
        match lock_unpoisoned(&self.handles).remove(&kind) {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    /// Aborts everything and refuses further scheduling.
    pub fn cancel_all(&self) {
        let mut handles = lock_unpoisoned(&self.handles);
        self.closed.store(true, Ordering::Release);
        for (_, handle) in handles.drain() {
            handle.abort();
        }
    }

    pub fn is_pending(&self, kind: DeferredKind) -> bool {
        lock_unpoisoned(&self.handles)
            .get(&kind)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for DeferredTasks {
    fn drop(&mut self) {
        let handles = match self.handles.get_mut() {
            Ok(handles) => handles,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (_, handle) in handles.drain() {
            handle.abort();
        }
    }
}
