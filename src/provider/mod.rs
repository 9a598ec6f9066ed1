// Capability traits the session manager and task store depend on.
// Concrete backends: `client::RestClient` (remote) and `MemoryProvider`
// (in-process, tests and offline use).
pub mod memory;

pub use memory::MemoryProvider;

use crate::error::ProviderFailure;
use crate::model::{Identity, ProfileDocument, Task};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// External identity provider contract: create/sign-in against
/// `(email, password)`, password-reset mail, plus a synchronous read of the
/// cached session.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ProviderFailure>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderFailure>;

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderFailure>;

    async fn sign_out(&self) -> Result<(), ProviderFailure>;

    /// Cached session read. No network, no error.
    fn cached_identity(&self) -> Option<Identity>;
}

/// External per-user document collection contract: write-by-key upsert,
/// delete-by-key, and a live query filtered on the owning identity.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put_profile(
        &self,
        owner_uid: &str,
        profile: &ProfileDocument,
    ) -> Result<(), ProviderFailure>;

    async fn upsert_task(&self, task: &Task) -> Result<(), ProviderFailure>;

    /// Delete-by-key. A key that is already gone is success.
    async fn delete_task(&self, owner_uid: &str, task_id: &str) -> Result<(), ProviderFailure>;

    /// Opens a live query over the owner's tasks. The first event is a full
    /// snapshot; every subsequent store change pushes a fresh one.
    async fn watch_tasks(&self, owner_uid: &str) -> Result<TaskWatch, ProviderFailure>;
}

/// One delivery on a live task query.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// Full ordered view of the owner's tasks. May be empty.
    Snapshot(Vec<Task>),
    /// The query died (permission revoked, transport gone). Terminal:
    /// nothing follows this event.
    Terminated(ProviderFailure),
}

/// Handle on a live task query.
///
/// Holds the backend's listener resource; `cancel` (or dropping the handle)
/// releases it. Cancellation stops delivery without touching the store.
pub struct TaskWatch {
    events: mpsc::UnboundedReceiver<WatchEvent>,
    disposer: Option<Box<dyn FnOnce() + Send>>,
    cancelled: bool,
}

impl TaskWatch {
    pub fn new(
        events: mpsc::UnboundedReceiver<WatchEvent>,
        disposer: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            disposer: Some(Box::new(disposer)),
            cancelled: false,
        }
    }

    /// Next delivery, or `None` once the watch is cancelled or the backend
    /// dropped its sender after a terminal event.
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        if self.cancelled {
            return None;
        }
        self.events.recv().await
    }

    /// Releases the backend listener. Events already queued are discarded;
    /// later store mutations no longer reach this handle.
    pub fn cancel(&mut self) {
        if let Some(dispose) = self.disposer.take() {
            dispose();
        }
        self.events.close();
        self.cancelled = true;
    }
}

impl Drop for TaskWatch {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Stream for TaskWatch {
    type Item = WatchEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<WatchEvent>> {
        let this = self.get_mut();
        if this.cancelled {
            return Poll::Ready(None);
        }
        this.events.poll_recv(cx)
    }
}
