// Task store: identity-scoped CRUD plus the live subscription, on top of an
// injected document store.
use crate::error::{AuthError, TaskError, ValidationError};
use crate::model::{Identity, Task};
use crate::provider::{DocumentStore, IdentityProvider, TaskWatch};
use std::sync::Arc;
use tracing::debug;

/// All operations are scoped to the provider's cached identity and fail with
/// `AuthError{Unauthenticated}` when no session exists.
///
/// Unknown-id semantics: `update` on a missing id is silently accepted (the
/// store contract is write-by-key upsert), and `delete` is idempotent.
pub struct TaskStore<I: IdentityProvider, D: DocumentStore> {
    identity: Arc<I>,
    documents: Arc<D>,
}

impl<I: IdentityProvider, D: DocumentStore> TaskStore<I, D> {
    pub fn new(identity: Arc<I>, documents: Arc<D>) -> Self {
        Self {
            identity,
            documents,
        }
    }

    fn owner(&self) -> Result<Identity, AuthError> {
        self.identity
            .cached_identity()
            .ok_or_else(AuthError::unauthenticated)
    }

    /// Guards cross-identity access: a task record from another session must
    /// never be written through this store.
    fn owned(&self, task: &Task) -> Result<Identity, AuthError> {
        let owner = self.owner()?;
        if task.owner_uid != owner.uid {
            return Err(AuthError::unauthenticated());
        }
        Ok(owner)
    }

    /// Live ordered view of the current identity's tasks. The first event is
    /// a full snapshot; cancellation (or drop) releases the backend listener.
    pub async fn subscribe(&self) -> Result<TaskWatch, TaskError> {
        let owner = self.owner()?;
        let watch = self
            .documents
            .watch_tasks(&owner.uid)
            .await
            .map_err(|f| AuthError::from_failure(f, "Failed to load tasks"))?;
        debug!(uid = %owner.uid, "task subscription opened");
        Ok(watch)
    }

    /// Validates locally before any round-trip: whitespace-only drafts are
    /// rejected without touching the store.
    pub async fn create(&self, draft: &str) -> Result<Task, TaskError> {
        let owner = self.owner()?;
        let content = draft.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }

        let task = Task::new(&owner.uid, content);
        self.documents
            .upsert_task(&task)
            .await
            .map_err(|f| AuthError::from_failure(f, "Failed to add task"))?;
        Ok(task)
    }

    /// Overwrites content/completion by id. A missing id is accepted: the
    /// write lands under its key either way.
    pub async fn update(&self, task: &Task) -> Result<(), TaskError> {
        self.owned(task)?;
        self.documents
            .upsert_task(task)
            .await
            .map_err(|f| AuthError::from_failure(f, "Failed to update task"))?;
        Ok(())
    }

    /// Flips `completed` on the caller's value before the round-trip and
    /// rolls the flip back if the write fails, so the caller's copy always
    /// matches what the store confirmed.
    pub async fn toggle_completion(&self, task: &mut Task) -> Result<(), TaskError> {
        self.owned(task)?;
        task.completed = !task.completed;
        if let Err(f) = self.documents.upsert_task(task).await {
            task.completed = !task.completed;
            return Err(AuthError::from_failure(f, "Failed to update task status").into());
        }
        Ok(())
    }

    /// Removes the record by id. Idempotent: deleting an already-gone task
    /// resolves cleanly.
    pub async fn delete(&self, task: &Task) -> Result<(), TaskError> {
        let owner = self.owned(task)?;
        self.documents
            .delete_task(&owner.uid, &task.id)
            .await
            .map_err(|f| AuthError::from_failure(f, "Failed to delete task"))?;
        Ok(())
    }
}
