// In-process backend. Stands in for the remote provider in tests and when
// no remote is configured.
use crate::error::{codes, ProviderFailure};
use crate::model::{Identity, ProfileDocument, Task};
use crate::provider::{DocumentStore, IdentityProvider, TaskWatch, WatchEvent};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use uuid::Uuid;

struct Account {
    uid: String,
    password: String,
}

struct Watcher {
    id: u64,
    owner_uid: String,
    tx: mpsc::UnboundedSender<WatchEvent>,
}

/// In-memory identity provider + document store.
///
/// Mirrors the observable behavior of the remote backends: same failure
/// codes, initial snapshot on watch, one snapshot per mutation. `inject_failure`
/// makes the next document write fail, which is how tests exercise rollback
/// and error propagation paths.
#[derive(Default)]
pub struct MemoryProvider {
    accounts: Mutex<HashMap<String, Account>>,
    session: RwLock<Option<Identity>>,
    profiles: Mutex<HashMap<String, ProfileDocument>>,
    // (owner uid, task id) -> task; BTreeMap keeps iteration deterministic
    tasks: Mutex<BTreeMap<(String, String), Task>>,
    watchers: Arc<Mutex<Vec<Watcher>>>,
    next_watcher_id: AtomicU64,
    fail_next_write: Mutex<Option<ProviderFailure>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a one-shot failure: the next document write (profile or task)
    /// returns this failure instead of committing.
    pub fn inject_failure(&self, code: &str) {
        *self.fail_next_write.lock().unwrap() =
            Some(ProviderFailure::new(code, "injected failure"));
    }

    pub fn profile_of(&self, uid: &str) -> Option<ProfileDocument> {
        self.profiles.lock().unwrap().get(uid).cloned()
    }

    pub fn task_count(&self, owner_uid: &str) -> usize {
        self.snapshot_for(owner_uid).len()
    }

    fn take_injected(&self) -> Result<(), ProviderFailure> {
        match self.fail_next_write.lock().unwrap().take() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn snapshot_for(&self, owner_uid: &str) -> Vec<Task> {
        let tasks = self.tasks.lock().unwrap();
        let mut owned: Vec<Task> = tasks
            .values()
            .filter(|t| t.owner_uid == owner_uid)
            .cloned()
            .collect();
        owned.sort();
        owned
    }

    /// Pushes a fresh snapshot to every live watcher of `owner_uid` and
    /// prunes the ones whose receiver is gone.
    fn emit(&self, owner_uid: &str) {
        let snapshot = self.snapshot_for(owner_uid);
        let mut watchers = self.watchers.lock().unwrap();
        watchers.retain(|w| {
            if w.owner_uid != owner_uid {
                return true;
            }
            w.tx.send(WatchEvent::Snapshot(snapshot.clone())).is_ok()
        });
    }
}

#[async_trait]
impl IdentityProvider for MemoryProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ProviderFailure> {
        if !email.contains('@') {
            return Err(ProviderFailure::new(codes::INVALID_EMAIL, email));
        }
        if password.len() < 6 {
            return Err(ProviderFailure::new(
                codes::WEAK_PASSWORD,
                "Password should be at least 6 characters",
            ));
        }
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(ProviderFailure::new(codes::EMAIL_EXISTS, email));
        }
        let uid = Uuid::new_v4().to_string();
        accounts.insert(
            email.to_string(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );
        let identity = Identity::new(uid, email);
        *self.session.write().unwrap() = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderFailure> {
        let accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get(email)
            .ok_or_else(|| ProviderFailure::new(codes::EMAIL_NOT_FOUND, email))?;
        if account.password != password {
            return Err(ProviderFailure::new(codes::INVALID_PASSWORD, email));
        }
        let identity = Identity::new(account.uid.clone(), email);
        *self.session.write().unwrap() = Some(identity.clone());
        Ok(identity)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderFailure> {
        let accounts = self.accounts.lock().unwrap();
        if !accounts.contains_key(email) {
            return Err(ProviderFailure::new(codes::EMAIL_NOT_FOUND, email));
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderFailure> {
        *self.session.write().unwrap() = None;
        Ok(())
    }

    fn cached_identity(&self) -> Option<Identity> {
        self.session.read().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryProvider {
    async fn put_profile(
        &self,
        owner_uid: &str,
        profile: &ProfileDocument,
    ) -> Result<(), ProviderFailure> {
        self.take_injected()?;
        self.profiles
            .lock()
            .unwrap()
            .insert(owner_uid.to_string(), profile.clone());
        Ok(())
    }

    async fn upsert_task(&self, task: &Task) -> Result<(), ProviderFailure> {
        self.take_injected()?;
        self.tasks.lock().unwrap().insert(
            (task.owner_uid.clone(), task.id.clone()),
            task.clone(),
        );
        self.emit(&task.owner_uid);
        Ok(())
    }

    async fn delete_task(&self, owner_uid: &str, task_id: &str) -> Result<(), ProviderFailure> {
        self.take_injected()?;
        let removed = self
            .tasks
            .lock()
            .unwrap()
            .remove(&(owner_uid.to_string(), task_id.to_string()));
        // Deleting an absent key is success; emit only on an actual change.
        if removed.is_some() {
            self.emit(owner_uid);
        }
        Ok(())
    }

    async fn watch_tasks(&self, owner_uid: &str) -> Result<TaskWatch, ProviderFailure> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(WatchEvent::Snapshot(self.snapshot_for(owner_uid)));

        let id = self.next_watcher_id.fetch_add(1, Ordering::Relaxed);
        self.watchers.lock().unwrap().push(Watcher {
            id,
            owner_uid: owner_uid.to_string(),
            tx,
        });

        let registry = Arc::clone(&self.watchers);
        Ok(TaskWatch::new(rx, move || {
            registry.lock().unwrap().retain(|w| w.id != id);
        }))
    }
}
