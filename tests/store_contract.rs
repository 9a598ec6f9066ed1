use cocher::error::{AuthErrorKind, TaskError, ValidationError};
use cocher::model::Task;
use cocher::provider::{IdentityProvider, MemoryProvider, WatchEvent};
use cocher::session::SessionManager;
use cocher::store::TaskStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

type Fixture = (
    Arc<MemoryProvider>,
    SessionManager<MemoryProvider, MemoryProvider>,
    TaskStore<MemoryProvider, MemoryProvider>,
);

fn fixture() -> Fixture {
    let provider = Arc::new(MemoryProvider::new());
    let session = SessionManager::new(Arc::clone(&provider), Arc::clone(&provider));
    let store = TaskStore::new(Arc::clone(&provider), Arc::clone(&provider));
    (provider, session, store)
}

async fn signed_in() -> Fixture {
    let (provider, session, store) = fixture();
    session.register("anna@example.com", "hunter22").await.unwrap();
    (provider, session, store)
}

fn expect_snapshot(event: Option<WatchEvent>) -> Vec<Task> {
    match event {
        Some(WatchEvent::Snapshot(tasks)) => tasks,
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn operations_require_a_session() {
    let (_provider, _session, store) = fixture();

    let err = store.create("buy milk").await.unwrap_err();
    match err {
        TaskError::Auth(auth) => assert_eq!(auth.kind, AuthErrorKind::Unauthenticated),
        other => panic!("expected auth error, got {other:?}"),
    }
    assert!(store.subscribe().await.is_err());
}

#[tokio::test]
async fn empty_drafts_are_rejected_before_any_write() {
    let (provider, _session, store) = signed_in().await;

    for draft in ["", "   ", "\t\n"] {
        let err = store.create(draft).await.unwrap_err();
        match err {
            TaskError::Invalid(v) => assert_eq!(v, ValidationError::EmptyContent),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
    let uid = provider.cached_identity().unwrap().uid;
    assert_eq!(provider.task_count(&uid), 0);

    let task = store.create("buy milk").await.unwrap();
    assert!(!task.completed);
    assert_eq!(task.content, "buy milk");
    assert_eq!(provider.task_count(&uid), 1);
}

#[tokio::test]
async fn draft_content_is_trimmed() {
    let (_provider, _session, store) = signed_in().await;
    let task = store.create("  buy milk  ").await.unwrap();
    assert_eq!(task.content, "buy milk");
}

#[tokio::test]
async fn subscription_reflects_each_mutation_in_order() {
    let (_provider, session, store) = signed_in().await;
    let owner = session.current_identity().unwrap();

    let mut watch = store.subscribe().await.unwrap();
    assert!(expect_snapshot(watch.next_event().await).is_empty());

    let first = store.create("buy milk").await.unwrap();
    let snapshot = expect_snapshot(watch.next_event().await);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, first.id);

    let second = store.create("water plants").await.unwrap();
    let snapshot = expect_snapshot(watch.next_event().await);
    assert_eq!(
        snapshot.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
        vec![first.id.as_str(), second.id.as_str()],
        "creation order is preserved"
    );

    let mut updated = first.clone();
    updated.content = "buy oat milk".to_string();
    store.update(&updated).await.unwrap();
    let snapshot = expect_snapshot(watch.next_event().await);
    assert_eq!(snapshot[0].content, "buy oat milk");

    store.delete(&second).await.unwrap();
    let snapshot = expect_snapshot(watch.next_event().await);
    assert_eq!(snapshot.len(), 1);

    assert!(snapshot.iter().all(|t| t.owner_uid == owner.uid));
}

#[tokio::test]
async fn subscription_only_sees_the_owners_tasks() {
    let (_provider, session, store) = signed_in().await;

    store.create("mine").await.unwrap();
    let mine = session.current_identity().unwrap().uid;

    // A second account on the same backend must not leak into the first
    // user's view.
    session.sign_out().await.unwrap();
    session.register("bob@example.com", "hunter22").await.unwrap();
    store.create("bob's task").await.unwrap();
    session.sign_out().await.unwrap();
    session
        .authenticate("anna@example.com", "hunter22")
        .await
        .unwrap();

    let mut watch = store.subscribe().await.unwrap();
    let snapshot = expect_snapshot(watch.next_event().await);
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.iter().all(|t| t.owner_uid == mine));
}

#[tokio::test]
async fn failed_toggle_rolls_back_the_local_flag() {
    let (provider, _session, store) = signed_in().await;
    let mut task = store.create("buy milk").await.unwrap();

    provider.inject_failure("PERMISSION_DENIED");
    let err = store.toggle_completion(&mut task).await.unwrap_err();

    assert!(matches!(err, TaskError::Auth(_)));
    assert!(!task.completed, "flip must be rolled back after the failure");

    // And the store never saw the flip either.
    let mut watch = store.subscribe().await.unwrap();
    let snapshot = expect_snapshot(watch.next_event().await);
    assert!(!snapshot[0].completed);
}

#[tokio::test]
async fn successful_toggle_persists_the_flip() {
    let (_provider, _session, store) = signed_in().await;
    let mut task = store.create("buy milk").await.unwrap();

    store.toggle_completion(&mut task).await.unwrap();
    assert!(task.completed);

    store.toggle_completion(&mut task).await.unwrap();
    assert!(!task.completed);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (_provider, session, store) = signed_in().await;
    let owner = session.current_identity().unwrap();

    let ghost = Task::new(&owner.uid, "never stored");
    store.delete(&ghost).await.unwrap();
    store.delete(&ghost).await.unwrap();
}

#[tokio::test]
async fn update_of_a_missing_id_is_silently_accepted() {
    let (_provider, session, store) = signed_in().await;
    let owner = session.current_identity().unwrap();

    let mut phantom = Task::new(&owner.uid, "was never created");
    phantom.completed = true;

    // Write-by-key contract: the update lands under its key without error.
    store.update(&phantom).await.unwrap();
}

#[tokio::test]
async fn cancelled_subscription_receives_nothing_further() {
    let (_provider, _session, store) = signed_in().await;

    let mut watch = store.subscribe().await.unwrap();
    assert!(expect_snapshot(watch.next_event().await).is_empty());

    watch.cancel();
    store.create("after cancel").await.unwrap();

    assert!(watch.next_event().await.is_none());
}

#[tokio::test]
async fn dropping_a_subscription_releases_the_listener() {
    let (_provider, _session, store) = signed_in().await;

    {
        let _watch = store.subscribe().await.unwrap();
    }
    // No receiver left; the mutation must not hang or error.
    store.create("after drop").await.unwrap();
}

#[tokio::test]
async fn a_failed_mutation_does_not_terminate_the_subscription() {
    let (provider, _session, store) = signed_in().await;

    let mut watch = store.subscribe().await.unwrap();
    assert!(expect_snapshot(watch.next_event().await).is_empty());

    provider.inject_failure("PERMISSION_DENIED");
    assert!(store.create("will fail").await.is_err());

    // No event for the failed write...
    let pending = timeout(Duration::from_millis(50), watch.next_event()).await;
    assert!(pending.is_err(), "failed write must not emit a snapshot");

    // ...and the stream still delivers afterwards.
    store.create("works again").await.unwrap();
    let snapshot = expect_snapshot(watch.next_event().await);
    assert_eq!(snapshot.len(), 1);
}

#[tokio::test]
async fn concurrent_subscriptions_each_get_full_snapshots() {
    let (_provider, _session, store) = signed_in().await;

    let mut first = store.subscribe().await.unwrap();
    let mut second = store.subscribe().await.unwrap();
    expect_snapshot(first.next_event().await);
    expect_snapshot(second.next_event().await);

    store.create("shared").await.unwrap();

    assert_eq!(expect_snapshot(first.next_event().await).len(), 1);
    assert_eq!(expect_snapshot(second.next_event().await).len(), 1);

    // Cancelling one leaves the other live.
    first.cancel();
    store.create("second still listening").await.unwrap();
    assert_eq!(expect_snapshot(second.next_event().await).len(), 2);
    assert!(first.next_event().await.is_none());
}
