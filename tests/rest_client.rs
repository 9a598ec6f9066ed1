use cocher::client::RestClient;
use cocher::error::AuthErrorKind;
use cocher::model::Task;
use cocher::provider::WatchEvent;
use cocher::session::SessionManager;
use cocher::store::TaskStore;
use mockito::Server;
use std::sync::Arc;

fn stack(server: &Server) -> (
    Arc<RestClient>,
    SessionManager<RestClient, RestClient>,
    TaskStore<RestClient, RestClient>,
) {
    let url = server.url();
    let client = Arc::new(RestClient::new(&url, &url, "k-test", true).unwrap());
    let session = SessionManager::new(Arc::clone(&client), Arc::clone(&client));
    let store = TaskStore::new(Arc::clone(&client), Arc::clone(&client));
    (client, session, store)
}

async fn mock_sign_in(server: &mut Server) -> mockito::Mock {
    server
        .mock("POST", "/v1/accounts:signInWithPassword")
        .match_query(mockito::Matcher::UrlEncoded("key".into(), "k-test".into()))
        .with_status(200)
        .with_body(r#"{"localId": "u1", "email": "anna@example.com", "idToken": "tok-123"}"#)
        .create_async()
        .await
}

#[tokio::test]
async fn register_signs_up_and_writes_the_profile() {
    let mut server = Server::new_async().await;

    let mock_sign_up = server
        .mock("POST", "/v1/accounts:signUp")
        .match_query(mockito::Matcher::UrlEncoded("key".into(), "k-test".into()))
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "email": "anna@example.com",
            "returnSecureToken": true,
        })))
        .with_status(200)
        .with_body(r#"{"localId": "u1", "email": "anna@example.com", "idToken": "tok-123"}"#)
        .create_async()
        .await;

    let mock_profile = server
        .mock("PUT", "/users/u1/profile")
        .match_header("authorization", "Bearer tok-123")
        .match_body(mockito::Matcher::Regex(r"anna@example\.com".to_string()))
        .with_status(200)
        .create_async()
        .await;

    let (_client, session, _store) = stack(&server);

    let identity = session
        .register("anna@example.com", "hunter22")
        .await
        .unwrap();
    assert_eq!(identity.uid, "u1");
    assert_eq!(
        session.current_identity().unwrap().email,
        "anna@example.com"
    );

    mock_sign_up.assert_async().await;
    mock_profile.assert_async().await;
}

#[tokio::test]
async fn identity_error_bodies_map_through_the_table() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/v1/accounts:signInWithPassword")
        .match_query(mockito::Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error": {"message": "EMAIL_NOT_FOUND"}}"#)
        .create_async()
        .await;

    let (_client, session, _store) = stack(&server);

    let err = session
        .authenticate("nobody@example.com", "hunter22")
        .await
        .unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::UserNotFound);
    assert_eq!(err.message, "No account found with this email address");
    assert_eq!(err.code, "EMAIL_NOT_FOUND");
}

#[tokio::test]
async fn unreachable_identity_endpoint_is_a_network_failure() {
    // Nothing is listening on this port.
    let client = Arc::new(
        RestClient::new("http://127.0.0.1:9", "http://127.0.0.1:9", "k", true).unwrap(),
    );
    let session = SessionManager::new(Arc::clone(&client), Arc::clone(&client));

    let err = session
        .authenticate("anna@example.com", "hunter22")
        .await
        .unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::NetworkFailure);
    assert_eq!(err.message, "Network error. Please check your connection");
}

#[tokio::test]
async fn create_puts_the_task_under_its_key() {
    let mut server = Server::new_async().await;
    let mock_auth = mock_sign_in(&mut server).await;

    let mock_put = server
        .mock(
            "PUT",
            mockito::Matcher::Regex(r"^/users/u1/tasks/[0-9a-f-]+$".to_string()),
        )
        .match_header("authorization", "Bearer tok-123")
        .match_body(mockito::Matcher::Regex("buy milk".to_string()))
        .with_status(200)
        .create_async()
        .await;

    let (_client, session, store) = stack(&server);
    session
        .authenticate("anna@example.com", "hunter22")
        .await
        .unwrap();

    let task = store.create("buy milk").await.unwrap();
    assert!(!task.completed);
    assert_eq!(task.owner_uid, "u1");

    mock_auth.assert_async().await;
    mock_put.assert_async().await;
}

#[tokio::test]
async fn delete_treats_404_as_done() {
    let mut server = Server::new_async().await;
    let _mock_auth = mock_sign_in(&mut server).await;

    let mock_delete = server
        .mock(
            "DELETE",
            mockito::Matcher::Regex(r"^/users/u1/tasks/".to_string()),
        )
        .with_status(404)
        .expect(2)
        .create_async()
        .await;

    let (_client, session, store) = stack(&server);
    session
        .authenticate("anna@example.com", "hunter22")
        .await
        .unwrap();

    let ghost = Task::new("u1", "already gone");
    // Twice in a row: both must resolve.
    store.delete(&ghost).await.unwrap();
    store.delete(&ghost).await.unwrap();

    mock_delete.assert_async().await;
}

#[tokio::test]
async fn watch_delivers_the_initial_ordered_snapshot() {
    let mut server = Server::new_async().await;
    let _mock_auth = mock_sign_in(&mut server).await;

    let listing = r#"{
        "id-later":   {"content": "second", "completed": false,
                       "createdAt": "2025-03-02T09:00:00Z"},
        "id-earlier": {"content": "first", "completed": true,
                       "createdAt": "2025-03-01T09:00:00Z"}
    }"#;
    let mock_list = server
        .mock("GET", "/users/u1/tasks")
        .match_header("authorization", "Bearer tok-123")
        .with_status(200)
        .with_body(listing)
        .create_async()
        .await;

    let (_client, session, store) = stack(&server);
    session
        .authenticate("anna@example.com", "hunter22")
        .await
        .unwrap();

    let mut watch = store.subscribe().await.unwrap();
    match watch.next_event().await.unwrap() {
        WatchEvent::Snapshot(tasks) => {
            assert_eq!(tasks.len(), 2);
            assert_eq!(tasks[0].content, "first");
            assert_eq!(tasks[1].content, "second");
            assert!(tasks.iter().all(|t| t.owner_uid == "u1"));
        }
        other => panic!("expected snapshot, got {other:?}"),
    }
    watch.cancel();

    mock_list.assert_async().await;
}
