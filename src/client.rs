use crate::error::ProviderFailure;
use crate::model::{Identity, ProfileDocument, Task, TaskDocument};
use crate::provider::{DocumentStore, IdentityProvider, TaskWatch, WatchEvent};

use async_trait::async_trait;
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tracing::debug;

type HttpsClient = Client<
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
    String,
>;

/// How often the watcher re-reads the collection when nothing pokes it.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

struct SessionState {
    identity: Identity,
    id_token: String,
}

/// Remote backend over HTTPS.
///
/// Identity calls go to an `accounts:*` REST endpoint (`signUp`,
/// `signInWithPassword`, `sendOobCode`); documents are plain JSON resources
/// under `users/{uid}/...`. The live query is a polling task that is woken
/// early after each local mutation.
#[derive(Clone)]
pub struct RestClient {
    http: HttpsClient,
    identity_base: String,
    store_base: String,
    api_key: String,
    session: Arc<RwLock<Option<SessionState>>>,
    poke: Arc<Notify>,
}

impl RestClient {
    pub fn new(
        identity_url: &str,
        store_url: &str,
        api_key: &str,
        insecure: bool,
    ) -> Result<Self, ProviderFailure> {
        let https_connector = if insecure {
            let tls_config = rustls::ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth();

            HttpsConnectorBuilder::new()
                .with_tls_config(tls_config)
                .https_or_http()
                .enable_http1()
                .build()
        } else {
            let mut root_store = rustls::RootCertStore::empty();
            let result = rustls_native_certs::load_native_certs();
            root_store.add_parsable_certificates(result.certs);

            if root_store.is_empty() {
                return Err(ProviderFailure::new(
                    "NO_SYSTEM_CERTS",
                    "No valid system certificates found",
                ));
            }

            let tls_config = rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth();

            HttpsConnectorBuilder::new()
                .with_tls_config(tls_config)
                .https_or_http()
                .enable_http1()
                .build()
        };

        let http = Client::builder(TokioExecutor::new()).build(https_connector);

        Ok(Self {
            http,
            identity_base: identity_url.trim_end_matches('/').to_string(),
            store_base: store_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            session: Arc::new(RwLock::new(None)),
            poke: Arc::new(Notify::new()),
        })
    }

    fn bearer(&self) -> Option<String> {
        self.session
            .read()
            .unwrap()
            .as_ref()
            .map(|s| format!("Bearer {}", s.id_token))
    }

    async fn send(&self, req: Request<String>) -> Result<(StatusCode, String), ProviderFailure> {
        let resp = self
            .http
            .request(req)
            .await
            .map_err(|e| ProviderFailure::network(e.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ProviderFailure::network(e.to_string()))?
            .to_bytes();
        Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
    }

    async fn send_json(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
        authorized: bool,
    ) -> Result<(StatusCode, String), ProviderFailure> {
        let mut builder = Request::builder()
            .method(method)
            .uri(url.as_str())
            .header(header::CONTENT_TYPE, "application/json");
        if authorized && let Some(auth) = self.bearer() {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let req = builder
            .body(body.unwrap_or_default())
            .map_err(|e| ProviderFailure::new("INVALID_REQUEST", e.to_string()))?;
        self.send(req).await
    }

    async fn identity_call(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<String, ProviderFailure> {
        let url = format!(
            "{}/v1/accounts:{}?key={}",
            self.identity_base, endpoint, self.api_key
        );
        let (status, text) = self
            .send_json(Method::POST, url, Some(body.to_string()), false)
            .await?;
        debug!(endpoint, status = status.as_u16(), "identity endpoint responded");
        if !status.is_success() {
            return Err(identity_failure(status, &text));
        }
        Ok(text)
    }

    async fn list_tasks(&self, owner_uid: &str) -> Result<Vec<Task>, ProviderFailure> {
        let url = format!("{}/users/{}/tasks", self.store_base, owner_uid);
        let (status, text) = self.send_json(Method::GET, url, None, true).await?;
        if status == StatusCode::NOT_FOUND {
            // Collection does not exist yet: same as empty.
            return Ok(vec![]);
        }
        if !status.is_success() {
            return Err(store_failure(status, &text));
        }
        let listing: Option<BTreeMap<String, TaskDocument>> = serde_json::from_str(&text)
            .map_err(|e| ProviderFailure::new("BAD_LISTING", e.to_string()))?;
        Ok(Task::from_listing(listing.unwrap_or_default(), owner_uid))
    }
}

#[async_trait]
impl IdentityProvider for RestClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ProviderFailure> {
        let text = self
            .identity_call(
                "signUp",
                serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        let auth: AuthResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderFailure::new("BAD_AUTH_RESPONSE", e.to_string()))?;
        Ok(self.open_session(auth))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderFailure> {
        let text = self
            .identity_call(
                "signInWithPassword",
                serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        let auth: AuthResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderFailure::new("BAD_AUTH_RESPONSE", e.to_string()))?;
        Ok(self.open_session(auth))
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderFailure> {
        self.identity_call(
            "sendOobCode",
            serde_json::json!({
                "requestType": "PASSWORD_RESET",
                "email": email,
            }),
        )
        .await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderFailure> {
        // Token is client-held; forgetting it ends the session.
        *self.session.write().unwrap() = None;
        Ok(())
    }

    fn cached_identity(&self) -> Option<Identity> {
        self.session
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.identity.clone())
    }
}

impl RestClient {
    fn open_session(&self, auth: AuthResponse) -> Identity {
        let identity = Identity::new(auth.local_id, auth.email);
        *self.session.write().unwrap() = Some(SessionState {
            identity: identity.clone(),
            id_token: auth.id_token,
        });
        identity
    }
}

#[async_trait]
impl DocumentStore for RestClient {
    async fn put_profile(
        &self,
        owner_uid: &str,
        profile: &ProfileDocument,
    ) -> Result<(), ProviderFailure> {
        let url = format!("{}/users/{}/profile", self.store_base, owner_uid);
        let body = serde_json::to_string(profile)
            .map_err(|e| ProviderFailure::new("BAD_DOCUMENT", e.to_string()))?;
        let (status, text) = self.send_json(Method::PUT, url, Some(body), true).await?;
        if !status.is_success() {
            return Err(store_failure(status, &text));
        }
        Ok(())
    }

    async fn upsert_task(&self, task: &Task) -> Result<(), ProviderFailure> {
        let url = format!(
            "{}/users/{}/tasks/{}",
            self.store_base, task.owner_uid, task.id
        );
        let body = serde_json::to_string(&task.to_document())
            .map_err(|e| ProviderFailure::new("BAD_DOCUMENT", e.to_string()))?;
        let (status, text) = self.send_json(Method::PUT, url, Some(body), true).await?;
        if !status.is_success() {
            return Err(store_failure(status, &text));
        }
        self.poke.notify_waiters();
        Ok(())
    }

    async fn delete_task(&self, owner_uid: &str, task_id: &str) -> Result<(), ProviderFailure> {
        let url = format!("{}/users/{}/tasks/{}", self.store_base, owner_uid, task_id);
        let (status, text) = self.send_json(Method::DELETE, url, None, true).await?;
        // Already gone counts as deleted.
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(store_failure(status, &text));
        }
        self.poke.notify_waiters();
        Ok(())
    }

    async fn watch_tasks(&self, owner_uid: &str) -> Result<TaskWatch, ProviderFailure> {
        let initial = self.list_tasks(owner_uid).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(WatchEvent::Snapshot(initial.clone()));

        let client = self.clone();
        let owner = owner_uid.to_string();
        let handle = tokio::spawn(async move {
            let mut last = initial;
            loop {
                tokio::select! {
                    _ = client.poke.notified() => {}
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                }
                match client.list_tasks(&owner).await {
                    Ok(tasks) => {
                        if tasks != last {
                            last = tasks.clone();
                            if tx.send(WatchEvent::Snapshot(tasks)).is_err() {
                                break;
                            }
                        }
                    }
                    Err(failure) => {
                        let _ = tx.send(WatchEvent::Terminated(failure));
                        break;
                    }
                }
            }
        });

        let abort = handle.abort_handle();
        Ok(TaskWatch::new(rx, move || abort.abort()))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    email: String,
    id_token: String,
}

/// Extracts the provider symbol from an identity error body like
/// `{"error": {"message": "WEAK_PASSWORD : Password should be ..."}}`.
fn identity_failure(status: StatusCode, body: &str) -> ProviderFailure {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorInner,
    }
    #[derive(Deserialize)]
    struct ErrorInner {
        message: String,
    }

    let code = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| {
            b.error
                .message
                .split([' ', ':'])
                .find(|part| !part.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP_{}", status.as_u16()));

    ProviderFailure::new(code, body)
}

fn store_failure(status: StatusCode, body: &str) -> ProviderFailure {
    let code = match status.as_u16() {
        401 | 403 => "PERMISSION_DENIED".to_string(),
        404 => "NOT_FOUND".to_string(),
        s => format!("HTTP_{s}"),
    };
    ProviderFailure::new(code, body)
}

#[derive(Debug)]
struct NoVerifier;
impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _: &rustls::pki_types::CertificateDer<'_>,
        _: &[rustls::pki_types::CertificateDer<'_>],
        _: &rustls::pki_types::ServerName<'_>,
        _: &[u8],
        _: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }
    fn verify_tls12_signature(
        &self,
        _: &[u8],
        _: &rustls::pki_types::CertificateDer<'_>,
        _: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }
    fn verify_tls13_signature(
        &self,
        _: &[u8],
        _: &rustls::pki_types::CertificateDer<'_>,
        _: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }
    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        use rustls::SignatureScheme::*;
        vec![
            RSA_PKCS1_SHA256,
            RSA_PKCS1_SHA384,
            RSA_PKCS1_SHA512,
            ECDSA_NISTP256_SHA256,
            RSA_PSS_SHA256,
            ED25519,
        ]
    }
}
