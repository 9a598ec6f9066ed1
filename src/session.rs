// Session manager: wraps the external identity provider and owns the
// profile record written at registration.
use crate::error::AuthError;
use crate::model::{Identity, Profile};
use crate::provider::{DocumentStore, IdentityProvider};
use std::sync::Arc;
use tracing::{debug, warn};

/// Register / authenticate / password-reset / sign-out against an injected
/// identity provider, normalizing every failure through the error table.
pub struct SessionManager<I: IdentityProvider, D: DocumentStore> {
    identity: Arc<I>,
    documents: Arc<D>,
}

impl<I: IdentityProvider, D: DocumentStore> SessionManager<I, D> {
    pub fn new(identity: Arc<I>, documents: Arc<D>) -> Self {
        Self {
            identity,
            documents,
        }
    }

    /// Creates a new identity, then writes its profile record through a
    /// single document write.
    ///
    /// The profile write is not atomic with account creation: when it fails
    /// the account already exists, and the failure still surfaces as an
    /// `AuthError` rather than being swallowed.
    pub async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = self
            .identity
            .sign_up(email, password)
            .await
            .map_err(|f| AuthError::from_failure(f, "Registration failed"))?;
        debug!(uid = %identity.uid, "registered new identity");

        let profile = Profile::for_registration(&identity.email);
        self.documents
            .put_profile(&identity.uid, &profile.to_document())
            .await
            .map_err(|f| {
                warn!(uid = %identity.uid, code = %f.code, "profile write failed after sign-up");
                AuthError::from_failure(f, "Failed to create user profile")
            })?;

        Ok(identity)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.identity
            .sign_in(email, password)
            .await
            .map_err(|f| AuthError::from_failure(f, "Authentication failed"))
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.identity
            .send_password_reset(email)
            .await
            .map_err(|f| AuthError::from_failure(f, "Password reset initiation failed"))
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.identity
            .sign_out()
            .await
            .map_err(|f| AuthError::from_failure(f, "Sign out failed"))
    }

    /// Synchronous read of the provider's cached session.
    pub fn current_identity(&self) -> Option<Identity> {
        self.identity.cached_identity()
    }
}
