// Error taxonomy shared by the session manager and the task store.
use thiserror::Error;

/// Raw failure reported by a backend, before normalization.
///
/// `code` is the provider's own symbol (e.g. `EMAIL_EXISTS`); `detail` is
/// whatever diagnostic text the backend produced. Neither is meant for end
/// users.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {detail}")]
pub struct ProviderFailure {
    pub code: String,
    pub detail: String,
}

impl ProviderFailure {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
        }
    }

    /// Transport-level failure (connection refused, TLS, DNS...).
    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(codes::NETWORK_ERROR, detail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    EmailInUse,
    WeakPassword,
    UserNotFound,
    WrongPassword,
    InvalidEmail,
    TooManyRequests,
    NetworkFailure,
    Unauthenticated,
    Unknown,
}

/// Normalized authentication/persistence error.
///
/// `message` is safe to render to the user. `code` preserves the provider
/// symbol for logging, and `source` keeps the original failure for
/// diagnostics only.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
    pub code: String,
    #[source]
    pub source: Option<ProviderFailure>,
}

/// Provider codes recognized by the mapping table. Backends that speak a
/// different dialect translate into these before reporting.
pub mod codes {
    pub const EMAIL_EXISTS: &str = "EMAIL_EXISTS";
    pub const WEAK_PASSWORD: &str = "WEAK_PASSWORD";
    pub const EMAIL_NOT_FOUND: &str = "EMAIL_NOT_FOUND";
    pub const INVALID_PASSWORD: &str = "INVALID_PASSWORD";
    pub const INVALID_EMAIL: &str = "INVALID_EMAIL";
    pub const TOO_MANY_ATTEMPTS: &str = "TOO_MANY_ATTEMPTS_TRY_LATER";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
}

/// Single source of truth for code -> (kind, user message). Data, not
/// branching logic, so new provider codes are one line here plus a test.
const AUTH_CODE_TABLE: &[(&str, AuthErrorKind, &str)] = &[
    (
        codes::EMAIL_EXISTS,
        AuthErrorKind::EmailInUse,
        "This email address is already registered",
    ),
    (
        codes::WEAK_PASSWORD,
        AuthErrorKind::WeakPassword,
        "Password must be at least 6 characters long",
    ),
    (
        codes::EMAIL_NOT_FOUND,
        AuthErrorKind::UserNotFound,
        "No account found with this email address",
    ),
    (
        codes::INVALID_PASSWORD,
        AuthErrorKind::WrongPassword,
        "Incorrect password",
    ),
    (
        codes::INVALID_EMAIL,
        AuthErrorKind::InvalidEmail,
        "Please enter a valid email address",
    ),
    (
        codes::TOO_MANY_ATTEMPTS,
        AuthErrorKind::TooManyRequests,
        "Too many attempts. Please try again later",
    ),
    (
        codes::NETWORK_ERROR,
        AuthErrorKind::NetworkFailure,
        "Network error. Please check your connection",
    ),
];

impl AuthError {
    /// Normalizes a raw backend failure.
    ///
    /// Recognized codes get their mapped kind and static message; anything
    /// else falls back to `default_message` with `kind == Unknown`, keeping
    /// the original code for logging.
    pub fn from_failure(failure: ProviderFailure, default_message: &str) -> Self {
        for (code, kind, message) in AUTH_CODE_TABLE {
            if *code == failure.code {
                return Self {
                    kind: *kind,
                    message: (*message).to_string(),
                    code: failure.code.clone(),
                    source: Some(failure),
                };
            }
        }
        Self {
            kind: AuthErrorKind::Unknown,
            message: default_message.to_string(),
            code: failure.code.clone(),
            source: Some(failure),
        }
    }

    /// An operation required a signed-in identity and there was none.
    pub fn unauthenticated() -> Self {
        Self {
            kind: AuthErrorKind::Unauthenticated,
            message: "You must be signed in to manage tasks".to_string(),
            code: "UNAUTHENTICATED".to_string(),
            source: None,
        }
    }
}

/// Pre-network validation failure. Raised before any provider round-trip.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Task content must not be empty")]
    EmptyContent,
}

/// Task store error: either a normalized provider failure or a local
/// validation rejection.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
