use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated user's opaque handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
        }
    }
}

/// Profile record written once at registration, read thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl Profile {
    pub fn for_registration(email: &str) -> Self {
        let now = Utc::now();
        Self {
            email: email.to_string(),
            created_at: now,
            last_login: now,
        }
    }
}

/// A to-do record owned by exactly one identity.
///
/// Keys are generated client-side: the document store contract is
/// write-by-key upsert, so the id exists before the first round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_uid: String,
    pub content: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(owner_uid: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_uid: owner_uid.to_string(),
            content: content.to_string(),
            completed: false,
            created_at: Utc::now(),
        }
    }
}

// Listing order: creation time, id as tie-breaker so equal timestamps
// still sort the same way on every client.
impl Ord for Task {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
