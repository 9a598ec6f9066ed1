// File: ./src/model/adapter.rs
// Handles wire document serialization/deserialization
use crate::model::item::{Profile, Task};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire shape of a task document. The id and owner are not part of the
/// document body; they live in the resource path (`users/{uid}/tasks/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    pub content: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Wire shape of the per-user profile document (`users/{uid}/profile`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl Task {
    pub fn to_document(&self) -> TaskDocument {
        TaskDocument {
            content: self.content.clone(),
            completed: self.completed,
            created_at: self.created_at,
        }
    }

    pub fn from_document(doc: TaskDocument, id: String, owner_uid: String) -> Self {
        Self {
            id,
            owner_uid,
            content: doc.content,
            completed: doc.completed,
            created_at: doc.created_at,
        }
    }

    /// Decodes a collection listing (`{"<id>": {...}, ...}`) into an ordered
    /// task list for `owner_uid`.
    pub fn from_listing(listing: BTreeMap<String, TaskDocument>, owner_uid: &str) -> Vec<Task> {
        let mut tasks: Vec<Task> = listing
            .into_iter()
            .map(|(id, doc)| Task::from_document(doc, id, owner_uid.to_string()))
            .collect();
        tasks.sort();
        tasks
    }
}

impl Profile {
    pub fn to_document(&self) -> ProfileDocument {
        ProfileDocument {
            email: self.email.clone(),
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }

    pub fn from_document(doc: ProfileDocument) -> Self {
        Self {
            email: doc.email,
            created_at: doc.created_at,
            last_login: doc.last_login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_decodes_in_creation_order() {
        let json = r#"{
            "b-second": {"content": "later", "completed": true,
                         "createdAt": "2025-03-02T10:00:00Z"},
            "a-first":  {"content": "earlier", "completed": false,
                         "createdAt": "2025-03-01T10:00:00Z"}
        }"#;
        let listing: BTreeMap<String, TaskDocument> = serde_json::from_str(json).unwrap();
        let tasks = Task::from_listing(listing, "uid-9");

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].content, "earlier");
        assert_eq!(tasks[1].content, "later");
        assert!(tasks.iter().all(|t| t.owner_uid == "uid-9"));
    }

    #[test]
    fn task_document_round_trip_keeps_fields() {
        let task = Task::new("uid-1", "water plants");
        let doc = task.to_document();
        let back = Task::from_document(doc, task.id.clone(), task.owner_uid.clone());
        assert_eq!(back, task);
    }
}
