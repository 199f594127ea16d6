use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Error,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Error => "error",
            Role::System => "system",
        };
        write!(f, "{}", name)
    }
}

/// One persisted chat turn. Field names follow the store's document schema;
/// messages are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: Uuid,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_roles: Option<Vec<String>>,
}

/// History queries run against either the session or the user partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryKey {
    Session(String),
    User(String),
}

impl HistoryKey {
    /// Document field the query filters on.
    pub fn field(&self) -> &'static str {
        match self {
            HistoryKey::Session(_) => "sessionId",
            HistoryKey::User(_) => "userId",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            HistoryKey::Session(id) | HistoryKey::User(id) => id,
        }
    }
}

/// Outcome of a history read. `Disabled` and `Failed` both collapse to an
/// empty context for callers, but stay distinguishable for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryFetch {
    Messages(Vec<StoredMessage>),
    Disabled,
    Failed,
}

impl HistoryFetch {
    pub fn into_messages(self) -> Vec<StoredMessage> {
        match self {
            HistoryFetch::Messages(messages) => messages,
            HistoryFetch::Disabled | HistoryFetch::Failed => Vec::new(),
        }
    }
}
