use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Role;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_roles: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub store_enabled: bool,
    pub message_count: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessageHistory {
    pub messages: Vec<HistoryMessage>,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct UserMessageHistory {
    pub messages: Vec<HistoryMessage>,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct WarmUpResponse {
    pub message: String,
    pub success: bool,
}
