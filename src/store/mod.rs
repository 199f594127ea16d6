pub mod cosmos;
pub mod models;

pub use cosmos::{ConnectionString, CosmosStore};
pub use models::{HistoryFetch, HistoryKey, Role, StoredMessage};

use async_trait::async_trait;

/// Handle to the conversation history store.
///
/// Constructed once at process start and passed by reference into every
/// handler and the chat engine. Store unavailability is a degraded mode, not
/// a fatal condition: `save` never surfaces an error and `fetch_recent`
/// yields an empty context instead of failing.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Availability flag computed when the handle is built. When false every
    /// operation short-circuits to a no-op or an empty result.
    fn enabled(&self) -> bool;

    /// Persist one chat turn. Failures are logged and swallowed.
    async fn save(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        user_roles: Option<&[String]>,
        role: Role,
        content: &str,
    );

    /// Up to `limit` most recent messages for `key`, re-sorted oldest first.
    async fn fetch_recent(&self, key: &HistoryKey, limit: usize) -> HistoryFetch;
}
