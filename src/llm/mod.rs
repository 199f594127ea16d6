pub mod azure;
pub mod models;

pub use azure::AzureOpenAiClient;

use async_trait::async_trait;
use thiserror::Error;

use models::{CompletionResponse, PromptMessage};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("API Error: {0}")]
    Api(String),
    #[error("Rate Limited")]
    RateLimited,
    #[error("Malformed completion response")]
    InvalidResponse,
}

/// One request/response exchange with the hosted completion service.
///
/// Implementations raise on transport or service failure and never retry;
/// the retry policy lives entirely in [`crate::chat::ChatEngine`].
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, messages: &[PromptMessage]) -> Result<CompletionResponse, CompletionError>;
}
