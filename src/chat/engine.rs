use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::chat::quality::is_genuinely_weak;
use crate::config::ChatConfig;
use crate::llm::models::PromptMessage;
use crate::llm::{CompletionClient, CompletionError};
use crate::store::{HistoryKey, HistoryStore, Role};

const SYSTEM_PROMPT: &str = "You are a helpful and knowledgeable document assistant chatbot. \
Your primary role is to help users find information from their documents using an integrated search system.\n\n\
GUIDELINES:\n\
1. ALWAYS attempt to answer based on available document content, even when the information is partial.\n\
2. If information is limited, say \"Based on the available information...\" and provide what you can.\n\
3. Never simply say \"I don't know\" without attempting to be helpful; when nothing relevant is found, \
suggest alternative questions or topics the user might explore.\n\
4. Ask clarifying questions when the user's intent is unclear.\n\
5. Be conversational, present relevant information clearly and confidently, and reference previous \
exchanges when that adds value to the current response.";

pub const WARMUP_SESSION_ID: &str = "warmup-session";
const WARMUP_QUERY: &str = "What is this document about?";

/// Retry controller and quality gate around the completion client.
///
/// Runs one chat turn as a bounded attempt loop: transport failures and
/// genuinely weak answers are retried through the same budget, with a fixed
/// non-blocking delay between attempts.
pub struct ChatEngine {
    store: Arc<dyn HistoryStore>,
    client: Arc<dyn CompletionClient>,
    config: ChatConfig,
}

impl ChatEngine {
    pub fn new(store: Arc<dyn HistoryStore>, client: Arc<dyn CompletionClient>, config: ChatConfig) -> Self {
        Self { store, client, config }
    }

    /// System persona, recent stored turns, then the new user input.
    /// Assembled once per turn; retries reuse it unchanged.
    async fn build_prompt(&self, user_input: &str, session_id: &str) -> Vec<PromptMessage> {
        let mut prompt = vec![PromptMessage::new(Role::System, SYSTEM_PROMPT)];

        let history = self
            .store
            .fetch_recent(
                &HistoryKey::Session(session_id.to_string()),
                self.config.context_messages,
            )
            .await
            .into_messages();

        if !history.is_empty() {
            debug!("Using conversation history with {} messages", history.len());
        }

        for message in history {
            // Stored error turns go to the completion service as assistant turns;
            // it only understands the standard chat roles.
            let role = match message.role {
                Role::Error => Role::Assistant,
                other => other,
            };
            prompt.push(PromptMessage::new(role, message.content));
        }

        prompt.push(PromptMessage::new(Role::User, user_input));
        prompt
    }

    /// Run one chat turn with the configured attempt budget.
    pub async fn run_turn(&self, user_input: &str, session_id: &str) -> Result<Option<String>, CompletionError> {
        self.run_turn_with_budget(user_input, session_id, self.config.max_retries)
            .await
    }

    /// Run one chat turn with an explicit attempt budget.
    ///
    /// `Ok(None)` is only reachable with a zero budget; otherwise the turn
    /// ends with an accepted response, the last captured weak response, or
    /// the final attempt's error.
    pub async fn run_turn_with_budget(
        &self,
        user_input: &str,
        session_id: &str,
        max_retries: u32,
    ) -> Result<Option<String>, CompletionError> {
        debug!("User query for session {}: {}", session_id, user_input);

        let prompt = self.build_prompt(user_input, session_id).await;
        debug!("Chat prompt prepared with {} messages", prompt.len());

        let mut last_response: Option<String> = None;
        let mut last_error: Option<CompletionError> = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                debug!("Waiting {}s before retry", self.config.retry_delay_secs);
                tokio::time::sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
            }

            debug!("Attempt {}/{}", attempt + 1, max_retries);

            match self.client.complete(&prompt).await {
                Ok(response) => {
                    let weak = is_genuinely_weak(&response.content);
                    debug!("Response length {}, genuinely weak: {}", response.content.len(), weak);

                    if weak && attempt + 1 < max_retries {
                        info!("Response is genuinely weak, will retry");
                        last_response = Some(response.content);
                        continue;
                    }

                    return Ok(Some(response.content));
                }
                Err(e) => {
                    warn!("Completion attempt {} failed: {}", attempt + 1, e);
                    if attempt + 1 == max_retries {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        // Exhausted without accepting: a captured response, even a weak one,
        // beats surfacing a failure.
        if let Some(response) = last_response {
            info!("Returning last captured response after exhausting retries");
            return Ok(Some(response));
        }
        if let Some(e) = last_error {
            return Err(e);
        }
        Ok(None)
    }

    /// One synthetic turn to pre-warm the retrieval and completion path.
    /// Failures are logged and reported as `false`, never propagated.
    pub async fn warm_up(&self) -> bool {
        debug!("Starting search index warmup");

        match self.run_turn_with_budget(WARMUP_QUERY, WARMUP_SESSION_ID, 1).await {
            Ok(response) => {
                debug!("Warmup response: {:?}", response);
                info!("Search index warmed successfully");
                true
            }
            Err(e) => {
                warn!("Warmup failed: {}", e);
                false
            }
        }
    }
}
