use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::config::{CompletionConfig, SearchConfig};
use crate::llm::models::{CompletionResponse, PromptMessage, Usage};
use crate::llm::{CompletionClient, CompletionError};

/// Client for an Azure OpenAI chat-completions deployment with an attached
/// search index ("on your data"). The retrieval configuration is forwarded
/// opaquely; the service grounds its answer in the index and returns a single
/// generated text.
pub struct AzureOpenAiClient {
    client: Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
    search: SearchConfig,
}

impl AzureOpenAiClient {
    pub fn new(completion: CompletionConfig, search: SearchConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: completion.endpoint.trim_end_matches('/').to_string(),
            deployment: completion.deployment,
            api_version: completion.api_version,
            api_key: completion.api_key,
            search,
        }
    }

    /// Retrieval-augmentation block attached to every completion request.
    fn data_sources(&self) -> serde_json::Value {
        json!([{
            "type": "azure_search",
            "parameters": {
                "filter": null,
                "endpoint": self.search.endpoint,
                "index_name": self.search.index_name,
                "semantic_configuration": self.search.semantic_configuration,
                "authentication": {
                    "type": "api_key",
                    "key": self.search.key,
                },
                "embedding_dependency": {
                    "type": "endpoint",
                    "endpoint": self.search.embedding_endpoint,
                    "authentication": {
                        "type": "api_key",
                        "key": self.api_key,
                    },
                },
                "query_type": self.search.query_type,
                "in_scope": self.search.in_scope,
                "strictness": self.search.strictness,
                "top_n_documents": self.search.top_n_documents,
            }
        }])
    }
}

#[async_trait]
impl CompletionClient for AzureOpenAiClient {
    fn name(&self) -> &str {
        "azure-openai"
    }

    async fn complete(&self, messages: &[PromptMessage]) -> Result<CompletionResponse, CompletionError> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        );

        let body = json!({
            "messages": messages,
            "max_tokens": 1000,
            "temperature": 0.7,
            "top_p": 0.95,
            "frequency_penalty": 0,
            "presence_penalty": 0,
            "stop": null,
            "stream": false,
            "data_sources": self.data_sources(),
        });

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(CompletionError::RateLimited);
            }
            return Err(CompletionError::Api(format!("Completion Error {}: {}", status, text)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(CompletionError::InvalidResponse)?
            .to_string();

        let usage = json.get("usage").map(|u| Usage {
            input_tokens: u["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: u["completion_tokens"].as_u64().unwrap_or(0) as u32,
        });

        let model = json["model"].as_str().unwrap_or(&self.deployment).to_string();

        debug!(
            "Completion returned {} chars (model {}, usage {:?})",
            content.len(),
            model,
            usage
        );

        Ok(CompletionResponse { content, model, usage })
    }
}
