use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::store::models::{HistoryFetch, HistoryKey, Role, StoredMessage};
use crate::store::HistoryStore;

const STORE_API_VERSION: &str = "2018-12-31";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
enum StoreError {
    #[error("Network Error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Store responded {0}")]
    Status(reqwest::StatusCode),
}

/// Parsed `AccountEndpoint=...;AccountKey=...;` credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub endpoint: String,
    pub key: String,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut endpoint = None;
        let mut key = None;

        for part in raw.split(';') {
            // The key is base64 and may itself contain '=', so split on the first one only.
            if let Some((name, value)) = part.trim().split_once('=') {
                match name {
                    "AccountEndpoint" => endpoint = Some(value.trim_end_matches('/').to_string()),
                    "AccountKey" => key = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        Some(Self {
            endpoint: endpoint?,
            key: key?,
        })
    }
}

/// Client for the document store's REST API, master-key auth.
///
/// Built once at startup; `enabled` records whether the initial collection
/// probe succeeded. A store outage never blocks chat functionality: writes
/// are logged-and-dropped and reads degrade to an empty context.
pub struct CosmosStore {
    client: Client,
    endpoint: String,
    /// Decoded master-key material; empty when disabled.
    key: Vec<u8>,
    /// `dbs/{database}/colls/{container}` resource link.
    collection_link: String,
    enabled: bool,
}

impl CosmosStore {
    /// Build a handle from credentials without touching the network.
    /// Returns `None` when the connection string is absent or malformed.
    pub fn from_config(config: &StoreConfig) -> Option<Self> {
        let conn = ConnectionString::parse(&config.connection_string)?;
        let key = BASE64.decode(conn.key.as_bytes()).ok()?;

        Some(Self {
            client: Client::new(),
            endpoint: conn.endpoint,
            key,
            collection_link: format!("dbs/{}/colls/{}", config.database, config.container),
            enabled: true,
        })
    }

    /// Establish the store connection, probing the target collection once.
    /// Never fails: a missing or unreachable store yields a disabled handle.
    pub async fn connect(config: &StoreConfig) -> Self {
        let Some(store) = Self::from_config(config) else {
            warn!("Store connection string missing or malformed, chat history disabled");
            return Self::disabled();
        };

        match store.probe().await {
            Ok(()) => {
                info!("Document store connection established ({})", store.collection_link);
                store
            }
            Err(e) => {
                error!("Document store connection failed: {}", e);
                Self { enabled: false, ..store }
            }
        }
    }

    /// Handle for the degraded mode where every operation is a no-op.
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            endpoint: String::new(),
            key: Vec::new(),
            collection_link: String::new(),
            enabled: false,
        }
    }

    /// Signed authorization token plus the `x-ms-date` value it covers.
    fn auth_headers(&self, verb: &str, resource_type: &str, resource_link: &str) -> (String, String) {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type,
            resource_link,
            date.to_lowercase()
        );

        // HMAC accepts keys of any length, so this cannot fail.
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC key of any length");
        mac.update(payload.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let token = urlencoding::encode(&format!("type=master&ver=1.0&sig={}", signature)).into_owned();
        (token, date)
    }

    async fn probe(&self) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.endpoint, self.collection_link);
        let (token, date) = self.auth_headers("GET", "colls", &self.collection_link);

        let response = self
            .client
            .get(url)
            .header("authorization", token)
            .header("x-ms-date", date)
            .header("x-ms-version", STORE_API_VERSION)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Status(response.status()))
        }
    }

    async fn create_document(&self, document: &StoredMessage) -> Result<(), StoreError> {
        let url = format!("{}/{}/docs", self.endpoint, self.collection_link);
        let (token, date) = self.auth_headers("POST", "docs", &self.collection_link);
        let partition_key = serde_json::json!([document.session_id]).to_string();

        let response = self
            .client
            .post(url)
            .header("authorization", token)
            .header("x-ms-date", date)
            .header("x-ms-version", STORE_API_VERSION)
            .header("x-ms-documentdb-partitionkey", partition_key)
            .json(document)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Status(response.status()))
        }
    }

    async fn query_recent(&self, key: &HistoryKey, limit: usize) -> Result<Vec<StoredMessage>, StoreError> {
        let url = format!("{}/{}/docs", self.endpoint, self.collection_link);
        let (token, date) = self.auth_headers("POST", "docs", &self.collection_link);

        let body = serde_json::json!({
            "query": format!(
                "SELECT TOP {} * FROM c WHERE c.{} = @key ORDER BY c.timestamp DESC",
                limit,
                key.field()
            ),
            "parameters": [{ "name": "@key", "value": key.value() }],
        });

        let response = self
            .client
            .post(url)
            .header("authorization", token)
            .header("x-ms-date", date)
            .header("x-ms-version", STORE_API_VERSION)
            .header("x-ms-documentdb-isquery", "True")
            .header("x-ms-documentdb-query-enablecrosspartition", "True")
            .header("Content-Type", "application/query+json")
            .body(body.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::Status(response.status()));
        }

        #[derive(Deserialize)]
        struct QueryResponse {
            #[serde(rename = "Documents", default)]
            documents: Vec<StoredMessage>,
        }

        let parsed: QueryResponse = response.json().await?;
        Ok(parsed.documents)
    }
}

#[async_trait]
impl HistoryStore for CosmosStore {
    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn save(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        user_roles: Option<&[String]>,
        role: Role,
        content: &str,
    ) {
        if !self.enabled {
            debug!("Store not enabled, skipping message save");
            return;
        }

        let document = StoredMessage {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            role,
            content: content.to_string(),
            user_id: user_id.map(str::to_string),
            user_roles: user_roles.map(<[String]>::to_vec),
        };

        match self.create_document(&document).await {
            Ok(()) => debug!(
                "Saved {} message for session {} ({} chars)",
                role,
                session_id,
                content.len()
            ),
            Err(e) => warn!("Failed to save message to store: {}", e),
        }
    }

    async fn fetch_recent(&self, key: &HistoryKey, limit: usize) -> HistoryFetch {
        if !self.enabled {
            debug!("Store not enabled, returning empty context");
            return HistoryFetch::Disabled;
        }

        match self.query_recent(key, limit).await {
            Ok(mut messages) => {
                // Query is newest-first; flip to oldest-first for conversation flow.
                messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
                debug!("Retrieved {} messages from store for {}", messages.len(), key.value());
                HistoryFetch::Messages(messages)
            }
            Err(e) => {
                warn!("Failed to retrieve messages from store: {}", e);
                HistoryFetch::Failed
            }
        }
    }
}
