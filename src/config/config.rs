use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma-separated list of allowed CORS origins. Empty means wildcard.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// `AccountEndpoint=...;AccountKey=...;` credentials for the document store.
    #[serde(default = "default_store_connection_string")]
    pub connection_string: String,
    #[serde(default = "default_store_database")]
    pub database: String,
    #[serde(default = "default_store_container")]
    pub container: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_deployment")]
    pub deployment: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_completion_api_key")]
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_key")]
    pub key: String,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default = "default_semantic_configuration")]
    pub semantic_configuration: String,
    #[serde(default = "default_embedding_endpoint")]
    pub embedding_endpoint: String,
    #[serde(default = "default_query_type")]
    pub query_type: String,
    #[serde(default = "default_strictness")]
    pub strictness: u8,
    #[serde(default = "default_top_n_documents")]
    pub top_n_documents: u8,
    #[serde(default = "default_in_scope")]
    pub in_scope: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Attempt budget for one chat turn, quality and transport retries included.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// How many recent stored messages seed the completion prompt.
    #[serde(default = "default_context_messages")]
    pub context_messages: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("DOCUCHAT").separator("__"))
            .build()?;

        let mut app_config: AppConfig = settings.try_deserialize()?;

        // Expand environment variables if present like ${AZURE_OPENAI_API_KEY}
        app_config.store.connection_string = expand_env(&app_config.store.connection_string);
        app_config.completion.endpoint = expand_env(&app_config.completion.endpoint);
        app_config.completion.api_key = expand_env(&app_config.completion.api_key);
        app_config.search.endpoint = expand_env(&app_config.search.endpoint);
        app_config.search.key = expand_env(&app_config.search.key);
        app_config.search.embedding_endpoint = expand_env(&app_config.search.embedding_endpoint);

        Ok(app_config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connection_string: default_store_connection_string(),
            database: default_store_database(),
            container: default_store_container(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            deployment: default_deployment(),
            api_version: default_api_version(),
            api_key: default_completion_api_key(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            key: default_search_key(),
            index_name: default_index_name(),
            semantic_configuration: default_semantic_configuration(),
            embedding_endpoint: default_embedding_endpoint(),
            query_type: default_query_type(),
            strictness: default_strictness(),
            top_n_documents: default_top_n_documents(),
            in_scope: default_in_scope(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            context_messages: default_context_messages(),
        }
    }
}

fn expand_env(val: &str) -> String {
    if val.starts_with("${") && val.ends_with('}') {
        let var_name = &val[2..val.len() - 1];
        std::env::var(var_name).unwrap_or_else(|_| "".to_string())
    } else {
        val.to_string()
    }
}

fn env_or(name: &str, fallback: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| fallback.to_string())
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> String {
    env_or("ALLOWED_ORIGINS", "")
}

fn default_store_connection_string() -> String {
    env_or("COSMOS_CONNECTION_STRING", "")
}

fn default_store_database() -> String {
    env_or("COSMOS_DB_NAME", "chatdb")
}

fn default_store_container() -> String {
    env_or("COSMOS_CONTAINER_NAME", "messages")
}

fn default_completion_endpoint() -> String {
    env_or("ENDPOINT_URL", "")
}

fn default_deployment() -> String {
    env_or("DEPLOYMENT_NAME", "")
}

fn default_api_version() -> String {
    env_or("API_VERSION", "2024-02-01")
}

fn default_completion_api_key() -> String {
    env_or("AZURE_OPENAI_API_KEY", "")
}

fn default_search_endpoint() -> String {
    env_or("SEARCH_ENDPOINT", "")
}

fn default_search_key() -> String {
    env_or("SEARCH_KEY", "")
}

fn default_index_name() -> String {
    env_or("INDEX_NAME", "")
}

fn default_semantic_configuration() -> String {
    env_or("SEMANTIC_CONFIGURATION", "pr1semantic")
}

fn default_embedding_endpoint() -> String {
    env_or("EMBEDDING_ENDPOINT", "")
}

fn default_query_type() -> String {
    "semantic".to_string()
}

fn default_strictness() -> u8 {
    1
}

fn default_top_n_documents() -> u8 {
    15
}

fn default_in_scope() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_context_messages() -> usize {
    5
}
