#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use actix_web::{test, web, App};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use docuchat::api::routes;
    use docuchat::chat::ChatEngine;
    use docuchat::config::ChatConfig;
    use docuchat::llm::models::{CompletionResponse, PromptMessage};
    use docuchat::llm::{CompletionClient, CompletionError};
    use docuchat::store::{
        CosmosStore, HistoryFetch, HistoryKey, HistoryStore, Role, StoredMessage,
    };

    const ANSWER: &str = "This report describes the migration timeline, the staffing plan, \
and the rollout milestones for the coming quarter.";

    /// In-memory history store for exercising the full request flow.
    struct MemoryStore {
        messages: Mutex<Vec<StoredMessage>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
            }
        }

        fn seed(&self, message: StoredMessage) {
            self.messages.lock().unwrap().push(message);
        }

        fn snapshot(&self) -> Vec<StoredMessage> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HistoryStore for MemoryStore {
        fn enabled(&self) -> bool {
            true
        }

        async fn save(
            &self,
            session_id: &str,
            user_id: Option<&str>,
            user_roles: Option<&[String]>,
            role: Role,
            content: &str,
        ) {
            self.seed(StoredMessage {
                id: Uuid::new_v4(),
                session_id: session_id.to_string(),
                timestamp: Utc::now(),
                role,
                content: content.to_string(),
                user_id: user_id.map(str::to_string),
                user_roles: user_roles.map(<[String]>::to_vec),
            });
        }

        async fn fetch_recent(&self, key: &HistoryKey, limit: usize) -> HistoryFetch {
            let messages = self.messages.lock().unwrap();
            let mut matching: Vec<StoredMessage> = messages
                .iter()
                .filter(|m| match key {
                    HistoryKey::Session(id) => m.session_id == *id,
                    HistoryKey::User(id) => m.user_id.as_deref() == Some(id.as_str()),
                })
                .cloned()
                .collect();

            matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            matching.truncate(limit);
            matching.reverse();
            HistoryFetch::Messages(matching)
        }
    }

    struct StaticClient;

    #[async_trait]
    impl CompletionClient for StaticClient {
        fn name(&self) -> &str {
            "static"
        }

        async fn complete(
            &self,
            _messages: &[PromptMessage],
        ) -> Result<CompletionResponse, CompletionError> {
            Ok(CompletionResponse {
                content: ANSWER.to_string(),
                model: "static".to_string(),
                usage: None,
            })
        }
    }

    struct FailingClient;

    #[async_trait]
    impl CompletionClient for FailingClient {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(
            &self,
            _messages: &[PromptMessage],
        ) -> Result<CompletionResponse, CompletionError> {
            Err(CompletionError::Api("service unavailable".to_string()))
        }
    }

    fn fast_chat_config() -> ChatConfig {
        ChatConfig {
            max_retries: 1,
            retry_delay_secs: 0,
            context_messages: 5,
        }
    }

    macro_rules! init_app {
        ($store:expr, $client:expr) => {{
            let store: Arc<dyn HistoryStore> = $store;
            let client: Arc<dyn CompletionClient> = $client;
            let engine = Arc::new(ChatEngine::new(store.clone(), client, fast_chat_config()));
            test::init_service(
                App::new()
                    .app_data(web::Data::new(store))
                    .app_data(web::Data::new(engine))
                    .configure(routes::configure),
            )
            .await
        }};
    }

    fn stored(session_id: &str, role: Role, content: &str, age_secs: i64) -> StoredMessage {
        StoredMessage {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            timestamp: Utc::now() - Duration::seconds(age_secs),
            role,
            content: content.to_string(),
            user_id: None,
            user_roles: None,
        }
    }

    #[actix_web::test]
    async fn create_session_returns_a_fresh_id() {
        let app = init_app!(Arc::new(MemoryStore::new()), Arc::new(StaticClient));

        let resp = test::call_service(&app, test::TestRequest::get().uri("/session/new").to_request()).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        let session_id = body["session_id"].as_str().unwrap();
        assert!(Uuid::parse_str(session_id).is_ok());
    }

    #[actix_web::test]
    async fn chat_turn_round_trip() {
        let memory = Arc::new(MemoryStore::new());
        let app = init_app!(memory.clone(), Arc::new(StaticClient));

        let resp = test::call_service(&app, test::TestRequest::get().uri("/session/new").to_request()).await;
        let body: serde_json::Value = test::read_body_json(resp).await;
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/chat")
                .set_json(serde_json::json!({ "message": "Hello", "session_id": session_id }))
                .to_request(),
        )
        .await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(!body["response"].as_str().unwrap().is_empty());
        assert_eq!(body["session_id"].as_str().unwrap(), session_id);

        // Both sides of the turn landed in the store under the same session.
        let messages = memory.snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(messages[1].role, Role::Assistant);
        assert!(messages.iter().all(|m| m.session_id == session_id));
    }

    #[actix_web::test]
    async fn fatal_turn_stores_an_error_message() {
        let memory = Arc::new(MemoryStore::new());
        let app = init_app!(memory.clone(), Arc::new(FailingClient));

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/chat")
                .set_json(serde_json::json!({ "message": "Hello", "session_id": "s-err" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["detail"].as_str().unwrap().starts_with("Error:"));

        let messages = memory.snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Error);
        assert!(messages[1].content.starts_with("Error:"));
    }

    #[actix_web::test]
    async fn history_is_empty_for_unknown_sessions_and_disabled_stores() {
        let app = init_app!(Arc::new(CosmosStore::disabled()), Arc::new(StaticClient));

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/session/s-none/history").to_request(),
        )
        .await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 0);

        let app = init_app!(Arc::new(MemoryStore::new()), Arc::new(StaticClient));
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/session/s-none/history").to_request(),
        )
        .await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 0);
    }

    #[actix_web::test]
    async fn history_returns_recent_messages_oldest_first() {
        let memory = Arc::new(MemoryStore::new());
        memory.seed(stored("s-h", Role::User, "first question", 30));
        memory.seed(stored("s-h", Role::Assistant, "first answer", 20));
        memory.seed(stored("s-h", Role::User, "second question", 10));
        memory.seed(stored("s-other", Role::User, "unrelated", 5));

        let app = init_app!(memory.clone(), Arc::new(StaticClient));

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/session/s-h/history?limit=2").to_request(),
        )
        .await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["session_id"], "s-h");

        // The two most recent, re-sorted oldest first.
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["content"], "first answer");
        assert_eq!(messages[1]["content"], "second question");
    }

    #[actix_web::test]
    async fn user_history_is_keyed_by_user_id() {
        let memory = Arc::new(MemoryStore::new());
        memory.seed(StoredMessage {
            user_id: Some("u-1".to_string()),
            ..stored("s-a", Role::User, "from session a", 10)
        });
        memory.seed(StoredMessage {
            user_id: Some("u-1".to_string()),
            ..stored("s-b", Role::User, "from session b", 5)
        });
        memory.seed(stored("s-a", Role::Assistant, "no user id", 1));

        let app = init_app!(memory.clone(), Arc::new(StaticClient));

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/user/u-1/history").to_request(),
        )
        .await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["user_id"], "u-1");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn session_info_reports_count_and_store_state() {
        let memory = Arc::new(MemoryStore::new());
        memory.seed(stored("s-i", Role::User, "q", 10));
        memory.seed(stored("s-i", Role::Assistant, "a", 5));

        let app = init_app!(memory.clone(), Arc::new(StaticClient));

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/session/s-i/info").to_request(),
        )
        .await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["session_id"], "s-i");
        assert_eq!(body["store_enabled"], true);
        assert_eq!(body["message_count"], 2);
    }

    #[actix_web::test]
    async fn warm_up_reports_success_and_failure_without_erroring() {
        let app = init_app!(Arc::new(MemoryStore::new()), Arc::new(StaticClient));
        let resp = test::call_service(&app, test::TestRequest::post().uri("/warm-up").to_request()).await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);

        let app = init_app!(Arc::new(MemoryStore::new()), Arc::new(FailingClient));
        let resp = test::call_service(&app, test::TestRequest::post().uri("/warm-up").to_request()).await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn clear_session_acknowledges_without_deleting() {
        let memory = Arc::new(MemoryStore::new());
        memory.seed(stored("s-c", Role::User, "keep me", 10));

        let app = init_app!(memory.clone(), Arc::new(StaticClient));

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/session/s-c/clear").to_request(),
        )
        .await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(memory.snapshot().len(), 1);
    }
}
