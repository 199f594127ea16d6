use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse, Result as WebResult};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::models::{
    ChatRequest, ChatResponse, HistoryMessage, HistoryQuery, MessageHistory, NewSessionResponse,
    SessionInfo, UserMessageHistory, WarmUpResponse,
};
use crate::chat::ChatEngine;
use crate::store::{HistoryKey, HistoryStore, Role, StoredMessage};

/// Message count sampled for the session info projection.
const INFO_COUNT_LIMIT: usize = 100;

#[get("/session/new")]
pub async fn create_session() -> WebResult<HttpResponse> {
    let session_id = Uuid::new_v4().to_string();
    Ok(HttpResponse::Ok().json(NewSessionResponse { session_id }))
}

#[post("/chat")]
pub async fn chat(
    store: web::Data<Arc<dyn HistoryStore>>,
    engine: web::Data<Arc<ChatEngine>>,
    req: web::Json<ChatRequest>,
) -> WebResult<HttpResponse> {
    let req = req.into_inner();

    // The user turn must be stored before the completion call begins, so a
    // concurrent turn on the same session can observe it in its context read.
    store
        .save(
            &req.session_id,
            req.user_id.as_deref(),
            req.user_roles.as_deref(),
            Role::User,
            &req.message,
        )
        .await;

    match engine.run_turn(&req.message, &req.session_id).await {
        Ok(response) => {
            let response = response.unwrap_or_default();
            store
                .save(&req.session_id, req.user_id.as_deref(), None, Role::Assistant, &response)
                .await;

            Ok(HttpResponse::Ok().json(ChatResponse {
                response,
                session_id: req.session_id,
            }))
        }
        Err(e) => {
            error!("Chat error: {}", e);
            let error_message = format!("Error: {}", e);
            store
                .save(&req.session_id, req.user_id.as_deref(), None, Role::Error, &error_message)
                .await;

            Ok(HttpResponse::InternalServerError()
                .json(serde_json::json!({ "detail": error_message })))
        }
    }
}

#[get("/session/{id}/info")]
pub async fn session_info(
    store: web::Data<Arc<dyn HistoryStore>>,
    id: web::Path<String>,
) -> WebResult<HttpResponse> {
    let session_id = id.into_inner();

    let message_count = store
        .fetch_recent(&HistoryKey::Session(session_id.clone()), INFO_COUNT_LIMIT)
        .await
        .into_messages()
        .len();

    Ok(HttpResponse::Ok().json(SessionInfo {
        session_id,
        store_enabled: store.enabled(),
        message_count,
    }))
}

#[get("/session/{id}/history")]
pub async fn session_history(
    store: web::Data<Arc<dyn HistoryStore>>,
    id: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> WebResult<HttpResponse> {
    let session_id = id.into_inner();

    let messages = store
        .fetch_recent(&HistoryKey::Session(session_id.clone()), query.limit)
        .await
        .into_messages();

    Ok(HttpResponse::Ok().json(MessageHistory {
        messages: messages.into_iter().map(to_history_message).collect(),
        session_id,
    }))
}

#[get("/user/{id}/history")]
pub async fn user_history(
    store: web::Data<Arc<dyn HistoryStore>>,
    id: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> WebResult<HttpResponse> {
    let user_id = id.into_inner();

    let messages = store
        .fetch_recent(&HistoryKey::User(user_id.clone()), query.limit)
        .await
        .into_messages();

    Ok(HttpResponse::Ok().json(UserMessageHistory {
        messages: messages.into_iter().map(to_history_message).collect(),
        user_id,
    }))
}

#[post("/session/{id}/clear")]
pub async fn clear_session(id: web::Path<String>) -> WebResult<HttpResponse> {
    // Stored messages are immutable; clearing only acknowledges, nothing is deleted.
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Session {} history cleared", id),
        "success": true,
    })))
}

#[post("/warm-up")]
pub async fn warm_up(engine: web::Data<Arc<ChatEngine>>) -> WebResult<HttpResponse> {
    if engine.warm_up().await {
        info!("Search index warmup completed successfully");
        Ok(HttpResponse::Ok().json(WarmUpResponse {
            message: "Search index warmup completed successfully".to_string(),
            success: true,
        }))
    } else {
        warn!("Search index warmup did not complete successfully");
        Ok(HttpResponse::Ok().json(WarmUpResponse {
            message: "Search index warmup did not complete successfully".to_string(),
            success: false,
        }))
    }
}

fn to_history_message(message: StoredMessage) -> HistoryMessage {
    HistoryMessage {
        role: message.role,
        content: message.content,
        timestamp: message.timestamp,
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_session)
        .service(chat)
        .service(session_info)
        .service(session_history)
        .service(user_history)
        .service(clear_session)
        .service(warm_up);
}
