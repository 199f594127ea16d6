use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use chrono::Utc;
use clap::Parser;
use docuchat::chat::ChatEngine;
use docuchat::cli::{
    commands::{Cli, Commands},
    run_cli,
};
use docuchat::config::AppConfig;
use docuchat::llm::{AzureOpenAiClient, CompletionClient};
use docuchat::store::{CosmosStore, HistoryStore};
use tracing::{error, info};

async fn index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "message": "Document Assistant API is running" }))
}

async fn health(store: web::Data<Arc<dyn HistoryStore>>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "store_enabled": store.enabled(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn build_cors(allowed_origins: &str) -> Cors {
    let origins: Vec<&str> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if origins.is_empty() {
        // Wildcard, suitable for development; set ALLOWED_ORIGINS in production.
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        let mut cors = Cors::default()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
        cors
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Serve) {
        run_cli(cli.command, cli.config).await;
        return Ok(());
    }

    info!("Starting Document Assistant API...");

    let config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn HistoryStore> = Arc::new(CosmosStore::connect(&config.store).await);
    let client: Arc<dyn CompletionClient> =
        Arc::new(AzureOpenAiClient::new(config.completion.clone(), config.search.clone()));
    let engine = Arc::new(ChatEngine::new(store.clone(), client, config.chat.clone()));

    let host = config.server.host.clone();
    let port = config.server.port;

    info!("Server listening on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(engine.clone()))
            .wrap(build_cors(&config.server.allowed_origins))
            .route("/", web::get().to(index))
            .route("/health", web::get().to(health))
            .configure(docuchat::api::routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
