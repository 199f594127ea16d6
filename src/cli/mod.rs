pub mod commands;

use std::sync::Arc;

use uuid::Uuid;

use crate::chat::ChatEngine;
use crate::cli::commands::{Commands, SessionAction};
use crate::config::AppConfig;
use crate::llm::{AzureOpenAiClient, CompletionClient};
use crate::store::{CosmosStore, HistoryKey, HistoryStore};

pub async fn run_cli(command: Commands, config_path: String) {
    let config = AppConfig::load(&config_path).expect("Failed to load config");

    match command {
        Commands::Serve => {
            panic!("Serve command should be intercepted by main.rs to boot actix-web");
        }
        Commands::Session { action } => match action {
            SessionAction::New => {
                println!("{}", Uuid::new_v4());
            }
            SessionAction::History { id, limit } => {
                let store = CosmosStore::connect(&config.store).await;
                let messages = store
                    .fetch_recent(&HistoryKey::Session(id), limit)
                    .await
                    .into_messages();

                if messages.is_empty() {
                    println!("No messages found.");
                } else {
                    for m in messages {
                        println!("[{}] {}: {}", m.timestamp, m.role, m.content);
                    }
                }
            }
        },
        Commands::WarmUp => {
            let store: Arc<dyn HistoryStore> = Arc::new(CosmosStore::connect(&config.store).await);
            let client: Arc<dyn CompletionClient> =
                Arc::new(AzureOpenAiClient::new(config.completion.clone(), config.search.clone()));
            let engine = ChatEngine::new(store, client, config.chat.clone());

            if engine.warm_up().await {
                println!("Search index warmup completed successfully");
            } else {
                eprintln!("Search index warmup did not complete successfully");
                std::process::exit(1);
            }
        }
    }
}
