pub mod api;
pub mod chat;
pub mod config;
pub mod core_state;
pub mod db;
pub mod inference;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::chat::{ChatService, OllamaClient};
use crate::config::AppConfig;
use crate::core_state::CoreState;
use crate::inference::InferenceEngine;

/// Start the server and block until Ctrl-C.
pub fn run() -> Result<(), String> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    let core = Arc::new(build_core(&config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;

    let result = runtime.block_on(serve(core.clone(), &config));

    // The blocking HTTP client inside `core` must be dropped outside the runtime.
    drop(runtime);
    drop(core);
    result
}

fn build_core(config: &AppConfig) -> Result<CoreState, String> {
    let engine = InferenceEngine::load_lenient(&config.models_dir);

    // Fail fast on an unwritable database path.
    db::open_database(&config.db_path)
        .map_err(|e| format!("Cannot open database {}: {e}", config.db_path.display()))?;

    let client = OllamaClient::new(&config.ollama_url, config::LLM_TIMEOUT_SECS)
        .map_err(|e| e.to_string())?;
    let chat = ChatService::new(Arc::new(client), config.chat_model.clone());
    match chat.is_available() {
        Ok(true) => tracing::info!(model = chat.model(), "Chatbot model available"),
        Ok(false) => tracing::warn!(
            model = chat.model(),
            "Chatbot model not pulled; chat requests will fail until it is"
        ),
        Err(e) => tracing::warn!(error = %e, "Chatbot backend unreachable"),
    }

    Ok(CoreState::new(engine, chat, config.db_path.clone()))
}

async fn serve(core: Arc<CoreState>, config: &AppConfig) -> Result<(), String> {
    let server = api::start_api_server(core, config.bind_addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
            tracing::info!("Ctrl-C received");
        })
        .await;
    Ok(())
}
