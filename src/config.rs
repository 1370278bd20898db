use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Medinfer";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_CHAT_MODEL: &str = "llama3.2";
/// Seconds before a chatbot generation request is abandoned.
pub const LLM_TIMEOUT_SECS: u64 = 120;

/// Get the application data directory: ~/Medinfer/, or ./Medinfer when
/// no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Directory holding the exported model bundles.
pub fn default_models_dir() -> PathBuf {
    app_data_dir().join("models")
}

/// SQLite file for prediction history, treatment cache and chat messages.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("medinfer.db")
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "medinfer_lib=debug,tower_http=debug,info"
    } else {
        "medinfer_lib=info,warn"
    }
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub models_dir: PathBuf,
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub ollama_url: String,
    pub chat_model: String,
}

impl AppConfig {
    /// Read `MEDINFER_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("MEDINFER_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse()
            .map_err(|e| format!("MEDINFER_BIND_ADDR '{bind_raw}' is not a socket address: {e}"))?;

        Ok(Self {
            models_dir: get("MEDINFER_MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_models_dir),
            db_path: get("MEDINFER_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            bind_addr,
            ollama_url: get("MEDINFER_OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            chat_model: get("MEDINFER_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
        })
    }
}
