//! Transport-agnostic application state.
//!
//! `CoreState` is built once at startup, wrapped in `Arc` and handed to
//! the HTTP layer. The inference engine inside it is read-only, so no
//! locking is needed on the request path.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::chat::ChatService;
use crate::db::{self, DatabaseError};
use crate::inference::InferenceEngine;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

pub struct CoreState {
    engine: Arc<InferenceEngine>,
    chat: ChatService,
    /// SQLite file opened per request.
    pub db_path: PathBuf,
}

impl CoreState {
    pub fn new(engine: InferenceEngine, chat: ChatService, db_path: PathBuf) -> Self {
        Self {
            engine: Arc::new(engine),
            chat,
            db_path,
        }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    /// Open a database connection (runs pending migrations).
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        Ok(db::open_database(&self.db_path)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chat::MockLlmClient;

    /// State over a fixture engine, a temp DB and a mock LLM. Keep the
    /// returned tempdir alive for the duration of the test.
    pub(crate) fn test_core(
        engine: InferenceEngine,
        llm: MockLlmClient,
    ) -> (Arc<CoreState>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let chat = ChatService::new(Arc::new(llm), "llama3.2");
        let core = CoreState::new(engine, chat, tmp.path().join("medinfer.db"));
        (Arc::new(core), tmp)
    }

    #[test]
    fn open_db_creates_schema() {
        let (core, _tmp) = test_core(
            InferenceEngine::unavailable("/models"),
            MockLlmClient::new("ok"),
        );
        let conn = core.open_db().unwrap();
        assert_eq!(db::count_tables(&conn).unwrap(), 5);
        assert!(!core.engine().is_fully_loaded());
        assert_eq!(core.chat().model(), "llama3.2");
    }
}
