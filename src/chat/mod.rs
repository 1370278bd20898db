//! Hospital assistant chatbot backed by a local LLM.
//!
//! Each reply persists both sides of the exchange under the caller's
//! session so `history` can replay a conversation in order.

pub mod ollama;

pub use ollama::{LlmClient, LlmError, MockLlmClient, OllamaClient};

use std::sync::Arc;

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::db::{self, ChatMessageRecord, DatabaseError, MessageType};

/// Longest accepted user message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;

pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant for a hospital management system.
You can help with:
- General health information
- Hospital services
- Appointment scheduling guidance
- Medical terminology explanations
- Health tips and advice

Please provide helpful, accurate, and professional responses.
Keep responses concise but informative.";

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Message exceeds {max} characters")]
    MessageTooLong { max: usize },

    #[error("Failed to generate response: {0}")]
    Llm(#[from] LlmError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Bot answer plus the ids of the two persisted messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
    pub user_message_id: i64,
    pub bot_message_id: i64,
}

/// Session id supplied by the client, or a fresh UUID when absent or blank.
pub fn resolve_session_id(session_id: Option<&str>) -> String {
    match session_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}

pub fn validate_message(message: &str) -> Result<&str, ChatError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatError::MessageTooLong {
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(trimmed)
}

#[derive(Clone)]
pub struct ChatService {
    client: Arc<dyn LlmClient + Send + Sync>,
    model: String,
}

impl ChatService {
    pub fn new(client: Arc<dyn LlmClient + Send + Sync>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the configured model is pulled on the backend.
    pub fn is_available(&self) -> Result<bool, LlmError> {
        self.client.is_model_available(&self.model)
    }

    /// Generate a reply and persist the exchange. Nothing is stored when
    /// validation or generation fails. Blocks on the LLM call.
    pub fn reply(
        &self,
        conn: &Connection,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatReply, ChatError> {
        let message = validate_message(message)?;
        let session_id = resolve_session_id(session_id);

        let response = self.client.generate(&self.model, message, SYSTEM_PROMPT)?;
        tracing::debug!(
            session_id = %session_id,
            chars = response.chars().count(),
            "Chatbot response generated"
        );

        // Both sides of the exchange are stored together or not at all.
        let tx = conn
            .unchecked_transaction()
            .map_err(DatabaseError::from)?;
        let user = db::insert_chat_message(&tx, MessageType::User, message, Some(&session_id))?;
        let bot = db::insert_chat_message(&tx, MessageType::Bot, &response, Some(&session_id))?;
        tx.commit().map_err(DatabaseError::from)?;

        Ok(ChatReply {
            response,
            session_id,
            user_message_id: user.id,
            bot_message_id: bot.id,
        })
    }

    pub fn history(
        &self,
        conn: &Connection,
        session_id: &str,
    ) -> Result<Vec<ChatMessageRecord>, ChatError> {
        Ok(db::get_chat_history(conn, session_id)?)
    }
}
