//! Chatbot endpoints.
//!
//! - `POST /api/chatbot/chat`: generate a reply and store the exchange
//! - `GET /api/chatbot/history?session_id=`: messages of one session

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::chat::{validate_message, ChatReply};
use crate::db::ChatMessageRecord;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
}

/// `POST /api/chatbot/chat`
pub async fn chat(
    State(ctx): State<ApiContext>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    // Reject bad input before occupying a blocking thread.
    validate_message(&request.message)?;

    let core = ctx.core.clone();
    let reply = tokio::task::spawn_blocking(move || -> Result<ChatReply, ApiError> {
        let conn = core.open_db()?;
        Ok(core
            .chat()
            .reply(&conn, &request.message, request.session_id.as_deref())?)
    })
    .await??;

    Ok(Json(reply))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub session_id: Option<String>,
}

/// `GET /api/chatbot/history?session_id=`
pub async fn history(
    State(ctx): State<ApiContext>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatMessageRecord>>, ApiError> {
    let session_id = query
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("session_id is required".into()))?;

    let conn = ctx.core.open_db()?;
    Ok(Json(ctx.core.chat().history(&conn, session_id)?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::endpoints::test_support::{get, post_json, TestApp};
    use crate::chat::{LlmError, MockLlmClient};

    #[tokio::test]
    async fn chat_replies_and_history_replays() {
        let app = TestApp::loaded();
        let (status, reply) = post_json(
            &app.router(),
            "/api/chatbot/chat",
            r#"{"message": "What are visiting hours?", "session_id": "s-1"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["response"], "Mock reply");
        assert_eq!(reply["session_id"], "s-1");

        let (status, history) = get(&app.router(), "/api/chatbot/history?session_id=s-1").await;
        assert_eq!(status, StatusCode::OK);
        let messages = history.as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["message_type"], "user");
        assert_eq!(messages[0]["content"], "What are visiting hours?");
        assert_eq!(messages[1]["message_type"], "bot");
        assert_eq!(messages[1]["id"], reply["bot_message_id"]);
    }

    #[tokio::test]
    async fn chat_works_without_models() {
        let app = TestApp::unavailable();
        let (status, _) = post_json(&app.router(), "/api/chatbot/chat", r#"{"message": "hi"}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_message_is_400() {
        let app = TestApp::loaded();
        let (status, _) = post_json(&app.router(), "/api/chatbot/chat", r#"{"message": ""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn backend_down_is_502() {
        let app = TestApp::with_llm(
            true,
            MockLlmClient::failing(LlmError::OllamaConnection("http://localhost:11434".into())),
        );
        let (status, json) = post_json(&app.router(), "/api/chatbot/chat", r#"{"message": "hi"}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"]["code"], "LLM_UNAVAILABLE");
    }

    #[tokio::test]
    async fn history_requires_session_id() {
        let app = TestApp::loaded();
        let (status, _) = get(&app.router(), "/api/chatbot/history").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get(&app.router(), "/api/chatbot/history?session_id=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
