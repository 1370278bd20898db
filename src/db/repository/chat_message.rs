use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{now_timestamp, DatabaseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    User,
    Bot,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

impl FromStr for MessageType {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "bot" => Ok(Self::Bot),
            _ => Err(DatabaseError::InvalidEnum {
                field: "message_type".into(),
                value: s.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessageRecord {
    pub id: i64,
    pub message_type: MessageType,
    pub content: String,
    pub timestamp: String,
    pub session_id: Option<String>,
}

pub fn insert_chat_message(
    conn: &Connection,
    message_type: MessageType,
    content: &str,
    session_id: Option<&str>,
) -> Result<ChatMessageRecord, DatabaseError> {
    let timestamp = now_timestamp();
    conn.execute(
        "INSERT INTO chat_messages (message_type, content, timestamp, session_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![message_type.as_str(), content, timestamp, session_id],
    )?;

    Ok(ChatMessageRecord {
        id: conn.last_insert_rowid(),
        message_type,
        content: content.to_string(),
        timestamp,
        session_id: session_id.map(str::to_string),
    })
}

/// Messages of one session, oldest first.
pub fn get_chat_history(
    conn: &Connection,
    session_id: &str,
) -> Result<Vec<ChatMessageRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, message_type, content, timestamp, session_id
         FROM chat_messages WHERE session_id = ?1 ORDER BY timestamp ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![session_id], read_row)?;

    let mut messages = Vec::new();
    for row in rows {
        let (kind, id, content, timestamp, session_id) = row?;
        messages.push(ChatMessageRecord {
            id,
            message_type: MessageType::from_str(&kind)?,
            content,
            timestamp,
            session_id,
        });
    }
    Ok(messages)
}

type RawRow = (String, i64, String, String, Option<String>);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(1)?, row.get(0)?, row.get(2)?, row.get(3)?, row.get(4)?))
}
