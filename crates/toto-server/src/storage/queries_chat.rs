//! Chat message queries.

use toto_core::db::unix_millis;

use super::db::{Database, DatabaseError};
use super::models::ChatMessage;

/// A chat line as it is appended. Sender fields come from the stored user.
pub struct NewChatMessage<'a> {
    pub match_id: &'a str,
    pub user_id: &'a str,
    pub name: &'a str,
    pub avatar: &'a str,
    pub text: &'a str,
    pub premium: bool,
}

impl Database {
    // =========================================================================
    // Chat queries
    // =========================================================================

    /// Append a message and return it with its generated id and timestamp.
    pub async fn append_chat(&self, msg: &NewChatMessage<'_>) -> Result<ChatMessage, DatabaseError> {
        let now = unix_millis();

        let result = sqlx::query(
            "INSERT INTO chat_messages (match_id, user_id, name, avatar, text, premium, timestamp) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(msg.match_id)
        .bind(msg.user_id)
        .bind(msg.name)
        .bind(msg.avatar)
        .bind(msg.text)
        .bind(msg.premium)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(ChatMessage {
            id: result.last_insert_rowid(),
            match_id: msg.match_id.to_string(),
            user_id: msg.user_id.to_string(),
            name: msg.name.to_string(),
            avatar: msg.avatar.to_string(),
            text: msg.text.to_string(),
            premium: msg.premium,
            timestamp: now,
        })
    }

    /// The most recent `limit` messages of a match, in chronological order.
    pub async fn recent_chat(&self, match_id: &str, limit: u32) -> Result<Vec<ChatMessage>, DatabaseError> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(
            "SELECT * FROM chat_messages WHERE match_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(match_id)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;

        messages.reverse();
        Ok(messages)
    }

    pub async fn count_chat(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages")
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }
}
