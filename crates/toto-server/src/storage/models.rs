//! Data models for Toto Live storage.

use serde::{Deserialize, Serialize};
use toto_core::{ActivityKind, Audience, MatchCategory, MatchStatus};

/// A viewer. Ids are minted client-side (`user_<millis>_<suffix>`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub profile_pic: String,
    pub xp: i64,
    pub premium: bool,
    pub premium_since: Option<i64>,
    pub telegram_id: String,
    pub total_watched: i64,
    pub total_chats: i64,
    pub last_seen: i64,
    pub created_at: i64,
    #[serde(skip)]
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub video_url: String,
    pub category: MatchCategory,
    pub status: MatchStatus,
    pub premium_only: bool,
    pub watching: i64,
    pub created_at: i64,
    pub created_by: String,
    pub updated_at: i64,
    #[serde(skip)]
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub match_id: String,
    pub user_id: String,
    pub name: String,
    pub avatar: String,
    pub text: String,
    pub premium: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: String,
    pub actor: String,
    pub ip: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub target: Audience,
    pub sent_by: String,
    pub status: String,
    pub timestamp: i64,
}

/// Admin-editable branding and pricing. Always exactly one row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub logo_url: String,
    pub site_title: String,
    pub telegram_bot: String,
    pub premium_price: i64,
    pub default_xp: i64,
    pub welcome_message: String,
    pub updated_at: i64,
    pub updated_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub admin: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Token {
    pub id: String,
    pub account_id: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub revoked: i64,
    pub created_at: i64,
}
