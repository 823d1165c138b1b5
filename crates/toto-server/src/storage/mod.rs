//! SQLite storage for the Toto Live server.
//!
//! Provides persistence for viewers, matches, chat, broadcasts, settings,
//! the admin activity log, and admin accounts with their refresh tokens.

mod counter;
mod db;
mod models;
mod queries;
mod queries_admin;
mod queries_auth;
mod queries_chat;


pub use counter::{Counter, MAX_COUNTER_RETRIES};
pub use db::{Database, DatabaseError};
pub use models::*;
pub use queries::{MatchParams, NewUser, ProfileUpdate, UserQuery};
pub use queries_admin::{DailyCount, DashboardStats, NewBroadcast, Period, SettingsUpdate};
pub use queries_chat::NewChatMessage;
