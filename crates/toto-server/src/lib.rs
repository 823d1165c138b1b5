//! Toto Live server library.
//!
//! - SQLite storage for viewers, matches, chat, and the admin audit trail
//! - JWT authentication and password hashing for admin accounts
//! - In-memory presence registry and per-match chat fan-out
//! - axum HTTP surface for viewers and admins

pub mod api;
pub mod auth;
pub mod chat;
pub mod presence;
pub mod storage;
pub mod telemetry;
