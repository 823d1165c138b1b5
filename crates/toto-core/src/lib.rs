//! Toto Live core library
//!
//! Shared functionality for the Toto Live service:
//! - XP leveling and leaderboard ranking
//! - Input validation and video embed resolution
//! - Bengali labels and audit messages
//! - Configuration resolution, database helpers, tracing setup
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod leaderboard;
pub mod leveling;
pub mod locale;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod model;
pub mod tracing_init;
pub mod validate;
pub mod video;

pub use config::Config;
pub use error::{Error, Result};
pub use leveling::{LevelProgress, level_for};
pub use model::{ActivityKind, Audience, MatchCategory, MatchStatus};
