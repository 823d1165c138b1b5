//! Configuration resolution for Toto.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/toto/settings.json) or an explicit file
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binary)
//!
//! Branding and pricing are admin-editable data, not configuration; they
//! live in the settings record of the database.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete Toto service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP listener and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub log_json: bool,
    /// Origins allowed by CORS. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: None,
            log_json: false,
            allowed_origins: Vec::new(),
        }
    }
}

/// Presence leases and the background sweeps that maintain them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// How long a join or heartbeat keeps a viewer present without a stream.
    pub lease_secs: u64,
    /// Interval of the expired-lease sweep.
    pub sweep_interval_secs: u64,
    /// Interval of the watcher-counter reconciliation. 0 disables it.
    pub reconcile_interval_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            lease_secs: 45,
            sweep_interval_secs: 15,
            reconcile_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of most recent messages returned as history.
    pub history_limit: u32,
    /// XP granted for each message sent.
    pub xp_per_message: i64,
    /// Capacity of each per-match broadcast channel.
    pub channel_capacity: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            xp_per_message: 5,
            channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Size of the top-XP slice fetched for ranking.
    pub limit: u32,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self { limit: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: 3600,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// `explicit` replaces the global config file when given; unlike the global
/// file it must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => load_config_file(path)?,
        None => match global_config_path() {
            Some(global) if global.exists() => load_config_file(&global)?,
            _ => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("toto").join("settings.json"))
}

/// Default location of the service database.
pub fn database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("toto").join("toto.db"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = lookup("TOTO_ADDR") {
        config.server.addr = parse_env("TOTO_ADDR", &val)?;
    }
    if let Some(val) = lookup("TOTO_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("TOTO_LOG_JSON") {
        config.server.log_json = matches!(val.as_str(), "1" | "true" | "yes");
    }
    if let Some(val) = lookup("TOTO_ALLOWED_ORIGINS") {
        config.server.allowed_origins = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(val) = lookup("TOTO_PRESENCE_LEASE_SECS") {
        config.presence.lease_secs = parse_env("TOTO_PRESENCE_LEASE_SECS", &val)?;
    }
    if let Some(val) = lookup("TOTO_RECONCILE_INTERVAL_SECS") {
        config.presence.reconcile_interval_secs =
            parse_env("TOTO_RECONCILE_INTERVAL_SECS", &val)?;
    }
    if let Some(val) = lookup("TOTO_CHAT_HISTORY_LIMIT") {
        config.chat.history_limit = parse_env("TOTO_CHAT_HISTORY_LIMIT", &val)?;
    }
    if let Some(val) = lookup("TOTO_LEADERBOARD_LIMIT") {
        config.leaderboard.limit = parse_env("TOTO_LEADERBOARD_LIMIT", &val)?;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> Result<T> {
    val.parse()
        .map_err(|_| Error::Config(format!("Invalid value for {key}: {val:?}")))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_limits() {
        let config = Config::default();
        assert_eq!(config.chat.history_limit, 50);
        assert_eq!(config.chat.xp_per_message, 5);
        assert_eq!(config.leaderboard.limit, 100);
        assert_eq!(config.presence.lease_secs, 45);
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "server": { "addr": "127.0.0.1:9000", "log_json": true },
                 "chat": { "history_limit": 20 } }"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.server.addr.port(), 9000);
        assert!(config.server.log_json);
        assert_eq!(config.chat.history_limit, 20);
        assert_eq!(config.chat.xp_per_message, 5);
        // Sections absent from the file fall back to defaults.
        assert_eq!(config.leaderboard.limit, 100);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("TOTO_ADDR", "127.0.0.1:7000"),
            ("TOTO_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("TOTO_LEADERBOARD_LIMIT", "25"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| (*v).to_string())).unwrap();

        assert_eq!(config.server.addr.port(), 7000);
        assert_eq!(config.server.allowed_origins.len(), 2);
        assert_eq!(config.leaderboard.limit, 25);
    }

    #[test]
    fn bad_env_value_is_rejected() {
        let mut config = Config::default();
        let err = apply_env_overrides(&mut config, |k| {
            (k == "TOTO_PRESENCE_LEASE_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("TOTO_PRESENCE_LEASE_SECS"));
    }
}
