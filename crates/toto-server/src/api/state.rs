//! Shared application state handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use toto_core::Config;

use crate::auth::JwtManager;
use crate::chat::ChatHub;
use crate::presence::PresenceRegistry;
use crate::storage::Database;
use crate::telemetry::Meters;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub presence: PresenceRegistry,
    pub chat: ChatHub,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<Config>,
    pub meters: Meters,
}

impl AppState {
    pub fn new(db: Database, jwt: Arc<JwtManager>, config: Config) -> Self {
        let presence = PresenceRegistry::new(Duration::from_secs(config.presence.lease_secs));
        let chat = ChatHub::new(config.chat.channel_capacity);
        Self {
            db,
            presence,
            chat,
            jwt,
            config: Arc::new(config),
            meters: Meters::new(),
        }
    }
}
