//! Per-match chat fan-out.
//!
//! Every match with at least one subscriber has a broadcast channel. Appended
//! messages are published after they are stored, so a subscriber sees every
//! message appended while it is subscribed.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;
use tracing::debug;

use crate::storage::ChatMessage;

#[derive(Clone)]
pub struct ChatHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<ChatMessage>>>>,
    capacity: usize,
}

impl ChatHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, match_id: &str) -> broadcast::Receiver<ChatMessage> {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(match_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Deliver a stored message to current subscribers. Returns how many
    /// received it.
    pub fn publish(&self, message: &ChatMessage) -> usize {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        let delivered = channels
            .get(&message.match_id)
            .and_then(|tx| tx.send(message.clone()).ok())
            .unwrap_or(0);
        debug!(match_id = %message.match_id, delivered, "Chat message published");
        delivered
    }

    /// Drop channels nobody listens to anymore.
    pub fn prune(&self) -> usize {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let before = channels.len();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        before - channels.len()
    }

    /// Remove a match's channel, ending every open stream for it.
    pub fn close(&self, match_id: &str) -> bool {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(match_id)
            .is_some()
    }

    pub fn subscriber_count(&self, match_id: &str) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(match_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}
