//! In-memory presence registry.
//!
//! Tracks which viewers are in which match. A record lives while its lease is
//! fresh (renewed by join and heartbeat) or while at least one chat stream is
//! attached. Dropping the last [`PresenceGuard`] removes the record, which is
//! how a closed connection cleans up after itself.
//!
//! Separately, the registry remembers which `(match, viewer)` pairs hold a
//! slot in the match's `watching` counter. Only join and leave take and give
//! back slots; streams and lease expiry never touch them. A slot whose viewer
//! has no presence record left is an orphan and is released by
//! [`reconcile_watchers`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use toto_core::MatchStatus;
use toto_core::db::unix_millis;
use tracing::{debug, info};

use crate::storage::{Counter, Database, DatabaseError};

type Key = (String, String);

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    joined_at: i64,
    lease_until: Instant,
    streams: usize,
}

/// A viewer currently present in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub viewer_id: String,
    pub name: String,
    pub joined_at: i64,
}

/// Thread-safe registry of `(match, viewer)` presence records.
///
/// Critical sections are short and never await, so the lock is a plain
/// `std` lock and [`PresenceGuard`] can release from `Drop`.
#[derive(Clone)]
pub struct PresenceRegistry {
    entries: Arc<RwLock<HashMap<Key, Entry>>>,
    /// Pairs counted in `watching`. Lock order: `entries` before `counted`.
    counted: Arc<RwLock<HashSet<Key>>>,
    lease: Duration,
}

impl PresenceRegistry {
    pub fn new(lease: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            counted: Arc::new(RwLock::new(HashSet::new())),
            lease,
        }
    }

    pub const fn lease(&self) -> Duration {
        self.lease
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Key, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Key, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or refresh a record. Returns `true` if it was new.
    pub fn join(&self, match_id: &str, viewer_id: &str, name: &str) -> bool {
        let lease_until = Instant::now() + self.lease;
        let mut entries = self.write();
        let key = (match_id.to_string(), viewer_id.to_string());
        if let Some(entry) = entries.get_mut(&key) {
            entry.lease_until = lease_until;
            entry.name = name.to_string();
            return false;
        }
        entries.insert(
            key,
            Entry {
                name: name.to_string(),
                joined_at: unix_millis(),
                lease_until,
                streams: 0,
            },
        );
        debug!(match_id, viewer_id, "Presence joined");
        true
    }

    /// Renew a lease. Unknown records report `false`; the client re-joins.
    pub fn heartbeat(&self, match_id: &str, viewer_id: &str) -> bool {
        let key = (match_id.to_string(), viewer_id.to_string());
        self.write().get_mut(&key).is_some_and(|entry| {
            entry.lease_until = Instant::now() + self.lease;
            true
        })
    }

    /// Remove a record regardless of attached streams.
    pub fn leave(&self, match_id: &str, viewer_id: &str) -> bool {
        let key = (match_id.to_string(), viewer_id.to_string());
        let removed = self.write().remove(&key).is_some();
        if removed {
            debug!(match_id, viewer_id, "Presence left");
        }
        removed
    }

    /// Bind a record to a live connection. The record exists at least until
    /// the returned guard is dropped, and is removed when the last guard for
    /// it goes away.
    pub fn attach(&self, match_id: &str, viewer_id: &str, name: &str) -> PresenceGuard {
        let key = (match_id.to_string(), viewer_id.to_string());
        let lease_until = Instant::now() + self.lease;
        {
            let mut entries = self.write();
            let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
                name: name.to_string(),
                joined_at: unix_millis(),
                lease_until,
                streams: 0,
            });
            entry.streams += 1;
            entry.lease_until = lease_until;
        }
        debug!(match_id, viewer_id, "Presence stream attached");
        PresenceGuard {
            registry: self.clone(),
            key,
        }
    }

    fn detach(&self, key: &Key) {
        let mut entries = self.write();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        entry.streams = entry.streams.saturating_sub(1);
        if entry.streams == 0 {
            entries.remove(key);
            debug!(match_id = %key.0, viewer_id = %key.1, "Presence removed on disconnect");
        }
    }

    pub fn is_present(&self, match_id: &str, viewer_id: &str) -> bool {
        self.read()
            .contains_key(&(match_id.to_string(), viewer_id.to_string()))
    }

    pub fn count(&self, match_id: &str) -> usize {
        self.read().keys().filter(|(m, _)| m == match_id).count()
    }

    /// Viewers present in a match, earliest join first.
    pub fn viewers(&self, match_id: &str) -> Vec<Presence> {
        let mut viewers: Vec<Presence> = self
            .read()
            .iter()
            .filter(|((m, _), _)| m == match_id)
            .map(|((_, v), e)| Presence {
                viewer_id: v.clone(),
                name: e.name.clone(),
                joined_at: e.joined_at,
            })
            .collect();
        viewers.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.viewer_id.cmp(&b.viewer_id))
        });
        viewers
    }

    /// Drop records whose lease lapsed before `now` and that have no stream
    /// attached. Returns the removed `(match, viewer)` pairs.
    pub fn sweep_expired(&self, now: Instant) -> Vec<(String, String)> {
        let mut entries = self.write();
        let expired: Vec<Key> = entries
            .iter()
            .filter(|(_, e)| e.streams == 0 && e.lease_until <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.remove(key);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    fn counted_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashSet<Key>> {
        self.counted.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a `watching` slot. Returns `true` if the pair was not counted yet,
    /// in which case the caller increments the counter.
    pub fn count_in(&self, match_id: &str, viewer_id: &str) -> bool {
        self.counted_mut()
            .insert((match_id.to_string(), viewer_id.to_string()))
    }

    /// Give back a `watching` slot. Returns `true` if the pair was counted,
    /// in which case the caller decrements the counter.
    pub fn count_out(&self, match_id: &str, viewer_id: &str) -> bool {
        self.counted_mut()
            .remove(&(match_id.to_string(), viewer_id.to_string()))
    }

    pub fn is_counted(&self, match_id: &str, viewer_id: &str) -> bool {
        self.counted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(match_id.to_string(), viewer_id.to_string()))
    }

    /// Number of slots held in a match.
    pub fn counted(&self, match_id: &str) -> usize {
        self.counted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(m, _)| m == match_id)
            .count()
    }

    /// Release slots whose viewer has no presence record left. Returns the
    /// released pairs; each one owes the counter a decrement.
    pub fn release_orphans(&self) -> Vec<(String, String)> {
        let entries = self.read();
        let mut counted = self.counted_mut();
        let orphans: Vec<Key> = counted
            .iter()
            .filter(|key| !entries.contains_key(*key))
            .cloned()
            .collect();
        for key in &orphans {
            counted.remove(key);
        }
        orphans
    }

    /// Drop every record and slot of a viewer. Returns the matches whose
    /// slot was released.
    pub fn forget_viewer(&self, viewer_id: &str) -> Vec<String> {
        let mut entries = self.write();
        let mut counted = self.counted_mut();
        entries.retain(|(_, v), _| v != viewer_id);
        let released: Vec<String> = counted
            .iter()
            .filter(|(_, v)| v == viewer_id)
            .map(|(m, _)| m.clone())
            .collect();
        counted.retain(|(_, v)| v != viewer_id);
        released
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Keeps a presence record alive for the lifetime of a connection.
pub struct PresenceGuard {
    registry: PresenceRegistry,
    key: Key,
}

impl PresenceGuard {
    pub fn match_id(&self) -> &str {
        &self.key.0
    }

    pub fn viewer_id(&self) -> &str {
        &self.key.1
    }
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        self.registry.detach(&self.key);
    }
}

/// Give back slots of viewers that vanished without leaving, then lower each
/// active match's `watching` counter to the number of slots it holds.
///
/// Only overcounts are corrected: viewers counted by another server are
/// invisible to the registry, so a counter below the slot count is left
/// alone. Returns the number of matches adjusted.
pub async fn reconcile_watchers(
    db: &Database,
    presence: &PresenceRegistry,
) -> Result<usize, DatabaseError> {
    let orphans = presence.release_orphans();
    for (match_id, viewer_id) in &orphans {
        match db.decrement(Counter::MatchWatching, match_id, 1).await {
            Ok(_) | Err(DatabaseError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        debug!(match_id = %match_id, viewer_id = %viewer_id, "Orphaned watcher slot released");
    }

    let mut adjusted = 0;
    for m in db.list_matches_with_status(MatchStatus::Active).await? {
        let live = i64::try_from(presence.counted(&m.id)).unwrap_or(i64::MAX);
        if m.watching <= live {
            continue;
        }
        let stored = db
            .transact_counter(Counter::MatchWatching, &m.id, |v| v.min(live))
            .await?;
        debug!(match_id = %m.id, from = m.watching, to = stored, "Watcher count drift corrected");
        adjusted += 1;
    }
    if adjusted > 0 {
        info!(adjusted, "Watcher counts reconciled");
    }
    Ok(adjusted)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MatchParams;
    use toto_core::MatchCategory;

    const LEASE: Duration = Duration::from_secs(45);

    fn later() -> Instant {
        Instant::now() + LEASE + Duration::from_secs(1)
    }

    #[test]
    fn join_heartbeat_leave() {
        let registry = PresenceRegistry::new(LEASE);
        assert!(registry.join("m1", "v1", "Rahim"));
        assert!(!registry.join("m1", "v1", "Rahim"));
        assert_eq!(registry.count("m1"), 1);

        assert!(registry.heartbeat("m1", "v1"));
        assert!(!registry.heartbeat("m1", "v2"));

        assert!(registry.leave("m1", "v1"));
        assert!(!registry.leave("m1", "v1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn lapsed_lease_is_swept() {
        let registry = PresenceRegistry::new(LEASE);
        registry.join("m1", "v1", "a");
        registry.join("m2", "v2", "b");

        assert!(registry.sweep_expired(Instant::now()).is_empty());
        let mut removed = registry.sweep_expired(later());
        removed.sort();
        assert_eq!(
            removed,
            vec![("m1".into(), "v1".into()), ("m2".into(), "v2".into())]
        );
        assert!(!registry.heartbeat("m1", "v1"));
    }

    #[test]
    fn attached_stream_survives_sweep() {
        let registry = PresenceRegistry::new(LEASE);
        let guard = registry.attach("m1", "v1", "a");
        assert!(registry.sweep_expired(later()).is_empty());
        assert!(registry.is_present("m1", "v1"));
        assert_eq!(guard.match_id(), "m1");
        assert_eq!(guard.viewer_id(), "v1");
    }

    #[test]
    fn dropping_last_stream_removes_record() {
        let registry = PresenceRegistry::new(LEASE);
        registry.join("m1", "v1", "a");
        let first = registry.attach("m1", "v1", "a");
        let second = registry.attach("m1", "v1", "a");

        drop(first);
        assert!(registry.is_present("m1", "v1"));
        drop(second);
        assert!(!registry.is_present("m1", "v1"));
    }

    #[test]
    fn guard_after_leave_is_harmless() {
        let registry = PresenceRegistry::new(LEASE);
        let guard = registry.attach("m1", "v1", "a");
        registry.leave("m1", "v1");
        drop(guard);
        assert!(registry.is_empty());
    }

    #[test]
    fn viewers_are_listed_per_match() {
        let registry = PresenceRegistry::new(LEASE);
        registry.join("m1", "v1", "a");
        registry.join("m1", "v2", "b");
        registry.join("m2", "v3", "c");

        let viewers = registry.viewers("m1");
        assert_eq!(viewers.len(), 2);
        assert!(viewers.iter().all(|p| p.viewer_id != "v3"));
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn reconcile_lowers_overcount_only() {
        let db = Database::open_in_memory().await.unwrap();
        let params = MatchParams {
            title: "Derby",
            thumbnail: "https://example.com/t.jpg",
            video_url: "https://example.com/v.m3u8",
            category: MatchCategory::Football,
            status: MatchStatus::Active,
            premium_only: false,
        };
        db.create_match("over", &params, "a").await.unwrap();
        db.create_match("under", &params, "a").await.unwrap();
        db.increment(Counter::MatchWatching, "over", 5).await.unwrap();

        let registry = PresenceRegistry::new(LEASE);
        for (m, v) in [("over", "v1"), ("under", "v1"), ("under", "v2")] {
            registry.join(m, v, "a");
            registry.count_in(m, v);
        }

        assert_eq!(reconcile_watchers(&db, &registry).await.unwrap(), 1);
        assert_eq!(db.get_match("over").await.unwrap().watching, 1);
        assert_eq!(db.get_match("under").await.unwrap().watching, 0);
        assert_eq!(reconcile_watchers(&db, &registry).await.unwrap(), 0);
    }

    #[test]
    fn slots_ignore_streams_and_expiry() {
        let registry = PresenceRegistry::new(LEASE);
        registry.join("m1", "v1", "a");
        assert!(registry.count_in("m1", "v1"));
        assert!(!registry.count_in("m1", "v1"));

        drop(registry.attach("m1", "v1", "a"));
        assert!(!registry.is_present("m1", "v1"));
        assert!(registry.is_counted("m1", "v1"));

        registry.join("m1", "v2", "b");
        registry.count_in("m1", "v2");
        registry.sweep_expired(later());
        assert_eq!(registry.counted("m1"), 2);

        assert!(registry.count_out("m1", "v1"));
        assert!(!registry.count_out("m1", "v1"));
        assert_eq!(registry.counted("m1"), 1);
    }

    #[test]
    fn orphans_are_slots_without_presence() {
        let registry = PresenceRegistry::new(LEASE);
        registry.join("m1", "v1", "a");
        registry.count_in("m1", "v1");
        let _stream = registry.attach("m1", "v2", "b");
        registry.count_in("m1", "v2");
        registry.count_in("m1", "v3");

        assert_eq!(
            registry.release_orphans(),
            vec![("m1".to_string(), "v3".to_string())]
        );
        assert_eq!(registry.counted("m1"), 2);
        assert!(registry.release_orphans().is_empty());
    }

    #[test]
    fn forgetting_a_viewer_releases_every_slot() {
        let registry = PresenceRegistry::new(LEASE);
        for m in ["m1", "m2"] {
            registry.join(m, "v1", "a");
            registry.count_in(m, "v1");
        }
        registry.join("m1", "v2", "b");
        registry.count_in("m1", "v2");

        let mut released = registry.forget_viewer("v1");
        released.sort();
        assert_eq!(released, vec!["m1".to_string(), "m2".to_string()]);
        assert!(!registry.is_present("m1", "v1"));
        assert_eq!(registry.counted("m1"), 1);
        assert!(registry.forget_viewer("v1").is_empty());
    }

    #[tokio::test]
    async fn reconcile_releases_orphaned_slots() {
        let db = Database::open_in_memory().await.unwrap();
        let params = MatchParams {
            title: "Derby",
            thumbnail: "https://example.com/t.jpg",
            video_url: "https://example.com/v.m3u8",
            category: MatchCategory::Football,
            status: MatchStatus::Active,
            premium_only: false,
        };
        db.create_match("m1", &params, "a").await.unwrap();

        let registry = PresenceRegistry::new(LEASE);
        for v in ["v1", "v2"] {
            registry.join("m1", v, "a");
            registry.count_in("m1", v);
            db.increment(Counter::MatchWatching, "m1", 1).await.unwrap();
        }
        registry.sweep_expired(later());

        assert_eq!(reconcile_watchers(&db, &registry).await.unwrap(), 0);
        assert_eq!(db.get_match("m1").await.unwrap().watching, 0);
        assert_eq!(registry.counted("m1"), 0);
    }
}
