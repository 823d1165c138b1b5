//! Activity log, broadcast, settings and dashboard queries.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use toto_core::db::unix_millis;
use toto_core::model::ACTIVE_WINDOW_MS;
use toto_core::{ActivityKind, Audience, MatchStatus};

use super::db::{Database, DatabaseError};
use super::models::{Activity, Broadcast, Settings, User};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Time window for the activity log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Since midnight UTC.
    Today,
    Week,
    Month,
    #[default]
    All,
}

impl Period {
    /// Lower bound in unix millis, `None` for [`Period::All`].
    pub fn since(self, now: i64) -> Option<i64> {
        match self {
            Self::Today => Some(start_of_day(now)),
            Self::Week => Some(now - 7 * DAY_MS),
            Self::Month => Some(now - 30 * DAY_MS),
            Self::All => None,
        }
    }
}

fn start_of_day(millis: i64) -> i64 {
    DateTime::from_timestamp_millis(millis)
        .and_then(|dt| dt.date_naive().and_hms_opt(0, 0, 0))
        .map_or(millis, |midnight| midnight.and_utc().timestamp_millis())
}

pub struct NewBroadcast<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub target: Audience,
    pub sent_by: &'a str,
}

pub struct SettingsUpdate<'a> {
    pub logo_url: &'a str,
    pub site_title: &'a str,
    pub telegram_bot: &'a str,
    pub premium_price: i64,
    pub default_xp: i64,
    pub welcome_message: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub active_matches: i64,
    pub active_viewers: i64,
    pub total_chats: i64,
    pub top_xp: i64,
    pub online_users: i64,
    /// New users per UTC day, oldest first, ending today.
    pub user_growth: Vec<DailyCount>,
    pub top_users: Vec<User>,
    pub recent_activities: Vec<Activity>,
}

impl Database {
    // =========================================================================
    // Activity log queries
    // =========================================================================

    pub async fn log_activity(
        &self,
        kind: ActivityKind,
        message: &str,
        actor: &str,
        ip: &str,
    ) -> Result<i64, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO activities (kind, message, actor, ip, timestamp) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(kind)
        .bind(message)
        .bind(actor)
        .bind(ip)
        .bind(unix_millis())
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Activity entries newest first, optionally filtered by kind and a
    /// lower time bound. `limit = None` returns every match.
    pub async fn list_activities(
        &self,
        kind: Option<ActivityKind>,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<Activity>, DatabaseError> {
        let activities = sqlx::query_as::<_, Activity>(
            "SELECT * FROM activities WHERE (?1 IS NULL OR kind = ?1) AND (?2 IS NULL OR timestamp >= ?2) ORDER BY timestamp DESC, id DESC LIMIT ?3",
        )
        .bind(kind)
        .bind(since)
        .bind(limit.map_or(-1, i64::from))
        .fetch_all(self.pool())
        .await?;

        Ok(activities)
    }

    /// Delete entries older than `cutoff`. Returns the number removed.
    pub async fn clear_activities_before(&self, cutoff: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM activities WHERE timestamp < ?")
            .bind(cutoff)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Broadcast queries
    // =========================================================================

    pub async fn create_broadcast(&self, params: &NewBroadcast<'_>) -> Result<Broadcast, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO broadcasts (title, message, target, sent_by, status, timestamp) VALUES (?, ?, ?, ?, 'sent', ?)",
        )
        .bind(params.title)
        .bind(params.message)
        .bind(params.target)
        .bind(params.sent_by)
        .bind(unix_millis())
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        sqlx::query_as::<_, Broadcast>("SELECT * FROM broadcasts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Broadcast {id}")))
    }

    /// Most recent broadcasts, newest first.
    pub async fn recent_broadcasts(&self, limit: u32) -> Result<Vec<Broadcast>, DatabaseError> {
        let broadcasts = sqlx::query_as::<_, Broadcast>(
            "SELECT * FROM broadcasts ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;

        Ok(broadcasts)
    }

    /// Most recent broadcasts whose audience includes `user`, newest first.
    pub async fn broadcasts_for(&self, user: &User, limit: u32) -> Result<Vec<Broadcast>, DatabaseError> {
        let now = unix_millis();
        let includes = |a: Audience| a.includes(user.premium, user.last_seen, now);

        let broadcasts = sqlx::query_as::<_, Broadcast>(
            "SELECT * FROM broadcasts WHERE target = 'all' \
             OR (target = 'premium' AND ?1) OR (target = 'free' AND ?2) OR (target = 'active' AND ?3) \
             ORDER BY timestamp DESC, id DESC LIMIT ?4",
        )
        .bind(includes(Audience::Premium))
        .bind(includes(Audience::Free))
        .bind(includes(Audience::Active))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;

        Ok(broadcasts)
    }

    // =========================================================================
    // Settings queries
    // =========================================================================

    pub async fn get_settings(&self) -> Result<Settings, DatabaseError> {
        sqlx::query_as::<_, Settings>("SELECT * FROM settings WHERE id = 1")
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Settings".to_string()))
    }

    pub async fn update_settings(
        &self,
        update: &SettingsUpdate<'_>,
        updated_by: &str,
    ) -> Result<Settings, DatabaseError> {
        sqlx::query(
            "UPDATE settings SET logo_url = ?, site_title = ?, telegram_bot = ?, premium_price = ?, default_xp = ?, welcome_message = ?, updated_at = ?, updated_by = ? WHERE id = 1",
        )
        .bind(update.logo_url)
        .bind(update.site_title)
        .bind(update.telegram_bot)
        .bind(update.premium_price)
        .bind(update.default_xp)
        .bind(update.welcome_message)
        .bind(unix_millis())
        .bind(updated_by)
        .execute(self.pool())
        .await?;

        self.get_settings().await
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Total `watching` across active matches, and users seen recently.
    pub async fn public_stats(&self) -> Result<(i64, i64), DatabaseError> {
        let watching: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(watching), 0) FROM matches WHERE status = ?",
        )
        .bind(MatchStatus::Active)
        .fetch_one(self.pool())
        .await?;

        let online: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE last_seen > ?")
            .bind(unix_millis() - ACTIVE_WINDOW_MS)
            .fetch_one(self.pool())
            .await?;

        Ok((watching, online))
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, DatabaseError> {
        let now = unix_millis();

        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await?;
        let active_matches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matches WHERE status = ?")
            .bind(MatchStatus::Active)
            .fetch_one(self.pool())
            .await?;
        let top_xp: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(xp), 0) FROM users")
            .fetch_one(self.pool())
            .await?;
        let (active_viewers, online_users) = self.public_stats().await?;
        let total_chats = self.count_chat().await?;

        let today = DateTime::from_timestamp_millis(now)
            .map_or_else(|| Utc::now().date_naive(), |dt| dt.date_naive());
        let days: Vec<NaiveDate> = (0..7u64)
            .rev()
            .filter_map(|i| today.checked_sub_days(Days::new(i)))
            .collect();
        let window_start = days
            .first()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(now - 7 * DAY_MS, |dt| dt.and_utc().timestamp_millis());

        let created: Vec<i64> = sqlx::query_scalar("SELECT created_at FROM users WHERE created_at >= ?")
            .bind(window_start)
            .fetch_all(self.pool())
            .await?;

        let user_growth = days
            .iter()
            .map(|day| DailyCount {
                date: *day,
                count: created
                    .iter()
                    .filter(|ts| {
                        DateTime::from_timestamp_millis(**ts).is_some_and(|dt| dt.date_naive() == *day)
                    })
                    .count()
                    .try_into()
                    .unwrap_or(i64::MAX),
            })
            .collect();

        Ok(DashboardStats {
            total_users,
            active_matches,
            active_viewers,
            total_chats,
            top_xp,
            online_users,
            user_growth,
            top_users: self.top_users(5).await?,
            recent_activities: self.list_activities(None, None, Some(10)).await?,
        })
    }
}
