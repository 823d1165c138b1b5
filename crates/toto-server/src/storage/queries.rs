//! Viewer and match queries.

use toto_core::db::unix_millis;
use toto_core::model::ACTIVE_WINDOW_MS;
use toto_core::{Audience, MatchCategory, MatchStatus};

use super::db::{Database, DatabaseError};
use super::models::{Match, User};

/// Fields for a freshly bootstrapped viewer.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub profile_pic: &'a str,
    pub xp: i64,
}

/// Profile fields an admin may edit. Counters are not editable here.
pub struct ProfileUpdate<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub profile_pic: &'a str,
    pub telegram_id: &'a str,
}

/// Admin user listing: filter, search, and 1-based page.
pub struct UserQuery<'a> {
    pub filter: Audience,
    pub search: Option<&'a str>,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug)]
pub struct MatchParams<'a> {
    pub title: &'a str,
    pub thumbnail: &'a str,
    pub video_url: &'a str,
    pub category: MatchCategory,
    pub status: MatchStatus,
    pub premium_only: bool,
}

const USER_FILTER: &str = "(?1 = 'all' \
     OR (?1 = 'premium' AND premium = 1) \
     OR (?1 = 'free' AND premium = 0) \
     OR (?1 = 'active' AND last_seen > ?2)) \
     AND (?3 IS NULL OR lower(name) LIKE ?3 OR lower(email) LIKE ?3 OR phone LIKE ?3)";

impl Database {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Insert a viewer. Counters start at zero and `last_seen` at now.
    pub async fn create_user(&self, params: &NewUser<'_>) -> Result<User, DatabaseError> {
        let now = unix_millis();

        sqlx::query(
            "INSERT INTO users (id, name, profile_pic, xp, last_seen, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(params.id)
        .bind(params.name)
        .bind(params.profile_pic)
        .bind(params.xp.max(0))
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(params.id).await
    }

    /// Create the viewer if absent, otherwise touch `last_seen`.
    ///
    /// Returns the stored user and whether it was created by this call.
    pub async fn upsert_user(&self, params: &NewUser<'_>) -> Result<(User, bool), DatabaseError> {
        let now = unix_millis();

        let result = sqlx::query(
            "INSERT INTO users (id, name, profile_pic, xp, last_seen, created_at) VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT (id) DO NOTHING",
        )
        .bind(params.id)
        .bind(params.name)
        .bind(params.profile_pic)
        .bind(params.xp.max(0))
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        let created = result.rows_affected() == 1;
        if !created {
            self.touch_user(params.id).await?;
        }
        Ok((self.get_user(params.id).await?, created))
    }

    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Update `last_seen` to now.
    pub async fn touch_user(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE users SET last_seen = ? WHERE id = ?")
            .bind(unix_millis())
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate<'_>,
    ) -> Result<User, DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET name = ?, email = ?, phone = ?, profile_pic = ?, telegram_id = ? WHERE id = ?",
        )
        .bind(update.name)
        .bind(update.email)
        .bind(update.phone)
        .bind(update.profile_pic)
        .bind(update.telegram_id)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {id}")));
        }
        self.get_user(id).await
    }

    /// Set or clear premium. `premium_since` changes in the same statement.
    pub async fn set_premium(&self, id: &str, premium: bool) -> Result<User, DatabaseError> {
        let since = premium.then(unix_millis);

        let result = sqlx::query("UPDATE users SET premium = ?, premium_since = ? WHERE id = ?")
            .bind(premium)
            .bind(since)
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {id}")));
        }
        self.get_user(id).await
    }

    /// Flip a user to premium only if they are not premium yet. Returns
    /// `true` for the one caller that made the change.
    pub async fn grant_premium(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET premium = 1, premium_since = ? WHERE id = ? AND premium = 0",
        )
        .bind(unix_millis())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        self.get_user(id).await.map(|_| false)
    }

    /// Delete a viewer. Returns whether a row was removed.
    pub async fn delete_user(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Top `limit` users by XP, highest first.
    pub async fn top_users(&self, limit: u32) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY xp DESC, created_at ASC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;

        Ok(users)
    }

    /// One page of the admin user list, sorted by XP, plus the total number
    /// of matching users.
    pub async fn list_users(&self, query: &UserQuery<'_>) -> Result<(Vec<User>, i64), DatabaseError> {
        let active_since = unix_millis() - ACTIVE_WINDOW_MS;
        let pattern = query
            .search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));
        let per_page = i64::from(query.per_page.max(1));
        let offset = i64::from(query.page.max(1) - 1) * per_page;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {USER_FILTER}"))
            .bind(query.filter.as_str())
            .bind(active_since)
            .bind(pattern.as_deref())
            .fetch_one(self.pool())
            .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT * FROM users WHERE {USER_FILTER} ORDER BY xp DESC, created_at ASC LIMIT ?4 OFFSET ?5"
        ))
        .bind(query.filter.as_str())
        .bind(active_since)
        .bind(pattern.as_deref())
        .bind(per_page)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok((users, total))
    }

    // =========================================================================
    // Match queries
    // =========================================================================

    pub async fn create_match(
        &self,
        id: &str,
        params: &MatchParams<'_>,
        created_by: &str,
    ) -> Result<Match, DatabaseError> {
        let now = unix_millis();

        sqlx::query(
            "INSERT INTO matches (id, title, thumbnail, video_url, category, status, premium_only, created_at, created_by, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(params.title)
        .bind(params.thumbnail)
        .bind(params.video_url)
        .bind(params.category)
        .bind(params.status)
        .bind(params.premium_only)
        .bind(now)
        .bind(created_by)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_match(id).await
    }

    /// Replace a match's editable fields. `watching` and `created_at` are
    /// left untouched.
    pub async fn update_match(&self, id: &str, params: &MatchParams<'_>) -> Result<Match, DatabaseError> {
        let result = sqlx::query(
            "UPDATE matches SET title = ?, thumbnail = ?, video_url = ?, category = ?, status = ?, premium_only = ?, updated_at = ? WHERE id = ?",
        )
        .bind(params.title)
        .bind(params.thumbnail)
        .bind(params.video_url)
        .bind(params.category)
        .bind(params.status)
        .bind(params.premium_only)
        .bind(unix_millis())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Match {id}")));
        }
        self.get_match(id).await
    }

    pub async fn get_match(&self, id: &str) -> Result<Match, DatabaseError> {
        sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Match {id}")))
    }

    /// All matches, oldest first.
    pub async fn list_matches(&self) -> Result<Vec<Match>, DatabaseError> {
        let matches = sqlx::query_as::<_, Match>("SELECT * FROM matches ORDER BY created_at ASC")
            .fetch_all(self.pool())
            .await?;

        Ok(matches)
    }

    pub async fn list_matches_with_status(&self, status: MatchStatus) -> Result<Vec<Match>, DatabaseError> {
        let matches = sqlx::query_as::<_, Match>(
            "SELECT * FROM matches WHERE status = ? ORDER BY created_at ASC",
        )
        .bind(status)
        .fetch_all(self.pool())
        .await?;

        Ok(matches)
    }

    pub async fn delete_match(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM matches WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
