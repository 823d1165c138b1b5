//! Versioned counter transactions.
//!
//! Counter columns are never written blind. Each update reads the current
//! `(value, version)` pair, computes the new value, and writes it back only
//! if the row version is unchanged. A lost race re-reads and retries.

use tracing::{debug, warn};

use super::db::{Database, DatabaseError};

/// Attempts before a counter update gives up with [`DatabaseError::Conflict`].
pub const MAX_COUNTER_RETRIES: usize = 32;

/// The counter-typed columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    MatchWatching,
    UserXp,
    UserTotalWatched,
    UserTotalChats,
}

impl Counter {
    const fn table(self) -> &'static str {
        match self {
            Self::MatchWatching => "matches",
            Self::UserXp | Self::UserTotalWatched | Self::UserTotalChats => "users",
        }
    }

    const fn column(self) -> &'static str {
        match self {
            Self::MatchWatching => "watching",
            Self::UserXp => "xp",
            Self::UserTotalWatched => "total_watched",
            Self::UserTotalChats => "total_chats",
        }
    }
}

impl Database {
    /// Apply `f` to a counter and store the result, clamped at zero.
    ///
    /// Returns the stored value.
    pub async fn transact_counter<F>(
        &self,
        counter: Counter,
        id: &str,
        f: F,
    ) -> Result<i64, DatabaseError>
    where
        F: Fn(i64) -> i64 + Send,
    {
        let (table, column) = (counter.table(), counter.column());
        let select = format!("SELECT {column}, version FROM {table} WHERE id = ?");
        let update =
            format!("UPDATE {table} SET {column} = ?, version = version + 1 WHERE id = ? AND version = ?");

        for attempt in 1..=MAX_COUNTER_RETRIES {
            let (current, version): (i64, i64) = sqlx::query_as(&select)
                .bind(id)
                .fetch_optional(self.pool())
                .await?
                .ok_or_else(|| DatabaseError::NotFound(format!("{table} {id}")))?;

            let next = f(current).max(0);
            let result = sqlx::query(&update)
                .bind(next)
                .bind(id)
                .bind(version)
                .execute(self.pool())
                .await?;

            if result.rows_affected() == 1 {
                return Ok(next);
            }

            debug!(table, column, id, attempt, "Counter version moved, retrying");
            tokio::task::yield_now().await;
        }

        warn!(table, column, id, "Counter update retries exhausted");
        Err(DatabaseError::Conflict(format!(
            "{table}.{column} for {id} after {MAX_COUNTER_RETRIES} attempts"
        )))
    }

    pub async fn increment(&self, counter: Counter, id: &str, by: i64) -> Result<i64, DatabaseError> {
        self.transact_counter(counter, id, |v| v.saturating_add(by)).await
    }

    /// Decrement, clamping at zero.
    pub async fn decrement(&self, counter: Counter, id: &str, by: i64) -> Result<i64, DatabaseError> {
        self.transact_counter(counter, id, |v| v.saturating_sub(by)).await
    }
}
