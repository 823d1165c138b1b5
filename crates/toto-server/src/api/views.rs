//! Response shapes shared by the viewer and admin surfaces.

use serde::Serialize;
use toto_core::leaderboard::Ranked;
use toto_core::{LevelProgress, level_for, locale};

use crate::storage::{Match, User};

/// A user together with where their XP puts them in the level table.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub level: LevelProgress,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        let level = level_for(user.xp);
        Self { user, level }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    #[serde(flatten)]
    pub inner: Match,
    pub category_label: &'static str,
    pub status_label: &'static str,
}

impl From<Match> for MatchView {
    fn from(inner: Match) -> Self {
        Self {
            category_label: locale::category_label(inner.category),
            status_label: locale::status_label(inner.status),
            inner,
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderEntry {
    pub id: String,
    pub name: String,
    pub profile_pic: String,
    pub xp: i64,
    pub premium: bool,
    pub level: u32,
}

impl From<User> for LeaderEntry {
    fn from(user: User) -> Self {
        Self {
            level: level_for(user.xp).level,
            id: user.id,
            name: user.name,
            profile_pic: user.profile_pic,
            xp: user.xp,
            premium: user.premium,
        }
    }
}

impl Ranked for LeaderEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn xp(&self) -> i64 {
        self.xp
    }
}
