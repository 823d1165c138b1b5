//! Closed vocabularies shared by storage, API and presentation.
//!
//! Each enum serializes as the lowercase/snake_case token stored in the
//! database and exchanged over JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

macro_rules! token_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(rename_all = "snake_case")]
        #[sqlx(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $token),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok(Self::$variant),)+
                    other => Err(Error::validation(format!(
                        concat!("unknown ", stringify!($name), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

token_enum!(
    /// Sport a match belongs to.
    MatchCategory {
        Football => "football",
        Cricket => "cricket",
        Basketball => "basketball",
        Tennis => "tennis",
        Other => "other",
    }
);

token_enum!(
    /// Publication state of a match. Only active matches reach viewers.
    MatchStatus {
        Active => "active",
        Inactive => "inactive",
        Upcoming => "upcoming",
    }
);

token_enum!(
    /// Kind of an admin audit entry.
    ActivityKind {
        Login => "login",
        Logout => "logout",
        MatchAdd => "match_add",
        MatchEdit => "match_edit",
        MatchDelete => "match_delete",
        UserEdit => "user_edit",
        UserDelete => "user_delete",
        Broadcast => "broadcast",
        Settings => "settings",
        XpAdd => "xp_add",
        XpRemove => "xp_remove",
    }
);

token_enum!(
    /// Who a broadcast is addressed to.
    Audience {
        All => "all",
        Premium => "premium",
        Free => "free",
        Active => "active",
    }
);

/// Window within which a user counts as online, in milliseconds.
pub const ACTIVE_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Whether a user last seen at `last_seen` is online at `now` (both in ms).
pub const fn is_recently_active(last_seen: i64, now: i64) -> bool {
    last_seen > now - ACTIVE_WINDOW_MS
}

impl Audience {
    /// Whether a user with the given premium flag and last-seen time is
    /// addressed by a broadcast with this audience.
    pub const fn includes(self, premium: bool, last_seen: i64, now: i64) -> bool {
        match self {
            Self::All => true,
            Self::Premium => premium,
            Self::Free => !premium,
            Self::Active => is_recently_active(last_seen, now),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_through_from_str() {
        for kind in ActivityKind::ALL {
            assert_eq!(kind.as_str().parse::<ActivityKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn unknown_token_is_a_validation_error() {
        let err = "hockey".parse::<MatchCategory>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn serde_uses_snake_case_tokens() {
        let json = serde_json::to_string(&ActivityKind::MatchDelete).unwrap();
        assert_eq!(json, "\"match_delete\"");
        let back: MatchStatus = serde_json::from_str("\"upcoming\"").unwrap();
        assert_eq!(back, MatchStatus::Upcoming);
    }

    #[test]
    fn audience_selection() {
        let now = 10 * ACTIVE_WINDOW_MS;
        assert!(Audience::All.includes(false, 0, now));
        assert!(Audience::Premium.includes(true, 0, now));
        assert!(!Audience::Premium.includes(false, now, now));
        assert!(Audience::Free.includes(false, 0, now));
        assert!(Audience::Active.includes(false, now - 1000, now));
        assert!(!Audience::Active.includes(true, now - ACTIVE_WINDOW_MS, now));
    }
}
