//! Leaderboard ranking.
//!
//! Takes an XP-ordered slice (usually the result of a limited range query)
//! and splits it into a medal podium, the ranked remainder, and the
//! requesting viewer's position.

use serde::Serialize;

/// Anything that can be ranked by XP.
pub trait Ranked {
    fn id(&self) -> &str;
    fn xp(&self) -> i64;
}

pub const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];
pub const PODIUM_SIZE: usize = MEDALS.len();

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing<T> {
    /// 1-based rank.
    pub rank: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medal: Option<&'static str>,
    #[serde(flatten)]
    pub entry: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard<T> {
    pub podium: Vec<Standing<T>>,
    pub rest: Vec<Standing<T>>,
    /// 1-based position of the requesting viewer, when inside the slice.
    pub position: Option<usize>,
}

impl<T> Leaderboard<T> {
    pub fn len(&self) -> usize {
        self.podium.len() + self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.podium.is_empty() && self.rest.is_empty()
    }

    /// All standings in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &Standing<T>> {
        self.podium.iter().chain(self.rest.iter())
    }
}

/// Rank `entries` by XP descending.
///
/// The sort is stable, so entries with equal XP keep their input order.
pub fn rank<T: Ranked>(mut entries: Vec<T>, viewer: Option<&str>) -> Leaderboard<T> {
    entries.sort_by(|a, b| b.xp().cmp(&a.xp()));

    let position = viewer.and_then(|v| entries.iter().position(|e| e.id() == v).map(|i| i + 1));

    let mut podium = Vec::with_capacity(PODIUM_SIZE.min(entries.len()));
    let mut rest = Vec::with_capacity(entries.len().saturating_sub(PODIUM_SIZE));
    for (i, entry) in entries.into_iter().enumerate() {
        let standing = Standing {
            rank: i + 1,
            medal: MEDALS.get(i).copied(),
            entry,
        };
        if i < PODIUM_SIZE {
            podium.push(standing);
        } else {
            rest.push(standing);
        }
    }

    Leaderboard {
        podium,
        rest,
        position,
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Row {
        id: String,
        xp: i64,
    }

    impl Ranked for Row {
        fn id(&self) -> &str {
            &self.id
        }
        fn xp(&self) -> i64 {
            self.xp
        }
    }

    fn rows(xps: &[(&str, i64)]) -> Vec<Row> {
        xps.iter()
            .map(|(id, xp)| Row {
                id: (*id).to_string(),
                xp: *xp,
            })
            .collect()
    }

    #[test]
    fn output_is_non_increasing() {
        let board = rank(
            rows(&[("a", 10), ("b", 500), ("c", 70), ("d", 900), ("e", 0)]),
            None,
        );
        let xps: Vec<i64> = board.iter().map(|s| s.entry.xp).collect();
        assert!(xps.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(xps, vec![900, 500, 70, 10, 0]);
    }

    #[test]
    fn ties_keep_input_order() {
        let board = rank(rows(&[("x", 100), ("y", 100), ("z", 100), ("w", 200)]), None);
        let ids: Vec<&str> = board.iter().map(|s| s.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["w", "x", "y", "z"]);
    }

    #[test]
    fn podium_gets_medals_and_rest_starts_at_four() {
        let board = rank(
            rows(&[("a", 5), ("b", 4), ("c", 3), ("d", 2), ("e", 1)]),
            None,
        );
        assert_eq!(board.podium.len(), 3);
        assert_eq!(board.podium[0].medal, Some("🥇"));
        assert_eq!(board.podium[2].medal, Some("🥉"));
        assert_eq!(board.rest[0].rank, 4);
        assert_eq!(board.rest[0].medal, None);
        assert_eq!(board.len(), 5);
    }

    #[test]
    fn viewer_position_is_one_based() {
        let board = rank(rows(&[("a", 5), ("me", 4), ("c", 9)]), Some("me"));
        assert_eq!(board.position, Some(3));
        let absent = rank(rows(&[("a", 5)]), Some("me"));
        assert_eq!(absent.position, None);
    }

    #[test]
    fn short_and_empty_inputs() {
        let board = rank(rows(&[("a", 1)]), None);
        assert_eq!(board.podium.len(), 1);
        assert!(board.rest.is_empty());
        assert!(rank(Vec::<Row>::new(), Some("a")).is_empty());
    }

    #[test]
    fn standing_flattens_entry() {
        let board = rank(rows(&[("a", 7)]), None);
        let json = serde_json::to_value(&board.podium[0]).unwrap();
        assert_eq!(json["rank"], 1);
        assert_eq!(json["id"], "a");
        assert_eq!(json["medal"], "🥇");
    }
}
