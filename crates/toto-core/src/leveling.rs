//! XP to level mapping.
//!
//! Levels come from a fixed ascending table of `(level, min_xp, max_xp)`
//! breakpoints. The top tier is closed: XP past its `max_xp` stays at the
//! last level with progress capped at 100%.

use serde::Serialize;

/// One row of the level table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    pub level: u32,
    pub min_xp: i64,
    pub max_xp: i64,
}

pub const LEVELS: &[Breakpoint] = &[
    Breakpoint { level: 1, min_xp: 0, max_xp: 1_000 },
    Breakpoint { level: 2, min_xp: 1_000, max_xp: 2_500 },
    Breakpoint { level: 3, min_xp: 2_500, max_xp: 5_000 },
    Breakpoint { level: 4, min_xp: 5_000, max_xp: 10_000 },
    Breakpoint { level: 5, min_xp: 10_000, max_xp: 20_000 },
];

/// Where a cumulative XP total sits in the level table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    /// XP earned since the start of the current level.
    pub xp_into_level: i64,
    /// Width of the current level in XP.
    pub level_span: i64,
    /// Percentage through the current level, within `[0, 100]`.
    pub progress: f64,
    /// Set once XP reaches the top of the last level.
    pub max_level: bool,
}

/// Map cumulative XP to a level and progress within it, using [`LEVELS`].
pub fn level_for(xp: i64) -> LevelProgress {
    level_in(LEVELS, xp)
}

/// Map cumulative XP against an arbitrary ascending breakpoint table.
///
/// Negative XP is treated as zero. An empty table yields level 1 at 0%.
#[allow(clippy::cast_precision_loss)]
pub fn level_in(table: &[Breakpoint], xp: i64) -> LevelProgress {
    let xp = xp.max(0);
    let Some(bp) = table.iter().rev().find(|bp| bp.min_xp <= xp).or(table.first()) else {
        return LevelProgress {
            level: 1,
            xp_into_level: 0,
            level_span: 0,
            progress: 0.0,
            max_level: false,
        };
    };

    let span = (bp.max_xp - bp.min_xp).max(1);
    let into = xp - bp.min_xp;
    let progress = (into as f64 / span as f64 * 100.0).clamp(0.0, 100.0);
    let is_top = table.last().is_some_and(|last| last.level == bp.level);

    LevelProgress {
        level: bp.level,
        xp_into_level: into,
        level_span: span,
        progress,
        max_level: is_top && xp >= bp.max_xp,
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn zero_xp_is_level_one_empty() {
        let p = level_for(0);
        assert_eq!(p.level, 1);
        assert!(approx(p.progress, 0.0));
        assert!(!p.max_level);
    }

    #[test]
    fn just_below_breakpoint() {
        let p = level_for(999);
        assert_eq!(p.level, 1);
        assert!(approx(p.progress, 99.9));
        assert_eq!(p.xp_into_level, 999);
        assert_eq!(p.level_span, 1000);
    }

    #[test]
    fn exactly_on_breakpoint_starts_next_level() {
        let p = level_for(1000);
        assert_eq!(p.level, 2);
        assert!(approx(p.progress, 0.0));
        assert_eq!(p.level_span, 1500);
    }

    #[test]
    fn beyond_top_breakpoint_is_capped() {
        let p = level_for(25_000);
        assert_eq!(p.level, 5);
        assert!(p.progress >= 100.0);
        assert!(approx(p.progress, 100.0));
        assert!(p.max_level);
    }

    #[test]
    fn negative_xp_counts_as_zero() {
        assert_eq!(level_for(-40), level_for(0));
    }

    #[test]
    fn progress_never_decreases_within_a_level() {
        let mut last = -1.0;
        for xp in (2_500..5_000).step_by(97) {
            let p = level_for(xp);
            assert_eq!(p.level, 3);
            assert!(p.progress >= last);
            last = p.progress;
        }
    }

    #[test]
    fn empty_table_falls_back_to_level_one() {
        let p = level_in(&[], 500);
        assert_eq!(p.level, 1);
        assert!(approx(p.progress, 0.0));
    }
}
