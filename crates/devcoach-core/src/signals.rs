//! Habit signals derived from finished work: annotation rate, phase balance,
//! streaks and consistency. Inputs are plain records; nothing here reads a
//! clock.

use crate::block::WorkBlock;
use crate::coaching::WeeklyMetrics;
use crate::types::Phase;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const STREAK_WINDOW_DAYS: i64 = 30;
pub const CONSISTENCY_WINDOW_DAYS: i64 = 14;

// ---------------------------------------------------------------------------
// Day summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub blocks_completed: usize,
    pub issues_annotated: usize,
    pub total_minutes: f64,
    pub annotation_rate: f64,
}

pub fn day_summary(blocks: &[WorkBlock]) -> DaySummary {
    let total_minutes = blocks
        .iter()
        .filter_map(|b| b.ended_at.map(|end| minutes(end - b.started_at)))
        .sum();
    DaySummary {
        blocks_completed: blocks.iter().filter(|b| !b.is_active()).count(),
        issues_annotated: blocks.iter().filter(|b| b.annotated).count(),
        total_minutes,
        annotation_rate: annotation_rate(blocks),
    }
}

pub fn annotation_rate(blocks: &[WorkBlock]) -> f64 {
    if blocks.is_empty() {
        return 0.0;
    }
    blocks.iter().filter(|b| b.annotated).count() as f64 / blocks.len() as f64
}

fn minutes(d: Duration) -> f64 {
    d.num_milliseconds().max(0) as f64 / 60_000.0
}

// ---------------------------------------------------------------------------
// Phase balance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseBalance {
    pub phase: Phase,
    pub total_minutes: f64,
    /// Blocks that spent any time in this phase.
    pub block_count: usize,
}

/// Time per phase from each block's history. A phase still open counts up
/// to `now`.
pub fn phase_balance(blocks: &[WorkBlock], now: DateTime<Utc>) -> Vec<PhaseBalance> {
    let mut totals: BTreeMap<Phase, (f64, usize)> = BTreeMap::new();
    for block in blocks {
        let mut touched: BTreeSet<Phase> = BTreeSet::new();
        for step in &block.phase_history {
            let end = step.exited.or(block.ended_at).unwrap_or(now);
            let entry = totals.entry(step.phase).or_insert((0.0, 0));
            entry.0 += minutes(end - step.entered);
            if touched.insert(step.phase) {
                entry.1 += 1;
            }
        }
    }
    totals
        .into_iter()
        .map(|(phase, (total_minutes, block_count))| PhaseBalance {
            phase,
            total_minutes,
            block_count,
        })
        .collect()
}

/// Share of block time spent in `address`.
pub fn focus_score(blocks: &[WorkBlock], now: DateTime<Utc>) -> f64 {
    let balance = phase_balance(blocks, now);
    let total: f64 = balance.iter().map(|b| b.total_minutes).sum();
    if total <= 0.0 {
        return 0.0;
    }
    balance
        .iter()
        .find(|b| b.phase == Phase::Address)
        .map_or(0.0, |b| b.total_minutes / total)
}

// ---------------------------------------------------------------------------
// Streak / consistency
// ---------------------------------------------------------------------------

/// Consecutive days, counting back from `today`, that have a finished
/// session. Looks back at most [`STREAK_WINDOW_DAYS`].
pub fn streak_days(ended_dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let floor = today - Duration::days(STREAK_WINDOW_DAYS);
    let mut streak = 0;
    let mut day = today;
    while day >= floor && ended_dates.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// Share of weekdays in the last [`CONSISTENCY_WINDOW_DAYS`] with a session.
pub fn consistency_score(active_dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> f64 {
    let weekdays: Vec<NaiveDate> = (0..CONSISTENCY_WINDOW_DAYS)
        .map(|i| today - Duration::days(i))
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect();
    if weekdays.is_empty() {
        return 0.0;
    }
    let hit = weekdays.iter().filter(|d| active_dates.contains(d)).count();
    hit as f64 / weekdays.len() as f64
}

// ---------------------------------------------------------------------------
// Tips and weekly rollup
// ---------------------------------------------------------------------------

pub fn habit_tips(
    annotation_rate: Option<f64>,
    focus_score: f64,
    consistency_score: f64,
) -> Vec<String> {
    let mut tips = Vec::new();
    if annotation_rate.is_some_and(|r| r < 0.7) {
        tips.push(
            "Comment on issues when you finish a work block; it builds team trust.".to_string(),
        );
    }
    if focus_score < 0.4 {
        tips.push(
            "More time in the Address phase means less context-switching. Try the full Pomodoro."
                .to_string(),
        );
    }
    if consistency_score < 0.6 {
        tips.push(
            "Showing up consistently beats long irregular sessions. Aim for daily commits."
                .to_string(),
        );
    }
    tips
}

/// Combine the week's GitHub counts with the block-derived annotation rate.
pub fn weekly_metrics_from(
    prs_merged: u32,
    prs_reviewed: u32,
    avg_review_latency_hours: Option<f64>,
    week_blocks: &[WorkBlock],
) -> WeeklyMetrics {
    WeeklyMetrics {
        prs_merged,
        prs_reviewed,
        annotation_rate: annotation_rate(week_blocks),
        avg_review_latency_hours,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::ItemRef;
    use crate::types::ItemKind;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    fn block() -> WorkBlock {
        WorkBlock::start(
            "s1",
            ItemRef {
                kind: ItemKind::Issue,
                number: 1,
                title: "t".to_string(),
                url: String::new(),
            },
            t0(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn summary_counts_finished_blocks() {
        let mut done = block();
        done.mark_annotated().unwrap();
        done.end(t0() + Duration::minutes(45), None);
        let running = block();

        let summary = day_summary(&[done, running]);
        assert_eq!(summary.blocks_completed, 1);
        assert_eq!(summary.issues_annotated, 1);
        assert!((summary.total_minutes - 45.0).abs() < 1e-9);
        assert!((summary.annotation_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn annotation_rate_of_nothing_is_zero() {
        assert_eq!(annotation_rate(&[]), 0.0);
    }

    #[test]
    fn phase_balance_uses_history() {
        let mut b = block();
        b.advance(t0() + Duration::minutes(10)).unwrap();
        b.advance(t0() + Duration::minutes(40)).unwrap();
        b.end(t0() + Duration::minutes(50), None);

        let balance = phase_balance(&[b.clone()], t0() + Duration::hours(5));
        let get = |p: Phase| balance.iter().find(|x| x.phase == p).unwrap().total_minutes;
        assert!((get(Phase::Understand) - 10.0).abs() < 1e-9);
        assert!((get(Phase::Address) - 30.0).abs() < 1e-9);
        assert!((get(Phase::Test) - 10.0).abs() < 1e-9);
        assert!((focus_score(&[b], t0()) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn open_phase_counts_until_now() {
        let b = block();
        let balance = phase_balance(&[b], t0() + Duration::minutes(20));
        assert_eq!(balance.len(), 1);
        assert!((balance[0].total_minutes - 20.0).abs() < 1e-9);
        assert_eq!(balance[0].block_count, 1);
    }

    #[test]
    fn focus_without_time_is_zero() {
        assert_eq!(focus_score(&[], t0()), 0.0);
    }

    #[test]
    fn streak_breaks_on_gap() {
        let today = date(2026, 6, 10);
        let dates: BTreeSet<NaiveDate> =
            [date(2026, 6, 10), date(2026, 6, 9), date(2026, 6, 8), date(2026, 6, 6)]
                .into_iter()
                .collect();
        assert_eq!(streak_days(&dates, today), 3);
        assert_eq!(streak_days(&dates, date(2026, 6, 11)), 0);
    }

    #[test]
    fn streak_is_capped_by_window() {
        let today = date(2026, 6, 30);
        let dates: BTreeSet<NaiveDate> = (0..60).map(|i| today - Duration::days(i)).collect();
        assert_eq!(streak_days(&dates, today), (STREAK_WINDOW_DAYS + 1) as u32);
    }

    #[test]
    fn consistency_over_weekdays() {
        // 2026-06-12 is a Friday; the 14-day window holds 10 weekdays.
        let today = date(2026, 6, 12);
        let active: BTreeSet<NaiveDate> = (0..5).map(|i| today - Duration::days(i)).collect();
        assert!((consistency_score(&active, today) - 0.5).abs() < 1e-9);
        assert_eq!(consistency_score(&BTreeSet::new(), today), 0.0);
    }

    #[test]
    fn tips_follow_thresholds() {
        assert_eq!(habit_tips(Some(0.5), 0.2, 0.3).len(), 3);
        assert!(habit_tips(Some(0.9), 0.8, 0.9).is_empty());
        assert_eq!(habit_tips(None, 0.8, 0.9).len(), 0);
    }

    #[test]
    fn weekly_metrics_take_block_annotation_rate() {
        let mut a = block();
        a.mark_annotated().unwrap();
        let m = weekly_metrics_from(3, 5, Some(12.0), &[a, block()]);
        assert_eq!(m.prs_merged, 3);
        assert!((m.annotation_rate - 0.5).abs() < 1e-9);
    }
}
