use crate::output::{percent, print_json, print_table};
use anyhow::Context;
use chrono::{DateTime, Utc};
use devcoach_core::signals::{
    consistency_score, day_summary, focus_score, habit_tips, phase_balance, streak_days,
};
use devcoach_core::state::State;
use std::path::Path;

pub fn run(root: &Path, now: DateTime<Utc>, json: bool) -> anyhow::Result<()> {
    let state = State::load(root).context("failed to load state")?;
    let today = now.date_naive();

    let all: Vec<_> = state.blocks().cloned().collect();
    let today_blocks = state.blocks_on(today);
    let summary = day_summary(&today_blocks);
    let balance = phase_balance(&all, now);
    let focus = focus_score(&all, now);
    let streak = streak_days(&state.ended_dates(), today);
    let consistency = consistency_score(&state.active_dates(), today);
    let tips = habit_tips(
        (!today_blocks.is_empty()).then_some(summary.annotation_rate),
        focus,
        consistency,
    );

    if json {
        let value = serde_json::json!({
            "today": summary,
            "phase_balance": balance,
            "focus_score": focus,
            "streak_days": streak,
            "consistency_score": consistency,
            "tips": tips,
        });
        return print_json(&value);
    }

    println!(
        "Today: {} block(s) done, {} annotated, {:.0} min",
        summary.blocks_completed, summary.issues_annotated, summary.total_minutes
    );
    println!("Streak: {streak} day(s)");
    println!("Focus: {}  Consistency: {}", percent(focus), percent(consistency));
    if !balance.is_empty() {
        println!();
        let rows = balance
            .iter()
            .map(|b| {
                vec![
                    b.phase.to_string(),
                    format!("{:.0}", b.total_minutes),
                    b.block_count.to_string(),
                ]
            })
            .collect();
        print_table(&["PHASE", "MINUTES", "BLOCKS"], rows);
    }
    if !tips.is_empty() {
        println!();
        for tip in &tips {
            println!("tip: {tip}");
        }
    }
    Ok(())
}
