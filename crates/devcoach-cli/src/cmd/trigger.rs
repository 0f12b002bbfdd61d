use crate::output::print_json;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use devcoach_core::config::Config;
use devcoach_core::state::State;
use devcoach_core::trigger::{Nudge, PromptContext, TriggerPolicy};
use devcoach_core::types::Trigger;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum TriggerSubcommand {
    /// Decide whether a named trigger should prompt the user now
    Check {
        /// Trigger name, e.g. pomodoro_break, pre_merge, stuck
        name: String,
        /// Minutes since last activity (default: from recorded activity)
        #[arg(long)]
        idle_minutes: Option<u32>,
        /// Minutes since last check-in (default: from recorded check-ins)
        #[arg(long)]
        since_check_in: Option<u32>,
    },

    /// Poll the stuck detector; fires at most once per idle episode
    Stuck {
        /// Minutes since last activity (default: from recorded activity)
        #[arg(long)]
        idle_minutes: Option<u32>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(
    root: &Path,
    subcmd: TriggerSubcommand,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        TriggerSubcommand::Check {
            name,
            idle_minutes,
            since_check_in,
        } => check(root, &name, idle_minutes, since_check_in, now, json),
        TriggerSubcommand::Stuck { idle_minutes } => stuck(root, idle_minutes, now, json),
    }
}

/// Explicit minutes win; otherwise measure from the recorded instant, or
/// zero when nothing was recorded.
fn elapsed(minutes: Option<u32>, since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    match (minutes, since) {
        (Some(m), _) => Duration::minutes(i64::from(m)),
        (None, Some(t)) => (now - t).max(Duration::zero()),
        (None, None) => Duration::zero(),
    }
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

fn check(
    root: &Path,
    name: &str,
    idle_minutes: Option<u32>,
    since_check_in: Option<u32>,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    let trigger: Trigger = name.parse()?;
    let config = Config::load(root).context("failed to load config")?;
    let mut state = State::load(root).context("failed to load state")?;

    let block = state.current_block();
    let phase = block.map(|b| b.phase);
    let last_check_in = state.last_check_in.or(block.map(|b| b.started_at));
    let ctx = PromptContext::new(phase)
        .idle(elapsed(idle_minutes, state.last_activity, now))
        .since_check_in(elapsed(since_check_in, last_check_in, now));

    let mode = state.coaching_level();
    let policy = TriggerPolicy::new(config.triggers);

    // Stuck goes through the tracker so it fires once per idle episode.
    let nudge = if trigger.canonical() == Trigger::Stuck {
        let session = state.idle_session_id(now);
        let fired = state.stuck.poll(&policy, &session, mode, phase, ctx.idle);
        if fired {
            state.save(root).context("failed to save state")?;
        }
        fired.then_some(Nudge::StuckCheck)
    } else {
        policy.nudge(trigger, mode, &ctx)
    };

    // A delivered pomodoro nudge is the check-in.
    if nudge == Some(Nudge::PomodoroCheckIn) {
        state.record_check_in(now);
        state.save(root).context("failed to save state")?;
    }

    if json {
        let value = serde_json::json!({
            "trigger": trigger.canonical(),
            "mode": mode,
            "phase": phase,
            "prompt": nudge.is_some(),
            "nudge": nudge,
        });
        return print_json(&value);
    }
    match nudge {
        Some(n) => println!("prompt: {n}"),
        None => println!("no prompt ({} in {mode} mode)", trigger.canonical()),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// stuck
// ---------------------------------------------------------------------------

fn stuck(
    root: &Path,
    idle_minutes: Option<u32>,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let mut state = State::load(root).context("failed to load state")?;

    let mode = state.coaching_level();
    let phase = state.current_block().map(|b| b.phase);
    let idle = elapsed(idle_minutes, state.last_activity, now);
    let session = state.idle_session_id(now);
    let policy = TriggerPolicy::new(config.triggers);
    let fired = state.stuck.poll(&policy, &session, mode, phase, idle);
    if fired {
        state.save(root).context("failed to save state")?;
    }

    if json {
        let value = serde_json::json!({
            "session": session,
            "mode": mode,
            "idle_minutes": idle.num_minutes(),
            "fired": fired,
        });
        return print_json(&value);
    }
    if fired {
        println!("stuck: checking in after {} min idle", idle.num_minutes());
    } else {
        println!("not stuck");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// activity
// ---------------------------------------------------------------------------

pub fn record_activity(root: &Path, now: DateTime<Utc>, json: bool) -> anyhow::Result<()> {
    let mut state = State::load(root).context("failed to load state")?;
    state.record_activity(now);
    state.save(root).context("failed to save state")?;

    if json {
        return print_json(&serde_json::json!({ "last_activity": now }));
    }
    println!("Activity recorded at {}.", now.to_rfc3339());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn elapsed_prefers_explicit_minutes() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let earlier = now - Duration::minutes(40);
        assert_eq!(elapsed(Some(5), Some(earlier), now), Duration::minutes(5));
        assert_eq!(elapsed(None, Some(earlier), now), Duration::minutes(40));
        assert_eq!(elapsed(None, None, now), Duration::zero());
        assert_eq!(elapsed(None, Some(now + Duration::hours(1)), now), Duration::zero());
    }

    #[test]
    fn elapsed_handles_largest_minutes() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let idle = elapsed(Some(u32::MAX), None, now);
        assert_eq!(idle.num_minutes(), i64::from(u32::MAX));
    }
}
