use crate::output::print_json;
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use devcoach_core::block::{EndOutcome, ItemRef, WorkBlock};
use devcoach_core::config::Config;
use devcoach_core::state::State;
use devcoach_core::trigger::{PromptContext, TriggerPolicy};
use devcoach_core::types::ItemKind;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum BlockSubcommand {
    /// Start a work block on an issue or pull request
    Start {
        /// Issue or PR number
        #[arg(long)]
        number: u64,
        /// Title at the time the block starts
        #[arg(long)]
        title: String,
        /// Link to the item
        #[arg(long, default_value = "")]
        url: String,
        /// Item type: issue or pull_request
        #[arg(long = "type", value_name = "TYPE", default_value = "issue")]
        kind: String,
    },

    /// Move the running block to its next phase
    Advance,

    /// End the running block from any phase
    End {
        /// What happened, for the record
        #[arg(long)]
        notes: Option<String>,
        /// Pull request opened for this work
        #[arg(long)]
        pr_url: Option<String>,
        /// The issue was annotated before ending
        #[arg(long)]
        annotated: bool,
    },

    /// Show the running block
    Show,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(
    root: &Path,
    subcmd: BlockSubcommand,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        BlockSubcommand::Start {
            number,
            title,
            url,
            kind,
        } => start(root, number, title, url, &kind, now, json),
        BlockSubcommand::Advance => advance(root, now, json),
        BlockSubcommand::End {
            notes,
            pr_url,
            annotated,
        } => end(root, notes, pr_url, annotated, now, json),
        BlockSubcommand::Show => show(root, now, json),
    }
}

fn load_state(root: &Path) -> anyhow::Result<State> {
    State::load(root).context("failed to load state")
}

fn save_state(root: &Path, state: &State) -> anyhow::Result<()> {
    state.save(root).context("failed to save state")
}

// ---------------------------------------------------------------------------
// start
// ---------------------------------------------------------------------------

fn start(
    root: &Path,
    number: u64,
    title: String,
    url: String,
    kind: &str,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    let mut state = load_state(root)?;
    let item_ref = ItemRef {
        kind: ItemKind::from_upstream(Some(kind)),
        number,
        title,
        url,
    };
    let block = state
        .working_session(now)
        .start_block(item_ref, now)
        .context("cannot start block")?
        .clone();
    state.record_activity(now);
    state.record_check_in(now);
    save_state(root, &state)?;

    if json {
        return print_json(&block);
    }
    println!(
        "Started block {} on #{} [{}]: {}",
        block.id, block.item_ref.number, block.phase, block.item_ref.title
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// advance
// ---------------------------------------------------------------------------

fn advance(root: &Path, now: DateTime<Utc>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let mut state = load_state(root)?;
    let events = state
        .working_session(now)
        .advance_current(now)
        .context("cannot advance block")?;
    state.record_activity(now);
    save_state(root, &state)?;

    let block = state
        .current_block()
        .context("running block disappeared after advance")?;
    let policy = TriggerPolicy::new(config.triggers);
    let mode = state.coaching_level();
    let since_check_in = now - state.last_check_in.unwrap_or(block.started_at);
    let ctx = PromptContext::new(Some(block.phase)).since_check_in(since_check_in);
    let nudges: Vec<_> = events
        .iter()
        .filter_map(|e| policy.nudge(e.trigger, mode, &ctx))
        .collect();

    if json {
        let value = serde_json::json!({
            "block": block,
            "events": events,
            "mode": mode,
            "nudges": nudges,
        });
        return print_json(&value);
    }
    println!("Block {} is now in phase '{}'.", block.id, block.phase);
    for event in &events {
        println!("  trigger: {}", event.trigger);
    }
    for nudge in &nudges {
        println!("  nudge:   {nudge}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// end
// ---------------------------------------------------------------------------

fn end(
    root: &Path,
    notes: Option<String>,
    pr_url: Option<String>,
    annotated: bool,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    let mut state = load_state(root)?;
    let (outcome, ended) = match state.active_session_mut() {
        Some(session) => {
            let block = session
                .current_mut()
                .context("no running block to end")?;
            if let Some(url) = pr_url {
                block.set_pr_url(url)?;
            }
            if annotated {
                block.mark_annotated()?;
            }
            let ended = block.clone();
            let outcome = session.end_current(now, notes)?;
            let ended = session.last().cloned().unwrap_or(ended);
            state.record_activity(now);
            save_state(root, &state)?;
            (outcome, ended)
        }
        // Retried end: report the last block, change nothing.
        None => {
            let last = state
                .last_block()
                .cloned()
                .context("no work block to end")?;
            (EndOutcome::AlreadyEnded, last)
        }
    };

    if json {
        let value = serde_json::json!({
            "outcome": outcome,
            "block": ended,
        });
        return print_json(&value);
    }
    match outcome {
        EndOutcome::Ended => println!(
            "Ended block {} in phase '{}' after {} min.",
            ended.id,
            ended.phase,
            ended.duration(now).num_minutes()
        ),
        EndOutcome::AlreadyEnded => println!("Block {} had already ended.", ended.id),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, now: DateTime<Utc>, json: bool) -> anyhow::Result<()> {
    let state = load_state(root)?;
    let block = state.current_block();

    if json {
        return print_json(&block);
    }
    match block {
        None => println!("No running block."),
        Some(b) => print_block(b, now),
    }
    Ok(())
}

fn print_block(b: &WorkBlock, now: DateTime<Utc>) {
    println!(
        "Block {} on #{} [{}]: {}",
        b.id, b.item_ref.number, b.item_ref.kind, b.item_ref.title
    );
    println!("  phase:   {}", b.phase);
    println!("  running: {} min", b.duration(now).num_minutes());
    for step in &b.phase_history {
        let until = step.exited.unwrap_or(now);
        println!(
            "  - {:<10} {} min",
            step.phase.as_str(),
            (until - step.entered).num_minutes()
        );
    }
    if let Some(ref url) = b.pr_url {
        println!("  pr:      {url}");
    }
}
