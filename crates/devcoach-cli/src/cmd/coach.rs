use crate::output::{hours, or_dash, percent, print_json};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use devcoach_core::coaching::{classify, week_start, CoachingProfile, WeeklyMetrics};
use devcoach_core::config::Config;
use devcoach_core::signals::weekly_metrics_from;
use devcoach_core::state::State;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum CoachSubcommand {
    /// Classify a week's metrics without storing anything
    Classify {
        /// PRs merged this week
        #[arg(long)]
        merged: u32,
        /// PRs reviewed this week
        #[arg(long)]
        reviewed: u32,
        /// Share of work blocks annotated (0..=1)
        #[arg(long)]
        annotation_rate: f64,
        /// Average review latency in hours (omit if unknown)
        #[arg(long)]
        latency: Option<f64>,
    },

    /// Refresh the stored weekly profile (kept as-is within the same week)
    Profile {
        /// PRs merged this week
        #[arg(long)]
        merged: u32,
        /// PRs reviewed this week
        #[arg(long)]
        reviewed: u32,
        /// Average review latency in hours (omit if unknown)
        #[arg(long)]
        latency: Option<f64>,
        /// Override the annotation rate computed from this week's blocks
        #[arg(long)]
        annotation_rate: Option<f64>,
    },

    /// Show the stored profile
    Show,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(
    root: &Path,
    subcmd: CoachSubcommand,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        CoachSubcommand::Classify {
            merged,
            reviewed,
            annotation_rate,
            latency,
        } => {
            let metrics = WeeklyMetrics {
                prs_merged: merged,
                prs_reviewed: reviewed,
                annotation_rate,
                avg_review_latency_hours: latency,
            };
            run_classify(root, metrics, json)
        }
        CoachSubcommand::Profile {
            merged,
            reviewed,
            latency,
            annotation_rate,
        } => run_profile(root, merged, reviewed, latency, annotation_rate, now, json),
        CoachSubcommand::Show => run_show(root, json),
    }
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

fn run_classify(root: &Path, metrics: WeeklyMetrics, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    metrics.validate()?;
    let level = classify(&metrics, &config.coaching);

    if json {
        let value = serde_json::json!({
            "coaching_level": level,
            "metrics": metrics,
        });
        return print_json(&value);
    }
    println!("{level}");
    Ok(())
}

// ---------------------------------------------------------------------------
// profile
// ---------------------------------------------------------------------------

fn run_profile(
    root: &Path,
    merged: u32,
    reviewed: u32,
    latency: Option<f64>,
    annotation_rate: Option<f64>,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let mut state = State::load(root).context("failed to load state")?;

    let monday = week_start(now.date_naive());
    let week_blocks = state.blocks_between(monday, monday + Duration::days(6));
    let mut metrics = weekly_metrics_from(merged, reviewed, latency, &week_blocks);
    if let Some(rate) = annotation_rate {
        metrics.annotation_rate = rate;
    }

    let profile = CoachingProfile::refresh(state.profile.as_ref(), metrics, now, &config.coaching)
        .context("cannot compute coaching profile")?;
    state.profile = Some(profile.clone());
    state.save(root).context("failed to save state")?;

    if json {
        return print_json(&profile);
    }
    print_profile(&profile);
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn run_show(root: &Path, json: bool) -> anyhow::Result<()> {
    let state = State::load(root).context("failed to load state")?;

    if json {
        return print_json(&state.profile);
    }
    match state.profile {
        None => println!("No coaching profile yet. Mode defaults to ransom."),
        Some(ref p) => print_profile(p),
    }
    Ok(())
}

fn print_profile(p: &CoachingProfile) {
    println!("Week of {}: {}", p.week_start, p.coaching_level);
    println!("  PRs merged:     {}", p.metrics.prs_merged);
    println!("  PRs reviewed:   {}", p.metrics.prs_reviewed);
    println!("  annotated:      {}", percent(p.metrics.annotation_rate));
    println!(
        "  review latency: {}",
        or_dash(p.metrics.avg_review_latency_hours.map(hours))
    );
}
