use crate::output::{hours, or_dash, print_json, print_table};
use anyhow::Context;
use chrono::{DateTime, Utc};
use devcoach_core::config::Config;
use devcoach_core::hygiene::{self, RepoHealth};
use devcoach_core::intake::{intake_all, RawItem, WorkItem};
use devcoach_core::queue::{build_queue, fill_explanations, recommendations_with_limit};
use devcoach_core::score::{score_all, QueueItem};
use std::path::Path;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Read a JSON array of fetcher records and validate it.
fn load_items(path: &Path) -> anyhow::Result<Vec<WorkItem>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raws: Vec<RawItem> = serde_json::from_str(&data)
        .with_context(|| format!("{} is not a JSON array of items", path.display()))?;
    let items = intake_all(raws).context("rejected item batch")?;
    tracing::debug!(count = items.len(), path = %path.display(), "items loaded");
    Ok(items)
}

fn queue_rows(items: &[QueueItem]) -> Vec<Vec<String>> {
    items
        .iter()
        .enumerate()
        .map(|(i, q)| {
            vec![
                (i + 1).to_string(),
                format!("#{}", q.id),
                q.kind.to_string(),
                q.difficulty.to_string(),
                or_dash(q.story_points),
                hours(q.age_hours),
                q.title.clone(),
            ]
        })
        .collect()
}

const QUEUE_HEADERS: [&str; 7] = ["POS", "ITEM", "TYPE", "DIFF", "SP", "AGE", "TITLE"];

// ---------------------------------------------------------------------------
// queue
// ---------------------------------------------------------------------------

pub fn run_queue(items: &Path, now: DateTime<Utc>, json: bool) -> anyhow::Result<()> {
    let scored = score_all(&load_items(items)?, now);
    let queue = build_queue(&scored);

    if json {
        return print_json(&queue);
    }
    if queue.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }
    print_table(&QUEUE_HEADERS, queue_rows(&queue));
    Ok(())
}

// ---------------------------------------------------------------------------
// recommend
// ---------------------------------------------------------------------------

pub fn run_recommend(
    root: &Path,
    items: &Path,
    limit: Option<usize>,
    now: DateTime<Utc>,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let limit = limit.unwrap_or(config.queue.recommendation_count);
    let scored = score_all(&load_items(items)?, now);
    let mut top = recommendations_with_limit(&scored, limit);
    fill_explanations(&mut top);

    if json {
        return print_json(&top);
    }
    if top.is_empty() {
        println!("Nothing to recommend.");
        return Ok(());
    }
    for (i, q) in top.iter().enumerate() {
        println!(
            "{}. #{} [{}] {} (difficulty {})",
            i + 1,
            q.id,
            q.kind,
            q.title,
            q.difficulty
        );
        if let Some(ref why) = q.explanation {
            println!("   {why}");
        }
        if !q.url.is_empty() {
            println!("   {}", q.url);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// health
// ---------------------------------------------------------------------------

pub fn run_health(root: &Path, items: &Path, now: DateTime<Utc>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let report = hygiene::analyze(&load_items(items)?, now, &config.hygiene);

    if json {
        return print_json(&report);
    }
    print_health(&report);
    Ok(())
}

fn print_health(report: &RepoHealth) {
    if report.is_clean() {
        println!("Repository looks healthy. No hygiene issues.");
        return;
    }
    println!("Hygiene issues: {}", report.total_hygiene_issues);
    let sections: [(&str, &[QueueItem]); 4] = [
        ("Issues without a linked PR", &report.issues_without_prs),
        ("PRs without a linked issue", &report.prs_without_issues),
        ("PRs awaiting your review", &report.prs_awaiting_review),
        ("Stale issues", &report.stale_issues),
    ];
    for (label, items) in sections {
        if items.is_empty() {
            continue;
        }
        println!();
        println!("{label} ({}):", items.len());
        for q in items {
            println!("  #{:<6} {:>7}  {}", q.id, hours(q.age_hours), q.title);
        }
    }
}
