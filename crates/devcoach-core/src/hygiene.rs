use crate::config::HygieneConfig;
use crate::intake::WorkItem;
use crate::score::{score_item, QueueItem};
use crate::types::ItemKind;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// RepoHealth
// ---------------------------------------------------------------------------

/// Point-in-time hygiene snapshot. Categories overlap; the total counts an
/// item once per category it appears in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoHealth {
    pub issues_without_prs: Vec<QueueItem>,
    pub prs_without_issues: Vec<QueueItem>,
    pub prs_awaiting_review: Vec<QueueItem>,
    pub stale_issues: Vec<QueueItem>,
    pub total_hygiene_issues: usize,
}

impl RepoHealth {
    fn recount(&mut self) {
        self.total_hygiene_issues = self.issues_without_prs.len()
            + self.prs_without_issues.len()
            + self.prs_awaiting_review.len()
            + self.stale_issues.len();
    }

    pub fn is_clean(&self) -> bool {
        self.total_hygiene_issues == 0
    }
}

// ---------------------------------------------------------------------------
// analyze()
// ---------------------------------------------------------------------------

/// Partition one repo's open items into the four hygiene categories.
pub fn analyze(items: &[WorkItem], now: DateTime<Utc>, cfg: &HygieneConfig) -> RepoHealth {
    let linked: BTreeSet<u64> = items
        .iter()
        .filter(|i| i.kind == ItemKind::PullRequest)
        .flat_map(|pr| pr.issue_refs.iter().copied())
        .collect();

    let stale_window = Duration::hours(i64::from(cfg.stale_after_hours));
    let mut health = RepoHealth::default();

    for item in items {
        let scored = score_item(item, now);
        match item.kind {
            ItemKind::Issue => {
                if !linked.contains(&item.number) {
                    health.issues_without_prs.push(scored.clone());
                }
                if is_stale(item, &scored, now, stale_window, cfg) {
                    health.stale_issues.push(scored);
                }
            }
            ItemKind::PullRequest => {
                if item.issue_refs.is_empty() {
                    if item.draft && !cfg.include_draft_prs {
                        tracing::debug!(number = item.number, "skipping draft PR without issue");
                    } else {
                        health.prs_without_issues.push(scored.clone());
                    }
                }
                if item.awaiting_my_review {
                    health.prs_awaiting_review.push(scored);
                }
            }
        }
    }

    health.recount();
    health
}

/// Old enough, not touched within the same window when we know the last
/// update time, and either unowned or ours. Issues a teammate holds are theirs
/// to chase.
fn is_stale(
    item: &WorkItem,
    scored: &QueueItem,
    now: DateTime<Utc>,
    window: Duration,
    cfg: &HygieneConfig,
) -> bool {
    if scored.age_hours < f64::from(cfg.stale_after_hours) {
        return false;
    }
    if !item.assignees.is_empty() && !item.assigned_to_me {
        return false;
    }
    match item.updated_at {
        Some(updated) => now - updated >= window,
        None => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap()
    }

    fn issue(number: u64, age_hours: i64) -> WorkItem {
        WorkItem {
            number,
            kind: ItemKind::Issue,
            title: format!("issue {number}"),
            url: String::new(),
            story_points: None,
            created_at: Some(now() - Duration::hours(age_hours)),
            updated_at: None,
            assignees: vec![],
            assigned_to_me: false,
            awaiting_my_review: false,
            upstream_score: None,
            labels: vec![],
            priority: "normal".to_string(),
            explanation: None,
            draft: false,
            issue_refs: BTreeSet::new(),
        }
    }

    fn pr(number: u64, refs: &[u64], awaiting: bool) -> WorkItem {
        WorkItem {
            kind: ItemKind::PullRequest,
            title: format!("pr {number}"),
            awaiting_my_review: awaiting,
            issue_refs: refs.iter().copied().collect(),
            ..issue(number, 1)
        }
    }

    fn numbers(items: &[QueueItem]) -> Vec<u64> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn empty_repo_is_clean() {
        let health = analyze(&[], now(), &HygieneConfig::default());
        assert!(health.is_clean());
    }

    #[test]
    fn issue_linkage() {
        let items = vec![issue(1, 5), issue(2, 5), pr(10, &[2], false)];
        let health = analyze(&items, now(), &HygieneConfig::default());
        assert_eq!(numbers(&health.issues_without_prs), vec![1]);
        assert!(health.prs_without_issues.is_empty());
    }

    #[test]
    fn pr_without_issue_and_awaiting_review_counts_twice() {
        let items = vec![pr(11, &[], true)];
        let health = analyze(&items, now(), &HygieneConfig::default());
        assert_eq!(numbers(&health.prs_without_issues), vec![11]);
        assert_eq!(numbers(&health.prs_awaiting_review), vec![11]);
        assert_eq!(health.total_hygiene_issues, 2);
    }

    #[test]
    fn draft_prs_skipped_unless_configured() {
        let mut draft = pr(12, &[], false);
        draft.draft = true;
        let items = vec![draft];

        let health = analyze(&items, now(), &HygieneConfig::default());
        assert!(health.prs_without_issues.is_empty());

        let cfg = HygieneConfig {
            include_draft_prs: true,
            ..HygieneConfig::default()
        };
        assert_eq!(analyze(&items, now(), &cfg).prs_without_issues.len(), 1);
    }

    #[test]
    fn stale_threshold_is_inclusive() {
        let items = vec![issue(1, 167), issue(2, 168), issue(3, 500)];
        let health = analyze(&items, now(), &HygieneConfig::default());
        assert_eq!(numbers(&health.stale_issues), vec![2, 3]);
    }

    #[test]
    fn recent_activity_keeps_old_issue_fresh() {
        let mut touched = issue(1, 400);
        touched.updated_at = Some(now() - Duration::hours(3));
        let mut quiet = issue(2, 400);
        quiet.updated_at = Some(now() - Duration::days(9));
        let health = analyze(&[touched, quiet], now(), &HygieneConfig::default());
        assert_eq!(numbers(&health.stale_issues), vec![2]);
    }

    #[test]
    fn stale_unlinked_issue_appears_in_both_lists() {
        let items = vec![issue(4, 200)];
        let health = analyze(&items, now(), &HygieneConfig::default());
        assert_eq!(numbers(&health.issues_without_prs), vec![4]);
        assert_eq!(numbers(&health.stale_issues), vec![4]);
        assert_eq!(health.total_hygiene_issues, 2);
    }

    #[test]
    fn stale_skips_issues_owned_by_teammates() {
        let unowned = issue(1, 300);
        let mut mine = issue(2, 300);
        mine.assignees = vec!["me".to_string()];
        mine.assigned_to_me = true;
        let mut theirs = issue(3, 300);
        theirs.assignees = vec!["teammate".to_string()];

        let health = analyze(&[unowned, mine, theirs], now(), &HygieneConfig::default());
        assert_eq!(numbers(&health.stale_issues), vec![1, 2]);
        assert_eq!(numbers(&health.issues_without_prs), vec![1, 2, 3]);
    }

    #[test]
    fn input_order_preserved() {
        let items = vec![issue(9, 1), issue(3, 1), issue(5, 1)];
        let health = analyze(&items, now(), &HygieneConfig::default());
        assert_eq!(numbers(&health.issues_without_prs), vec![9, 3, 5]);
    }

    #[test]
    fn serializes_camel_case() {
        let health = analyze(&[pr(1, &[], true)], now(), &HygieneConfig::default());
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["totalHygieneIssues"], 2);
        assert!(json["prsAwaitingReview"].is_array());
    }
}
