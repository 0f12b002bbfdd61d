use crate::intake::WorkItem;
use crate::types::ItemKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tier assumed for unestimated work.
pub const DEFAULT_DIFFICULTY: u8 = 3;

// ---------------------------------------------------------------------------
// QueueItem
// ---------------------------------------------------------------------------

/// A scored unit of work. Rebuilt on every fetch, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub title: String,
    pub url: String,
    pub story_points: Option<f64>,
    /// 1 (trivial) to 5 (very hard).
    pub difficulty: u8,
    pub assigned_to_me: bool,
    pub needs_review: bool,
    pub age_hours: f64,
    pub confidence_score: f64,
    pub labels: Vec<String>,
    pub priority: String,
    pub explanation: Option<String>,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Step function over story points. Missing or non-positive estimates are
/// treated as unknown and land in the middle tier.
pub fn difficulty_tier(story_points: Option<f64>) -> u8 {
    match story_points {
        Some(sp) if sp > 0.0 => {
            if sp <= 2.0 {
                1
            } else if sp <= 4.0 {
                2
            } else if sp <= 7.0 {
                3
            } else if sp <= 12.0 {
                4
            } else {
                5
            }
        }
        _ => DEFAULT_DIFFICULTY,
    }
}

/// Hours between `created_at` and `now`, clamped at zero.
pub fn age_hours(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(created) = created_at else {
        return 0.0;
    };
    let hours = (now - created).num_milliseconds() as f64 / 3_600_000.0;
    if hours < 0.0 {
        tracing::debug!(%created, %now, "created_at is in the future; clamping age to 0");
        return 0.0;
    }
    hours
}

/// Score one item relative to `now`. Pure: the upstream confidence value is
/// carried through untouched (0 when absent).
pub fn score_item(item: &WorkItem, now: DateTime<Utc>) -> QueueItem {
    QueueItem {
        id: item.number,
        kind: item.kind,
        title: item.title.clone(),
        url: item.url.clone(),
        story_points: item.story_points,
        difficulty: difficulty_tier(item.story_points),
        assigned_to_me: item.assigned_to_me,
        needs_review: item.awaiting_my_review,
        age_hours: age_hours(item.created_at, now),
        confidence_score: item.upstream_score.unwrap_or(0.0),
        labels: item.labels.clone(),
        priority: item.priority.clone(),
        explanation: item.explanation.clone(),
    }
}

pub fn score_all(items: &[WorkItem], now: DateTime<Utc>) -> Vec<QueueItem> {
    items.iter().map(|i| score_item(i, now)).collect()
}

// ---------------------------------------------------------------------------
// Explanation
// ---------------------------------------------------------------------------

/// Human-readable reason an item sits where it does.
pub fn explain(item: &QueueItem) -> String {
    let mut reasons: Vec<String> = Vec::new();

    match item.priority.as_str() {
        "critical" | "blocker" => reasons.push("marked as critical/blocker".to_string()),
        "high" => reasons.push("high priority".to_string()),
        _ => {}
    }
    if item.needs_review {
        reasons.push("your review has been requested".to_string());
    }
    if item.assigned_to_me {
        reasons.push("assigned to you".to_string());
    }
    if let Some(sp) = item.story_points {
        if item.difficulty <= 2 {
            reasons.push(format!("small scope ({sp} SP, good for a focused session)"));
        } else if item.difficulty >= 4 {
            reasons.push(format!("larger scope ({sp} SP, plan accordingly)"));
        }
    }
    if reasons.is_empty() {
        reasons.push("good fit based on difficulty tier and queue position".to_string());
    }

    format!("Recommended because: {}.", reasons.join("; "))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn work(number: u64, sp: Option<f64>, score: Option<f64>) -> WorkItem {
        WorkItem {
            number,
            kind: ItemKind::Issue,
            title: format!("Item {number}"),
            url: format!("https://github.com/acme/app/issues/{number}"),
            story_points: sp,
            created_at: Some(now() - Duration::hours(30)),
            updated_at: None,
            assignees: vec![],
            assigned_to_me: false,
            awaiting_my_review: false,
            upstream_score: score,
            labels: vec!["b".to_string(), "a".to_string()],
            priority: "normal".to_string(),
            explanation: None,
            draft: false,
            issue_refs: BTreeSet::new(),
        }
    }

    #[test]
    fn difficulty_boundaries() {
        assert_eq!(difficulty_tier(Some(1.0)), 1);
        assert_eq!(difficulty_tier(Some(2.0)), 1);
        assert_eq!(difficulty_tier(Some(3.0)), 2);
        assert_eq!(difficulty_tier(Some(4.0)), 2);
        assert_eq!(difficulty_tier(Some(5.0)), 3);
        assert_eq!(difficulty_tier(Some(7.0)), 3);
        assert_eq!(difficulty_tier(Some(8.0)), 4);
        assert_eq!(difficulty_tier(Some(12.0)), 4);
        assert_eq!(difficulty_tier(Some(13.0)), 5);
        assert_eq!(difficulty_tier(Some(100.0)), 5);
        assert_eq!(difficulty_tier(None), 3);
    }

    #[test]
    fn non_positive_estimate_is_unestimated() {
        assert_eq!(difficulty_tier(Some(0.0)), 3);
        assert_eq!(difficulty_tier(Some(-4.0)), 3);
    }

    #[test]
    fn age_is_hours_since_creation() {
        let created = now() - Duration::minutes(90);
        assert!((age_hours(Some(created), now()) - 1.5).abs() < 1e-9);
        assert_eq!(age_hours(None, now()), 0.0);
    }

    #[test]
    fn future_creation_clamps_to_zero() {
        let created = now() + Duration::hours(2);
        assert_eq!(age_hours(Some(created), now()), 0.0);
    }

    #[test]
    fn missing_score_defaults_to_zero() {
        let q = score_item(&work(1, Some(3.0), None), now());
        assert_eq!(q.confidence_score, 0.0);
        assert_eq!(q.difficulty, 2);
    }

    #[test]
    fn scoring_is_idempotent_for_same_now() {
        let item = work(4, Some(8.0), Some(0.6));
        assert_eq!(score_item(&item, now()), score_item(&item, now()));
    }

    #[test]
    fn age_moves_with_now() {
        let item = work(4, None, Some(0.6));
        let earlier = score_item(&item, now());
        let later = score_item(&item, now() + Duration::hours(2));
        assert!((later.age_hours - earlier.age_hours - 2.0).abs() < 1e-9);
        assert_eq!(earlier.confidence_score, later.confidence_score);
    }

    #[test]
    fn labels_keep_display_order() {
        let q = score_item(&work(1, None, None), now());
        assert_eq!(q.labels, vec!["b", "a"]);
    }

    #[test]
    fn queue_item_serializes_camel_case() {
        let q = score_item(&work(1, Some(2.0), Some(0.9)), now());
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["type"], "issue");
        assert_eq!(json["storyPoints"], 2.0);
        assert_eq!(json["confidenceScore"], 0.9);
        assert_eq!(json["assignedToMe"], false);
        assert!(json["explanation"].is_null());
    }

    #[test]
    fn explanation_lists_reasons() {
        let mut item = work(1, Some(1.0), None);
        item.priority = "critical".to_string();
        item.assigned_to_me = true;
        let text = explain(&score_item(&item, now()));
        assert!(text.starts_with("Recommended because: "));
        assert!(text.contains("critical"));
        assert!(text.contains("assigned to you"));
        assert!(text.contains("small scope"));
    }

    #[test]
    fn explanation_has_fallback() {
        let text = explain(&score_item(&work(1, None, None), now()));
        assert!(text.contains("good fit"));
    }
}
