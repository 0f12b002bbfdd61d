//! Boundary validation for fetcher records.
//!
//! The fetcher hands over loosely-typed JSON. Everything downstream works on
//! [`WorkItem`], which is only constructible from a record that carries its
//! identity fields. Optional fields are resolved here, once, so scoring and
//! hygiene never branch on raw strings.

use crate::error::{CoachError, Result};
use crate::types::ItemKind;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const DEFAULT_PRIORITY: &str = "normal";

// ---------------------------------------------------------------------------
// RawItem
// ---------------------------------------------------------------------------

/// One open issue or pull request as delivered by the fetcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub story_points: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Logins of everyone assigned.
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub is_assigned_to_user: bool,
    #[serde(default)]
    pub awaiting_review_from_user: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    /// Issue numbers the fetcher already knows this PR is linked to.
    #[serde(default)]
    pub linked_issues: Vec<u64>,
}

// ---------------------------------------------------------------------------
// WorkItem
// ---------------------------------------------------------------------------

/// A validated, normalized record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub number: u64,
    pub kind: ItemKind,
    pub title: String,
    pub url: String,
    pub story_points: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub assignees: Vec<String>,
    pub assigned_to_me: bool,
    pub awaiting_my_review: bool,
    pub upstream_score: Option<f64>,
    pub labels: Vec<String>,
    pub priority: String,
    pub explanation: Option<String>,
    pub draft: bool,
    /// Issues referenced by this item. Always empty for issues.
    pub issue_refs: BTreeSet<u64>,
}

impl TryFrom<RawItem> for WorkItem {
    type Error = CoachError;

    fn try_from(raw: RawItem) -> Result<Self> {
        let number = raw.number.ok_or(CoachError::InvalidItem {
            field: "number",
            number: None,
        })?;
        let title = raw
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or(CoachError::InvalidItem {
                field: "title",
                number: Some(number),
            })?;

        let kind = ItemKind::from_upstream(raw.kind.as_deref());
        let body = raw.body.as_deref();

        let story_points = raw
            .story_points
            .or_else(|| story_points_from_labels(&raw.labels))
            .or_else(|| body.and_then(story_points_from_body));

        let priority = raw
            .priority
            .map(|p| p.trim().to_ascii_lowercase())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| priority_from_labels(&raw.labels).to_string());

        let issue_refs = if kind.is_pr() {
            let mut refs: BTreeSet<u64> = raw.linked_issues.iter().copied().collect();
            refs.extend(issue_refs(&title));
            if let Some(body) = body {
                refs.extend(issue_refs(body));
            }
            refs.remove(&number);
            refs
        } else {
            BTreeSet::new()
        };

        Ok(WorkItem {
            number,
            kind,
            title,
            url: raw.url,
            story_points,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            assignees: raw.assignees,
            assigned_to_me: raw.is_assigned_to_user,
            awaiting_my_review: raw.awaiting_review_from_user,
            upstream_score: raw.score.filter(|s| !s.is_nan()),
            labels: raw.labels,
            priority,
            explanation: raw.explanation.filter(|e| !e.trim().is_empty()),
            draft: raw.draft,
            issue_refs,
        })
    }
}

/// Validate a whole fetch. The first invalid record rejects the batch.
pub fn intake_all(raws: Vec<RawItem>) -> Result<Vec<WorkItem>> {
    raws.into_iter().map(WorkItem::try_from).collect()
}

// ---------------------------------------------------------------------------
// Label and body parsing
// ---------------------------------------------------------------------------

static SP_LABEL_RE: OnceLock<Regex> = OnceLock::new();
static SP_BODY_RE: OnceLock<Regex> = OnceLock::new();
static ISSUE_REF_RE: OnceLock<Regex> = OnceLock::new();

fn sp_label_re() -> &'static Regex {
    SP_LABEL_RE.get_or_init(|| Regex::new(r"(?i)^sp:\s*(\d+(?:\.\d+)?)$").unwrap())
}

fn sp_body_re() -> &'static Regex {
    SP_BODY_RE
        .get_or_init(|| Regex::new(r"(?i)\*\*Story\s+Points:\*\*\s*(\d+(?:\.\d+)?)").unwrap())
}

fn issue_ref_re() -> &'static Regex {
    ISSUE_REF_RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?|refs?|references?|see)\s*:?\s*)?#(\d+)\b",
        )
        .unwrap()
    })
}

/// First `sp:<n>` label wins.
pub fn story_points_from_labels(labels: &[String]) -> Option<f64> {
    labels.iter().find_map(|label| {
        sp_label_re()
            .captures(label.trim())
            .and_then(|c| c[1].parse().ok())
    })
}

/// `**Story Points:** <n>` anywhere in the body.
pub fn story_points_from_body(body: &str) -> Option<f64> {
    sp_body_re()
        .captures(body)
        .and_then(|c| c[1].parse().ok())
}

pub fn priority_from_labels(labels: &[String]) -> &'static str {
    let names: Vec<String> = labels.iter().map(|l| l.trim().to_ascii_lowercase()).collect();
    let has = |candidates: &[&str]| names.iter().any(|n| candidates.contains(&n.as_str()));
    if has(&["critical", "blocker", "p0"]) {
        "critical"
    } else if has(&["high", "high-priority", "p1"]) {
        "high"
    } else {
        DEFAULT_PRIORITY
    }
}

/// Issue numbers referenced as `#<n>`, optionally after a closing keyword.
pub fn issue_refs(text: &str) -> BTreeSet<u64> {
    issue_ref_re()
        .captures_iter(text)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
