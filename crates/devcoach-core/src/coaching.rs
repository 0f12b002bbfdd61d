use crate::config::CoachingThresholds;
use crate::error::{CoachError, Result};
use crate::types::CoachingLevel;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// WeeklyMetrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyMetrics {
    pub prs_merged: u32,
    pub prs_reviewed: u32,
    /// Share of work blocks annotated before they ended, 0..=1.
    pub annotation_rate: f64,
    /// `None` when no review latency could be measured this week.
    #[serde(default)]
    pub avg_review_latency_hours: Option<f64>,
}

impl WeeklyMetrics {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.annotation_rate) {
            return Err(CoachError::InvalidMetrics(format!(
                "annotation_rate must be within 0..=1, got {}",
                self.annotation_rate
            )));
        }
        if let Some(latency) = self.avg_review_latency_hours {
            if latency.is_nan() || latency < 0.0 {
                return Err(CoachError::InvalidMetrics(format!(
                    "avg_review_latency_hours must be non-negative, got {latency}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// classify()
// ---------------------------------------------------------------------------

/// Peter only when every threshold is met. Unknown latency does not meet
/// the latency threshold.
pub fn classify(metrics: &WeeklyMetrics, thresholds: &CoachingThresholds) -> CoachingLevel {
    let latency_ok = metrics
        .avg_review_latency_hours
        .is_some_and(|h| h < thresholds.max_review_latency_hours);

    if metrics.prs_merged >= thresholds.prs_merged_per_week
        && metrics.prs_reviewed >= thresholds.prs_reviewed_per_week
        && metrics.annotation_rate >= thresholds.annotation_rate
        && latency_ok
    {
        CoachingLevel::Peter
    } else {
        CoachingLevel::Ransom
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

// ---------------------------------------------------------------------------
// CoachingProfile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingProfile {
    pub week_start: NaiveDate,
    pub metrics: WeeklyMetrics,
    pub coaching_level: CoachingLevel,
    pub computed_at: DateTime<Utc>,
}

impl CoachingProfile {
    pub fn compute(
        metrics: WeeklyMetrics,
        now: DateTime<Utc>,
        thresholds: &CoachingThresholds,
    ) -> Result<Self> {
        metrics.validate()?;
        let coaching_level = classify(&metrics, thresholds);
        Ok(Self {
            week_start: week_start(now.date_naive()),
            metrics,
            coaching_level,
            computed_at: now,
        })
    }

    /// Weekly cadence: a profile computed earlier in the same week is kept
    /// as-is so the mode cannot flip mid-week.
    pub fn refresh(
        previous: Option<&CoachingProfile>,
        metrics: WeeklyMetrics,
        now: DateTime<Utc>,
        thresholds: &CoachingThresholds,
    ) -> Result<Self> {
        if let Some(prev) = previous {
            if prev.week_start == week_start(now.date_naive()) {
                tracing::debug!(week = %prev.week_start, level = %prev.coaching_level, "reusing this week's coaching profile");
                return Ok(prev.clone());
            }
        }
        let profile = Self::compute(metrics, now, thresholds)?;
        tracing::info!(
            week = %profile.week_start,
            level = %profile.coaching_level,
            "coaching profile recomputed"
        );
        Ok(profile)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
