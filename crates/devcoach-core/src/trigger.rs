//! Proactive coaching triggers.
//!
//! Everything here is a predicate over explicit inputs: the caller polls and
//! passes elapsed durations in. The one piece of state, "the stuck nudge
//! already fired for this idle episode", lives in [`StuckTracker`] keyed by
//! session, and only recorded user activity clears it.

use crate::block::ItemRef;
use crate::config::TriggerConfig;
use crate::types::{CoachingLevel, Phase, Trigger};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ---------------------------------------------------------------------------
// TriggerEvent
// ---------------------------------------------------------------------------

/// Context bundle handed to the conversation collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerContext {
    pub phase: Option<Phase>,
    pub item: Option<ItemRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl TriggerContext {
    pub fn new(phase: Option<Phase>, item: Option<ItemRef>) -> Self {
        Self {
            phase,
            item,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extras.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub trigger: Trigger,
    pub context: TriggerContext,
}

// ---------------------------------------------------------------------------
// Nudge
// ---------------------------------------------------------------------------

/// What kind of message the coach should send when a trigger is let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nudge {
    StuckCheck,
    PomodoroCheckIn,
    PhaseCheckIn,
    RegressionGuard,
    AnnotationReminder,
    StatusUpdate,
    Celebrate,
}

impl Nudge {
    pub fn as_str(self) -> &'static str {
        match self {
            Nudge::StuckCheck => "stuck_check",
            Nudge::PomodoroCheckIn => "pomodoro_check_in",
            Nudge::PhaseCheckIn => "phase_check_in",
            Nudge::RegressionGuard => "regression_guard",
            Nudge::AnnotationReminder => "annotation_reminder",
            Nudge::StatusUpdate => "status_update",
            Nudge::Celebrate => "celebrate",
        }
    }
}

impl std::fmt::Display for Nudge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PromptContext
// ---------------------------------------------------------------------------

/// Inputs for one policy decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
    /// Phase of the active block, `None` when no block is running.
    pub phase: Option<Phase>,
    /// Time since the last recorded user activity.
    pub idle: Duration,
    /// Time since the last coaching check-in.
    pub since_check_in: Duration,
}

impl PromptContext {
    pub fn new(phase: Option<Phase>) -> Self {
        Self {
            phase,
            idle: Duration::zero(),
            since_check_in: Duration::zero(),
        }
    }

    pub fn idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    pub fn since_check_in(mut self, elapsed: Duration) -> Self {
        self.since_check_in = elapsed;
        self
    }
}

// ---------------------------------------------------------------------------
// TriggerPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TriggerPolicy {
    cfg: TriggerConfig,
}

impl TriggerPolicy {
    pub fn new(cfg: TriggerConfig) -> Self {
        Self { cfg }
    }

    pub fn idle_threshold(&self, mode: CoachingLevel) -> Duration {
        let minutes = match mode {
            CoachingLevel::Peter => self.cfg.peter_idle_minutes,
            CoachingLevel::Ransom => self.cfg.ransom_idle_minutes,
        };
        Duration::minutes(i64::from(minutes))
    }

    /// Stuck means: a block is running and the user has been idle for at
    /// least the mode's threshold.
    pub fn is_stuck(&self, mode: CoachingLevel, phase: Option<Phase>, idle: Duration) -> bool {
        phase.is_some() && idle >= self.idle_threshold(mode)
    }

    pub fn pomodoro_due(&self, since_check_in: Duration) -> bool {
        since_check_in >= self.cfg.pomodoro()
    }

    pub fn nudge(&self, trigger: Trigger, mode: CoachingLevel, ctx: &PromptContext) -> Option<Nudge> {
        let trigger = trigger.canonical();

        if trigger == Trigger::Stuck {
            return self
                .is_stuck(mode, ctx.phase, ctx.idle)
                .then_some(Nudge::StuckCheck);
        }

        // Peter gets left alone unless stuck.
        if mode == CoachingLevel::Peter {
            return None;
        }

        match trigger {
            Trigger::PomodoroBreak => self
                .pomodoro_due(ctx.since_check_in)
                .then_some(Nudge::PomodoroCheckIn),
            Trigger::PreMerge => Some(Nudge::AnnotationReminder),
            Trigger::PhaseTransition => match ctx.phase {
                Some(Phase::Test) => Some(Nudge::RegressionGuard),
                Some(_) => Some(Nudge::PhaseCheckIn),
                None => None,
            },
            Trigger::DayStart | Trigger::DayEnd => Some(Nudge::StatusUpdate),
            Trigger::PuzzleComplete => Some(Nudge::Celebrate),
            _ => None,
        }
    }

    pub fn should_prompt(&self, trigger: Trigger, mode: CoachingLevel, ctx: &PromptContext) -> bool {
        self.nudge(trigger, mode, ctx).is_some()
    }
}

// ---------------------------------------------------------------------------
// StuckTracker
// ---------------------------------------------------------------------------

/// Per-session memory of whether the stuck nudge fired in the current idle
/// episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StuckTracker {
    #[serde(default)]
    fired: HashMap<String, bool>,
}

impl StuckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// New user activity starts a new idle episode.
    pub fn record_activity(&mut self, session_id: &str) {
        self.fired.remove(session_id);
    }

    pub fn has_fired(&self, session_id: &str) -> bool {
        self.fired.get(session_id).copied().unwrap_or(false)
    }

    /// Returns true exactly once per idle episode, the first time the idle
    /// time crosses the threshold.
    pub fn poll(
        &mut self,
        policy: &TriggerPolicy,
        session_id: &str,
        mode: CoachingLevel,
        phase: Option<Phase>,
        idle: Duration,
    ) -> bool {
        if self.has_fired(session_id) || !policy.is_stuck(mode, phase, idle) {
            return false;
        }
        self.fired.insert(session_id.to_string(), true);
        tracing::info!(
            session = session_id,
            %mode,
            idle_minutes = idle.num_minutes(),
            "stuck trigger fired"
        );
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
