use crate::error::CoachError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Issue,
    PullRequest,
}

impl ItemKind {
    /// Normalize the fetcher's `type` string. Total: anything that is not a
    /// recognised pull request spelling is an issue.
    pub fn from_upstream(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return ItemKind::Issue;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "pull_request" | "pr" | "pull" | "pullrequest" | "pull-request" => {
                ItemKind::PullRequest
            }
            _ => ItemKind::Issue,
        }
    }

    pub fn is_pr(self) -> bool {
        self == ItemKind::PullRequest
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Issue => "issue",
            ItemKind::PullRequest => "pull_request",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Work-block phase. Declaration order is the only legal advance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Understand,
    Address,
    Test,
    Pr,
    Annotate,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Understand,
            Phase::Address,
            Phase::Test,
            Phase::Pr,
            Phase::Annotate,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Phase> {
        Phase::all().get(self.index() + 1).copied()
    }

    pub fn is_last(self) -> bool {
        self.next().is_none()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Understand => "understand",
            Phase::Address => "address",
            Phase::Test => "test",
            Phase::Pr => "pr",
            Phase::Annotate => "annotate",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "understand" => Ok(Phase::Understand),
            "address" => Ok(Phase::Address),
            "test" => Ok(Phase::Test),
            "pr" => Ok(Phase::Pr),
            "annotate" => Ok(Phase::Annotate),
            _ => Err(CoachError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// CoachingLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachingLevel {
    /// High autonomy: interrupt only when stuck.
    Peter,
    /// Structure-seeking: frequent check-ins. New users start here.
    #[default]
    Ransom,
}

impl CoachingLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CoachingLevel::Peter => "peter",
            CoachingLevel::Ransom => "ransom",
        }
    }
}

impl fmt::Display for CoachingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CoachingLevel {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "peter" => Ok(CoachingLevel::Peter),
            "ransom" => Ok(CoachingLevel::Ransom),
            _ => Err(CoachError::InvalidCoachingLevel(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    PhaseTransition,
    Stuck,
    PomodoroBreak,
    PreMerge,
    DayEnd,
    PuzzleComplete,
    PomodoroComplete,
    PhaseChange,
    StuckSignal,
    DayStart,
}

impl Trigger {
    pub fn all() -> &'static [Trigger] {
        &[
            Trigger::PhaseTransition,
            Trigger::Stuck,
            Trigger::PomodoroBreak,
            Trigger::PreMerge,
            Trigger::DayEnd,
            Trigger::PuzzleComplete,
            Trigger::PomodoroComplete,
            Trigger::PhaseChange,
            Trigger::StuckSignal,
            Trigger::DayStart,
        ]
    }

    /// Collapse the client-side aliases onto the trigger they stand for.
    pub fn canonical(self) -> Trigger {
        match self {
            Trigger::PomodoroComplete => Trigger::PomodoroBreak,
            Trigger::PhaseChange => Trigger::PhaseTransition,
            Trigger::StuckSignal => Trigger::Stuck,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::PhaseTransition => "phase_transition",
            Trigger::Stuck => "stuck",
            Trigger::PomodoroBreak => "pomodoro_break",
            Trigger::PreMerge => "pre_merge",
            Trigger::DayEnd => "day_end",
            Trigger::PuzzleComplete => "puzzle_complete",
            Trigger::PomodoroComplete => "pomodoro_complete",
            Trigger::PhaseChange => "phase_change",
            Trigger::StuckSignal => "stuck_signal",
            Trigger::DayStart => "day_start",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Trigger {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Trigger::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoachError::InvalidTrigger(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn phase_ordering_and_next() {
        assert!(Phase::Understand < Phase::Address);
        assert_eq!(Phase::Understand.next(), Some(Phase::Address));
        assert_eq!(Phase::Test.next(), Some(Phase::Pr));
        assert_eq!(Phase::Annotate.next(), None);
        assert!(Phase::Annotate.is_last());
    }

    #[test]
    fn phase_roundtrip() {
        for phase in Phase::all() {
            assert_eq!(Phase::from_str(phase.as_str()).unwrap(), *phase);
        }
        assert!(Phase::from_str("coding").is_err());
    }

    #[test]
    fn item_kind_normalization_is_total() {
        assert_eq!(ItemKind::from_upstream(Some("pull_request")), ItemKind::PullRequest);
        assert_eq!(ItemKind::from_upstream(Some("PR")), ItemKind::PullRequest);
        assert_eq!(ItemKind::from_upstream(Some(" Pull-Request ")), ItemKind::PullRequest);
        assert_eq!(ItemKind::from_upstream(Some("issue")), ItemKind::Issue);
        assert_eq!(ItemKind::from_upstream(Some("discussion")), ItemKind::Issue);
        assert_eq!(ItemKind::from_upstream(None), ItemKind::Issue);
    }

    #[test]
    fn trigger_names_and_aliases() {
        assert_eq!(Trigger::all().len(), 10);
        for t in Trigger::all() {
            assert_eq!(Trigger::from_str(t.as_str()).unwrap(), *t);
        }
        assert_eq!(Trigger::PomodoroComplete.canonical(), Trigger::PomodoroBreak);
        assert_eq!(Trigger::PhaseChange.canonical(), Trigger::PhaseTransition);
        assert_eq!(Trigger::StuckSignal.canonical(), Trigger::Stuck);
        assert_eq!(Trigger::DayEnd.canonical(), Trigger::DayEnd);
        assert!(matches!(
            Trigger::from_str("lunch"),
            Err(CoachError::InvalidTrigger(_))
        ));
    }

    #[test]
    fn coaching_level_defaults_to_ransom() {
        assert_eq!(CoachingLevel::default(), CoachingLevel::Ransom);
        assert_eq!(CoachingLevel::from_str("peter").unwrap(), CoachingLevel::Peter);
        assert!(CoachingLevel::from_str("paul").is_err());
    }
}
