use crate::block::{SessionBlocks, WorkBlock};
use crate::coaching::CoachingProfile;
use crate::error::Result;
use crate::paths;
use crate::trigger::StuckTracker;
use crate::types::CoachingLevel;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything the CLI keeps between runs: day sessions with their blocks,
/// the weekly coaching profile and the stuck-trigger memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub sessions: Vec<SessionBlocks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<CoachingProfile>,
    #[serde(default)]
    pub stuck: StuckTracker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check_in: Option<DateTime<Utc>>,
}

fn default_version() -> u32 {
    1
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: default_version(),
            sessions: Vec::new(),
            profile: None,
            stuck: StuckTracker::default(),
            last_activity: None,
            last_check_in: None,
        }
    }
}

/// Day sessions are keyed by their UTC date.
pub fn session_id_for(now: DateTime<Utc>) -> String {
    now.date_naive().to_string()
}

impl State {
    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    /// Load state from disk. A missing file is an empty state.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::state_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let state: State = serde_yaml::from_str(&data)?;
        Ok(state)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::state_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // ---------------------------------------------------------------------------
    // Sessions
    // ---------------------------------------------------------------------------

    /// Session holding the running block, if any.
    pub fn active_session(&self) -> Option<&SessionBlocks> {
        self.sessions.iter().find(|s| s.current().is_some())
    }

    pub fn active_session_mut(&mut self) -> Option<&mut SessionBlocks> {
        self.sessions.iter_mut().find(|s| s.current().is_some())
    }

    /// Session the idle clock belongs to: the one with the running block,
    /// else today's. Never creates a session.
    pub fn idle_session_id(&self, now: DateTime<Utc>) -> String {
        self.active_session()
            .map(|s| s.session_id.clone())
            .unwrap_or_else(|| session_id_for(now))
    }

    /// Session that owns the running block, or today's session otherwise
    /// (created on first use).
    pub fn working_session(&mut self, now: DateTime<Utc>) -> &mut SessionBlocks {
        let idx = match self.sessions.iter().position(|s| s.current().is_some()) {
            Some(i) => i,
            None => {
                let today = session_id_for(now);
                match self.sessions.iter().position(|s| s.session_id == today) {
                    Some(i) => i,
                    None => {
                        self.sessions.push(SessionBlocks::new(today));
                        self.sessions.len() - 1
                    }
                }
            }
        };
        &mut self.sessions[idx]
    }

    pub fn current_block(&self) -> Option<&WorkBlock> {
        self.active_session().and_then(|s| s.current())
    }

    /// Most recently started block across all sessions.
    pub fn last_block(&self) -> Option<&WorkBlock> {
        self.blocks().max_by_key(|b| b.started_at)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &WorkBlock> {
        self.sessions.iter().flat_map(|s| s.blocks.iter())
    }

    /// Blocks started on `date`.
    pub fn blocks_on(&self, date: NaiveDate) -> Vec<WorkBlock> {
        self.blocks()
            .filter(|b| b.started_at.date_naive() == date)
            .cloned()
            .collect()
    }

    /// Blocks started within `[from, to]`.
    pub fn blocks_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<WorkBlock> {
        self.blocks()
            .filter(|b| {
                let d = b.started_at.date_naive();
                d >= from && d <= to
            })
            .cloned()
            .collect()
    }

    /// Dates on which some block ended.
    pub fn ended_dates(&self) -> BTreeSet<NaiveDate> {
        self.blocks()
            .filter_map(|b| b.ended_at.map(|t| t.date_naive()))
            .collect()
    }

    /// Dates with any block activity.
    pub fn active_dates(&self) -> BTreeSet<NaiveDate> {
        self.blocks().map(|b| b.started_at.date_naive()).collect()
    }

    // ---------------------------------------------------------------------------
    // Activity
    // ---------------------------------------------------------------------------

    /// Stored weekly mode, ransom until a profile exists.
    pub fn coaching_level(&self) -> CoachingLevel {
        self.profile
            .as_ref()
            .map(|p| p.coaching_level)
            .unwrap_or_default()
    }

    /// User did something: start a new idle episode.
    pub fn record_activity(&mut self, now: DateTime<Utc>) {
        let session = self.idle_session_id(now);
        self.stuck.record_activity(&session);
        self.last_activity = Some(now);
    }

    pub fn record_check_in(&mut self, now: DateTime<Utc>) {
        self.last_check_in = Some(now);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
