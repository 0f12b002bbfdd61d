use crate::error::{CoachError, Result};
use crate::score::QueueItem;
use crate::trigger::{TriggerContext, TriggerEvent};
use crate::types::{ItemKind, Phase, Trigger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ItemRef
// ---------------------------------------------------------------------------

/// Identifying snapshot of the item a block works on. Taken once at block
/// start so a later re-fetch cannot change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub number: u64,
    pub title: String,
    pub url: String,
}

impl From<&QueueItem> for ItemRef {
    fn from(item: &QueueItem) -> Self {
        Self {
            kind: item.kind,
            number: item.id,
            title: item.title.clone(),
            url: item.url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// PhaseTransition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub phase: Phase,
    pub entered: DateTime<Utc>,
    pub exited: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// WorkBlock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOutcome {
    Ended,
    /// The block had already ended; nothing changed.
    AlreadyEnded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkBlock {
    pub id: String,
    pub session_id: String,
    pub item_ref: ItemRef,
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(default)]
    pub annotated: bool,
    pub phase_history: Vec<PhaseTransition>,
}

impl WorkBlock {
    pub fn start(session_id: impl Into<String>, item_ref: ItemRef, now: DateTime<Utc>) -> Self {
        let first = Phase::all()[0];
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            item_ref,
            phase: first,
            started_at: now,
            ended_at: None,
            notes: String::new(),
            pr_url: None,
            annotated: false,
            phase_history: vec![PhaseTransition {
                phase: first,
                entered: now,
                exited: None,
            }],
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CoachError::BlockEnded(self.id.clone()))
        }
    }

    /// Move to the next phase and return the trigger events the move emits.
    /// Advancing from the last phase is an error: completion is `end`.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<Vec<TriggerEvent>> {
        self.ensure_active()?;
        let from = self.phase;
        let to = from.next().ok_or(CoachError::NoNextPhase(from))?;

        if let Some(last) = self.phase_history.last_mut() {
            last.exited = Some(now);
        }
        self.phase = to;
        self.phase_history.push(PhaseTransition {
            phase: to,
            entered: now,
            exited: None,
        });

        tracing::info!(block = %self.id, %from, %to, "work block advanced");

        let mut events = vec![self.event(Trigger::PhaseTransition, Some(from))];
        if to == Phase::Pr {
            events.push(self.event(Trigger::PreMerge, Some(from)));
        }
        Ok(events)
    }

    fn event(&self, trigger: Trigger, previous: Option<Phase>) -> TriggerEvent {
        let mut context = TriggerContext::new(Some(self.phase), Some(self.item_ref.clone()));
        if let Some(prev) = previous {
            context = context.with_extra("previous_phase", prev.as_str());
        }
        context = context.with_extra("block_id", self.id.as_str());
        TriggerEvent { trigger, context }
    }

    /// End the block from any phase. Ending twice is a no-op.
    pub fn end(&mut self, now: DateTime<Utc>, notes: Option<String>) -> EndOutcome {
        if !self.is_active() {
            tracing::debug!(block = %self.id, "end on already-ended block ignored");
            return EndOutcome::AlreadyEnded;
        }
        if let Some(notes) = notes {
            self.notes = notes;
        }
        if let Some(last) = self.phase_history.last_mut() {
            last.exited = Some(now);
        }
        self.ended_at = Some(now);
        tracing::info!(block = %self.id, phase = %self.phase, "work block ended");
        EndOutcome::Ended
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<()> {
        self.ensure_active()?;
        self.notes = notes.into();
        Ok(())
    }

    pub fn set_pr_url(&mut self, url: impl Into<String>) -> Result<()> {
        self.ensure_active()?;
        self.pr_url = Some(url.into());
        Ok(())
    }

    pub fn mark_annotated(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.annotated = true;
        Ok(())
    }

    /// Wall time of the block, up to `now` while it is still running.
    pub fn duration(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.ended_at.unwrap_or(now) - self.started_at
    }
}

// ---------------------------------------------------------------------------
// SessionBlocks
// ---------------------------------------------------------------------------

/// All blocks of one day session. Holds the one-active-block invariant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionBlocks {
    pub session_id: String,
    #[serde(default)]
    pub blocks: Vec<WorkBlock>,
}

impl SessionBlocks {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            blocks: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&WorkBlock> {
        self.blocks.iter().rev().find(|b| b.is_active())
    }

    pub fn current_mut(&mut self) -> Option<&mut WorkBlock> {
        self.blocks.iter_mut().rev().find(|b| b.is_active())
    }

    fn require_current(&mut self) -> Result<&mut WorkBlock> {
        let session = self.session_id.clone();
        self.current_mut().ok_or(CoachError::NoActiveBlock(session))
    }

    pub fn start_block(&mut self, item_ref: ItemRef, now: DateTime<Utc>) -> Result<&WorkBlock> {
        if let Some(active) = self.current() {
            return Err(CoachError::BlockAlreadyActive {
                session: self.session_id.clone(),
                block: active.id.clone(),
            });
        }
        let block = WorkBlock::start(self.session_id.clone(), item_ref, now);
        tracing::info!(
            session = %self.session_id,
            block = %block.id,
            item = block.item_ref.number,
            "work block started"
        );
        self.blocks.push(block);
        Ok(&self.blocks[self.blocks.len() - 1])
    }

    pub fn advance_current(&mut self, now: DateTime<Utc>) -> Result<Vec<TriggerEvent>> {
        self.require_current()?.advance(now)
    }

    /// End the running block. A retry after the block already ended is a
    /// no-op; only a session that never had a block is an error.
    pub fn end_current(&mut self, now: DateTime<Utc>, notes: Option<String>) -> Result<EndOutcome> {
        if self.current().is_none() && !self.blocks.is_empty() {
            tracing::debug!(session = %self.session_id, "end with no running block ignored");
            return Ok(EndOutcome::AlreadyEnded);
        }
        Ok(self.require_current()?.end(now, notes))
    }

    /// Most recently started block, running or not.
    pub fn last(&self) -> Option<&WorkBlock> {
        self.blocks.last()
    }

    /// End a specific block. Unknown ids are an error; already-ended blocks
    /// are a no-op so retries are safe.
    pub fn end_block(
        &mut self,
        block_id: &str,
        now: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<EndOutcome> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.id == block_id)
            .ok_or_else(|| CoachError::BlockNotFound(block_id.to_string()))?;
        Ok(block.end(now, notes))
    }

    pub fn completed(&self) -> impl Iterator<Item = &WorkBlock> {
        self.blocks.iter().filter(|b| !b.is_active())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap()
    }

    fn item_ref() -> ItemRef {
        ItemRef {
            kind: ItemKind::Issue,
            number: 42,
            title: "Fix flaky upload".to_string(),
            url: "https://github.com/acme/app/issues/42".to_string(),
        }
    }

    #[test]
    fn start_begins_at_understand() {
        let block = WorkBlock::start("s1", item_ref(), t0());
        assert_eq!(block.phase, Phase::Understand);
        assert!(block.is_active());
        assert_eq!(block.phase_history.len(), 1);
        assert!(Uuid::parse_str(&block.id).is_ok());
    }

    #[test]
    fn advance_walks_every_phase_then_fails() {
        let mut block = WorkBlock::start("s1", item_ref(), t0());
        let mut seen = vec![block.phase];
        for i in 1..=4 {
            block.advance(t0() + Duration::minutes(i)).unwrap();
            seen.push(block.phase);
        }
        assert_eq!(seen, Phase::all().to_vec());
        assert_eq!(block.phase, Phase::Annotate);

        let err = block.advance(t0() + Duration::minutes(5)).unwrap_err();
        assert!(matches!(err, CoachError::NoNextPhase(Phase::Annotate)));
        assert!(err.is_terminal());
        assert_eq!(block.phase, Phase::Annotate);
        assert_eq!(block.phase_history.len(), 5);
    }

    #[test]
    fn entering_pr_emits_pre_merge() {
        let mut block = WorkBlock::start("s1", item_ref(), t0());
        let first = block.advance(t0()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].trigger, Trigger::PhaseTransition);
        assert_eq!(first[0].context.phase, Some(Phase::Address));

        block.advance(t0()).unwrap();
        let into_pr = block.advance(t0()).unwrap();
        let triggers: Vec<Trigger> = into_pr.iter().map(|e| e.trigger).collect();
        assert_eq!(triggers, vec![Trigger::PhaseTransition, Trigger::PreMerge]);
        assert_eq!(into_pr[1].context.item.as_ref().unwrap().number, 42);
        assert_eq!(
            into_pr[1].context.extras.get("previous_phase"),
            Some(&serde_json::json!("test"))
        );
    }

    #[test]
    fn history_records_exit_times() {
        let mut block = WorkBlock::start("s1", item_ref(), t0());
        block.advance(t0() + Duration::minutes(10)).unwrap();
        assert_eq!(
            block.phase_history[0].exited,
            Some(t0() + Duration::minutes(10))
        );
        assert!(block.phase_history[1].exited.is_none());
    }

    #[test]
    fn end_early_and_twice() {
        let mut block = WorkBlock::start("s1", item_ref(), t0());
        block.advance(t0()).unwrap();
        let end_at = t0() + Duration::minutes(30);
        assert_eq!(
            block.end(end_at, Some("blocked on API".to_string())),
            EndOutcome::Ended
        );
        assert_eq!(block.ended_at, Some(end_at));
        assert_eq!(block.notes, "blocked on API");

        assert_eq!(
            block.end(end_at + Duration::minutes(1), Some("retry".to_string())),
            EndOutcome::AlreadyEnded
        );
        assert_eq!(block.ended_at, Some(end_at));
        assert_eq!(block.notes, "blocked on API");
    }

    #[test]
    fn ended_block_rejects_mutation() {
        let mut block = WorkBlock::start("s1", item_ref(), t0());
        block.end(t0(), None);
        assert!(matches!(block.advance(t0()), Err(CoachError::BlockEnded(_))));
        assert!(block.set_notes("late").is_err());
        assert!(block.mark_annotated().is_err());
    }

    #[test]
    fn session_allows_one_active_block() {
        let mut session = SessionBlocks::new("s1");
        let first_id = session.start_block(item_ref(), t0()).unwrap().id.clone();

        let err = session.start_block(item_ref(), t0()).unwrap_err();
        assert!(matches!(err, CoachError::BlockAlreadyActive { ref block, .. } if *block == first_id));

        session.end_current(t0() + Duration::minutes(5), None).unwrap();
        assert!(session.current().is_none());
        assert!(session.start_block(item_ref(), t0()).is_ok());
        assert_eq!(session.blocks.len(), 2);
        assert_eq!(session.completed().count(), 1);
    }

    #[test]
    fn session_without_active_block() {
        let mut session = SessionBlocks::new("s1");
        assert!(matches!(
            session.advance_current(t0()),
            Err(CoachError::NoActiveBlock(_))
        ));
        assert!(matches!(
            session.end_current(t0(), None),
            Err(CoachError::NoActiveBlock(_))
        ));
    }

    #[test]
    fn end_current_retry_is_a_no_op() {
        let mut session = SessionBlocks::new("s1");
        session.start_block(item_ref(), t0()).unwrap();
        let end_at = t0() + Duration::minutes(20);
        assert_eq!(
            session.end_current(end_at, Some("done".to_string())).unwrap(),
            EndOutcome::Ended
        );
        assert_eq!(
            session
                .end_current(end_at + Duration::minutes(1), Some("retry".to_string()))
                .unwrap(),
            EndOutcome::AlreadyEnded
        );
        let last = session.last().unwrap();
        assert_eq!(last.ended_at, Some(end_at));
        assert_eq!(last.notes, "done");
    }

    #[test]
    fn end_block_by_id_is_idempotent() {
        let mut session = SessionBlocks::new("s1");
        let id = session.start_block(item_ref(), t0()).unwrap().id.clone();
        assert_eq!(session.end_block(&id, t0(), None).unwrap(), EndOutcome::Ended);
        assert_eq!(
            session.end_block(&id, t0(), None).unwrap(),
            EndOutcome::AlreadyEnded
        );
        assert!(matches!(
            session.end_block("nope", t0(), None),
            Err(CoachError::BlockNotFound(_))
        ));
    }

    #[test]
    fn item_ref_is_a_snapshot() {
        let queue_item = QueueItem {
            id: 7,
            kind: ItemKind::PullRequest,
            title: "Original".to_string(),
            url: "u".to_string(),
            story_points: None,
            difficulty: 3,
            assigned_to_me: false,
            needs_review: true,
            age_hours: 0.0,
            confidence_score: 0.0,
            labels: vec![],
            priority: "normal".to_string(),
            explanation: None,
        };
        let block = WorkBlock::start("s1", ItemRef::from(&queue_item), t0());
        let mut refetched = queue_item.clone();
        refetched.title = "Renamed upstream".to_string();
        assert_eq!(block.item_ref.title, "Original");
        assert_eq!(block.item_ref.kind, ItemKind::PullRequest);
    }

    #[test]
    fn yaml_roundtrip() {
        let mut session = SessionBlocks::new("s1");
        session.start_block(item_ref(), t0()).unwrap();
        session.advance_current(t0()).unwrap();
        let yaml = serde_yaml::to_string(&session).unwrap();
        let parsed: SessionBlocks = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, session);
    }
}
