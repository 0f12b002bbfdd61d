use crate::types::Phase;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoachError {
    #[error("invalid item{}: missing or empty '{field}'", number.map(|n| format!(" #{n}")).unwrap_or_default())]
    InvalidItem {
        field: &'static str,
        number: Option<u64>,
    },

    #[error("already terminal: no phase after '{0}', end the block instead")]
    NoNextPhase(Phase),

    #[error("already terminal: work block {0} has ended")]
    BlockEnded(String),

    #[error("session '{session}' already has an active work block ({block})")]
    BlockAlreadyActive { session: String, block: String },

    #[error("no active work block in session '{0}'")]
    NoActiveBlock(String),

    #[error("work block not found: {0}")]
    BlockNotFound(String),

    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("invalid coaching level '{0}': expected 'peter' or 'ransom'")]
    InvalidCoachingLevel(String),

    #[error("invalid weekly metrics: {0}")]
    InvalidMetrics(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CoachError {
    /// True for the "already terminal" family, which callers may treat as a
    /// safe-to-retry rejection rather than a failure.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CoachError::NoNextPhase(_) | CoachError::BlockEnded(_))
    }
}

pub type Result<T> = std::result::Result<T, CoachError>;
