use census_form_types::{AnswerError, BlockId, RuleId, SectionId, SlotId};

use crate::session::SessionId;

/// Error type for engine operations.
///
/// Validation failures the respondent can fix are not errors; they come back
/// in [`Submission::errors`](crate::Submission).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("Unknown block: {0}")]
    UnknownBlock(BlockId),

    #[error("Unknown section: {0}")]
    UnknownSection(SectionId),

    #[error("Unknown calculation: {0}")]
    UnknownRule(RuleId),

    #[error("Block '{0}' is not on the routing path")]
    BlockNotOnPath(BlockId),

    #[error("Answer '{slot}' does not belong to block '{block}'")]
    SlotNotInBlock { slot: SlotId, block: BlockId },

    #[error(transparent)]
    Answer(#[from] AnswerError),

    #[error("Snapshot version {found} is not supported (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },

    #[error("Snapshot belongs to questionnaire '{found}', not '{expected}'")]
    QuestionnaireMismatch { found: String, expected: String },

    #[error("Session store failed: {0:#}")]
    Persistence(anyhow::Error),
}
