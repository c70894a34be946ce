use crate::{BlockId, QuestionId, RuleId, SectionId, SlotId};

/// Error type for answer storage operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnswerError {
    #[error("Unknown answer slot: {0}")]
    UnknownSlot(SlotId),

    #[error("Missing answer for slot: {0}")]
    Missing(SlotId),

    #[error("Type mismatch for slot '{slot}': expected {expected}, got {actual}")]
    InvalidType {
        slot: SlotId,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("'{value}' is not an option of slot '{slot}'")]
    UnknownOption { slot: SlotId, value: String },
}

/// Configuration error found while loading a questionnaire schema.
///
/// These are fatal for the questionnaire version: a schema that fails to load
/// is never served.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Malformed schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Questionnaire has no sections")]
    EmptyQuestionnaire,

    #[error("Section '{0}' has no blocks")]
    EmptySection(SectionId),

    #[error("Block '{0}' has no questions")]
    EmptyBlock(BlockId),

    #[error("Question '{0}' has no answers")]
    EmptyQuestion(QuestionId),

    #[error("Variant in block '{block}' replaces unknown question '{question}'")]
    UnknownVariantQuestion { block: BlockId, question: QuestionId },

    #[error("Duplicate {kind} id '{id}'")]
    Duplicate { kind: &'static str, id: String },

    #[error("Question '{0}' declares more than one exclusive answer")]
    MultipleExclusive(QuestionId),

    #[error("Calculation '{0}' has no source answers")]
    EmptyCalculation(RuleId),

    #[error("Calculation '{rule}' sums non-numeric answer '{slot}'")]
    NonNumericSource { rule: RuleId, slot: SlotId },

    #[error("{context} references unknown answer '{slot}'")]
    UnknownSlot { context: String, slot: SlotId },

    #[error("{context} routes to unknown block '{block}'")]
    UnknownBlock { context: String, block: BlockId },

    #[error("{context} routes to unknown section '{section}'")]
    UnknownSection { context: String, section: SectionId },

    #[error("Block '{from}' routes backwards to '{to}'")]
    BackwardRoute { from: BlockId, to: BlockId },
}
