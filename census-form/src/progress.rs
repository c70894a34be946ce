//! Which blocks a respondent has submitted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use census_form_types::{BlockId, Location, Section};

use crate::routing::RoutingPath;

/// Completion of a section or questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Blocks accepted on submission.
///
/// Completion is always judged against a routing path: blocks that are
/// skipped do not need to be submitted, and a submitted block that later
/// falls off the path stops counting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressStore {
    submitted: BTreeSet<BlockId>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted submission. Returns false if already recorded.
    pub fn mark_submitted(&mut self, block: BlockId) -> bool {
        self.submitted.insert(block)
    }

    pub fn is_submitted(&self, block: &BlockId) -> bool {
        self.submitted.contains(block)
    }

    /// Drop a block's submission, e.g. after its answers were invalidated.
    pub fn forget(&mut self, block: &BlockId) -> bool {
        self.submitted.remove(block)
    }

    /// Status of a section. A section with no block on the path has nothing
    /// left to do and counts as completed.
    pub fn section_status(&self, section: &Section, path: &RoutingPath) -> CompletionStatus {
        let on_path: Vec<&BlockId> = section
            .blocks
            .iter()
            .map(|block| &block.id)
            .filter(|block| path.contains(block))
            .collect();
        let done = on_path
            .iter()
            .filter(|block| self.is_submitted(block))
            .count();

        if done == on_path.len() {
            CompletionStatus::Completed
        } else if done == 0 {
            CompletionStatus::NotStarted
        } else {
            CompletionStatus::InProgress
        }
    }

    /// Whether every block on the path has been submitted.
    pub fn is_complete(&self, path: &RoutingPath) -> bool {
        self.first_incomplete(path).is_none()
    }

    /// The first block on the path not yet submitted.
    pub fn first_incomplete<'p>(&self, path: &'p RoutingPath) -> Option<&'p Location> {
        path.iter().find(|location| !self.is_submitted(&location.block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_form_types::{
        AnswerSlot, AnswerStore, Block, Question, Questionnaire, QuestionnaireDefinition,
    };

    use crate::routing::RoutingEngine;

    fn block(id: &str) -> Block {
        Block::new(id).with_question(
            Question::new(format!("{id}-question"), id)
                .with_answer(AnswerSlot::text(format!("{id}-answer"), id)),
        )
    }

    fn questionnaire() -> Questionnaire {
        Questionnaire::from_definition(
            QuestionnaireDefinition::new("progress")
                .with_section(Section::new("one").with_block(block("a")).with_block(block("b")))
                .with_section(Section::new("two").with_block(block("c"))),
        )
        .unwrap()
    }

    #[test]
    fn tracks_sections_along_path() {
        let questionnaire = questionnaire();
        let path = RoutingEngine::new(&questionnaire).routing_path(&AnswerStore::new());
        let mut progress = ProgressStore::new();
        let one = &questionnaire.sections()[0];
        let two = &questionnaire.sections()[1];

        assert_eq!(progress.section_status(one, &path), CompletionStatus::NotStarted);

        assert!(progress.mark_submitted("a".into()));
        assert!(!progress.mark_submitted("a".into()));
        assert_eq!(progress.section_status(one, &path), CompletionStatus::InProgress);
        assert_eq!(
            progress.first_incomplete(&path).map(|l| l.block.as_str()),
            Some("b")
        );

        progress.mark_submitted("b".into());
        progress.mark_submitted("c".into());
        assert_eq!(progress.section_status(one, &path), CompletionStatus::Completed);
        assert_eq!(progress.section_status(two, &path), CompletionStatus::Completed);
        assert!(progress.is_complete(&path));

        progress.forget(&"c".into());
        assert!(!progress.is_complete(&path));
    }
}
