//! Routing between blocks.
//!
//! Each block carries an ordered list of routing rules; the first rule whose
//! predicate holds picks the destination, otherwise the next block in
//! sequence follows. Walking these decisions from the first block gives the
//! routing path. Blocks off the path are skipped: their answers stay in the
//! store but are invisible to predicates, calculations and summaries.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use census_form_types::{
    AnswerLookup, AnswerStore, AnswerValue, BlockId, Destination, Location, Questionnaire, SlotId,
};

/// Where the respondent goes after a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Next {
    Block(Location),
    Summary,
}

/// The blocks reachable from the start, in visiting order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingPath {
    locations: Vec<Location>,
    blocks: HashSet<BlockId>,
}

impl RoutingPath {
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, block: &BlockId) -> bool {
        self.blocks.contains(block)
    }

    pub fn position(&self, block: &BlockId) -> Option<usize> {
        self.locations.iter().position(|location| &location.block == block)
    }

    /// The block visited before `block`.
    pub fn previous(&self, block: &BlockId) -> Option<&Location> {
        let position = self.position(block)?;
        position.checked_sub(1).and_then(|i| self.locations.get(i))
    }

    /// Where the path continues after `block`.
    pub fn next(&self, block: &BlockId) -> Option<Next> {
        let position = self.position(block)?;
        Some(match self.locations.get(position + 1) {
            Some(location) => Next::Block(location.clone()),
            None => Next::Summary,
        })
    }
}

/// A view of the answers restricted to a set of blocks.
///
/// Answers in any other block read as absent.
#[derive(Clone, Copy)]
pub struct ReachableAnswers<'a> {
    questionnaire: &'a Questionnaire,
    answers: &'a AnswerStore,
    blocks: &'a HashSet<BlockId>,
}

impl<'a> ReachableAnswers<'a> {
    pub fn new(
        questionnaire: &'a Questionnaire,
        answers: &'a AnswerStore,
        blocks: &'a HashSet<BlockId>,
    ) -> Self {
        Self {
            questionnaire,
            answers,
            blocks,
        }
    }

    /// View the answers of the blocks on a routing path.
    pub fn on_path(
        questionnaire: &'a Questionnaire,
        answers: &'a AnswerStore,
        path: &'a RoutingPath,
    ) -> Self {
        Self::new(questionnaire, answers, &path.blocks)
    }
}

impl AnswerLookup for ReachableAnswers<'_> {
    fn lookup(&self, slot: &SlotId) -> Option<&AnswerValue> {
        let block = self.questionnaire.block_of(slot)?;
        if self.blocks.contains(&block.id) {
            self.answers.get(slot)
        } else {
            None
        }
    }
}

/// Evaluates routing rules over a questionnaire.
#[derive(Debug, Clone, Copy)]
pub struct RoutingEngine<'q> {
    questionnaire: &'q Questionnaire,
}

impl<'q> RoutingEngine<'q> {
    pub fn new(questionnaire: &'q Questionnaire) -> Self {
        Self { questionnaire }
    }

    /// Decide where to go after `block`.
    ///
    /// Rules are tried in declaration order and the first match wins. With
    /// no match the next block in sequence follows, crossing into the next
    /// section at a boundary, and the summary after the last block.
    /// Returns `None` for an unknown block.
    pub fn next_destination(&self, block: &BlockId, answers: &dyn AnswerLookup) -> Option<Next> {
        let current = self.questionnaire.block(block)?;

        let Some(rule) = current.routing.iter().find(|rule| rule.matches(answers)) else {
            return Some(match self.questionnaire.next_in_sequence(block) {
                Some(location) => Next::Block(location.clone()),
                None => Next::Summary,
            });
        };

        // Destinations were checked on load.
        let next = match &rule.goto {
            Destination::Block(id) => self.questionnaire.location(id).cloned().map(Next::Block),
            Destination::Section(id) => self
                .questionnaire
                .section_start(id)
                .cloned()
                .map(Next::Block),
            Destination::Summary => Some(Next::Summary),
        };
        tracing::trace!("Block '{}' routes to {:?}", block, next);
        next
    }

    /// Walk the routing rules from the first block.
    ///
    /// At each block its rules see only the answers of the blocks visited so
    /// far, so answers left behind in skipped blocks never steer the route.
    pub fn routing_path(&self, answers: &AnswerStore) -> RoutingPath {
        let mut path = RoutingPath::default();
        let mut current = Some(self.questionnaire.first_location().clone());

        while let Some(location) = current.take() {
            // Routes only point forward, so a repeat means a broken invariant.
            if !path.blocks.insert(location.block.clone()) {
                break;
            }
            let view = ReachableAnswers::new(self.questionnaire, answers, &path.blocks);
            if let Some(Next::Block(next)) = self.next_destination(&location.block, &view) {
                current = Some(next);
            }
            path.locations.push(location);
        }

        path
    }
}
