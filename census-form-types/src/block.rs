use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    AnswerLookup, BlockId, CalculatedRule, Predicate, Question, RoutingRule, SectionId, SlotId,
};

/// A page of the questionnaire: one or more questions submitted together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub questions: Vec<Question>,

    /// Replacements for questions of this block, picked per question by the
    /// first variant whose `when` holds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub question_variants: Vec<QuestionVariant>,

    /// Totals validated when the block is submitted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calculations: Vec<CalculatedRule>,

    /// Routing rules, first match wins. With no match the next block in
    /// sequence follows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routing: Vec<RoutingRule>,

    /// Wipe this block's answers when a routing change skips it, instead of
    /// keeping them for when it becomes reachable again.
    #[serde(default)]
    pub invalidate_when_skipped: bool,
}

impl Block {
    /// Create a new block with no questions.
    pub fn new(id: impl Into<BlockId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            questions: Vec::new(),
            question_variants: Vec::new(),
            calculations: Vec::new(),
            routing: Vec::new(),
            invalidate_when_skipped: false,
        }
    }

    pub fn with_question(mut self, question: Question) -> Self {
        self.questions.push(question);
        self
    }

    /// Show `question` in place of the block's question with the same id
    /// while `when` holds.
    pub fn with_question_variant(mut self, when: Predicate, question: Question) -> Self {
        self.question_variants.push(QuestionVariant { when, question });
        self
    }

    pub fn with_calculation(mut self, rule: CalculatedRule) -> Self {
        self.calculations.push(rule);
        self
    }

    pub fn with_route(mut self, rule: RoutingRule) -> Self {
        self.routing.push(rule);
        self
    }

    pub fn invalidate_when_skipped(mut self) -> Self {
        self.invalidate_when_skipped = true;
        self
    }

    /// The questions to show for the given answers, in block order.
    pub fn questions_for(&self, answers: &dyn AnswerLookup) -> Vec<&Question> {
        self.questions
            .iter()
            .map(|question| {
                self.question_variants
                    .iter()
                    .filter(|variant| variant.question.id() == question.id())
                    .find(|variant| variant.when.evaluate(answers))
                    .map_or(question, |variant| &variant.question)
            })
            .collect()
    }

    /// Every answer slot id in the block, across all variants.
    pub fn slot_ids(&self) -> impl Iterator<Item = &SlotId> {
        self.questions
            .iter()
            .chain(self.question_variants.iter().map(|variant| &variant.question))
            .flat_map(|question| question.answers().iter().map(|slot| slot.id()))
    }
}

/// A whole question shown in place of the default one while `when` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionVariant {
    pub when: Predicate,
    pub question: Question,
}

/// An ordered run of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub blocks: Vec<Block>,
}

impl Section {
    /// Create a new section with no blocks.
    pub fn new(id: impl Into<SectionId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            blocks: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }
}

/// Where a block sits in the questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub section: SectionId,
    pub block: BlockId,
}

impl Location {
    pub fn new(section: impl Into<SectionId>, block: impl Into<BlockId>) -> Self {
        Self {
            section: section.into(),
            block: block.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.section, self.block)
    }
}
