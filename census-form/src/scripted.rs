//! Scripted respondent for driving questionnaires without user interaction.
//!
//! `ScriptedRespondent` answers each page from a pre-defined script and
//! follows the engine's routing until the summary. It is useful for testing
//! questionnaires end to end and backs the replay tool.
//!
//! # Example
//!
//! ```rust,ignore
//! use census_form::{Engine, EngineConfig, Questionnaire, ScriptedRespondent};
//!
//! let engine = Engine::new(Questionnaire::from_json(SCHEMA)?, EngineConfig::default());
//! let run = ScriptedRespondent::new()
//!     .with_answer("over-16", "over-16-answer", census_form::AnswerValue::Choice("Yes".into()))
//!     .run(&engine)?;
//!
//! assert!(run.completed);
//! ```

use serde::{Deserialize, Serialize};

use census_form_types::{AnswerValue, BlockId, Location, SlotId};

use crate::engine::{AnswerEdits, Engine, Submission, ValidationError};
use crate::error::EngineError;
use crate::exclusivity::Edit;
use crate::routing::Next;
use crate::session::SessionId;
use crate::store::SessionStore;

/// The answers given on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub block: BlockId,

    #[serde(default)]
    pub edits: AnswerEdits,
}

/// A respondent that replays pre-configured answers.
///
/// Blocks without a page in the script are submitted with no edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedRespondent {
    #[serde(default)]
    pages: Vec<Page>,
}

/// Error type for ScriptedRespondent.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Block '{block}' was rejected: {errors:?}")]
    Rejected {
        block: BlockId,
        errors: Vec<ValidationError>,
    },

    #[error("Routing returned to block '{0}'")]
    Stalled(BlockId),

    #[error("Invalid script: {0}")]
    Json(#[from] serde_json::Error),
}

/// What happened during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRun {
    pub session: SessionId,

    /// Every block visited, in order.
    pub visited: Vec<Location>,

    pub submissions: Vec<(BlockId, Submission)>,

    /// Whether the run reached the summary.
    pub completed: bool,
}

impl ScriptedRespondent {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a script from JSON.
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add a whole page.
    pub fn with_page(mut self, block: impl Into<BlockId>, edits: AnswerEdits) -> Self {
        let block = block.into();
        self.page_mut(block).edits = edits;
        self
    }

    /// Add one answer to a block's page.
    pub fn with_answer(
        mut self,
        block: impl Into<BlockId>,
        slot: impl Into<SlotId>,
        value: impl Into<AnswerValue>,
    ) -> Self {
        self.page_mut(block.into())
            .edits
            .insert(slot.into(), Edit::Set(value.into()));
        self
    }

    /// Add a text answer.
    pub fn with_text(
        self,
        block: impl Into<BlockId>,
        slot: impl Into<SlotId>,
        value: impl Into<String>,
    ) -> Self {
        self.with_answer(block, slot, AnswerValue::Text(value.into()))
    }

    /// Add a radio answer.
    pub fn with_choice(
        self,
        block: impl Into<BlockId>,
        slot: impl Into<SlotId>,
        value: impl Into<String>,
    ) -> Self {
        self.with_answer(block, slot, AnswerValue::Choice(value.into()))
    }

    /// Add a number answer.
    pub fn with_number(
        self,
        block: impl Into<BlockId>,
        slot: impl Into<SlotId>,
        value: i64,
    ) -> Self {
        self.with_answer(block, slot, AnswerValue::from(value))
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    fn page_mut(&mut self, block: BlockId) -> &mut Page {
        let index = match self.pages.iter().position(|page| page.block == block) {
            Some(index) => index,
            None => {
                self.pages.push(Page {
                    block,
                    edits: AnswerEdits::new(),
                });
                self.pages.len() - 1
            }
        };
        &mut self.pages[index]
    }

    fn edits_for(&self, block: &BlockId) -> AnswerEdits {
        self.pages
            .iter()
            .find(|page| &page.block == block)
            .map(|page| page.edits.clone())
            .unwrap_or_default()
    }

    /// Run the script in a new session.
    pub fn run<S: SessionStore>(&self, engine: &Engine<S>) -> Result<ScriptRun, ScriptError> {
        let session = engine.start_session()?;
        self.run_in(engine, session)
    }

    /// Run the script in an existing session, starting from the first block.
    pub fn run_in<S: SessionStore>(
        &self,
        engine: &Engine<S>,
        session: SessionId,
    ) -> Result<ScriptRun, ScriptError> {
        let mut run = ScriptRun {
            session,
            visited: Vec::new(),
            submissions: Vec::new(),
            completed: false,
        };
        let mut current = engine.questionnaire().first_location().clone();

        loop {
            if run.visited.iter().any(|visited| visited.block == current.block) {
                return Err(ScriptError::Stalled(current.block));
            }
            run.visited.push(current.clone());

            let submission =
                engine.submit_block(session, &current.block, self.edits_for(&current.block))?;
            if !submission.is_accepted() {
                return Err(ScriptError::Rejected {
                    block: current.block,
                    errors: submission.errors,
                });
            }
            let next = submission.next.clone();
            run.submissions.push((current.block.clone(), submission));

            match next {
                Some(Next::Block(location)) => current = location,
                Some(Next::Summary) | None => {
                    run.completed = true;
                    return Ok(run);
                }
            }
        }
    }
}
