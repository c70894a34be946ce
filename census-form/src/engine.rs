//! The submission cycle and the queries a rendering layer needs.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::one::{Ref, RefMut};
use serde::{Deserialize, Serialize};

use census_form_types::{
    AnswerError, AnswerLookup, AnswerValue, Block, BlockId, Comparison, Location, Numeric,
    Question, QuestionId, Questionnaire, RuleId, SectionId, SlotId, SlotKind,
};

use crate::calculated::{CalculatedTotal, CalculatedValidator};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::exclusivity::{Applied, Edit, EditPhase, ExclusivityEnforcer};
use crate::progress::CompletionStatus;
use crate::routing::{Next, ReachableAnswers, RoutingEngine, RoutingPath};
use crate::session::{SNAPSHOT_VERSION, Session, SessionId, SessionSnapshot};
use crate::store::{MemoryStore, SessionStore};
use crate::summary::{DisplayValue, SummaryRow, format_value, summarize};

/// The edits submitted with a page, keyed by slot.
///
/// Slots without an entry keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerEdits {
    edits: BTreeMap<SlotId, Edit>,
}

impl AnswerEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a slot to a value.
    pub fn with_answer(mut self, slot: impl Into<SlotId>, value: impl Into<AnswerValue>) -> Self {
        self.edits.insert(slot.into(), Edit::Set(value.into()));
        self
    }

    /// Clear a slot.
    pub fn with_cleared(mut self, slot: impl Into<SlotId>) -> Self {
        self.edits.insert(slot.into(), Edit::Clear);
        self
    }

    pub fn insert(&mut self, slot: SlotId, edit: Edit) -> Option<Edit> {
        self.edits.insert(slot, edit)
    }

    pub fn contains(&self, slot: &SlotId) -> bool {
        self.edits.contains_key(slot)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SlotId, &Edit)> {
        self.edits.iter()
    }
}

impl FromIterator<(SlotId, Edit)> for AnswerEdits {
    fn from_iter<I: IntoIterator<Item = (SlotId, Edit)>>(iter: I) -> Self {
        Self {
            edits: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for AnswerEdits {
    type Item = (SlotId, Edit);
    type IntoIter = std::collections::btree_map::IntoIter<SlotId, Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.into_iter()
    }
}

/// A business rule the respondent must fix before moving on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Question '{question}' must be answered")]
    MandatoryUnanswered { question: QuestionId },

    #[error("Calculated total {total} does not meet the target of {target}")]
    TotalMismatch {
        rule: RuleId,
        total: Numeric,
        target: Numeric,
        comparison: Comparison,
    },

    #[error("Answer '{slot}' is out of range: {value}")]
    OutOfRange {
        slot: SlotId,
        value: Numeric,
        min: Option<Numeric>,
        max: Option<Numeric>,
    },

    #[error("Answer '{slot}' is longer than {max_length} characters")]
    TooLong { slot: SlotId, max_length: usize },
}

/// Result of submitting a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Empty when the submission was accepted.
    pub errors: Vec<ValidationError>,

    /// Where to go next; `None` when rejected.
    pub next: Option<Next>,
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs respondent sessions against one questionnaire.
///
/// Sessions are independent: each sits behind its own map entry, so one
/// submission per session runs at a time while different sessions proceed in
/// parallel. Accepted submissions are committed to the session store before
/// they become visible.
pub struct Engine<S = MemoryStore> {
    questionnaire: Arc<Questionnaire>,
    config: EngineConfig,
    store: S,
    sessions: DashMap<SessionId, Session>,
}

impl Engine<MemoryStore> {
    /// Create an engine backed by an in-memory store.
    pub fn new(questionnaire: impl Into<Arc<Questionnaire>>, config: EngineConfig) -> Self {
        Self::with_store(questionnaire, config, MemoryStore::new())
    }
}

impl<S: SessionStore> Engine<S> {
    pub fn with_store(
        questionnaire: impl Into<Arc<Questionnaire>>,
        config: EngineConfig,
        store: S,
    ) -> Self {
        let questionnaire = questionnaire.into();
        tracing::info!(
            "Serving questionnaire '{}' ({} blocks)",
            questionnaire.id(),
            questionnaire.locations().len()
        );
        Self {
            questionnaire,
            config,
            store,
            sessions: DashMap::new(),
        }
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // === Sessions ===

    /// Start a new session and commit its empty snapshot.
    pub fn start_session(&self) -> Result<SessionId, EngineError> {
        let id = SessionId::new();
        let session = Session::new();
        self.commit(id, &session)?;
        self.sessions.insert(id, session);
        tracing::info!("Started session {}", id);
        Ok(id)
    }

    /// Load a session from the store, replacing any live copy.
    pub fn resume_session(&self, id: SessionId) -> Result<(), EngineError> {
        let snapshot = self
            .store
            .load(id)
            .map_err(|e| EngineError::Persistence(e.into()))?
            .ok_or(EngineError::UnknownSession(id))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::SnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        if snapshot.questionnaire != self.questionnaire.id() {
            return Err(EngineError::QuestionnaireMismatch {
                found: snapshot.questionnaire,
                expected: self.questionnaire.id().to_string(),
            });
        }

        self.sessions.insert(id, snapshot.session);
        tracing::info!("Resumed session {}", id);
        Ok(())
    }

    /// Drop a session from memory and from the store.
    pub fn close_session(&self, id: SessionId) -> Result<(), EngineError> {
        self.sessions
            .remove(&id)
            .ok_or(EngineError::UnknownSession(id))?;
        self.store
            .remove(id)
            .map_err(|e| EngineError::Persistence(e.into()))?;
        tracing::info!("Closed session {}", id);
        Ok(())
    }

    /// A copy of a session's live state.
    pub fn session_state(&self, id: SessionId) -> Result<Session, EngineError> {
        Ok(self.session(id)?.clone())
    }

    // === Editing ===

    /// Apply a field-level edit.
    ///
    /// Keystrokes on a non-exclusive slot are kept as drafts; the exclusive
    /// slot of the question is only cleared once the edit is committed.
    pub fn edit(
        &self,
        id: SessionId,
        slot: &SlotId,
        edit: impl Into<Edit>,
        phase: EditPhase,
    ) -> Result<Applied, EngineError> {
        let mut live = self.session_mut(id)?;
        let (block, question) = self.editable_question(&live, slot)?;
        let phase = if self.config.clear_exclusive_on_keystroke {
            EditPhase::Commit
        } else {
            phase
        };

        let session = &mut *live;
        let applied = ExclusivityEnforcer::new(question).apply(
            &mut session.answers,
            &mut session.drafts,
            slot,
            edit.into(),
            phase,
        )?;
        if !applied.drafted || !applied.cleared.is_empty() {
            reopen(id, session, &block.id);
        }
        Ok(applied)
    }

    /// Commit a slot's draft, as when focus leaves the field.
    pub fn blur(&self, id: SessionId, slot: &SlotId) -> Result<Option<Applied>, EngineError> {
        let mut live = self.session_mut(id)?;
        let (block, question) = self.editable_question(&live, slot)?;

        let session = &mut *live;
        let applied = ExclusivityEnforcer::new(question).commit_draft(
            &mut session.answers,
            &mut session.drafts,
            slot,
        )?;
        if applied.is_some() {
            reopen(id, session, &block.id);
        }
        Ok(applied)
    }

    /// The block holding a slot and the question it is shown in, given the
    /// session's answers.
    fn editable_question(
        &self,
        session: &Session,
        slot: &SlotId,
    ) -> Result<(&Block, &Question), EngineError> {
        let block = self
            .questionnaire
            .block_of(slot)
            .ok_or_else(|| AnswerError::UnknownSlot(slot.clone()))?;
        let path = self.router().routing_path(&session.answers);
        if !path.contains(&block.id) {
            return Err(EngineError::BlockNotOnPath(block.id.clone()));
        }
        let view = ReachableAnswers::on_path(&self.questionnaire, &session.answers, &path);
        let question = owning_question(&block.questions_for(&view), slot).ok_or_else(|| {
            EngineError::SlotNotInBlock {
                slot: slot.clone(),
                block: block.id.clone(),
            }
        })?;
        Ok((block, question))
    }

    // === Submission ===

    /// Submit a block.
    ///
    /// Pending drafts of the block are committed, then the edits are applied
    /// with exclusive slots last, then the block is validated. A rejected
    /// submission updates the live session (so a mismatched total stays on
    /// display) but is not committed. An accepted one is routed, skipped
    /// answers are invalidated where configured, and the whole result is
    /// committed to the store; if that commit fails the session is left as
    /// it was.
    pub fn submit_block(
        &self,
        id: SessionId,
        block: &BlockId,
        edits: AnswerEdits,
    ) -> Result<Submission, EngineError> {
        let mut live = self.session_mut(id)?;
        let definition = self
            .questionnaire
            .block(block)
            .ok_or_else(|| EngineError::UnknownBlock(block.clone()))?;
        let router = self.router();
        let shown = router.routing_path(&live.answers);
        if !shown.contains(block) {
            return Err(EngineError::BlockNotOnPath(block.clone()));
        }
        tracing::debug!(
            "Session {}: submitting block '{}' with {} edit(s)",
            id,
            block,
            edits.len()
        );

        // Variants are picked from the answers the page was shown with.
        let questions = {
            let view = ReachableAnswers::on_path(&self.questionnaire, &live.answers, &shown);
            definition.questions_for(&view)
        };

        let mut working = live.clone();
        Self::apply_edits(&mut working, definition, &questions, edits)?;

        let path = router.routing_path(&working.answers);
        let errors = self.validate(&mut working, definition, &questions, &path);
        if !errors.is_empty() {
            tracing::warn!(
                "Session {}: block '{}' rejected with {} error(s)",
                id,
                block,
                errors.len()
            );
            // The rejected answers stay on display, so the block must be
            // submitted again before the questionnaire can complete.
            working.progress.forget(block);
            *live = working;
            return Ok(Submission { errors, next: None });
        }

        working.progress.mark_submitted(block.clone());
        self.invalidate_skipped(&mut working, &path);

        let next = match path.next(block) {
            Some(Next::Block(location)) => Next::Block(location),
            Some(Next::Summary) | None => match working.progress.first_incomplete(&path) {
                Some(location) => Next::Block(location.clone()),
                None => Next::Summary,
            },
        };

        self.commit(id, &working)?;
        *live = working;
        tracing::debug!("Session {}: block '{}' routes to {:?}", id, block, next);

        Ok(Submission {
            errors: Vec::new(),
            next: Some(next),
        })
    }

    fn apply_edits(
        session: &mut Session,
        block: &Block,
        questions: &[&Question],
        edits: AnswerEdits,
    ) -> Result<(), EngineError> {
        // Submitting moves focus off every field.
        for &question in questions {
            let pending: Vec<SlotId> = question
                .answers()
                .iter()
                .map(|slot| slot.id())
                .filter(|slot| session.drafts.contains_key(*slot) && !edits.contains(slot))
                .cloned()
                .collect();
            for slot in pending {
                ExclusivityEnforcer::new(question).commit_draft(
                    &mut session.answers,
                    &mut session.drafts,
                    &slot,
                )?;
            }
        }

        let mut others = Vec::new();
        let mut exclusive = Vec::new();
        for (slot, edit) in edits {
            let question =
                owning_question(questions, &slot).ok_or_else(|| EngineError::SlotNotInBlock {
                    slot: slot.clone(),
                    block: block.id.clone(),
                })?;
            let is_exclusive = question
                .answer(&slot)
                .is_some_and(|answer| answer.kind().is_exclusive());
            if is_exclusive {
                exclusive.push((question, slot, edit));
            } else {
                others.push((question, slot, edit));
            }
        }

        for (question, slot, edit) in others.into_iter().chain(exclusive) {
            ExclusivityEnforcer::new(question).apply(
                &mut session.answers,
                &mut session.drafts,
                &slot,
                edit,
                EditPhase::Commit,
            )?;
        }
        Ok(())
    }

    fn validate(
        &self,
        session: &mut Session,
        block: &Block,
        questions: &[&Question],
        path: &RoutingPath,
    ) -> Vec<ValidationError> {
        let view = ReachableAnswers::on_path(&self.questionnaire, &session.answers, path);
        let mut errors = Vec::new();

        for &question in questions {
            let answered = question
                .answers()
                .iter()
                .any(|slot| view.lookup(slot.id()).is_some());
            if question.is_mandatory() && !answered {
                errors.push(ValidationError::MandatoryUnanswered {
                    question: question.id().clone(),
                });
            }

            for slot in question.answers() {
                match (slot.kind(), view.lookup(slot.id())) {
                    // Summed slots are judged by their total alone.
                    (SlotKind::Number(_), _) if slot.accepts_raw_text() => {}
                    (SlotKind::Number(number), Some(AnswerValue::Number(value))) => {
                        let below = number.min.is_some_and(|min| *value < min);
                        let above = number.max.is_some_and(|max| *value > max);
                        if below || above {
                            errors.push(ValidationError::OutOfRange {
                                slot: slot.id().clone(),
                                value: *value,
                                min: number.min,
                                max: number.max,
                            });
                        }
                    }
                    (SlotKind::TextField(text), Some(AnswerValue::Text(value))) => {
                        if let Some(max_length) = text.max_length
                            && value.chars().count() > max_length
                        {
                            errors.push(ValidationError::TooLong {
                                slot: slot.id().clone(),
                                max_length,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut totals = Vec::new();
        for rule in &block.calculations {
            let total = CalculatedValidator::new(rule).evaluate(&view);
            if total.is_mismatch() {
                tracing::warn!(
                    "Calculation '{}' totals {}, target {}",
                    rule.id,
                    total.total,
                    rule.target
                );
                errors.push(ValidationError::TotalMismatch {
                    rule: rule.id.clone(),
                    total: total.total,
                    target: rule.target,
                    comparison: rule.comparison,
                });
            }
            totals.push((rule.id.clone(), total));
        }
        for (rule, total) in totals {
            session.totals.record(rule, total);
        }

        errors
    }

    fn invalidate_skipped(&self, session: &mut Session, path: &RoutingPath) {
        for block in self.questionnaire.blocks() {
            let wipe = block.invalidate_when_skipped || self.config.invalidate_skipped_answers;
            if !wipe || path.contains(&block.id) {
                continue;
            }

            let mut cleared = 0;
            for slot in block.slot_ids() {
                session.drafts.remove(slot);
                if session.answers.clear(slot).is_some() {
                    cleared += 1;
                }
            }
            session.progress.forget(&block.id);
            for rule in &block.calculations {
                session.totals.forget(&rule.id);
            }
            if cleared > 0 {
                tracing::debug!(
                    "Invalidated {} answer(s) of skipped block '{}'",
                    cleared,
                    block.id
                );
            }
        }
    }

    // === Queries ===

    /// An answer as the summary shows it.
    ///
    /// Answers in skipped blocks read as not provided.
    pub fn get_answer_for_display(
        &self,
        id: SessionId,
        slot: &SlotId,
    ) -> Result<DisplayValue, EngineError> {
        let session = self.session(id)?;
        let block = self
            .questionnaire
            .block_of(slot)
            .ok_or_else(|| AnswerError::UnknownSlot(slot.clone()))?;
        let path = self.router().routing_path(&session.answers);
        let view = ReachableAnswers::on_path(&self.questionnaire, &session.answers, &path);
        let definition = owning_question(&block.questions_for(&view), slot)
            .and_then(|question| question.answer(slot))
            .or_else(|| self.questionnaire.slot(slot))
            .ok_or_else(|| AnswerError::UnknownSlot(slot.clone()))?;

        Ok(match view.lookup(slot) {
            Some(value) => DisplayValue::Provided(format_value(definition, value)),
            None => DisplayValue::NoAnswer,
        })
    }

    /// Like `get_answer_for_display`, with the configured placeholder.
    pub fn display_text(&self, id: SessionId, slot: &SlotId) -> Result<String, EngineError> {
        let value = self.get_answer_for_display(id, slot)?;
        Ok(value.text(&self.config.no_answer_text).to_string())
    }

    /// The total of a calculation and how it compared on last submission.
    ///
    /// `None` until the block holding the rule has been submitted.
    pub fn calculation(
        &self,
        id: SessionId,
        rule: &RuleId,
    ) -> Result<Option<CalculatedTotal>, EngineError> {
        let session = self.session(id)?;
        let (_, definition) = self
            .questionnaire
            .calculation(rule)
            .ok_or_else(|| EngineError::UnknownRule(rule.clone()))?;
        let path = self.router().routing_path(&session.answers);
        let view = ReachableAnswers::on_path(&self.questionnaire, &session.answers, &path);
        Ok(session.totals.current(definition, &view))
    }

    /// Redisplay a previously computed total without resubmitting.
    pub fn get_calculated_total(
        &self,
        id: SessionId,
        rule: &RuleId,
    ) -> Result<Option<Numeric>, EngineError> {
        Ok(self.calculation(id, rule)?.map(|total| total.total))
    }

    /// The review page: every question on the routing path.
    pub fn summary(&self, id: SessionId) -> Result<Vec<SummaryRow>, EngineError> {
        let session = self.session(id)?;
        let path = self.router().routing_path(&session.answers);
        let view = ReachableAnswers::on_path(&self.questionnaire, &session.answers, &path);
        Ok(summarize(&self.questionnaire, &path, &view))
    }

    pub fn routing_path(&self, id: SessionId) -> Result<RoutingPath, EngineError> {
        let session = self.session(id)?;
        Ok(self.router().routing_path(&session.answers))
    }

    /// Whether a block may be displayed: it must be on the routing path.
    pub fn can_access(&self, id: SessionId, block: &BlockId) -> Result<bool, EngineError> {
        self.known_block(block)?;
        Ok(self.routing_path(id)?.contains(block))
    }

    /// The block before `block` on the routing path.
    pub fn previous_location(
        &self,
        id: SessionId,
        block: &BlockId,
    ) -> Result<Option<Location>, EngineError> {
        self.known_block(block)?;
        Ok(self.routing_path(id)?.previous(block).cloned())
    }

    /// Whether every block on the routing path has been submitted.
    pub fn is_complete(&self, id: SessionId) -> Result<bool, EngineError> {
        let session = self.session(id)?;
        let path = self.router().routing_path(&session.answers);
        Ok(session.progress.is_complete(&path))
    }

    pub fn section_status(
        &self,
        id: SessionId,
        section: &SectionId,
    ) -> Result<CompletionStatus, EngineError> {
        let definition = self
            .questionnaire
            .section(section)
            .ok_or_else(|| EngineError::UnknownSection(section.clone()))?;
        let session = self.session(id)?;
        let path = self.router().routing_path(&session.answers);
        Ok(session.progress.section_status(definition, &path))
    }

    /// The stored value of a slot, including answers in skipped blocks.
    pub fn answer(&self, id: SessionId, slot: &SlotId) -> Result<Option<AnswerValue>, EngineError> {
        self.questionnaire
            .slot(slot)
            .ok_or_else(|| AnswerError::UnknownSlot(slot.clone()))?;
        Ok(self.session(id)?.answers.get(slot).cloned())
    }

    // === Helpers ===

    fn router(&self) -> RoutingEngine<'_> {
        RoutingEngine::new(&self.questionnaire)
    }

    fn known_block(&self, block: &BlockId) -> Result<(), EngineError> {
        match self.questionnaire.block(block) {
            Some(_) => Ok(()),
            None => Err(EngineError::UnknownBlock(block.clone())),
        }
    }

    fn session(&self, id: SessionId) -> Result<Ref<'_, SessionId, Session>, EngineError> {
        self.sessions
            .get(&id)
            .ok_or(EngineError::UnknownSession(id))
    }

    fn session_mut(&self, id: SessionId) -> Result<RefMut<'_, SessionId, Session>, EngineError> {
        self.sessions
            .get_mut(&id)
            .ok_or(EngineError::UnknownSession(id))
    }

    fn commit(&self, id: SessionId, session: &Session) -> Result<(), EngineError> {
        let snapshot = SessionSnapshot::new(self.questionnaire.id(), session.clone());
        self.store.commit(id, &snapshot).map_err(|e| {
            let e: anyhow::Error = e.into();
            tracing::warn!("Failed to commit session {}: {:#}", id, e);
            EngineError::Persistence(e)
        })
    }
}

fn owning_question<'b>(questions: &[&'b Question], slot: &SlotId) -> Option<&'b Question> {
    questions
        .iter()
        .copied()
        .find(|question| question.answer(slot).is_some())
}

/// Drop a block's submission after its answers changed outside a submit.
fn reopen(id: SessionId, session: &mut Session, block: &BlockId) {
    if session.progress.forget(block) {
        tracing::debug!("Session {}: block '{}' changed, needs submitting again", id, block);
    }
}
