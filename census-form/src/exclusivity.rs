//! Exclusivity groups.
//!
//! A question with an exclusive slot ("I prefer not to say") forms a group
//! with all its other slots. At most one side of the group holds an answer:
//! ticking the exclusive slot clears the others at once, and committing a
//! value in another slot clears the exclusive one.
//!
//! The rules live in [`transition`], a pure function over the group state.
//! [`ExclusivityEnforcer`] applies its effects to an [`AnswerStore`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use census_form_types::{
    AnswerError, AnswerStore, AnswerValue, DateValue, Numeric, Question, SlotId,
};

/// A change to one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum Edit {
    Set(AnswerValue),
    Clear,
}

macro_rules! edit_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Edit {
                fn from(value: $ty) -> Self {
                    Self::Set(value.into())
                }
            }
        )*
    };
}

edit_from!(AnswerValue, String, &str, i32, i64, Numeric, DateValue);

/// When an edit happens relative to the field losing focus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditPhase {
    /// The field still has focus; the value is only a draft.
    Keystroke,

    /// Focus left the field (or the page was submitted).
    #[default]
    Commit,
}

/// Uncommitted edits, keyed by slot.
pub type Drafts = BTreeMap<SlotId, Edit>;

/// Which side of an exclusivity group holds answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupState {
    #[default]
    Unset,
    ExclusiveSet,
    OthersSet,
}

impl GroupState {
    /// Read the state of a question's group from stored answers.
    pub fn observe(question: &Question, answers: &AnswerStore) -> Self {
        let exclusive = question
            .exclusive_answer()
            .is_some_and(|slot| answers.contains(slot.id()));
        if exclusive {
            Self::ExclusiveSet
        } else if others_answered(question, answers) {
            Self::OthersSet
        } else {
            Self::Unset
        }
    }
}

/// An edit, as seen by the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupEvent {
    ExclusiveSet,
    ExclusiveCleared,
    /// A non-exclusive slot was given a value and committed.
    OtherCommitted,
    /// A non-exclusive slot was typed into but not committed.
    OtherDrafted,
    /// A non-exclusive slot was cleared.
    OtherCleared { others_remain: bool },
}

/// Side effect of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Keep,
    ClearOthers,
    ClearExclusive,
}

/// The group state machine.
pub fn transition(state: GroupState, event: GroupEvent) -> (GroupState, Effect) {
    use GroupState::*;

    match (state, event) {
        (OthersSet, GroupEvent::ExclusiveSet) => (ExclusiveSet, Effect::ClearOthers),
        (_, GroupEvent::ExclusiveSet) => (ExclusiveSet, Effect::Keep),
        (ExclusiveSet, GroupEvent::OtherCommitted) => (OthersSet, Effect::ClearExclusive),
        (_, GroupEvent::OtherCommitted) => (OthersSet, Effect::Keep),
        (ExclusiveSet, GroupEvent::ExclusiveCleared) => (Unset, Effect::Keep),
        (OthersSet, GroupEvent::OtherCleared { others_remain: false }) => (Unset, Effect::Keep),
        (state, _) => (state, Effect::Keep),
    }
}

/// Result of applying one edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Applied {
    /// Slots emptied as a side effect.
    pub cleared: Vec<SlotId>,

    /// Group state after the edit.
    pub state: GroupState,

    /// Whether the edit was only kept as a draft.
    pub drafted: bool,
}

/// Applies edits to one question while holding its exclusivity invariant.
///
/// Questions without an exclusive slot go through the enforcer too; they
/// simply never produce a clear.
#[derive(Debug, Clone, Copy)]
pub struct ExclusivityEnforcer<'q> {
    question: &'q Question,
}

impl<'q> ExclusivityEnforcer<'q> {
    pub fn new(question: &'q Question) -> Self {
        Self { question }
    }

    pub fn state(&self, answers: &AnswerStore) -> GroupState {
        GroupState::observe(self.question, answers)
    }

    /// Apply an edit to one of the question's slots.
    ///
    /// A keystroke on a non-exclusive slot is type-checked and kept in
    /// `drafts` without touching `answers`. The exclusive slot is a checkbox,
    /// so every edit to it takes effect at once regardless of `phase`.
    ///
    /// On error nothing is changed.
    pub fn apply(
        &self,
        answers: &mut AnswerStore,
        drafts: &mut Drafts,
        slot: &SlotId,
        edit: Edit,
        phase: EditPhase,
    ) -> Result<Applied, AnswerError> {
        let target = self
            .question
            .answer(slot)
            .ok_or_else(|| AnswerError::UnknownSlot(slot.clone()))?;
        let before = self.state(answers);
        let exclusive = target.kind().is_exclusive();

        let event = match (edit, exclusive, phase) {
            (Edit::Set(value), true, _) => {
                answers.set(target, value)?;
                for other in self.question.non_exclusive_answers() {
                    drafts.remove(other.id());
                }
                GroupEvent::ExclusiveSet
            }
            (Edit::Clear, true, _) => {
                answers.clear(slot);
                GroupEvent::ExclusiveCleared
            }
            (Edit::Set(value), false, EditPhase::Keystroke) => {
                target.check(&value)?;
                drafts.insert(slot.clone(), Edit::Set(value));
                GroupEvent::OtherDrafted
            }
            (Edit::Clear, false, EditPhase::Keystroke) => {
                drafts.insert(slot.clone(), Edit::Clear);
                GroupEvent::OtherDrafted
            }
            (Edit::Set(value), false, EditPhase::Commit) => {
                answers.set(target, value)?;
                drafts.remove(slot);
                GroupEvent::OtherCommitted
            }
            (Edit::Clear, false, EditPhase::Commit) => {
                answers.clear(slot);
                drafts.remove(slot);
                GroupEvent::OtherCleared {
                    others_remain: others_answered(self.question, answers),
                }
            }
        };

        let (state, effect) = transition(before, event);
        let cleared = self.perform(effect, answers, drafts);
        if !cleared.is_empty() {
            tracing::debug!(
                "Exclusivity on question '{}' cleared {:?}",
                self.question.id(),
                cleared
            );
        }

        Ok(Applied {
            cleared,
            state,
            drafted: event == GroupEvent::OtherDrafted,
        })
    }

    /// Commit a slot's pending draft, as when focus leaves the field.
    ///
    /// Returns `None` if the slot has no draft.
    pub fn commit_draft(
        &self,
        answers: &mut AnswerStore,
        drafts: &mut Drafts,
        slot: &SlotId,
    ) -> Result<Option<Applied>, AnswerError> {
        let Some(edit) = drafts.get(slot).cloned() else {
            return Ok(None);
        };
        self.apply(answers, drafts, slot, edit, EditPhase::Commit)
            .map(Some)
    }

    fn perform(
        &self,
        effect: Effect,
        answers: &mut AnswerStore,
        drafts: &mut Drafts,
    ) -> Vec<SlotId> {
        let mut cleared = Vec::new();
        match effect {
            Effect::Keep => {}
            Effect::ClearOthers => {
                for other in self.question.non_exclusive_answers() {
                    drafts.remove(other.id());
                    if answers.clear(other.id()).is_some() {
                        cleared.push(other.id().clone());
                    }
                }
            }
            Effect::ClearExclusive => {
                if let Some(exclusive) = self.question.exclusive_answer()
                    && answers.clear(exclusive.id()).is_some()
                {
                    cleared.push(exclusive.id().clone());
                }
            }
        }
        cleared
    }
}

fn others_answered(question: &Question, answers: &AnswerStore) -> bool {
    question
        .non_exclusive_answers()
        .any(|slot| answers.contains(slot.id()))
}
