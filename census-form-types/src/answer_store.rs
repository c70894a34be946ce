use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{AnswerError, AnswerSlot, AnswerValue, Numeric, Question, SlotId};

/// Read access to current answers.
///
/// Implemented by the `AnswerStore` itself and by filtered views over it
/// (for example, one that hides answers in blocks the respondent skipped).
/// Predicates and calculations only ever read through this trait.
pub trait AnswerLookup {
    /// The current value of a slot, or `None` if it has no answer.
    fn lookup(&self, slot: &SlotId) -> Option<&AnswerValue>;
}

/// The current answers of one respondent.
///
/// A slot with no entry has "no answer provided", which is distinct from an
/// answer of `""` or `0`. Values are type-checked against the slot declaration
/// on the way in; no coercion happens here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerStore {
    values: BTreeMap<SlotId, AnswerValue>,

    /// Slots that have held a value at some point.
    #[serde(default)]
    touched: BTreeSet<SlotId>,
}

impl AnswerStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value for a slot, returning the value it replaced.
    ///
    /// Fails with `AnswerError::InvalidType` (and leaves the store untouched)
    /// if the value does not fit the slot's declared type.
    pub fn set(
        &mut self,
        slot: &AnswerSlot,
        value: AnswerValue,
    ) -> Result<Option<AnswerValue>, AnswerError> {
        slot.check(&value)?;
        self.touched.insert(slot.id().clone());
        Ok(self.values.insert(slot.id().clone(), value))
    }

    /// Remove the answer for a slot, returning it.
    pub fn clear(&mut self, slot: &SlotId) -> Option<AnswerValue> {
        self.values.remove(slot)
    }

    /// Get the value for a slot.
    pub fn get(&self, slot: &SlotId) -> Option<&AnswerValue> {
        self.values.get(slot)
    }

    /// Check if a slot currently has an answer.
    pub fn contains(&self, slot: &SlotId) -> bool {
        self.values.contains_key(slot)
    }

    /// Check if a slot has ever held an answer.
    pub fn is_touched(&self, slot: &SlotId) -> bool {
        self.touched.contains(slot)
    }

    /// The current state of every slot of a question, in declaration order.
    pub fn get_all_for_question<'a>(
        &'a self,
        question: &'a Question,
    ) -> Vec<(&'a SlotId, Option<&'a AnswerValue>)> {
        question
            .answers()
            .iter()
            .map(|slot| (slot.id(), self.get(slot.id())))
            .collect()
    }

    /// Get an iterator over all slot-value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&SlotId, &AnswerValue)> {
        self.values.iter()
    }

    /// Get the number of answered slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if nothing has been answered.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // === Convenience accessors ===

    /// Get a text value for a slot.
    pub fn get_text(&self, slot: &SlotId) -> Result<&str, AnswerError> {
        match self.get(slot) {
            Some(AnswerValue::Text(s)) => Ok(s),
            Some(other) => Err(AnswerError::InvalidType {
                slot: slot.clone(),
                expected: "Text",
                actual: other.type_name(),
            }),
            None => Err(AnswerError::Missing(slot.clone())),
        }
    }

    /// Get a numeric value for a slot.
    pub fn get_number(&self, slot: &SlotId) -> Result<Numeric, AnswerError> {
        match self.get(slot) {
            Some(AnswerValue::Number(n)) => Ok(*n),
            Some(other) => Err(AnswerError::InvalidType {
                slot: slot.clone(),
                expected: "Number",
                actual: other.type_name(),
            }),
            None => Err(AnswerError::Missing(slot.clone())),
        }
    }

    /// Get the chosen option of a radio slot.
    pub fn get_choice(&self, slot: &SlotId) -> Result<&str, AnswerError> {
        match self.get(slot) {
            Some(AnswerValue::Choice(c)) => Ok(c),
            Some(other) => Err(AnswerError::InvalidType {
                slot: slot.clone(),
                expected: "Choice",
                actual: other.type_name(),
            }),
            None => Err(AnswerError::Missing(slot.clone())),
        }
    }
}

impl AnswerLookup for AnswerStore {
    fn lookup(&self, slot: &SlotId) -> Option<&AnswerValue> {
        self.get(slot)
    }
}

impl<'a> IntoIterator for &'a AnswerStore {
    type Item = (&'a SlotId, &'a AnswerValue);
    type IntoIter = std::collections::btree_map::Iter<'a, SlotId, AnswerValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
