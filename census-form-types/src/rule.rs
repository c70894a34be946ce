//! Rule data: routing predicates, routing rules and calculated rules.
//!
//! Rules are plain data so that every slot and block they mention can be
//! checked when the schema loads.

use serde::{Deserialize, Serialize};

use crate::{AnswerLookup, AnswerValue, BlockId, Numeric, RuleId, SectionId, SlotId};

/// A condition over current answers.
///
/// Evaluated left to right; `All` and `Any` short-circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// The slot's answer equals the value. False when unanswered.
    Equals { slot: SlotId, value: Literal },

    /// Negation of `Equals`. True when unanswered.
    NotEquals { slot: SlotId, value: Literal },

    /// The slot's answer equals one of the values.
    In { slot: SlotId, values: Vec<Literal> },

    /// Negation of `In`.
    NotIn { slot: SlotId, values: Vec<Literal> },

    /// A checkbox answer includes the option (or a radio answer is it).
    Contains { slot: SlotId, value: String },

    /// The slot has an answer.
    Answered { slot: SlotId },

    /// The slot has no answer.
    Unanswered { slot: SlotId },

    /// The slot's numeric answer is greater than the value.
    GreaterThan { slot: SlotId, value: Numeric },

    /// The slot's numeric answer is less than the value.
    LessThan { slot: SlotId, value: Numeric },

    All { rules: Vec<Predicate> },

    Any { rules: Vec<Predicate> },

    Not { rule: Box<Predicate> },
}

impl Predicate {
    pub fn equals(slot: impl Into<SlotId>, value: impl Into<Literal>) -> Self {
        Self::Equals {
            slot: slot.into(),
            value: value.into(),
        }
    }

    pub fn not_equals(slot: impl Into<SlotId>, value: impl Into<Literal>) -> Self {
        Self::NotEquals {
            slot: slot.into(),
            value: value.into(),
        }
    }

    pub fn answered(slot: impl Into<SlotId>) -> Self {
        Self::Answered { slot: slot.into() }
    }

    pub fn unanswered(slot: impl Into<SlotId>) -> Self {
        Self::Unanswered { slot: slot.into() }
    }

    /// Evaluate against a set of answers.
    pub fn evaluate(&self, answers: &dyn AnswerLookup) -> bool {
        match self {
            Self::Equals { slot, value } => answers.lookup(slot).is_some_and(|a| value.matches(a)),
            Self::NotEquals { slot, value } => {
                !answers.lookup(slot).is_some_and(|a| value.matches(a))
            }
            Self::In { slot, values } => answers
                .lookup(slot)
                .is_some_and(|a| values.iter().any(|v| v.matches(a))),
            Self::NotIn { slot, values } => !answers
                .lookup(slot)
                .is_some_and(|a| values.iter().any(|v| v.matches(a))),
            Self::Contains { slot, value } => match answers.lookup(slot) {
                Some(AnswerValue::Choices(choices)) => choices.contains(value),
                Some(AnswerValue::Choice(choice)) => choice == value,
                _ => false,
            },
            Self::Answered { slot } => answers.lookup(slot).is_some(),
            Self::Unanswered { slot } => answers.lookup(slot).is_none(),
            Self::GreaterThan { slot, value } => {
                numeric_answer(answers, slot).is_some_and(|answer| answer > *value)
            }
            Self::LessThan { slot, value } => {
                numeric_answer(answers, slot).is_some_and(|answer| answer < *value)
            }
            Self::All { rules } => rules.iter().all(|rule| rule.evaluate(answers)),
            Self::Any { rules } => rules.iter().any(|rule| rule.evaluate(answers)),
            Self::Not { rule } => !rule.evaluate(answers),
        }
    }

    /// Visit every slot the predicate reads.
    pub fn visit_slots<'a>(&'a self, visit: &mut dyn FnMut(&'a SlotId)) {
        match self {
            Self::Equals { slot, .. }
            | Self::NotEquals { slot, .. }
            | Self::In { slot, .. }
            | Self::NotIn { slot, .. }
            | Self::Contains { slot, .. }
            | Self::Answered { slot }
            | Self::Unanswered { slot }
            | Self::GreaterThan { slot, .. }
            | Self::LessThan { slot, .. } => visit(slot),
            Self::All { rules } | Self::Any { rules } => {
                for rule in rules {
                    rule.visit_slots(visit);
                }
            }
            Self::Not { rule } => rule.visit_slots(visit),
        }
    }
}

fn numeric_answer(answers: &dyn AnswerLookup, slot: &SlotId) -> Option<Numeric> {
    match answers.lookup(slot)? {
        AnswerValue::Number(n) => Some(*n),
        AnswerValue::Text(t) | AnswerValue::Choice(t) => t.parse().ok(),
        _ => None,
    }
}

/// A literal a predicate compares answers against.
///
/// Written in the schema as a bare JSON number or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(Numeric),
    Text(String),
}

impl Literal {
    /// Whether an answer equals this literal.
    ///
    /// Text answers compare as numbers when both sides parse, so a radio
    /// option `"10"` matches the literal `10`.
    pub fn matches(&self, answer: &AnswerValue) -> bool {
        match (self, answer) {
            (Self::Text(text), AnswerValue::Text(a) | AnswerValue::Choice(a)) => text == a,
            (Self::Text(text), AnswerValue::Choices(a)) => a.len() == 1 && a[0] == *text,
            (Self::Text(text), AnswerValue::Number(a)) => {
                text.parse::<Numeric>().is_ok_and(|n| n == *a)
            }
            (Self::Number(n), AnswerValue::Number(a)) => n == a,
            (Self::Number(n), AnswerValue::Text(a) | AnswerValue::Choice(a)) => {
                a.parse::<Numeric>().is_ok_and(|a| a == *n)
            }
            _ => false,
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Numeric> for Literal {
    fn from(n: Numeric) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Self::Number(Numeric::from(i))
    }
}

impl From<i32> for Literal {
    fn from(i: i32) -> Self {
        Self::Number(Numeric::from(i))
    }
}

/// Where a routing rule sends the respondent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// A specific block.
    Block(BlockId),

    /// The first block of a section.
    Section(SectionId),

    /// The end of the questionnaire.
    Summary,
}

/// A conditional jump attached to a block.
///
/// A rule without `when` always matches; it is normally the last rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Predicate>,
    pub goto: Destination,
}

impl RoutingRule {
    /// A rule taken when the predicate holds.
    pub fn when(predicate: Predicate, goto: Destination) -> Self {
        Self {
            when: Some(predicate),
            goto,
        }
    }

    /// A rule that always matches.
    pub fn always(goto: Destination) -> Self {
        Self { when: None, goto }
    }

    /// Whether the rule matches the answers.
    pub fn matches(&self, answers: &dyn AnswerLookup) -> bool {
        self.when
            .as_ref()
            .is_none_or(|predicate| predicate.evaluate(answers))
    }
}

/// How a calculated total is compared to its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[default]
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl Comparison {
    /// Whether `total <op> target` holds.
    pub fn holds(&self, total: Numeric, target: Numeric) -> bool {
        match self {
            Self::Equal => total == target,
            Self::LessThan => total < target,
            Self::LessThanOrEqual => total <= target,
            Self::GreaterThan => total > target,
            Self::GreaterThanOrEqual => total >= target,
        }
    }
}

/// A derived total of numeric answers, checked against a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedRule {
    pub id: RuleId,

    /// The summed slots, in display order.
    pub sources: Vec<SlotId>,

    pub target: Numeric,

    #[serde(default)]
    pub comparison: Comparison,

    /// Label of the total field, e.g. "Total percentage".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CalculatedRule {
    /// A rule requiring the sources to sum exactly to the target.
    pub fn sum_equals<I, S>(id: impl Into<RuleId>, sources: I, target: impl Into<Numeric>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SlotId>,
    {
        Self {
            id: id.into(),
            sources: sources.into_iter().map(Into::into).collect(),
            target: target.into(),
            comparison: Comparison::Equal,
            label: None,
        }
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnswerStore;
    use crate::{AnswerSlot, ChoiceSlot, SlotKind};

    fn answers() -> AnswerStore {
        let mut answers = AnswerStore::new();
        answers
            .set(
                &AnswerSlot::new(
                    "over-16",
                    "Over 16",
                    SlotKind::Radio(ChoiceSlot::new(["Yes", "No"])),
                ),
                AnswerValue::Choice("Yes".into()),
            )
            .unwrap();
        answers
            .set(&AnswerSlot::number("bedrooms", "Bedrooms"), AnswerValue::from(3))
            .unwrap();
        answers
    }

    #[test]
    fn equals_and_not_equals() {
        let answers = answers();
        assert!(Predicate::equals("over-16", "Yes").evaluate(&answers));
        assert!(!Predicate::equals("over-16", "No").evaluate(&answers));
        assert!(!Predicate::equals("missing", "Yes").evaluate(&answers));
        assert!(Predicate::not_equals("missing", "Yes").evaluate(&answers));
    }

    #[test]
    fn numeric_comparisons() {
        let answers = answers();
        let more_than_two = Predicate::GreaterThan {
            slot: "bedrooms".into(),
            value: Numeric::from(2),
        };
        assert!(more_than_two.evaluate(&answers));
        assert!(Predicate::equals("bedrooms", 3).evaluate(&answers));
    }

    #[test]
    fn combinators_short_circuit() {
        let answers = answers();
        let rule = Predicate::All {
            rules: vec![
                Predicate::answered("over-16"),
                Predicate::Not {
                    rule: Box::new(Predicate::answered("missing")),
                },
            ],
        };
        assert!(rule.evaluate(&answers));
        assert!(
            Predicate::Any {
                rules: vec![Predicate::unanswered("over-16"), Predicate::answered("bedrooms")],
            }
            .evaluate(&answers)
        );
    }

    #[test]
    fn predicate_json_shape() {
        let predicate: Predicate = serde_json::from_str(
            r#"{"op": "in", "slot": "over-16", "values": ["Yes", 10]}"#,
        )
        .unwrap();
        assert_eq!(
            predicate,
            Predicate::In {
                slot: "over-16".into(),
                values: vec![Literal::from("Yes"), Literal::from(10)],
            }
        );
    }

    #[test]
    fn visits_nested_slots() {
        let rule = Predicate::Any {
            rules: vec![
                Predicate::answered("a"),
                Predicate::Not {
                    rule: Box::new(Predicate::equals("b", "x")),
                },
            ],
        };
        let mut seen = Vec::new();
        rule.visit_slots(&mut |slot| seen.push(slot.as_str().to_string()));
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn destination_json_shape() {
        let rule: RoutingRule =
            serde_json::from_str(r#"{"goto": {"block": "country-of-birth"}}"#).unwrap();
        assert_eq!(rule, RoutingRule::always(Destination::Block("country-of-birth".into())));
        let summary: Destination = serde_json::from_str(r#""summary""#).unwrap();
        assert_eq!(summary, Destination::Summary);
    }
}
