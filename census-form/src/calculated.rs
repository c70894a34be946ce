//! Calculated totals.
//!
//! A [`CalculatedRule`] sums numeric answers and compares the sum to a
//! target. Sources are read leniently: absent answers, text that does not
//! parse as a number and negative numbers all contribute zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use census_form_types::{AnswerLookup, AnswerValue, CalculatedRule, Numeric, RuleId, SlotId};

/// Outcome of checking a total against its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationOutcome {
    Matches,
    /// Not evaluated since the sources last changed.
    Pending,
    Mismatch,
}

/// A computed total together with the source values it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedTotal {
    pub total: Numeric,
    pub outcome: CalculationOutcome,
    pub sources: Vec<(SlotId, Option<AnswerValue>)>,
}

impl CalculatedTotal {
    pub fn is_mismatch(&self) -> bool {
        self.outcome == CalculationOutcome::Mismatch
    }
}

/// Evaluates one calculated rule.
#[derive(Debug, Clone, Copy)]
pub struct CalculatedValidator<'r> {
    rule: &'r CalculatedRule,
}

impl<'r> CalculatedValidator<'r> {
    pub fn new(rule: &'r CalculatedRule) -> Self {
        Self { rule }
    }

    /// The amount a single raw answer adds to a total.
    pub fn contribution(value: Option<&AnswerValue>) -> Numeric {
        let number = match value {
            Some(AnswerValue::Number(number)) => Some(*number),
            Some(AnswerValue::Text(text)) => text.trim().parse::<Numeric>().ok(),
            _ => None,
        };
        number
            .filter(|number| !number.is_negative())
            .unwrap_or(Numeric::ZERO)
    }

    /// Sum the sources, keeping the precision of the inputs.
    pub fn total(&self, answers: &dyn AnswerLookup) -> Numeric {
        self.rule
            .sources
            .iter()
            .fold(Numeric::ZERO, |total, slot| {
                let contribution = Self::contribution(answers.lookup(slot));
                total.checked_add(contribution).unwrap_or_else(|| {
                    tracing::warn!(
                        "Calculation '{}' overflowed adding answer '{}'; contribution ignored",
                        self.rule.id,
                        slot
                    );
                    total
                })
            })
    }

    /// Compute the total and compare it to the target.
    pub fn evaluate(&self, answers: &dyn AnswerLookup) -> CalculatedTotal {
        let total = self.total(answers);
        let outcome = if self.rule.comparison.holds(total, self.rule.target) {
            CalculationOutcome::Matches
        } else {
            CalculationOutcome::Mismatch
        };
        CalculatedTotal {
            total,
            outcome,
            sources: self.snapshot(answers),
        }
    }

    /// Compute the total without judging it.
    pub fn pending(&self, answers: &dyn AnswerLookup) -> CalculatedTotal {
        CalculatedTotal {
            total: self.total(answers),
            outcome: CalculationOutcome::Pending,
            sources: self.snapshot(answers),
        }
    }

    fn snapshot(&self, answers: &dyn AnswerLookup) -> Vec<(SlotId, Option<AnswerValue>)> {
        self.rule
            .sources
            .iter()
            .map(|slot| (slot.clone(), answers.lookup(slot).cloned()))
            .collect()
    }

    /// Whether the sources still hold the values a total was computed from.
    pub fn is_current(&self, recorded: &CalculatedTotal, answers: &dyn AnswerLookup) -> bool {
        recorded.sources.len() == self.rule.sources.len()
            && recorded
                .sources
                .iter()
                .all(|(slot, value)| answers.lookup(slot) == value.as_ref())
    }
}

/// Totals recorded at block submission, per rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatedTotals {
    totals: BTreeMap<RuleId, CalculatedTotal>,
}

impl CalculatedTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, rule: RuleId, total: CalculatedTotal) {
        self.totals.insert(rule, total);
    }

    pub fn get(&self, rule: &RuleId) -> Option<&CalculatedTotal> {
        self.totals.get(rule)
    }

    pub fn forget(&mut self, rule: &RuleId) -> Option<CalculatedTotal> {
        self.totals.remove(rule)
    }

    /// The total to display for a rule.
    ///
    /// The recorded total is returned as-is while its sources are unchanged.
    /// Once a source changes the total is recomputed and marked pending until
    /// the next submission. Rules never evaluated have no total.
    pub fn current(
        &self,
        rule: &CalculatedRule,
        answers: &dyn AnswerLookup,
    ) -> Option<CalculatedTotal> {
        let recorded = self.totals.get(&rule.id)?;
        let validator = CalculatedValidator::new(rule);
        if validator.is_current(recorded, answers) {
            Some(recorded.clone())
        } else {
            Some(validator.pending(answers))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RuleId, &CalculatedTotal)> {
        self.totals.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_form_types::{AnswerSlot, AnswerStore, Comparison};

    fn rule() -> CalculatedRule {
        CalculatedRule::sum_equals("total", ["a", "b", "c", "d"], 100)
    }

    fn answers(values: [AnswerValue; 4]) -> AnswerStore {
        let mut store = AnswerStore::new();
        for (id, value) in ["a", "b", "c", "d"].into_iter().zip(values) {
            store.set(&slot(id), value).unwrap();
        }
        store
    }

    fn slot(id: &str) -> AnswerSlot {
        AnswerSlot::text(id, id)
    }

    fn text(value: &str) -> AnswerValue {
        AnswerValue::Text(value.to_string())
    }

    #[test]
    fn contributions() {
        assert_eq!(CalculatedValidator::contribution(None), Numeric::ZERO);
        assert_eq!(
            CalculatedValidator::contribution(Some(&text("ten"))),
            Numeric::ZERO
        );
        assert_eq!(
            CalculatedValidator::contribution(Some(&AnswerValue::from(-10))),
            Numeric::ZERO
        );
        assert_eq!(
            CalculatedValidator::contribution(Some(&text(" 12.5 "))),
            "12.5".parse::<Numeric>().unwrap()
        );
        assert_eq!(
            CalculatedValidator::contribution(Some(&text("-3"))),
            Numeric::ZERO
        );
    }

    #[test]
    fn matching_total() {
        let rule = rule();
        let total = CalculatedValidator::new(&rule)
            .evaluate(&answers([text("10"), text("20"), text("30"), text("40")]));

        assert_eq!(total.total, Numeric::from(100));
        assert_eq!(total.outcome, CalculationOutcome::Matches);
    }

    #[test]
    fn mismatch_keeps_total() {
        let rule = rule();
        let total = CalculatedValidator::new(&rule)
            .evaluate(&answers([text("20"), text("30"), text("40"), text("50")]));

        assert_eq!(total.total, Numeric::from(140));
        assert!(total.is_mismatch());
    }

    #[test]
    fn decimals_are_exact() {
        let rule = rule();
        let total = CalculatedValidator::new(&rule)
            .total(&answers([text("1.23"), text("2.35"), text("3.45"), text("4.56")]));

        assert_eq!(total.to_string(), "11.59");
    }

    #[test]
    fn other_comparisons() {
        let rule = rule().with_comparison(Comparison::LessThanOrEqual);
        let total = CalculatedValidator::new(&rule)
            .evaluate(&answers([text("1"), text("2"), text("3"), text("4")]));

        assert_eq!(total.outcome, CalculationOutcome::Matches);
    }

    #[test]
    fn recorded_total_survives_until_sources_change() {
        let rule = rule();
        let mut store = answers([text("1"), text("2"), text("3"), text("4")]);
        let mut totals = CalculatedTotals::new();
        assert_eq!(totals.current(&rule, &store), None);

        totals.record(rule.id.clone(), CalculatedValidator::new(&rule).evaluate(&store));
        let current = totals.current(&rule, &store).unwrap();
        assert_eq!(current.total, Numeric::from(10));
        assert_eq!(current.outcome, CalculationOutcome::Mismatch);

        store.set(&slot("a"), text("5")).unwrap();
        let current = totals.current(&rule, &store).unwrap();
        assert_eq!(current.total, Numeric::from(14));
        assert_eq!(current.outcome, CalculationOutcome::Pending);
    }
}
