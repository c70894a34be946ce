use serde::{Deserialize, Serialize};

use crate::{AnswerError, AnswerValue, DateValue, Numeric, QuestionId, SlotId};

/// A single question: a title plus one or more answer slots.
///
/// At most one slot may be of the `Exclusive` kind. Together with the other
/// slots it forms the question's exclusivity group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,

    /// The title shown to the respondent.
    title: String,

    /// The answer slots, in display order.
    answers: Vec<AnswerSlot>,

    /// Whether an unanswered question blocks submission.
    #[serde(default)]
    mandatory: bool,
}

impl Question {
    /// Create a new optional question with no answers yet.
    pub fn new(id: impl Into<QuestionId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            answers: Vec::new(),
            mandatory: false,
        }
    }

    /// Add an answer slot.
    pub fn with_answer(mut self, slot: AnswerSlot) -> Self {
        self.answers.push(slot);
        self
    }

    /// Mark the question as mandatory.
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// Get the answer slots.
    pub fn answers(&self) -> &[AnswerSlot] {
        &self.answers
    }

    pub(crate) fn answers_mut(&mut self) -> &mut [AnswerSlot] {
        &mut self.answers
    }

    /// Find one of this question's slots.
    pub fn answer(&self, slot: &SlotId) -> Option<&AnswerSlot> {
        self.answers.iter().find(|answer| answer.id() == slot)
    }

    /// The exclusive slot, if the question has one.
    pub fn exclusive_answer(&self) -> Option<&AnswerSlot> {
        self.answers.iter().find(|answer| answer.kind().is_exclusive())
    }

    /// Every slot other than the exclusive one.
    pub fn non_exclusive_answers(&self) -> impl Iterator<Item = &AnswerSlot> {
        self.answers
            .iter()
            .filter(|answer| !answer.kind().is_exclusive())
    }
}

/// A single answer slot within a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSlot {
    id: SlotId,

    /// The field label shown to the respondent.
    label: String,

    /// The declared type of the slot.
    #[serde(flatten)]
    kind: SlotKind,

    /// Set at load time for numeric slots summed by a calculated rule, which
    /// must hold interim text such as "ten".
    #[serde(skip)]
    accepts_raw_text: bool,
}

impl AnswerSlot {
    /// Create a new slot.
    pub fn new(id: impl Into<SlotId>, label: impl Into<String>, kind: SlotKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            accepts_raw_text: false,
        }
    }

    /// A free text slot.
    pub fn text(id: impl Into<SlotId>, label: impl Into<String>) -> Self {
        Self::new(id, label, SlotKind::TextField(TextSlot::default()))
    }

    /// A numeric slot without bounds.
    pub fn number(id: impl Into<SlotId>, label: impl Into<String>) -> Self {
        Self::new(id, label, SlotKind::Number(NumberSlot::default()))
    }

    /// A single-option checkbox that excludes every other slot of its question.
    pub fn exclusive(id: impl Into<SlotId>, option: impl Into<String>) -> Self {
        let option = option.into();
        Self::new(
            id,
            option.clone(),
            SlotKind::Exclusive(ExclusiveSlot {
                option: ChoiceOption::new(option),
            }),
        )
    }

    pub fn id(&self) -> &SlotId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &SlotKind {
        &self.kind
    }

    /// Whether the slot takes unparsed text in place of a number.
    pub fn accepts_raw_text(&self) -> bool {
        self.accepts_raw_text
    }

    pub(crate) fn set_accepts_raw_text(&mut self, accepts: bool) {
        self.accepts_raw_text = accepts;
    }

    /// Check that a value matches the slot's declared type.
    pub fn check(&self, value: &AnswerValue) -> Result<(), AnswerError> {
        let fits = match (&self.kind, value) {
            (SlotKind::TextField(_), AnswerValue::Text(_)) => true,
            (SlotKind::Number(_), AnswerValue::Number(_)) => true,
            (SlotKind::Number(_), AnswerValue::Text(_)) => self.accepts_raw_text,
            (SlotKind::Date(date), AnswerValue::Date(value)) => date.components.fits(value),
            (SlotKind::Radio(choice), AnswerValue::Choice(value)) => {
                return choice.check(&self.id, std::slice::from_ref(value));
            }
            (SlotKind::Checkbox(choice), AnswerValue::Choices(values)) => {
                return choice.check(&self.id, values);
            }
            (SlotKind::Exclusive(exclusive), AnswerValue::Choices(values)) => {
                return match values.as_slice() {
                    [value] if *value == exclusive.option.value => Ok(()),
                    [value] => Err(AnswerError::UnknownOption {
                        slot: self.id.clone(),
                        value: value.clone(),
                    }),
                    _ => Err(AnswerError::InvalidType {
                        slot: self.id.clone(),
                        expected: "a single ticked option",
                        actual: value.type_name(),
                    }),
                };
            }
            _ => false,
        };

        if fits {
            Ok(())
        } else {
            Err(AnswerError::InvalidType {
                slot: self.id.clone(),
                expected: self.kind.value_type(),
                actual: value.type_name(),
            })
        }
    }
}

/// The declared type of an answer slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotKind {
    /// Single-line free text.
    TextField(TextSlot),

    /// A number, percentage or currency amount.
    Number(NumberSlot),

    /// A date made of day/month/year components.
    Date(DateSlot),

    /// Choose exactly one option.
    Radio(ChoiceSlot),

    /// Tick any number of options.
    Checkbox(ChoiceSlot),

    /// A single checkbox (e.g. "I prefer not to say") that excludes every
    /// other slot of the same question.
    Exclusive(ExclusiveSlot),
}

impl SlotKind {
    /// Name of the `AnswerValue` variant this kind stores.
    pub fn value_type(&self) -> &'static str {
        match self {
            Self::TextField(_) => "Text",
            Self::Number(_) => "Number",
            Self::Date(_) => "Date",
            Self::Radio(_) => "Choice",
            Self::Checkbox(_) | Self::Exclusive(_) => "Choices",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive(_))
    }
}

/// Configuration for a free text slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// Configuration for a numeric slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Numeric>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Numeric>,

    /// Decimal places shown in summaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<NumberUnit>,
}

impl NumberSlot {
    /// Create with bounds.
    pub fn with_bounds(min: Option<Numeric>, max: Option<Numeric>) -> Self {
        Self {
            min,
            max,
            ..Self::default()
        }
    }

    /// A percentage between 0 and 100.
    pub fn percentage() -> Self {
        Self {
            min: Some(Numeric::ZERO),
            max: Some(Numeric::from(100)),
            decimal_places: None,
            unit: Some(NumberUnit::Percent),
        }
    }

    /// A currency amount shown with two decimal places.
    pub fn currency(symbol: impl Into<String>) -> Self {
        Self {
            decimal_places: Some(2),
            unit: Some(NumberUnit::Currency {
                symbol: symbol.into(),
            }),
            ..Self::default()
        }
    }
}

/// Unit a numeric slot is displayed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NumberUnit {
    Percent,
    Currency { symbol: String },
}

/// Configuration for a date slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateSlot {
    #[serde(default)]
    pub components: DateComponents,
}

/// Which components a date slot collects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateComponents {
    #[default]
    DayMonthYear,
    MonthYear,
    Year,
}

impl DateComponents {
    /// Whether a value has exactly the components this kind collects, in range.
    pub fn fits(&self, value: &DateValue) -> bool {
        let month_ok = value.month.is_some_and(|m| (1..=12).contains(&m));
        let day_ok = value.day.is_some_and(|d| (1..=31).contains(&d));
        let year_ok = value.year.is_some();
        match self {
            Self::DayMonthYear => day_ok && month_ok && year_ok,
            Self::MonthYear => value.day.is_none() && month_ok && year_ok,
            Self::Year => value.day.is_none() && value.month.is_none() && year_ok,
        }
    }
}

/// Configuration for radio and checkbox slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceSlot {
    pub options: Vec<ChoiceOption>,
}

impl ChoiceSlot {
    /// Create from plain option values (labels equal values).
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: options.into_iter().map(ChoiceOption::new).collect(),
        }
    }

    /// Find an option by value.
    pub fn option(&self, value: &str) -> Option<&ChoiceOption> {
        self.options.iter().find(|option| option.value == value)
    }

    fn check(&self, slot: &SlotId, values: &[String]) -> Result<(), AnswerError> {
        match values.iter().find(|value| self.option(value).is_none()) {
            Some(value) => Err(AnswerError::UnknownOption {
                slot: slot.clone(),
                value: value.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Configuration for an exclusive checkbox slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusiveSlot {
    pub option: ChoiceOption,
}

/// A selectable option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// The stored value.
    pub value: String,

    /// Display label; defaults to the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }

    pub fn with_label(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: Some(label.into()),
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_question() -> Question {
        Question::new("number-question", "Enter a number")
            .with_answer(AnswerSlot::number("number-answer", "Number"))
            .with_answer(AnswerSlot::exclusive(
                "number-exclusive-answer",
                "I prefer not to say",
            ))
    }

    #[test]
    fn exclusive_answer_is_found() {
        let question = number_question();
        assert_eq!(
            question.exclusive_answer().map(|slot| slot.id().as_str()),
            Some("number-exclusive-answer")
        );
        let others: Vec<_> = question
            .non_exclusive_answers()
            .map(|slot| slot.id().as_str())
            .collect();
        assert_eq!(others, vec!["number-answer"]);
    }

    #[test]
    fn number_slot_rejects_text_unless_lenient() {
        let mut slot = AnswerSlot::number("percentage-1", "Percentage");
        let ten = AnswerValue::from("ten");
        assert!(matches!(
            slot.check(&ten),
            Err(AnswerError::InvalidType {
                expected: "Number",
                actual: "Text",
                ..
            })
        ));

        slot.set_accepts_raw_text(true);
        assert!(slot.check(&ten).is_ok());
    }

    #[test]
    fn exclusive_slot_accepts_only_its_option() {
        let slot = AnswerSlot::exclusive("exclusive", "I prefer not to say");
        assert!(
            slot.check(&AnswerValue::Choices(vec!["I prefer not to say".into()]))
                .is_ok()
        );
        assert!(matches!(
            slot.check(&AnswerValue::Choices(vec!["Yes".into()])),
            Err(AnswerError::UnknownOption { .. })
        ));
        assert!(slot.check(&AnswerValue::Choices(Vec::new())).is_err());
    }

    #[test]
    fn month_year_date_components() {
        let slot = AnswerSlot::new(
            "month-year-date-answer",
            "Date",
            SlotKind::Date(DateSlot {
                components: DateComponents::MonthYear,
            }),
        );
        assert!(
            slot.check(&AnswerValue::Date(DateValue::month_year(3, 2018)))
                .is_ok()
        );
        assert!(
            slot.check(&AnswerValue::Date(DateValue::new(1, 3, 2018)))
                .is_err()
        );
        assert!(
            slot.check(&AnswerValue::Date(DateValue::month_year(13, 2018)))
                .is_err()
        );
    }

    #[test]
    fn radio_rejects_unknown_option() {
        let slot = AnswerSlot::new(
            "over-16-answer",
            "Over 16",
            SlotKind::Radio(ChoiceSlot::new(["Yes", "No"])),
        );
        assert!(slot.check(&AnswerValue::Choice("Yes".into())).is_ok());
        assert!(matches!(
            slot.check(&AnswerValue::Choice("Maybe".into())),
            Err(AnswerError::UnknownOption { .. })
        ));
    }

    #[test]
    fn slot_json_shape() {
        let slot: AnswerSlot = serde_json::from_str(
            r#"{"id": "currency-answer", "label": "Currency", "type": "number",
                "decimal_places": 2, "unit": {"kind": "currency", "symbol": "£"}}"#,
        )
        .unwrap();
        assert_eq!(
            slot.kind(),
            &SlotKind::Number(NumberSlot::currency("£"))
        );
    }
}
