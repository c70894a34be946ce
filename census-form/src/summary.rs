//! Rendering answers for the review page.

use std::fmt;

use serde::{Deserialize, Serialize};

use census_form_types::{
    AnswerLookup, AnswerSlot, AnswerValue, DateComponents, DateValue, Location, NumberUnit,
    QuestionId, Questionnaire, SlotKind,
};

use crate::routing::RoutingPath;

/// Placeholder for an unanswered question.
pub const NO_ANSWER_PROVIDED: &str = "No answer provided";

/// An answer as shown to the respondent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum DisplayValue {
    Provided(String),
    NoAnswer,
}

impl DisplayValue {
    /// The text to show, with `no_answer` standing in for a missing answer.
    pub fn text<'a>(&'a self, no_answer: &'a str) -> &'a str {
        match self {
            Self::Provided(text) => text,
            Self::NoAnswer => no_answer,
        }
    }

    pub fn is_provided(&self) -> bool {
        matches!(self, Self::Provided(_))
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text(NO_ANSWER_PROVIDED))
    }
}

/// Format a stored value for its slot.
pub fn format_value(slot: &AnswerSlot, value: &AnswerValue) -> String {
    match (slot.kind(), value) {
        (SlotKind::Number(number), AnswerValue::Number(n)) => {
            let n = number
                .decimal_places
                .and_then(|places| n.with_scale(places))
                .unwrap_or(*n);
            match &number.unit {
                Some(NumberUnit::Percent) => format!("{n}%"),
                Some(NumberUnit::Currency { symbol }) => format!("{symbol}{n}"),
                None => n.to_string(),
            }
        }
        (SlotKind::Date(date), AnswerValue::Date(value)) => format_date(date.components, value),
        (SlotKind::Radio(choice), AnswerValue::Choice(value)) => choice
            .option(value)
            .map_or_else(|| value.clone(), |option| option.label().to_string()),
        (SlotKind::Checkbox(choice), AnswerValue::Choices(values)) => values
            .iter()
            .map(|value| choice.option(value).map_or(value.as_str(), |option| option.label()))
            .collect::<Vec<_>>()
            .join(", "),
        (SlotKind::Exclusive(exclusive), AnswerValue::Choices(_)) => {
            exclusive.option.label().to_string()
        }
        (_, AnswerValue::Text(text)) => text.clone(),
        (_, AnswerValue::Number(n)) => n.to_string(),
        (_, AnswerValue::Choice(choice)) => choice.clone(),
        (_, AnswerValue::Choices(choices)) => choices.join(", "),
        (_, AnswerValue::Date(date)) => format_date(DateComponents::DayMonthYear, date),
    }
}

fn format_date(components: DateComponents, date: &DateValue) -> String {
    let month = date.month_name().unwrap_or_default();
    let year = date.year.map(|y| y.to_string()).unwrap_or_default();
    match components {
        DateComponents::DayMonthYear => match date.day {
            Some(day) => format!("{day} {month} {year}"),
            None => format!("{month} {year}"),
        },
        DateComponents::MonthYear => format!("{month} {year}"),
        DateComponents::Year => year,
    }
}

/// One question on the review page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub location: Location,
    pub question: QuestionId,
    /// The title of the question variant shown.
    pub title: String,
    pub value: DisplayValue,
}

/// Summarize every question on the routing path.
///
/// Answered slots of a question are listed one per line.
pub fn summarize(
    questionnaire: &Questionnaire,
    path: &RoutingPath,
    answers: &dyn AnswerLookup,
) -> Vec<SummaryRow> {
    path.iter()
        .filter_map(|location| Some((location, questionnaire.block(&location.block)?)))
        .flat_map(|(location, block)| {
            block.questions_for(answers).into_iter().map(move |question| {
                let lines: Vec<String> = question
                    .answers()
                    .iter()
                    .filter_map(|slot| Some(format_value(slot, answers.lookup(slot.id())?)))
                    .collect();
                let value = if lines.is_empty() {
                    DisplayValue::NoAnswer
                } else {
                    DisplayValue::Provided(lines.join("\n"))
                };
                SummaryRow {
                    location: location.clone(),
                    question: question.id().clone(),
                    title: question.title().to_string(),
                    value,
                }
            })
        })
        .collect()
}
