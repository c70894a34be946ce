use serde::{Deserialize, Serialize};

use crate::Numeric;

/// A single answer value held by an answer slot.
///
/// This is the value stored in the `AnswerStore` for each answered slot.
/// "No answer" is never a variant: an unanswered slot has no entry at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    /// Free text, or raw text typed into a lenient numeric slot.
    Text(String),

    /// An exact decimal number.
    Number(Numeric),

    /// A (possibly partial) date, e.g. month and year only.
    Date(DateValue),

    /// The value of the chosen radio option.
    Choice(String),

    /// The values of the ticked checkbox options.
    Choices(Vec<String>),
}

impl AnswerValue {
    /// Try to get this value as a string reference.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a number.
    pub fn as_number(&self) -> Option<Numeric> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get this value as a date.
    pub fn as_date(&self) -> Option<DateValue> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get this value as a chosen option.
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            Self::Choice(c) => Some(c),
            _ => None,
        }
    }

    /// Try to get this value as ticked options.
    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            Self::Choices(c) => Some(c),
            _ => None,
        }
    }

    /// Get the type name of this value for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "Text",
            Self::Number(_) => "Number",
            Self::Date(_) => "Date",
            Self::Choice(_) => "Choice",
            Self::Choices(_) => "Choices",
        }
    }
}

impl From<String> for AnswerValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Numeric> for AnswerValue {
    fn from(n: Numeric) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for AnswerValue {
    fn from(i: i64) -> Self {
        Self::Number(Numeric::from(i))
    }
}

impl From<i32> for AnswerValue {
    fn from(i: i32) -> Self {
        Self::Number(Numeric::from(i))
    }
}

impl From<DateValue> for AnswerValue {
    fn from(d: DateValue) -> Self {
        Self::Date(d)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(choices: Vec<String>) -> Self {
        Self::Choices(choices)
    }
}

/// Date components entered into a date field.
///
/// Which components must be present depends on the slot's `DateComponents`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

impl DateValue {
    /// A full day/month/year date.
    pub fn new(day: u8, month: u8, year: i32) -> Self {
        Self {
            day: Some(day),
            month: Some(month),
            year: Some(year),
        }
    }

    /// A month and year, e.g. March 2018.
    pub fn month_year(month: u8, year: i32) -> Self {
        Self {
            day: None,
            month: Some(month),
            year: Some(year),
        }
    }

    /// A year on its own.
    pub fn year(year: i32) -> Self {
        Self {
            day: None,
            month: None,
            year: Some(year),
        }
    }

    /// English name of the month component, if present and in range.
    pub fn month_name(&self) -> Option<&'static str> {
        let month = usize::from(self.month?);
        MONTH_NAMES.get(month.checked_sub(1)?).copied()
    }
}
