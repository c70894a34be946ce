//! Sample questionnaires for tests and the replay tool.
//!
//! The JSON schemas live under `schemas/` and are embedded at compile time;
//! `budget` is built in code with the schema builders.

use census_form_types::{Questionnaire, SchemaError};

pub mod budget;

/// Four percentages that must total exactly 100.
pub const TOTAL_BREAKDOWN: &str = include_str!("../schemas/total_breakdown.json");

/// Number, text, currency and month/year questions, each with an
/// "I prefer not to say" checkbox.
pub const MUTUALLY_EXCLUSIVE: &str = include_str!("../schemas/mutually_exclusive.json");

/// Individual questions routed by age and education.
pub const CENSUS_HOUSEHOLD: &str = include_str!("../schemas/census_household.json");

pub fn total_breakdown() -> Result<Questionnaire, SchemaError> {
    Questionnaire::from_json(TOTAL_BREAKDOWN)
}

pub fn mutually_exclusive() -> Result<Questionnaire, SchemaError> {
    Questionnaire::from_json(MUTUALLY_EXCLUSIVE)
}

pub fn census_household() -> Result<Questionnaire, SchemaError> {
    Questionnaire::from_json(CENSUS_HOUSEHOLD)
}

/// Look up a bundled questionnaire by its schema id.
pub fn by_id(id: &str) -> Option<Result<Questionnaire, SchemaError>> {
    match id {
        "test_total_breakdown" => Some(total_breakdown()),
        "test_mutually_exclusive" => Some(mutually_exclusive()),
        "census_household" => Some(census_household()),
        "household_budget" => Some(budget::load()),
        _ => None,
    }
}
