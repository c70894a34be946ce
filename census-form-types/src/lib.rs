//! Core types for the census-form crate.
//!
//! This crate provides the presentation-agnostic building blocks of a
//! questionnaire:
//! - `QuestionnaireDefinition` and `Questionnaire` - The schema, raw and validated
//! - `Section`, `Block`, `Question` and `AnswerSlot` - Its structure
//! - `Predicate`, `RoutingRule` and `CalculatedRule` - Rules as data
//! - `AnswerStore` and `AnswerValue` - One respondent's answers
//! - `Numeric` - Exact decimal numbers for totals

mod ids;
pub use ids::{BlockId, QuestionId, RuleId, SectionId, SlotId};

mod numeric;
pub use numeric::{Numeric, ParseNumericError};

mod answer_value;
pub use answer_value::{AnswerValue, DateValue};

mod answer_store;
pub use answer_store::{AnswerLookup, AnswerStore};

mod question;
pub use question::{
    AnswerSlot, ChoiceOption, ChoiceSlot, DateComponents, DateSlot, ExclusiveSlot, NumberSlot,
    NumberUnit, Question, SlotKind, TextSlot,
};

mod rule;
pub use rule::{CalculatedRule, Comparison, Destination, Literal, Predicate, RoutingRule};

mod block;
pub use block::{Block, Location, QuestionVariant, Section};

mod questionnaire;
pub use questionnaire::{Questionnaire, QuestionnaireDefinition};

mod error;
pub use error::{AnswerError, SchemaError};
