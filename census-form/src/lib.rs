//! # census-form
//!
//! Answer dependency and validation engine for multi-page questionnaires.
//! Presentation-agnostic.
//!
//! The engine sits between a rendering layer and a questionnaire schema. On
//! each page submission it
//!
//! 1. applies the edits, letting the exclusivity enforcer clear the
//!    conflicting side of any question with an exclusive answer,
//! 2. validates mandatory questions and calculated totals,
//! 3. routes to the next block, and
//! 4. commits the session to its store in one step.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use census_form::{AnswerEdits, Engine, EngineConfig, Location, Next, Questionnaire};
//!
//! let questionnaire = Questionnaire::from_json(SCHEMA)?;
//! let engine = Engine::new(questionnaire, EngineConfig::default());
//! let session = engine.start_session()?;
//!
//! let submission = engine.submit_block(
//!     session,
//!     &"block".into(),
//!     AnswerEdits::new()
//!         .with_answer("percentage-1", 10)
//!         .with_answer("percentage-2", 20)
//!         .with_answer("percentage-3", 30)
//!         .with_answer("percentage-4", 40),
//! )?;
//!
//! assert!(submission.is_accepted());
//! assert_eq!(
//!     submission.next,
//!     Some(Next::Block(Location::new("default-section", "confirmation")))
//! );
//! ```
//!
//! ## Schema rules
//!
//! Every slot, block and section a rule mentions is checked when the
//! questionnaire loads; a broken reference is a `SchemaError` and the
//! questionnaire is never served.
//!
//! ## Stores
//!
//! Stores implement `SessionStore`:
//! - `MemoryStore` - JSON snapshots in a concurrent map
//! - any `Arc<impl SessionStore>` - to share one store between engines

// Re-export all types from census-form-types
pub use census_form_types::*;

mod calculated;
pub use calculated::{CalculatedTotal, CalculatedTotals, CalculatedValidator, CalculationOutcome};

mod config;
pub use config::{ConfigError, EngineConfig};

mod engine;
pub use engine::{AnswerEdits, Engine, Submission, ValidationError};

mod error;
pub use error::EngineError;

mod exclusivity;
pub use exclusivity::{
    Applied, Drafts, Edit, EditPhase, Effect, ExclusivityEnforcer, GroupEvent, GroupState,
    transition,
};

mod progress;
pub use progress::{CompletionStatus, ProgressStore};

mod routing;
pub use routing::{Next, ReachableAnswers, RoutingEngine, RoutingPath};

mod session;
pub use session::{SNAPSHOT_VERSION, Session, SessionId, SessionSnapshot};

mod store;
pub use store::{MemoryStore, SessionStore};

mod summary;
pub use summary::{DisplayValue, NO_ANSWER_PROVIDED, SummaryRow, format_value, summarize};

// Scripted respondent for driving questionnaires without user interaction
mod scripted;
pub use scripted::{Page, ScriptError, ScriptRun, ScriptedRespondent};
