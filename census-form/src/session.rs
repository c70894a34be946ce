//! Respondent sessions and their persisted snapshots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use census_form_types::AnswerStore;

use crate::calculated::CalculatedTotals;
use crate::exclusivity::Drafts;
use crate::progress::ProgressStore;

/// Identifier of a respondent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Everything the engine knows about one respondent.
///
/// Drafts are uncommitted keystrokes; they live only in memory and are not
/// part of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub(crate) answers: AnswerStore,

    #[serde(skip)]
    pub(crate) drafts: Drafts,

    #[serde(default)]
    pub(crate) totals: CalculatedTotals,

    #[serde(default)]
    pub(crate) progress: ProgressStore,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    pub fn drafts(&self) -> &Drafts {
        &self.drafts
    }

    pub fn totals(&self) -> &CalculatedTotals {
        &self.totals
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }
}

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The durable form of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,

    /// Id of the questionnaire the answers belong to.
    pub questionnaire: String,

    #[serde(flatten)]
    pub session: Session,
}

impl SessionSnapshot {
    pub fn new(questionnaire: impl Into<String>, session: Session) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            questionnaire: questionnaire.into(),
            session,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
