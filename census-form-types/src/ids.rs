use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declares a string-backed schema identifier.
///
/// Identifiers come straight from the questionnaire schema (e.g. `"number-answer"`)
/// and are compared verbatim. Each kind gets its own type so a block id can never
/// be passed where a slot id is expected.
macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from its schema string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&String> for $name {
            fn from(s: &String) -> Self {
                Self::new(s.clone())
            }
        }
    };
}

identifier!(
    /// Identifies a single answer slot, e.g. `"percentage-1"`.
    ///
    /// Used as the key of the `AnswerStore`.
    SlotId
);

identifier!(
    /// Identifies a question, which groups one or more answer slots.
    QuestionId
);

identifier!(
    /// Identifies a block: the unit of navigation, submitted as a whole.
    BlockId
);

identifier!(
    /// Identifies a section: an ordered run of blocks.
    SectionId
);

identifier!(
    /// Identifies a calculated rule, e.g. `"total-percentage"`.
    RuleId
);
