//! Intent classification.
//!
//! * [`Intent`]: the closed set of actions plus free conversation.
//! * [`IntentClassifier`]: LLM → strict LLM → rules → converse chain.
//! * [`RuleMatcher`]: keyword rules used while the LLM is unreachable.
//! * [`parse_intent`]: model answer → [`Intent`].

pub mod classifier;
pub mod parse;
pub mod rules;
pub mod types;

pub use classifier::{Classification, IntentClassifier, Strategy};
pub use parse::parse_intent;
pub use rules::RuleMatcher;
pub use types::{ClassificationError, Intent, ScrollDirection, DEFAULT_SCROLL_AMOUNT};
