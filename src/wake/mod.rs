//! Wake-phrase gating for the always-on listening loop.
//!
//! The audio line calls [`WakeDetector::detect`] on every frame while the
//! pipeline is idle.  [`PhraseWakeDetector`] segments speech bursts by
//! energy, transcribes each completed burst locally and compares the text
//! with the configured [`WakePhrase`]; a [`Cooldown`] on the stream clock
//! keeps one utterance from producing two wake events.

pub mod debounce;
pub mod detector;
pub mod phrase;
pub mod segment;

pub use debounce::Cooldown;
pub use detector::{PhraseWakeDetector, WakeDetector};
pub use phrase::{normalize_words, WakePhrase};
pub use segment::BurstSegmenter;
