//! Speech capture and recognition.
//!
//! After a wake event the audio line hands its frame source to
//! [`SpeechRecognizer::capture_and_transcribe`], which records until the
//! speaker stops and returns an [`Utterance`] or a [`RecognitionError`].

pub mod recognizer;
pub mod recorder;
pub mod utterance;

pub use recognizer::{clean_transcript, RecognitionError, SpeechRecognizer, RESET_AFTER_FAILURES};
pub use recorder::{Recording, UtteranceRecorder};
pub use utterance::Utterance;
