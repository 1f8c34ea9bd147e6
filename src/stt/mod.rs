//! STT (Speech-to-Text) engine module.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                   SttEngine (trait)                    │
//! │                                                        │
//! │   AppPaths::model_file ──▶ WhisperEngine::load         │
//! │                              │   (MissingModelEngine   │
//! │                              │    when the file is     │
//! │                              ▼    absent)              │
//! │            pad_for_inference → transcribe_scored()     │
//! │                              │                         │
//! │                              ▼                         │
//! │                Transcript { text, confidence }         │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! One engine instance is shared by the wake detector (short bursts) and the
//! recognizer (full utterances); both run on the audio line's thread.

pub mod engine;
pub mod transcribe;

pub use engine::{MissingModelEngine, SttEngine, SttError, WhisperEngine};
pub use transcribe::{
    pad_for_inference, SamplingStrategy, Segment, TranscribeParams, Transcript,
    TranscriptionResult, MAX_AUDIO_SAMPLES, MIN_AUDIO_SAMPLES,
};

#[cfg(test)]
pub use engine::MockSttEngine;
