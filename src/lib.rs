//! Buddy: a voice-driven command assistant.
//!
//! Listens for a wake phrase, transcribes the following utterance locally,
//! classifies it into an [`Intent`](intent::Intent) through an LLM with a
//! rule-based fallback, runs it against the desktop and speaks the result.
//!
//! ```text
//! audio ─▶ wake ─▶ recognition ─▶ intent ─▶ dispatch ─▶ tts
//!                         ╲                   │
//!                          stt        llm ◀───┘ inject
//!                          (all orchestrated by pipeline::Coordinator)
//! ```

pub mod audio;
pub mod config;
pub mod dispatch;
pub mod inject;
pub mod intent;
pub mod llm;
pub mod pipeline;
pub mod recognition;
pub mod stt;
pub mod tts;
pub mod wake;
