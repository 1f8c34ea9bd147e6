//! Pipeline orchestration for the Buddy assistant.
//!
//! Three lines run concurrently and talk only through the coordinator's
//! message bus:
//!
//! # Architecture
//!
//! ```text
//! audio line (OS thread)         processor (tokio task)        player (tokio task)
//!  FrameSource → WakeDetector     IntentClassifier              SpeechQueue
//!             → SpeechRecognizer  → Dispatcher                  → TtsEngine
//!        │                             │                             │
//!        └──────────────┐              │              ┌──────────────┘
//!                       ▼              ▼              ▼
//!                    Coordinator (owns PipelineState, StatusSink)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use buddy_assistant::config::AppConfig;
//! use buddy_assistant::pipeline::{AudioLine, Coordinator, LogSink, Processor};
//! # use buddy_assistant::tts::TtsEngine;
//! # fn parts() -> (AudioLine, Processor, Arc<dyn TtsEngine>) { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let (audio, processor, tts) = parts();
//!
//!     let coordinator = Coordinator::new(config.pipeline.clone(), Arc::new(LogSink));
//!     let handle = coordinator.handle();
//!     handle.submit_text("what can you do");
//!
//!     let reason = coordinator.run(audio, processor, tts).await;
//!     println!("{reason:?}");
//! }
//! ```

pub mod audio_line;
pub mod coordinator;
pub mod events;
pub mod message;
pub mod notice;
pub mod processor;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use audio_line::{AudioLine, SourceFactory};
pub use coordinator::{
    Coordinator, PipelineError, PipelineHandle, ShutdownError, ShutdownReason, GREETING,
};
pub use events::{ChannelSink, LogSink, StatusEvent, StatusSink};
pub use message::{AudioCommand, PipelineMessage, ProcessRequest};
pub use notice::NoticeLimiter;
pub use processor::{Processor, UNCLASSIFIED_REPLY};
pub use state::PipelineState;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::{PipelineMessage, StatusEvent, StatusSink};
    use crate::audio::AudioFrame;
    use crate::wake::WakeDetector;

    /// Wakes on every loud frame.  One speech frame in a scripted feed is
    /// one wake.
    pub(crate) struct LoudWake {
        inline: Option<String>,
    }

    impl LoudWake {
        pub(crate) fn new() -> Self {
            Self { inline: None }
        }

        /// Reports `command` as spoken together with the first wake.
        pub(crate) fn with_inline(command: &str) -> Self {
            Self {
                inline: Some(command.to_string()),
            }
        }
    }

    impl WakeDetector for LoudWake {
        fn detect(&mut self, frame: &AudioFrame) -> bool {
            frame.rms() > 0.1
        }

        fn take_inline_command(&mut self) -> Option<String> {
            self.inline.take()
        }

        fn reset(&mut self) {}
    }

    pub(crate) struct RecordingSink {
        events: Mutex<Vec<StatusEvent>>,
    }

    impl RecordingSink {
        pub(crate) fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn events(&self) -> Vec<StatusEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl StatusSink for RecordingSink {
        fn emit(&self, event: StatusEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    pub(crate) async fn recv_message(
        rx: &mut mpsc::UnboundedReceiver<PipelineMessage>,
    ) -> PipelineMessage {
        tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("no message on the bus")
            .expect("bus closed")
    }
}
