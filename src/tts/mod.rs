//! Spoken output.
//!
//! * [`SpeechQueue`]: `(seq, priority, arrival)`-ordered task queue.
//! * [`SpeechPlayer`]: the output line task draining it.
//! * [`TtsEngine`]: synthesis seam; [`SystemTts`] and [`SilentTts`].

pub mod engine;
pub mod player;
pub mod queue;

pub use engine::{engine_from_config, SilentTts, SystemTts, TtsEngine, TtsError};
pub use player::{PlaybackEvent, SpeechPlayer};
pub use queue::{Dequeued, Priority, SpeechQueue, SpeechTask};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{TtsEngine, TtsError};

    /// Records every finished utterance.  Optionally takes `duration` per
    /// utterance or fails on one text.
    pub(crate) struct RecordingTts {
        spoken: Mutex<Vec<String>>,
        duration: Duration,
        fail_on: Option<String>,
    }

    impl RecordingTts {
        pub(crate) fn new() -> Self {
            Self {
                spoken: Mutex::new(Vec::new()),
                duration: Duration::ZERO,
                fail_on: None,
            }
        }

        pub(crate) fn with_duration(duration: Duration) -> Self {
            Self {
                duration,
                ..Self::new()
            }
        }

        pub(crate) fn failing_on(text: &str) -> Self {
            Self {
                fail_on: Some(text.to_string()),
                ..Self::new()
            }
        }

        pub(crate) fn spoken(&self) -> Vec<String> {
            self.spoken.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TtsEngine for RecordingTts {
        async fn speak(&self, text: &str) -> Result<(), TtsError> {
            if self.fail_on.as_deref() == Some(text) {
                return Err(TtsError::Failed("exit status: 1".into()));
            }
            if !self.duration.is_zero() {
                tokio::time::sleep(self.duration).await;
            }
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }
}
