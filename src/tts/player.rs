//! The output line: drains the [`SpeechQueue`] one task at a time.
//!
//! ```text
//! SpeechQueue ──next()──▶ TtsEngine::speak ──▶ queue empty? ──▶ PlaybackEvent::Drained
//!                             ▲      ▲
//!          queue.interrupt() ─┘      └─ cancel (shutdown)
//! ```
//!
//! Engine errors are logged and the task dropped.  Interrupting or
//! cancelling drops the `speak` future, which kills the synthesizer child.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::tts::{SpeechQueue, TtsEngine};

/// Reported to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The queue ran empty after the task with sequence `last_seq` finished
    /// or was cut off.
    Drained { last_seq: u64 },
}

pub struct SpeechPlayer {
    queue: Arc<SpeechQueue>,
    engine: Arc<dyn TtsEngine>,
}

impl SpeechPlayer {
    pub fn new(queue: Arc<SpeechQueue>, engine: Arc<dyn TtsEngine>) -> Self {
        Self { queue, engine }
    }

    /// Play until `cancel` fires or `events` is closed.
    pub async fn run<M>(self, events: mpsc::UnboundedSender<M>, cancel: CancellationToken)
    where
        M: From<PlaybackEvent> + Send + 'static,
    {
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = self.queue.next() => next,
            };
            let task = next.task;
            log::debug!("tts: speaking #{} {:?}", task.seq, task.text);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.queue.interrupted(next.epoch) => {
                    log::debug!("tts: playback of #{} interrupted", task.seq);
                }
                result = self.engine.speak(&task.text) => {
                    if let Err(e) = result {
                        log::warn!("tts: dropped #{}: {e}", task.seq);
                    }
                }
            }
            self.queue.finished();

            if self.queue.is_empty() {
                let event = PlaybackEvent::Drained { last_seq: task.seq };
                if events.send(M::from(event)).is_err() {
                    break;
                }
            }
        }
        log::debug!("tts: player stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
