//! Traffic between the pipeline lines.
//!
//! ```text
//!   audio line ──┐                        ┌──▶ AudioCommand    (std mpsc)
//! processor ─────┼──▶ PipelineMessage ──▶ Coordinator ──▶ ProcessRequest (tokio mpsc)
//!   player ──────┘     (tokio mpsc)       └──▶ SpeechQueue
//! ```

use crate::audio::AudioDeviceError;
use crate::dispatch::DispatchResult;
use crate::intent::Classification;
use crate::recognition::{RecognitionError, Utterance};
use crate::tts::PlaybackEvent;

/// Everything the coordinator reacts to.
#[derive(Debug)]
pub enum PipelineMessage {
    /// The audio line heard the wake phrase and waits for an
    /// [`AudioCommand`].
    WakeDetected,
    UtteranceReady(Utterance),
    /// A command typed at the console instead of spoken.
    TypedInput(String),
    RecognitionFailed(RecognitionError),
    Classified {
        seq: u64,
        classification: Classification,
    },
    Dispatched {
        seq: u64,
        result: DispatchResult,
    },
    Playback(PlaybackEvent),
    DeviceFailed(AudioDeviceError),
    Shutdown,
}

impl From<PlaybackEvent> for PipelineMessage {
    fn from(event: PlaybackEvent) -> Self {
        Self::Playback(event)
    }
}

/// The coordinator's answer to [`PipelineMessage::WakeDetected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCommand {
    /// Record and transcribe one utterance.
    Capture,
    /// Ignore this wake and go back to listening.
    Resume,
    Shutdown,
}

/// One utterance for the processing line.  `seq` orders the spoken replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    pub seq: u64,
    pub text: String,
}
