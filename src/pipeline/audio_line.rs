//! The audio line: a dedicated OS thread owning the microphone.
//!
//! ```text
//!  FrameSource ──frame──▶ WakeDetector ──wake──▶ bus: WakeDetected
//!                                                    │
//!                     ┌────── AudioCommand ◀─────────┘  (blocks until answered)
//!                     ├─ Capture ──▶ SpeechRecognizer ──▶ bus: UtteranceReady / RecognitionFailed
//!                     ├─ Resume  ──▶ back to listening
//!                     └─ Shutdown
//! ```
//!
//! The frame source is built on the thread itself because the cpal stream
//! inside a [`MicrophoneSource`](crate::audio::MicrophoneSource) is not
//! `Send`.  Transcription is local; this line never touches the network.
//! Device errors end the thread after a [`PipelineMessage::DeviceFailed`].
//! Cancellation is seen between frames, including mid-capture, where the
//! utterance is abandoned without a message.

use std::io;
use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::audio::{AudioDeviceError, FrameSource};
use crate::pipeline::{AudioCommand, PipelineMessage};
use crate::recognition::{RecognitionError, SpeechRecognizer, Utterance};
use crate::wake::WakeDetector;

/// Builds the line's frame source on the audio thread.
pub type SourceFactory =
    Box<dyn FnOnce() -> Result<Box<dyn FrameSource>, AudioDeviceError> + Send>;

/// How often a line blocked on a command checks for cancellation.
const COMMAND_POLL: Duration = Duration::from_millis(50);

pub struct AudioLine {
    factory: SourceFactory,
    wake: Box<dyn WakeDetector>,
    recognizer: SpeechRecognizer,
}

impl AudioLine {
    pub fn new(
        factory: SourceFactory,
        wake: Box<dyn WakeDetector>,
        recognizer: SpeechRecognizer,
    ) -> Self {
        Self {
            factory,
            wake,
            recognizer,
        }
    }

    /// Start the `buddy-audio` thread.
    pub fn spawn(
        self,
        bus: mpsc::UnboundedSender<PipelineMessage>,
        cancel: CancellationToken,
    ) -> io::Result<(std_mpsc::Sender<AudioCommand>, thread::JoinHandle<()>)> {
        let (tx, rx) = std_mpsc::channel();
        let handle = thread::Builder::new()
            .name("buddy-audio".into())
            .spawn(move || self.run(rx, bus, cancel))?;
        Ok((tx, handle))
    }

    fn run(
        mut self,
        commands: std_mpsc::Receiver<AudioCommand>,
        bus: mpsc::UnboundedSender<PipelineMessage>,
        cancel: CancellationToken,
    ) {
        let factory = std::mem::replace(
            &mut self.factory,
            Box::new(|| unreachable!("audio source factory already used")),
        );
        let mut source = match factory() {
            Ok(source) => source,
            Err(e) => {
                log::error!("audio: cannot open input: {e}");
                let _ = bus.send(PipelineMessage::DeviceFailed(e));
                return;
            }
        };
        log::info!("audio: listening for the wake phrase");

        while !cancel.is_cancelled() {
            if let Ok(AudioCommand::Shutdown) = commands.try_recv() {
                break;
            }

            let frame = match source.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("audio: {e}");
                    let _ = bus.send(PipelineMessage::DeviceFailed(e));
                    break;
                }
            };
            if !self.wake.detect(&frame) {
                continue;
            }

            if bus.send(PipelineMessage::WakeDetected).is_err() {
                break;
            }
            match wait_for_command(&commands, &cancel) {
                Some(AudioCommand::Capture) => {
                    let Some(message) = self.capture(source.as_mut(), &cancel) else {
                        break;
                    };
                    self.wake.reset();
                    let fatal = matches!(message, PipelineMessage::DeviceFailed(_));
                    if bus.send(message).is_err() || fatal {
                        break;
                    }
                }
                Some(AudioCommand::Resume) => {
                    self.wake.reset();
                    source.flush();
                }
                Some(AudioCommand::Shutdown) | None => break,
            }
        }
        log::debug!("audio: line stopped");
    }

    /// `None` when the capture was abandoned for shutdown.
    fn capture(
        &mut self,
        source: &mut dyn FrameSource,
        cancel: &CancellationToken,
    ) -> Option<PipelineMessage> {
        if let Some(text) = self.wake.take_inline_command() {
            log::info!("audio: command spoken with the wake phrase: {text:?}");
            return Some(PipelineMessage::UtteranceReady(Utterance::new(text, None)));
        }
        let message = match self.recognizer.capture_and_transcribe(source, cancel) {
            Ok(utterance) => PipelineMessage::UtteranceReady(utterance),
            Err(RecognitionError::Cancelled) => {
                log::debug!("audio: capture abandoned for shutdown");
                return None;
            }
            Err(RecognitionError::Device(e)) => PipelineMessage::DeviceFailed(e),
            Err(e) => PipelineMessage::RecognitionFailed(e),
        };
        Some(message)
    }
}

/// Block until the coordinator answers; `None` on cancel or disconnect.
fn wait_for_command(
    commands: &std_mpsc::Receiver<AudioCommand>,
    cancel: &CancellationToken,
) -> Option<AudioCommand> {
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        match commands.recv_timeout(COMMAND_POLL) {
            Ok(command) => return Some(command),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
