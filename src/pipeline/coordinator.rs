//! The coordinator: sole owner of [`PipelineState`].
//!
//! ```text
//!             ┌──────────── bus (PipelineMessage) ◀─────────────┐
//!             ▼                                                  │
//!      Coordinator::handle ──AudioCommand──▶ audio line (thread) ─┤
//!             │          ──ProcessRequest─▶ processor (task) ────┤
//!             └──────────── SpeechQueue ───▶ player (task) ──────┘
//! ```
//!
//! Every reply carries the sequence number of its utterance.  Playback
//! completion moves `Speaking → Idle` only when it covers the current
//! sequence, so a late `Drained` from an interrupted or older reply never
//! ends the current turn early.

use std::io;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioDeviceError;
use crate::config::PipelineConfig;
use crate::dispatch::DispatchResult;
use crate::intent::Classification;
use crate::pipeline::{
    AudioCommand, AudioLine, NoticeLimiter, PipelineMessage, PipelineState, ProcessRequest,
    Processor, StatusEvent, StatusSink,
};
use crate::recognition::{RecognitionError, Utterance};
use crate::tts::{PlaybackEvent, SpeechPlayer, SpeechQueue, SpeechTask, TtsEngine};

pub const GREETING: &str =
    "Hello! I'm Buddy, your voice assistant. Say my wake phrase whenever you need me.";

pub const TIMEOUT_NOTICE: &str = "I didn't hear anything. Say the wake phrase when you're ready.";
pub const UNINTELLIGIBLE_NOTICE: &str = "Sorry, I didn't catch that. Could you say it again?";
pub const RECOGNITION_DOWN_NOTICE: &str =
    "I'm having trouble with speech recognition right now.";
pub const RECOGNITION_RESET_NOTICE: &str = "Recognition reset complete. Please try speaking again.";
pub const DEVICE_LOST_NOTICE: &str = "I've lost access to the microphone, so I have to stop now.";

const LINE_FAILED_REPLY: &str = "Sorry, something went wrong on my end.";

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("audio device failed: {0}")]
    AudioDevice(#[from] AudioDeviceError),

    #[error("could not start the audio line: {0}")]
    Spawn(#[from] io::Error),
}

/// A line that did not stop cleanly.  Logged; never blocks exit.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("{line} line did not stop within {grace_ms} ms")]
    Timeout { line: &'static str, grace_ms: u64 },

    #[error("{0} line panicked")]
    Panicked(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The user asked to exit.
    Exit,
    /// Signal or [`PipelineHandle::shutdown`].
    Requested,
}

type Outcome = Result<ShutdownReason, PipelineError>;

// ---------------------------------------------------------------------------
// PipelineHandle
// ---------------------------------------------------------------------------

/// Cheap handle for feeding typed input and requesting shutdown from outside.
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    bus: mpsc::UnboundedSender<PipelineMessage>,
}

impl PipelineHandle {
    /// Returns `false` once the pipeline has stopped.
    pub fn submit_text(&self, text: impl Into<String>) -> bool {
        self.bus.send(PipelineMessage::TypedInput(text.into())).is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.bus.send(PipelineMessage::Shutdown).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

struct Lines {
    audio: thread::JoinHandle<()>,
    processor: JoinHandle<()>,
    player: JoinHandle<()>,
}

pub struct Coordinator {
    config: PipelineConfig,
    state: PipelineState,
    state_tx: watch::Sender<PipelineState>,
    sink: Arc<dyn StatusSink>,
    queue: Arc<SpeechQueue>,
    notices: NoticeLimiter,
    bus_tx: mpsc::UnboundedSender<PipelineMessage>,
    bus_rx: mpsc::UnboundedReceiver<PipelineMessage>,
    audio: Option<std_mpsc::Sender<AudioCommand>>,
    requests: Option<mpsc::UnboundedSender<ProcessRequest>>,
    /// Last sequence number handed out.
    next_seq: u64,
    /// Sequence of the utterance in flight (or last finished).
    current_seq: u64,
    exit_pending: bool,
    cancel: CancellationToken,
}

impl Coordinator {
    pub fn new(config: PipelineConfig, sink: Arc<dyn StatusSink>) -> Self {
        let (bus_tx, bus_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(PipelineState::Idle);
        Self {
            notices: NoticeLimiter::new(Duration::from_millis(config.notice_cooldown_ms)),
            config,
            state: PipelineState::Idle,
            state_tx,
            sink,
            queue: Arc::new(SpeechQueue::new()),
            bus_tx,
            bus_rx,
            audio: None,
            requests: None,
            next_seq: 0,
            current_seq: 0,
            exit_pending: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            bus: self.bus_tx.clone(),
        }
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Start the three lines and run until exit, shutdown request or a fatal
    /// device error.  All lines are stopped before this returns.
    pub async fn run(
        mut self,
        audio: AudioLine,
        processor: Processor,
        tts: Arc<dyn TtsEngine>,
    ) -> Outcome {
        let (audio_tx, audio_thread) = audio.spawn(self.bus_tx.clone(), self.cancel.clone())?;
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let lines = Lines {
            audio: audio_thread,
            processor: tokio::spawn(processor.run(
                request_rx,
                self.bus_tx.clone(),
                self.cancel.clone(),
            )),
            player: tokio::spawn(
                SpeechPlayer::new(self.queue.clone(), tts).run(self.bus_tx.clone(), self.cancel.clone()),
            ),
        };
        self.audio = Some(audio_tx);
        self.requests = Some(request_tx);
        log::info!("pipeline: running");

        if self.config.greeting {
            self.queue.enqueue(SpeechTask::system(GREETING, self.current_seq));
        }

        let outcome = loop {
            let Some(message) = self.bus_rx.recv().await else {
                break Ok(ShutdownReason::Requested);
            };
            if let Some(outcome) = self.handle_message(message).await {
                break outcome;
            }
        };

        self.shutdown(lines).await;
        match &outcome {
            Ok(reason) => log::info!("pipeline: stopped ({reason:?})"),
            Err(e) => log::error!("pipeline: stopped: {e}"),
        }
        outcome
    }

    /// React to one bus message; `Some` ends the run.
    async fn handle_message(&mut self, message: PipelineMessage) -> Option<Outcome> {
        match message {
            PipelineMessage::WakeDetected => self.on_wake(),
            PipelineMessage::UtteranceReady(utterance) => return self.on_utterance(utterance),
            PipelineMessage::TypedInput(text) => return self.on_typed(text),
            PipelineMessage::RecognitionFailed(RecognitionError::Device(e))
            | PipelineMessage::DeviceFailed(e) => return Some(self.on_device_failed(e).await),
            PipelineMessage::RecognitionFailed(error) => self.on_recognition_failed(error),
            PipelineMessage::Classified {
                seq,
                classification,
            } => self.on_classified(seq, classification),
            PipelineMessage::Dispatched { seq, result } => return self.on_dispatched(seq, result),
            PipelineMessage::Playback(PlaybackEvent::Drained { last_seq }) => {
                return self.on_drained(last_seq);
            }
            PipelineMessage::Shutdown => return Some(Ok(ShutdownReason::Requested)),
        }
        None
    }

    /// From `Idle`, a notice still playing is cut off before capture starts
    /// so the recorder never hears the assistant.
    fn on_wake(&mut self) {
        let barge_in = self.state == PipelineState::Speaking
            && self.config.barge_in
            && !self.exit_pending;
        let notice_playing = self.state == PipelineState::Idle && self.queue.is_busy();

        if self.state == PipelineState::Idle || barge_in {
            if barge_in {
                let dropped = self.queue.interrupt();
                log::info!("pipeline: barge-in, {dropped} queued replies dropped");
            } else if notice_playing {
                self.queue.interrupt();
                log::debug!("pipeline: notice cut short by wake");
            }
            self.sink.emit(StatusEvent::WakeDetected);
            self.transition(PipelineState::Capturing);
            self.sink.emit(StatusEvent::Listening);
            self.command_audio(AudioCommand::Capture);
        } else {
            log::debug!("pipeline: wake ignored while {}", self.state);
            self.command_audio(AudioCommand::Resume);
        }
    }

    fn on_utterance(&mut self, utterance: Utterance) -> Option<Outcome> {
        if self.state != PipelineState::Capturing {
            log::warn!("pipeline: utterance {:?} dropped while {}", utterance.text, self.state);
            return None;
        }
        self.sink.emit(StatusEvent::Transcribed(utterance.text.clone()));
        self.transition(PipelineState::Classifying);

        self.next_seq += 1;
        self.current_seq = self.next_seq;
        let request = ProcessRequest {
            seq: self.current_seq,
            text: utterance.text,
        };
        let sent = self
            .requests
            .as_ref()
            .is_some_and(|tx| tx.send(request).is_ok());
        if sent {
            return None;
        }
        log::error!("pipeline: processing line is gone");
        self.on_dispatched(self.current_seq, DispatchResult::failed(LINE_FAILED_REPLY))
    }

    fn on_typed(&mut self, text: String) -> Option<Outcome> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.state != PipelineState::Idle {
            log::info!("pipeline: typed input ignored while {}", self.state);
            let busy = format!("still {}", self.state.label().to_lowercase());
            self.sink.emit(StatusEvent::error("busy", busy));
            return None;
        }
        self.transition(PipelineState::Capturing);
        self.on_utterance(Utterance::typed(text))
    }

    fn on_recognition_failed(&mut self, error: RecognitionError) {
        if self.state != PipelineState::Capturing {
            log::debug!("pipeline: stale recognition error: {error}");
            return;
        }
        log::warn!("pipeline: {error}");
        self.sink.emit(StatusEvent::error(error.kind(), error.to_string()));
        self.transition(PipelineState::Idle);

        if error.triggered_reset() {
            self.speak_system(RECOGNITION_RESET_NOTICE);
            return;
        }
        let notice = match &error {
            RecognitionError::Timeout => TIMEOUT_NOTICE,
            RecognitionError::UnintelligibleAudio => UNINTELLIGIBLE_NOTICE,
            RecognitionError::ServiceUnavailable { consecutive: 1, .. } => RECOGNITION_DOWN_NOTICE,
            RecognitionError::ServiceUnavailable { .. }
            | RecognitionError::Device(_)
            | RecognitionError::Cancelled => return,
        };
        if self.notices.allow(error.kind(), Instant::now()) {
            self.speak_system(notice);
        } else {
            log::debug!("pipeline: {} notice suppressed", error.kind());
        }
    }

    fn on_classified(&mut self, seq: u64, classification: Classification) {
        if seq != self.current_seq || self.state != PipelineState::Classifying {
            log::warn!("pipeline: stale classification #{seq} dropped");
            return;
        }
        self.sink.emit(StatusEvent::Classified(classification.intent));
        self.transition(PipelineState::Executing);
        self.sink.emit(StatusEvent::Executing);
    }

    fn on_dispatched(&mut self, seq: u64, result: DispatchResult) -> Option<Outcome> {
        if seq != self.current_seq {
            log::warn!("pipeline: stale result #{seq} dropped");
            return None;
        }
        if self.state == PipelineState::Classifying {
            self.transition(PipelineState::Executing);
        }
        if self.state != PipelineState::Executing {
            log::warn!("pipeline: result #{seq} dropped while {}", self.state);
            return None;
        }
        self.sink.emit(StatusEvent::Result(result.clone()));
        self.exit_pending = result.terminal;
        self.transition(PipelineState::Speaking);

        match self.queue.enqueue(SpeechTask::reply(result.message, seq)) {
            Some(_) => None,
            // Nothing to say.
            None => self.on_drained(seq),
        }
    }

    fn on_drained(&mut self, last_seq: u64) -> Option<Outcome> {
        if self.state != PipelineState::Speaking || last_seq < self.current_seq {
            return None;
        }
        if self.exit_pending {
            return Some(Ok(ShutdownReason::Exit));
        }
        self.transition(PipelineState::Idle);
        None
    }

    /// Speak one final message, wait for it within the grace period, and
    /// report the device error.
    async fn on_device_failed(&mut self, error: AudioDeviceError) -> Outcome {
        log::error!("pipeline: {error}");
        self.sink.emit(StatusEvent::error("audio_device", error.to_string()));

        self.queue.interrupt();
        self.next_seq += 1;
        let seq = self.next_seq;
        self.queue.enqueue(SpeechTask::system(DEVICE_LOST_NOTICE, seq));

        let deadline = tokio::time::Instant::now() + self.grace();
        loop {
            match tokio::time::timeout_at(deadline, self.bus_rx.recv()).await {
                Ok(Some(PipelineMessage::Playback(PlaybackEvent::Drained { last_seq })))
                    if last_seq >= seq =>
                {
                    break
                }
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => {
                    log::warn!("pipeline: final message not confirmed before shutdown");
                    break;
                }
            }
        }
        Err(PipelineError::AudioDevice(error))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn transition(&mut self, to: PipelineState) -> bool {
        let from = self.state;
        if !from.can_transition_to(to) {
            log::warn!("pipeline: refused transition {from} → {to}");
            return false;
        }
        self.state = to;
        self.state_tx.send_replace(to);
        log::debug!("pipeline: {from} → {to}");
        self.sink.emit(StatusEvent::StateChanged { from, to });
        true
    }

    fn command_audio(&self, command: AudioCommand) {
        let sent = self.audio.as_ref().is_some_and(|tx| tx.send(command).is_ok());
        if !sent {
            log::warn!("pipeline: audio line not listening for {command:?}");
        }
    }

    fn speak_system(&self, text: &str) {
        self.queue.enqueue(SpeechTask::system(text, self.current_seq));
    }

    fn grace(&self) -> Duration {
        Duration::from_millis(self.config.shutdown_grace_ms)
    }

    /// Broadcast shutdown and give every line the grace period to stop.
    async fn shutdown(&mut self, lines: Lines) {
        self.transition(PipelineState::ShuttingDown);
        self.cancel.cancel();
        self.queue.interrupt();
        self.command_audio(AudioCommand::Shutdown);

        let grace_ms = self.config.shutdown_grace_ms;
        let deadline = tokio::time::Instant::now() + self.grace();
        let audio = tokio::task::spawn_blocking(move || lines.audio.join().is_ok());

        let outcomes = [
            ("audio", tokio::time::timeout_at(deadline, audio).await.map(|r| matches!(r, Ok(true)))),
            ("processor", tokio::time::timeout_at(deadline, lines.processor).await.map(|r| r.is_ok())),
            ("output", tokio::time::timeout_at(deadline, lines.player).await.map(|r| r.is_ok())),
        ];
        for (line, outcome) in outcomes {
            let error = match outcome {
                Ok(true) => continue,
                Ok(false) => ShutdownError::Panicked(line),
                Err(_) => ShutdownError::Timeout { line, grace_ms },
            };
            log::warn!("pipeline: {error}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
