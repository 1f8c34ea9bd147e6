//! Status events for the UI / log sink.
//!
//! Fire and forget: a sink must never block the coordinator and its
//! failures are not reported back.

use tokio::sync::mpsc;

use crate::dispatch::DispatchResult;
use crate::intent::Intent;
use crate::pipeline::PipelineState;

#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    WakeDetected,
    Listening,
    Transcribed(String),
    Classified(Intent),
    Executing,
    Result(DispatchResult),
    Error { kind: String, message: String },
    StateChanged { from: PipelineState, to: PipelineState },
}

impl StatusEvent {
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

pub trait StatusSink: Send + Sync {
    fn emit(&self, event: StatusEvent);
}

// ---------------------------------------------------------------------------
// LogSink
// ---------------------------------------------------------------------------

/// Writes events to the `log` facade; the console "chat window".
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn emit(&self, event: StatusEvent) {
        match event {
            StatusEvent::WakeDetected => log::info!("status: wake phrase heard"),
            StatusEvent::Listening => log::info!("status: listening..."),
            StatusEvent::Transcribed(text) => log::info!("status: you said {text:?}"),
            StatusEvent::Classified(intent) => log::info!("status: intent {intent}"),
            StatusEvent::Executing => log::debug!("status: executing"),
            StatusEvent::Result(result) => {
                let data = result.data.map(|d| d.to_string()).unwrap_or_default();
                if result.success {
                    log::info!("status: buddy: {} {data}", result.message);
                } else {
                    log::warn!("status: buddy (failed): {} {data}", result.message);
                }
            }
            StatusEvent::Error { kind, message } => log::warn!("status: error [{kind}] {message}"),
            StatusEvent::StateChanged { from, to } => log::debug!("status: {from} → {to}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelSink
// ---------------------------------------------------------------------------

/// Forwards events to an external consumer (e.g. a chat window).
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusSink for ChannelSink {
    fn emit(&self, event: StatusEvent) {
        // A closed window is not the pipeline's problem.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_forwards_and_tolerates_closed_receiver() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(StatusEvent::Listening);
        assert_eq!(rx.try_recv().unwrap(), StatusEvent::Listening);

        drop(rx);
        sink.emit(StatusEvent::error("audio_device", "gone"));
    }

    #[test]
    fn log_sink_accepts_every_event() {
        let sink = LogSink;
        sink.emit(StatusEvent::Transcribed("hello".into()));
        sink.emit(StatusEvent::Result(DispatchResult::failed("nope")));
        sink.emit(StatusEvent::StateChanged {
            from: PipelineState::Idle,
            to: PipelineState::Capturing,
        });
    }
}
