//! Wake-phrase detector.
//!
//! [`PhraseWakeDetector`] is a two-stage hybrid:
//!
//! ```text
//! AudioFrame ─▶ EnergyVad ─▶ BurstSegmenter ─▶ (burst) ─▶ SttEngine ─▶ WakePhrase
//!                                                                        │
//!                                                        Cooldown ◀──────┘
//! ```
//!
//! Silence costs one RMS computation per frame; only completed speech
//! bursts reach Whisper.  The caller keeps per-frame latency bounded through
//! the frame source's lag buffer, which sheds the oldest frames while a
//! burst is being transcribed.

use std::sync::Arc;

use crate::audio::{AudioFrame, EnergyVad};
use crate::config::WakeConfig;
use crate::stt::{pad_for_inference, SttEngine};
use crate::wake::{BurstSegmenter, Cooldown, WakePhrase};

// ---------------------------------------------------------------------------
// WakeDetector trait
// ---------------------------------------------------------------------------

/// Frame-by-frame wake detection.
pub trait WakeDetector: Send {
    /// Consume one frame; `true` exactly once per accepted wake utterance.
    fn detect(&mut self, frame: &AudioFrame) -> bool;

    /// Command words spoken after the wake phrase in the same burst, taken
    /// at most once per wake.
    fn take_inline_command(&mut self) -> Option<String> {
        None
    }

    /// Drop any partial burst (e.g. after a capture consumed the stream).
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// PhraseWakeDetector
// ---------------------------------------------------------------------------

pub struct PhraseWakeDetector {
    phrase: WakePhrase,
    vad: EnergyVad,
    segmenter: BurstSegmenter,
    cooldown: Cooldown,
    stt: Arc<dyn SttEngine>,
    /// Milliseconds of audio consumed so far.
    clock_ms: u64,
    inline_command: Option<String>,
    stt_failing: bool,
}

impl PhraseWakeDetector {
    pub fn new(config: &WakeConfig, frame_samples: usize, stt: Arc<dyn SttEngine>) -> Self {
        let phrase = WakePhrase::new(&config.phrase);
        if phrase.is_empty() {
            log::warn!("wake: empty wake phrase configured, voice activation disabled");
        }
        Self {
            phrase,
            vad: EnergyVad::new(config.energy_threshold, frame_samples),
            segmenter: BurstSegmenter::from_config(config),
            cooldown: Cooldown::new(config.cooldown_ms),
            stt,
            clock_ms: 0,
            inline_command: None,
            stt_failing: false,
        }
    }

    fn check_burst(&mut self, burst: &[f32]) -> bool {
        let transcript = match self.stt.transcribe(&pad_for_inference(burst)) {
            Ok(text) => {
                self.stt_failing = false;
                text
            }
            Err(e) => {
                if !self.stt_failing {
                    log::warn!("wake: burst transcription failed: {e}");
                    self.stt_failing = true;
                }
                return false;
            }
        };

        log::debug!("wake: burst heard as {transcript:?}");
        if !self.phrase.matches(&transcript) {
            return false;
        }

        if !self.cooldown.try_fire(self.clock_ms) {
            log::debug!("wake: trigger suppressed by cooldown");
            return false;
        }

        self.inline_command = self.phrase.remainder(&transcript);
        log::info!("wake: phrase detected");
        true
    }
}

impl WakeDetector for PhraseWakeDetector {
    fn detect(&mut self, frame: &AudioFrame) -> bool {
        self.clock_ms += frame.duration_ms();
        let is_speech = self.vad.is_speech(&frame.samples);
        match self.segmenter.push(frame, is_speech) {
            Some(burst) => self.check_burst(&burst),
            None => false,
        }
    }

    fn take_inline_command(&mut self) -> Option<String> {
        self.inline_command.take()
    }

    fn reset(&mut self) {
        self.segmenter.reset();
        self.inline_command = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FrameSource;
    use crate::audio::source::testing::scripted_source;
    use crate::stt::{MockSttEngine, SttError, Transcript};

    fn detector(stt: MockSttEngine) -> (PhraseWakeDetector, Arc<MockSttEngine>) {
        let stt = Arc::new(stt);
        let det = PhraseWakeDetector::new(&WakeConfig::default(), 480, stt.clone());
        (det, stt)
    }

    fn run(det: &mut PhraseWakeDetector, source: &mut dyn FrameSource, frames: usize) -> usize {
        (0..frames)
            .filter(|_| det.detect(&source.next_frame().unwrap()))
            .count()
    }

    #[test]
    fn one_wake_per_utterance() {
        let (mut det, stt) = detector(MockSttEngine::texts(&["Hey, Buddy!"]));
        let (mut source, feeder) = scripted_source();
        feeder.silence(10).speech(20).silence(40);

        assert_eq!(run(&mut det, &mut source, 70), 1);
        assert_eq!(stt.calls(), 1, "only the burst is transcribed");
        assert_eq!(det.take_inline_command(), None);
    }

    #[test]
    fn other_speech_does_not_wake() {
        let (mut det, _) = detector(MockSttEngine::texts(&["what a nice day"]));
        let (mut source, feeder) = scripted_source();
        feeder.speech(20).silence(20);
        assert_eq!(run(&mut det, &mut source, 40), 0);
    }

    #[test]
    fn repeat_inside_cooldown_is_suppressed() {
        let (mut det, _) = detector(MockSttEngine::texts(&["hey buddy", "hey buddy", "hey buddy"]));
        let (mut source, feeder) = scripted_source();
        // Two bursts ~1 s apart (inside 2 s cooldown), a third ~3 s later.
        feeder.speech(12).silence(20).speech(12).silence(100).speech(12).silence(20);
        assert_eq!(run(&mut det, &mut source, 176), 2);
    }

    #[test]
    fn inline_command_is_taken_once() {
        let (mut det, _) = detector(MockSttEngine::texts(&["Hey buddy, open Safari."]));
        let (mut source, feeder) = scripted_source();
        feeder.speech(30).silence(20);
        assert_eq!(run(&mut det, &mut source, 50), 1);
        assert_eq!(det.take_inline_command().as_deref(), Some("open safari"));
        assert_eq!(det.take_inline_command(), None);
    }

    #[test]
    fn transcription_failure_is_not_a_wake() {
        let (mut det, stt) = detector(MockSttEngine::script(vec![
            Err(SttError::Transcription("gpu lost".into())),
            Ok(Transcript::new("hey buddy", None)),
        ]));
        let (mut source, feeder) = scripted_source();
        feeder.speech(12).silence(20).speech(12).silence(20);
        assert_eq!(run(&mut det, &mut source, 64), 1);
        assert_eq!(stt.calls(), 2);
    }

    #[test]
    fn coughs_are_never_transcribed() {
        let (mut det, stt) = detector(MockSttEngine::silent());
        let (mut source, feeder) = scripted_source();
        feeder.speech(3).silence(30).speech(2).silence(30);
        assert_eq!(run(&mut det, &mut source, 65), 0);
        assert_eq!(stt.calls(), 0);
    }
}
