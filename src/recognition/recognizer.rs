//! Speech capture and transcription after a wake event.
//!
//! [`SpeechRecognizer::capture_and_transcribe`] records one utterance with
//! the [`UtteranceRecorder`], trims its silent edges and runs it through the
//! shared [`SttEngine`].  Every failure is a [`RecognitionError`]; only
//! [`RecognitionError::Device`] is fatal to the pipeline.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::audio::{AudioDeviceError, FrameSource};
use crate::config::RecognitionConfig;
use crate::recognition::{Recording, Utterance, UtteranceRecorder};
use crate::stt::{pad_for_inference, SttEngine, MAX_AUDIO_SAMPLES};

/// Consecutive transcription-backend failures before the recognizer resets
/// and tells the user so.
pub const RESET_AFTER_FAILURES: u32 = 5;

// ---------------------------------------------------------------------------
// RecognitionError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecognitionError {
    #[error("no speech detected")]
    Timeout,

    #[error("could not understand the audio")]
    UnintelligibleAudio,

    /// The transcription backend failed.  `consecutive` counts failures
    /// since the last success, starting at 1.
    #[error("speech recognition unavailable: {reason}")]
    ServiceUnavailable { reason: String, consecutive: u32 },

    #[error(transparent)]
    Device(#[from] AudioDeviceError),

    /// The pipeline is shutting down; the utterance was abandoned.
    #[error("recognition cancelled")]
    Cancelled,
}

impl RecognitionError {
    /// Stable short name, used for notice rate limiting and status events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "recognition_timeout",
            Self::UnintelligibleAudio => "unintelligible_audio",
            Self::ServiceUnavailable { .. } => "recognition_unavailable",
            Self::Device(_) => "audio_device",
            Self::Cancelled => "cancelled",
        }
    }

    /// `true` for the failure that tripped the automatic reset.
    pub fn triggered_reset(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { consecutive, .. } if *consecutive >= RESET_AFTER_FAILURES)
    }
}

// ---------------------------------------------------------------------------
// SpeechRecognizer
// ---------------------------------------------------------------------------

pub struct SpeechRecognizer {
    recorder: UtteranceRecorder,
    stt: Arc<dyn SttEngine>,
    min_confidence: f32,
    relisten: bool,
    consecutive_failures: u32,
}

impl SpeechRecognizer {
    pub fn new(config: &RecognitionConfig, frame_samples: usize, stt: Arc<dyn SttEngine>) -> Self {
        Self {
            recorder: UtteranceRecorder::new(config, frame_samples),
            stt,
            min_confidence: config.min_confidence,
            relisten: config.relisten,
            consecutive_failures: 0,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record from `source` and transcribe.
    ///
    /// With `recognition.relisten` set, a [`RecognitionError::Timeout`] is
    /// retried once immediately.  Once `cancel` fires the attempt is
    /// abandoned with [`RecognitionError::Cancelled`] before transcription.
    pub fn capture_and_transcribe(
        &mut self,
        source: &mut dyn FrameSource,
        cancel: &CancellationToken,
    ) -> Result<Utterance, RecognitionError> {
        match self.attempt(source, cancel) {
            Err(RecognitionError::Timeout) if self.relisten => {
                log::debug!("recognition: no speech, listening once more");
                self.attempt(source, cancel)
            }
            other => other,
        }
    }

    fn attempt(
        &mut self,
        source: &mut dyn FrameSource,
        cancel: &CancellationToken,
    ) -> Result<Utterance, RecognitionError> {
        let samples = match self.recorder.record(source, cancel)? {
            Recording::Speech(samples) => samples,
            Recording::NoSpeech => return Err(RecognitionError::Timeout),
            Recording::Cancelled => return Err(RecognitionError::Cancelled),
        };
        if cancel.is_cancelled() {
            return Err(RecognitionError::Cancelled);
        }
        self.transcribe(&samples)
    }

    /// Transcribe an already-recorded clip.
    pub fn transcribe(&mut self, samples: &[f32]) -> Result<Utterance, RecognitionError> {
        let voiced = self.recorder.vad().trim_silence(samples);
        if voiced.is_empty() {
            return Err(RecognitionError::UnintelligibleAudio);
        }
        let clip = &voiced[..voiced.len().min(MAX_AUDIO_SAMPLES)];

        let transcript = match self.stt.transcribe_scored(&pad_for_inference(clip)) {
            Ok(t) => {
                self.consecutive_failures = 0;
                t
            }
            Err(e) => return Err(self.backend_failure(e.to_string())),
        };

        let text = clean_transcript(&transcript.text);
        if text.is_empty() {
            log::debug!("recognition: empty transcript");
            return Err(RecognitionError::UnintelligibleAudio);
        }
        if let Some(conf) = transcript.confidence {
            if conf < self.min_confidence {
                log::debug!("recognition: {text:?} below confidence ({conf:.2})");
                return Err(RecognitionError::UnintelligibleAudio);
            }
        }

        log::info!("recognition: heard {text:?}");
        Ok(Utterance::new(text, transcript.confidence))
    }

    fn backend_failure(&mut self, reason: String) -> RecognitionError {
        self.consecutive_failures += 1;
        let consecutive = self.consecutive_failures;
        log::error!("recognition: transcription failed ({consecutive} in a row): {reason}");

        if consecutive >= RESET_AFTER_FAILURES {
            log::info!("recognition: resetting after {consecutive} consecutive failures");
            self.consecutive_failures = 0;
        }
        RecognitionError::ServiceUnavailable {
            reason,
            consecutive,
        }
    }
}

/// Strip Whisper's non-speech annotations (`[BLANK_AUDIO]`, `(music)`) and
/// surrounding whitespace.  Text without any alphanumeric character is
/// treated as empty.
pub fn clean_transcript(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0_i32;
    for c in raw.chars() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = (depth - 1).max(0),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    let text = out.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().any(char::is_alphanumeric) {
        text
    } else {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::testing::scripted_source;
    use crate::stt::{MockSttEngine, SttError, Transcript};

    fn recognizer(stt: MockSttEngine, config: RecognitionConfig) -> SpeechRecognizer {
        SpeechRecognizer::new(&config, 480, Arc::new(stt))
    }

    #[test]
    fn transcribes_recorded_speech() {
        let mut rec = recognizer(
            MockSttEngine::texts(&[" Open calculator. "]),
            RecognitionConfig::default(),
        );
        let (mut source, feeder) = scripted_source();
        feeder.speech(20).silence(45);

        let utt = rec.capture_and_transcribe(&mut source, &CancellationToken::new()).unwrap();
        assert_eq!(utt.text, "Open calculator.");
        assert_eq!(utt.confidence, Some(0.9));
    }

    #[test]
    fn empty_transcript_is_unintelligible() {
        let mut rec = recognizer(MockSttEngine::texts(&["[BLANK_AUDIO]"]), RecognitionConfig::default());
        let (mut source, feeder) = scripted_source();
        feeder.speech(20).silence(45);
        assert_eq!(
            rec.capture_and_transcribe(&mut source, &CancellationToken::new()).unwrap_err(),
            RecognitionError::UnintelligibleAudio
        );
    }

    #[test]
    fn low_confidence_is_unintelligible() {
        let cfg = RecognitionConfig {
            min_confidence: 0.5,
            ..RecognitionConfig::default()
        };
        let stt = MockSttEngine::script(vec![Ok(Transcript::new("mumble", Some(0.2)))]);
        let mut rec = recognizer(stt, cfg);
        assert_eq!(
            rec.transcribe(&vec![0.3; 16_000]).unwrap_err(),
            RecognitionError::UnintelligibleAudio
        );
    }

    #[test]
    fn silence_times_out_without_transcribing() {
        let stt = Arc::new(MockSttEngine::texts(&["never"]));
        let mut rec = SpeechRecognizer::new(&RecognitionConfig::default(), 480, stt.clone());
        let (mut source, _feeder) = scripted_source();
        assert_eq!(
            rec.capture_and_transcribe(&mut source, &CancellationToken::new()).unwrap_err(),
            RecognitionError::Timeout
        );
        assert_eq!(stt.calls(), 0);
    }

    #[test]
    fn relisten_retries_once_after_timeout() {
        let cfg = RecognitionConfig {
            relisten: true,
            no_speech_timeout_ms: 300,
            ..RecognitionConfig::default()
        };
        let mut rec = recognizer(MockSttEngine::texts(&["scroll down"]), cfg);
        let (mut source, feeder) = scripted_source();
        // First window (10 frames) silent, speech in the second.
        feeder.silence(10).speech(15).silence(45);
        assert_eq!(rec.capture_and_transcribe(&mut source, &CancellationToken::new()).unwrap().text, "scroll down");
    }

    #[test]
    fn service_failures_count_up_and_reset() {
        let failures = (0..6)
            .map(|_| Err(SttError::Transcription("backend down".into())))
            .collect();
        let mut rec = recognizer(MockSttEngine::script(failures), RecognitionConfig::default());
        let clip = vec![0.3_f32; 16_000];

        for expected in 1..=RESET_AFTER_FAILURES {
            match rec.transcribe(&clip).unwrap_err() {
                RecognitionError::ServiceUnavailable { consecutive, .. } => {
                    assert_eq!(consecutive, expected)
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(rec.consecutive_failures(), 0, "counter resets at the limit");

        let err = rec.transcribe(&clip).unwrap_err();
        assert!(!err.triggered_reset());
        assert!(matches!(err, RecognitionError::ServiceUnavailable { consecutive: 1, .. }));
    }

    #[test]
    fn fifth_failure_triggers_reset() {
        let err = RecognitionError::ServiceUnavailable {
            reason: "x".into(),
            consecutive: RESET_AFTER_FAILURES,
        };
        assert!(err.triggered_reset());
    }

    #[test]
    fn device_errors_are_fatal() {
        let mut rec = recognizer(MockSttEngine::silent(), RecognitionConfig::default());
        let (mut source, feeder) = scripted_source();
        feeder.fail(AudioDeviceError::Stalled(2_000));
        let err = rec.capture_and_transcribe(&mut source, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, RecognitionError::Device(AudioDeviceError::Stalled(2_000))));
        assert_eq!(err.kind(), "audio_device");
    }

    #[test]
    fn cancelled_capture_is_never_transcribed() {
        let stt = Arc::new(MockSttEngine::texts(&["never"]));
        let mut rec = SpeechRecognizer::new(&RecognitionConfig::default(), 480, stt.clone());
        let (mut source, feeder) = scripted_source();
        feeder.speech(20).silence(45);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            rec.capture_and_transcribe(&mut source, &cancel).unwrap_err(),
            RecognitionError::Cancelled
        );
        assert_eq!(stt.calls(), 0);
    }

    #[test]
    fn annotations_are_stripped() {
        assert_eq!(clean_transcript("(music) hello  [noise] there"), "hello there");
        assert_eq!(clean_transcript(" ... "), "");
        assert_eq!(clean_transcript("[BLANK_AUDIO]"), "");
    }
}
