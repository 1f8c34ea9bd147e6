//! Utterance recording after a wake event.
//!
//! The recorder pulls frames until the speaker stops:
//!
//! ```text
//! waiting ──speech──▶ recording ──silence ≥ silence_timeout──▶ done
//!    │                    └────── span ≥ max_duration ───────▶ done
//!    └── no speech within no_speech_timeout ──▶ timed out
//! ```
//!
//! All durations are counted in audio milliseconds so scripted sources in
//! tests behave exactly like a live microphone.  Cancellation is checked on
//! every frame, so shutdown never waits out a timeout.

use tokio_util::sync::CancellationToken;

use crate::audio::{AudioDeviceError, EnergyVad, FrameSource};
use crate::config::RecognitionConfig;

/// Outcome of one recording attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Recording {
    Speech(Vec<f32>),
    NoSpeech,
    /// Shutdown arrived mid-recording; the audio is discarded.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct UtteranceRecorder {
    vad: EnergyVad,
    silence_timeout_ms: u64,
    no_speech_timeout_ms: u64,
    max_duration_ms: u64,
}

impl UtteranceRecorder {
    pub fn new(config: &RecognitionConfig, frame_samples: usize) -> Self {
        Self {
            vad: EnergyVad::new(config.speech_threshold, frame_samples),
            silence_timeout_ms: config.silence_timeout_ms,
            no_speech_timeout_ms: config.no_speech_timeout_ms,
            max_duration_ms: config.max_duration_ms,
        }
    }

    pub fn vad(&self) -> &EnergyVad {
        &self.vad
    }

    /// Record one utterance from `source`.
    ///
    /// Only device failures are errors; a speaker who never starts yields
    /// [`Recording::NoSpeech`].
    pub fn record(
        &self,
        source: &mut dyn FrameSource,
        cancel: &CancellationToken,
    ) -> Result<Recording, AudioDeviceError> {
        let mut waited_ms = 0_u64;

        // Wait for speech onset.
        let first = loop {
            if cancel.is_cancelled() {
                return Ok(Recording::Cancelled);
            }
            let frame = source.next_frame()?;
            if self.vad.is_speech(&frame.samples) {
                break frame;
            }
            waited_ms += frame.duration_ms();
            if waited_ms >= self.no_speech_timeout_ms {
                log::debug!("recognition: no speech within {waited_ms} ms");
                return Ok(Recording::NoSpeech);
            }
        };

        let mut span_ms = first.duration_ms();
        let mut silence_ms = 0_u64;
        let mut samples = first.samples;

        while span_ms < self.max_duration_ms {
            if cancel.is_cancelled() {
                log::debug!("recognition: cancelled after {span_ms} ms");
                return Ok(Recording::Cancelled);
            }
            let frame = source.next_frame()?;
            let frame_ms = frame.duration_ms();
            samples.extend_from_slice(&frame.samples);
            span_ms += frame_ms;

            if self.vad.is_speech(&frame.samples) {
                silence_ms = 0;
            } else {
                silence_ms += frame_ms;
                if silence_ms >= self.silence_timeout_ms {
                    break;
                }
            }
        }

        log::debug!("recognition: recorded {span_ms} ms");
        Ok(Recording::Speech(samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::testing::scripted_source;

    fn recorder() -> UtteranceRecorder {
        UtteranceRecorder::new(&RecognitionConfig::default(), 480)
    }

    #[test]
    fn stops_after_silence_timeout() {
        let (mut source, feeder) = scripted_source();
        // 1200 ms silence timeout = 40 frames.
        feeder.silence(5).speech(30).silence(60);
        match recorder().record(&mut source, &CancellationToken::new()).unwrap() {
            Recording::Speech(samples) => assert_eq!(samples.len(), (30 + 40) * 480),
            other => panic!("expected speech, got {other:?}"),
        }
    }

    #[test]
    fn no_speech_times_out() {
        let (mut source, _feeder) = scripted_source();
        assert_eq!(recorder().record(&mut source, &CancellationToken::new()).unwrap(), Recording::NoSpeech);
    }

    #[test]
    fn max_duration_caps_recording() {
        let cfg = RecognitionConfig {
            max_duration_ms: 600,
            ..RecognitionConfig::default()
        };
        let (mut source, feeder) = scripted_source();
        feeder.speech(100);
        match UtteranceRecorder::new(&cfg, 480).record(&mut source, &CancellationToken::new()).unwrap() {
            Recording::Speech(samples) => assert_eq!(samples.len(), 20 * 480),
            other => panic!("expected speech, got {other:?}"),
        }
    }

    #[test]
    fn cancellation_stops_mid_utterance() {
        let (mut source, feeder) = scripted_source();
        feeder.speech(100);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(recorder().record(&mut source, &cancel).unwrap(), Recording::Cancelled);
    }

    #[test]
    fn device_loss_propagates() {
        let (mut source, feeder) = scripted_source();
        feeder.speech(3).fail(AudioDeviceError::Lost("unplugged".into()));
        assert!(matches!(
            recorder().record(&mut source, &CancellationToken::new()),
            Err(AudioDeviceError::Lost(_))
        ));
    }
}
