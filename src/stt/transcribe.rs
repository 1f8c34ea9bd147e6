//! Transcription parameter and result types.
//!
//! [`TranscribeParams`] carries the settings for one Whisper inference run;
//! [`TranscriptionResult`] is what [`WhisperEngine::transcribe_full`]
//! returns, and [`Transcript`] is the slimmer text-plus-confidence form the
//! wake detector and recognizer work with.
//!
//! [`WhisperEngine::transcribe_full`]: crate::stt::WhisperEngine::transcribe_full

use std::borrow::Cow;

use crate::config::RecognitionConfig;

// ---------------------------------------------------------------------------
// SamplingStrategy
// ---------------------------------------------------------------------------

/// Mirrors `whisper_rs::SamplingStrategy` but is owned and `Clone`.
///
/// Greedy decoding keeps wake-phrase checks fast; beam search trades 2-4×
/// latency for slightly better accuracy on longer commands.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingStrategy {
    Greedy {
        /// Number of candidate tokens evaluated per step.  1 is fastest.
        best_of: i32,
    },
    BeamSearch {
        beam_size: i32,
        /// Beam-search patience factor (≥1.0 = standard beam search).
        patience: f32,
    },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Greedy { best_of: 1 }
    }
}

// ---------------------------------------------------------------------------
// TranscribeParams
// ---------------------------------------------------------------------------

/// All parameters for a single Whisper transcription run.
#[derive(Debug, Clone)]
pub struct TranscribeParams {
    /// ISO-639-1 language code (e.g. `"en"`), or `"auto"` to let Whisper
    /// detect the language.
    pub language: String,

    pub strategy: SamplingStrategy,

    /// CPU threads handed to Whisper.  Defaults to [`optimal_threads()`].
    pub n_threads: i32,

    /// Suppress Whisper's progress output to stderr.
    pub suppress_progress: bool,

    /// Keep Whisper from emitting `[BLANK_AUDIO]`-style annotations.
    pub suppress_non_speech: bool,
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self {
            language: "en".into(),
            strategy: SamplingStrategy::default(),
            n_threads: optimal_threads(),
            suppress_progress: true,
            suppress_non_speech: true,
        }
    }
}

impl TranscribeParams {
    pub fn from_config(config: &RecognitionConfig) -> Self {
        Self {
            language: config.language.clone(),
            ..Self::default()
        }
    }
}

/// Number of CPU threads to use for inference, capped at 8 where Whisper
/// stops scaling.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// Audio length contract (16 kHz mono f32)
// ---------------------------------------------------------------------------

/// Minimum clip Whisper accepts: 0.5 s × 16 000 Hz.
pub const MIN_AUDIO_SAMPLES: usize = 8_000;
/// Maximum clip Whisper accepts: 60 s × 16 000 Hz.
pub const MAX_AUDIO_SAMPLES: usize = 960_000;

/// Zero-pad `audio` up to [`MIN_AUDIO_SAMPLES`].
///
/// Wake-phrase bursts are often shorter than Whisper's minimum; trailing
/// silence does not change what Whisper hears.
pub fn pad_for_inference(audio: &[f32]) -> Cow<'_, [f32]> {
    if audio.len() >= MIN_AUDIO_SAMPLES {
        return Cow::Borrowed(audio);
    }
    let mut padded = Vec::with_capacity(MIN_AUDIO_SAMPLES);
    padded.extend_from_slice(audio);
    padded.resize(MIN_AUDIO_SAMPLES, 0.0);
    Cow::Owned(padded)
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Text plus an optional confidence in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub confidence: Option<f32>,
}

impl Transcript {
    pub fn new(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// The output of a successful Whisper run.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// Full concatenated transcript, trimmed.
    pub text: String,

    pub segments: Vec<Segment>,

    /// Mean token probability across all segments, when Whisper reported
    /// any tokens.
    pub confidence: Option<f32>,

    /// Wall-clock inference time in milliseconds.
    pub duration_ms: u128,
}

/// A single time-aligned text chunk produced by Whisper.
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}
