//! Core STT engine trait and implementations.
//!
//! # Overview
//!
//! [`SttEngine`] is the interface used by the wake detector and the
//! recognizer.  It is object-safe and `Send + Sync` so it can be held behind
//! an `Arc<dyn SttEngine>` and shared by both.
//!
//! [`WhisperEngine`] is the production implementation that wraps a
//! `whisper_rs::WhisperContext`.  When no model file is installed the binary
//! substitutes [`MissingModelEngine`], which fails every call so recognition
//! degrades to `ServiceUnavailable` instead of refusing to start.
//!
//! [`MockSttEngine`] (available under `#[cfg(test)]`) replays scripted
//! transcripts without loading any model.

use std::path::{Path, PathBuf};

use thiserror::Error;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters};

use crate::stt::transcribe::{
    SamplingStrategy, Segment, TranscribeParams, Transcript, TranscriptionResult,
    MAX_AUDIO_SAMPLES, MIN_AUDIO_SAMPLES,
};

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// `whisper_rs` failed to initialise a `WhisperContext` or `WhisperState`.
    #[error("Whisper context initialisation failed: {0}")]
    ContextInit(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Audio too short: minimum 0.5 s (8 000 samples at 16 kHz)")]
    AudioTooShort,

    #[error("Audio too long: maximum 60 s (960 000 samples at 16 kHz)")]
    AudioTooLong,
}

fn check_length(audio: &[f32]) -> Result<(), SttError> {
    if audio.len() < MIN_AUDIO_SAMPLES {
        return Err(SttError::AudioTooShort);
    }
    if audio.len() > MAX_AUDIO_SAMPLES {
        return Err(SttError::AudioTooLong);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SttEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech-to-text engines.
///
/// # Contract
///
/// - `audio` must be **16 kHz, mono, f32** PCM samples.
/// - Returns `Err(SttError::AudioTooShort)` when `audio.len() < 8_000`
///   (see [`pad_for_inference`](crate::stt::pad_for_inference)).
/// - Returns `Err(SttError::AudioTooLong)` when `audio.len() > 960_000`.
pub trait SttEngine: Send + Sync {
    /// Transcribe `audio` and return the text transcript.
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError>;

    /// Transcribe with a confidence score when the engine can provide one.
    fn transcribe_scored(&self, audio: &[f32]) -> Result<Transcript, SttError> {
        self.transcribe(audio).map(|text| Transcript::new(text, None))
    }
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SttEngine>) {}
};

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production STT engine that wraps a `whisper_rs::WhisperContext`.
///
/// A new `WhisperState` is created for every call so the engine can be
/// shared across threads without locking.
pub struct WhisperEngine {
    ctx: WhisperContext,
    params: TranscribeParams,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs; the model
// weights are read-only after loading.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model from `model_path`.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`]: `model_path` does not exist.
    /// - [`SttError::ContextInit`] : whisper-rs failed to load the file.
    pub fn load(model_path: impl AsRef<Path>, params: TranscribeParams) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        log::info!("stt: loaded Whisper model {}", path.display());
        Ok(Self { ctx, params })
    }

    /// Transcribe `audio` and return per-segment timing plus a confidence
    /// derived from token probabilities.
    pub fn transcribe_full(&self, audio: &[f32]) -> Result<TranscriptionResult, SttError> {
        check_length(audio)?;

        use whisper_rs::SamplingStrategy as WS;
        let ws = match self.params.strategy {
            SamplingStrategy::Greedy { best_of } => WS::Greedy { best_of },
            SamplingStrategy::BeamSearch {
                beam_size,
                patience,
            } => WS::BeamSearch {
                beam_size,
                patience,
            },
        };

        let mut fp = FullParams::new(ws);

        let lang: Option<&str> = if self.params.language == "auto" {
            None
        } else {
            Some(self.params.language.as_str())
        };
        fp.set_language(lang);
        fp.set_n_threads(self.params.n_threads);
        fp.set_no_context(true);
        fp.set_suppress_non_speech_tokens(self.params.suppress_non_speech);

        if self.params.suppress_progress {
            fp.set_print_progress(false);
            fp.set_print_realtime(false);
        }

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        let wall_start = std::time::Instant::now();

        state
            .full(fp, audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut text = String::new();
        let mut segments: Vec<Segment> = Vec::with_capacity(n_segments.max(0) as usize);
        let mut prob_sum = 0.0_f32;
        let mut prob_count = 0_u32;

        for i in 0..n_segments {
            let seg_text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;

            // Timestamps are in centiseconds.
            let t0 = state.full_get_segment_t0(i).unwrap_or(0).max(0) as u64 * 10;
            let t1 = state.full_get_segment_t1(i).unwrap_or(0).max(0) as u64 * 10;

            let n_tokens = state.full_n_tokens(i).unwrap_or(0);
            for t in 0..n_tokens {
                if let Ok(p) = state.full_get_token_prob(i, t) {
                    prob_sum += p;
                    prob_count += 1;
                }
            }

            text.push_str(&seg_text);
            segments.push(Segment {
                text: seg_text,
                start_ms: t0,
                end_ms: t1,
            });
        }

        let confidence = (prob_count > 0).then(|| prob_sum / prob_count as f32);

        Ok(TranscriptionResult {
            text: text.trim().to_string(),
            segments,
            confidence,
            duration_ms: wall_start.elapsed().as_millis(),
        })
    }
}

impl SttEngine for WhisperEngine {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError> {
        self.transcribe_full(audio).map(|r| r.text)
    }

    fn transcribe_scored(&self, audio: &[f32]) -> Result<Transcript, SttError> {
        let result = self.transcribe_full(audio)?;
        log::debug!(
            "stt: {:?} (confidence {:?}, {} ms)",
            result.text,
            result.confidence,
            result.duration_ms
        );
        Ok(Transcript::new(result.text, result.confidence))
    }
}

// ---------------------------------------------------------------------------
// MissingModelEngine
// ---------------------------------------------------------------------------

/// Stand-in engine used when the Whisper model could not be loaded.
#[derive(Debug, Clone)]
pub struct MissingModelEngine {
    path: PathBuf,
}

impl MissingModelEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SttEngine for MissingModelEngine {
    fn transcribe(&self, _audio: &[f32]) -> Result<String, SttError> {
        Err(SttError::ModelNotFound(self.path.display().to_string()))
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that replays scripted responses in order, then returns an
/// empty transcript once the script runs out.
#[cfg(test)]
pub struct MockSttEngine {
    script: std::sync::Mutex<std::collections::VecDeque<Result<Transcript, SttError>>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSttEngine {
    /// Always-empty script.
    pub fn silent() -> Self {
        Self::script(Vec::new())
    }

    pub fn script(responses: Vec<Result<Transcript, SttError>>) -> Self {
        Self {
            script: std::sync::Mutex::new(responses.into()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Replay `texts` in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::script(
            texts
                .iter()
                .map(|t| Ok(Transcript::new(*t, Some(0.9))))
                .collect(),
        )
    }

    pub fn err(error: SttError) -> Self {
        Self::script(vec![Err(error)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl SttEngine for MockSttEngine {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError> {
        self.transcribe_scored(audio).map(|t| t.text)
    }

    fn transcribe_scored(&self, audio: &[f32]) -> Result<Transcript, SttError> {
        check_length(audio)?;
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Transcript::new("", None)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
