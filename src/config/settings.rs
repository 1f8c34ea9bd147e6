//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to every
//! pipeline line at startup.  Every section is `#[serde(default)]`, so a
//! partial `settings.toml` only overrides the keys it names.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// WakeConfig
// ---------------------------------------------------------------------------

/// Wake-phrase gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    /// Trigger phrase, matched case-insensitively on whole words.
    pub phrase: String,
    /// Repeated triggers inside this window are suppressed (echo of our own
    /// speech, stutters).
    pub cooldown_ms: u64,
    /// RMS level above which a frame counts as speech.
    pub energy_threshold: f32,
    /// Shortest speech burst worth transcribing.
    pub min_segment_ms: u64,
    /// Bursts longer than this are analysed immediately.
    pub max_segment_ms: u64,
    /// Trailing silence that closes a burst.
    pub segment_silence_ms: u64,
    /// Frames allowed to queue up behind the detector before the oldest are
    /// dropped.
    pub max_lag_frames: usize,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            phrase: "hey buddy".into(),
            cooldown_ms: 2_000,
            energy_threshold: 0.02,
            min_segment_ms: 300,
            max_segment_ms: 3_000,
            segment_silence_ms: 400,
            max_lag_frames: 50,
        }
    }
}

impl WakeConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Microphone framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Pipeline sample rate in Hz (Whisper requires 16 000).
    pub sample_rate: u32,
    /// Duration of one analysis frame.
    pub frame_ms: u64,
    /// No audio for this long means the device is gone.
    pub device_timeout_ms: u64,
    /// Input device name: `None` means the system default.
    pub input_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_ms: 30,
            device_timeout_ms: 2_000,
            input_device: None,
        }
    }
}

impl AudioConfig {
    /// Samples per analysis frame at [`sample_rate`](Self::sample_rate).
    pub fn frame_samples(&self) -> usize {
        ((self.sample_rate as u64 * self.frame_ms) / 1_000).max(1) as usize
    }
}

// ---------------------------------------------------------------------------
// RecognitionConfig
// ---------------------------------------------------------------------------

/// Utterance capture and Whisper transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// GGML model name / file stem (e.g. `"base.en"` → `ggml-base.en.bin`).
    pub model: String,
    /// ISO-639-1 language code, or `"auto"`.
    pub language: String,
    /// Silence after speech that ends the utterance.
    pub silence_timeout_ms: u64,
    /// Give up when no speech starts within this window.
    pub no_speech_timeout_ms: u64,
    /// Hard cap on one utterance.
    pub max_duration_ms: u64,
    /// Transcripts scored below this are treated as unintelligible.
    pub min_confidence: f32,
    /// Re-listen once, immediately, after a `Timeout`.
    pub relisten: bool,
    /// RMS level above which a capture frame counts as speech.
    pub speech_threshold: f32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            model: "base.en".into(),
            language: "en".into(),
            silence_timeout_ms: 1_200,
            no_speech_timeout_ms: 5_000,
            max_duration_ms: 10_000,
            min_confidence: 0.0,
            relisten: false,
            speech_threshold: 0.02,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Which speech synthesiser backs the output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TtsEngineKind {
    /// The platform's command-line synthesiser (`say` or `espeak`).
    System,
    /// Log instead of speaking (headless machines, CI).
    Silent,
}

impl Default for TtsEngineKind {
    fn default() -> Self {
        Self::System
    }
}

/// Spoken output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub engine: TtsEngineKind,
    /// Voice name passed to the synthesiser: `None` uses its default.
    pub voice: Option<String>,
    /// Speech rate in words per minute.
    pub rate: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            engine: TtsEngineKind::default(),
            voice: None,
            rate: 200,
        }
    }
}

// ---------------------------------------------------------------------------
// LlmProvider / LlmConfig
// ---------------------------------------------------------------------------

/// Selects which LLM backend handles classification and conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmProvider {
    /// Ollama running locally: `/api/generate`, no authentication.
    Ollama,
    /// Any OpenAI-compatible REST API (OpenAI, Groq, LM Studio …).
    OpenAiCompatible,
    /// No backend: the classifier runs permanently in degraded mode.
    Disabled,
}

impl Default for LlmProvider {
    fn default() -> Self {
        Self::Ollama
    }
}

/// Settings for the language-model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Base URL of the API endpoint.
    ///
    /// - Ollama default: `http://localhost:11434`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key: `None` for local providers.
    pub api_key: Option<String>,
    /// Model identifier sent to the API (e.g. `"llama3"`, `"gpt-4o-mini"`).
    pub model: String,
    /// Sampling temperature used for conversational answers.
    /// Classification always runs at 0.0.
    pub temperature: f32,
    /// Maximum seconds to wait for a response before the backend is
    /// considered unreachable.
    pub timeout_secs: u64,
    /// Seconds between background health checks.
    pub health_check_interval_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "llama3".into(),
            temperature: 0.7,
            timeout_secs: 5,
            health_check_interval_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// ContextConfig
// ---------------------------------------------------------------------------

/// Rolling conversation window fed to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Number of (utterance, response) pairs kept.
    pub max_turns: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { max_turns: 5 }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Coordinator behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// A wake event while speaking interrupts playback instead of being
    /// dropped.
    pub barge_in: bool,
    /// The same transient error is announced at most once per window.
    pub notice_cooldown_ms: u64,
    /// How long each line gets to stop after the shutdown broadcast.
    pub shutdown_grace_ms: u64,
    /// Read typed commands from stdin alongside voice input.
    pub console_input: bool,
    /// Speak a greeting once the pipeline is running.
    pub greeting: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            barge_in: false,
            notice_cooldown_ms: 15_000,
            shutdown_grace_ms: 2_000,
            console_input: true,
            greeting: true,
        }
    }
}

// ---------------------------------------------------------------------------
// InputConfig
// ---------------------------------------------------------------------------

/// Desktop input-control tuning and safety limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Pause between key events when typing, and around clipboard pastes.
    pub type_delay_ms: u64,
    /// Scroll amount used when the utterance names none.
    pub scroll_amount: u32,
    /// Upper bound for one Scroll command.
    pub max_scroll_amount: u32,
    /// Longest payload a single Type command may inject.
    pub max_type_chars: usize,
    /// URL schemes an Open command may hand to the system opener.
    pub allowed_open_schemes: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            type_delay_ms: 50,
            scroll_amount: 5,
            max_scroll_amount: 50,
            max_type_chars: 500,
            allowed_open_schemes: vec!["http".into(), "https".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingConfig
// ---------------------------------------------------------------------------

/// Log level and destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter string (e.g. `"info"`, `"buddy_assistant=debug"`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Append to this file instead of stderr.
    pub file: Option<std::path::PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use buddy_assistant::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// assert_eq!(config.wake.phrase, "hey buddy");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub wake: WakeConfig,
    pub audio: AudioConfig,
    pub recognition: RecognitionConfig,
    pub tts: TtsConfig,
    pub llm: LlmConfig,
    pub context: ContextConfig,
    pub pipeline: PipelineConfig,
    pub input: InputConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
