//! Speech synthesis backends.
//!
//! [`SystemTts`] shells out to the platform voice: `say` on macOS,
//! `espeak` elsewhere.  The child is spawned with `kill_on_drop`, so
//! dropping the [`TtsEngine::speak`] future (barge-in, shutdown) silences it
//! immediately.  [`SilentTts`] only logs.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::config::{TtsConfig, TtsEngineKind};

// ---------------------------------------------------------------------------
// TtsError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TtsError {
    #[error("cannot start speech synthesizer '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("speech synthesizer exited with {0}")]
    Failed(String),
}

// ---------------------------------------------------------------------------
// TtsEngine trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Speak `text`, returning when playback has finished.
    async fn speak(&self, text: &str) -> Result<(), TtsError>;
}

/// Build the engine selected in config.
pub fn engine_from_config(config: &TtsConfig) -> Box<dyn TtsEngine> {
    match config.engine {
        TtsEngineKind::System => Box::new(SystemTts::from_config(config)),
        TtsEngineKind::Silent => Box::new(SilentTts),
    }
}

// ---------------------------------------------------------------------------
// SystemTts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SystemTts {
    program: &'static str,
    voice: Option<String>,
    /// Words per minute.
    rate: u32,
}

impl SystemTts {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self {
            program: if cfg!(target_os = "macos") { "say" } else { "espeak" },
            voice: config.voice.clone().filter(|v| !v.is_empty()),
            rate: config.rate.clamp(80, 500),
        }
    }

    /// Command-line arguments for one utterance.
    fn args(&self, text: &str) -> Vec<String> {
        let rate_flag = if self.program == "say" { "-r" } else { "-s" };
        let mut args = vec![rate_flag.to_string(), self.rate.to_string()];
        if let Some(voice) = &self.voice {
            args.push("-v".into());
            args.push(voice.clone());
        }
        // A leading dash would be read as an option.
        args.push(text.trim_start_matches('-').trim().to_string());
        args
    }
}

#[async_trait]
impl TtsEngine for SystemTts {
    async fn speak(&self, text: &str) -> Result<(), TtsError> {
        let status = Command::new(self.program)
            .args(self.args(text))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| TtsError::Spawn {
                program: self.program.to_string(),
                reason: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(TtsError::Failed(status.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// SilentTts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentTts;

#[async_trait]
impl TtsEngine for SilentTts {
    async fn speak(&self, text: &str) -> Result<(), TtsError> {
        log::info!("tts: (silent) {text}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tts(voice: Option<&str>, rate: u32) -> SystemTts {
        SystemTts::from_config(&TtsConfig {
            engine: TtsEngineKind::System,
            voice: voice.map(str::to_string),
            rate,
        })
    }

    #[test]
    fn args_carry_rate_voice_and_text() {
        let engine = tts(Some("Samantha"), 180);
        let args = engine.args("Opening calculator.");
        assert_eq!(args[1], "180");
        assert_eq!(&args[2..4], ["-v", "Samantha"]);
        assert_eq!(args.last().unwrap(), "Opening calculator.");
    }

    #[test]
    fn rate_is_clamped_and_blank_voice_dropped() {
        let engine = tts(Some(""), 5);
        assert_eq!(engine.rate, 80);
        assert_eq!(engine.args("x").len(), 3);
    }

    #[test]
    fn leading_dashes_are_stripped() {
        let engine = tts(None, 200);
        assert_eq!(engine.args("--help me").last().unwrap(), "help me");
    }

    #[tokio::test]
    async fn silent_engine_succeeds() {
        assert_eq!(SilentTts.speak("hello").await, Ok(()));
    }
}
