//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each pipeline
//! stage, `AppPaths` for cross-platform data directories, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.
//!
//! The core consumes configuration read-only: it is loaded once in `main`
//! and cloned into each line at startup.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AudioConfig, ContextConfig, InputConfig, LlmConfig, LlmProvider, LoggingConfig,
    PipelineConfig, RecognitionConfig, TtsConfig, TtsEngineKind, WakeConfig,
};
