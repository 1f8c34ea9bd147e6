//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\buddy\
//!   macOS:   ~/Library/Application Support/buddy/
//!   Linux:   ~/.config/buddy/
//!
//! Data dir (models, logs):
//!   Windows: %LOCALAPPDATA%\buddy\
//!   macOS:   ~/Library/Application Support/buddy/
//!   Linux:   ~/.local/share/buddy/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for downloaded GGML model files.
    pub models_dir: PathBuf,
    /// Default directory for log files.
    pub logs_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "buddy";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            models_dir: data_dir.join("models"),
            logs_dir: data_dir.join("logs"),
        }
    }

    /// On-disk location of the Whisper model named `model`
    /// (`ggml-<model>.bin`).
    pub fn model_file(&self, model: &str) -> PathBuf {
        self.models_dir.join(format!("ggml-{model}.bin"))
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
