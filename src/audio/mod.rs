//! Audio input: microphone capture → mono/resample → fixed frames → VAD.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) → stereo_to_mono → resample
//!           → AudioFrame (30 ms) → LagBuffer → FrameSource::next_frame()
//!                                              ├─ wake detector
//!                                              └─ utterance recorder (EnergyVad)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use buddy_assistant::audio::{FrameSource, MicrophoneSource};
//! use buddy_assistant::config::AppConfig;
//!
//! let config = AppConfig::default();
//! let mut mic = MicrophoneSource::open(&config.audio, config.wake.max_lag_frames).unwrap();
//! let frame = mic.next_frame().unwrap();
//! println!("{} samples, rms {:.3}", frame.samples.len(), frame.rms());
//! ```

pub mod buffer;
pub mod capture;
pub mod resample;
pub mod source;
pub mod vad;

pub use buffer::LagBuffer;
pub use capture::{AudioCapture, AudioChunk, DeviceFault, StreamHandle};
pub use resample::{resample, stereo_to_mono};
pub use source::{AudioDeviceError, AudioFrame, FrameSource, MicrophoneSource};
pub use vad::{rms, EnergyVad};
