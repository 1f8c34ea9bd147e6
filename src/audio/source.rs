//! Fixed-duration frame stream consumed by the audio line.
//!
//! [`FrameSource`] is the seam between the hardware and everything that
//! listens: the wake detector and the utterance recorder only ever call
//! [`FrameSource::next_frame`].  [`MicrophoneSource`] is the production
//! implementation:
//!
//! ```text
//! cpal callback → AudioChunk (std mpsc) → stereo_to_mono → resample
//!              → fixed-size AudioFrame → LagBuffer (drops oldest) → next_frame()
//! ```
//!
//! Device loss is never retried here.  A cpal stream error, a closed
//! channel, or no audio for `audio.device_timeout_ms` all surface as
//! [`AudioDeviceError`], which the coordinator treats as fatal.

use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use thiserror::Error;

use crate::audio::{
    capture::{AudioCapture, DeviceFault, StreamHandle},
    resample, stereo_to_mono, vad, AudioChunk, LagBuffer,
};
use crate::config::AudioConfig;

// ---------------------------------------------------------------------------
// AudioDeviceError
// ---------------------------------------------------------------------------

/// Unrecoverable input-device failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioDeviceError {
    #[error("no input device available: {0}")]
    NoDevice(String),

    #[error("input device configuration failed: {0}")]
    Config(String),

    #[error("input device lost: {0}")]
    Lost(String),

    #[error("no audio from input device for {0} ms")]
    Stalled(u64),
}

// ---------------------------------------------------------------------------
// AudioFrame
// ---------------------------------------------------------------------------

/// One analysis frame of mono `f32` audio at the pipeline sample rate.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A frame of digital silence.
    pub fn silence(len: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn rms(&self) -> f32 {
        vad::rms(&self.samples)
    }

    /// Wall-clock span covered by this frame, in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1_000 / self.sample_rate as u64
    }
}

// ---------------------------------------------------------------------------
// FrameSource trait
// ---------------------------------------------------------------------------

/// A continuous stream of [`AudioFrame`]s.
///
/// Implementations block until the next frame is available.  They are owned
/// by the audio line's thread and need not be `Send`: the cpal stream inside
/// [`MicrophoneSource`] is not `Send` on every platform, so the line builds
/// its source on its own thread.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<AudioFrame, AudioDeviceError>;

    fn sample_rate(&self) -> u32;

    /// Discard any frames queued so far.
    fn flush(&mut self) {}
}

// ---------------------------------------------------------------------------
// MicrophoneSource
// ---------------------------------------------------------------------------

pub struct MicrophoneSource {
    _stream: StreamHandle,
    fault: DeviceFault,
    rx: mpsc::Receiver<AudioChunk>,
    /// Converted samples not yet long enough to fill a frame.
    pending: Vec<f32>,
    backlog: LagBuffer<AudioFrame>,
    frame_samples: usize,
    sample_rate: u32,
    device_timeout: Duration,
}

impl MicrophoneSource {
    /// Open the configured input device and start streaming.
    ///
    /// `max_lag_frames` bounds how far the consumer may fall behind before
    /// the oldest frames are dropped.
    pub fn open(config: &AudioConfig, max_lag_frames: usize) -> Result<Self, AudioDeviceError> {
        let capture = AudioCapture::open(config.input_device.as_deref())?;
        let (tx, rx) = mpsc::channel::<AudioChunk>();
        let stream = capture.start(tx)?;

        log::info!(
            "audio: microphone streaming ({} Hz → {} Hz, {} ms frames)",
            capture.sample_rate(),
            config.sample_rate,
            config.frame_ms
        );

        Ok(Self {
            fault: stream.fault(),
            _stream: stream,
            rx,
            pending: Vec::new(),
            backlog: LagBuffer::new(max_lag_frames),
            frame_samples: config.frame_samples(),
            sample_rate: config.sample_rate,
            device_timeout: Duration::from_millis(config.device_timeout_ms),
        })
    }

    fn ingest(&mut self, chunk: AudioChunk) {
        let mono = stereo_to_mono(&chunk.samples, chunk.channels);
        let converted = resample(&mono, chunk.sample_rate, self.sample_rate);
        self.pending.extend_from_slice(&converted);

        while self.pending.len() >= self.frame_samples {
            let samples: Vec<f32> = self.pending.drain(..self.frame_samples).collect();
            if self.backlog.push(AudioFrame::new(samples, self.sample_rate)) {
                let dropped = self.backlog.dropped();
                if dropped % 100 == 1 {
                    log::warn!("audio: consumer lagging, {dropped} frame(s) dropped so far");
                }
            }
        }
    }

    fn check_fault(&self) -> Result<(), AudioDeviceError> {
        match self.fault.get() {
            Some(message) => Err(AudioDeviceError::Lost(message)),
            None => Ok(()),
        }
    }
}

impl FrameSource for MicrophoneSource {
    fn next_frame(&mut self) -> Result<AudioFrame, AudioDeviceError> {
        loop {
            self.check_fault()?;

            loop {
                match self.rx.try_recv() {
                    Ok(chunk) => self.ingest(chunk),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        return Err(AudioDeviceError::Lost("capture stream closed".into()))
                    }
                }
            }

            if let Some(frame) = self.backlog.pop() {
                return Ok(frame);
            }

            match self.rx.recv_timeout(self.device_timeout) {
                Ok(chunk) => self.ingest(chunk),
                Err(RecvTimeoutError::Timeout) => {
                    self.check_fault()?;
                    return Err(AudioDeviceError::Stalled(
                        self.device_timeout.as_millis() as u64,
                    ));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(AudioDeviceError::Lost("capture stream closed".into()))
                }
            }
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn flush(&mut self) {
        while self.rx.try_recv().is_ok() {}
        self.pending.clear();
        self.backlog.clear();
    }
}

// ---------------------------------------------------------------------------
// ScriptedSource  (test-only)
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::testing::scripted_source;
    use super::*;

    #[test]
    fn frame_duration_and_energy() {
        let frame = AudioFrame::new(vec![0.5; 480], 16_000);
        assert_eq!(frame.duration_ms(), 30);
        assert!((frame.rms() - 0.5).abs() < 1e-6);
        assert_eq!(AudioFrame::silence(160, 16_000).rms(), 0.0);
        assert_eq!(AudioFrame::new(vec![0.1; 10], 0).duration_ms(), 0);
    }

    #[test]
    fn scripted_source_replays_in_order_then_idles() {
        let (mut source, feeder) = scripted_source();
        feeder.speech(1).silence(1);

        assert!(source.next_frame().unwrap().rms() > 0.1);
        assert_eq!(source.next_frame().unwrap().rms(), 0.0);
        // Empty feed keeps producing silence.
        assert_eq!(source.next_frame().unwrap().rms(), 0.0);
    }

    #[test]
    fn scripted_source_reports_device_errors() {
        let (mut source, feeder) = scripted_source();
        feeder.fail(AudioDeviceError::Lost("unplugged".into()));
        assert_eq!(
            source.next_frame().unwrap_err(),
            AudioDeviceError::Lost("unplugged".into())
        );
    }

    #[test]
    fn device_error_messages() {
        assert!(AudioDeviceError::Stalled(2_000).to_string().contains("2000 ms"));
        assert!(AudioDeviceError::NoDevice("USB Mic".into())
            .to_string()
            .contains("USB Mic"));
    }
}
