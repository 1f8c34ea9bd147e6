//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] to begin streaming [`AudioChunk`]s over an mpsc
//! channel.  The returned [`StreamHandle`] is a RAII guard: dropping it
//! stops the underlying cpal stream.
//!
//! Stream errors reported by cpal after start-up (device unplugged, driver
//! reset) are recorded in the handle's [`DeviceFault`] slot so the frame
//! source can surface them instead of waiting forever for audio.

use std::sync::{mpsc, Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio::AudioDeviceError;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// DeviceFault
// ---------------------------------------------------------------------------

/// Last stream error reported by the cpal error callback, if any.
#[derive(Debug, Clone, Default)]
pub struct DeviceFault(Arc<Mutex<Option<String>>>);

impl DeviceFault {
    fn record(&self, message: String) {
        if let Ok(mut slot) = self.0.lock() {
            slot.get_or_insert(message);
        }
    }

    /// Returns the first recorded fault, leaving it in place.
    pub fn get(&self) -> Option<String> {
        self.0.lock().ok().and_then(|slot| slot.clone())
    }
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value drops the `cpal::Stream`, which stops the underlying
/// hardware stream.
pub struct StreamHandle {
    _stream: cpal::Stream,
    fault: DeviceFault,
}

impl StreamHandle {
    /// Shared view of stream errors reported after start-up.
    pub fn fault(&self) -> DeviceFault {
        self.fault.clone()
    }
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    /// Native sample rate reported by the device (Hz).
    sample_rate: u32,
    /// Number of interleaved channels reported by the device.
    channels: u16,
}

impl AudioCapture {
    /// Open the input device named `device_name`, or the system default
    /// input when `None`.
    ///
    /// # Errors
    ///
    /// [`AudioDeviceError::NoDevice`] when no matching input device exists,
    /// [`AudioDeviceError::Config`] when the device cannot report a default
    /// stream configuration.
    pub fn open(device_name: Option<&str>) -> Result<Self, AudioDeviceError> {
        let host = cpal::default_host();

        let device = match device_name {
            None => host.default_input_device(),
            Some(wanted) => host
                .input_devices()
                .map_err(|e| AudioDeviceError::Config(e.to_string()))?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false)),
        }
        .ok_or_else(|| AudioDeviceError::NoDevice(device_name.unwrap_or("default").into()))?;

        let supported = device
            .default_input_config()
            .map_err(|e| AudioDeviceError::Config(e.to_string()))?;

        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        if let Ok(name) = device.name() {
            log::info!("audio: using input device '{name}' ({sample_rate} Hz, {channels} ch)");
        }

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start recording and send [`AudioChunk`]s to `tx`.
    ///
    /// The cpal callback runs on cpal's own audio thread; each hardware
    /// buffer is wrapped in an [`AudioChunk`] and forwarded over the channel.
    /// Send errors (receiver dropped) are ignored so the callback never
    /// panics.
    pub fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamHandle, AudioDeviceError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let fault = DeviceFault::default();
        let fault_cb = fault.clone();

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(AudioChunk {
                        samples: data.to_vec(),
                        sample_rate,
                        channels,
                    });
                },
                move |err: cpal::StreamError| {
                    log::error!("audio: cpal stream error: {err}");
                    fault_cb.record(err.to_string());
                },
                None,
            )
            .map_err(|e| AudioDeviceError::Config(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioDeviceError::Lost(e.to_string()))?;

        Ok(StreamHandle {
            _stream: stream,
            fault,
        })
    }

    /// Native sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels in each [`AudioChunk`].
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
