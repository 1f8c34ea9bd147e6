//! Sample-rate conversion and channel mixing.
//!
//! The wake detector and Whisper both consume **mono `f32`** at the pipeline
//! rate (16 kHz by default).  Microphones usually deliver 44.1 or 48 kHz,
//! often in stereo, so every hardware chunk passes through
//! [`stereo_to_mono`] then [`resample`].
//!
//! Linear interpolation is good enough for speech-band content going into
//! Whisper; no anti-aliasing filter is applied.

// ---------------------------------------------------------------------------
// stereo_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`; a trailing partial frame
/// is discarded.  `channels == 0` yields an empty vector.
///
/// ```rust
/// use buddy_assistant::audio::stereo_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = stereo_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample mono `samples` from `source_rate` to `target_rate` Hz.
///
/// Equal rates return a copy.  The output length is
/// `ceil(samples.len() * target_rate / source_rate)`.
///
/// ```rust
/// use buddy_assistant::audio::resample;
///
/// let hi = vec![0.5_f32; 480]; // 10 ms @ 48 kHz
/// let lo = resample(&hi, 48_000, 16_000);
/// assert_eq!(lo.len(), 160);
/// ```
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || source_rate == 0 || target_rate == 0 {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    let step = source_rate as f64 / target_rate as f64;
    let output_len = (samples.len() as f64 / step).ceil() as usize;
    let last = samples.len() - 1;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            let next = samples[(idx + 1).min(last)];
            samples[idx] + (next - samples[idx]) * frac
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_passthrough() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(stereo_to_mono(&input, 1), input);
    }

    #[test]
    fn two_channel_average() {
        let out = stereo_to_mono(&[1.0_f32, -1.0, 0.5, 0.5], 2);
        assert_eq!(out.len(), 2);
        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn partial_trailing_frame_is_dropped() {
        let out = stereo_to_mono(&[0.2_f32, 0.4, 0.9], 2);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn zero_channels_is_empty() {
        assert!(stereo_to_mono(&[1.0_f32, 2.0], 0).is_empty());
    }

    #[test]
    fn same_rate_is_copy() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        assert_eq!(resample(&input, 16_000, 16_000), input);
    }

    #[test]
    fn empty_input() {
        assert!(resample(&[], 48_000, 16_000).is_empty());
    }

    #[test]
    fn downsample_length() {
        assert_eq!(resample(&vec![0.0_f32; 480], 48_000, 16_000).len(), 160);

        let one_second = resample(&vec![0.0_f32; 44_100], 44_100, 16_000);
        assert!(one_second.len().abs_diff(16_000) <= 1);
    }

    #[test]
    fn upsample_length() {
        assert_eq!(resample(&vec![0.0_f32; 80], 8_000, 16_000).len(), 160);
    }

    #[test]
    fn dc_signal_keeps_amplitude() {
        for s in resample(&vec![0.5_f32; 441], 44_100, 16_000) {
            assert!((s - 0.5).abs() < 1e-5, "amplitude drift: {s}");
        }
    }

    #[test]
    fn ramp_is_interpolated() {
        // 8 kHz → 16 kHz doubles the points; midpoints land halfway.
        let out = resample(&[0.0_f32, 1.0, 2.0], 8_000, 16_000);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!((out[3] - 1.5).abs() < 1e-6);
    }
}
