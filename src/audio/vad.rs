//! Energy-based voice activity detection.
//!
//! Two consumers share this module:
//!
//! * the wake detector and the utterance recorder ask [`EnergyVad::is_speech`]
//!   frame by frame to find where speech starts and stops;
//! * the recognizer calls [`EnergyVad::trim_silence`] on a finished clip so
//!   Whisper never sees long silent edges (it tends to hallucinate text on
//!   silence).
//!
//! A frame is *speech* when its RMS amplitude exceeds the threshold.

/// Root-mean-square amplitude of `samples`; `0.0` for an empty slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean_sq.sqrt()
}

// ---------------------------------------------------------------------------
// EnergyVad
// ---------------------------------------------------------------------------

/// RMS-threshold speech detector.
///
/// ```rust
/// use buddy_assistant::audio::EnergyVad;
///
/// let vad = EnergyVad::new(0.01, 480);
///
/// let mut clip = vec![0.0_f32; 480];
/// clip.extend(vec![0.5_f32; 480]);
/// clip.extend(vec![0.0_f32; 480]);
///
/// assert!(vad.is_speech(&clip[480..960]));
/// assert_eq!(vad.trim_silence(&clip).len(), 480);
/// ```
#[derive(Debug, Clone)]
pub struct EnergyVad {
    threshold: f32,
    frame_size: usize,
}

impl EnergyVad {
    /// `threshold` is an RMS level in `[0.0, 1.0]` (0.01 for a quiet room,
    /// 0.02–0.05 with background noise).  `frame_size` is the analysis
    /// window used by [`trim_silence`](Self::trim_silence); zero is clamped
    /// to one sample.
    pub fn new(threshold: f32, frame_size: usize) -> Self {
        Self {
            threshold,
            frame_size: frame_size.max(1),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// `true` when `frame` carries speech energy.
    pub fn is_speech(&self, frame: &[f32]) -> bool {
        !frame.is_empty() && rms(frame) > self.threshold
    }

    /// Trim leading and trailing silent frames from `audio`.
    ///
    /// Returns a sub-slice of the input; an all-silent clip yields an empty
    /// slice.
    pub fn trim_silence<'a>(&self, audio: &'a [f32]) -> &'a [f32] {
        let voiced: Vec<usize> = audio
            .chunks(self.frame_size)
            .enumerate()
            .filter(|(_, frame)| self.is_speech(frame))
            .map(|(i, _)| i)
            .collect();

        match (voiced.first(), voiced.last()) {
            (Some(&first), Some(&last)) => {
                let start = first * self.frame_size;
                let end = ((last + 1) * self.frame_size).min(audio.len());
                &audio[start..end]
            }
            _ => &audio[0..0],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(pre: usize, voice: usize, post: usize) -> Vec<f32> {
        let mut v = vec![0.0_f32; pre];
        v.extend(vec![0.5_f32; voice]);
        v.extend(vec![0.0_f32; post]);
        v
    }

    #[test]
    fn rms_of_constant_signal() {
        assert!((rms(&[0.5_f32; 64]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn speech_frame_detection() {
        let vad = EnergyVad::new(0.02, 480);
        assert!(vad.is_speech(&[0.1_f32; 480]));
        assert!(!vad.is_speech(&[0.001_f32; 480]));
        assert!(!vad.is_speech(&[]));
    }

    #[test]
    fn trims_both_edges() {
        let vad = EnergyVad::new(0.01, 480);
        assert_eq!(vad.trim_silence(&signal(480, 480, 480)).len(), 480);
    }

    #[test]
    fn all_silence_is_empty() {
        let vad = EnergyVad::new(0.01, 480);
        assert!(vad.trim_silence(&[0.0_f32; 1_440]).is_empty());
        assert!(vad.trim_silence(&[]).is_empty());
    }

    #[test]
    fn voiced_gap_is_kept() {
        // voice / silence / voice: the inner silence stays in the clip.
        let vad = EnergyVad::new(0.01, 160);
        let mut clip = signal(160, 160, 160);
        clip.extend(vec![0.5_f32; 160]);
        assert_eq!(vad.trim_silence(&clip).len(), 480);
    }

    #[test]
    fn zero_frame_size_is_clamped() {
        let vad = EnergyVad::new(0.01, 0);
        assert_eq!(vad.trim_silence(&signal(3, 2, 3)).len(), 2);
    }
}
