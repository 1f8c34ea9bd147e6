//! Energy-gated speech burst segmentation.
//!
//! Frames are fed one at a time with a speech/silence verdict from the
//! [`EnergyVad`](crate::audio::EnergyVad).  A burst opens on the first
//! speech frame and closes after `silence_ms` of continuous silence, or
//! once it spans `max_ms`.  Bursts with less than `min_ms` of speech
//! (clicks, coughs) are discarded without being transcribed.

use crate::audio::AudioFrame;
use crate::config::WakeConfig;

#[derive(Debug)]
pub struct BurstSegmenter {
    min_ms: u64,
    max_ms: u64,
    silence_ms: u64,
    samples: Vec<f32>,
    active: bool,
    speech_ms: u64,
    span_ms: u64,
    trailing_silence_ms: u64,
}

impl BurstSegmenter {
    pub fn new(min_ms: u64, max_ms: u64, silence_ms: u64) -> Self {
        Self {
            min_ms,
            max_ms,
            silence_ms,
            samples: Vec::new(),
            active: false,
            speech_ms: 0,
            span_ms: 0,
            trailing_silence_ms: 0,
        }
    }

    pub fn from_config(config: &WakeConfig) -> Self {
        Self::new(
            config.min_segment_ms,
            config.max_segment_ms,
            config.segment_silence_ms,
        )
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feed one frame.  Returns the samples of a completed burst.
    pub fn push(&mut self, frame: &AudioFrame, is_speech: bool) -> Option<Vec<f32>> {
        let frame_ms = frame.duration_ms();

        if !self.active {
            if !is_speech {
                return None;
            }
            self.active = true;
            self.samples.clear();
            self.speech_ms = 0;
            self.span_ms = 0;
            self.trailing_silence_ms = 0;
        }

        self.samples.extend_from_slice(&frame.samples);
        self.span_ms += frame_ms;
        if is_speech {
            self.speech_ms += frame_ms;
            self.trailing_silence_ms = 0;
        } else {
            self.trailing_silence_ms += frame_ms;
        }

        if self.trailing_silence_ms >= self.silence_ms || self.span_ms >= self.max_ms {
            return self.finish();
        }
        None
    }

    /// Close the current burst, returning it when it held enough speech.
    fn finish(&mut self) -> Option<Vec<f32>> {
        self.active = false;
        let samples = std::mem::take(&mut self.samples);
        if self.speech_ms >= self.min_ms {
            Some(samples)
        } else {
            log::trace!("wake: discarded {} ms burst", self.speech_ms);
            None
        }
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(level: f32) -> AudioFrame {
        AudioFrame::new(vec![level; 480], 16_000) // 30 ms
    }

    fn feed(seg: &mut BurstSegmenter, speech: usize, silence: usize) -> Vec<Vec<f32>> {
        let mut out = Vec::new();
        for _ in 0..speech {
            out.extend(seg.push(&frame(0.3), true));
        }
        for _ in 0..silence {
            out.extend(seg.push(&frame(0.0), false));
        }
        out
    }

    #[test]
    fn burst_closes_after_trailing_silence() {
        let mut seg = BurstSegmenter::new(300, 3_000, 400);
        // 13 silent frames = 390 ms: still open.
        assert!(feed(&mut seg, 20, 13).is_empty());
        assert!(seg.is_active());
        // The 14th reaches 420 ms.
        let bursts = feed(&mut seg, 0, 1);
        assert_eq!(bursts.len(), 1);
        assert_eq!(bursts[0].len(), (20 + 14) * 480);
        assert!(!seg.is_active());
    }

    #[test]
    fn short_bursts_are_discarded() {
        let mut seg = BurstSegmenter::new(300, 3_000, 400);
        assert!(feed(&mut seg, 5, 20).is_empty());
        assert!(!seg.is_active());
    }

    #[test]
    fn long_speech_is_cut_at_max() {
        let mut seg = BurstSegmenter::new(300, 900, 400);
        let bursts = feed(&mut seg, 35, 0);
        // 30 frames = 900 ms closes the first burst; 5 more open a new one.
        assert_eq!(bursts.len(), 1);
        assert_eq!(bursts[0].len(), 30 * 480);
        assert!(seg.is_active());
    }

    #[test]
    fn leading_silence_is_ignored() {
        let mut seg = BurstSegmenter::new(300, 3_000, 400);
        assert!(feed(&mut seg, 0, 50).is_empty());
        assert!(!seg.is_active());
    }
}
