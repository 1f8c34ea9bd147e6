//! Cooldown gate for wake triggers.
//!
//! Time is measured on the audio stream's own clock (milliseconds of audio
//! consumed), not the wall clock, so a detector that falls behind and then
//! catches up on buffered frames still debounces correctly.

#[derive(Debug, Clone)]
pub struct Cooldown {
    window_ms: u64,
    last_ms: Option<u64>,
}

impl Cooldown {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_ms: None,
        }
    }

    /// Returns `true` and arms the cooldown when `now_ms` is outside the
    /// window of the previous accepted trigger.
    pub fn try_fire(&mut self, now_ms: u64) -> bool {
        match self.last_ms {
            Some(last) if now_ms.saturating_sub(last) < self.window_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}
