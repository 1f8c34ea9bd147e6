//! Rate limiting for spoken error notices.
//!
//! Each error kind may be announced once per cooldown window; repeats inside
//! the window are only logged.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct NoticeLimiter {
    cooldown: Duration,
    last: HashMap<String, Instant>,
}

impl NoticeLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last: HashMap::new(),
        }
    }

    /// `true` if a notice of `kind` may be spoken at `now`; records it.
    pub fn allow(&mut self, kind: &str, now: Instant) -> bool {
        match self.last.get(kind) {
            Some(at) if now.saturating_duration_since(*at) < self.cooldown => false,
            _ => {
                self.last.insert(kind.to_string(), now);
                true
            }
        }
    }
}
