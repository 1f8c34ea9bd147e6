//! Pipeline state machine.
//!
//! [`PipelineState`] is owned and mutated by the
//! [`Coordinator`](crate::pipeline::Coordinator) only; everyone else
//! observes it through a `tokio::sync::watch` channel and
//! [`StatusEvent::StateChanged`](crate::pipeline::StatusEvent).
//!
//! ```text
//! Idle ──wake──▶ Capturing ──utterance──▶ Classifying ──intent──▶ Executing
//!  ▲                │                                                │
//!  │                └──timeout / recognition error──▶ Idle           │ result
//!  │                                                                 ▼
//!  └─────────────────────playback complete────────────────────── Speaking
//!                   Speaking ──wake (barge-in)──▶ Capturing
//!
//! any ──shutdown──▶ ShuttingDown (terminal)
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Listening for the wake phrase.
    #[default]
    Idle,
    /// Recording and transcribing an utterance.
    Capturing,
    /// Waiting for the intent classifier.
    Classifying,
    /// Running the dispatched action.
    Executing,
    /// Playing back the result.
    Speaking,
    ShuttingDown,
}

impl PipelineState {
    /// `true` when `self → next` is an edge of the state machine.
    ///
    /// ```
    /// use buddy_assistant::pipeline::PipelineState;
    ///
    /// assert!(PipelineState::Idle.can_transition_to(PipelineState::Capturing));
    /// assert!(!PipelineState::Executing.can_transition_to(PipelineState::Capturing));
    /// assert!(PipelineState::Executing.can_transition_to(PipelineState::ShuttingDown));
    /// ```
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (ShuttingDown, _) => false,
            (_, ShuttingDown) => true,
            (Idle, Capturing)
            | (Capturing, Classifying)
            | (Capturing, Idle)
            | (Classifying, Executing)
            | (Executing, Speaking)
            | (Speaking, Idle)
            | (Speaking, Capturing) => true,
            _ => false,
        }
    }

    /// `true` while an utterance is in flight.
    pub fn is_busy(self) -> bool {
        !matches!(self, PipelineState::Idle | PipelineState::ShuttingDown)
    }

    pub fn label(self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Capturing => "Capturing",
            PipelineState::Classifying => "Classifying",
            PipelineState::Executing => "Executing",
            PipelineState::Speaking => "Speaking",
            PipelineState::ShuttingDown => "Shutting down",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::PipelineState::*;
    use super::*;

    const ALL: [PipelineState; 6] = [Idle, Capturing, Classifying, Executing, Speaking, ShuttingDown];

    #[test]
    fn default_is_idle() {
        assert_eq!(PipelineState::default(), Idle);
    }

    #[test]
    fn happy_path_is_allowed() {
        let path = [Idle, Capturing, Classifying, Executing, Speaking, Idle];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn wake_only_starts_capture_from_idle_or_speaking() {
        for state in ALL {
            let allowed = state.can_transition_to(Capturing);
            assert_eq!(allowed, matches!(state, Idle | Speaking), "{state}");
        }
    }

    #[test]
    fn shutdown_is_reachable_and_terminal() {
        for state in ALL {
            assert_eq!(state.can_transition_to(ShuttingDown), state != ShuttingDown);
            assert!(!ShuttingDown.can_transition_to(state));
        }
    }

    #[test]
    fn no_skipping_stages() {
        assert!(!Idle.can_transition_to(Classifying));
        assert!(!Classifying.can_transition_to(Speaking));
        assert!(!Executing.can_transition_to(Idle));
        assert!(!Classifying.can_transition_to(Idle));
    }

    #[test]
    fn busy_states() {
        assert!(!Idle.is_busy());
        assert!(Capturing.is_busy());
        assert!(Speaking.is_busy());
        assert!(!ShuttingDown.is_busy());
    }
}
