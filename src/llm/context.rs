//! Rolling conversation window fed into every LLM prompt.
//!
//! [`ConversationContext`] keeps the last *N* (utterance, response) pairs,
//! evicting the oldest first, and renders them as a compact transcript:
//!
//! ```text
//! Previous conversation:
//! User: open calculator
//! Buddy: Opening calculator.
//! ```

use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// ConversationContext
// ---------------------------------------------------------------------------

/// # Example
/// ```rust
/// use buddy_assistant::llm::ConversationContext;
///
/// let mut ctx = ConversationContext::new(5);
/// ctx.push("what time is it", "It's three o'clock.");
/// assert!(ctx.render().unwrap().contains("User: what time is it"));
/// ```
#[derive(Debug, Clone)]
pub struct ConversationContext {
    turns: VecDeque<(String, String)>,
    max_turns: usize,
}

impl ConversationContext {
    /// A zero `max_turns` keeps no history at all.
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(max_turns + 1),
            max_turns,
        }
    }

    /// Record one exchange, evicting the oldest beyond capacity.
    pub fn push(&mut self, utterance: impl Into<String>, response: impl Into<String>) {
        if self.max_turns == 0 {
            return;
        }
        self.turns.push_back((utterance.into(), response.into()));
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.turns.iter().map(|(u, r)| (u.as_str(), r.as_str()))
    }

    /// Transcript block for prompt injection, oldest first.
    ///
    /// `None` when there is no history.
    pub fn render(&self) -> Option<String> {
        if self.turns.is_empty() {
            return None;
        }
        let mut out = String::from("Previous conversation:\n");
        for (utterance, response) in &self.turns {
            out.push_str(&format!("User: {utterance}\nBuddy: {response}\n"));
        }
        Some(out)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new(5)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
