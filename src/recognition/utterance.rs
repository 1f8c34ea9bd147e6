use std::time::SystemTime;

/// One transcribed user utterance.
///
/// Produced by the recognizer (or the console), consumed by the intent
/// classifier, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub timestamp: SystemTime,
    pub confidence: Option<f32>,
}

impl Utterance {
    pub fn new(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            timestamp: SystemTime::now(),
            confidence,
        }
    }

    /// Typed input carries no recognition confidence.
    pub fn typed(text: impl Into<String>) -> Self {
        Self::new(text, None)
    }
}
