//! The closed set of things Buddy can be asked to do.

use std::fmt;

use thiserror::Error;

/// Default scroll distance when the utterance names none.
pub const DEFAULT_SCROLL_AMOUNT: u32 = 5;

// ---------------------------------------------------------------------------
// ScrollDirection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Parse `"up"` / `"down"`, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// A classified request.  Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Click { target: String },
    Type { text: String },
    Scroll { direction: ScrollDirection, amount: u32 },
    Open { target: String },
    Help,
    Exit,
    /// Open-ended question or chat; carries the raw utterance.
    Converse { text: String },
}

impl Intent {
    /// Wire tag, as used in the classification JSON.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Click { .. } => "click",
            Self::Type { .. } => "type",
            Self::Scroll { .. } => "scroll",
            Self::Open { .. } => "open",
            Self::Help => "help",
            Self::Exit => "exit",
            Self::Converse { .. } => "converse",
        }
    }

    /// Short spoken acknowledgement for a successful input action.
    pub fn confirmation(&self) -> String {
        match self {
            Self::Click { target } if target.is_empty() => "Clicking.".to_string(),
            Self::Click { target } => format!("Clicking {target}."),
            Self::Type { .. } => "Typing that for you.".to_string(),
            Self::Scroll { direction, .. } => format!("Scrolling {direction}."),
            Self::Open { target } => format!("Opening {target}."),
            Self::Help => "Here's what I can do.".to_string(),
            Self::Exit => "Goodbye!".to_string(),
            Self::Converse { .. } => String::new(),
        }
    }

    /// Structured parameters for the UI log.
    pub fn parameters(&self) -> serde_json::Value {
        match self {
            Self::Click { target } | Self::Open { target } => serde_json::json!({ "target": target }),
            Self::Type { text } | Self::Converse { text } => serde_json::json!({ "text": text }),
            Self::Scroll { direction, amount } => {
                serde_json::json!({ "direction": direction.as_str(), "amount": amount })
            }
            Self::Help | Self::Exit => serde_json::json!({}),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click { target } => write!(f, "click({target:?})"),
            Self::Type { text } => write!(f, "type({text:?})"),
            Self::Scroll { direction, amount } => write!(f, "scroll({direction}, {amount})"),
            Self::Open { target } => write!(f, "open({target:?})"),
            Self::Help => f.write_str("help"),
            Self::Exit => f.write_str("exit"),
            Self::Converse { text } => write!(f, "converse({text:?})"),
        }
    }
}

// ---------------------------------------------------------------------------
// ClassificationError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassificationError {
    /// The backend answered, but not with a usable intent object.
    #[error("malformed classification response: {0}")]
    MalformedResponse(String),

    #[error("language model unreachable: {0}")]
    LlmUnreachable(String),
}

impl ClassificationError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::LlmUnreachable(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_direction_parsing() {
        assert_eq!(ScrollDirection::parse(" Up "), Some(ScrollDirection::Up));
        assert_eq!(ScrollDirection::parse("DOWN"), Some(ScrollDirection::Down));
        assert_eq!(ScrollDirection::parse("left"), None);
    }

    #[test]
    fn confirmations() {
        let open = Intent::Open {
            target: "calculator".into(),
        };
        assert_eq!(open.confirmation(), "Opening calculator.");
        let scroll = Intent::Scroll {
            direction: ScrollDirection::Down,
            amount: 5,
        };
        assert_eq!(scroll.confirmation(), "Scrolling down.");
        assert_eq!(Intent::Click { target: String::new() }.confirmation(), "Clicking.");
    }

    #[test]
    fn parameters_for_log() {
        let scroll = Intent::Scroll {
            direction: ScrollDirection::Up,
            amount: 3,
        };
        assert_eq!(scroll.parameters()["direction"], "up");
        assert_eq!(scroll.parameters()["amount"], 3);
        assert_eq!(Intent::Exit.parameters(), serde_json::json!({}));
    }
}
