//! Regex/keyword intent matcher used while the language model is out of
//! reach.
//!
//! Patterns are tried in a fixed order (click, type, scroll, open, help,
//! exit) and the first hit wins.  Matching is case-insensitive and
//! whole-word; trailing punctuation added by the transcriber is ignored.
//!
//! ```text
//! "Click on the submit button."  → Click { target: "submit button" }
//! "scroll down 3"                → Scroll { Down, 3 }
//! "go to github.com"             → Open  { target: "github.com" }
//! "what's the weather"           → None
//! ```

use regex::{Captures, Regex};

use crate::intent::types::{Intent, ScrollDirection, DEFAULT_SCROLL_AMOUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    Click,
    Type,
    Scroll,
    /// Bare "scroll" with no recognised direction.
    ScrollKeyword,
    Open,
    Help,
    Exit,
}

const PATTERNS: &[(RuleKind, &str)] = &[
    (RuleKind::Click, r"\b(?:click|press|select|choose|tap)(?:\s+on)?\s+(.+)"),
    (RuleKind::Type, r"\b(?:type|enter|input|write)\s+(.+)"),
    (
        RuleKind::Scroll,
        r"\b(?:scroll|move)\s+(up|down)(?:\s+(?:by\s+)?(\d+|one|two|three|four|five|six|seven|eight|nine|ten))?\b",
    ),
    (RuleKind::ScrollKeyword, r"\bscroll\b"),
    (RuleKind::Open, r"\b(?:open|launch|start|go\s+to|navigate\s+to)\s+(.+)"),
    (RuleKind::Help, r"\b(?:help|assist|guide)\b|\bwhat\s+can\s+you\s+do\b"),
    (RuleKind::Exit, r"\b(?:exit|quit|bye|goodbye)\b"),
];

struct Rule {
    kind: RuleKind,
    regex: Regex,
}

// ---------------------------------------------------------------------------
// RuleMatcher
// ---------------------------------------------------------------------------

pub struct RuleMatcher {
    rules: Vec<Rule>,
}

impl RuleMatcher {
    pub fn new() -> Self {
        let rules = PATTERNS
            .iter()
            .filter_map(|(kind, pattern)| match Regex::new(&format!("(?i){pattern}")) {
                Ok(regex) => Some(Rule { kind: *kind, regex }),
                Err(e) => {
                    log::error!("intent: failed to compile {kind:?} rule: {e}");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// First rule matching `text`, or `None`.
    pub fn match_intent(&self, text: &str) -> Option<Intent> {
        let text = text.trim().trim_end_matches(['.', '!', '?', ',']);
        self.rules.iter().find_map(|rule| {
            let caps = rule.regex.captures(text)?;
            build(rule.kind, &caps, text)
        })
    }
}

impl Default for RuleMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn build(kind: RuleKind, caps: &Captures<'_>, text: &str) -> Option<Intent> {
    let object = || caps.get(1).map(|m| clean_object(m.as_str()));
    match kind {
        RuleKind::Click => Some(Intent::Click { target: object()? }),
        RuleKind::Type => {
            let text = caps.get(1)?.as_str().trim().to_string();
            (!text.is_empty()).then_some(Intent::Type { text })
        }
        RuleKind::Scroll => Some(Intent::Scroll {
            direction: ScrollDirection::parse(caps.get(1)?.as_str())?,
            amount: caps
                .get(2)
                .and_then(|m| parse_amount(m.as_str()))
                .unwrap_or(DEFAULT_SCROLL_AMOUNT),
        }),
        RuleKind::ScrollKeyword => {
            let lower = text.to_ascii_lowercase();
            let direction = if lower.split_whitespace().any(|w| w == "up") {
                ScrollDirection::Up
            } else {
                ScrollDirection::Down
            };
            let amount = lower
                .split_whitespace()
                .find_map(parse_amount)
                .unwrap_or(DEFAULT_SCROLL_AMOUNT);
            Some(Intent::Scroll { direction, amount })
        }
        RuleKind::Open => {
            let target = object()?;
            (!target.is_empty()).then_some(Intent::Open { target })
        }
        RuleKind::Help => Some(Intent::Help),
        RuleKind::Exit => Some(Intent::Exit),
    }
}

/// Drop a leading article from a spoken object ("the submit button").
fn clean_object(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    for article in ["the ", "a ", "an "] {
        if lower.starts_with(article) {
            return trimmed[article.len()..].trim().to_string();
        }
    }
    trimmed.to_string()
}

fn parse_amount(word: &str) -> Option<u32> {
    if let Ok(n) = word.parse::<u32>() {
        return (n > 0).then_some(n);
    }
    let n = match word.to_ascii_lowercase().as_str() {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        _ => return None,
    };
    Some(n)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
