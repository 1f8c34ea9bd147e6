//! Mapping a model's classification answer onto an [`Intent`].
//!
//! The expected shape is
//!
//! ```text
//! {"intent": "<tag>", "parameters": {...}}
//! ```
//!
//! Small models wrap it in code fences or surround it with prose, so the
//! first balanced `{...}` block is extracted before parsing.  Parameter names
//! accept a few common aliases (`content` for `text`, `app` / `url` / `name`
//! for `target`) and `amount` may be a number or a numeric string.

use serde_json::Value;

use crate::intent::types::{ClassificationError, Intent, ScrollDirection, DEFAULT_SCROLL_AMOUNT};

/// Tags the model uses for open-ended chat.
const CONVERSE_TAGS: &[&str] = &["converse", "conversation", "question", "chat", "answer"];

/// Parse a raw model answer for `utterance`.
pub fn parse_intent(raw: &str, utterance: &str) -> Result<Intent, ClassificationError> {
    let object = extract_object(raw)
        .ok_or_else(|| malformed(format!("no JSON object in {:?}", truncate(raw))))?;
    let value: Value =
        serde_json::from_str(object).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    let tag = value["intent"]
        .as_str()
        .map(|t| t.trim().to_ascii_lowercase())
        .ok_or_else(|| malformed("missing \"intent\"".into()))?;
    let params = &value["parameters"];

    match tag.as_str() {
        "click" => Ok(Intent::Click {
            target: string_param(params, &["target", "name", "element"]).unwrap_or_default(),
        }),
        "type" => string_param(params, &["text", "content"])
            .map(|text| Intent::Type { text })
            .ok_or_else(|| malformed("type without text".into())),
        "scroll" => {
            let direction = match params["direction"].as_str() {
                Some(d) => ScrollDirection::parse(d)
                    .ok_or_else(|| malformed(format!("bad scroll direction {d:?}")))?,
                None => ScrollDirection::Down,
            };
            Ok(Intent::Scroll {
                direction,
                amount: amount_param(&params["amount"]),
            })
        }
        "open" => string_param(params, &["target", "app", "url", "name"])
            .map(|target| Intent::Open { target })
            .ok_or_else(|| malformed("open without target".into())),
        "help" => Ok(Intent::Help),
        "exit" | "quit" => Ok(Intent::Exit),
        t if CONVERSE_TAGS.contains(&t) => Ok(Intent::Converse {
            text: utterance.to_string(),
        }),
        other => Err(malformed(format!("unknown intent {other:?}"))),
    }
}

/// First balanced `{...}` block in `raw`, ignoring braces inside strings.
pub fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn string_param(params: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| params[*k].as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn amount_param(value: &Value) -> u32 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().map(|f| f.round() as i64),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n > 0 => n.min(u32::MAX as i64) as u32,
        _ => DEFAULT_SCROLL_AMOUNT,
    }
}

fn malformed(reason: String) -> ClassificationError {
    ClassificationError::MalformedResponse(reason)
}

fn truncate(s: &str) -> String {
    s.chars().take(80).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object() {
        let intent =
            parse_intent(r#"{"intent": "open", "parameters": {"target": "calculator"}}"#, "x").unwrap();
        assert_eq!(
            intent,
            Intent::Open {
                target: "calculator".into()
            }
        );
    }

    #[test]
    fn fenced_and_chatty_answers() {
        let raw = "Sure! Here you go:\n```json\n{\"intent\": \"scroll\", \"parameters\": {\"direction\": \"Up\", \"amount\": \"3\"}}\n```";
        assert_eq!(
            parse_intent(raw, "x").unwrap(),
            Intent::Scroll {
                direction: ScrollDirection::Up,
                amount: 3
            }
        );
    }

    #[test]
    fn parameter_aliases() {
        let raw = r#"{"intent": "type", "parameters": {"content": "hello {world}"}}"#;
        assert_eq!(
            parse_intent(raw, "x").unwrap(),
            Intent::Type {
                text: "hello {world}".into()
            }
        );
        let raw = r#"{"intent": "open", "parameters": {"url": "github.com"}}"#;
        assert_eq!(
            parse_intent(raw, "x").unwrap(),
            Intent::Open {
                target: "github.com".into()
            }
        );
    }

    #[test]
    fn scroll_defaults() {
        let raw = r#"{"intent": "scroll", "parameters": {}}"#;
        assert_eq!(
            parse_intent(raw, "x").unwrap(),
            Intent::Scroll {
                direction: ScrollDirection::Down,
                amount: DEFAULT_SCROLL_AMOUNT
            }
        );
        let raw = r#"{"intent": "scroll", "parameters": {"direction": "down", "amount": 0}}"#;
        assert!(matches!(
            parse_intent(raw, "x").unwrap(),
            Intent::Scroll { amount: 5, .. }
        ));
    }

    #[test]
    fn conversation_tags_carry_the_utterance() {
        for tag in ["converse", "conversation", "Question"] {
            let raw = format!(r#"{{"intent": "{tag}", "parameters": {{}}}}"#);
            assert_eq!(
                parse_intent(&raw, "why is the sky blue").unwrap(),
                Intent::Converse {
                    text: "why is the sky blue".into()
                }
            );
        }
    }

    #[test]
    fn click_without_target_is_allowed() {
        let raw = r#"{"intent": "click"}"#;
        assert_eq!(
            parse_intent(raw, "click").unwrap(),
            Intent::Click {
                target: String::new()
            }
        );
    }

    #[test]
    fn malformed_answers() {
        for raw in [
            "I think you want to open something",
            r#"{"intent": "dance", "parameters": {}}"#,
            r#"{"parameters": {}}"#,
            r#"{"intent": "type", "parameters": {"text": "  "}}"#,
            r#"{"intent": "open", "parameters": {}}"#,
            r#"{"intent": "scroll", "parameters": {"direction": "sideways"}}"#,
            r#"{"intent": "open", "parameters": {"#,
        ] {
            assert!(
                matches!(parse_intent(raw, "x"), Err(ClassificationError::MalformedResponse(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn extract_ignores_braces_in_strings() {
        let raw = r#"noise {"a": "}{", "b": {"c": 1}} trailing }"#;
        assert_eq!(extract_object(raw), Some(r#"{"a": "}{", "b": {"c": 1}}"#));
        assert_eq!(extract_object("{ unclosed"), None);
    }
}
