//! The single outcome every dispatched intent produces.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    pub success: bool,
    /// Spoken back to the user.
    pub message: String,
    /// Structured details for the UI log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Set only by Exit: the pipeline shuts down after speaking `message`.
    pub terminal: bool,
}

impl DispatchResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            terminal: false,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            terminal: false,
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            terminal: true,
            ..Self::ok(message)
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert!(DispatchResult::ok("done").success);
        assert!(!DispatchResult::failed("nope").success);
        let bye = DispatchResult::terminal("Goodbye!");
        assert!(bye.success && bye.terminal);
    }

    #[test]
    fn serializes_for_the_log() {
        let json = serde_json::to_value(DispatchResult::ok("Opening mail.")).unwrap();
        assert_eq!(json["message"], "Opening mail.");
        assert!(json.get("data").is_none());

        let with = DispatchResult::ok("x").with_data(serde_json::json!({ "k": 1 }));
        assert_eq!(serde_json::to_value(with).unwrap()["data"]["k"], 1);
    }
}
