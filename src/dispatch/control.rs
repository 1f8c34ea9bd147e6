//! Input-control seam and the desktop implementation.
//!
//! [`InputControl::execute`] is synchronous and never panics or errors: a
//! refused or failed action comes back as a failed [`DispatchResult`].
//!
//! [`DesktopControl`] splits the work into two steps so validation can be
//! tested without touching the OS:
//!
//! ```text
//! Intent ──plan()──▶ Action ──perform()──▶ enigo / arboard / opener
//!          │ refuses empty or oversized text,
//!          │ disallowed schemes, unsafe app names
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::InputConfig;
use crate::dispatch::DispatchResult;
use crate::inject::{self, InjectError, InputDevice, OpenTarget};
use crate::intent::{Intent, ScrollDirection};

// ---------------------------------------------------------------------------
// ExecutionError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    /// Validation refused the action; nothing reached the OS.
    #[error("{0}")]
    Rejected(String),

    #[error("'{0}' is not an input action")]
    NotAnInputAction(&'static str),

    #[error("input control failed: {0}")]
    Input(String),

    /// The blocking input task panicked or was cancelled.
    #[error("input task failed: {0}")]
    Task(String),
}

impl From<InjectError> for ExecutionError {
    fn from(e: InjectError) -> Self {
        match e {
            InjectError::Rejected(reason) => Self::Rejected(reason),
            other => Self::Input(other.to_string()),
        }
    }
}

impl ExecutionError {
    /// Spoken form.
    pub fn spoken(&self, intent: &Intent) -> String {
        match self {
            Self::Rejected(reason) => format!("I can't do that: {reason}."),
            _ => format!("Sorry, I couldn't {} that.", intent.tag()),
        }
    }
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

pub trait InputControl: Send + Sync {
    fn execute(&self, intent: &Intent) -> DispatchResult;
}

/// Resolves a spoken description ("the submit button") to screen
/// coordinates.  Independent of the pipeline state.
pub trait ScreenLocator: Send + Sync {
    fn locate(&self, description: &str) -> Option<(i32, i32)>;
}

// ---------------------------------------------------------------------------
// DesktopControl
// ---------------------------------------------------------------------------

/// A validated, ready-to-perform action.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `None` clicks at the current pointer position.
    Click { at: Option<(i32, i32)> },
    Type { text: String },
    /// Wheel lines; negative scrolls up.
    Scroll { lines: i32 },
    Open(OpenTarget),
}

pub struct DesktopControl {
    config: InputConfig,
    locator: Option<Arc<dyn ScreenLocator>>,
}

impl DesktopControl {
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            locator: None,
        }
    }

    pub fn with_locator(mut self, locator: Arc<dyn ScreenLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Validate `intent` and turn it into an [`Action`].
    pub fn plan(&self, intent: &Intent) -> Result<Action, ExecutionError> {
        match intent {
            Intent::Click { target } => {
                let at = match (&self.locator, target.is_empty()) {
                    (Some(locator), false) => {
                        let found = locator.locate(target);
                        if found.is_none() {
                            log::info!("input: '{target}' not found on screen, clicking in place");
                        }
                        found
                    }
                    _ => None,
                };
                Ok(Action::Click { at })
            }
            Intent::Type { text } => {
                if text.trim().is_empty() {
                    return Err(ExecutionError::Rejected("there is nothing to type".into()));
                }
                let len = text.chars().count();
                if len > self.config.max_type_chars {
                    return Err(ExecutionError::Rejected(format!(
                        "{len} characters is more than I type at once"
                    )));
                }
                Ok(Action::Type { text: text.clone() })
            }
            Intent::Scroll { direction, amount } => {
                let max = self.config.max_scroll_amount.max(1);
                let amount = if *amount == 0 {
                    self.config.scroll_amount
                } else {
                    (*amount).min(max)
                };
                let lines = amount.min(i32::MAX as u32) as i32;
                Ok(Action::Scroll {
                    lines: match direction {
                        ScrollDirection::Up => -lines,
                        ScrollDirection::Down => lines,
                    },
                })
            }
            Intent::Open { target } => {
                Ok(Action::Open(OpenTarget::resolve(target, &self.config.allowed_open_schemes)?))
            }
            other => Err(ExecutionError::NotAnInputAction(other.tag())),
        }
    }

    /// Carry out a planned action.  Blocks.
    pub fn perform(&self, action: &Action) -> Result<(), ExecutionError> {
        let delay = Duration::from_millis(self.config.type_delay_ms);
        match action {
            Action::Click { at } => InputDevice::new()?.click(*at)?,
            Action::Type { text } => inject::enter_text(text, delay)?,
            Action::Scroll { lines } => InputDevice::new()?.scroll(*lines)?,
            Action::Open(target) => inject::open(target)?,
        }
        Ok(())
    }
}

impl InputControl for DesktopControl {
    fn execute(&self, intent: &Intent) -> DispatchResult {
        let outcome = self.plan(intent).and_then(|action| {
            log::debug!("input: performing {action:?}");
            self.perform(&action)
        });
        match outcome {
            Ok(()) => DispatchResult::ok(intent.confirmation()).with_data(serde_json::json!({
                "intent": intent.tag(),
                "parameters": intent.parameters(),
            })),
            Err(e) => {
                log::warn!("input: {intent} failed: {e}");
                DispatchResult::failed(e.spoken(intent)).with_data(serde_json::json!({
                    "intent": intent.tag(),
                    "error": e.to_string(),
                }))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLocator;

    impl ScreenLocator for FixedLocator {
        fn locate(&self, description: &str) -> Option<(i32, i32)> {
            (description == "submit button").then_some((640, 480))
        }
    }

    fn control() -> DesktopControl {
        DesktopControl::new(InputConfig::default())
    }

    #[test]
    fn click_uses_locator_when_available() {
        let control = control().with_locator(Arc::new(FixedLocator));
        let click = |t: &str| Intent::Click { target: t.into() };
        assert_eq!(
            control.plan(&click("submit button")),
            Ok(Action::Click { at: Some((640, 480)) })
        );
        assert_eq!(control.plan(&click("cancel")), Ok(Action::Click { at: None }));
        assert_eq!(control.plan(&click("")), Ok(Action::Click { at: None }));
    }

    #[test]
    fn scroll_is_signed_and_clamped() {
        let c = control();
        let scroll = |direction, amount| Intent::Scroll { direction, amount };
        assert_eq!(
            c.plan(&scroll(ScrollDirection::Up, 3)),
            Ok(Action::Scroll { lines: -3 })
        );
        assert_eq!(
            c.plan(&scroll(ScrollDirection::Down, 10_000)),
            Ok(Action::Scroll { lines: 50 })
        );
        assert_eq!(
            c.plan(&scroll(ScrollDirection::Down, 0)),
            Ok(Action::Scroll { lines: 5 })
        );
    }

    #[test]
    fn type_payload_limits() {
        let c = control();
        assert!(matches!(
            c.plan(&Intent::Type { text: "   ".into() }),
            Err(ExecutionError::Rejected(_))
        ));
        assert!(matches!(
            c.plan(&Intent::Type { text: "x".repeat(501) }),
            Err(ExecutionError::Rejected(_))
        ));
        assert_eq!(
            c.plan(&Intent::Type { text: "hello".into() }),
            Ok(Action::Type { text: "hello".into() })
        );
    }

    #[test]
    fn unsafe_open_is_a_failed_result() {
        let c = control();
        let intent = Intent::Open {
            target: "file:///etc/passwd".into(),
        };
        let result = c.execute(&intent);
        assert!(!result.success);
        assert!(result.message.starts_with("I can't do that"));
        assert!(!result.terminal);
    }

    #[test]
    fn system_intents_are_not_input_actions() {
        assert_eq!(
            control().plan(&Intent::Help),
            Err(ExecutionError::NotAnInputAction("help"))
        );
        let result = control().execute(&Intent::Exit);
        assert!(!result.success);
    }
}
