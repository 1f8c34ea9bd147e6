//! Executing classified intents.
//!
//! * [`Dispatcher`]: routes an [`Intent`](crate::intent::Intent) and
//!   always yields one [`DispatchResult`].
//! * [`InputControl`] / [`DesktopControl`]: validated desktop actions.
//! * [`ScreenLocator`]: optional target → coordinates lookup for Click.
//! * [`ConversationResponder`]: LLM answers for open questions.

pub mod control;
pub mod dispatcher;
pub mod responder;
pub mod result;

pub use control::{Action, DesktopControl, ExecutionError, InputControl, ScreenLocator};
pub use dispatcher::{Dispatcher, FAREWELL, HELP_TEXT};
pub use responder::{ConversationResponder, UNAVAILABLE_REPLY};
pub use result::DispatchResult;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{DispatchResult, InputControl};
    use crate::intent::Intent;

    /// Records every intent; succeeds with the intent's confirmation unless
    /// built with [`failing`](Self::failing).
    pub(crate) struct RecordingControl {
        executed: Mutex<Vec<Intent>>,
        fail: bool,
    }

    impl RecordingControl {
        pub(crate) fn new() -> Self {
            Self {
                executed: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        pub(crate) fn executed(&self) -> Vec<Intent> {
            self.executed.lock().unwrap().clone()
        }
    }

    impl InputControl for RecordingControl {
        fn execute(&self, intent: &Intent) -> DispatchResult {
            self.executed.lock().unwrap().push(intent.clone());
            if self.fail {
                DispatchResult::failed("Sorry, that didn't work.")
            } else {
                DispatchResult::ok(intent.confirmation())
            }
        }
    }
}
