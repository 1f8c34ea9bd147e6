//! Intent routing.
//!
//! | Intent                       | Route                                 |
//! |------------------------------|---------------------------------------|
//! | Click / Type / Scroll / Open | [`InputControl`] on the blocking pool |
//! | Help                         | static text                           |
//! | Exit                         | farewell, `terminal = true`           |
//! | Converse                     | [`ConversationResponder`]             |
//!
//! Every branch returns exactly one [`DispatchResult`].

use std::sync::Arc;

use crate::dispatch::{
    ConversationResponder, DispatchResult, ExecutionError, InputControl, UNAVAILABLE_REPLY,
};
use crate::intent::Intent;

pub const HELP_TEXT: &str = "I can click things on screen, type text for you, scroll up or down, \
and open apps or websites. You can also just ask me a question. Say exit when you're done.";

pub const FAREWELL: &str = "Goodbye!";

pub struct Dispatcher {
    control: Arc<dyn InputControl>,
    responder: ConversationResponder,
}

impl Dispatcher {
    pub fn new(control: Arc<dyn InputControl>, responder: ConversationResponder) -> Self {
        Self { control, responder }
    }

    pub async fn dispatch(&self, intent: &Intent, context: Option<&str>) -> DispatchResult {
        match intent {
            Intent::Help => DispatchResult::ok(HELP_TEXT),
            Intent::Exit => DispatchResult::terminal(FAREWELL),
            Intent::Converse { text } => self.converse(text, context).await,
            action => self.run_input(action.clone()).await,
        }
    }

    async fn run_input(&self, intent: Intent) -> DispatchResult {
        let control = Arc::clone(&self.control);
        let tag = intent.tag();
        match tokio::task::spawn_blocking(move || control.execute(&intent)).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("dispatch: {tag} task failed: {e}");
                let error = ExecutionError::Task(e.to_string());
                DispatchResult::failed(format!("Sorry, I couldn't {tag} that."))
                    .with_data(serde_json::json!({ "intent": tag, "error": error.to_string() }))
            }
        }
    }

    async fn converse(&self, utterance: &str, context: Option<&str>) -> DispatchResult {
        match self.responder.respond(utterance, context).await {
            Ok(answer) => DispatchResult::ok(answer),
            Err(e) => {
                log::warn!("dispatch: conversation failed: {e}");
                DispatchResult::failed(UNAVAILABLE_REPLY)
                    .with_data(serde_json::json!({ "intent": "converse", "error": e.to_string() }))
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
    use crate::dispatch::testing::RecordingControl;
    use crate::intent::ScrollDirection;
    use crate::llm::testing::MockLlm;
    use crate::llm::{BackendHealth, PromptBuilder};

    fn dispatcher(control: &Arc<RecordingControl>, llm: &Arc<MockLlm>) -> Dispatcher {
        let responder = ConversationResponder::new(llm.clone(), PromptBuilder::new(0.7), BackendHealth::default());
        Dispatcher::new(control.clone(), responder)
    }

    #[tokio::test]
    async fn input_actions_go_to_input_control_verbatim() {
        let control = Arc::new(RecordingControl::new());
        let d = dispatcher(&control, &Arc::new(MockLlm::new()));
        let scroll = Intent::Scroll {
            direction: ScrollDirection::Down,
            amount: 5,
        };
        let result = d.dispatch(&scroll, None).await;
        assert!(result.success);
        assert_eq!(result.message, "Scrolling down.");
        assert_eq!(control.executed(), vec![scroll]);
    }

    #[tokio::test]
    async fn help_succeeds_without_llm() {
        let control = Arc::new(RecordingControl::new());
        let llm = Arc::new(MockLlm::new());
        let result = dispatcher(&control, &llm).dispatch(&Intent::Help, None).await;
        assert!(result.success);
        assert!(!result.message.is_empty());
        assert!(!result.terminal);
        assert_eq!(llm.calls(), 0);
        assert!(control.executed().is_empty());
    }

    #[tokio::test]
    async fn exit_is_terminal() {
        let control = Arc::new(RecordingControl::new());
        let result = dispatcher(&control, &Arc::new(MockLlm::new()))
            .dispatch(&Intent::Exit, None)
            .await;
        assert!(result.terminal);
        assert_eq!(result.message, FAREWELL);
    }

    #[tokio::test]
    async fn conversation_wraps_the_answer() {
        let control = Arc::new(RecordingControl::new());
        let llm = Arc::new(MockLlm::replying(vec![Ok("Blue light scatters more.".into())]));
        let intent = Intent::Converse {
            text: "why is the sky blue".into(),
        };
        let result = dispatcher(&control, &llm)
            .dispatch(&intent, Some("Previous conversation:\nUser: hi\nBuddy: Hello!\n"))
            .await;
        assert!(result.success);
        assert_eq!(result.message, "Blue light scatters more.");
        assert!(llm.requests()[0].prompt.contains("User: hi"));
    }

    #[tokio::test]
    async fn unreachable_conversation_is_a_spoken_failure() {
        let control = Arc::new(RecordingControl::new());
        let intent = Intent::Converse { text: "hello".into() };
        let result = dispatcher(&control, &Arc::new(MockLlm::new()))
            .dispatch(&intent, None)
            .await;
        assert!(!result.success);
        assert_eq!(result.message, UNAVAILABLE_REPLY);
    }

    #[tokio::test]
    async fn failing_control_yields_failed_result() {
        let control = Arc::new(RecordingControl::failing());
        let intent = Intent::Click {
            target: "ok".into(),
        };
        let result = dispatcher(&control, &Arc::new(MockLlm::new()))
            .dispatch(&intent, None)
            .await;
        assert!(!result.success);
        assert_eq!(control.executed().len(), 1);
    }
}
