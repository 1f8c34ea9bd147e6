//! Conversational answers for open-ended questions.
//!
//! Shares the classifier's [`LlmClient`] and [`BackendHealth`]; while the
//! backend is down it fails without a request.

use std::sync::Arc;

use crate::llm::{BackendHealth, LlmClient, LlmError, PromptBuilder};

/// Spoken when no answer could be produced.
pub const UNAVAILABLE_REPLY: &str =
    "I'm having trouble connecting to my language model. I can still run commands like open, type, or scroll.";

pub struct ConversationResponder {
    client: Arc<dyn LlmClient>,
    prompts: PromptBuilder,
    health: BackendHealth,
}

impl ConversationResponder {
    pub fn new(client: Arc<dyn LlmClient>, prompts: PromptBuilder, health: BackendHealth) -> Self {
        Self {
            client,
            prompts,
            health,
        }
    }

    pub async fn respond(&self, utterance: &str, context: Option<&str>) -> Result<String, LlmError> {
        if !self.health.is_up() {
            return Err(LlmError::Unreachable("backend marked unavailable".into()));
        }
        let request = self.prompts.conversation(utterance, context);
        let raw = self.client.complete(&request).await?;
        let answer = clean_answer(&raw);
        if answer.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(answer)
    }
}

/// Drop a leading speaker label and collapse whitespace.
fn clean_answer(raw: &str) -> String {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("Buddy:")
        .or_else(|| trimmed.strip_prefix("Assistant:"))
        .unwrap_or(trimmed);
    body.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockLlm;

    fn responder(llm: &Arc<MockLlm>, health: BackendHealth) -> ConversationResponder {
        ConversationResponder::new(llm.clone(), PromptBuilder::new(0.7), health)
    }

    #[tokio::test]
    async fn answer_is_cleaned() {
        let llm = Arc::new(MockLlm::replying(vec![Ok("Buddy:  Paris is the\ncapital.".into())]));
        let answer = responder(&llm, BackendHealth::default())
            .respond("capital of France", None)
            .await;
        assert_eq!(answer.as_deref(), Ok("Paris is the capital."));
        assert!(!llm.requests()[0].json);
    }

    #[tokio::test]
    async fn down_backend_is_not_called() {
        let llm = Arc::new(MockLlm::new());
        let result = responder(&llm, BackendHealth::new(false)).respond("hi", None).await;
        assert!(matches!(result, Err(LlmError::Unreachable(_))));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn blank_answer_is_empty_response() {
        let llm = Arc::new(MockLlm::replying(vec![Ok("Buddy:".into())]));
        let result = responder(&llm, BackendHealth::default()).respond("hi", None).await;
        assert_eq!(result, Err(LlmError::EmptyResponse));
    }
}
