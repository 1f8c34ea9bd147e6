//! Intent classification over an ordered strategy chain.
//!
//! ```text
//!            ┌───────┐  ok
//! utterance ─▶  Llm  ├────────────────────────────────▶ Intent
//!            └───┬───┘
//!                │ any failure
//!            ┌───▼───────┐  ok
//!            │ LlmStrict ├────────────────────────────▶ Intent
//!            └───┬───────┘
//!                │ unreachable          │ malformed
//!            ┌───▼───┐  match           │
//!            │ Rules ├──────────────────┼────────────▶ Intent
//!            └───┬───┘                  │
//!                │ no match             │
//!            ┌───▼──────┐◀──────────────┘
//!            │ Converse ├─────────────────────────────▶ Converse { utterance }
//!            └──────────┘
//! ```
//!
//! While [`BackendHealth`] reports the backend down, both LLM steps fail
//! immediately with [`ClassificationError::LlmUnreachable`] and no request
//! is sent.  A chain in which both LLM requests went out and the last one
//! was unreachable marks the backend down; the health monitor brings it
//! back.

use std::fmt;
use std::sync::Arc;

use crate::intent::parse::parse_intent;
use crate::intent::rules::RuleMatcher;
use crate::intent::types::{ClassificationError, Intent};
use crate::llm::{BackendHealth, LlmClient, LlmError, PromptBuilder};

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Standard classification prompt.
    Llm,
    /// One retry with the reformatting instruction; only after a failure.
    LlmStrict,
    /// Keyword rules; only when the last failure was "unreachable".
    Rules,
    /// Always matches.
    Converse,
}

impl Strategy {
    pub const DEFAULT_CHAIN: [Strategy; 4] = [
        Strategy::Llm,
        Strategy::LlmStrict,
        Strategy::Rules,
        Strategy::Converse,
    ];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Llm => "llm",
            Self::LlmStrict => "llm_strict",
            Self::Rules => "rules",
            Self::Converse => "converse",
        };
        f.write_str(s)
    }
}

/// Outcome of a successful chain run.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    /// The step that produced the intent.
    pub strategy: Strategy,
    /// The language model could not be reached during this run.
    pub degraded: bool,
}

// ---------------------------------------------------------------------------
// IntentClassifier
// ---------------------------------------------------------------------------

pub struct IntentClassifier {
    client: Arc<dyn LlmClient>,
    prompts: PromptBuilder,
    rules: RuleMatcher,
    health: BackendHealth,
    strategies: Vec<Strategy>,
}

impl IntentClassifier {
    pub fn new(client: Arc<dyn LlmClient>, prompts: PromptBuilder, health: BackendHealth) -> Self {
        Self {
            client,
            prompts,
            rules: RuleMatcher::new(),
            health,
            strategies: Strategy::DEFAULT_CHAIN.to_vec(),
        }
    }

    /// Replace the chain.  Without a trailing [`Strategy::Converse`] the
    /// chain can end in an error.
    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn health(&self) -> &BackendHealth {
        &self.health
    }

    pub async fn classify(
        &self,
        utterance: &str,
        context: Option<&str>,
    ) -> Result<Intent, ClassificationError> {
        self.classify_detailed(utterance, context)
            .await
            .map(|c| c.intent)
    }

    /// Run the chain and report which step produced the intent.
    pub async fn classify_detailed(
        &self,
        utterance: &str,
        context: Option<&str>,
    ) -> Result<Classification, ClassificationError> {
        let mut last_error: Option<ClassificationError> = None;
        let mut sent = 0_u32;

        for &strategy in &self.strategies {
            let outcome = match strategy {
                Strategy::Llm => Some(self.ask(utterance, context, false, &mut sent).await),
                Strategy::LlmStrict if last_error.is_some() => {
                    Some(self.ask(utterance, context, true, &mut sent).await)
                }
                Strategy::LlmStrict => None,
                Strategy::Rules if last_error.as_ref().is_some_and(|e| e.is_unreachable()) => {
                    self.note_unreachable(sent);
                    self.rules.match_intent(utterance).map(Ok)
                }
                Strategy::Rules => None,
                Strategy::Converse => {
                    if last_error.as_ref().is_some_and(|e| e.is_unreachable()) {
                        self.note_unreachable(sent);
                    }
                    Some(Ok(Intent::Converse {
                        text: utterance.to_string(),
                    }))
                }
            };

            match outcome {
                Some(Ok(intent)) => {
                    let degraded = last_error.as_ref().is_some_and(|e| e.is_unreachable());
                    log::info!("intent: {intent} via {strategy}");
                    return Ok(Classification {
                        intent,
                        strategy,
                        degraded,
                    });
                }
                Some(Err(e)) => {
                    log::debug!("intent: {strategy} failed: {e}");
                    last_error = Some(e);
                }
                None => {}
            }
        }

        let error = last_error.unwrap_or_else(|| {
            ClassificationError::MalformedResponse("no classification strategy matched".into())
        });
        if error.is_unreachable() {
            self.note_unreachable(sent);
        }
        log::warn!("intent: classification failed: {error}");
        Err(error)
    }

    /// One LLM classification attempt.  `sent` counts requests that
    /// actually went out.
    async fn ask(
        &self,
        utterance: &str,
        context: Option<&str>,
        strict: bool,
        sent: &mut u32,
    ) -> Result<Intent, ClassificationError> {
        if !self.health.is_up() {
            return Err(ClassificationError::LlmUnreachable(
                "backend marked unavailable".into(),
            ));
        }
        let request = self.prompts.classification(utterance, context, strict);
        *sent += 1;
        let raw = self.client.complete(&request).await.map_err(to_classification)?;
        log::debug!("intent: raw classification {raw:?}");
        parse_intent(&raw, utterance)
    }

    fn note_unreachable(&self, sent: u32) {
        if sent >= 2 && self.health.mark_down() {
            log::warn!("intent: language model unreachable, switching to rule-based matching");
        }
    }
}

fn to_classification(e: LlmError) -> ClassificationError {
    if e.is_unreachable() {
        ClassificationError::LlmUnreachable(e.to_string())
    } else {
        ClassificationError::MalformedResponse(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::ScrollDirection;
    use crate::llm::testing::MockLlm;

    fn classifier(llm: &Arc<MockLlm>) -> IntentClassifier {
        IntentClassifier::new(llm.clone(), PromptBuilder::new(0.7), BackendHealth::default())
    }

    fn json(intent: &str, params: &str) -> Result<String, LlmError> {
        Ok(format!(r#"{{"intent": "{intent}", "parameters": {params}}}"#))
    }

    #[tokio::test]
    async fn first_answer_wins() {
        let llm = Arc::new(MockLlm::replying(vec![json("open", r#"{"target": "calculator"}"#)]));
        let c = classifier(&llm);
        let result = c.classify_detailed("open calculator", None).await.unwrap();
        assert_eq!(
            result.intent,
            Intent::Open {
                target: "calculator".into()
            }
        );
        assert_eq!(result.strategy, Strategy::Llm);
        assert!(!result.degraded);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_answer_is_retried_strictly() {
        let llm = Arc::new(MockLlm::replying(vec![
            Ok("You want to scroll!".into()),
            json("scroll", r#"{"direction": "up"}"#),
        ]));
        let c = classifier(&llm);
        let result = c.classify_detailed("scroll up", None).await.unwrap();
        assert_eq!(result.strategy, Strategy::LlmStrict);
        let requests = llm.requests();
        assert!(!requests[0].system.contains("No prose"));
        assert!(requests[1].system.contains("No prose"));
    }

    #[tokio::test]
    async fn malformed_twice_becomes_conversation_without_rules() {
        let llm = Arc::new(MockLlm::replying(vec![Ok("nope".into()), Ok("still nope".into())]));
        let c = classifier(&llm);
        let result = c.classify_detailed("scroll down", None).await.unwrap();
        assert_eq!(
            result.intent,
            Intent::Converse {
                text: "scroll down".into()
            }
        );
        assert_eq!(result.strategy, Strategy::Converse);
        assert!(!result.degraded);
        assert!(c.health().is_up());
    }

    #[tokio::test]
    async fn timeout_retry_then_rules() {
        let llm = Arc::new(MockLlm::replying(vec![Err(LlmError::Timeout), Err(LlmError::Timeout)]));
        let c = classifier(&llm);
        let result = c.classify_detailed("scroll down", None).await.unwrap();
        assert_eq!(
            result.intent,
            Intent::Scroll {
                direction: ScrollDirection::Down,
                amount: 5
            }
        );
        assert_eq!(result.strategy, Strategy::Rules);
        assert!(result.degraded);
        assert_eq!(llm.calls(), 2);
        assert!(!c.health().is_up());
    }

    #[tokio::test]
    async fn exit_while_unreachable() {
        let llm = Arc::new(MockLlm::new());
        let c = IntentClassifier::new(llm.clone(), PromptBuilder::new(0.7), BackendHealth::new(false));
        assert_eq!(c.classify("exit", None).await, Ok(Intent::Exit));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn down_backend_fails_fast_until_marked_up() {
        let llm = Arc::new(MockLlm::new());
        let c = classifier(&llm);
        c.classify("open mail", None).await.unwrap();
        assert_eq!(llm.calls(), 2);
        assert!(!c.health().is_up());

        let result = c.classify_detailed("tell me a joke", None).await.unwrap();
        assert_eq!(result.strategy, Strategy::Converse);
        assert!(result.degraded);
        assert_eq!(llm.calls(), 2);

        c.health().mark_up();
        llm.push(json("help", "{}"));
        assert_eq!(c.classify("help", None).await, Ok(Intent::Help));
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn context_reaches_the_prompt() {
        let llm = Arc::new(MockLlm::replying(vec![json("converse", "{}")]));
        let c = classifier(&llm);
        c.classify("and tomorrow?", Some("Previous conversation:\nUser: weather today\n"))
            .await
            .unwrap();
        assert!(llm.requests()[0].prompt.contains("User: weather today"));
    }

    #[tokio::test]
    async fn chain_without_converse_can_fail() {
        let llm = Arc::new(MockLlm::new());
        let c = classifier(&llm).with_strategies(vec![Strategy::Llm, Strategy::Rules]);
        let result = c.classify("what's the weather", None).await;
        assert!(matches!(result, Err(ClassificationError::LlmUnreachable(_))));

        let llm = Arc::new(MockLlm::replying(vec![Ok("garbage".into())]));
        let c = classifier(&llm).with_strategies(vec![Strategy::Llm]);
        assert!(matches!(
            c.classify("x", None).await,
            Err(ClassificationError::MalformedResponse(_))
        ));
    }
}
