//! The processing line: classification and dispatch, one utterance at a time.
//!
//! Requests arrive in utterance order and are answered in the same order,
//! so replies keep their sequence numbers monotonic.  The processor owns the
//! conversation window; every finished exchange is appended to it.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{DispatchResult, Dispatcher};
use crate::intent::{Classification, IntentClassifier};
use crate::llm::ConversationContext;
use crate::pipeline::{PipelineMessage, ProcessRequest};

/// Spoken when a custom chain ends without an intent.
pub const UNCLASSIFIED_REPLY: &str = "Sorry, I couldn't work out what you meant.";

pub struct Processor {
    classifier: IntentClassifier,
    dispatcher: Dispatcher,
    context: ConversationContext,
}

impl Processor {
    pub fn new(
        classifier: IntentClassifier,
        dispatcher: Dispatcher,
        context: ConversationContext,
    ) -> Self {
        Self {
            classifier,
            dispatcher,
            context,
        }
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// Classify and dispatch one utterance, then remember the exchange.
    ///
    /// `on_classified` sees the intent before it is dispatched.
    async fn process(
        &mut self,
        text: &str,
        on_classified: impl FnOnce(Classification),
    ) -> DispatchResult {
        let context = self.context.render();
        let result = match self.classify(text, context.as_deref()).await {
            Some(classification) => {
                let intent = classification.intent.clone();
                on_classified(classification);
                self.dispatcher.dispatch(&intent, context.as_deref()).await
            }
            None => DispatchResult::failed(UNCLASSIFIED_REPLY),
        };
        self.context.push(text, &result.message);
        result
    }

    async fn classify(&self, text: &str, context: Option<&str>) -> Option<Classification> {
        match self.classifier.classify_detailed(text, context).await {
            Ok(c) => Some(c),
            Err(e) => {
                log::warn!("processor: no intent for {text:?}: {e}");
                None
            }
        }
    }

    /// Serve requests until `cancel` fires or the request channel closes.
    ///
    /// Each request produces an optional [`PipelineMessage::Classified`]
    /// followed by exactly one [`PipelineMessage::Dispatched`].
    pub async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<ProcessRequest>,
        bus: mpsc::UnboundedSender<PipelineMessage>,
        cancel: CancellationToken,
    ) {
        loop {
            let request = tokio::select! {
                _ = cancel.cancelled() => break,
                request = requests.recv() => match request {
                    Some(r) => r,
                    None => break,
                },
            };
            let seq = request.seq;
            let notify = |classification: Classification| {
                let _ = bus.send(PipelineMessage::Classified {
                    seq,
                    classification,
                });
            };
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                r = self.process(&request.text, notify) => r,
            };

            if bus.send(PipelineMessage::Dispatched { seq, result }).is_err() {
                break;
            }
        }
        log::debug!("processor: line stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
