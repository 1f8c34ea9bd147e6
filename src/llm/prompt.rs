//! Prompt builder for intent classification and conversation.
//!
//! [`PromptBuilder`] produces [`CompletionRequest`]s of three kinds:
//!
//! * **classification**: asks for a single JSON object
//!   `{"intent": <tag>, "parameters": {...}}`, temperature 0;
//! * **strict classification**: the same, with a terse reformatting
//!   instruction used for the one retry after a malformed or failed answer;
//! * **conversation**: a short free-text answer for open questions.
//!
//! Prompts are deterministic: the same utterance and context always yield
//! byte-identical requests.

use crate::llm::client::CompletionRequest;

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

const CLASSIFY_INSTRUCTION: &str = "\
You are Buddy, a voice assistant that controls the user's computer and answers questions.
Classify the user's request into exactly one intent and extract its parameters.

Intents:
- click: click something on screen. parameters: {\"target\": <what to click>}
- type: type text. parameters: {\"text\": <text to type>}
- scroll: scroll the page. parameters: {\"direction\": \"up\" | \"down\", \"amount\": <integer, default 5>}
- open: open an application or website. parameters: {\"target\": <app name or web address>}
- help: the user asks what you can do. parameters: {}
- exit: the user wants to stop or quit the assistant. parameters: {}
- converse: a question or anything else. parameters: {}

Reply with ONLY a JSON object of the form {\"intent\": \"<intent>\", \"parameters\": {...}}.";

const FEW_SHOT_EXAMPLES: &str = "
Examples:
User: open calculator
{\"intent\": \"open\", \"parameters\": {\"target\": \"calculator\"}}

User: scroll down a bit
{\"intent\": \"scroll\", \"parameters\": {\"direction\": \"down\", \"amount\": 3}}

User: type hello world
{\"intent\": \"type\", \"parameters\": {\"text\": \"hello world\"}}

User: what's the capital of France
{\"intent\": \"converse\", \"parameters\": {}}
";

const STRICT_SUFFIX: &str = "
Your previous answer could not be used. Output nothing but one JSON object with the keys \"intent\" and \"parameters\". No prose, no code fences.";

const CONVERSE_INSTRUCTION: &str = "\
You are Buddy, a friendly voice assistant. Your answer will be spoken aloud.
Answer directly and concisely in under 50 words. Plain sentences only: no lists, markdown, or emoji.";

/// Token budget for a classification answer.
const CLASSIFY_MAX_TOKENS: u32 = 128;
/// Token budget for a spoken conversational answer.
const CONVERSE_MAX_TOKENS: u32 = 150;

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// # Example
/// ```rust
/// use buddy_assistant::llm::PromptBuilder;
///
/// let builder = PromptBuilder::new(0.7);
/// let req = builder.classification("open calculator", None, false);
/// assert!(req.json);
/// assert!(req.prompt.contains("open calculator"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    converse_temperature: f32,
}

impl PromptBuilder {
    pub fn new(converse_temperature: f32) -> Self {
        Self {
            converse_temperature,
        }
    }

    /// Build a classification request.  `strict` appends the reformatting
    /// instruction used on retry.
    pub fn classification(
        &self,
        utterance: &str,
        context: Option<&str>,
        strict: bool,
    ) -> CompletionRequest {
        let mut system = String::with_capacity(1024);
        system.push_str(CLASSIFY_INSTRUCTION);
        if strict {
            system.push_str(STRICT_SUFFIX);
        }

        let mut prompt = String::with_capacity(1024);
        prompt.push_str(FEW_SHOT_EXAMPLES);
        push_context(&mut prompt, context);
        prompt.push_str(&format!("\nUser: {utterance}\n"));

        CompletionRequest {
            system,
            prompt,
            json: true,
            temperature: 0.0,
            max_tokens: CLASSIFY_MAX_TOKENS,
        }
    }

    /// Build a conversational request for an open question.
    pub fn conversation(&self, utterance: &str, context: Option<&str>) -> CompletionRequest {
        let mut prompt = String::with_capacity(512);
        push_context(&mut prompt, context);
        prompt.push_str(&format!("User: {utterance}\nBuddy:"));

        CompletionRequest {
            system: CONVERSE_INSTRUCTION.to_string(),
            prompt,
            json: false,
            temperature: self.converse_temperature,
            max_tokens: CONVERSE_MAX_TOKENS,
        }
    }
}

fn push_context(prompt: &mut String, context: Option<&str>) {
    if let Some(ctx) = context {
        prompt.push('\n');
        prompt.push_str(ctx);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
