//! Core `LlmClient` trait and the HTTP implementation.
//!
//! [`HttpLlmClient`] speaks two wire formats, selected by
//! [`LlmProvider`]:
//!
//! * **Ollama**: `POST /api/generate` (`format: "json"` for
//!   classification), `GET /api/tags` for the model list.
//! * **OpenAI-compatible**: `POST /v1/chat/completions`, `GET /v1/models`.
//!   Works with OpenAI, Groq, LM Studio, vLLM and Ollama's OpenAI mode.
//!
//! All connection details come from [`LlmConfig`]; nothing is hardcoded.

use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{LlmConfig, LlmProvider};

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the LLM backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    /// Connection refused, DNS failure, reset.
    #[error("LLM backend unreachable: {0}")]
    Unreachable(String),

    #[error("LLM request timed out")]
    Timeout,

    /// The backend answered with a non-success HTTP status.
    #[error("LLM backend returned HTTP {0}")]
    Status(u16),

    /// The HTTP body could not be parsed as the expected JSON envelope.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("no LLM backend configured")]
    Disabled,
}

impl LlmError {
    /// `true` when the backend could not be used at all, as opposed to
    /// answering with something unusable.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Unreachable(_) | Self::Timeout | Self::Status(_) | Self::Disabled
        )
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            LlmError::Status(status.as_u16())
        } else {
            LlmError::Unreachable(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// CompletionRequest
// ---------------------------------------------------------------------------

/// One prompt/answer exchange with the model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    /// Ask the backend to constrain output to a JSON object.
    pub json: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

// ---------------------------------------------------------------------------
// LlmClient trait
// ---------------------------------------------------------------------------

/// Async interface to a language-model backend.
///
/// Implementors must be `Send + Sync` so one client can be shared by the
/// classifier, the conversational responder and the health monitor behind
/// an `Arc<dyn LlmClient>`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one completion and return the raw text the model produced.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Models the backend currently serves.  Doubles as the health probe.
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;

    /// Model identifier sent with every completion.
    fn model(&self) -> String;

    /// Switch to another served model (see
    /// [`select_model`](crate::llm::select_model)).
    fn set_model(&self, _model: &str) {}
}

// ---------------------------------------------------------------------------
// HttpLlmClient
// ---------------------------------------------------------------------------

pub struct HttpLlmClient {
    client: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    api_key: Option<String>,
    model: RwLock<String>,
}

impl HttpLlmClient {
    /// Build a client from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`; a default client is used if the builder fails.
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            provider: config.provider,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: RwLock::new(config.model.clone()),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn send_json(&self, req: reqwest::RequestBuilder) -> Result<serde_json::Value, LlmError> {
        let response = self.authorize(req).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status(status.as_u16()));
        }
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))
    }

    fn ollama_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model":  self.model(),
            "system": request.system,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens
            }
        });
        if request.json {
            body["format"] = serde_json::json!("json");
        }
        body
    }

    fn chat_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model(),
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user",   "content": request.prompt }
            ],
            "stream":      false,
            "temperature": request.temperature,
            "max_tokens":  request.max_tokens
        });
        if request.json {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let text = match self.provider {
            LlmProvider::Disabled => return Err(LlmError::Disabled),
            LlmProvider::Ollama => {
                let req = self
                    .client
                    .post(self.endpoint("/api/generate"))
                    .json(&self.ollama_body(request));
                let json = self.send_json(req).await?;
                json["response"].as_str().map(str::to_string)
            }
            LlmProvider::OpenAiCompatible => {
                let req = self
                    .client
                    .post(self.endpoint("/v1/chat/completions"))
                    .json(&self.chat_body(request));
                let json = self.send_json(req).await?;
                json["choices"][0]["message"]["content"]
                    .as_str()
                    .map(str::to_string)
            }
        };

        let text = text.ok_or(LlmError::EmptyResponse)?.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let (path, list_key, name_key) = match self.provider {
            LlmProvider::Disabled => return Err(LlmError::Disabled),
            LlmProvider::Ollama => ("/api/tags", "models", "name"),
            LlmProvider::OpenAiCompatible => ("/v1/models", "data", "id"),
        };
        let json = self.send_json(self.client.get(self.endpoint(path))).await?;
        Ok(model_names(&json, list_key, name_key))
    }

    fn model(&self) -> String {
        self.model
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    fn set_model(&self, model: &str) {
        if let Ok(mut current) = self.model.write() {
            *current = model.to_string();
        }
    }
}

/// Pull `json[list_key][*][name_key]` strings out of a model listing.
fn model_names(json: &serde_json::Value, list_key: &str, name_key: &str) -> Vec<String> {
    json[list_key]
        .as_array()
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m[name_key].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: LlmProvider, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            base_url: "http://localhost:11434/".into(),
            api_key: api_key.map(str::to_string),
            ..LlmConfig::default()
        }
    }

    fn request(json: bool) -> CompletionRequest {
        CompletionRequest {
            system: "sys".into(),
            prompt: "open calculator".into(),
            json,
            temperature: 0.0,
            max_tokens: 128,
        }
    }

    #[test]
    fn empty_api_key_is_dropped() {
        let client = HttpLlmClient::from_config(&config(LlmProvider::Ollama, Some("")));
        assert!(client.api_key.is_none());
        assert_eq!(client.endpoint("/api/tags"), "http://localhost:11434/api/tags");
    }

    #[test]
    fn ollama_body_requests_json_format() {
        let client = HttpLlmClient::from_config(&config(LlmProvider::Ollama, None));
        let body = client.ollama_body(&request(true));
        assert_eq!(body["format"], "json");
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 128);

        let free = client.ollama_body(&request(false));
        assert!(free.get("format").is_none());
    }

    #[test]
    fn chat_body_carries_both_messages() {
        let client = HttpLlmClient::from_config(&config(LlmProvider::OpenAiCompatible, Some("sk-1")));
        let body = client.chat_body(&request(true));
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "open calculator");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn set_model_changes_requests() {
        let client = HttpLlmClient::from_config(&config(LlmProvider::Ollama, None));
        client.set_model("mistral:7b");
        assert_eq!(client.model(), "mistral:7b");
        assert_eq!(client.ollama_body(&request(false))["model"], "mistral:7b");
    }

    #[test]
    fn model_listing_is_parsed() {
        let tags = serde_json::json!({
            "models": [{ "name": "llama3:latest" }, { "name": "phi3" }, { "size": 1 }]
        });
        assert_eq!(model_names(&tags, "models", "name"), vec!["llama3:latest", "phi3"]);

        let openai = serde_json::json!({ "data": [{ "id": "gpt-4o-mini" }] });
        assert_eq!(model_names(&openai, "data", "id"), vec!["gpt-4o-mini"]);

        assert!(model_names(&serde_json::json!({}), "models", "name").is_empty());
    }

    #[tokio::test]
    async fn disabled_provider_never_touches_the_network() {
        let client = HttpLlmClient::from_config(&config(LlmProvider::Disabled, None));
        assert_eq!(client.complete(&request(true)).await, Err(LlmError::Disabled));
        assert_eq!(client.list_models().await, Err(LlmError::Disabled));
    }

    #[test]
    fn unreachable_classification() {
        assert!(LlmError::Timeout.is_unreachable());
        assert!(LlmError::Unreachable("refused".into()).is_unreachable());
        assert!(LlmError::Status(503).is_unreachable());
        assert!(!LlmError::Parse("eof".into()).is_unreachable());
        assert!(!LlmError::EmptyResponse.is_unreachable());
    }

    #[test]
    fn client_is_object_safe() {
        let client: Box<dyn LlmClient> =
            Box::new(HttpLlmClient::from_config(&config(LlmProvider::Ollama, None)));
        drop(client);
    }
}
