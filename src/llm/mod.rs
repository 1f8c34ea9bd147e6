//! Language-model backend access.
//!
//! This module provides:
//! * [`LlmClient`]: async trait implemented by every backend.
//! * [`HttpLlmClient`]: Ollama / OpenAI-compatible REST client.
//! * [`PromptBuilder`]: classification and conversation prompts.
//! * [`ConversationContext`]: rolling (utterance, response) window.
//! * [`BackendHealth`] / [`HealthMonitor`]: shared up/down flag and the
//!   background poller that maintains it, with model discovery.
//! * [`LlmError`]: error variants for LLM operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use buddy_assistant::config::AppConfig;
//! use buddy_assistant::llm::{HttpLlmClient, LlmClient, PromptBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::from_config(&config.llm));
//!
//!     let request = PromptBuilder::new(config.llm.temperature)
//!         .classification("open calculator", None, false);
//!     let raw = client.complete(&request).await.unwrap();
//!     println!("{raw}");
//! }
//! ```

pub mod client;
pub mod context;
pub mod health;
pub mod prompt;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{CompletionRequest, HttpLlmClient, LlmClient, LlmError};
pub use context::ConversationContext;
pub use health::{select_model, BackendHealth, HealthMonitor};
pub use prompt::PromptBuilder;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------
