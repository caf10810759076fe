//! AI structured extraction.
//!
//! Requests go through the [`AiClient`] trait. [`AnthropicClient`] talks to
//! the Messages API; [`FakeAiClient`] replays canned responses in tests.
//!
//! # Environment Variables
//!
//! - `ANTHROPIC_API_KEY`: API key (required)
//! - `PANTRY_AI_MODEL`: model name (default: `claude-sonnet-4-20250514`)
//! - `PANTRY_AI_BASE_URL`: API base URL
//! - `PANTRY_AI_MAX_TOKENS`: default response token limit

mod client;
mod config;
mod fake;
pub mod prompts;
mod structured;
mod tasks;
mod types;

pub use client::{AiClient, AiError, AnthropicClient};
pub use config::{AiConfig, ConfigError, DEFAULT_MODEL};
pub use fake::FakeAiClient;
pub use structured::{parse_structured, strip_code_fence, Validate};
pub use tasks::{
    extract_from_documents, extract_from_video, format_text, parse_dump, AiRecipe, FormatKind,
};
pub use types::{Base64Source, ChatMessage, ChatRequest, ChatResponse, ContentBlock, Role, Usage};
