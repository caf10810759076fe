//! Fake AI client for testing.
//!
//! Returns canned responses chosen by substring match against the task
//! name and prompt text, so tests run without network access or API costs.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError, RwLock};

use super::client::{AiClient, AiError};
use super::types::{ChatRequest, ChatResponse, Usage};

#[derive(Debug, Clone)]
enum FakeReply {
    Text(String),
    Unavailable(String),
}

/// A fake AI client for testing.
///
/// Patterns are checked case-insensitively in registration order; the
/// first match wins. Every request is recorded.
#[derive(Debug, Default)]
pub struct FakeAiClient {
    replies: RwLock<Vec<(String, FakeReply)>>,
    default_reply: Option<String>,
    requests: Mutex<Vec<(String, ChatRequest)>>,
}

impl FakeAiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client that answers prompts containing `pattern`.
    pub fn with_response(pattern: &str, response: &str) -> Self {
        Self::new().and_response(pattern, response)
    }

    /// Add a response for prompts containing `pattern`.
    pub fn and_response(self, pattern: &str, response: &str) -> Self {
        self.add_reply(pattern, FakeReply::Text(response.to_string()));
        self
    }

    /// Fail prompts containing `pattern` with an upstream error.
    pub fn and_unavailable(self, pattern: &str, detail: &str) -> Self {
        self.add_reply(pattern, FakeReply::Unavailable(detail.to_string()));
        self
    }

    /// Set the response when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_reply = Some(response.to_string());
        self
    }

    /// Requests seen so far as `(task, request)` pairs.
    pub fn requests(&self) -> Vec<(String, ChatRequest)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn add_reply(&self, pattern: &str, reply: FakeReply) {
        self.replies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pattern.to_lowercase(), reply));
    }
}

#[async_trait]
impl AiClient for FakeAiClient {
    async fn complete(&self, task: &str, request: ChatRequest) -> Result<ChatResponse, AiError> {
        let haystack = format!("{task}\n{}", request.text()).to_lowercase();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((task.to_string(), request));

        let reply = self
            .replies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(pattern, _)| haystack.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());

        let content = match reply {
            Some(FakeReply::Text(text)) => text,
            Some(FakeReply::Unavailable(detail)) => return Err(AiError::Unavailable { detail }),
            None => match &self.default_reply {
                Some(text) => text.clone(),
                None => {
                    return Err(AiError::Unavailable {
                        detail: format!("FakeAiClient: no response configured for task {task}"),
                    })
                }
            },
        };

        Ok(ChatResponse {
            content,
            usage: Usage::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::ChatMessage;

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user(text)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fake_client_matching() {
        let client = FakeAiClient::with_response("hello", "world");
        let result = client.complete("t", request("Say HELLO to the user")).await.unwrap();
        assert_eq!(result.content, "world");
    }

    #[tokio::test]
    async fn test_fake_client_matches_task_name() {
        let client = FakeAiClient::with_response("video_extract", "{}");
        assert!(client.complete("video_extract", request("x")).await.is_ok());
    }

    #[tokio::test]
    async fn test_fake_client_first_registration_wins() {
        let client = FakeAiClient::with_response("recipe", "first").and_response("recipe text", "second");
        let result = client.complete("t", request("recipe text")).await.unwrap();
        assert_eq!(result.content, "first");
    }

    #[tokio::test]
    async fn test_fake_client_no_match_and_default() {
        let client = FakeAiClient::new();
        assert!(client.complete("t", request("random")).await.is_err());

        let client = FakeAiClient::new().with_default_response("default");
        assert_eq!(client.complete("t", request("random")).await.unwrap().content, "default");
    }

    #[tokio::test]
    async fn test_fake_client_unavailable_and_recording() {
        let client = FakeAiClient::new().and_unavailable("soup", "529 overloaded");
        let err = client.complete("parse_dump", request("soup")).await.unwrap_err();
        assert!(matches!(err, AiError::Unavailable { .. }));
        assert_eq!(client.requests()[0].0, "parse_dump");
    }
}
