//! AI request and response types.
//!
//! Content blocks serialize directly to the Messages API wire shape.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Inline base64 payload for image and document blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Base64Source {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

impl Base64Source {
    fn encode(media_type: &str, bytes: &[u8]) -> Self {
        Self {
            kind: "base64".to_string(),
            media_type: media_type.to_string(),
            data: BASE64.encode(bytes),
        }
    }
}

/// One piece of a multimodal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: Base64Source },
    Document { source: Base64Source },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn image(media_type: &str, bytes: &[u8]) -> Self {
        ContentBlock::Image {
            source: Base64Source::encode(media_type, bytes),
        }
    }

    pub fn pdf(bytes: &[u8]) -> Self {
        ContentBlock::Document {
            source: Base64Source::encode("application/pdf", bytes),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// User message with attachments placed before the instruction text.
    pub fn user_with_attachments(text: impl Into<String>, attachments: Vec<ContentBlock>) -> Self {
        let mut content = attachments;
        content.push(ContentBlock::text(text));
        Self {
            role: Role::User,
            content,
        }
    }
}

/// Request for a completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// All text content, system prompt included, for matching and logging.
    pub fn text(&self) -> String {
        self.system
            .iter()
            .map(String::as_str)
            .chain(
                self.messages
                    .iter()
                    .flat_map(|m| m.content.iter().filter_map(ContentBlock::as_text)),
            )
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Response from a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    /// The generated text.
    pub content: String,
    pub usage: Usage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_blocks_wire_shape() {
        let message = ChatMessage::user_with_attachments(
            "Extract the recipe",
            vec![ContentBlock::image("image/png", b"png"), ContentBlock::pdf(b"%PDF")],
        );
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    {"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": "cG5n"}},
                    {"type": "document", "source": {"type": "base64", "media_type": "application/pdf", "data": "JVBERg=="}},
                    {"type": "text", "text": "Extract the recipe"}
                ]
            })
        );
    }

    #[test]
    fn test_request_text_collects_system_and_text_blocks() {
        let request = ChatRequest {
            system: Some("sys".to_string()),
            messages: vec![ChatMessage::user_with_attachments(
                "body",
                vec![ContentBlock::image("image/jpeg", b"x")],
            )],
            ..Default::default()
        };
        assert_eq!(request.text(), "sys\nbody");
    }
}
