//! The four AI extraction tasks.
//!
//! Each task renders its prompt, sends it through an [`AiClient`] and parses
//! the reply with [`parse_structured`]. Callers get typed values back; the
//! orchestrator turns them into [`ExtractedRecipe`]s.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::client::{AiClient, AiError};
use super::prompts::{
    render_document_extract_prompt, render_format_text_prompt, render_parse_dump_prompt,
    render_video_extract_prompt, DOCUMENT_EXTRACT_PROMPT_NAME, FORMAT_TEXT_PROMPT_NAME,
    PARSE_DUMP_PROMPT_NAME, VIDEO_EXTRACT_PROMPT_NAME,
};
use super::structured::{parse_structured, Validate};
use super::types::{ChatMessage, ChatRequest, ContentBlock};
use crate::normalize::{normalize_time_text, parse_servings};
use crate::types::ExtractedRecipe;

const RECIPE_MAX_TOKENS: u32 = 4096;
const FORMAT_MAX_TOKENS: u32 = 2048;
const TEMPERATURE: f32 = 0.1;

/// A recipe as the model returns it, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiRecipe {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lines")]
    pub ingredients: Vec<String>,
    #[serde(default, deserialize_with = "lines")]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub servings: Option<Value>,
    #[serde(default)]
    pub prep_time: Option<Value>,
    #[serde(default)]
    pub cook_time: Option<Value>,
    #[serde(default)]
    pub total_time: Option<Value>,
    #[serde(default, alias = "description")]
    pub notes: Option<String>,
}

impl Validate for AiRecipe {
    fn validate(&self) -> Result<(), AiError> {
        let has_content = |items: &[String]| items.iter().any(|s| !s.trim().is_empty());
        if has_content(&self.ingredients) || has_content(&self.instructions) {
            Ok(())
        } else {
            Err(AiError::EmptyResult)
        }
    }
}

impl AiRecipe {
    /// Normalize into the canonical record. The result still needs
    /// [`ExtractedRecipe::finalize`].
    pub fn into_recipe(self, source_url: &str) -> ExtractedRecipe {
        let mut recipe = ExtractedRecipe::new(source_url);
        recipe.title = self.title.unwrap_or_default();
        recipe.ingredients = self.ingredients;
        recipe.instructions = self.instructions;
        recipe.servings = self.servings.as_ref().and_then(parse_servings);
        recipe.prep_time = time_value(self.prep_time);
        recipe.cook_time = time_value(self.cook_time);
        recipe.total_time = time_value(self.total_time);
        recipe.notes = self.notes;
        recipe
    }
}

/// Models answer times as "20 minutes", "PT20M" or a bare number of minutes.
fn time_value(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => normalize_time_text(&s),
        Value::Number(n) => n
            .as_u64()
            .filter(|m| *m > 0)
            .and_then(|m| normalize_time_text(&format!("{m} min"))),
        _ => None,
    }
}

/// Accept either a JSON array of strings or one newline-separated string.
fn lines<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lines {
        Text(String),
        List(Vec<String>),
    }

    Ok(match Option::<Lines>::deserialize(deserializer)? {
        Some(Lines::Text(text)) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        Some(Lines::List(items)) => items,
        None => Vec::new(),
    })
}

/// Which list [`format_text`] is cleaning up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Ingredients,
    Instructions,
}

impl FormatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatKind::Ingredients => "ingredients",
            FormatKind::Instructions => "instructions",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FormattedLines {
    Object { lines: Vec<String> },
    List(Vec<String>),
}

impl Validate for FormattedLines {
    fn validate(&self) -> Result<(), AiError> {
        let lines = match self {
            FormattedLines::Object { lines } | FormattedLines::List(lines) => lines,
        };
        if lines.iter().all(|l| l.trim().is_empty()) {
            Err(AiError::EmptyResult)
        } else {
            Ok(())
        }
    }
}

fn recipe_request(prompt: String, attachments: Vec<ContentBlock>) -> ChatRequest {
    ChatRequest {
        system: None,
        messages: vec![ChatMessage::user_with_attachments(prompt, attachments)],
        max_tokens: Some(RECIPE_MAX_TOKENS),
        temperature: Some(TEMPERATURE),
    }
}

async fn run_recipe_task(
    client: &dyn AiClient,
    task: &str,
    request: ChatRequest,
) -> Result<AiRecipe, AiError> {
    let response = client.complete(task, request).await?;
    tracing::debug!(
        task,
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        "AI task completed"
    );
    parse_structured(&response.content)
}

/// Extract a recipe from image and PDF content blocks.
pub async fn extract_from_documents(
    client: &dyn AiClient,
    attachments: Vec<ContentBlock>,
) -> Result<AiRecipe, AiError> {
    let prompt = render_document_extract_prompt(attachments.len());
    run_recipe_task(
        client,
        DOCUMENT_EXTRACT_PROMPT_NAME,
        recipe_request(prompt, attachments),
    )
    .await
}

/// Extract a recipe from a video transcript or description.
pub async fn extract_from_video(
    client: &dyn AiClient,
    title: &str,
    text: &str,
) -> Result<AiRecipe, AiError> {
    let prompt = render_video_extract_prompt(title, text);
    run_recipe_task(
        client,
        VIDEO_EXTRACT_PROMPT_NAME,
        recipe_request(prompt, Vec::new()),
    )
    .await
}

/// Structure a block of pasted text into a recipe.
pub async fn parse_dump(client: &dyn AiClient, text: &str) -> Result<AiRecipe, AiError> {
    let prompt = render_parse_dump_prompt(text);
    run_recipe_task(
        client,
        PARSE_DUMP_PROMPT_NAME,
        recipe_request(prompt, Vec::new()),
    )
    .await
}

/// Split a messy ingredient or instruction block into clean lines.
pub async fn format_text(
    client: &dyn AiClient,
    kind: FormatKind,
    text: &str,
) -> Result<Vec<String>, AiError> {
    let request = ChatRequest {
        system: None,
        messages: vec![ChatMessage::user(render_format_text_prompt(
            kind.as_str(),
            text,
        ))],
        max_tokens: Some(FORMAT_MAX_TOKENS),
        temperature: Some(TEMPERATURE),
    };
    let response = client.complete(FORMAT_TEXT_PROMPT_NAME, request).await?;

    let lines = match parse_structured::<FormattedLines>(&response.content)? {
        FormattedLines::Object { lines } | FormattedLines::List(lines) => lines,
    };
    Ok(lines
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}
