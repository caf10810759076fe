//! Turning model text into validated typed values.

use serde::de::DeserializeOwned;

use super::client::AiError;

/// Shape checks run after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), AiError>;
}

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````) if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Deserialize model output into `T` and validate it.
pub fn parse_structured<T: DeserializeOwned + Validate>(text: &str) -> Result<T, AiError> {
    let json = strip_code_fence(text);
    let value: T = serde_json::from_str(json).map_err(|e| {
        tracing::warn!(error = %e, "AI response was not the expected JSON shape");
        AiError::Unparseable {
            reason: e.to_string(),
        }
    })?;
    value.validate()?;
    Ok(value)
}
