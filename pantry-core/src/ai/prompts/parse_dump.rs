//! Prompt for structuring a block of pasted recipe text.

use super::RECIPE_JSON_SHAPE;

/// Prompt name for logging.
pub const PARSE_DUMP_PROMPT_NAME: &str = "parse_dump";

pub fn render_parse_dump_prompt(text: &str) -> String {
    format!(
        r#"You are a recipe extraction assistant. The user pasted text copied from somewhere (an email, a notes app, a web page). Find the recipe in the pasted text and structure it.

Pasted text:
{text}

Return a single JSON object with this exact structure:
{RECIPE_JSON_SHAPE}

Rules:
- Ignore chatter, ads and comments that are not part of the recipe
- Extract ingredient and step text as written
- If there is no recipe, return empty ingredients and instructions arrays
- Return ONLY the JSON object, no other text"#
    )
}
