//! Prompt for turning a cooking video's transcript or description into a recipe.

use super::RECIPE_JSON_SHAPE;

/// Prompt name for logging.
pub const VIDEO_EXTRACT_PROMPT_NAME: &str = "video_extract";

pub fn render_video_extract_prompt(title: &str, text: &str) -> String {
    format!(
        r#"You are a recipe extraction assistant. Below is the transcript or description of a cooking video titled "{title}".

Spoken transcripts are informal: quantities may be approximate ("a splash", "about a cup") and steps may be out of order or repeated. Write the recipe the way the cook actually made it.

Text:
{text}

Return a single JSON object with this exact structure:
{RECIPE_JSON_SHAPE}

Rules:
- Use the video title unless the text names the dish more precisely
- Keep quantities as stated; do not invent missing ones
- Each instruction should be one clear action, in cooking order
- Return ONLY the JSON object, no other text"#
    )
}
