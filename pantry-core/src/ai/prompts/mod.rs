//! AI prompt templates.

pub mod document_extract;
pub mod format_text;
pub mod parse_dump;
pub mod video_extract;

pub use document_extract::{render_document_extract_prompt, DOCUMENT_EXTRACT_PROMPT_NAME};
pub use format_text::{render_format_text_prompt, FORMAT_TEXT_PROMPT_NAME};
pub use parse_dump::{render_parse_dump_prompt, PARSE_DUMP_PROMPT_NAME};
pub use video_extract::{render_video_extract_prompt, VIDEO_EXTRACT_PROMPT_NAME};

/// JSON shape shared by every recipe-producing prompt.
pub(crate) const RECIPE_JSON_SHAPE: &str = r#"{
  "title": "Recipe Title",
  "ingredients": ["Each ingredient as its own string, exactly as written"],
  "instructions": ["Each step as its own string, without step numbers"],
  "servings": "Servings if present, otherwise null",
  "prep_time": "Prep time if present, otherwise null",
  "cook_time": "Cook time if present, otherwise null",
  "total_time": "Total time if present, otherwise null",
  "notes": "Tips, variations or a short description if present, otherwise null"
}"#;
