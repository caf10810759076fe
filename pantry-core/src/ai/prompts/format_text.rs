//! Prompt for splitting a messy ingredient or instruction block into clean lines.

/// Prompt name for logging.
pub const FORMAT_TEXT_PROMPT_NAME: &str = "format_text";

/// `section` is "ingredients" or "instructions".
pub fn render_format_text_prompt(section: &str, text: &str) -> String {
    let rules = if section == "ingredients" {
        "- One ingredient per line, quantity first when present\n- Keep section headings such as \"For the sauce:\" as their own line"
    } else {
        "- One step per line, without leading numbers or bullets\n- Split run-on paragraphs into separate actions"
    };

    format!(
        r#"You are a recipe formatting assistant. Clean up this list of recipe {section}. The text may have been copied with lines run together, stray bullets or broken wrapping.

Text:
{text}

Rules:
{rules}
- Do not change quantities or add anything that is not in the text

Respond with JSON only, no other text: {{"lines": ["line 1", "line 2"]}}"#
    )
}
