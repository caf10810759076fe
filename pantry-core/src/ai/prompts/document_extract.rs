//! Prompt for extracting a recipe from uploaded images and PDFs.

use super::RECIPE_JSON_SHAPE;

/// Prompt name for logging.
pub const DOCUMENT_EXTRACT_PROMPT_NAME: &str = "document_extract";

pub fn render_document_extract_prompt(page_count: usize) -> String {
    let pages = if page_count == 1 {
        "a photo or scan of a recipe".to_string()
    } else {
        format!("{page_count} photos or scans that together make up one recipe")
    };

    format!(
        r#"You are a recipe extraction assistant. You are given {pages}, for example a cookbook page, a printed card or a handwritten note.

Extract the complete recipe and return it as a single JSON object with this exact structure:
{RECIPE_JSON_SHAPE}

Rules:
- Extract the text EXACTLY as written - do not paraphrase or invent quantities
- Combine ingredients and steps that continue across pages, in page order
- If information is not present, use null for that field
- Return ONLY the JSON object, no other text"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prompt_mentions_page_count() {
        assert!(render_document_extract_prompt(1).contains("a photo or scan"));
        assert!(render_document_extract_prompt(3).contains("3 photos or scans"));
        assert!(render_document_extract_prompt(3).contains("\"ingredients\""));
    }
}
