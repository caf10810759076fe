use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse a recipe from a saved HTML file.
/// Outputs JSON to stdout (the recipe on success or an error message on failure).
pub fn parse_html(file: &Path, source_url: &str) -> Result<()> {
    let html = fs::read_to_string(file)
        .with_context(|| format!("Failed to read HTML file: {}", file.display()))?;

    let extracted = if pantry_core::extract::is_social_url(source_url) {
        pantry_core::extract_social(&html, source_url)
            .map(|recipe| (recipe, pantry_core::ExtractionMethod::SocialCaption))
            .or_else(|| pantry_core::extract_from_html(&html, source_url))
    } else {
        pantry_core::extract_from_html(&html, source_url)
    };

    match extracted {
        Some((recipe, method)) => {
            let json = serde_json::json!({
                "method": method,
                "recipe": recipe.finalize(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }
        None => {
            let error_json = serde_json::json!({
                "error": "No recipe found in HTML"
            });
            println!("{}", serde_json::to_string_pretty(&error_json)?);
            // Return error so exit code is non-zero
            Err(anyhow::anyhow!("Failed to extract recipe from {}", file.display()))
        }
    }
}
