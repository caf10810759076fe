//! HTML recipe extractors, tried in priority order.

mod heuristic;
mod jsonld;
mod social;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

pub use heuristic::{extract_heuristic, MAX_INGREDIENTS, MAX_INSTRUCTIONS};
pub use jsonld::extract_jsonld;
pub use social::{caption_from_html, extract_social, is_social_url, parse_caption, ParsedCaption};

use crate::types::{ExtractedRecipe, ExtractionMethod};

/// Regex to find og:image meta tag
static OG_IMAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*property\s*=\s*["']og:image["'][^>]*content\s*=\s*["']([^"']+)["'][^>]*/?\s*>"#)
        .expect("Invalid og:image regex")
});

/// Alternative og:image regex (content before property)
static OG_IMAGE_REGEX_ALT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*content\s*=\s*["']([^"']+)["'][^>]*property\s*=\s*["']og:image["'][^>]*/?\s*>"#)
        .expect("Invalid og:image alt regex")
});

/// Structured data first, then selector cascades. `None` means the page
/// holds no recognizable recipe.
pub fn extract_from_html(html: &str, source_url: &str) -> Option<(ExtractedRecipe, ExtractionMethod)> {
    if let Some(recipe) = extract_jsonld(html, source_url) {
        tracing::debug!("extracted via JSON-LD");
        return Some((recipe, ExtractionMethod::JsonLd));
    }

    tracing::debug!("no usable JSON-LD, trying selector cascades");
    extract_heuristic(html, source_url).map(|recipe| (recipe, ExtractionMethod::Heuristic))
}

/// Fast og:image extraction without building a DOM.
pub(crate) fn og_image_fast(html: &str) -> Option<String> {
    OG_IMAGE_REGEX
        .captures(html)
        .or_else(|| OG_IMAGE_REGEX_ALT.captures(html))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// `content` of the first `<meta property=key>` or `<meta name=key>`.
pub(crate) fn meta_content(document: &Html, key: &str) -> Option<String> {
    let selector =
        Selector::parse(&format!(r#"meta[property="{key}"], meta[name="{key}"]"#)).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}
