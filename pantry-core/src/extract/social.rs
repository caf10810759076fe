//! Recipe parsing for social-media captions.
//!
//! Captions are free text, so this is pattern matching over segments rather
//! than markup extraction: an ALL-CAPS run names the dish, numbered lines
//! are steps, and whatever sits between is the ingredient list.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use crate::normalize::{clean_text, resolve_image_url};
use crate::types::ExtractedRecipe;

use super::meta_content;

const BULLET: char = '•';
const FALLBACK_TITLE_MAX_CHARS: usize = 80;

static NUMBERED_STEP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s").expect("Invalid numbered step regex"));

static STEP_BOUNDARY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s+)\d+\.\s+").expect("Invalid step boundary regex"));

/// Runs of upper-case words, each at least two letters long.
static CAPS_PHRASE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Z'’&-]*[A-Z](?:[ \t]+[A-Z][A-Z'’&-]*[A-Z])*\b")
        .expect("Invalid caps phrase regex")
});

static AUTHOR_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^:\n]{1,80}?\s+on\s+[^:\n]{1,40}:\s*").expect("Invalid author prefix regex")
});

static ENGAGEMENT_LEAD_IN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*[\d.,]+[km]?\s+likes?,\s*[\d.,]+[km]?\s+comments?\s*[-–]\s*")
        .expect("Invalid engagement lead-in regex")
});

static QUOTED_BODY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^(?P<prefix>[^"“]{0,160}?:\s*)?["“](?P<body>.*)["”]\s*\.?\s*$"#)
        .expect("Invalid quoted caption regex")
});

/// Caption fields recovered by [`parse_caption`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCaption {
    pub title: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

/// Hosts whose pages carry the recipe in a caption.
pub fn is_social_url(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    host == "instagram.com" || host.ends_with(".instagram.com") || host == "instagr.am"
}

/// Split a caption into title, ingredients and numbered steps.
pub fn parse_caption(caption: &str) -> ParsedCaption {
    let segments: Vec<String> = if caption.contains(BULLET) {
        caption.split(BULLET).map(clean_text).collect()
    } else {
        caption.lines().map(clean_text).collect()
    };
    let segments: Vec<String> = segments.into_iter().filter(|s| !s.is_empty()).collect();

    let mut parsed = ParsedCaption::default();
    let mut in_steps = false;
    let mut first_segment_is_ingredient = false;

    for (index, segment) in segments.iter().enumerate() {
        if NUMBERED_STEP_REGEX.is_match(segment) {
            in_steps = true;
            parsed.instructions.extend(split_steps(segment));
            continue;
        }
        if in_steps {
            continue;
        }

        if parsed.title.is_none() {
            if let Some((title, rest)) = caps_title(segment) {
                parsed.title = Some(title);
                if !rest.is_empty() {
                    parsed.ingredients.push(rest);
                }
                continue;
            }
        }

        if index == 0 {
            first_segment_is_ingredient = true;
        }
        parsed.ingredients.push(segment.clone());
    }

    if parsed.title.is_none() {
        // A caption that opens with its steps has no line to borrow a title from
        if let Some(first) = segments.first().filter(|s| !NUMBERED_STEP_REGEX.is_match(s)) {
            if first_segment_is_ingredient && !parsed.ingredients.is_empty() {
                parsed.ingredients.remove(0);
            }
            parsed.title = fallback_title(first);
        }
    }

    parsed
}

fn split_steps(segment: &str) -> Vec<String> {
    STEP_BOUNDARY_REGEX
        .split(segment)
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .collect()
}

/// First qualifying caps run and the text that follows it.
fn caps_title(segment: &str) -> Option<(String, String)> {
    CAPS_PHRASE_REGEX.find_iter(segment).find_map(|m| {
        let phrase = m.as_str();
        let words: Vec<&str> = phrase.split_whitespace().collect();
        let long_word = words
            .iter()
            .any(|w| w.chars().filter(|c| c.is_alphabetic()).count() >= 4);
        if !long_word && words.len() < 2 {
            return None;
        }
        let rest = segment[m.end()..]
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | '–' | '!'))
            .trim()
            .to_string();
        Some((phrase.to_string(), rest))
    })
}

fn fallback_title(first_segment: &str) -> Option<String> {
    let stripped = AUTHOR_PREFIX_REGEX.replace(first_segment, "");
    let stripped = stripped.trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '“' | '”'));
    let title: String = stripped.chars().take(FALLBACK_TITLE_MAX_CHARS).collect();
    let title = title.trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Caption text from a fetched social page's meta tags, with the
/// engagement lead-in and wrapping quotes removed.
pub fn caption_from_html(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let raw = meta_content(&document, "og:description")
        .or_else(|| meta_content(&document, "description"))
        .or_else(|| meta_content(&document, "og:title"))?;
    Some(clean_caption(&raw)).filter(|c| !c.is_empty())
}

fn clean_caption(raw: &str) -> String {
    let without_lead_in = ENGAGEMENT_LEAD_IN_REGEX.replace(raw.trim(), "");
    let unquoted = match QUOTED_BODY_REGEX.captures(&without_lead_in) {
        Some(caps) => format!(
            "{}{}",
            caps.name("prefix").map_or("", |m| m.as_str()),
            caps.name("body").map_or("", |m| m.as_str())
        ),
        None => without_lead_in.to_string(),
    };
    unquoted.trim().to_string()
}

/// Build a recipe from a social post page. Returns `None` when the caption
/// holds neither ingredients nor steps.
pub fn extract_social(html: &str, source_url: &str) -> Option<ExtractedRecipe> {
    let caption = caption_from_html(html)?;
    let parsed = parse_caption(&caption);
    if parsed.ingredients.is_empty() && parsed.instructions.is_empty() {
        return None;
    }

    let document = Html::parse_document(html);
    let mut recipe = ExtractedRecipe::new(source_url);
    recipe.title = parsed.title.unwrap_or_default();
    recipe.ingredients = parsed.ingredients;
    recipe.instructions = parsed.instructions;
    recipe.image_url = meta_content(&document, "og:image")
        .and_then(|candidate| resolve_image_url(&candidate, source_url));
    Some(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullet_caption() {
        let parsed = parse_caption("MY TACOS• 2 tortillas• cumin• 1. Heat pan 2. Fry");
        assert_eq!(parsed.title.as_deref(), Some("MY TACOS"));
        assert_eq!(parsed.ingredients, vec!["2 tortillas", "cumin"]);
        assert_eq!(parsed.instructions, vec!["Heat pan", "Fry"]);
    }

    #[test]
    fn test_newline_caption_with_trailing_title_text() {
        let caption = "CRISPY GNOCCHI with brown butter\n1 lb gnocchi\n3 tbsp butter\n1. Boil gnocchi.\n2. Fry in butter.";
        let parsed = parse_caption(caption);
        assert_eq!(parsed.title.as_deref(), Some("CRISPY GNOCCHI"));
        assert_eq!(
            parsed.ingredients,
            vec!["with brown butter", "1 lb gnocchi", "3 tbsp butter"]
        );
        assert_eq!(parsed.instructions, vec!["Boil gnocchi.", "Fry in butter."]);
    }

    #[test]
    fn test_short_caps_word_is_not_a_title() {
        let parsed = parse_caption("1 CUP rice\nwater\n1. Rinse");
        assert_ne!(parsed.title.as_deref(), Some("CUP"));
    }

    #[test]
    fn test_fallback_title_strips_author_prefix() {
        let caption = "Jamie Cooks on Instagram: weeknight lentil soup that everyone loves\n1 cup lentils\n1. Simmer";
        let parsed = parse_caption(caption);
        assert_eq!(
            parsed.title.as_deref(),
            Some("weeknight lentil soup that everyone loves")
        );
        assert_eq!(parsed.ingredients, vec!["1 cup lentils"]);
        assert_eq!(parsed.instructions, vec!["Simmer"]);
    }

    #[test]
    fn test_fallback_title_truncated() {
        let long = "a".repeat(200);
        let parsed = parse_caption(&long);
        assert_eq!(parsed.title.map(|t| t.chars().count()), Some(80));
    }

    #[test]
    fn test_caption_opening_with_steps_has_no_title() {
        let parsed = parse_caption("1. Heat pan 2. Fry eggs\nso good");
        assert_eq!(parsed.title, None);
        assert_eq!(parsed.instructions, vec!["Heat pan", "Fry eggs"]);
        assert!(parsed.ingredients.is_empty());
    }

    #[test]
    fn test_segments_after_steps_are_ignored() {
        let parsed = parse_caption("PASTA NIGHT• 200g pasta• 1. Boil• #dinner #easy");
        assert_eq!(parsed.instructions, vec!["Boil"]);
        assert_eq!(parsed.ingredients, vec!["200g pasta"]);
    }

    #[test]
    fn test_is_social_url() {
        assert!(is_social_url("https://www.instagram.com/p/Cabc123/"));
        assert!(is_social_url("https://instagr.am/p/Cabc123/"));
        assert!(!is_social_url("https://example.com/instagram.com"));
        assert!(!is_social_url("not a url"));
    }

    #[test]
    fn test_caption_from_html_strips_lead_in_and_quotes() {
        let html = r#"<html><head>
            <meta property="og:description" content="1,204 likes, 38 comments - chef on March 3, 2024: &quot;MY TACOS• 2 tortillas• 1. Heat pan&quot;">
        </head></html>"#;
        let caption = caption_from_html(html).unwrap();
        assert_eq!(caption, "chef on March 3, 2024: MY TACOS• 2 tortillas• 1. Heat pan");
    }

    #[test]
    fn test_caption_falls_back_to_og_title() {
        let html = r#"<html><head><meta property="og:title" content="SOUP• 1 leek• 1. Simmer"></head></html>"#;
        assert_eq!(caption_from_html(html).as_deref(), Some("SOUP• 1 leek• 1. Simmer"));
    }

    #[test]
    fn test_extract_social() {
        let html = r#"<html><head>
            <meta property="og:description" content="MY TACOS• 2 tortillas• cumin• 1. Heat pan 2. Fry">
            <meta property="og:image" content="https://scontent.cdninstagram.com/v/t51/123_n.jpg?stp=dst-jpg">
        </head></html>"#;
        let recipe = extract_social(html, "https://www.instagram.com/p/Cabc123/").unwrap();
        assert_eq!(recipe.title, "MY TACOS");
        assert_eq!(recipe.instructions, vec!["Heat pan", "Fry"]);
        assert!(recipe.image_url.is_some());
        assert_eq!(recipe.source_name.as_deref(), Some("instagram.com"));
    }
}
