//! schema.org/Recipe extraction from JSON-LD script blocks.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::normalize::{parse_iso_duration, parse_servings, resolve_image_url, strip_html};
use crate::types::ExtractedRecipe;

use super::og_image_fast;

/// Regex to find JSON-LD script tags (case-insensitive for type attribute)
static JSONLD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("Invalid JSON-LD regex")
});

/// Ingredient lists this short are suspected of being comma-joined.
const REPAIR_MAX_LINES: usize = 3;
/// A suspected line is only re-split when it has at least this many commas.
const REPAIR_MIN_COMMAS: usize = 3;

/// Extract a recipe from the first JSON-LD Recipe node on the page.
///
/// Blocks are scanned in document order and blocks that fail to parse are
/// skipped. A Recipe node carrying neither ingredients nor instructions
/// counts as no recipe.
pub fn extract_jsonld(html: &str, source_url: &str) -> Option<ExtractedRecipe> {
    for cap in JSONLD_REGEX.captures_iter(html) {
        let json_text = match cap.get(1) {
            Some(m) => m.as_str(),
            None => continue,
        };

        let sanitized = sanitize_json(json_text);
        let json: Value = match serde_json::from_str(&sanitized) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable JSON-LD block");
                continue;
            }
        };

        if let Some(node) = find_recipe_node(&json) {
            let recipe = map_recipe(node, html, source_url);
            if recipe.is_empty() {
                tracing::debug!("JSON-LD Recipe node has no ingredients or instructions");
                return None;
            }
            return Some(recipe);
        }
    }
    None
}

/// Escape raw control characters that some sites leave inside JSON strings.
pub(crate) fn sanitize_json(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
                result.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    result.push(c);
                }
                '"' => {
                    in_string = false;
                    result.push(c);
                }
                '\n' => result.push_str("\\n"),
                '\r' => result.push_str("\\r"),
                '\t' => result.push_str("\\t"),
                c if c.is_control() => {}
                _ => result.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            result.push(c);
        }
    }

    result
}

fn is_recipe(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(s)) => s == "Recipe",
        Some(Value::Array(types)) => types.iter().any(|t| t == "Recipe"),
        _ => false,
    }
}

/// Find the first Recipe node: top-level arrays are searched in order and
/// a single level of `@graph` is unwrapped. Nothing deeper is visited.
fn find_recipe_node(json: &Value) -> Option<&Value> {
    let candidates: Vec<&Value> = match json {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    for candidate in candidates {
        if is_recipe(candidate) {
            return Some(candidate);
        }
        if let Some(Value::Array(graph)) = candidate.get("@graph") {
            if let Some(node) = graph.iter().find(|n| is_recipe(n)) {
                return Some(node);
            }
        }
    }
    None
}

fn map_recipe(node: &Value, html: &str, source_url: &str) -> ExtractedRecipe {
    let mut recipe = ExtractedRecipe::new(source_url);

    recipe.title = node
        .get("name")
        .and_then(Value::as_str)
        .map(strip_html)
        .unwrap_or_default();
    recipe.notes = node
        .get("description")
        .and_then(Value::as_str)
        .map(strip_html);

    recipe.ingredients = node
        .get("recipeIngredient")
        .or_else(|| node.get("ingredients"))
        .map(map_ingredients)
        .unwrap_or_default();
    recipe.instructions = node
        .get("recipeInstructions")
        .map(map_instructions)
        .unwrap_or_default();

    recipe.prep_time = parse_iso_duration(node.get("prepTime").and_then(Value::as_str));
    recipe.cook_time = parse_iso_duration(node.get("cookTime").and_then(Value::as_str));
    recipe.total_time = parse_iso_duration(node.get("totalTime").and_then(Value::as_str));
    recipe.servings = node.get("recipeYield").and_then(parse_servings);

    recipe.image_url = image_candidates(node)
        .into_iter()
        .find_map(|candidate| resolve_image_url(&candidate, source_url))
        .or_else(|| og_image_fast(html).and_then(|og| resolve_image_url(&og, source_url)));

    recipe
}

fn map_ingredients(value: &Value) -> Vec<String> {
    let lines: Vec<String> = match value {
        Value::String(s) => split_outside_parens(&strip_html(s)),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(strip_html(s)),
                Value::Object(_) => item
                    .get("text")
                    .or_else(|| item.get("name"))
                    .and_then(Value::as_str)
                    .map(strip_html),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    repair_comma_joined(lines)
}

/// Some sites put the whole ingredient list in one or two strings. When the
/// list is very short, any line with several commas is split again.
fn repair_comma_joined(lines: Vec<String>) -> Vec<String> {
    if lines.len() > REPAIR_MAX_LINES {
        return lines;
    }

    lines
        .into_iter()
        .flat_map(|line| {
            if line.matches(',').count() >= REPAIR_MIN_COMMAS {
                split_outside_parens(&line)
            } else {
                vec![line]
            }
        })
        .collect()
}

/// Split on commas that are not inside parentheses.
fn split_outside_parens(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn map_instructions(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .lines()
            .map(strip_html)
            .filter(|line| !line.is_empty())
            .collect(),
        Value::Array(items) => {
            let mut steps = Vec::new();
            for item in items {
                push_instruction(item, &mut steps);
            }
            steps
        }
        Value::Object(_) => {
            let mut steps = Vec::new();
            push_instruction(value, &mut steps);
            steps
        }
        _ => Vec::new(),
    }
}

fn push_instruction(item: &Value, steps: &mut Vec<String>) {
    match item {
        Value::String(s) => {
            let text = strip_html(s);
            if !text.is_empty() {
                steps.push(text);
            }
        }
        Value::Object(_) if is_section(item) => {
            if let Some(name) = item.get("name").and_then(Value::as_str).map(strip_html) {
                if !name.is_empty() {
                    steps.push(format!("**{name}**"));
                }
            }
            if let Some(Value::Array(nested)) = item.get("itemListElement") {
                for step in nested {
                    push_instruction(step, steps);
                }
            }
        }
        Value::Object(_) => {
            if let Some(text) = item
                .get("text")
                .or_else(|| item.get("name"))
                .and_then(Value::as_str)
                .map(strip_html)
            {
                if !text.is_empty() {
                    steps.push(text);
                }
            }
        }
        _ => {}
    }
}

fn is_section(item: &Value) -> bool {
    match item.get("@type") {
        Some(Value::String(s)) => s == "HowToSection",
        Some(Value::Array(types)) => types.iter().any(|t| t == "HowToSection"),
        _ => item.get("itemListElement").is_some_and(Value::is_array),
    }
}

fn image_candidates(node: &Value) -> Vec<String> {
    let url_of = |v: &Value| -> Option<String> {
        match v {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("url")
                .or_else(|| obj.get("contentUrl"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    };

    match node.get("image") {
        Some(Value::Array(items)) => items.iter().filter_map(url_of).collect(),
        Some(other) => url_of(other).into_iter().collect(),
        None => Vec::new(),
    }
}
