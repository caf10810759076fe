//! Selector-cascade extraction for pages without structured data.
//!
//! Every field is located by an ordered table of selector rules. The first
//! rule that yields anything wins and later rules are not consulted. The
//! generic scans at the bottom only run when no targeted rule matched.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::normalize::{clean_text, normalize_time_text, parse_servings_text, resolve_image_url};
use crate::types::ExtractedRecipe;

use super::meta_content;

pub const MAX_INGREDIENTS: usize = 50;
pub const MAX_INSTRUCTIONS: usize = 30;

const GENERIC_INGREDIENT_MIN_CHARS: usize = 5;
const GENERIC_INGREDIENT_MAX_CHARS: usize = 300;
const GENERIC_INSTRUCTION_MIN_CHARS: usize = 16;

#[derive(Debug, Clone, Copy)]
enum Read {
    /// Element text.
    Text,
    /// `content` or `datetime` attribute, falling back to element text.
    Attr,
}

struct SelectorRule {
    selector: Selector,
    read: Read,
}

impl SelectorRule {
    fn read(&self, element: ElementRef<'_>) -> String {
        let attr = match self.read {
            Read::Attr => element
                .value()
                .attr("content")
                .or_else(|| element.value().attr("datetime")),
            Read::Text => None,
        };
        match attr {
            Some(value) => clean_text(value),
            None => clean_text(&element.text().collect::<String>()),
        }
    }
}

fn compile(table: &[(&str, Read)]) -> Vec<SelectorRule> {
    table
        .iter()
        .map(|(selector, read)| SelectorRule {
            selector: Selector::parse(selector).expect("Invalid selector"),
            read: *read,
        })
        .collect()
}

static INGREDIENT_RULES: LazyLock<Vec<SelectorRule>> = LazyLock::new(|| {
    compile(&[
        (
            "li[class*='ingredient'], p[class*='ingredient'], td[class*='ingredient'], tr[class*='ingredient']",
            Read::Text,
        ),
        (
            "[itemprop='recipeIngredient'], [itemprop='ingredients']",
            Read::Text,
        ),
        (".wprm-recipe-ingredient", Read::Text),
        (".tasty-recipes-ingredients li", Read::Text),
        (".jetpack-recipe-ingredient", Read::Text),
        (".mv-create-ingredients li", Read::Text),
    ])
});

static INSTRUCTION_RULES: LazyLock<Vec<SelectorRule>> = LazyLock::new(|| {
    compile(&[
        (
            "li[class*='instruction'], li[class*='direction'], li[class*='step'], \
             p[class*='instruction'], p[class*='direction'], p[class*='step']",
            Read::Text,
        ),
        (
            "[itemprop='recipeInstructions'] li, [itemprop='recipeInstructions'] p",
            Read::Text,
        ),
        ("[itemprop='recipeInstructions']", Read::Text),
        (".wprm-recipe-instruction-text", Read::Text),
        (".tasty-recipes-instructions li", Read::Text),
        (".jetpack-recipe-directions p", Read::Text),
        (".mv-create-instructions li", Read::Text),
    ])
});

static PREP_TIME_RULES: LazyLock<Vec<SelectorRule>> = LazyLock::new(|| {
    compile(&[
        ("[itemprop='prepTime']", Read::Attr),
        (
            "[class*='prep-time'], [class*='prep_time'], [class*='prepTime']",
            Read::Text,
        ),
        (".tasty-recipes-prep-time, .mv-create-time-prep", Read::Text),
    ])
});

static COOK_TIME_RULES: LazyLock<Vec<SelectorRule>> = LazyLock::new(|| {
    compile(&[
        ("[itemprop='cookTime']", Read::Attr),
        (
            "[class*='cook-time'], [class*='cook_time'], [class*='cookTime']",
            Read::Text,
        ),
        (".tasty-recipes-cook-time, .mv-create-time-active", Read::Text),
    ])
});

static TOTAL_TIME_RULES: LazyLock<Vec<SelectorRule>> = LazyLock::new(|| {
    compile(&[
        ("[itemprop='totalTime']", Read::Attr),
        (
            "[class*='total-time'], [class*='total_time'], [class*='totalTime']",
            Read::Text,
        ),
        (".tasty-recipes-total-time, .mv-create-time-total", Read::Text),
    ])
});

static SERVINGS_RULES: LazyLock<Vec<SelectorRule>> = LazyLock::new(|| {
    compile(&[
        ("[itemprop='recipeYield']", Read::Attr),
        (".wprm-recipe-servings", Read::Text),
        (".tasty-recipes-yield, .mv-create-yield", Read::Text),
        ("[class*='servings'], [class*='yield']", Read::Text),
    ])
});

static TITLE_RULES: LazyLock<Vec<SelectorRule>> =
    LazyLock::new(|| compile(&[("h1", Read::Text), ("h2", Read::Text), ("title", Read::Text)]));

static IMAGE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["[class*='recipe'] img", "article img"]
        .iter()
        .map(|s| Selector::parse(s).expect("Invalid selector"))
        .collect()
});

static GENERIC_INGREDIENT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("Invalid selector"));

static GENERIC_INSTRUCTION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ol > li").expect("Invalid selector"));

static UNIT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:cups?|tsp|tbsp|oz|lbs?|ml|tablespoons?|teaspoons?)\b")
        .expect("Invalid unit regex")
});

static TITLE_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[|\-–]\s+[^|\-–]+$").expect("Invalid title suffix regex"));

/// Extract a recipe from page markup alone. Returns `None` when neither
/// ingredients nor instructions could be located.
pub fn extract_heuristic(html: &str, source_url: &str) -> Option<ExtractedRecipe> {
    let document = Html::parse_document(html);

    let ingredients = first_list(&document, &INGREDIENT_RULES, MAX_INGREDIENTS);
    let ingredients = if ingredients.is_empty() {
        tracing::debug!("no targeted ingredient selector matched, scanning bullets");
        generic_ingredients(&document)
    } else {
        ingredients
    };

    let instructions = first_list(&document, &INSTRUCTION_RULES, MAX_INSTRUCTIONS);
    let instructions = if instructions.is_empty() {
        generic_instructions(&document)
    } else {
        instructions
    };

    if ingredients.is_empty() && instructions.is_empty() {
        return None;
    }

    let mut recipe = ExtractedRecipe::new(source_url);
    recipe.title = extract_title(&document).unwrap_or_default();
    recipe.image_url = extract_image(&document, source_url);
    recipe.ingredients = ingredients;
    recipe.instructions = instructions;
    recipe.prep_time = first_time(&document, &PREP_TIME_RULES);
    recipe.cook_time = first_time(&document, &COOK_TIME_RULES);
    recipe.total_time = first_time(&document, &TOTAL_TIME_RULES);
    recipe.servings = first_value(&document, &SERVINGS_RULES, has_digit)
        .and_then(|text| parse_servings_text(&text));
    recipe.notes = meta_content(&document, "og:description")
        .or_else(|| meta_content(&document, "description"));

    Some(recipe)
}

fn first_list(document: &Html, rules: &[SelectorRule], cap: usize) -> Vec<String> {
    for rule in rules {
        let items: Vec<String> = document
            .select(&rule.selector)
            .map(|el| rule.read(el))
            .filter(|s| !s.is_empty())
            .take(cap)
            .collect();
        if !items.is_empty() {
            return items;
        }
    }
    Vec::new()
}

fn first_value(
    document: &Html,
    rules: &[SelectorRule],
    accept: impl Fn(&str) -> bool,
) -> Option<String> {
    rules.iter().find_map(|rule| {
        document
            .select(&rule.selector)
            .map(|el| rule.read(el))
            .find(|s| !s.is_empty() && accept(s))
    })
}

fn first_time(document: &Html, rules: &[SelectorRule]) -> Option<String> {
    first_value(document, rules, has_digit).and_then(|text| normalize_time_text(&text))
}

fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

fn generic_ingredients(document: &Html) -> Vec<String> {
    document
        .select(&GENERIC_INGREDIENT_SELECTOR)
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|text| {
            let len = text.chars().count();
            (GENERIC_INGREDIENT_MIN_CHARS..=GENERIC_INGREDIENT_MAX_CHARS).contains(&len)
                && has_digit(text)
                && UNIT_REGEX.is_match(text)
        })
        .take(MAX_INGREDIENTS)
        .collect()
}

fn generic_instructions(document: &Html) -> Vec<String> {
    document
        .select(&GENERIC_INSTRUCTION_SELECTOR)
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|text| text.chars().count() >= GENERIC_INSTRUCTION_MIN_CHARS)
        .take(MAX_INSTRUCTIONS)
        .collect()
}

fn extract_title(document: &Html) -> Option<String> {
    if let Some(title) = meta_content(document, "og:title") {
        return Some(title);
    }
    let title = first_value(document, &TITLE_RULES, |_| true)?;
    let stripped = TITLE_SUFFIX_REGEX.replace(&title, "").trim().to_string();
    if stripped.is_empty() {
        Some(title)
    } else {
        Some(stripped)
    }
}

fn extract_image(document: &Html, source_url: &str) -> Option<String> {
    if let Some(og) = meta_content(document, "og:image")
        .and_then(|candidate| resolve_image_url(&candidate, source_url))
    {
        return Some(og);
    }

    IMAGE_SELECTORS.iter().find_map(|selector| {
        document.select(selector).find_map(|img| {
            let attrs = img.value();
            attrs
                .attr("src")
                .and_then(|src| resolve_image_url(src, source_url))
                .or_else(|| {
                    attrs
                        .attr("data-src")
                        .and_then(|src| resolve_image_url(src, source_url))
                })
        })
    })
}
