//! Golden file tests for HTML recipe extraction.
//!
//! Each case is a JSON file in `fixtures/golden/` naming an HTML fixture,
//! the URL it was served from, and the finalized recipe we expect back.
//!
//! Test format:
//! ```json
//! {
//!   "html_fixture": "page.html",
//!   "source_url": "https://example.com/recipe",
//!   "expected": { "method": "json_ld", "title": "...", "ingredients": [...], ... }
//! }
//! ```
//!
//! Optional fields left out of `expected` must be absent from the result.

use glob::glob;
use pantry_core::extract::{extract_from_html, extract_social, is_social_url};
use pantry_core::{ExtractedRecipe, ExtractionMethod};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// A test case loaded from a JSON fixture file
#[derive(Debug, Deserialize)]
struct TestCase {
    /// HTML file name, relative to the fixture directory
    html_fixture: String,
    source_url: String,
    expected: Expected,
}

#[derive(Debug, Deserialize)]
struct Expected {
    method: ExtractionMethod,
    title: String,
    #[serde(default)]
    source_name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    prep_time: Option<String>,
    #[serde(default)]
    cook_time: Option<String>,
    #[serde(default)]
    total_time: Option<String>,
    #[serde(default)]
    servings: Option<u32>,
    #[serde(default)]
    notes: Option<String>,
    ingredients: Vec<String>,
    instructions: Vec<String>,
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/golden")
}

fn load_test_cases() -> Vec<(String, TestCase)> {
    let pattern = fixtures_dir().join("*.json");
    let pattern_str = pattern.to_string_lossy();

    let mut cases = Vec::new();
    for entry in glob(&pattern_str).expect("Failed to read glob pattern") {
        let path = entry.expect("Failed to read directory entry");
        let name = path.file_stem().unwrap().to_string_lossy().into_owned();
        let content = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
        let case: TestCase = serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse {}: {}", path.display(), e));
        cases.push((name, case));
    }

    assert!(!cases.is_empty(), "No test fixtures found in {:?}", fixtures_dir());
    cases
}

/// Run the same extractor chain the orchestrator uses for fetched HTML.
fn run_extraction(html: &str, source_url: &str) -> Option<(ExtractedRecipe, ExtractionMethod)> {
    if is_social_url(source_url) {
        if let Some(recipe) = extract_social(html, source_url) {
            return Some((recipe.finalize(), ExtractionMethod::SocialCaption));
        }
    }
    extract_from_html(html, source_url).map(|(recipe, method)| (recipe.finalize(), method))
}

#[test]
fn test_extraction_golden_files() {
    for (name, case) in load_test_cases() {
        println!("Testing: {}", name);

        let html_path = fixtures_dir().join(&case.html_fixture);
        let html = fs::read_to_string(&html_path).unwrap_or_else(|e| {
            panic!("Failed to read HTML fixture {}: {}", html_path.display(), e)
        });

        let (recipe, method) = run_extraction(&html, &case.source_url)
            .unwrap_or_else(|| panic!("No recipe extracted for {}", name));
        let expected = &case.expected;

        assert_eq!(method, expected.method, "Method mismatch for {}", name);
        assert_eq!(recipe.title, expected.title, "Title mismatch for {}", name);
        assert_eq!(recipe.source_url, case.source_url, "Source URL mismatch for {}", name);
        assert_eq!(recipe.source_name, expected.source_name, "Source name mismatch for {}", name);
        assert_eq!(recipe.image_url, expected.image_url, "Image mismatch for {}", name);
        assert_eq!(recipe.prep_time, expected.prep_time, "Prep time mismatch for {}", name);
        assert_eq!(recipe.cook_time, expected.cook_time, "Cook time mismatch for {}", name);
        assert_eq!(recipe.total_time, expected.total_time, "Total time mismatch for {}", name);
        assert_eq!(recipe.servings, expected.servings, "Servings mismatch for {}", name);
        assert_eq!(recipe.notes, expected.notes, "Notes mismatch for {}", name);
        assert_eq!(
            recipe.ingredients, expected.ingredients,
            "Ingredients mismatch for {}\n\nExpected:\n{:#?}\n\nActual:\n{:#?}",
            name, expected.ingredients, recipe.ingredients
        );
        assert_eq!(
            recipe.instructions, expected.instructions,
            "Instructions mismatch for {}",
            name
        );
    }
}

#[test]
fn test_golden_outputs_hold_record_invariants() {
    for (name, case) in load_test_cases() {
        let html = fs::read_to_string(fixtures_dir().join(&case.html_fixture)).unwrap();
        let (recipe, _) = run_extraction(&html, &case.source_url).unwrap();

        assert!(!recipe.title.is_empty(), "{name}: empty title");
        for line in recipe.ingredients.iter().chain(&recipe.instructions) {
            assert_eq!(line, line.trim(), "{name}: untrimmed line");
            assert!(!line.contains('<'), "{name}: markup in {line:?}");
        }
        for time in [&recipe.prep_time, &recipe.cook_time, &recipe.total_time]
            .into_iter()
            .flatten()
        {
            assert!(!time.starts_with("PT"), "{name}: raw ISO duration {time}");
        }
        if let Some(image) = &recipe.image_url {
            assert!(image.starts_with("http"), "{name}: bad image {image}");
            assert_ne!(image, &recipe.source_url);
        }
    }
}
