use serde::{Deserialize, Serialize};

use crate::normalize::{clean_text, resolve_image_url, source_name};

/// Title used when no source yields a usable one.
pub const DEFAULT_TITLE: &str = "Untitled Recipe";

/// The canonical recipe record every extraction path converges on.
///
/// A value object: it has no identity of its own. The persistence layer
/// assigns ids and ownership after extraction completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecipe {
    pub title: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub source_name: Option<String>,
    pub total_time: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub servings: Option<u32>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    pub notes: Option<String>,
    /// Storage paths of uploaded page images (document imports only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_images: Vec<String>,
}

impl ExtractedRecipe {
    /// Start an empty record for the given source, deriving `source_name`.
    pub fn new(source_url: &str) -> Self {
        Self {
            title: String::new(),
            image_url: None,
            source_url: source_url.trim().to_string(),
            source_name: source_name(source_url),
            total_time: None,
            prep_time: None,
            cook_time: None,
            servings: None,
            ingredients: Vec::new(),
            instructions: Vec::new(),
            notes: None,
            source_images: Vec::new(),
        }
    }

    /// True when neither ingredients nor instructions were recovered.
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty() && self.instructions.is_empty()
    }

    /// Enforce the record invariants: trimmed strings, no empty list
    /// entries, a non-empty title and a validated image URL.
    pub fn finalize(mut self) -> Self {
        self.title = clean_text(&self.title);
        if self.title.is_empty() {
            self.title = DEFAULT_TITLE.to_string();
        }

        self.image_url = self
            .image_url
            .take()
            .and_then(|candidate| resolve_image_url(&candidate, &self.source_url));

        self.source_url = self.source_url.trim().to_string();
        self.source_name = trimmed(self.source_name.take());
        self.total_time = trimmed(self.total_time.take());
        self.prep_time = trimmed(self.prep_time.take());
        self.cook_time = trimmed(self.cook_time.take());
        self.notes = trimmed(self.notes.take());
        self.servings = self.servings.filter(|n| *n > 0);

        self.ingredients = clean_list(std::mem::take(&mut self.ingredients));
        self.instructions = clean_list(std::mem::take(&mut self.instructions));
        self.source_images = clean_list(std::mem::take(&mut self.source_images));

        self
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| clean_text(&s))
        .filter(|s| !s.is_empty())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .iter()
        .map(|s| clean_text(s))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Identifies which extractor produced the recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    JsonLd,
    Heuristic,
    SocialCaption,
    VideoTranscript,
    VideoDescription,
    Document,
    Text,
}

/// One step of the content fetcher's fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    Direct,
    Subprocess,
    RenderingProxy,
    Archive,
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStrategy::Direct => "direct",
            FetchStrategy::Subprocess => "subprocess",
            FetchStrategy::RenderingProxy => "rendering_proxy",
            FetchStrategy::Archive => "archive",
        }
    }
}

/// Result of attempting a single fetch strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchAttempt {
    pub strategy: FetchStrategy,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchAttempt {
    pub fn succeeded(strategy: FetchStrategy) -> Self {
        Self {
            strategy,
            success: true,
            error: None,
        }
    }

    pub fn failed(strategy: FetchStrategy, error: impl Into<String>) -> Self {
        Self {
            strategy,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// How a recipe was obtained, for logging and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub method: ExtractionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_strategy: Option<FetchStrategy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fetch_attempts: Vec<FetchAttempt>,
}

impl ExtractionReport {
    pub fn without_fetch(method: ExtractionMethod) -> Self {
        Self {
            method,
            fetch_strategy: None,
            fetch_attempts: Vec::new(),
        }
    }
}
