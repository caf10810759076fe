//! Extraction orchestrator: classify the input, pick a path, converge on
//! [`ExtractedRecipe`].
//!
//! Dispatch order for URLs is video platform, then social caption, then a
//! generic web page (JSON-LD before selector cascades). Documents and
//! pasted text go straight to the AI adapter. Nothing here retries; batch
//! callers wrap calls in [`crate::retry::with_retry`].

use std::sync::Arc;

use tracing::Instrument;

use crate::ai::{self, AiClient, AiConfig, AnthropicClient, ConfigError, FormatKind};
use crate::document::load_documents;
use crate::error::ExtractError;
use crate::extract::{extract_from_html, extract_social, is_social_url};
use crate::fetch::{validate_url, ContentFetcher, FetchOutcome, FetcherBuilder};
use crate::normalize::clean_text;
use crate::storage::{LocalObjectStore, ObjectStore};
use crate::types::{ExtractedRecipe, ExtractionMethod, ExtractionReport};
use crate::video::{
    is_video_url, thumbnail_url, TranscriptSource, VideoResolver, VideoTextSource,
    YouTubeTranscripts,
};

/// What kind of input the user submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Video,
    Social,
    WebPage,
    Text,
}

pub fn classify_input(input: &str) -> InputKind {
    let input = input.trim();
    if is_video_url(input) {
        InputKind::Video
    } else if is_social_url(input) {
        InputKind::Social
    } else if validate_url(input).is_ok() {
        InputKind::WebPage
    } else {
        InputKind::Text
    }
}

/// Builder for [`RecipeExtractor`].
#[derive(Default)]
pub struct RecipeExtractorBuilder {
    fetcher: Option<ContentFetcher>,
    transcripts: Option<Arc<dyn TranscriptSource>>,
    ai: Option<Arc<dyn AiClient>>,
    store: Option<Arc<dyn ObjectStore>>,
}

impl RecipeExtractorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetcher(mut self, fetcher: ContentFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn transcripts(mut self, transcripts: Arc<dyn TranscriptSource>) -> Self {
        self.transcripts = Some(transcripts);
        self
    }

    pub fn ai_client(mut self, ai: Arc<dyn AiClient>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Fill any missing collaborator from the environment.
    ///
    /// Fails when no AI client was supplied and `ANTHROPIC_API_KEY` is
    /// unset. A missing object store only fails document extraction.
    pub fn build(self) -> Result<RecipeExtractor, ExtractError> {
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => FetcherBuilder::from_env().build()?,
        };
        let ai: Arc<dyn AiClient> = match self.ai {
            Some(ai) => ai,
            None => Arc::new(AnthropicClient::new(AiConfig::from_env()?)?),
        };
        let store: Option<Arc<dyn ObjectStore>> = match self.store {
            Some(store) => Some(store),
            None => LocalObjectStore::from_env()
                .ok()
                .map(|s| Arc::new(s) as Arc<dyn ObjectStore>),
        };
        let transcripts: Arc<dyn TranscriptSource> = match self.transcripts {
            Some(transcripts) => transcripts,
            None => Arc::new(YouTubeTranscripts::new(fetcher.http_client())),
        };

        let video = VideoResolver::new(fetcher.http_client(), transcripts);
        Ok(RecipeExtractor {
            fetcher,
            video,
            ai,
            store,
        })
    }
}

/// Entry point for every extraction modality.
pub struct RecipeExtractor {
    fetcher: ContentFetcher,
    video: VideoResolver,
    ai: Arc<dyn AiClient>,
    store: Option<Arc<dyn ObjectStore>>,
}

impl RecipeExtractor {
    pub fn builder() -> RecipeExtractorBuilder {
        RecipeExtractorBuilder::new()
    }

    /// Production wiring from environment variables.
    pub fn from_env() -> Result<Self, ExtractError> {
        RecipeExtractorBuilder::new().build()
    }

    /// Extract a recipe from any URL: video, social post or web page.
    pub async fn extract_recipe(&self, url: &str) -> Result<ExtractedRecipe, ExtractError> {
        self.extract_recipe_with_report(url).await.map(|(recipe, _)| recipe)
    }

    pub async fn extract_recipe_with_report(
        &self,
        url: &str,
    ) -> Result<(ExtractedRecipe, ExtractionReport), ExtractError> {
        let kind = classify_input(url);
        let span = tracing::info_span!("extract_recipe", url = %url.trim(), ?kind);
        let result = match kind {
            InputKind::Video => self.video_path(url).instrument(span.clone()).await,
            InputKind::Social => self.social_path(url).instrument(span.clone()).await,
            InputKind::WebPage => self.web_path(url).instrument(span.clone()).await,
            InputKind::Text => Err(ExtractError::InvalidInput(
                "expected an http(s) URL".to_string(),
            )),
        };
        span.in_scope(|| log_outcome(&result));
        result
    }

    /// Extract a recipe from a YouTube URL via its transcript or description.
    pub async fn extract_recipe_from_video(
        &self,
        url: &str,
    ) -> Result<ExtractedRecipe, ExtractError> {
        self.extract_recipe_from_video_with_report(url)
            .await
            .map(|(recipe, _)| recipe)
    }

    pub async fn extract_recipe_from_video_with_report(
        &self,
        url: &str,
    ) -> Result<(ExtractedRecipe, ExtractionReport), ExtractError> {
        let span = tracing::info_span!("extract_recipe_from_video", url = %url.trim());
        let result = self.video_path(url).instrument(span.clone()).await;
        span.in_scope(|| log_outcome(&result));
        result
    }

    /// Extract one recipe from uploaded images and PDFs, given their storage paths.
    pub async fn extract_from_documents(
        &self,
        paths: &[String],
    ) -> Result<ExtractedRecipe, ExtractError> {
        self.extract_from_documents_with_report(paths)
            .await
            .map(|(recipe, _)| recipe)
    }

    pub async fn extract_from_documents_with_report(
        &self,
        paths: &[String],
    ) -> Result<(ExtractedRecipe, ExtractionReport), ExtractError> {
        let span = tracing::info_span!("extract_from_documents", documents = paths.len());
        let result = self.documents_path(paths).instrument(span.clone()).await;
        span.in_scope(|| log_outcome(&result));
        result
    }

    /// Structure pasted free text into a recipe.
    pub async fn extract_from_text(&self, text: &str) -> Result<ExtractedRecipe, ExtractError> {
        self.extract_from_text_with_report(text)
            .await
            .map(|(recipe, _)| recipe)
    }

    pub async fn extract_from_text_with_report(
        &self,
        text: &str,
    ) -> Result<(ExtractedRecipe, ExtractionReport), ExtractError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractError::InvalidInput("text is empty".to_string()));
        }

        let span = tracing::info_span!("extract_from_text", chars = text.len());
        let result = self.text_path(text).instrument(span.clone()).await;
        span.in_scope(|| log_outcome(&result));
        result
    }

    /// Split a pasted ingredient or instruction block into clean lines.
    pub async fn format_text(
        &self,
        kind: FormatKind,
        text: &str,
    ) -> Result<Vec<String>, ExtractError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractError::InvalidInput("text is empty".to_string()));
        }

        let span = tracing::info_span!("format_text", kind = kind.as_str());
        let lines = ai::format_text(self.ai.as_ref(), kind, text)
            .instrument(span)
            .await?;
        Ok(lines
            .iter()
            .map(|l| clean_text(l))
            .filter(|l| !l.is_empty())
            .collect())
    }

    async fn documents_path(
        &self,
        paths: &[String],
    ) -> Result<(ExtractedRecipe, ExtractionReport), ExtractError> {
        let store = self
            .store
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("PANTRY_STORAGE_ROOT".to_string()))?;
        let documents = load_documents(store, paths).await?;
        let blocks = documents.iter().map(|d| d.content_block()).collect();

        let mut recipe = ai::extract_from_documents(self.ai.as_ref(), blocks)
            .await?
            .into_recipe("");
        recipe.source_images = paths.to_vec();

        Ok((
            recipe.finalize(),
            ExtractionReport::without_fetch(ExtractionMethod::Document),
        ))
    }

    async fn text_path(
        &self,
        text: &str,
    ) -> Result<(ExtractedRecipe, ExtractionReport), ExtractError> {
        let recipe = ai::parse_dump(self.ai.as_ref(), text).await?.into_recipe("");
        Ok((
            recipe.finalize(),
            ExtractionReport::without_fetch(ExtractionMethod::Text),
        ))
    }

    async fn web_path(
        &self,
        url: &str,
    ) -> Result<(ExtractedRecipe, ExtractionReport), ExtractError> {
        let url = validate_url(url)?;
        let outcome = self.fetcher.fetch(&url).await?;

        match extract_from_html(&outcome.html, &url) {
            Some((recipe, method)) => Ok((recipe.finalize(), fetched_report(method, outcome))),
            None => {
                tracing::debug!("no extractor matched");
                Err(ExtractError::NoRecipe { url })
            }
        }
    }

    async fn social_path(
        &self,
        url: &str,
    ) -> Result<(ExtractedRecipe, ExtractionReport), ExtractError> {
        let url = validate_url(url)?;
        let outcome = self.fetcher.fetch(&url).await?;

        if let Some(recipe) = extract_social(&outcome.html, &url) {
            return Ok((
                recipe.finalize(),
                fetched_report(ExtractionMethod::SocialCaption, outcome),
            ));
        }

        // Some posts link to pages that carry their own structured data
        tracing::debug!("caption held no recipe, trying page extractors");
        match extract_from_html(&outcome.html, &url) {
            Some((recipe, method)) => Ok((recipe.finalize(), fetched_report(method, outcome))),
            None => Err(ExtractError::NoRecipe { url }),
        }
    }

    async fn video_path(
        &self,
        url: &str,
    ) -> Result<(ExtractedRecipe, ExtractionReport), ExtractError> {
        let video = self.video.resolve(url).await?;

        let ai_recipe = ai::extract_from_video(self.ai.as_ref(), &video.title, &video.text).await?;
        let mut recipe = ai_recipe.into_recipe(url);
        if recipe.title.trim().is_empty() {
            recipe.title = video.title.clone();
        }
        recipe.image_url = Some(thumbnail_url(&video.video_id));

        let method = match video.source {
            VideoTextSource::Transcript => ExtractionMethod::VideoTranscript,
            VideoTextSource::Description => ExtractionMethod::VideoDescription,
        };
        Ok((recipe.finalize(), ExtractionReport::without_fetch(method)))
    }
}

fn fetched_report(method: ExtractionMethod, outcome: FetchOutcome) -> ExtractionReport {
    ExtractionReport {
        method,
        fetch_strategy: Some(outcome.strategy),
        fetch_attempts: outcome.attempts,
    }
}

fn log_outcome(result: &Result<(ExtractedRecipe, ExtractionReport), ExtractError>) {
    match result {
        Ok((recipe, report)) => tracing::info!(
            title = %recipe.title,
            method = ?report.method,
            ingredients = recipe.ingredients.len(),
            instructions = recipe.instructions.len(),
            "recipe extracted"
        ),
        Err(e) => tracing::info!(error = %e, "extraction failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_input() {
        assert_eq!(
            classify_input("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            InputKind::Video
        );
        assert_eq!(classify_input("https://youtu.be/dQw4w9WgXcQ"), InputKind::Video);
        assert_eq!(
            classify_input("https://www.instagram.com/p/abc123/"),
            InputKind::Social
        );
        assert_eq!(
            classify_input("  https://example.com/recipes/pie  "),
            InputKind::WebPage
        );
        assert_eq!(classify_input("2 cups flour, 1 egg"), InputKind::Text);
        assert_eq!(classify_input("ftp://example.com/pie"), InputKind::Text);
    }
}
