//! Recipe extraction pipeline.
//!
//! Turns a URL, a video link, uploaded documents or pasted text into an
//! [`ExtractedRecipe`]. Start with [`RecipeExtractor`].

pub mod ai;
pub mod document;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod http;
pub mod normalize;
pub mod orchestrator;
pub mod retry;
pub mod storage;
pub mod taste;
pub mod types;
pub mod video;

pub use ai::{AiClient, AiError, AnthropicClient, ConfigError, FakeAiClient, FormatKind};
pub use error::{ExtractError, FetchError};
pub use extract::{extract_from_html, extract_heuristic, extract_jsonld, extract_social};
pub use fetch::{ContentFetcher, FetchOutcome, FetcherBuilder, FetcherConfig};
pub use http::{CurlClient, HttpClient, MockClient, MockResponse, ReqwestClient};
pub use orchestrator::{classify_input, InputKind, RecipeExtractor, RecipeExtractorBuilder};
pub use retry::{with_retry, RetryDetail, RetryPolicy};
pub use storage::{LocalObjectStore, MemoryObjectStore, ObjectStore, StorageError};
pub use taste::{ProfileRecipe, TasteProfile};
pub use types::{
    ExtractedRecipe, ExtractionMethod, ExtractionReport, FetchAttempt, FetchStrategy,
    DEFAULT_TITLE,
};
pub use video::{StaticTranscripts, TranscriptSource, VideoResolver, YouTubeTranscripts};
