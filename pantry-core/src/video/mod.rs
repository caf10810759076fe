//! YouTube recipe text: transcript first, video description second.

mod transcript;

pub use transcript::{
    parse_timedtext, select_track, StaticTranscripts, TranscriptError, TranscriptSegment,
    TranscriptSource, YouTubeTranscripts,
};

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use scraper::Html;

use crate::error::ExtractError;
use crate::extract::meta_content;
use crate::http::{browser_headers, FetchRequest, HttpClient, DEFAULT_USER_AGENT};
use crate::normalize::clean_text;

pub const DEFAULT_VIDEO_TITLE: &str = "YouTube Recipe";

/// Transcripts and descriptions shorter than this carry no recipe.
pub const MIN_TEXT_CHARS: usize = 50;

const PLAYER_RESPONSE_MARKERS: &[&str] = &[
    "var ytInitialPlayerResponse = ",
    "ytInitialPlayerResponse = ",
    "ytInitialPlayerResponse=",
];

static VIDEO_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Invalid video id regex"));

/// Where the resolved text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoTextSource {
    Transcript,
    Description,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoText {
    pub video_id: String,
    pub title: String,
    pub text: String,
    pub source: VideoTextSource,
}

/// Extract the 11-character video id from any supported YouTube URL shape.
pub fn parse_video_id(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

    let candidate = match host {
        "youtu.be" => segments.next()?.to_string(),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => match segments.next()? {
            "watch" => parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())?,
            "shorts" | "embed" | "live" => segments.next()?.to_string(),
            _ => return None,
        },
        _ => return None,
    };

    VIDEO_ID_REGEX.is_match(&candidate).then_some(candidate)
}

pub fn is_video_url(url: &str) -> bool {
    parse_video_id(url).is_some()
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")
}

/// Pull the `ytInitialPlayerResponse` object out of a watch page by brace
/// counting, since the blob is embedded in a larger script.
pub fn extract_player_response(html: &str) -> Option<Value> {
    let start = PLAYER_RESPONSE_MARKERS
        .iter()
        .find_map(|marker| html.find(marker).map(|pos| pos + marker.len()))?;
    let remaining = &html[start..];
    if !remaining.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in remaining.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return serde_json::from_str(&remaining[..=i]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

/// Resolves a video URL to recipe-bearing text.
pub struct VideoResolver {
    http: Arc<dyn HttpClient>,
    transcripts: Arc<dyn TranscriptSource>,
    timeout: Duration,
}

impl VideoResolver {
    pub fn new(http: Arc<dyn HttpClient>, transcripts: Arc<dyn TranscriptSource>) -> Self {
        Self {
            http,
            transcripts,
            timeout: Duration::from_secs(10),
        }
    }

    pub async fn resolve(&self, url: &str) -> Result<VideoText, ExtractError> {
        let video_id =
            parse_video_id(url).ok_or_else(|| ExtractError::UnsupportedVideo(url.to_string()))?;

        let title = self.fetch_title(&video_id).await;

        if let Some(text) = self.fetch_transcript_text(&video_id).await {
            tracing::info!(%video_id, chars = text.len(), "using video transcript");
            return Ok(VideoText {
                video_id,
                title,
                text,
                source: VideoTextSource::Transcript,
            });
        }

        if let Some(text) = self.fetch_description(&video_id).await {
            tracing::info!(%video_id, chars = text.len(), "using video description");
            return Ok(VideoText {
                video_id,
                title,
                text,
                source: VideoTextSource::Description,
            });
        }

        tracing::warn!(%video_id, "no transcript or description available");
        Err(ExtractError::VideoUnavailable { video_id })
    }

    /// Video title from oEmbed, or the default title on any failure.
    async fn fetch_title(&self, video_id: &str) -> String {
        let oembed = match url::Url::parse_with_params(
            "https://www.youtube.com/oembed",
            &[("url", watch_url(video_id).as_str()), ("format", "json")],
        ) {
            Ok(u) => u.to_string(),
            Err(_) => return DEFAULT_VIDEO_TITLE.to_string(),
        };

        let response = match self.http.fetch(&FetchRequest::get(oembed, self.timeout)).await {
            Ok(r) if r.is_success() => r,
            Ok(r) => {
                tracing::debug!(status = r.status, "oEmbed lookup failed");
                return DEFAULT_VIDEO_TITLE.to_string();
            }
            Err(e) => {
                tracing::debug!(error = %e, "oEmbed lookup failed");
                return DEFAULT_VIDEO_TITLE.to_string();
            }
        };

        serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|v| v.get("title").and_then(Value::as_str).map(clean_text))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_VIDEO_TITLE.to_string())
    }

    async fn fetch_transcript_text(&self, video_id: &str) -> Option<String> {
        for language in [None, Some("en")] {
            match self.transcripts.fetch_transcript(video_id, language).await {
                Ok(segments) => {
                    let text = clean_text(
                        &segments
                            .iter()
                            .map(|s| s.text.as_str())
                            .collect::<Vec<_>>()
                            .join(" "),
                    );
                    if text.chars().count() >= MIN_TEXT_CHARS {
                        return Some(text);
                    }
                    tracing::debug!(?language, chars = text.len(), "transcript too short");
                }
                Err(e) => tracing::debug!(?language, error = %e, "transcript unavailable"),
            }
        }
        None
    }

    async fn fetch_description(&self, video_id: &str) -> Option<String> {
        let request = FetchRequest::get(watch_url(video_id), self.timeout)
            .with_headers(browser_headers(DEFAULT_USER_AGENT));
        let page = match self.http.fetch(&request).await {
            Ok(page) if page.is_success() => page,
            Ok(page) => {
                tracing::debug!(status = page.status, "watch page fetch failed");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "watch page fetch failed");
                return None;
            }
        };

        description_from_watch_page(&page.body)
    }
}

/// `videoDetails.shortDescription` from the player response, else the
/// page's meta description. Too-short text is rejected.
pub fn description_from_watch_page(html: &str) -> Option<String> {
    let long_enough = |text: &String| text.chars().count() >= MIN_TEXT_CHARS;

    let from_player = extract_player_response(html)
        .and_then(|player| {
            player
                .pointer("/videoDetails/shortDescription")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
        })
        .filter(long_enough);
    if from_player.is_some() {
        return from_player;
    }

    let document = Html::parse_document(html);
    meta_content(&document, "description").filter(long_enough)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockClient, MockResponse};

    const ID: &str = "dQw4w9WgXcQ";
    const LONG_TEXT: &str = "Today we make a simple tomato soup with two cans of tomatoes, one onion and some basil.";

    #[test]
    fn test_parse_video_id_url_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ&t=42",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ?feature=share",
        ] {
            assert_eq!(parse_video_id(url).as_deref(), Some(ID), "{url}");
        }
    }

    #[test]
    fn test_parse_video_id_rejects_other_urls() {
        assert_eq!(parse_video_id("https://www.youtube.com/channel/UC123"), None);
        assert_eq!(parse_video_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(parse_video_id("https://vimeo.com/123456"), None);
        assert_eq!(parse_video_id("youtube"), None);
    }

    #[test]
    fn test_extract_player_response_nested_and_escaped() {
        let html = r#"<script>var ytInitialPlayerResponse = {"a":{"b":"x \"}\" y"},"c":"é"};var other = {};</script>"#;
        let player = extract_player_response(html).unwrap();
        assert_eq!(player["a"]["b"], "x \"}\" y");
        assert_eq!(player["c"], "é");
    }

    #[test]
    fn test_extract_player_response_unclosed() {
        assert!(extract_player_response(r#"var ytInitialPlayerResponse = {"a":1"#).is_none());
        assert!(extract_player_response("<html></html>").is_none());
    }

    #[test]
    fn test_description_prefers_player_response() {
        let html = format!(
            r#"<html><head><meta name="description" content="Meta description that is certainly long enough to be accepted here."></head>
            <script>var ytInitialPlayerResponse = {{"videoDetails":{{"shortDescription":"{LONG_TEXT}"}}}};</script></html>"#
        );
        assert_eq!(description_from_watch_page(&html).as_deref(), Some(LONG_TEXT));
    }

    #[test]
    fn test_description_falls_back_to_meta_and_rejects_short() {
        let html = format!(
            r#"<html><head><meta name="description" content="{LONG_TEXT}"></head>
            <script>var ytInitialPlayerResponse = {{"videoDetails":{{"shortDescription":"too short"}}}};</script></html>"#
        );
        assert_eq!(description_from_watch_page(&html).as_deref(), Some(LONG_TEXT));

        let short = r#"<html><head><meta name="description" content="tiny"></head></html>"#;
        assert_eq!(description_from_watch_page(short), None);
    }

    fn oembed_client() -> MockClient {
        MockClient::new().with_prefix(
            "https://www.youtube.com/oembed",
            MockResponse::Html(r#"{"title":"Tomato Soup in 10 Minutes"}"#.into()),
        )
    }

    #[tokio::test]
    async fn test_resolver_uses_english_transcript_after_default_fails() {
        let transcripts = StaticTranscripts::new().with_transcript(ID, Some("en"), LONG_TEXT);
        let resolver = VideoResolver::new(Arc::new(oembed_client()), Arc::new(transcripts));

        let text = resolver.resolve(&watch_url(ID)).await.unwrap();
        assert_eq!(text.source, VideoTextSource::Transcript);
        assert_eq!(text.title, "Tomato Soup in 10 Minutes");
        assert_eq!(text.text, LONG_TEXT);
    }

    #[tokio::test]
    async fn test_resolver_short_transcript_falls_back_to_description() {
        let transcripts = StaticTranscripts::new().with_transcript(ID, None, "music playing");
        let page = format!(
            r#"<script>var ytInitialPlayerResponse = {{"videoDetails":{{"shortDescription":"{LONG_TEXT}"}}}};</script>"#
        );
        let client = MockClient::new().with_html(&watch_url(ID), &page);
        let resolver = VideoResolver::new(Arc::new(client), Arc::new(transcripts));

        let text = resolver.resolve(&format!("https://youtu.be/{ID}")).await.unwrap();
        assert_eq!(text.source, VideoTextSource::Description);
        assert_eq!(text.title, DEFAULT_VIDEO_TITLE);
    }

    #[tokio::test]
    async fn test_resolver_no_text_is_video_unavailable() {
        let resolver = VideoResolver::new(
            Arc::new(oembed_client().with_response(&watch_url(ID), MockResponse::Status(404, String::new()))),
            Arc::new(StaticTranscripts::new()),
        );
        let err = resolver.resolve(&watch_url(ID)).await.unwrap_err();
        assert!(matches!(err, ExtractError::VideoUnavailable { .. }));
        assert!(err.user_message().contains("could not be extracted from this video"));
    }

    #[tokio::test]
    async fn test_resolver_rejects_non_video_url() {
        let resolver = VideoResolver::new(Arc::new(MockClient::new()), Arc::new(StaticTranscripts::new()));
        let err = resolver.resolve("https://example.com/").await.unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedVideo(_)));
    }
}
