//! Caption transcripts.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::error::FetchError;
use crate::http::{browser_headers, FetchRequest, HttpClient, DEFAULT_USER_AGENT};
use crate::normalize::strip_html;

use super::{extract_player_response, watch_url};

static CAPTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:text|p)\b([^>]*)>(.*?)</(?:text|p)>").expect("Invalid caption regex")
});

static START_ATTR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(start|t)="([\d.]+)""#).expect("Invalid caption start regex")
});

static DURATION_ATTR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\b(dur|d)="([\d.]+)""#).expect("Invalid caption duration regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    /// Offset from the start of the video, in seconds.
    pub start: f64,
    pub duration: f64,
}

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("No transcript available: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Source of ordered caption segments for a video.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// `language` of `None` asks for the video's default track.
    async fn fetch_transcript(
        &self,
        video_id: &str,
        language: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError>;
}

/// Reads caption tracks listed in the watch page's player response and
/// downloads the timedtext document for the chosen one.
pub struct YouTubeTranscripts {
    http: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl YouTubeTranscripts {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscripts {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        language: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        let request = FetchRequest::get(watch_url(video_id), self.timeout)
            .with_headers(browser_headers(DEFAULT_USER_AGENT));
        let page = self.http.fetch(&request).await?;
        if !page.is_success() {
            return Err(TranscriptError::Unavailable(format!(
                "watch page returned HTTP {}",
                page.status
            )));
        }

        let player = extract_player_response(&page.body)
            .ok_or_else(|| TranscriptError::Unavailable("no player response".to_string()))?;
        let track_url = select_track(&player, language).ok_or_else(|| {
            TranscriptError::Unavailable(format!(
                "no caption track for {}",
                language.unwrap_or("default language")
            ))
        })?;

        let response = self
            .http
            .fetch(&FetchRequest::get(track_url, self.timeout))
            .await?;
        if !response.is_success() {
            return Err(TranscriptError::Unavailable(format!(
                "caption track returned HTTP {}",
                response.status
            )));
        }

        let segments = parse_timedtext(&response.body);
        if segments.is_empty() {
            return Err(TranscriptError::Unavailable("empty caption track".to_string()));
        }
        Ok(segments)
    }
}

/// Caption track URL from a player response. Without a language the
/// first listed track is used.
pub fn select_track(player: &Value, language: Option<&str>) -> Option<String> {
    let tracks = player
        .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")?
        .as_array()?;

    let track = match language {
        None => tracks.first()?,
        Some(lang) => tracks.iter().find(|t| {
            t.get("languageCode")
                .and_then(Value::as_str)
                .is_some_and(|code| code == lang || code.starts_with(&format!("{lang}-")))
        })?,
    };

    track
        .get("baseUrl")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Parse a timedtext document (`<text start dur>` or `<p t d>` cues).
pub fn parse_timedtext(xml: &str) -> Vec<TranscriptSegment> {
    CAPTION_REGEX
        .captures_iter(xml)
        .filter_map(|cap| {
            let attrs = cap.get(1).map_or("", |m| m.as_str());
            let is_millis = cap
                .get(0)
                .is_some_and(|m| m.as_str().starts_with("<p"));
            // Cues are escaped once in the XML and often once more inside.
            let text = strip_html(&strip_html(cap.get(2).map_or("", |m| m.as_str())));
            if text.is_empty() {
                return None;
            }

            let scale = if is_millis { 1000.0 } else { 1.0 };
            let number = |re: &Regex| -> f64 {
                re.captures(attrs)
                    .and_then(|c| c.get(2))
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                    .map_or(0.0, |n| n / scale)
            };

            Some(TranscriptSegment {
                text,
                start: number(&START_ATTR_REGEX),
                duration: number(&DURATION_ATTR_REGEX),
            })
        })
        .collect()
}

/// Transcripts held in memory, keyed by video and language.
#[derive(Default)]
pub struct StaticTranscripts {
    transcripts: HashMap<(String, Option<String>), Vec<TranscriptSegment>>,
}

impl StaticTranscripts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transcript; `text` is split into one segment per line.
    pub fn with_transcript(mut self, video_id: &str, language: Option<&str>, text: &str) -> Self {
        let segments = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| TranscriptSegment {
                text: line.trim().to_string(),
                start: i as f64,
                duration: 1.0,
            })
            .collect();
        self.transcripts.insert(
            (video_id.to_string(), language.map(str::to_string)),
            segments,
        );
        self
    }
}

#[async_trait]
impl TranscriptSource for StaticTranscripts {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        language: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        self.transcripts
            .get(&(video_id.to_string(), language.map(str::to_string)))
            .cloned()
            .ok_or_else(|| TranscriptError::Unavailable(format!("no transcript for {video_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockClient;
    use serde_json::json;

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text start="0.5" dur="2.1">Today we&amp;#39;re making</text>
            <text start="2.6" dur="1.9">bread &amp;amp; butter</text>
            <text start="4.5" dur="1"></text>
        </transcript>"#;
        let segments = parse_timedtext(xml);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Today we're making");
        assert_eq!(segments[0].start, 0.5);
        assert_eq!(segments[1].text, "bread & butter");
        assert_eq!(segments[1].duration, 1.9);
    }

    #[test]
    fn test_parse_timedtext_millisecond_format() {
        let xml = r#"<timedtext format="3"><body><p t="1500" d="2000">Hello</p></body></timedtext>"#;
        let segments = parse_timedtext(xml);
        assert_eq!(segments[0].start, 1.5);
        assert_eq!(segments[0].duration, 2.0);
    }

    #[test]
    fn test_select_track() {
        let player = json!({"captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
            {"baseUrl": "https://yt.test/tt?lang=es", "languageCode": "es"},
            {"baseUrl": "https://yt.test/tt?lang=en-US", "languageCode": "en-US"}
        ]}}});
        assert_eq!(select_track(&player, None).as_deref(), Some("https://yt.test/tt?lang=es"));
        assert_eq!(
            select_track(&player, Some("en")).as_deref(),
            Some("https://yt.test/tt?lang=en-US")
        );
        assert_eq!(select_track(&player, Some("fr")), None);
        assert_eq!(select_track(&json!({}), None), None);
    }

    #[tokio::test]
    async fn test_youtube_transcripts_end_to_end() {
        let watch = r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=abcdefghijk","languageCode":"en"}]}}};</script>"#;
        let client = MockClient::new()
            .with_html("https://www.youtube.com/watch?v=abcdefghijk", watch)
            .with_html(
                "https://www.youtube.com/api/timedtext?v=abcdefghijk",
                r#"<transcript><text start="0" dur="1">hi</text></transcript>"#,
            );
        let source = YouTubeTranscripts::new(Arc::new(client));
        let segments = source.fetch_transcript("abcdefghijk", None).await.unwrap();
        assert_eq!(segments[0].text, "hi");
    }

    #[tokio::test]
    async fn test_static_transcripts_keyed_by_language() {
        let source = StaticTranscripts::new().with_transcript("vid", Some("en"), "one\n\ntwo");
        assert!(source.fetch_transcript("vid", None).await.is_err());
        let segments = source.fetch_transcript("vid", Some("en")).await.unwrap();
        assert_eq!(segments.len(), 2);
    }
}
