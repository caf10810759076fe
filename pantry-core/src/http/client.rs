//! HTTP client trait and implementations.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::FetchError;

use super::charset::decode_body;

/// Bodies larger than this are rejected rather than buffered.
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// A single GET request: target, headers and a hard deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and decoded body of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP clients, enabling mockability in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET. Non-2xx statuses are returned, not raised; only
    /// transport failures and timeouts are errors.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// Direct HTTP client backed by reqwest.
pub struct ReqwestClient {
    inner: reqwest::Client,
    max_body_bytes: usize,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_max_body_bytes(DEFAULT_MAX_BODY_BYTES)
    }

    pub fn with_max_body_bytes(max_body_bytes: usize) -> Result<Self, FetchError> {
        let inner = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            inner,
            max_body_bytes,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let parsed = reqwest::Url::parse(&request.url)
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let mut builder = self.inner.get(parsed).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let to_fetch_error = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(request.timeout)
            } else {
                // The request URL can carry credentials in its query string
                FetchError::RequestFailed(e.without_url())
            }
        };

        let response = builder.send().await.map_err(to_fetch_error)?;
        let status = response.status().as_u16();

        if let Some(len) = response.content_length() {
            if len as usize > self.max_body_bytes {
                return Err(FetchError::BodyTooLarge(self.max_body_bytes));
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(to_fetch_error)?;
        if bytes.len() > self.max_body_bytes {
            return Err(FetchError::BodyTooLarge(self.max_body_bytes));
        }

        tracing::debug!(url = %request.url, status, bytes = bytes.len(), "network: fetched");

        Ok(FetchResponse {
            status,
            body: decode_body(&bytes, content_type.as_deref()),
        })
    }
}

/// Mock response for testing.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// 200 with the given body.
    Html(String),
    /// Arbitrary status and body.
    Status(u16, String),
    /// Transport failure.
    Error(String),
    /// Deadline exceeded.
    Timeout,
}

/// Mock HTTP client for testing.
///
/// URLs are matched exactly first, then by the longest registered prefix.
/// Every request is recorded so tests can assert on order and headers.
#[derive(Default)]
pub struct MockClient {
    responses: HashMap<String, MockResponse>,
    prefixes: Vec<(String, MockResponse)>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response for a URL.
    pub fn with_response(mut self, url: &str, response: MockResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    /// Add a 200 response for a URL.
    pub fn with_html(self, url: &str, html: &str) -> Self {
        self.with_response(url, MockResponse::Html(html.to_string()))
    }

    /// Add a transport error for a URL.
    pub fn with_error(self, url: &str, error: &str) -> Self {
        self.with_response(url, MockResponse::Error(error.to_string()))
    }

    /// Add a response for every URL starting with `prefix`.
    pub fn with_prefix(mut self, prefix: &str, response: MockResponse) -> Self {
        self.prefixes.push((prefix.to_string(), response));
        self
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// URLs requested so far, in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    fn lookup(&self, url: &str) -> Option<&MockResponse> {
        self.responses.get(url).or_else(|| {
            self.prefixes
                .iter()
                .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, response)| response)
        })
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }

        match self.lookup(&request.url) {
            Some(MockResponse::Html(body)) => Ok(FetchResponse {
                status: 200,
                body: body.clone(),
            }),
            Some(MockResponse::Status(status, body)) => Ok(FetchResponse {
                status: *status,
                body: body.clone(),
            }),
            Some(MockResponse::Error(e)) => Err(FetchError::Connection(e.clone())),
            Some(MockResponse::Timeout) => Err(FetchError::Timeout(request.timeout)),
            None => Err(FetchError::Connection(format!(
                "No mock response for URL: {}",
                request.url
            ))),
        }
    }
}
