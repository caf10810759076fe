//! HTTP transport used by every network-facing component.
//!
//! `HttpClient` is the single fetch seam: the content fetcher, the archive
//! and rendering-proxy strategies, and the video resolver all take one, so
//! tests can swap in `MockClient` without touching the network.

pub(crate) mod charset;
mod client;
mod curl;

pub use client::{
    FetchRequest, FetchResponse, HttpClient, MockClient, MockResponse, ReqwestClient,
    DEFAULT_MAX_BODY_BYTES,
};
pub use curl::CurlClient;

/// Desktop Chrome on macOS. Sites that serve bots a stripped page usually
/// serve this one the real thing.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Referer sent by the subprocess strategy.
pub const SEARCH_REFERER: &str = "https://www.google.com/";

/// Header set a real browser sends on a top-level navigation.
pub fn browser_headers(user_agent: &str) -> Vec<(String, String)> {
    [
        ("User-Agent", user_agent),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Cache-Control", "no-cache"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Sec-Fetch-User", "?1"),
        ("Upgrade-Insecure-Requests", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
