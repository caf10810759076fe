//! Wayback Machine snapshot lookup.

use serde_json::Value;
use std::time::Duration;

use crate::error::FetchError;
use crate::http::{FetchRequest, HttpClient};

pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://web.archive.org";

/// CDX query for the newest 200-status capture of `target`.
pub fn cdx_url(base_url: &str, target: &str) -> Result<String, FetchError> {
    let url = url::Url::parse_with_params(
        &format!("{}/cdx/search/cdx", base_url.trim_end_matches('/')),
        &[
            ("url", target),
            ("output", "json"),
            ("filter", "statuscode:200"),
            ("limit", "-1"),
        ],
    )
    .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    Ok(url.to_string())
}

/// Raw capture URL. The `id_` suffix returns the original bytes without the
/// archive toolbar or rewritten links.
pub fn snapshot_url(base_url: &str, timestamp: &str, target: &str) -> String {
    format!(
        "{}/web/{timestamp}id_/{target}",
        base_url.trim_end_matches('/')
    )
}

/// Most recent timestamp in a CDX `output=json` body.
///
/// Rows are arrays with the timestamp in the second column when the header
/// row is present (`urlkey, timestamp, ...`) and the first column when a
/// bare `[[timestamp, ...]]` shape is returned, so any all-digit 14-char
/// cell is accepted. The header row never matches.
pub fn latest_timestamp(body: &str) -> Option<String> {
    let rows: Value = serde_json::from_str(body.trim()).ok()?;
    let rows = rows.as_array()?;

    rows.iter()
        .filter_map(|row| row.as_array())
        .filter_map(|row| {
            row.iter()
                .filter_map(|cell| cell.as_str())
                .find(|cell| cell.len() == 14 && cell.chars().all(|c| c.is_ascii_digit()))
        })
        .max()
        .map(|ts| ts.to_string())
}

/// Look up and fetch the newest archived copy of `target`.
pub async fn fetch_snapshot(
    client: &dyn HttpClient,
    base_url: &str,
    target: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    let index = client
        .fetch(&FetchRequest::get(cdx_url(base_url, target)?, timeout))
        .await?;
    if !index.is_success() {
        return Err(FetchError::Connection(format!(
            "archive index returned HTTP {}",
            index.status
        )));
    }

    let timestamp = latest_timestamp(&index.body)
        .ok_or_else(|| FetchError::Connection("no archived snapshot".to_string()))?;
    tracing::debug!(url = %target, %timestamp, "archive: snapshot found");

    let snapshot = client
        .fetch(&FetchRequest::get(
            snapshot_url(base_url, &timestamp, target),
            timeout,
        ))
        .await?;
    if !snapshot.is_success() {
        return Err(FetchError::Connection(format!(
            "archive snapshot returned HTTP {}",
            snapshot.status
        )));
    }
    Ok(snapshot.body)
}
