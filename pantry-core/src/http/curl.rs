//! Subprocess fetch through the system `curl` binary.
//!
//! Some CDNs fingerprint the TLS handshake of Rust HTTP stacks and serve a
//! block page; curl's handshake usually passes.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::FetchError;

use super::charset::decode_body;
use super::client::{FetchRequest, FetchResponse, HttpClient, DEFAULT_MAX_BODY_BYTES};

/// Separates the page body from the status code curl appends.
const STATUS_MARKER: &str = "\n__PANTRY_HTTP_STATUS__:";

/// curl's exit code for `--max-time` expiry.
const CURL_TIMEOUT_EXIT: i32 = 28;

pub struct CurlClient {
    binary: String,
    max_body_bytes: usize,
}

impl CurlClient {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    fn build_command(&self, request: &FetchRequest) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("--silent")
            .arg("--location")
            .arg("--compressed")
            .arg("--max-time")
            .arg(request.timeout.as_secs().max(1).to_string())
            .arg("--write-out")
            .arg(format!("{STATUS_MARKER}%{{http_code}}"));
        for (name, value) in &request.headers {
            command.arg("-H").arg(format!("{name}: {value}"));
        }
        command
            .arg(&request.url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }

    async fn run(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let mut child = self
            .build_command(request)
            .spawn()
            .map_err(|e| FetchError::Subprocess(format!("failed to spawn {}: {e}", self.binary)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::Subprocess("curl stdout unavailable".to_string()))?;

        // Read one byte past the cap (plus the status trailer) so overflow is detectable.
        let limit = (self.max_body_bytes + STATUS_MARKER.len() + 4) as u64;
        let mut output = Vec::new();
        (&mut stdout)
            .take(limit + 1)
            .read_to_end(&mut output)
            .await
            .map_err(|e| FetchError::Subprocess(e.to_string()))?;

        if output.len() as u64 > limit {
            let _ = child.start_kill();
            return Err(FetchError::BodyTooLarge(self.max_body_bytes));
        }

        let status = child
            .wait()
            .await
            .map_err(|e| FetchError::Subprocess(e.to_string()))?;

        if !status.success() {
            return match status.code() {
                Some(CURL_TIMEOUT_EXIT) => Err(FetchError::Timeout(request.timeout)),
                Some(code) => Err(FetchError::Subprocess(format!("curl exited with {code}"))),
                None => Err(FetchError::Subprocess("curl terminated by signal".to_string())),
            };
        }

        let (body, http_status) = split_status_trailer(&output)?;
        if body.len() > self.max_body_bytes {
            return Err(FetchError::BodyTooLarge(self.max_body_bytes));
        }

        Ok(FetchResponse {
            status: http_status,
            body: decode_body(body, None),
        })
    }
}

#[async_trait]
impl HttpClient for CurlClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        match tokio::time::timeout(request.timeout, self.run(request)).await {
            Ok(result) => result,
            // Dropping the future drops the child, which kills it.
            Err(_) => Err(FetchError::Timeout(request.timeout)),
        }
    }
}

fn split_status_trailer(output: &[u8]) -> Result<(&[u8], u16), FetchError> {
    let marker = STATUS_MARKER.as_bytes();
    let position = output
        .windows(marker.len())
        .rposition(|window| window == marker)
        .ok_or_else(|| FetchError::Subprocess("missing status trailer".to_string()))?;

    let code = std::str::from_utf8(&output[position + marker.len()..])
        .ok()
        .and_then(|s| s.trim().parse::<u16>().ok())
        .ok_or_else(|| FetchError::Subprocess("unreadable status trailer".to_string()))?;

    Ok((&output[..position], code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_split_status_trailer() {
        let output = b"<html>ok</html>\n__PANTRY_HTTP_STATUS__:200";
        let (body, status) = split_status_trailer(output).unwrap();
        assert_eq!(body, b"<html>ok</html>");
        assert_eq!(status, 200);
    }

    #[test]
    fn test_split_status_trailer_missing() {
        assert!(split_status_trailer(b"<html></html>").is_err());
    }

    #[test]
    fn test_command_carries_headers_and_deadline() {
        let client = CurlClient::new("curl");
        let request = FetchRequest::get("https://example.com/", Duration::from_secs(15))
            .header("Referer", "https://www.google.com/");
        let command = client.build_command(&request);
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert!(args.windows(2).any(|w| w[0] == "--max-time" && w[1] == "15"));
        assert!(args.contains(&"Referer: https://www.google.com/".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_subprocess_error() {
        let client = CurlClient::new("/nonexistent/pantry-curl");
        let request = FetchRequest::get("https://example.com/", Duration::from_secs(1));
        let result = client.fetch(&request).await;
        assert!(matches!(result, Err(FetchError::Subprocess(_))));
    }
}
