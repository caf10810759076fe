//! Retry wrapper for batch operations.
//!
//! Batch callers (seeding a list of URLs, extracting a stack of uploads)
//! run items one at a time through [`with_retry`]. Only failures whose text
//! looks transient are retried; everything else propagates on the first try.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::ai::AiError;
use crate::error::ExtractError;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Substrings marking an error as transient.
const TRANSIENT_MARKERS: &[&str] = &["overload", "rate", "timeout", "timed out", "connection"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy with no sleeping between attempts, for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based): linear in the attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// The text of a failure that retry classification looks at.
///
/// User input such as the URL being extracted is never part of it, so a
/// slug like `grated-carrot-salad` cannot make a failure look transient.
pub trait RetryDetail {
    fn retry_detail(&self) -> String;
}

impl RetryDetail for str {
    fn retry_detail(&self) -> String {
        self.to_string()
    }
}

impl RetryDetail for String {
    fn retry_detail(&self) -> String {
        self.clone()
    }
}

impl<T: RetryDetail + ?Sized> RetryDetail for &T {
    fn retry_detail(&self) -> String {
        (**self).retry_detail()
    }
}

impl RetryDetail for AiError {
    fn retry_detail(&self) -> String {
        match self {
            AiError::Unavailable { detail } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl RetryDetail for ExtractError {
    fn retry_detail(&self) -> String {
        match self {
            ExtractError::Ai(e) => e.retry_detail(),
            ExtractError::Http(e) => e.to_string(),
            // The rest name user input (URLs, paths) or are final
            _ => String::new(),
        }
    }
}

/// Whether an error looks transient, judged from its retry detail.
pub fn is_transient<E: RetryDetail + ?Sized>(error: &E) -> bool {
    let text = error.retry_detail().to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Run `operation`, retrying transient failures according to `policy`.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    E: Display + RetryDetail,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && is_transient(&e) => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_secs = delay.as_secs_f64(),
                    error = %e,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_schedule_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
    }

    #[test]
    fn test_is_transient() {
        assert!(is_transient(&"429: rate limited"));
        assert!(is_transient(&"Overloaded"));
        assert!(is_transient(&"request timed out"));
        assert!(!is_transient(&"recipe not found"));
    }

    #[tokio::test]
    async fn test_rate_error_is_retried_twice() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = with_retry(RetryPolicy::immediate(2), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("rate limit exceeded".to_string())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = with_retry(RetryPolicy::immediate(2), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("not found".to_string())
        })
        .await;

        assert_eq!(result.unwrap_err(), "not found");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_url_with_marker_text_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), ExtractError> =
            with_retry(RetryPolicy::immediate(2), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ExtractError::NoRecipe {
                    url: "https://example.com/grated-carrot-salad-connection".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(ExtractError::NoRecipe { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ai_detail_drives_classification() {
        let overloaded = ExtractError::from(AiError::Unavailable {
            detail: "529 overloaded_error".to_string(),
        });
        let refused = ExtractError::from(AiError::Unavailable {
            detail: "401 invalid x-api-key".to_string(),
        });
        assert!(is_transient(&overloaded));
        assert!(!is_transient(&refused));
        assert!(!is_transient(&ExtractError::from(AiError::EmptyResult)));
        assert!(!is_transient(&ExtractError::Storage {
            path: "uploads/separated-eggs.png".to_string(),
            reason: "not found".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(RetryPolicy::immediate(2), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("connection reset".to_string())
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
