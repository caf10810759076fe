//! Batch extraction over a list of URLs.
//!
//! URLs run sequentially. Each goes through the retry wrapper, so a rate
//! limit or timeout costs a short wait instead of the whole batch.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use pantry_core::{with_retry, RecipeExtractor, RetryPolicy};
use serde_json::json;

/// Parse a URL list: one per line, `#` comments and blank lines ignored.
fn read_urls(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

pub async fn seed(urls_file: &Path, max_retries: u32, backoff_secs: u64) -> Result<()> {
    let content = fs::read_to_string(urls_file)
        .with_context(|| format!("Failed to read URL list: {}", urls_file.display()))?;
    let urls = read_urls(&content);
    if urls.is_empty() {
        anyhow::bail!("No URLs found in {}", urls_file.display());
    }

    let extractor = RecipeExtractor::from_env().context("Failed to set up extractor")?;
    let policy = RetryPolicy {
        max_retries,
        base_delay: Duration::from_secs(backoff_secs),
    };

    let mut succeeded = 0;
    let mut failed = 0;

    for (i, url) in urls.iter().enumerate() {
        eprintln!("[{}/{}] {}", i + 1, urls.len(), url);
        let extractor = &extractor;
        let result = with_retry(policy, move || extractor.extract_recipe_with_report(url)).await;

        let line = match result {
            Ok((recipe, report)) => {
                succeeded += 1;
                json!({ "url": url, "recipe": recipe, "report": report })
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(%url, error = ?e, "extraction failed");
                json!({ "url": url, "error": e.user_message() })
            }
        };
        println!("{}", serde_json::to_string(&line)?);
    }

    eprintln!("Seeded {} recipes ({} failed)", succeeded, failed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_urls_skips_comments_and_blanks() {
        let content = "# weeknight\nhttps://example.com/a\n\n  https://example.com/b  \n#https://skipped";
        assert_eq!(
            read_urls(content),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }
}
