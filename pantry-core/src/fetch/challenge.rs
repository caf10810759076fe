//! Bot-challenge interstitial detection.
//!
//! Anti-bot vendors answer with HTTP 200 as often as 403/503, so the
//! status code is ignored and only the markup is inspected.

/// Interstitial copy shared by most challenge pages.
const CHALLENGE_PHRASES: &[&str] = &[
    "just a moment",
    "checking your browser",
    "attention required",
    "please verify you are a human",
    "pardon our interruption",
];

/// Vendor markers that confirm a phrase hit is an interstitial.
const PROVIDER_FINGERPRINTS: &[&str] = &[
    // Cloudflare
    "cf_chl",
    "cf-browser-verification",
    "challenge-platform",
    "__cf_bm",
    "cdn-cgi/challenge",
    // PerimeterX
    "_pxappid",
    "_pxhd",
    "px-captcha",
    // DataDome
    "captcha-delivery.com",
    // Imperva
    "_incapsula_resource",
];

/// Markers specific enough to condemn a page on their own.
const STRONG_FINGERPRINTS: &[&str] = &[
    "cf-browser-verification",
    "px-captcha",
    "captcha-delivery.com",
    "_incapsula_resource",
];

/// Returns true when the page is a bot-check interstitial rather than content.
pub fn is_challenge(html: &str) -> bool {
    let haystack = html.to_ascii_lowercase();

    if STRONG_FINGERPRINTS.iter().any(|f| haystack.contains(f)) {
        return true;
    }

    CHALLENGE_PHRASES.iter().any(|p| haystack.contains(p))
        && PROVIDER_FINGERPRINTS.iter().any(|f| haystack.contains(f))
}
