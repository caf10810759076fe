//! Response body decoding.
//!
//! Both the direct client and the curl subprocess hand back raw bytes. The
//! charset comes from the `Content-Type` header when present, otherwise from
//! a `<meta charset>` declaration near the top of the document.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;

/// Bytes scanned for a meta charset declaration.
const META_SCAN_LEN: usize = 2048;

static META_CHARSET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:-]+)"#)
        .expect("Invalid meta charset regex")
});

/// Decode a response body to UTF-8.
///
/// Unknown or undeclared encodings fall back to lossy UTF-8, so this never
/// fails; a page with a few mangled characters is still worth extracting.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_meta(bytes));

    match encoding {
        Some(enc) if enc != UTF_8 => {
            let (decoded, _, had_errors) = enc.decode(bytes);
            if had_errors {
                tracing::debug!(encoding = enc.name(), "replacement characters in decoded body");
            }
            decoded.into_owned()
        }
        _ => {
            let text = String::from_utf8_lossy(bytes);
            text.strip_prefix('\u{feff}')
                .map(str::to_string)
                .unwrap_or_else(|| text.into_owned())
        }
    }
}

/// "text/html; charset=iso-8859-1" -> windows-1252
fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    let lower = content_type.to_ascii_lowercase();
    let label = lower
        .split("charset=")
        .nth(1)?
        .trim_start_matches(['"', '\''])
        .split(['"', '\'', ';', ',', ' '])
        .next()?
        .trim();
    if label.is_empty() {
        return None;
    }
    Encoding::for_label(label.as_bytes())
}

fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SCAN_LEN)];
    let caps = META_CHARSET_REGEX.captures(head)?;
    Encoding::for_label(caps.get(1)?.as_bytes())
}
