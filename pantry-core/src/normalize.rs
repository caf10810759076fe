//! Pure normalization helpers: durations, servings, quantities and text hygiene.
//!
//! Nothing in here touches the network. Extractors route every duration,
//! yield and free-text field through these functions so all paths agree on
//! the canonical forms.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use serde_json::Value;

static ISO_DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("Invalid ISO duration regex")
});

/// Cheap shape check: "P" followed by a digit or "T".
static ISO_SHAPE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^P(?:T|\d)").expect("Invalid ISO shape regex"));

static HOURS_TEXT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:hours?|hrs?|h)\b").expect("Invalid hours regex")
});

static MINUTES_TEXT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:minutes?|mins?|m)\b").expect("Invalid minutes regex")
});

static CANONICAL_HOURS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) hr").expect("Invalid canonical hours regex"));

static CANONICAL_MINUTES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) min").expect("Invalid canonical minutes regex"));

static FIRST_INTEGER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid integer regex"));

/// Leading quantity: a decimal, integer, fraction or vulgar fraction,
/// optionally followed by more fraction parts ("2 1/2", "1½", "1 ½").
static QUANTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)((?:\d+\.\d+|\d+(?:/\d+)?|[½¼¾⅓⅔⅛])(?:\s*(?:\d+/\d+|[½¼¾⅓⅔⅛]))*)")
        .expect("Invalid quantity regex")
});

static QUANTITY_PART_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\.\d+|\d+/\d+|\d+|[½¼¾⅓⅔⅛]").expect("Invalid quantity part regex")
});

/// A lead that keeps going as a range or another number ("2-3", "1.5.2").
static QUANTITY_CONTINUATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\s*[-–—]\s*|\s+to\s+|[.,/])\d").expect("Invalid quantity continuation regex")
});

/// Block-level breaks that should become whitespace before tags are stripped.
static BLOCK_BREAK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|li|div|h\d|tr|td)>").expect("Invalid block break regex")
});

/// Render hours and minutes in the canonical `"<h> hr <m> min"` form.
fn render_duration(hours: u64, minutes: u64) -> Option<String> {
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{} hr", hours));
    }
    if minutes > 0 {
        parts.push(format!("{} min", minutes));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Convert an ISO-8601 duration such as `PT1H15M` to `"1 hr 15 min"`.
///
/// Strings that are not ISO-shaped are returned unchanged; real sites put
/// things like "15 minutes" in `prepTime` and that is still useful. A
/// well-formed duration with no hour or minute component yields `None`.
pub fn parse_iso_duration(iso: Option<&str>) -> Option<String> {
    let raw = iso?.trim();
    if raw.is_empty() {
        return None;
    }

    let Some(caps) = ISO_DURATION_REGEX.captures(raw) else {
        return Some(raw.to_string());
    };

    let component = |i: usize| -> Option<u64> {
        caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
    };

    // Values too large to fold into hours are not a real cooking time
    let folded = component(1)
        .and_then(|days| days.checked_mul(24))
        .and_then(|hours| hours.checked_add(component(2)?));
    match (folded, component(3)) {
        (Some(hours), Some(minutes)) => render_duration(hours, minutes),
        _ => Some(raw.to_string()),
    }
}

/// Normalize a free-text or ISO duration to the canonical form.
///
/// "1 hour 30 minutes" and "90 mins" both become `"1 hr 30 min"`. Text with
/// no recognizable hours or minutes is passed through trimmed.
pub fn normalize_time_text(text: &str) -> Option<String> {
    let text = clean_text(text);
    if text.is_empty() {
        return None;
    }

    if ISO_SHAPE_REGEX.is_match(&text) {
        return parse_iso_duration(Some(&text));
    }

    let hours: Option<f64> = HOURS_TEXT_REGEX
        .captures(&text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let minutes: Option<u64> = MINUTES_TEXT_REGEX
        .captures(&text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    if hours.is_none() && minutes.is_none() {
        return Some(text);
    }

    let hour_minutes = (hours.unwrap_or(0.0) * 60.0).round() as u64;
    let total = hour_minutes.saturating_add(minutes.unwrap_or(0));
    render_duration(total / 60, total % 60)
}

/// Read a duration back into whole minutes. Accepts anything
/// [`normalize_time_text`] understands.
pub fn duration_minutes(text: &str) -> Option<u32> {
    let canonical = normalize_time_text(text)?;
    let hours: Option<u32> = CANONICAL_HOURS_REGEX
        .captures(&canonical)
        .and_then(|c| c[1].parse().ok());
    let minutes: Option<u32> = CANONICAL_MINUTES_REGEX
        .captures(&canonical)
        .and_then(|c| c[1].parse().ok());

    if hours.is_none() && minutes.is_none() {
        return None;
    }
    Some(hours.unwrap_or(0) * 60 + minutes.unwrap_or(0))
}

/// Parse a `recipeYield`-style value into a serving count.
///
/// Numbers are taken as-is, strings yield their first integer, arrays
/// recurse into their first element. Everything else is `None`.
pub fn parse_servings(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 1.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0),
        Value::String(s) => parse_servings_text(s),
        Value::Array(items) => items.first().and_then(parse_servings),
        _ => None,
    }
}

/// First positive integer in a piece of text ("Serves 4 people" -> 4).
pub fn parse_servings_text(text: &str) -> Option<u32> {
    FIRST_INTEGER_REGEX
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .filter(|n| *n > 0)
}

fn vulgar_fraction_value(c: char) -> Option<f64> {
    match c {
        '½' => Some(0.5),
        '¼' => Some(0.25),
        '¾' => Some(0.75),
        '⅓' => Some(1.0 / 3.0),
        '⅔' => Some(2.0 / 3.0),
        '⅛' => Some(0.125),
        _ => None,
    }
}

/// Sum the parts of a quantity token: "1 ½" -> 1.5, "2 1/2" -> 2.5.
fn quantity_value(token: &str) -> Option<f64> {
    let mut total = 0.0;
    for part in QUANTITY_PART_REGEX.find_iter(token) {
        let part = part.as_str();
        let value = if let Some((num, den)) = part.split_once('/') {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        } else if let Ok(n) = part.parse::<f64>() {
            n
        } else {
            vulgar_fraction_value(part.chars().next()?)?
        };
        total += value;
    }
    Some(total)
}

fn format_quantity(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        let rendered = format!("{:.1}", value);
        rendered
            .strip_suffix(".0")
            .map(str::to_string)
            .unwrap_or(rendered)
    }
}

/// Multiply the leading quantity of an ingredient line by `ratio`.
///
/// Lines without a numeric lead ("salt to taste") come back untouched, as
/// do ranges ("2-3 cloves"). A ratio of exactly 1 returns the input as-is.
pub fn scale_quantity(line: &str, ratio: f64) -> String {
    if ratio == 1.0 {
        return line.to_string();
    }

    let Some(caps) = QUANTITY_REGEX.captures(line) else {
        return line.to_string();
    };
    let (Some(lead), Some(token)) = (caps.get(1), caps.get(2)) else {
        return line.to_string();
    };
    let Some(value) = quantity_value(token.as_str()) else {
        return line.to_string();
    };

    let rest = &line[token.end()..];
    if QUANTITY_CONTINUATION_REGEX.is_match(rest) {
        return line.to_string();
    }
    format!("{}{}{}", lead.as_str(), format_quantity(value * ratio), rest)
}

/// Collapse runs of whitespace (including non-breaking spaces) and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove markup and decode entities, leaving normalized plain text.
pub fn strip_html(text: &str) -> String {
    if !text.contains('<') && !text.contains('&') {
        return clean_text(text);
    }
    let spaced = BLOCK_BREAK_REGEX.replace_all(text, " ");
    let fragment = Html::parse_fragment(&spaced);
    let plain: String = fragment.root_element().text().collect();
    clean_text(&plain)
}

/// Hostname without a leading `www.`.
pub fn source_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let name = host.strip_prefix("www.").unwrap_or(host);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".gif", ".avif"];

const IMAGE_PATH_HINTS: &[&str] = &[
    "image", "img", "photo", "picture", "/media/", "/uploads/", "format=jpg", "format=webp",
    "format=png",
];

fn looks_like_image(url: &url::Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return true;
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if host.contains("img") || host.contains("image") {
        return true;
    }

    let query = url.query().unwrap_or_default().to_ascii_lowercase();
    IMAGE_PATH_HINTS
        .iter()
        .any(|hint| path.contains(hint) || query.contains(hint))
}

/// Validate an image candidate against the page it came from.
///
/// Relative candidates are resolved against `page_url`. The result must be
/// an `http(s)` URL, differ from the page itself, and plausibly point at an
/// image.
pub fn resolve_image_url(candidate: &str, page_url: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.starts_with("data:") {
        return None;
    }

    let page = url::Url::parse(page_url).ok();
    let resolved = match url::Url::parse(candidate) {
        Ok(u) => u,
        Err(_) => page.as_ref()?.join(candidate).ok()?,
    };

    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    if page.as_ref().is_some_and(|p| p == &resolved) || resolved.as_str() == page_url.trim() {
        return None;
    }
    if !looks_like_image(&resolved) {
        return None;
    }

    Some(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_iso_duration() {
        assert_eq!(
            parse_iso_duration(Some("PT1H15M")),
            Some("1 hr 15 min".to_string())
        );
        assert_eq!(parse_iso_duration(Some("PT45M")), Some("45 min".to_string()));
        assert_eq!(parse_iso_duration(Some("PT2H")), Some("2 hr".to_string()));
        assert_eq!(parse_iso_duration(None), None);
    }

    #[test]
    fn test_parse_iso_duration_passes_through_non_iso() {
        assert_eq!(
            parse_iso_duration(Some("not-iso")),
            Some("not-iso".to_string())
        );
        assert_eq!(
            parse_iso_duration(Some("15 minutes")),
            Some("15 minutes".to_string())
        );
    }

    #[test]
    fn test_parse_iso_duration_without_components() {
        assert_eq!(parse_iso_duration(Some("PT")), None);
        assert_eq!(parse_iso_duration(Some("PT0M")), None);
        assert_eq!(parse_iso_duration(Some("PT30S")), None);
    }

    #[test]
    fn test_parse_iso_duration_folds_days() {
        assert_eq!(
            parse_iso_duration(Some("P1DT2H")),
            Some("26 hr".to_string())
        );
        assert_eq!(
            parse_iso_duration(Some("P999999999999999999D")),
            Some("P999999999999999999D".to_string())
        );
        assert_eq!(
            parse_iso_duration(Some("PT99999999999999999999999M")),
            Some("PT99999999999999999999999M".to_string())
        );
    }

    #[test]
    fn test_normalize_time_text() {
        assert_eq!(
            normalize_time_text("1 hour 30 minutes"),
            Some("1 hr 30 min".to_string())
        );
        assert_eq!(normalize_time_text("45 mins"), Some("45 min".to_string()));
        assert_eq!(normalize_time_text("90 minutes"), Some("1 hr 30 min".to_string()));
        assert_eq!(normalize_time_text("1.5 hours"), Some("1 hr 30 min".to_string()));
        assert_eq!(normalize_time_text("PT20M"), Some("20 min".to_string()));
        assert_eq!(normalize_time_text("overnight"), Some("overnight".to_string()));
        assert_eq!(normalize_time_text("   "), None);
    }

    #[test]
    fn test_duration_minutes() {
        assert_eq!(duration_minutes("1 hr 15 min"), Some(75));
        assert_eq!(duration_minutes("PT45M"), Some(45));
        assert_eq!(duration_minutes("overnight"), None);
    }

    #[test]
    fn test_parse_servings() {
        assert_eq!(parse_servings(&json!("Serves 4 people")), Some(4));
        assert_eq!(parse_servings(&json!([6, 8])), Some(6));
        assert_eq!(parse_servings(&json!(["8 slices", "4 servings"])), Some(8));
        assert_eq!(parse_servings(&json!(12)), Some(12));
        assert_eq!(parse_servings(&json!({})), None);
        assert_eq!(parse_servings(&json!(null)), None);
        assert_eq!(parse_servings(&json!("a few")), None);
    }

    #[test]
    fn test_scale_quantity() {
        assert_eq!(scale_quantity("2 cups flour", 2.0), "4 cups flour");
        assert_eq!(scale_quantity("1/2 cup sugar", 3.0), "1.5 cup sugar");
        assert_eq!(scale_quantity("1 ½ tsp salt", 2.0), "3 tsp salt");
        assert_eq!(scale_quantity("¼ cup milk", 2.0), "0.5 cup milk");
        assert_eq!(scale_quantity("2 1/2 lb beef", 2.0), "5 lb beef");
        assert_eq!(scale_quantity("3 eggs", 0.5), "1.5 eggs");
        assert_eq!(scale_quantity("salt to taste", 2.0), "salt to taste");
    }

    #[test]
    fn test_scale_quantity_decimals_and_ranges() {
        assert_eq!(scale_quantity("1.5 cups flour", 2.0), "3 cups flour");
        assert_eq!(scale_quantity("0.25 tsp cayenne", 2.0), "0.5 tsp cayenne");
        assert_eq!(scale_quantity("2-3 cups stock", 2.0), "2-3 cups stock");
        assert_eq!(scale_quantity("2 - 3 cloves garlic", 2.0), "2 - 3 cloves garlic");
        assert_eq!(scale_quantity("4 to 6 sprigs thyme", 0.5), "4 to 6 sprigs thyme");
    }

    #[test]
    fn test_scale_quantity_is_identity_at_ratio_one() {
        let lines = [
            "2 cups flour",
            "1/3 cup oil",
            "⅔ cup milk",
            "1½ tbsp butter",
            "pinch of salt",
            "",
            "  3 eggs",
        ];
        for line in lines {
            assert_eq!(scale_quantity(line, 1.0), line);
        }
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>1 cup <b>flour</b></p>"),
            "1 cup flour".to_string()
        );
        assert_eq!(strip_html("Salt &amp; pepper"), "Salt & pepper");
        assert_eq!(strip_html("Line one<br>Line two"), "Line one Line two");
        assert_eq!(strip_html("  plain   text "), "plain text");
    }

    #[test]
    fn test_source_name_strips_www() {
        assert_eq!(
            source_name("https://www.seriouseats.com/chili"),
            Some("seriouseats.com".to_string())
        );
        assert_eq!(source_name("not a url"), None);
    }

    #[test]
    fn test_resolve_image_url() {
        let page = "https://example.com/recipes/pie";
        assert_eq!(
            resolve_image_url("https://cdn.example.com/pie.JPG", page),
            Some("https://cdn.example.com/pie.JPG".to_string())
        );
        assert_eq!(
            resolve_image_url("//example.com/wp-content/uploads/2024/pie", page),
            Some("https://example.com/wp-content/uploads/2024/pie".to_string())
        );
        assert_eq!(resolve_image_url(page, page), None);
        assert_eq!(resolve_image_url("ftp://example.com/pie.jpg", page), None);
        assert_eq!(resolve_image_url("https://example.com/about", page), None);
        assert_eq!(resolve_image_url("data:image/png;base64,AAAA", page), None);
    }
}
