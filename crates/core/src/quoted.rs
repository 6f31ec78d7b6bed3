use once_cell::sync::Lazy;
use regex::Regex;

static QUOTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).expect("valid regex"));

/// Decodes a quote-encoded list such as `"flour" "sugar" "egg"` into its
/// segments, in order. Text outside quotes is ignored; an unterminated trailing
/// quote is dropped. No segments yields an empty list.
pub fn decode_quoted_list(encoded: &str) -> Vec<String> {
    QUOTED_RE
        .captures_iter(encoded)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
