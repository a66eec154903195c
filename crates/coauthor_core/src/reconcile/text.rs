//! Plain-text projections shared by identity, merge and title logic.

use once_cell::sync::Lazy;
use regex::Regex;

static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[a-zA-Z/!]").expect("valid markup regex"));
static BLOCK_BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6]|tr|blockquote|pre)\s*>")
        .expect("valid block break regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>?").expect("valid tag regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Returns whether `content` contains anything that looks like a tag.
pub fn has_markup(content: &str) -> bool {
    MARKUP_RE.is_match(content)
}

/// Collapses whitespace runs to one space and trims the ends.
pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RE.replace_all(value.trim(), " ").into_owned()
}

/// Converts markup to text lines: block ends become line breaks, tags are
/// removed and common entities decoded.
pub fn to_plain_lines(content: &str) -> String {
    if !has_markup(content) {
        return decode_entities(content);
    }
    let with_breaks = BLOCK_BREAK_RE.replace_all(content, "\n");
    let without_tags = TAG_RE.replace_all(&with_breaks, " ");
    decode_entities(&without_tags)
}

/// Normalized plain text used for containment comparisons.
pub fn normalized_plain_text(content: &str) -> String {
    collapse_whitespace(&to_plain_lines(content))
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
