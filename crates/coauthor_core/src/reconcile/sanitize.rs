//! HTML safety filter for agent-supplied content.
//!
//! # Responsibility
//! - Remove active content from markup before it is stored in a section.
//!
//! # Invariants
//! - Filtering strips; it never rejects the whole edit.
//! - Plain text without tags is returned unchanged.
//! - Attribute filtering only looks inside tags, never at text nodes.

use crate::reconcile::text::has_markup;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

/// Elements removed together with their body.
const BLOCK_ELEMENTS: &[&str] = &["script", "style", "iframe", "object"];

static BLOCK_ELEMENT_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    BLOCK_ELEMENTS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
                .expect("valid block element regex")
        })
        .collect()
});
static UNTERMINATED_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:script|style|iframe|object)\b.*\z")
        .expect("valid unterminated block regex")
});
static FORBIDDEN_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</?(?:script|style|iframe|object|embed|link|meta|base|form)\b(?:[^>]*)(?:>|\z)",
    )
    .expect("valid forbidden tag regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<([a-zA-Z][a-zA-Z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)(>|\z)"#)
        .expect("valid tag regex")
});
static CHAR_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)&#x([0-9a-f]+);?|&#([0-9]+);?|&(colon|tab|newline|lpar|rpar|sol);?")
        .expect("valid character reference regex")
});

const UNSAFE_URL_PREFIXES: &[&str] = &["javascript:", "vbscript:", "data:text/html"];

/// Returns `content` with disallowed elements and attributes removed.
pub fn sanitize_content(content: &str) -> Cow<'_, str> {
    if !has_markup(content) {
        return Cow::Borrowed(content);
    }
    Cow::Owned(sanitize_html(content))
}

/// Strips script-like elements, event handlers and script URLs.
pub fn sanitize_html(html: &str) -> String {
    let mut out = html.to_string();
    for block in BLOCK_ELEMENT_RES.iter() {
        out = block.replace_all(&out, "").into_owned();
    }
    out = UNTERMINATED_BLOCK_RE.replace(&out, "").into_owned();
    out = FORBIDDEN_TAG_RE.replace_all(&out, "").into_owned();
    TAG_RE
        .replace_all(&out, |caps: &Captures<'_>| {
            format!("<{}{}{}", &caps[1], clean_attributes(&caps[2]), &caps[3])
        })
        .into_owned()
}

/// One `name[=value]` entry of a start tag, with the separator run before it.
struct Attribute<'a> {
    raw: &'a str,
    name: &'a str,
    value: Option<&'a str>,
    quoted: bool,
}

/// Splits an attribute list the way browsers do: whitespace and `/` both
/// separate attributes, and unquoted values run until whitespace.
fn scan_attributes(attributes: &str) -> (Vec<Attribute<'_>>, &str) {
    let bytes = attributes.as_bytes();
    let is_separator = |b: u8| b.is_ascii_whitespace() || b == b'/';
    let mut parsed = Vec::new();
    let mut index = 0;
    loop {
        let start = index;
        while index < bytes.len() && is_separator(bytes[index]) {
            index += 1;
        }
        if index == bytes.len() {
            return (parsed, &attributes[start..]);
        }

        let name_start = index;
        index += 1;
        while index < bytes.len() && !is_separator(bytes[index]) && bytes[index] != b'=' {
            index += 1;
        }
        let name = &attributes[name_start..index];

        let mut cursor = index;
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        let mut value = None;
        let mut quoted = false;
        if cursor < bytes.len() && bytes[cursor] == b'=' {
            cursor += 1;
            while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            let value_start = cursor;
            match bytes.get(cursor) {
                Some(&quote @ (b'"' | b'\'')) => {
                    quoted = true;
                    cursor += 1;
                    while cursor < bytes.len() && bytes[cursor] != quote {
                        cursor += 1;
                    }
                    cursor = (cursor + 1).min(bytes.len());
                }
                _ => {
                    while cursor < bytes.len() && !bytes[cursor].is_ascii_whitespace() {
                        cursor += 1;
                    }
                }
            }
            value = Some(&attributes[value_start..cursor]);
            index = cursor;
        }

        parsed.push(Attribute {
            raw: &attributes[start..index],
            name,
            value,
            quoted,
        });
    }
}

fn clean_attributes(attributes: &str) -> String {
    let (parsed, trailing) = scan_attributes(attributes);
    let mut out = String::with_capacity(attributes.len());
    for attribute in parsed {
        if !is_unsafe_attribute(&attribute) {
            out.push_str(attribute.raw);
        }
    }
    out.push_str(trailing);
    out
}

fn is_unsafe_attribute(attribute: &Attribute<'_>) -> bool {
    if attribute.name.to_ascii_lowercase().starts_with("on") {
        return true;
    }
    let Some(raw_value) = attribute.value else {
        return false;
    };
    let value = decode_char_refs(raw_value.trim_matches(|c| c == '"' || c == '\''));
    is_unsafe_url(&value) || (!attribute.quoted && smuggles_handler(&value))
}

/// Unquoted values such as `x/onerror=...` are read differently by lenient
/// parsers, so a handler-looking segment drops the whole attribute.
fn smuggles_handler(value: &str) -> bool {
    value
        .to_ascii_lowercase()
        .split('/')
        .skip(1)
        .any(|segment| segment.starts_with("on") && segment.contains('='))
}

fn decode_char_refs(value: &str) -> Cow<'_, str> {
    CHAR_REF_RE.replace_all(value, |caps: &Captures<'_>| {
        let code = if let Some(hex) = caps.get(1) {
            u32::from_str_radix(hex.as_str(), 16).ok()
        } else if let Some(decimal) = caps.get(2) {
            decimal.as_str().parse::<u32>().ok()
        } else {
            match caps[3].to_ascii_lowercase().as_str() {
                "colon" => Some(u32::from(':')),
                "tab" => Some(u32::from('\t')),
                "newline" => Some(u32::from('\n')),
                "lpar" => Some(u32::from('(')),
                "rpar" => Some(u32::from(')')),
                _ => Some(u32::from('/')),
            }
        };
        code.and_then(char::from_u32)
            .map_or_else(String::new, String::from)
    })
}

fn is_unsafe_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    UNSAFE_URL_PREFIXES
        .iter()
        .any(|prefix| compact.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::{sanitize_content, sanitize_html};

    #[test]
    fn strips_scripts_handlers_and_script_urls() {
        let cleaned = sanitize_html(
            r#"<p>hello</p><script>alert(1)</script><a href="javascript:alert(1)" onclick="x()">x</a>"#,
        );
        assert!(cleaned.contains("hello"));
        assert!(!cleaned.contains("<script"));
        assert!(!cleaned.contains("javascript:"));
        assert!(!cleaned.contains("onclick"));
        assert_eq!(cleaned, "<p>hello</p><a>x</a>");
    }

    #[test]
    fn removes_block_bodies_but_keeps_form_text() {
        let cleaned = sanitize_html(
            "<style>p{color:red}</style><form action=\"/x\"><b>Name</b></form><iframe src=\"a\"></iframe>",
        );
        assert_eq!(cleaned, "<b>Name</b>");
    }

    #[test]
    fn removes_unterminated_script_through_end() {
        let cleaned = sanitize_html("<p>ok</p><script>steal(");
        assert_eq!(cleaned, "<p>ok</p>");
    }

    #[test]
    fn keeps_safe_attributes_and_quoted_angle_brackets() {
        let cleaned =
            sanitize_html(r#"<a title="a>b" href="https://example.com" OnMouseOver='x()'>go</a>"#);
        assert_eq!(cleaned, r#"<a title="a>b" href="https://example.com">go</a>"#);
    }

    #[test]
    fn strips_obfuscated_and_data_urls() {
        let cleaned = sanitize_html(
            "<img src=\" JaVa script:alert(1)\"><a href='data:text/html;base64,xx'>d</a>",
        );
        assert_eq!(cleaned, "<img><a>d</a>");
    }

    #[test]
    fn slash_separated_handlers_are_stripped() {
        let cleaned = sanitize_html(r#"<img/src=x/onerror=alert(1)><a/onclick="x()">y</a>"#);
        assert!(!cleaned.to_ascii_lowercase().contains("onerror"));
        assert!(!cleaned.to_ascii_lowercase().contains("onclick"));
        assert_eq!(cleaned, "<img><a>y</a>");
    }

    #[test]
    fn uppercase_handlers_are_stripped() {
        let cleaned = sanitize_html(r#"<div ONLOAD="a()" title=t OnClick='b()'>z</div>"#);
        assert_eq!(cleaned, "<div title=t>z</div>");
    }

    #[test]
    fn entity_encoded_script_urls_are_stripped() {
        let cleaned = sanitize_html(
            r#"<a href="java&#x73;cript:alert(1)">x</a><a href="javascript&colon;alert(1)">y</a><a href="jav&#97;script&#58;go()">z</a><a href="java&Tab;script:go()">w</a>"#,
        );
        assert_eq!(cleaned, "<a>x</a><a>y</a><a>z</a><a>w</a>");
    }

    #[test]
    fn self_closing_tags_and_safe_unquoted_urls_survive() {
        let html = r#"<br /><img src=https://example.com/a.png?x=1 alt="ok"/>"#;
        assert_eq!(sanitize_html(html), html);
    }

    #[test]
    fn plain_text_passes_through_untouched() {
        let text = "turn one = two; a < b";
        assert_eq!(sanitize_content(text), text);
    }
}
