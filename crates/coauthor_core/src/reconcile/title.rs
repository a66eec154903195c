//! Lead-title promotion.
//!
//! When the first section still carries a placeholder title, a better one
//! is taken from a later section's title, or derived from the first line of
//! document content.

use crate::model::section::Section;
use crate::reconcile::identity::normalize_title;
use crate::reconcile::text::{collapse_whitespace, to_plain_lines};
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_LABEL_WORDS: usize = 8;
const MAX_LABEL_CHARS: usize = 60;

static LINE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:#{1,6}\s*|[-*+>]\s+|\d+[.)]\s+)+").expect("valid marker regex"));
static EMPHASIS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_`|]+").expect("valid emphasis regex"));

/// Returns whether `title` is blank or one of `placeholders`.
pub fn is_placeholder(title: &str, placeholders: &[String]) -> bool {
    let normalized = normalize_title(title);
    normalized.is_empty()
        || placeholders
            .iter()
            .any(|placeholder| normalize_title(placeholder) == normalized)
}

/// Renames the lead section when its title is a placeholder.
///
/// Returns whether a rename happened.
pub fn promote_lead_title(sections: &mut [Section], placeholders: &[String], now_ms: i64) -> bool {
    let Some(lead) = sections.first() else {
        return false;
    };
    if !is_placeholder(&lead.title, placeholders) {
        return false;
    }

    let from_titles = sections
        .iter()
        .skip(1)
        .map(|section| section.title.trim())
        .find(|title| !is_placeholder(title, placeholders))
        .map(str::to_string);
    let candidate = from_titles.or_else(|| {
        sections
            .iter()
            .find_map(|section| derive_label(&section.content))
    });

    match (candidate, sections.first_mut()) {
        (Some(title), Some(lead)) if title != lead.title => {
            lead.title = title;
            lead.updated_at = now_ms;
            true
        }
        _ => false,
    }
}

/// Derives a short label from the first non-empty line of `content`.
pub fn derive_label(content: &str) -> Option<String> {
    let plain = to_plain_lines(content);
    let line = plain
        .lines()
        .map(|line| {
            let stripped = LINE_MARKER_RE.replace(line.trim(), "");
            collapse_whitespace(&EMPHASIS_RE.replace_all(&stripped, " "))
        })
        .find(|line| !line.is_empty())?;

    let words: Vec<&str> = line.split(' ').take(MAX_LABEL_WORDS).collect();
    let label: String = words.join(" ").chars().take(MAX_LABEL_CHARS).collect();
    let label = label
        .trim_end_matches(|c: char| matches!(c, ':' | ';' | ',' | '.') || c.is_whitespace())
        .to_string();
    (!label.is_empty()).then_some(label)
}

#[cfg(test)]
mod tests {
    use super::{derive_label, is_placeholder, promote_lead_title};
    use crate::model::section::{Provenance, Section};

    fn placeholders() -> Vec<String> {
        vec!["Untitled".to_string(), "New document".to_string()]
    }

    #[test]
    fn placeholder_match_is_normalized() {
        assert!(is_placeholder("  untitled ", &placeholders()));
        assert!(is_placeholder("", &placeholders()));
        assert!(!is_placeholder("Roadmap", &placeholders()));
    }

    #[test]
    fn promotes_first_real_title_from_later_sections() {
        let mut sections = vec![
            Section::with_id("a", "Untitled", "", Provenance::User, 0),
            Section::with_id("b", "new   document", "", Provenance::Agent, 0),
            Section::with_id("c", "Launch Plan", "", Provenance::Agent, 0),
        ];
        assert!(promote_lead_title(&mut sections, &placeholders(), 5));
        assert_eq!(sections[0].title, "Launch Plan");
        assert_eq!(sections[0].updated_at, 5);
    }

    #[test]
    fn derives_label_from_content_when_no_title_helps() {
        let mut sections = vec![Section::with_id(
            "a",
            "Untitled",
            "\n## Quarterly **growth** review: first draft of many many words here\nbody",
            Provenance::Agent,
            0,
        )];
        assert!(promote_lead_title(&mut sections, &placeholders(), 1));
        assert_eq!(sections[0].title, "Quarterly growth review: first draft of many many");
    }

    #[test]
    fn empty_document_keeps_placeholder() {
        let mut sections = vec![Section::with_id("a", "Untitled", "", Provenance::User, 0)];
        assert!(!promote_lead_title(&mut sections, &placeholders(), 1));
        assert_eq!(derive_label("<p> </p>"), None);
    }
}
