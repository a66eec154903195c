//! Duplicate-suppressing merge for `append_to_section`.
//!
//! The containment checks are a heuristic. An incoming text that happens to
//! contain the old text (or be contained by it) is treated as a restatement,
//! even when it was meant as new material.

use crate::reconcile::text::{collapse_whitespace, has_markup, normalized_plain_text};
use std::collections::HashSet;

/// Returns the merged content, or `None` when the append adds nothing.
///
/// Rules, on normalized plain text:
/// - incoming contained in existing: no-op;
/// - existing contained in incoming: incoming replaces existing;
/// - otherwise concatenate; plain text also drops lines already present.
pub fn merge_append(existing: &str, incoming: &str) -> Option<String> {
    let incoming_text = normalized_plain_text(incoming);
    if incoming_text.is_empty() {
        return None;
    }
    let existing_text = normalized_plain_text(existing);
    if existing_text.contains(&incoming_text) {
        return None;
    }
    if existing_text.is_empty() || incoming_text.contains(&existing_text) {
        return (incoming != existing).then(|| incoming.to_string());
    }

    if has_markup(existing) || has_markup(incoming) {
        return Some(format!("{}\n{}", existing.trim_end(), incoming.trim()));
    }

    let fresh = fresh_lines(existing, incoming)?;
    Some(format!("{}\n\n{}", existing.trim_end(), fresh))
}

/// Drops incoming lines that repeat a line already present, comparing
/// whitespace-collapsed text. Returns `None` when nothing new remains.
fn fresh_lines(existing: &str, incoming: &str) -> Option<String> {
    let mut seen: HashSet<String> = existing
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect();

    let kept: Vec<&str> = incoming
        .lines()
        .filter(|line| {
            let key = collapse_whitespace(line);
            key.is_empty() || seen.insert(key)
        })
        .collect();

    let joined = kept.join("\n");
    let trimmed = joined.trim_matches('\n');
    if trimmed.trim().is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
