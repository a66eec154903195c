//! Section identity resolution.
//!
//! # Invariants
//! - Exact id match always wins over title match.
//! - Title matching ignores case and surrounding/repeated whitespace.
//! - A new section id is never one already claimed within the batch.

use crate::model::instruction::EditInstruction;
use crate::model::section::{new_section_id, Section, SectionId};
use crate::reconcile::text::collapse_whitespace;
use std::collections::HashSet;

/// Normalizes a title for identity comparison.
pub fn normalize_title(title: &str) -> String {
    collapse_whitespace(title).to_lowercase()
}

/// Returns the index of the section `instruction` targets, if any.
///
/// When several sections share the wanted title, the first one not yet in
/// `already_claimed` is chosen, so repeated instructions in one batch walk
/// through duplicates instead of rewriting the first of them.
pub fn resolve_target(
    sections: &[Section],
    instruction: &EditInstruction,
    already_claimed: &HashSet<SectionId>,
) -> Option<usize> {
    if let Some(id) = instruction.usable_section_id() {
        if let Some(index) = sections.iter().position(|section| section.id == id) {
            return Some(index);
        }
    }

    let wanted = normalize_title(instruction.usable_title()?);
    let mut matches = sections
        .iter()
        .enumerate()
        .filter(|(_, section)| normalize_title(&section.title) == wanted)
        .map(|(index, section)| (index, already_claimed.contains(&section.id)));
    let (first, first_claimed) = matches.next()?;
    if !first_claimed {
        return Some(first);
    }
    matches
        .find(|(_, claimed)| !claimed)
        .map_or(Some(first), |(index, _)| Some(index))
}

/// Assigns the id of a section about to be created.
///
/// The requested id is honoured only when nothing in `claimed` uses it yet;
/// otherwise a fresh id is generated. The chosen id is added to `claimed`.
pub fn claim_section_id(requested: Option<&str>, claimed: &mut HashSet<SectionId>) -> SectionId {
    let id = match requested.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) if !claimed.contains(id) => id.to_string(),
        _ => loop {
            let candidate = new_section_id();
            if !claimed.contains(&candidate) {
                break candidate;
            }
        },
    };
    claimed.insert(id.clone());
    id
}
