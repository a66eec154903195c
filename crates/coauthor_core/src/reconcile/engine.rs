//! Batch application of edit instructions to a section list.
//!
//! # Responsibility
//! - Apply instructions in received order, resolving section identity.
//! - Sanitize and de-duplicate incoming content.
//! - Report whether the document actually changed.
//!
//! # Invariants
//! - Stateless between calls; the input slice is never mutated.
//! - `changed` is `false` whenever ids, titles, contents and mode are all
//!   equal to the input, regardless of how many instructions ran.
//! - Unresolvable instructions are per-instruction no-ops; the batch never
//!   aborts.
//! - Sections are never removed.

use crate::model::instruction::{EditInstruction, EditKind};
use crate::model::section::{same_document, DocumentMode, Provenance, Section, SectionId};
use crate::reconcile::identity::{claim_section_id, resolve_target};
use crate::reconcile::merge::merge_append;
use crate::reconcile::sanitize::sanitize_content;
use crate::reconcile::title::promote_lead_title;
use log::debug;
use std::collections::HashSet;

/// Lead titles treated as "not named yet".
pub const DEFAULT_PLACEHOLDER_TITLES: &[&str] = &[
    "Untitled",
    "Untitled document",
    "New document",
    "Document",
    "Title",
];

/// Per-call inputs that are not part of the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileContext {
    /// Timestamp stamped on sections this call creates or modifies.
    pub now_ms: i64,
    pub placeholder_titles: Vec<String>,
}

impl ReconcileContext {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms,
            placeholder_titles: DEFAULT_PLACEHOLDER_TITLES
                .iter()
                .map(|title| (*title).to_string())
                .collect(),
        }
    }

    pub fn with_placeholder_titles(mut self, placeholder_titles: Vec<String>) -> Self {
        self.placeholder_titles = placeholder_titles;
        self
    }
}

/// What one instruction did to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionEffect {
    Created(SectionId),
    Updated(SectionId),
    /// Target resolved (or mode already set) but nothing differed.
    Unchanged,
    /// No target matched and no creation fallback applied.
    Unresolved,
    ModeSwitched(DocumentMode),
}

/// Result of one reconciliation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub sections: Vec<Section>,
    pub mode: DocumentMode,
    pub changed: bool,
    /// One entry per input instruction, in order.
    pub effects: Vec<InstructionEffect>,
}

/// Applies `instructions` to `sections` and returns the next document.
pub fn reconcile(
    sections: &[Section],
    mode: DocumentMode,
    instructions: &[EditInstruction],
    ctx: &ReconcileContext,
) -> ReconcileOutcome {
    let mut batch = Batch {
        sections: sections.to_vec(),
        mode,
        claimed: sections.iter().map(|section| section.id.clone()).collect(),
        resolved: HashSet::new(),
        now_ms: ctx.now_ms,
    };

    let effects: Vec<InstructionEffect> = instructions
        .iter()
        .map(|instruction| batch.apply(instruction))
        .collect();

    let touched_sections = effects.iter().any(|effect| {
        matches!(
            effect,
            InstructionEffect::Created(_) | InstructionEffect::Updated(_)
        )
    });
    if touched_sections {
        promote_lead_title(&mut batch.sections, &ctx.placeholder_titles, ctx.now_ms);
    }

    let changed = batch.mode != mode || !same_document(sections, &batch.sections);
    debug!(
        "event=reconcile module=reconcile status=ok instructions={} changed={} created={} updated={} unresolved={}",
        instructions.len(),
        changed,
        count(&effects, |effect| matches!(effect, InstructionEffect::Created(_))),
        count(&effects, |effect| matches!(effect, InstructionEffect::Updated(_))),
        count(&effects, |effect| matches!(effect, InstructionEffect::Unresolved)),
    );

    ReconcileOutcome {
        sections: batch.sections,
        mode: batch.mode,
        changed,
        effects,
    }
}

fn count(effects: &[InstructionEffect], predicate: impl Fn(&InstructionEffect) -> bool) -> usize {
    effects.iter().filter(|effect| predicate(effect)).count()
}

/// Working state threaded through one batch.
struct Batch {
    sections: Vec<Section>,
    mode: DocumentMode,
    /// Every id in use, including sections created earlier in this batch.
    claimed: HashSet<SectionId>,
    /// Sections already targeted by an earlier instruction of this batch.
    resolved: HashSet<SectionId>,
    now_ms: i64,
}

impl Batch {
    fn apply(&mut self, instruction: &EditInstruction) -> InstructionEffect {
        if instruction.kind == EditKind::SwitchMode {
            return self.switch_mode(instruction.mode);
        }

        let content = instruction
            .content
            .as_deref()
            .map(|content| sanitize_content(content).into_owned());
        let target = resolve_target(&self.sections, instruction, &self.resolved);
        if let Some(index) = target {
            self.resolved.insert(self.sections[index].id.clone());
        }

        match (instruction.kind, target) {
            (EditKind::CreateSection, Some(index)) => {
                match content.filter(|content| !content.trim().is_empty()) {
                    Some(content) if self.sections[index].is_empty() => {
                        self.write_content(index, content)
                    }
                    _ => InstructionEffect::Unchanged,
                }
            }
            (EditKind::ReplaceSection, Some(index)) => match content {
                Some(content) => self.write_content(index, content),
                None => InstructionEffect::Unchanged,
            },
            (EditKind::AppendToSection, Some(index)) => {
                let merged = content
                    .and_then(|content| merge_append(&self.sections[index].content, &content));
                match merged {
                    Some(merged) => self.write_content(index, merged),
                    None => InstructionEffect::Unchanged,
                }
            }
            (EditKind::ClearSection, Some(index)) => self.write_content(index, String::new()),
            (EditKind::ClearSection, None) => InstructionEffect::Unresolved,
            (EditKind::AppendToSection, None)
                if content.as_deref().map_or(true, |c| c.trim().is_empty()) =>
            {
                InstructionEffect::Unresolved
            }
            (_, None) => self.create(instruction, content.unwrap_or_default()),
            (EditKind::SwitchMode, Some(_)) => InstructionEffect::Unchanged,
        }
    }

    fn switch_mode(&mut self, mode: Option<DocumentMode>) -> InstructionEffect {
        match mode {
            Some(mode) if mode != self.mode => {
                self.mode = mode;
                InstructionEffect::ModeSwitched(mode)
            }
            Some(_) => InstructionEffect::Unchanged,
            None => InstructionEffect::Unresolved,
        }
    }

    /// Overwrites a section's content; identical content is left untouched.
    fn write_content(&mut self, index: usize, content: String) -> InstructionEffect {
        let section = &mut self.sections[index];
        if section.content == content {
            return InstructionEffect::Unchanged;
        }
        section.content = content;
        section.provenance = Provenance::Agent;
        section.updated_at = self.now_ms;
        InstructionEffect::Updated(section.id.clone())
    }

    /// Appends a new agent section; needs a usable title.
    fn create(&mut self, instruction: &EditInstruction, content: String) -> InstructionEffect {
        let Some(title) = instruction.usable_title() else {
            return InstructionEffect::Unresolved;
        };
        let id = claim_section_id(instruction.usable_section_id(), &mut self.claimed);
        self.sections.push(Section::with_id(
            id.clone(),
            title,
            content,
            Provenance::Agent,
            self.now_ms,
        ));
        InstructionEffect::Created(id)
    }
}
