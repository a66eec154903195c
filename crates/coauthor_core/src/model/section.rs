//! Section domain model.
//!
//! # Responsibility
//! - Define the titled content block that makes up a co-authored document.
//! - Define the document-wide presentation mode.
//!
//! # Invariants
//! - `id` is stable and never reused for another section.
//! - Identifiers are unique within one section list.
//! - Order is meaningful: the first section is the lead/title section.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque stable identifier of a section.
///
/// Agent instructions may carry their own identifiers, so this stays a
/// string instead of a typed UUID.
pub type SectionId = String;

/// Who last authored a section's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Written or rewritten by an agent instruction.
    #[serde(rename = "agent_authored")]
    Agent,
    /// Written by a direct user edit.
    #[serde(rename = "user_authored")]
    User,
    /// Pinned into the document from a chat message.
    #[serde(rename = "pinned_from_conversation")]
    Pinned,
}

/// Document-wide presentation mode.
///
/// Orthogonal to section content; changed only by `switch_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentMode {
    #[default]
    #[serde(alias = "free-text")]
    FreeText,
    Tabular,
    Code,
}

impl DocumentMode {
    /// Parses wire spellings (`free_text`, `free-text`, `tabular`, `code`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "free_text" => Some(Self::FreeText),
            "tabular" => Some(Self::Tabular),
            "code" => Some(Self::Code),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FreeText => "free_text",
            Self::Tabular => "tabular",
            Self::Code => "code",
        }
    }
}

/// One titled, independently addressable block of document content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    /// Display title. Never blank for sections created by the engine.
    pub title: String,
    /// Rich (HTML) or plain text body.
    pub content: String,
    pub provenance: Provenance,
    /// Unix epoch milliseconds of the last content/title change.
    pub updated_at: i64,
}

impl Section {
    /// Creates a section with a generated identifier.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        provenance: Provenance,
        updated_at: i64,
    ) -> Self {
        Self::with_id(new_section_id(), title, content, provenance, updated_at)
    }

    /// Creates a section with a caller-provided identifier.
    ///
    /// Used by reconciliation when an instruction names the id it wants and
    /// by restore paths where identity already exists.
    pub fn with_id(
        id: impl Into<SectionId>,
        title: impl Into<String>,
        content: impl Into<String>,
        provenance: Provenance,
        updated_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            provenance,
            updated_at,
        }
    }

    /// Returns whether the section carries no visible content.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Returns whether `other` shows the same document content.
    ///
    /// Provenance and timestamps are bookkeeping and do not count.
    pub fn same_content(&self, other: &Self) -> bool {
        self.id == other.id && self.title == other.title && self.content == other.content
    }
}

/// Generates a fresh section identifier.
pub fn new_section_id() -> SectionId {
    Uuid::new_v4().to_string()
}

/// Returns whether two section lists show the same document content.
pub fn same_document(left: &[Section], right: &[Section]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter())
            .all(|(a, b)| a.same_content(b))
}
