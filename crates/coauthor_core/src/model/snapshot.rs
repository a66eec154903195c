//! Undo/redo snapshot model.
//!
//! # Invariants
//! - `serialized` is always the canonical JSON of `sections` and is the
//!   equality key used for stack deduplication.
//! - Only `sections` goes over the wire; `serialized` is rebuilt on decode.

use crate::model::section::Section;
use serde::{Deserialize, Serialize};

/// Captured document state for undo/redo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<Section>", into = "Vec<Section>")]
pub struct Snapshot {
    sections: Vec<Section>,
    serialized: String,
}

impl Snapshot {
    /// Captures `sections` together with their canonical serialized form.
    pub fn capture(sections: Vec<Section>) -> Self {
        // Serializing plain string/number fields cannot fail.
        let serialized = serde_json::to_string(&sections).unwrap_or_default();
        Self {
            sections,
            serialized,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn serialized(&self) -> &str {
        &self.serialized
    }

    pub fn into_sections(self) -> Vec<Section> {
        self.sections
    }

    /// Returns whether both snapshots hold identical content.
    pub fn same_content(&self, other: &Self) -> bool {
        self.serialized == other.serialized
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.same_content(other)
    }
}

impl Eq for Snapshot {}

impl From<Vec<Section>> for Snapshot {
    fn from(value: Vec<Section>) -> Self {
        Self::capture(value)
    }
}

impl From<Snapshot> for Vec<Section> {
    fn from(value: Snapshot) -> Self {
        value.sections
    }
}

#[cfg(test)]
mod tests {
    use super::Snapshot;
    use crate::model::section::{Provenance, Section};

    #[test]
    fn wire_form_is_the_section_list_and_rebuilds_serialized() {
        let snapshot = Snapshot::capture(vec![Section::with_id(
            "s1",
            "Intro",
            "hello",
            Provenance::User,
            7,
        )]);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.is_array());

        let decoded: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.serialized(), snapshot.serialized());
        assert_eq!(decoded, snapshot);
    }
}
