//! Persisted session shape.
//!
//! # Responsibility
//! - Define the durable form of one co-authoring session.
//!
//! # Invariants
//! - A `PersistedSession` produced by the compactor already satisfies the
//!   caps of the profile named in `profile`.

use crate::model::conversation::ChatMessage;
use crate::model::section::{DocumentMode, Section};
use crate::model::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// Last failed agent turn, kept so the UI can offer a retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorState {
    pub message: String,
    pub retry_count: u32,
}

/// Durable snapshot of a whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub mode: DocumentMode,
    #[serde(default)]
    pub undo: Vec<Snapshot>,
    #[serde(default)]
    pub redo: Vec<Snapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_state: Option<ErrorState>,
    /// Retention profile the payload was written under; `None` in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl PersistedSession {
    /// Creates an empty session record.
    pub fn empty(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            sections: Vec::new(),
            mode: DocumentMode::default(),
            undo: Vec::new(),
            redo: Vec::new(),
            error_state: None,
            profile: None,
        }
    }
}
