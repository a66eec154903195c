//! Co-authoring session use-case service.
//!
//! # Responsibility
//! - Own the state of one session: transcript, sections, mode, history and
//!   last error.
//! - Route streamed previews, final responses and manual edits through the
//!   reconciliation engine.
//! - Hand persistence to the compactor and restore from stored payloads.
//!
//! # Invariants
//! - Previews never mutate session state or history.
//! - Every final response or manual edit that changes the sections records
//!   exactly one undo entry holding the pre-change sections. Mode-only
//!   turns record nothing, since undo restores sections only.
//! - The service is storage-agnostic; sinks are passed per call.

use crate::config::CoreConfig;
use crate::history::compactor::{persist, PersistOutcome};
use crate::history::sink::{SinkError, SnapshotSink, SnapshotSource};
use crate::history::stacks::HistoryStacks;
use crate::model::conversation::{AgentResponse, ChatMessage, ResponseError};
use crate::model::instruction::EditInstruction;
use crate::model::section::{same_document, DocumentMode, Provenance, Section};
use crate::model::session::{ErrorState, PersistedSession};
use crate::model::snapshot::Snapshot;
use crate::reconcile::engine::{reconcile, ReconcileOutcome};
use crate::stream::frame::StreamFrame;
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SessionResult<T> = Result<T, SessionError>;

/// Session-level failure.
#[derive(Debug)]
pub enum SessionError {
    Response(ResponseError),
    Storage(SinkError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Response(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Response(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<ResponseError> for SessionError {
    fn from(value: ResponseError) -> Self {
        Self::Response(value)
    }
}

impl From<SinkError> for SessionError {
    fn from(value: SinkError) -> Self {
        Self::Storage(value)
    }
}

/// One co-authoring session.
#[derive(Debug, Clone)]
pub struct CoauthorSession {
    session_id: String,
    messages: Vec<ChatMessage>,
    sections: Vec<Section>,
    mode: DocumentMode,
    history: HistoryStacks,
    error_state: Option<ErrorState>,
    config: CoreConfig,
}

impl CoauthorSession {
    /// Creates an empty session.
    pub fn new(session_id: impl Into<String>, config: CoreConfig) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            sections: Vec::new(),
            mode: DocumentMode::default(),
            history: HistoryStacks::new(config.history),
            error_state: None,
            config,
        }
    }

    /// Seeds the document without recording history.
    pub fn with_sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    /// Rebuilds a session from its persisted form.
    ///
    /// Stacks are re-capped to the in-memory limits of `config`.
    pub fn restore(persisted: PersistedSession, config: CoreConfig) -> Self {
        let history = HistoryStacks::from_parts(persisted.undo, persisted.redo, config.history);
        info!(
            "event=session_restore module=service status=ok profile={} messages={} sections={}",
            persisted.profile.as_deref().unwrap_or("none"),
            persisted.messages.len(),
            persisted.sections.len()
        );
        Self {
            session_id: persisted.session_id,
            messages: persisted.messages,
            sections: persisted.sections,
            mode: persisted.mode,
            history,
            error_state: persisted.error_state,
            config,
        }
    }

    /// Loads and restores a session from `source`.
    pub fn load(
        source: &impl SnapshotSource,
        session_id: &str,
        config: CoreConfig,
    ) -> SessionResult<Option<Self>> {
        let persisted = source.load_snapshot(session_id)?;
        Ok(persisted.map(|persisted| Self::restore(persisted, config)))
    }

    /// Reconciles the instructions of an in-flight frame for display.
    ///
    /// The returned outcome is a throwaway view; session state is untouched.
    pub fn preview(&self, frame: &StreamFrame, now_ms: i64) -> ReconcileOutcome {
        let instructions: Vec<EditInstruction> = frame
            .edit_instructions()
            .into_iter()
            .filter(|instruction| instruction.validate().is_ok())
            .collect();
        reconcile(
            &self.sections,
            self.mode,
            &instructions,
            &self.config.reconcile_context(now_ms),
        )
    }

    /// Applies a final agent response.
    ///
    /// Appends the assistant message, reconciles the valid instructions and
    /// records the pre-change sections when the sections changed. Clears
    /// the error state.
    pub fn apply_response(&mut self, response: AgentResponse, now_ms: i64) -> ReconcileOutcome {
        let instructions = response.validated_edits();
        self.messages.push(ChatMessage::from_response(&response));
        self.error_state = None;

        let outcome = reconcile(
            &self.sections,
            self.mode,
            &instructions,
            &self.config.reconcile_context(now_ms),
        );
        if outcome.changed {
            if !same_document(&self.sections, &outcome.sections) {
                self.record_history("agent");
            }
            self.sections = outcome.sections.clone();
            self.mode = outcome.mode;
        }
        outcome
    }

    /// Parses and applies a final agent payload.
    pub fn apply_response_json(
        &mut self,
        payload: &str,
        now_ms: i64,
    ) -> SessionResult<ReconcileOutcome> {
        let response = AgentResponse::from_json(payload)?;
        Ok(self.apply_response(response, now_ms))
    }

    pub fn record_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    /// Replaces the document with a user-edited version.
    ///
    /// Sections whose title or content differ from the current version are
    /// stamped with `now_ms`; agent-authored ones become user-authored.
    /// Returns `false` and records nothing when the content is unchanged.
    pub fn apply_manual_edit(&mut self, mut sections: Vec<Section>, now_ms: i64) -> bool {
        if same_document(&self.sections, &sections) {
            return false;
        }

        for section in sections.iter_mut() {
            let unchanged = self
                .sections
                .iter()
                .any(|current| current.same_content(section));
            if unchanged {
                continue;
            }
            section.updated_at = now_ms;
            if section.provenance == Provenance::Agent {
                section.provenance = Provenance::User;
            }
        }

        self.record_history("manual");
        self.sections = sections;
        true
    }

    /// Restores the previous document state. Returns whether one existed.
    pub fn undo(&mut self) -> bool {
        let current = Snapshot::capture(self.sections.clone());
        match self.history.undo(current) {
            Some(previous) => {
                self.sections = previous.into_sections();
                true
            }
            None => false,
        }
    }

    /// Re-applies the last undone state. Returns whether one existed.
    pub fn redo(&mut self) -> bool {
        let current = Snapshot::capture(self.sections.clone());
        match self.history.redo(current) {
            Some(next) => {
                self.sections = next.into_sections();
                true
            }
            None => false,
        }
    }

    /// Records a failed agent turn and returns the attempt count.
    pub fn record_error(&mut self, message: impl Into<String>) -> u32 {
        let retry_count = self
            .error_state
            .as_ref()
            .map_or(1, |state| state.retry_count.saturating_add(1));
        self.error_state = Some(ErrorState {
            message: message.into(),
            retry_count,
        });
        retry_count
    }

    pub fn clear_error(&mut self) {
        self.error_state = None;
    }

    /// Writes the session to `sink` under the best-fitting profile.
    pub fn persist(&self, sink: &mut impl SnapshotSink) -> PersistOutcome {
        persist(&self.to_persisted(), sink, &self.config.profiles)
    }

    /// Returns the uncompacted durable form of the session.
    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            session_id: self.session_id.clone(),
            messages: self.messages.clone(),
            sections: self.sections.clone(),
            mode: self.mode,
            undo: self.history.undo_entries().to_vec(),
            redo: self.history.redo_entries().to_vec(),
            error_state: self.error_state.clone(),
            profile: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn mode(&self) -> DocumentMode {
        self.mode
    }

    pub fn error_state(&self) -> Option<&ErrorState> {
        self.error_state.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    fn record_history(&mut self, source: &str) {
        let recorded = self
            .history
            .record(Snapshot::capture(self.sections.clone()));
        debug!(
            "event=history_record module=service status={} source={} undo_depth={}",
            if recorded { "ok" } else { "deduped" },
            source,
            self.history.undo_entries().len()
        );
    }
}
