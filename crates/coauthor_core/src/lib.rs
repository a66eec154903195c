//! Core logic for live document co-authoring with a streaming agent.
//!
//! Three stages run one way: streamed payloads are decoded into edit
//! instructions (`stream`), applied to the section list (`reconcile`), and
//! the resulting history is persisted within a storage budget (`history`).

pub mod config;
pub mod db;
pub mod history;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod repo;
pub mod service;
pub mod stream;

pub use config::{ConfigError, CoreConfig};
pub use history::compactor::{compact, persist, PersistOutcome, PersistProfile, TRUNCATION_MARKER};
pub use history::profile::{ProfileConfigError, ProfileLadder, ProfileName, RetentionProfile};
pub use history::sink::{MemorySnapshotStore, SinkError, SnapshotSink, SnapshotSource};
pub use history::stacks::{HistoryLimits, HistoryStacks};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::conversation::{AgentResponse, ChatMessage, MessageRole, ResponseError};
pub use model::instruction::{EditInstruction, EditKind, InstructionError};
pub use model::section::{DocumentMode, Provenance, Section, SectionId};
pub use model::session::{ErrorState, PersistedSession};
pub use model::snapshot::Snapshot;
pub use reconcile::engine::{reconcile, InstructionEffect, ReconcileContext, ReconcileOutcome};
pub use repo::snapshot_repo::SqliteSnapshotStore;
pub use service::session_service::{CoauthorSession, SessionError, SessionResult};
pub use stream::decoder::FrameDecoder;
pub use stream::frame::{decode_frame, DecodedInstruction, StreamFrame};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
