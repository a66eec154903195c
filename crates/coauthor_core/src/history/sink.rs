//! Snapshot storage contract and in-memory store.
//!
//! # Responsibility
//! - Define the write boundary the compactor writes through.
//! - Provide a byte-budgeted in-memory store for hosts without SQLite.
//!
//! # Invariants
//! - A failed write leaves the previously stored payload intact.
//! - Writers take `&mut self`, so one store never sees interleaved attempts.

use crate::history::profile::ProfileName;
use crate::model::session::PersistedSession;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage failure reported by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Storage budget or quota exceeded.
    StorageFull,
    /// Any other storage failure.
    Backend(String),
    /// Stored payload cannot be decoded.
    InvalidData(String),
}

impl Display for SinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageFull => write!(f, "snapshot storage is full"),
            Self::Backend(message) => write!(f, "snapshot storage failed: {message}"),
            Self::InvalidData(message) => write!(f, "invalid stored snapshot: {message}"),
        }
    }
}

impl Error for SinkError {}

/// Durable destination for compacted session payloads.
pub trait SnapshotSink {
    /// Replaces the stored payload of `session_id`.
    fn write_snapshot(
        &mut self,
        session_id: &str,
        profile: ProfileName,
        payload: &str,
    ) -> Result<(), SinkError>;
}

/// Read side of a snapshot store.
pub trait SnapshotSource {
    /// Returns the latest successfully written session, if any.
    fn load_snapshot(&self, session_id: &str) -> Result<Option<PersistedSession>, SinkError>;
}

/// Decodes a stored payload.
pub fn decode_payload(payload: &str) -> Result<PersistedSession, SinkError> {
    serde_json::from_str(payload).map_err(|err| SinkError::InvalidData(err.to_string()))
}

/// In-memory store with an optional total byte budget.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    capacity_bytes: Option<usize>,
    payloads: HashMap<String, (ProfileName, String)>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects writes pushing the total above
    /// `capacity_bytes`.
    pub fn with_capacity_bytes(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes: Some(capacity_bytes),
            payloads: HashMap::new(),
        }
    }

    /// Returns the raw payload stored for `session_id`.
    pub fn payload(&self, session_id: &str) -> Option<&str> {
        self.payloads
            .get(session_id)
            .map(|(_, payload)| payload.as_str())
    }

    /// Returns the profile the stored payload was written under.
    pub fn stored_profile(&self, session_id: &str) -> Option<ProfileName> {
        self.payloads.get(session_id).map(|(profile, _)| *profile)
    }

    fn used_bytes_excluding(&self, session_id: &str) -> usize {
        self.payloads
            .iter()
            .filter(|(id, _)| id.as_str() != session_id)
            .map(|(_, (_, payload))| payload.len())
            .sum()
    }
}

impl SnapshotSource for MemorySnapshotStore {
    fn load_snapshot(&self, session_id: &str) -> Result<Option<PersistedSession>, SinkError> {
        self.payload(session_id).map(decode_payload).transpose()
    }
}

impl SnapshotSink for MemorySnapshotStore {
    fn write_snapshot(
        &mut self,
        session_id: &str,
        profile: ProfileName,
        payload: &str,
    ) -> Result<(), SinkError> {
        if let Some(capacity) = self.capacity_bytes {
            if self.used_bytes_excluding(session_id) + payload.len() > capacity {
                return Err(SinkError::StorageFull);
            }
        }
        self.payloads
            .insert(session_id.to_string(), (profile, payload.to_string()));
        Ok(())
    }
}
