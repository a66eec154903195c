//! Budgeted session persistence.
//!
//! # Responsibility
//! - Truncate a session to the caps of one retention profile.
//! - Write the smallest-necessary payload, stepping down the ladder on
//!   every sink failure.
//!
//! # Invariants
//! - `compact` never mutates its input and always keeps the lead section.
//! - Truncated text never exceeds its cap, marker included.
//! - `persist` never panics and never propagates an error; exhaustion is
//!   reported as `PersistProfile::Failed`.

use crate::history::profile::{ProfileLadder, ProfileName, RetentionProfile};
use crate::history::sink::SnapshotSink;
use crate::history::stacks::retain_recent;
use crate::logging::log_field;
use crate::model::conversation::ChatMessage;
use crate::model::section::Section;
use crate::model::session::PersistedSession;
use crate::model::snapshot::Snapshot;
use log::{error, info, warn};
use std::time::Instant;

/// Suffix appended to text cut by a retention cap.
pub const TRUNCATION_MARKER: &str = "…[truncated]";

/// Profile a persistence call ended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistProfile {
    Full,
    Reduced,
    Minimal,
    /// Every profile was rejected by the sink.
    Failed,
}

impl PersistProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Reduced => "reduced",
            Self::Minimal => "minimal",
            Self::Failed => "failed",
        }
    }
}

impl From<ProfileName> for PersistProfile {
    fn from(value: ProfileName) -> Self {
        match value {
            ProfileName::Full => Self::Full,
            ProfileName::Reduced => Self::Reduced,
            ProfileName::Minimal => Self::Minimal,
        }
    }
}

/// Result of one `persist` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOutcome {
    pub persisted: bool,
    pub profile: PersistProfile,
    /// Size of the accepted payload; zero when nothing was written.
    pub bytes_written: usize,
}

impl PersistOutcome {
    fn failed() -> Self {
        Self {
            persisted: false,
            profile: PersistProfile::Failed,
            bytes_written: 0,
        }
    }
}

/// Cuts `text` to at most `max_chars` characters, marker included.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Returns a copy of `session` reduced to the caps of `profile`.
pub fn compact(session: &PersistedSession, profile: &RetentionProfile) -> PersistedSession {
    let message_skip = session.messages.len().saturating_sub(profile.max_messages);
    let messages = session.messages[message_skip..]
        .iter()
        .map(|message| compact_message(message, profile))
        .collect();

    PersistedSession {
        session_id: session.session_id.clone(),
        messages,
        sections: compact_sections(&session.sections, profile),
        mode: session.mode,
        undo: compact_stack(&session.undo, profile.max_undo, profile),
        redo: compact_stack(&session.redo, profile.max_redo, profile),
        error_state: session.error_state.clone(),
        profile: Some(profile.name.as_str().to_string()),
    }
}

fn compact_message(message: &ChatMessage, profile: &RetentionProfile) -> ChatMessage {
    let mut compacted = message.clone();
    compacted.content = truncate_chars(&message.content, profile.max_message_chars);
    if let Some(edits) = compacted.edits.as_mut() {
        for edit in edits.iter_mut() {
            if let Some(title) = edit.title.as_mut() {
                *title = truncate_chars(title, profile.max_title_chars);
            }
            if let Some(content) = edit.content.as_mut() {
                *content = truncate_chars(content, profile.max_section_chars);
            }
        }
    }
    compacted
}

/// Keeps the lead section plus the newest `max_sections - 1` others.
fn compact_sections(sections: &[Section], profile: &RetentionProfile) -> Vec<Section> {
    let Some((lead, rest)) = sections.split_first() else {
        return Vec::new();
    };
    let tail_len = profile.max_sections.saturating_sub(1);
    let skip = rest.len().saturating_sub(tail_len);
    std::iter::once(lead)
        .chain(&rest[skip..])
        .map(|section| Section {
            title: truncate_chars(&section.title, profile.max_title_chars),
            content: truncate_chars(&section.content, profile.max_section_chars),
            ..section.clone()
        })
        .collect()
}

/// Truncation can make neighbours equal, so dedup runs again afterwards.
fn compact_stack(entries: &[Snapshot], limit: usize, profile: &RetentionProfile) -> Vec<Snapshot> {
    let recent = retain_recent(entries.to_vec(), limit);
    let compacted = recent
        .iter()
        .map(|entry| Snapshot::capture(compact_sections(entry.sections(), profile)))
        .collect();
    retain_recent(compacted, limit)
}

/// Persists `session` under the most faithful profile `sink` accepts.
pub fn persist(
    session: &PersistedSession,
    sink: &mut impl SnapshotSink,
    ladder: &ProfileLadder,
) -> PersistOutcome {
    let started_at = Instant::now();
    for profile in ladder.steps() {
        let compacted = compact(session, &profile);
        let payload = match serde_json::to_string(&compacted) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    "event=persist_attempt module=history status=error profile={} error_code=serialize_failed error={}",
                    profile.name.as_str(),
                    log_field(&err.to_string())
                );
                continue;
            }
        };

        match sink.write_snapshot(&session.session_id, profile.name, &payload) {
            Ok(()) => {
                info!(
                    "event=persist module=history status=ok profile={} bytes={} duration_ms={}",
                    profile.name.as_str(),
                    payload.len(),
                    started_at.elapsed().as_millis()
                );
                return PersistOutcome {
                    persisted: true,
                    profile: profile.name.into(),
                    bytes_written: payload.len(),
                };
            }
            Err(err) => {
                warn!(
                    "event=persist_attempt module=history status=rejected profile={} bytes={} error={}",
                    profile.name.as_str(),
                    payload.len(),
                    log_field(&err.to_string())
                );
            }
        }
    }

    error!(
        "event=persist module=history status=error profile={} duration_ms={} error_code=storage_exhausted",
        PersistProfile::Failed.as_str(),
        started_at.elapsed().as_millis()
    );
    PersistOutcome::failed()
}

#[cfg(test)]
mod tests {
    use super::{compact, persist, truncate_chars, PersistProfile, TRUNCATION_MARKER};
    use crate::history::profile::{ProfileLadder, ProfileName, RetentionProfile};
    use crate::history::sink::{MemorySnapshotStore, SinkError, SnapshotSink};
    use crate::model::conversation::ChatMessage;
    use crate::model::section::{Provenance, Section};
    use crate::model::session::PersistedSession;
    use crate::model::snapshot::Snapshot;

    struct RejectAll;

    impl SnapshotSink for RejectAll {
        fn write_snapshot(&mut self, _: &str, _: ProfileName, _: &str) -> Result<(), SinkError> {
            Err(SinkError::Backend("offline".to_string()))
        }
    }

    fn section(id: &str, content: &str) -> Section {
        Section::with_id(id, id, content, Provenance::User, 0)
    }

    #[test]
    fn truncate_keeps_total_within_cap() {
        assert_eq!(truncate_chars("short", 20), "short");
        let cut = truncate_chars(&"é".repeat(40), 20);
        assert_eq!(cut.chars().count(), 20);
        assert!(cut.ends_with(TRUNCATION_MARKER));
        assert!(cut.starts_with("éééééééé"));
    }

    #[test]
    fn compact_keeps_lead_and_newest_sections() {
        let mut session = PersistedSession::empty("s");
        session.sections = (0..5).map(|i| section(&format!("s{i}"), "x")).collect();
        let profile = RetentionProfile {
            max_sections: 3,
            ..RetentionProfile::MINIMAL
        };

        let compacted = compact(&session, &profile);
        let ids: Vec<&str> = compacted.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s0", "s3", "s4"]);
        assert_eq!(compacted.profile.as_deref(), Some("minimal"));
        assert_eq!(session.sections.len(), 5);
    }

    #[test]
    fn compact_drops_oldest_messages_and_caps_text() {
        let mut session = PersistedSession::empty("s");
        session.messages = (0..30)
            .map(|i| ChatMessage::user(format!("{i}:{}", "m".repeat(2_000))))
            .collect();

        let compacted = compact(&session, &RetentionProfile::MINIMAL);
        assert_eq!(compacted.messages.len(), 20);
        assert!(compacted.messages[0].content.starts_with("10:"));
        assert!(compacted
            .messages
            .iter()
            .all(|message| message.content.chars().count() <= 1_000));
    }

    #[test]
    fn compact_redups_stacks_after_truncation() {
        let long = "a".repeat(7_000);
        let mut session = PersistedSession::empty("s");
        session.undo = vec![
            Snapshot::capture(vec![section("lead", &format!("{long}1"))]),
            Snapshot::capture(vec![section("lead", &format!("{long}2"))]),
        ];

        let compacted = compact(&session, &RetentionProfile::MINIMAL);
        assert_eq!(compacted.undo.len(), 1);
        assert!(compacted.redo.is_empty());
    }

    #[test]
    fn persist_reports_failed_when_every_profile_is_rejected() {
        let outcome = persist(
            &PersistedSession::empty("s"),
            &mut RejectAll,
            &ProfileLadder::default(),
        );
        assert!(!outcome.persisted);
        assert_eq!(outcome.profile, PersistProfile::Failed);
        assert_eq!(outcome.bytes_written, 0);
    }

    #[test]
    fn persist_stops_at_first_accepted_profile() {
        let mut store = MemorySnapshotStore::new();
        let outcome = persist(
            &PersistedSession::empty("s"),
            &mut store,
            &ProfileLadder::default(),
        );
        assert_eq!(outcome.profile, PersistProfile::Full);
        assert_eq!(outcome.bytes_written, store.payload("s").unwrap().len());
    }
}
