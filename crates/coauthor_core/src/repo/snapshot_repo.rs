//! SQLite-backed session snapshot store.
//!
//! # Responsibility
//! - Upsert the latest compacted payload of each session.
//! - Surface SQLite capacity failures as `SinkError::StorageFull` so the
//!   compactor can step down its retention ladder.
//!
//! # Invariants
//! - One row per session; the latest successful write wins.
//! - A failed write is rolled back and leaves the previous row intact.
//! - Read paths reject undecodable payloads instead of masking them.

use crate::db::{DbError, DbResult};
use crate::history::profile::ProfileName;
use crate::history::sink::{decode_payload, SinkError, SnapshotSink, SnapshotSource};
use crate::model::session::PersistedSession;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

/// Snapshot store over a migrated connection.
pub struct SqliteSnapshotStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSnapshotStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Creates a store whose database may not grow beyond `max_pages`.
    ///
    /// The cap is a connection-level SQLite setting and applies to every
    /// user of `conn`. SQLite never lowers it below the current page count;
    /// the effective value is returned by [`Self::page_budget`].
    pub fn with_page_budget(conn: &'conn Connection, max_pages: u32) -> DbResult<Self> {
        conn.query_row(
            &format!("PRAGMA max_page_count = {max_pages};"),
            [],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(Self { conn })
    }

    /// Returns the active page cap.
    pub fn page_budget(&self) -> DbResult<u32> {
        let pages = self
            .conn
            .query_row("PRAGMA max_page_count;", [], |row| row.get::<_, u32>(0))?;
        Ok(pages)
    }

    /// Returns the pages currently in use.
    pub fn page_count(&self) -> DbResult<u32> {
        let pages = self
            .conn
            .query_row("PRAGMA page_count;", [], |row| row.get::<_, u32>(0))?;
        Ok(pages)
    }

    /// Returns the profile the stored payload was written under.
    pub fn stored_profile(&self, session_id: &str) -> Result<Option<ProfileName>, SinkError> {
        let profile: Option<String> = self
            .conn
            .query_row(
                "SELECT profile FROM session_snapshots WHERE session_id = ?1;",
                [session_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(sink_error)?;

        profile
            .map(|value| {
                ProfileName::parse(&value).ok_or_else(|| {
                    SinkError::InvalidData(format!(
                        "invalid profile `{value}` in session_snapshots.profile"
                    ))
                })
            })
            .transpose()
    }

    /// Lists stored session ids, most recently written first.
    pub fn list_sessions(&self) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id
             FROM session_snapshots
             ORDER BY updated_at DESC, session_id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    /// Removes a stored session. Returns whether a row existed.
    pub fn delete_snapshot(&self, session_id: &str) -> DbResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM session_snapshots WHERE session_id = ?1;",
            [session_id],
        )?;
        Ok(changed > 0)
    }
}

impl SnapshotSink for SqliteSnapshotStore<'_> {
    fn write_snapshot(
        &mut self,
        session_id: &str,
        profile: ProfileName,
        payload: &str,
    ) -> Result<(), SinkError> {
        self.conn
            .execute(
                "INSERT INTO session_snapshots (session_id, profile, payload, updated_at)
                 VALUES (?1, ?2, ?3, (strftime('%s', 'now') * 1000))
                 ON CONFLICT (session_id) DO UPDATE SET
                    profile = excluded.profile,
                    payload = excluded.payload,
                    updated_at = excluded.updated_at;",
                params![session_id, profile.as_str(), payload],
            )
            .map_err(sink_error)?;
        Ok(())
    }
}

impl SnapshotSource for SqliteSnapshotStore<'_> {
    fn load_snapshot(&self, session_id: &str) -> Result<Option<PersistedSession>, SinkError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM session_snapshots WHERE session_id = ?1;",
                [session_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(sink_error)?;

        payload.as_deref().map(decode_payload).transpose()
    }
}

fn sink_error(err: rusqlite::Error) -> SinkError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DiskFull) | Some(ErrorCode::TooBig) => SinkError::StorageFull,
        _ => SinkError::Backend(DbError::Sqlite(err).to_string()),
    }
}
