//! Domain model for co-authored documents.
//!
//! # Responsibility
//! - Define sections, edit instructions, snapshots and conversation payloads.
//! - Keep wire naming (`snake_case`) stable for persistence and agent I/O.
//!
//! # Invariants
//! - Every section is identified by a stable `SectionId`.
//! - Sections are never removed by instructions; `clear_section` empties them.

pub mod conversation;
pub mod instruction;
pub mod section;
pub mod session;
pub mod snapshot;
