//! Incremental decoding of streamed agent responses.
//!
//! # Responsibility
//! - Recover the assistant text and edit instructions from a response that
//!   is still arriving.
//! - Treat "not enough data yet" as a normal state, never as an error.
//!
//! # Invariants
//! - Decoding re-scans the whole buffer per call; work is linear in its size.
//! - Instructions surfaced as previews are never retracted by later chunks.

mod cursor;
pub mod decoder;
pub mod frame;

pub use cursor::Scanned;
