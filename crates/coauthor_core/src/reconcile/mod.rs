//! Document reconciliation engine.
//!
//! # Responsibility
//! - Turn a batch of edit instructions into the next section list.
//! - Keep agent content safe (markup filtering) and free of restated
//!   duplicates.
//!
//! # Invariants
//! - Deterministic for a given input and context, apart from generated ids
//!   of new sections.
//! - Preview and final batches go through the same code path; keeping
//!   preview results out of history is the caller's job.

pub mod engine;
pub mod identity;
pub mod merge;
pub mod sanitize;
mod text;
pub mod title;

pub use text::{has_markup, normalized_plain_text};
