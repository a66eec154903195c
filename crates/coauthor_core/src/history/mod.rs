//! Undo/redo history and budgeted persistence.

pub mod compactor;
pub mod profile;
pub mod sink;
pub mod stacks;
