//! Use-case services over the core building blocks.
//!
//! # Responsibility
//! - Expose session-level entry points to hosts.
//!
//! # Invariants
//! - Services stay storage-agnostic; sinks and sources are injected.

pub mod session_service;
