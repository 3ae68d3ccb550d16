//! Repository layer for the local item store.
//!
//! # Responsibility
//! - Define the persistence contract the variant service depends on.
//! - Isolate SQLite query details from orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod item_repo;
