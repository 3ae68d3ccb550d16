//! Personalization domain model.
//!
//! # Responsibility
//! - Define audiences, variant records and variant families.
//! - Provide the taxonomy and content-type lookups the core relies on.
//!
//! # Invariants
//! - Every content item is identified by a stable `ItemId`.
//! - A variant family always has exactly one base record.

pub mod audience;
pub mod element;
pub mod family;
pub mod taxonomy;
pub mod variant;
