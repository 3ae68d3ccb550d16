//! Variant set coordination.
//!
//! # Responsibility
//! - Plan the per-item link mutations that keep a family cross-linked.
//! - Fan planned mutations out to a link updater and collect the outcome.
//!
//! # Invariants
//! - Planning is pure and preserves member order.
//! - Link lists are sets: applying an instruction twice equals applying it once.
//! - Applied mutations are never rolled back.

pub mod fanout;
pub mod plan;

use std::fmt::{Display, Formatter};

/// Lifecycle of one record's membership in a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipState {
    /// Creation requested; no record exists yet.
    Proposed,
    /// Record exists but at least one sibling link update failed.
    PartiallyLinked,
    /// Record exists and every sibling links to it.
    Linked,
    /// Record and every link to it are gone.
    Removed,
}

impl Display for MembershipState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Proposed => "proposed",
            Self::PartiallyLinked => "partially_linked",
            Self::Linked => "linked",
            Self::Removed => "removed",
        };
        f.write_str(label)
    }
}
