//! Concurrent application of planned link mutations.
//!
//! # Responsibility
//! - Dispatch every instruction of a plan to a `LinkUpdater` in parallel.
//! - Wait for all of them and fold the outcomes into one result.
//!
//! # Invariants
//! - Every instruction is attempted, even after another one failed.
//! - Applied instructions are kept when others fail; there is no rollback.
//! - The reported error is the first failure in plan order, not in
//!   completion order.

use crate::coordinator::plan::LinkInstruction;
use crate::model::variant::ItemId;
use log::{info, warn};
use rayon::prelude::*;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Applies one link instruction to the item it targets.
///
/// Implementations must treat links as a set: `Add` of an already linked id
/// and `Remove` of an absent id both succeed without changes.
pub trait LinkUpdater {
    type Error: Display;

    fn update_links(&self, instruction: &LinkInstruction) -> Result<(), Self::Error>;
}

impl<U: LinkUpdater + ?Sized> LinkUpdater for &U {
    type Error = U::Error;

    fn update_links(&self, instruction: &LinkInstruction) -> Result<(), Self::Error> {
        (**self).update_links(instruction)
    }
}

/// Outcome of a fully successful fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutReport {
    /// Items updated, in plan order.
    pub updated: Vec<ItemId>,
}

/// Some link updates of a plan failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialMutationFailure {
    /// Message of the first failed instruction in plan order.
    pub first_error: String,
    /// Items whose update failed, in plan order.
    pub failed: Vec<ItemId>,
    /// Items whose update was committed, in plan order.
    pub applied: Vec<ItemId>,
}

impl Display for PartialMutationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} link updates failed: {}",
            self.failed.len(),
            self.failed.len() + self.applied.len(),
            self.first_error
        )
    }
}

impl Error for PartialMutationFailure {}

/// Applies `plan` through `updater`, all instructions concurrently.
///
/// Returns only after every instruction settled.
pub fn apply_link_plan<U>(
    updater: &U,
    plan: &[LinkInstruction],
) -> Result<FanOutReport, PartialMutationFailure>
where
    U: LinkUpdater + Sync + ?Sized,
    U::Error: Send,
{
    let started_at = Instant::now();

    let outcomes: Vec<(ItemId, Result<(), U::Error>)> = plan
        .par_iter()
        .map(|instruction| (instruction.item_id, updater.update_links(instruction)))
        .collect();

    let mut applied = Vec::with_capacity(outcomes.len());
    let mut failed = Vec::new();
    let mut first_error = None;

    for ((item_id, outcome), instruction) in outcomes.into_iter().zip(plan) {
        match outcome {
            Ok(()) => applied.push(item_id),
            Err(err) => {
                warn!(
                    "event=link_update module=coordinator status=error item_id={} operation={} variant_id={} error={}",
                    item_id, instruction.operation, instruction.variant_id, err
                );
                first_error.get_or_insert_with(|| err.to_string());
                failed.push(item_id);
            }
        }
    }

    info!(
        "event=link_fanout module=coordinator status={} planned={} applied={} failed={} duration_ms={}",
        if failed.is_empty() { "ok" } else { "error" },
        plan.len(),
        applied.len(),
        failed.len(),
        started_at.elapsed().as_millis()
    );

    match first_error {
        None => Ok(FanOutReport { updated: applied }),
        Some(first_error) => Err(PartialMutationFailure {
            first_error,
            failed,
            applied,
        }),
    }
}
