//! Link mutation planning.

use crate::model::variant::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Change applied to one item's variant-links field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOperation {
    Add,
    Remove,
}

impl Display for LinkOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// One planned mutation: apply `operation` with `variant_id` on `item_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkInstruction {
    pub item_id: ItemId,
    pub operation: LinkOperation,
    pub variant_id: ItemId,
}

/// Plans the links that announce a new variant to every existing member.
///
/// Produces exactly one `Add` per entry of `members`, in input order. The
/// new variant's own links to its siblings are written when it is created.
pub fn plan_addition_links(members: &[ItemId], new_variant_id: ItemId) -> Vec<LinkInstruction> {
    members
        .iter()
        .map(|&item_id| LinkInstruction {
            item_id,
            operation: LinkOperation::Add,
            variant_id: new_variant_id,
        })
        .collect()
}

/// Plans the links that forget a removed variant.
///
/// Produces one `Remove` per member other than `removed_variant_id`, in
/// input order.
pub fn plan_removal_links(
    members: &[ItemId],
    removed_variant_id: ItemId,
) -> Vec<LinkInstruction> {
    members
        .iter()
        .filter(|&&item_id| item_id != removed_variant_id)
        .map(|&item_id| LinkInstruction {
            item_id,
            operation: LinkOperation::Remove,
            variant_id: removed_variant_id,
        })
        .collect()
}

/// Applies one operation to a link list with set semantics.
///
/// `Add` appends only when absent; `Remove` drops every occurrence.
/// Existing order is kept.
pub fn apply_link_operation(
    links: &[ItemId],
    operation: LinkOperation,
    variant_id: ItemId,
) -> Vec<ItemId> {
    match operation {
        LinkOperation::Add => {
            let mut next = links.to_vec();
            if !next.contains(&variant_id) {
                next.push(variant_id);
            }
            next
        }
        LinkOperation::Remove => links
            .iter()
            .copied()
            .filter(|&linked| linked != variant_id)
            .collect(),
    }
}
