use personalize_core::{
    apply_link_operation, apply_link_plan, plan_addition_links, plan_removal_links, ItemId,
    LinkInstruction, LinkOperation, LinkUpdater,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory link store with set semantics and optional failing items.
#[derive(Default)]
struct FakeLinkStore {
    links: Mutex<BTreeMap<ItemId, Vec<ItemId>>>,
    failing: HashSet<ItemId>,
    calls: AtomicUsize,
}

impl FakeLinkStore {
    fn with_items(items: &[ItemId]) -> Self {
        let links = items.iter().map(|id| (*id, Vec::new())).collect();
        Self {
            links: Mutex::new(links),
            ..Self::default()
        }
    }

    fn failing_on(mut self, item_id: ItemId) -> Self {
        self.failing.insert(item_id);
        self
    }

    fn links_of(&self, item_id: ItemId) -> Vec<ItemId> {
        self.links.lock().unwrap()[&item_id].clone()
    }
}

impl LinkUpdater for FakeLinkStore {
    type Error = String;

    fn update_links(&self, instruction: &LinkInstruction) -> Result<(), Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&instruction.item_id) {
            return Err(format!("update rejected for {}", instruction.item_id));
        }
        let mut links = self.links.lock().unwrap();
        let current = links
            .get_mut(&instruction.item_id)
            .ok_or_else(|| format!("missing item {}", instruction.item_id))?;
        let next = apply_link_operation(current, instruction.operation, instruction.variant_id);
        *current = next;
        Ok(())
    }
}

fn ids(count: usize) -> Vec<ItemId> {
    (0..count).map(|_| Uuid::new_v4()).collect()
}

#[test]
fn addition_plan_has_one_add_per_member_in_order() {
    let members = ids(4);
    let new_id = Uuid::new_v4();

    let plan = plan_addition_links(&members, new_id);
    assert_eq!(plan.len(), members.len());
    for (instruction, member) in plan.iter().zip(&members) {
        assert_eq!(
            instruction,
            &LinkInstruction {
                item_id: *member,
                operation: LinkOperation::Add,
                variant_id: new_id,
            }
        );
    }
}

#[test]
fn addition_plan_for_empty_family_is_empty() {
    assert!(plan_addition_links(&[], Uuid::new_v4()).is_empty());
}

#[test]
fn removal_plan_excludes_removed_member() {
    let members = ids(5);
    let removed = members[2];

    let plan = plan_removal_links(&members, removed);
    assert_eq!(plan.len(), members.len() - 1);
    assert!(plan.iter().all(|instruction| instruction.item_id != removed));
    assert!(plan.iter().all(|instruction| {
        instruction.operation == LinkOperation::Remove && instruction.variant_id == removed
    }));
    let targets: Vec<ItemId> = plan.iter().map(|instruction| instruction.item_id).collect();
    assert_eq!(targets, vec![members[0], members[1], members[3], members[4]]);
}

#[test]
fn creating_third_variant_targets_base_and_both_siblings() {
    let (b, v1, v2, v3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let plan = plan_addition_links(&[b, v1, v2], v3);
    let targets: Vec<ItemId> = plan.iter().map(|instruction| instruction.item_id).collect();
    assert_eq!(targets, vec![b, v1, v2]);
    assert!(plan.iter().all(|instruction| instruction.variant_id == v3));
}

#[test]
fn deleting_first_variant_targets_remaining_members() {
    let (b, v1, v2, v3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let plan = plan_removal_links(&[b, v1, v2, v3], v1);
    let targets: Vec<ItemId> = plan.iter().map(|instruction| instruction.item_id).collect();
    assert_eq!(targets, vec![b, v2, v3]);
    assert!(plan.iter().all(|instruction| instruction.variant_id == v1));
}

#[test]
fn fanout_applies_every_instruction() {
    let members = ids(6);
    let new_id = Uuid::new_v4();
    let store = FakeLinkStore::with_items(&members);

    let report = apply_link_plan(&store, &plan_addition_links(&members, new_id)).unwrap();
    assert_eq!(report.updated, members);
    for member in &members {
        assert_eq!(store.links_of(*member), vec![new_id]);
    }
}

#[test]
fn applying_same_add_twice_equals_applying_once() {
    let members = ids(3);
    let new_id = Uuid::new_v4();
    let store = FakeLinkStore::with_items(&members);
    let plan = plan_addition_links(&members, new_id);

    apply_link_plan(&store, &plan).unwrap();
    let after_once: Vec<Vec<ItemId>> = members.iter().map(|id| store.links_of(*id)).collect();
    apply_link_plan(&store, &plan).unwrap();
    let after_twice: Vec<Vec<ItemId>> = members.iter().map(|id| store.links_of(*id)).collect();

    assert_eq!(after_once, after_twice);
}

#[test]
fn partial_failure_reports_first_error_in_plan_order_without_rollback() {
    let members = ids(4);
    let new_id = Uuid::new_v4();
    let store = FakeLinkStore::with_items(&members)
        .failing_on(members[1])
        .failing_on(members[3]);

    let failure = apply_link_plan(&store, &plan_addition_links(&members, new_id)).unwrap_err();

    assert_eq!(store.calls.load(Ordering::SeqCst), members.len());
    assert_eq!(failure.first_error, format!("update rejected for {}", members[1]));
    assert_eq!(failure.failed, vec![members[1], members[3]]);
    assert_eq!(failure.applied, vec![members[0], members[2]]);
    assert_eq!(store.links_of(members[0]), vec![new_id]);
    assert_eq!(store.links_of(members[2]), vec![new_id]);
    assert!(store.links_of(members[1]).is_empty());
    assert!(failure.to_string().starts_with("2 of 4 link updates failed"));
}

#[test]
fn removal_fanout_drops_link_everywhere() {
    let members = ids(3);
    let removed = members[2];
    let store = FakeLinkStore::with_items(&members);
    apply_link_plan(&store, &plan_addition_links(&members[..2], removed)).unwrap();

    let report = apply_link_plan(&store, &plan_removal_links(&members, removed)).unwrap();
    assert_eq!(report.updated, vec![members[0], members[1]]);
    assert!(store.links_of(members[0]).is_empty());
    assert!(store.links_of(members[1]).is_empty());
}
