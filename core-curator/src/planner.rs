//! # Reconciliation Planner
//!
//! Computes, for one grouping key, the steps that converge its collection to
//! the desired membership. Planning is pure: it sees the key, whether the
//! entity passes entity filters, and one [`Candidate`] per item that is
//! associated with the entity or linked into the collection.
//!
//! ## Plan Shape
//!
//! ```text
//! [delete duplicates]
//! entity absent / filtered out  → [delete collection]
//! resulting membership empty    → [delete collection]
//! otherwise                     → [create] [remove..] [add..] propagate
//! ```
//!
//! Removals always precede additions. Membership is compared by item id only.

use bridge_traits::catalog::{Collection, ItemId};
use serde::Serialize;
use std::fmt;

use crate::snapshot::SnapshotKey;

/// Membership facts about one item for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub item_id: ItemId,
    pub item_name: String,
    /// Returned by the variant's item query for the entity
    pub associated: bool,
    /// Currently linked into the key's collection
    pub linked: bool,
    /// Associated and passing item (and role) filters
    pub qualifies: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    /// No live entity carries the collection's name
    EntityMissing,
    EntityFilteredOut,
    /// No qualifying items remain
    Empty,
    /// Another collection already owns the name
    Duplicate,
}

impl DeleteReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteReason::EntityMissing => "entity_missing",
            DeleteReason::EntityFilteredOut => "entity_filtered_out",
            DeleteReason::Empty => "empty",
            DeleteReason::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for DeleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    DeleteCollection {
        collection: Collection,
        reason: DeleteReason,
    },
    /// Create the key's collection; later steps target it
    CreateCollection,
    RemoveItems(Vec<ItemId>),
    AddItems(Vec<ItemId>),
    /// Copy entity metadata onto the collection
    PropagateMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub name: String,
    pub steps: Vec<PlanStep>,
}

impl ReconciliationPlan {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn creates_collection(&self) -> bool {
        self.steps.contains(&PlanStep::CreateCollection)
    }

    pub fn deletions(&self) -> impl Iterator<Item = (&Collection, DeleteReason)> {
        self.steps.iter().filter_map(|step| match step {
            PlanStep::DeleteCollection { collection, reason } => Some((collection, *reason)),
            _ => None,
        })
    }

    pub fn additions(&self) -> &[ItemId] {
        self.items_of(|step| match step {
            PlanStep::AddItems(ids) => Some(ids),
            _ => None,
        })
    }

    pub fn removals(&self) -> &[ItemId] {
        self.items_of(|step| match step {
            PlanStep::RemoveItems(ids) => Some(ids),
            _ => None,
        })
    }

    fn items_of<'a>(&'a self, select: impl Fn(&'a PlanStep) -> Option<&'a Vec<ItemId>>) -> &'a [ItemId] {
        self.steps
            .iter()
            .find_map(select)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Plan one key
pub fn plan(key: &SnapshotKey, entity_passes: bool, candidates: &[Candidate]) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::new(key.name.clone());

    for duplicate in &key.duplicates {
        plan.steps.push(PlanStep::DeleteCollection {
            collection: duplicate.clone(),
            reason: DeleteReason::Duplicate,
        });
    }

    let reason = match &key.entity {
        None => Some(DeleteReason::EntityMissing),
        Some(_) if !entity_passes => Some(DeleteReason::EntityFilteredOut),
        Some(_) => None,
    };
    if let Some(reason) = reason {
        plan.delete_existing(key, reason);
        return plan;
    }

    let to_remove: Vec<ItemId> = candidates
        .iter()
        .filter(|c| c.linked && !c.qualifies)
        .map(|c| c.item_id)
        .collect();
    let to_add: Vec<ItemId> = candidates
        .iter()
        .filter(|c| !c.linked && c.qualifies)
        .map(|c| c.item_id)
        .collect();

    let resulting = candidates.iter().filter(|c| c.qualifies).count();
    if resulting == 0 {
        plan.delete_existing(key, DeleteReason::Empty);
        return plan;
    }

    if key.collection.is_none() {
        plan.steps.push(PlanStep::CreateCollection);
    }
    if !to_remove.is_empty() {
        plan.steps.push(PlanStep::RemoveItems(to_remove));
    }
    if !to_add.is_empty() {
        plan.steps.push(PlanStep::AddItems(to_add));
    }
    plan.steps.push(PlanStep::PropagateMetadata);

    plan
}

impl ReconciliationPlan {
    fn delete_existing(&mut self, key: &SnapshotKey, reason: DeleteReason) {
        if let Some(collection) = &key.collection {
            self.steps.push(PlanStep::DeleteCollection {
                collection: collection.clone(),
                reason,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::catalog::{CollectionId, FolderId, GroupingEntity, GroupingKind};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn collection(name: &str, linked: &[ItemId]) -> Collection {
        Collection {
            id: CollectionId::new(),
            name: name.to_string(),
            overview: None,
            images: Vec::new(),
            folder_id: FolderId::new(),
            path: PathBuf::from("/data/people-collections").join(format!("{} [boxset]", name)),
            virtual_library_ids: Vec::new(),
            linked_items: linked.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    fn key(entity: bool, collection: Option<Collection>) -> SnapshotKey {
        SnapshotKey {
            name: "Tom Hanks".to_string(),
            entity: entity.then(|| GroupingEntity::new(GroupingKind::Person, "Tom Hanks")),
            collection,
            duplicates: Vec::new(),
        }
    }

    fn candidate(linked: bool, qualifies: bool) -> Candidate {
        Candidate {
            item_id: ItemId::new(),
            item_name: "Big".to_string(),
            associated: qualifies,
            linked,
            qualifies,
        }
    }

    #[test]
    fn test_new_key_creates_then_adds() {
        let items = vec![candidate(false, true), candidate(false, true), candidate(false, false)];
        let plan = plan(&key(true, None), true, &items);

        assert_eq!(
            plan.steps,
            vec![
                PlanStep::CreateCollection,
                PlanStep::AddItems(vec![items[0].item_id, items[1].item_id]),
                PlanStep::PropagateMetadata,
            ]
        );
    }

    #[test]
    fn test_filtered_entity_deletes_regardless_of_membership() {
        let existing = collection("Tom Hanks", &[]);
        let items = vec![candidate(true, true)];
        let plan = plan(&key(true, Some(existing.clone())), false, &items);

        assert_eq!(
            plan.steps,
            vec![PlanStep::DeleteCollection {
                collection: existing,
                reason: DeleteReason::EntityFilteredOut,
            }]
        );
    }

    #[test]
    fn test_orphan_collection_is_deleted() {
        let existing = collection("Tom Hanks", &[]);
        let plan = plan(&key(false, Some(existing)), true, &[]);

        let reasons: Vec<_> = plan.deletions().map(|(_, r)| r).collect();
        assert_eq!(reasons, vec![DeleteReason::EntityMissing]);
    }

    #[test]
    fn test_missing_entity_without_collection_is_noop() {
        assert!(plan(&key(false, None), true, &[]).is_empty());
    }

    #[test]
    fn test_removals_precede_additions() {
        let stale = candidate(true, false);
        let kept = candidate(true, true);
        let fresh = candidate(false, true);
        let existing = collection("Tom Hanks", &[stale.item_id, kept.item_id]);

        let plan = plan(
            &key(true, Some(existing)),
            true,
            &[stale.clone(), kept, fresh.clone()],
        );

        assert_eq!(
            plan.steps,
            vec![
                PlanStep::RemoveItems(vec![stale.item_id]),
                PlanStep::AddItems(vec![fresh.item_id]),
                PlanStep::PropagateMetadata,
            ]
        );
        assert_eq!(plan.removals(), &[stale.item_id]);
        assert_eq!(plan.additions(), &[fresh.item_id]);
    }

    #[test]
    fn test_emptied_collection_is_deleted_without_removals() {
        let stale = candidate(true, false);
        let existing = collection("Tom Hanks", &[stale.item_id]);
        let plan = plan(&key(true, Some(existing)), true, &[stale]);

        assert_eq!(plan.steps.len(), 1);
        assert!(matches!(
            plan.steps[0],
            PlanStep::DeleteCollection {
                reason: DeleteReason::Empty,
                ..
            }
        ));
    }

    #[test]
    fn test_no_qualifying_items_and_no_collection_is_noop() {
        let plan = plan(&key(true, None), true, &[candidate(false, false)]);
        assert!(plan.is_empty());
        assert!(!plan.creates_collection());
    }

    #[test]
    fn test_converged_key_only_propagates() {
        let kept = candidate(true, true);
        let existing = collection("Tom Hanks", &[kept.item_id]);
        let plan = plan(&key(true, Some(existing)), true, &[kept]);

        assert_eq!(plan.steps, vec![PlanStep::PropagateMetadata]);
    }

    #[test]
    fn test_duplicates_deleted_first() {
        let kept = candidate(true, true);
        let duplicate = collection("Tom Hanks", &[]);
        let mut key = key(true, Some(collection("Tom Hanks", &[kept.item_id])));
        key.duplicates.push(duplicate.clone());

        let plan = plan(&key, true, &[kept]);
        assert_eq!(
            plan.steps[0],
            PlanStep::DeleteCollection {
                collection: duplicate,
                reason: DeleteReason::Duplicate,
            }
        );
        assert_eq!(plan.steps[1], PlanStep::PropagateMetadata);
    }
}
