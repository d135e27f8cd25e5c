//! # Library Snapshot Reader
//!
//! Materializes a point-in-time view of the catalog for one run.
//!
//! ## Overview
//!
//! [`LibrarySnapshot::read`] resolves the dedicated collection folder, lists
//! every grouping entity and every collection under the folder, and joins them
//! by name into [`SnapshotKey`]s: entities first in catalog order, then orphan
//! collections in folder order. The key list is never re-read during a run.
//!
//! Per-key membership ([`KeyMembership`]) is loaded lazily inside that key's
//! processing step so a failing read only affects its own key. Role
//! assignments are cached for the run in a [`RoleIndex`].

use bridge_traits::catalog::{
    Collection, CollectionFolder, GroupingEntity, GroupingKind, Item, ItemId, LibraryCatalog,
    RoleAssignment,
};
use bridge_traits::error::Result as BridgeResult;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument, warn};

use crate::filter::CompiledFilters;
use crate::planner::Candidate;
use crate::variant::GroupingVariant;

/// One grouping key: a name joined with its entity and collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotKey {
    pub name: String,
    pub entity: Option<GroupingEntity>,
    pub collection: Option<Collection>,
    /// Further collections sharing the name
    pub duplicates: Vec<Collection>,
}

impl SnapshotKey {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: None,
            collection: None,
            duplicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LibrarySnapshot {
    pub kind: GroupingKind,
    pub folder: CollectionFolder,
    pub keys: Vec<SnapshotKey>,
}

impl LibrarySnapshot {
    #[instrument(skip(catalog))]
    pub async fn read(catalog: &dyn LibraryCatalog, kind: GroupingKind) -> BridgeResult<Self> {
        let folder = catalog.ensure_collection_folder(kind).await?;
        let entities = catalog.grouping_entities(kind).await?;
        let collections = catalog.collections_in(folder.id).await?;

        let keys = join_keys(entities, collections);
        debug!(
            kind = %kind,
            folder = %folder.name,
            keys = keys.len(),
            "Library snapshot read"
        );

        Ok(Self { kind, folder, keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn join_keys(entities: Vec<GroupingEntity>, collections: Vec<Collection>) -> Vec<SnapshotKey> {
    let mut keys: Vec<SnapshotKey> = Vec::with_capacity(entities.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(entities.len());

    for entity in entities {
        if index.contains_key(&entity.name) {
            warn!(name = %entity.name, entity_id = %entity.id, "Duplicate entity name, keeping first");
            continue;
        }
        index.insert(entity.name.clone(), keys.len());
        let mut key = SnapshotKey::new(entity.name.clone());
        key.entity = Some(entity);
        keys.push(key);
    }

    for collection in collections {
        let position = match index.get(&collection.name) {
            Some(position) => *position,
            None => {
                index.insert(collection.name.clone(), keys.len());
                keys.push(SnapshotKey::new(collection.name.clone()));
                keys.len() - 1
            }
        };

        let key = &mut keys[position];
        if key.collection.is_none() {
            key.collection = Some(collection);
        } else {
            key.duplicates.push(collection);
        }
    }

    keys
}

// ============================================================================
// Per-key membership
// ============================================================================

/// Role assignments fetched during one run
#[derive(Debug, Default)]
pub struct RoleIndex {
    roles: HashMap<ItemId, Vec<RoleAssignment>>,
}

impl RoleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn roles_for(
        &mut self,
        catalog: &dyn LibraryCatalog,
        item_id: ItemId,
    ) -> BridgeResult<&[RoleAssignment]> {
        if !self.roles.contains_key(&item_id) {
            let roles = catalog.item_roles(item_id).await?;
            self.roles.insert(item_id, roles);
        }
        Ok(self.roles.get(&item_id).map(Vec::as_slice).unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Items associated with a key's entity and items linked into its collection
#[derive(Debug, Clone, Default)]
pub struct KeyMembership {
    pub entity_items: BTreeMap<ItemId, Item>,
    pub linked_items: BTreeMap<ItemId, Item>,
}

impl KeyMembership {
    pub async fn load(
        catalog: &dyn LibraryCatalog,
        variant: &dyn GroupingVariant,
        key: &SnapshotKey,
    ) -> BridgeResult<Self> {
        let mut membership = Self::default();

        if let Some(entity) = &key.entity {
            let query = variant.item_query(entity);
            for item in catalog.query_items(&query).await? {
                membership.entity_items.insert(item.id, item);
            }
        }

        if let Some(collection) = &key.collection {
            for item in catalog.linked_children(collection.id).await? {
                membership.linked_items.insert(item.id, item);
            }
        }

        Ok(membership)
    }

    /// Evaluate every associated or linked item against the current filters
    pub async fn evaluate(
        &self,
        catalog: &dyn LibraryCatalog,
        variant: &dyn GroupingVariant,
        filters: &CompiledFilters,
        entity: &GroupingEntity,
        roles: &mut RoleIndex,
    ) -> BridgeResult<Vec<Candidate>> {
        let mut candidates = Vec::with_capacity(self.entity_items.len() + self.linked_items.len());

        let linked_only = self
            .linked_items
            .values()
            .filter(|item| !self.entity_items.contains_key(&item.id));

        for item in self.entity_items.values().chain(linked_only) {
            let associated = self.entity_items.contains_key(&item.id);
            let linked = self.linked_items.contains_key(&item.id);

            let mut qualifies = associated && filters.item_matches(item);
            if qualifies && variant.uses_role_assignments() {
                qualifies = roles
                    .roles_for(catalog, item.id)
                    .await?
                    .iter()
                    .any(|role| role.person_name == entity.name && filters.role_matches(role));
            }

            candidates.push(Candidate {
                item_id: item.id,
                item_name: item.name.clone(),
                associated,
                linked,
                qualifies,
            });
        }

        Ok(candidates)
    }
}
