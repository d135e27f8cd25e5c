//! In-memory catalog store

use async_trait::async_trait;
use bridge_traits::{
    catalog::{
        Collection, CollectionFolder, CollectionId, EntityId, FolderId, GroupingEntity,
        GroupingKind, ImageInfo, Item, ItemId, ItemQuery, LibraryCatalog, MetadataUpdate,
        RoleAssignment, RoleType,
    },
    error::{BridgeError, Result},
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A catalog call recorded by [`InMemoryCatalog`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CatalogOp {
    CreateFolder {
        kind: GroupingKind,
    },
    CreateCollection {
        name: String,
    },
    DeleteCollection {
        name: String,
        delete_storage: bool,
    },
    AddItems {
        collection: String,
        items: Vec<ItemId>,
    },
    RemoveItems {
        collection: String,
        items: Vec<ItemId>,
    },
    UpdateMetadata {
        collection: String,
        update: MetadataUpdate,
    },
    RefreshEntity {
        name: String,
    },
}

impl CatalogOp {
    /// Whether the call changed folders or collections
    pub fn is_mutation(&self) -> bool {
        !matches!(self, CatalogOp::RefreshEntity { .. })
    }
}

/// Canned provider data applied on entity refresh
#[derive(Debug, Clone, Default)]
struct RefreshResult {
    overview: Option<String>,
    images: Vec<ImageInfo>,
}

#[derive(Default)]
struct CatalogState {
    entities: Vec<GroupingEntity>,
    items: Vec<Item>,
    roles: HashMap<ItemId, Vec<RoleAssignment>>,
    entity_items: HashMap<EntityId, BTreeSet<ItemId>>,
    folders: HashMap<GroupingKind, CollectionFolder>,
    collections: Vec<Collection>,
    refresh_results: HashMap<EntityId, RefreshResult>,
    deleted_storage: Vec<PathBuf>,
    ops: Vec<CatalogOp>,
    failing_entities: HashSet<EntityId>,
    failing_collections: HashSet<String>,
    failing_memberships: HashSet<String>,
}

impl CatalogState {
    fn entity(&self, id: EntityId) -> Result<&GroupingEntity> {
        self.entities
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| BridgeError::not_found("entity", id))
    }

    fn collection_mut(&mut self, id: CollectionId) -> Result<&mut Collection> {
        let collection = self
            .collections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| BridgeError::not_found("collection", id))?;

        if self.failing_collections.contains(&collection.name) {
            return Err(BridgeError::Storage(format!(
                "Write rejected for collection '{}'",
                collection.name
            )));
        }
        Ok(collection)
    }

    fn membership_mut(&mut self, id: CollectionId) -> Result<&mut Collection> {
        let name = self.collection_mut(id)?.name.clone();
        if self.failing_memberships.contains(&name) {
            return Err(BridgeError::Storage(format!(
                "Membership write rejected for collection '{}'",
                name
            )));
        }
        self.collection_mut(id)
    }

    fn folder(&mut self, root: &Path, kind: GroupingKind) -> (CollectionFolder, bool) {
        if let Some(folder) = self.folders.get(&kind) {
            return (folder.clone(), false);
        }

        let folder = CollectionFolder {
            id: FolderId::new(),
            kind,
            name: kind.folder_name().to_string(),
            path: root.join(kind.folder_dir_name()),
            virtual_library_ids: vec![Uuid::new_v4()],
        };
        self.folders.insert(kind, folder.clone());
        (folder, true)
    }
}

/// Process-local [`LibraryCatalog`]
///
/// Collections are kept in creation order and may share a name, which lets
/// callers reproduce libraries where duplicates already exist.
pub struct InMemoryCatalog {
    root: PathBuf,
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    /// Create an empty catalog rooted at the given data directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: RwLock::new(CatalogState::default()),
        }
    }

    // ========================================================================
    // Seeding
    // ========================================================================

    pub async fn add_entity(&self, entity: GroupingEntity) -> EntityId {
        let id = entity.id;
        self.state.write().await.entities.push(entity);
        id
    }

    /// Remove an entity and its credits from the library
    pub async fn remove_entity(&self, id: EntityId) {
        let mut state = self.state.write().await;
        state.entities.retain(|e| e.id != id);
        state.entity_items.remove(&id);
    }

    pub async fn add_item(&self, item: Item) -> ItemId {
        let id = item.id;
        self.state.write().await.items.push(item);
        id
    }

    /// Credit a person on an item with a role
    pub async fn credit_person(
        &self,
        item: ItemId,
        person: EntityId,
        role_type: RoleType,
        role_name: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let name = state.entity(person)?.name.clone();

        let mut role = RoleAssignment::new(name, role_type);
        if let Some(role_name) = role_name {
            role = role.with_role_name(role_name);
        }

        state.roles.entry(item).or_default().push(role);
        state.entity_items.entry(person).or_default().insert(item);
        Ok(())
    }

    /// Credit a studio on an item
    pub async fn credit_studio(&self, item: ItemId, studio: EntityId) -> Result<()> {
        let mut state = self.state.write().await;
        let name = state.entity(studio)?.name.clone();

        if let Some(stored) = state.items.iter_mut().find(|i| i.id == item) {
            stored.studios.push(name);
        }
        state.entity_items.entry(studio).or_default().insert(item);
        Ok(())
    }

    /// Drop every credit linking an entity to an item
    pub async fn uncredit(&self, item: ItemId, entity: EntityId) {
        let mut state = self.state.write().await;
        if let Some(items) = state.entity_items.get_mut(&entity) {
            items.remove(&item);
        }
        let name = state.entity(entity).map(|e| e.name.clone()).ok();
        if let (Some(name), Some(roles)) = (name, state.roles.get_mut(&item)) {
            roles.retain(|r| r.person_name != name);
        }
    }

    /// Insert a collection directly, bypassing the operation log
    pub async fn seed_collection(
        &self,
        kind: GroupingKind,
        name: &str,
        items: &[ItemId],
    ) -> Collection {
        let mut state = self.state.write().await;
        let (folder, _) = state.folder(&self.root, kind);
        let collection = Collection {
            id: CollectionId::new(),
            name: name.to_string(),
            overview: None,
            images: Vec::new(),
            folder_id: folder.id,
            path: folder.collection_path(name),
            virtual_library_ids: folder.virtual_library_ids.clone(),
            linked_items: items.iter().copied().collect(),
        };
        state.collections.push(collection.clone());
        collection
    }

    /// Provider data returned by the next refreshes of an entity
    pub async fn set_refresh_result(
        &self,
        entity: EntityId,
        overview: Option<&str>,
        images: Vec<ImageInfo>,
    ) {
        self.state.write().await.refresh_results.insert(
            entity,
            RefreshResult {
                overview: overview.map(str::to_string),
                images,
            },
        );
    }

    // ========================================================================
    // Fault Injection
    // ========================================================================

    /// Make item queries for an entity fail
    pub async fn fail_item_queries_for(&self, entity: EntityId) {
        self.state.write().await.failing_entities.insert(entity);
    }

    /// Make writes to collections with this name fail
    pub async fn fail_writes_for(&self, collection_name: &str) {
        self.state
            .write()
            .await
            .failing_collections
            .insert(collection_name.to_string());
    }

    /// Make item additions and removals fail for collections with this name
    pub async fn fail_membership_writes_for(&self, collection_name: &str) {
        self.state
            .write()
            .await
            .failing_memberships
            .insert(collection_name.to_string());
    }

    pub async fn clear_faults(&self) {
        let mut state = self.state.write().await;
        state.failing_entities.clear();
        state.failing_collections.clear();
        state.failing_memberships.clear();
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub async fn operations(&self) -> Vec<CatalogOp> {
        self.state.read().await.ops.clone()
    }

    /// Recorded calls that changed folders or collections
    pub async fn mutations(&self) -> Vec<CatalogOp> {
        self.state
            .read()
            .await
            .ops
            .iter()
            .filter(|op| op.is_mutation())
            .cloned()
            .collect()
    }

    pub async fn clear_operations(&self) {
        self.state.write().await.ops.clear();
    }

    /// Collections under the folder of a kind, in creation order
    pub async fn collections(&self, kind: GroupingKind) -> Vec<Collection> {
        let state = self.state.read().await;
        let Some(folder) = state.folders.get(&kind) else {
            return Vec::new();
        };
        state
            .collections
            .iter()
            .filter(|c| c.folder_id == folder.id)
            .cloned()
            .collect()
    }

    pub async fn collection_named(&self, kind: GroupingKind, name: &str) -> Option<Collection> {
        self.collections(kind)
            .await
            .into_iter()
            .find(|c| c.name == name)
    }

    pub async fn entity(&self, id: EntityId) -> Option<GroupingEntity> {
        self.state.read().await.entity(id).ok().cloned()
    }

    /// Storage locations removed together with their collection
    pub async fn deleted_storage(&self) -> Vec<PathBuf> {
        self.state.read().await.deleted_storage.clone()
    }
}

#[async_trait]
impl LibraryCatalog for InMemoryCatalog {
    async fn grouping_entities(&self, kind: GroupingKind) -> Result<Vec<GroupingEntity>> {
        let state = self.state.read().await;
        Ok(state
            .entities
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect())
    }

    async fn query_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let state = self.state.read().await;

        let scoped: Vec<EntityId> = query
            .person_ids
            .iter()
            .chain(query.studio_ids.iter())
            .copied()
            .collect();

        if let Some(failing) = scoped.iter().find(|id| state.failing_entities.contains(id)) {
            return Err(BridgeError::Storage(format!(
                "Item query failed for entity {}",
                failing
            )));
        }

        let linked = |ids: &[EntityId], item: &ItemId| {
            ids.iter().any(|id| {
                state
                    .entity_items
                    .get(id)
                    .is_some_and(|items| items.contains(item))
            })
        };

        let items = state
            .items
            .iter()
            .filter(|item| !query.exclude_kinds.contains(&item.kind))
            .filter(|item| query.person_ids.is_empty() || linked(&query.person_ids, &item.id))
            .filter(|item| query.studio_ids.is_empty() || linked(&query.studio_ids, &item.id))
            .cloned()
            .collect();
        Ok(items)
    }

    async fn item_roles(&self, item_id: ItemId) -> Result<Vec<RoleAssignment>> {
        let state = self.state.read().await;
        Ok(state.roles.get(&item_id).cloned().unwrap_or_default())
    }

    async fn ensure_collection_folder(&self, kind: GroupingKind) -> Result<CollectionFolder> {
        let mut state = self.state.write().await;
        let (folder, created) = state.folder(&self.root, kind);
        if created {
            debug!(kind = %kind, path = ?folder.path, "Created collection folder");
            state.ops.push(CatalogOp::CreateFolder { kind });
        }
        Ok(folder)
    }

    async fn collections_in(&self, folder_id: FolderId) -> Result<Vec<Collection>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .iter()
            .filter(|c| c.folder_id == folder_id)
            .cloned()
            .collect())
    }

    async fn linked_children(&self, collection_id: CollectionId) -> Result<Vec<Item>> {
        let state = self.state.read().await;
        let collection = state
            .collections
            .iter()
            .find(|c| c.id == collection_id)
            .ok_or_else(|| BridgeError::not_found("collection", collection_id))?;

        Ok(state
            .items
            .iter()
            .filter(|item| collection.linked_items.contains(&item.id))
            .cloned()
            .collect())
    }

    async fn create_collection(&self, name: &str, folder: &CollectionFolder) -> Result<Collection> {
        let mut state = self.state.write().await;
        if state.failing_collections.contains(name) {
            return Err(BridgeError::Storage(format!(
                "Write rejected for collection '{}'",
                name
            )));
        }

        let collection = Collection {
            id: CollectionId::new(),
            name: name.to_string(),
            overview: None,
            images: Vec::new(),
            folder_id: folder.id,
            path: folder.collection_path(name),
            virtual_library_ids: folder.virtual_library_ids.clone(),
            linked_items: BTreeSet::new(),
        };

        debug!(name = name, path = ?collection.path, "Created collection");
        state.collections.push(collection.clone());
        state.ops.push(CatalogOp::CreateCollection {
            name: name.to_string(),
        });
        Ok(collection)
    }

    async fn delete_collection(&self, collection_id: CollectionId, delete_storage: bool) -> Result<()> {
        let mut state = self.state.write().await;
        let (name, path) = {
            let collection = state.collection_mut(collection_id)?;
            (collection.name.clone(), collection.path.clone())
        };

        state.collections.retain(|c| c.id != collection_id);
        if delete_storage {
            state.deleted_storage.push(path);
        }
        state.ops.push(CatalogOp::DeleteCollection {
            name,
            delete_storage,
        });
        Ok(())
    }

    async fn add_to_collection(&self, collection_id: CollectionId, item_ids: &[ItemId]) -> Result<()> {
        let mut state = self.state.write().await;
        let collection = state.membership_mut(collection_id)?;
        collection.linked_items.extend(item_ids.iter().copied());
        let name = collection.name.clone();

        state.ops.push(CatalogOp::AddItems {
            collection: name,
            items: item_ids.to_vec(),
        });
        Ok(())
    }

    async fn remove_from_collection(
        &self,
        collection_id: CollectionId,
        item_ids: &[ItemId],
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let collection = state.membership_mut(collection_id)?;
        for id in item_ids {
            collection.linked_items.remove(id);
        }
        let name = collection.name.clone();

        state.ops.push(CatalogOp::RemoveItems {
            collection: name,
            items: item_ids.to_vec(),
        });
        Ok(())
    }

    async fn refresh_entity_metadata(&self, entity: &GroupingEntity) -> Result<GroupingEntity> {
        let mut state = self.state.write().await;
        let result = state.refresh_results.get(&entity.id).cloned();

        let stored = state
            .entities
            .iter_mut()
            .find(|e| e.id == entity.id)
            .ok_or_else(|| BridgeError::not_found("entity", entity.id))?;

        if let Some(result) = result {
            if result.overview.is_some() {
                stored.overview = result.overview;
            }
            if !result.images.is_empty() {
                stored.images = result.images;
            }
        }
        let refreshed = stored.clone();

        state.ops.push(CatalogOp::RefreshEntity {
            name: refreshed.name.clone(),
        });
        Ok(refreshed)
    }

    async fn update_collection_metadata(
        &self,
        collection: &Collection,
        update: MetadataUpdate,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state.collection_mut(collection.id)?;
        stored.overview = collection.overview.clone();
        stored.images = collection.images.clone();
        let name = stored.name.clone();

        state.ops.push(CatalogOp::UpdateMetadata {
            collection: name,
            update,
        });
        Ok(())
    }
}
