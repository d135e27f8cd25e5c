//! Mock catalog shared by unit tests

use bridge_traits::catalog::{
    Collection, CollectionFolder, CollectionId, FolderId, GroupingEntity, GroupingKind, Item,
    ItemId, ItemQuery, LibraryCatalog, MetadataUpdate, RoleAssignment,
};
use bridge_traits::error::Result;
use mockall::mock;
use std::collections::BTreeSet;
use std::path::PathBuf;

mock! {
    pub Catalog {}

    #[async_trait::async_trait]
    impl LibraryCatalog for Catalog {
        async fn grouping_entities(&self, kind: GroupingKind) -> Result<Vec<GroupingEntity>>;
        async fn query_items(&self, query: &ItemQuery) -> Result<Vec<Item>>;
        async fn item_roles(&self, item_id: ItemId) -> Result<Vec<RoleAssignment>>;
        async fn ensure_collection_folder(&self, kind: GroupingKind) -> Result<CollectionFolder>;
        async fn collections_in(&self, folder_id: FolderId) -> Result<Vec<Collection>>;
        async fn linked_children(&self, collection_id: CollectionId) -> Result<Vec<Item>>;
        async fn create_collection(&self, name: &str, folder: &CollectionFolder) -> Result<Collection>;
        async fn delete_collection(&self, collection_id: CollectionId, delete_storage: bool) -> Result<()>;
        async fn add_to_collection(&self, collection_id: CollectionId, item_ids: &[ItemId]) -> Result<()>;
        async fn remove_from_collection(&self, collection_id: CollectionId, item_ids: &[ItemId]) -> Result<()>;
        async fn refresh_entity_metadata(&self, entity: &GroupingEntity) -> Result<GroupingEntity>;
        async fn update_collection_metadata(&self, collection: &Collection, update: MetadataUpdate) -> Result<()>;
    }
}

pub fn folder() -> CollectionFolder {
    CollectionFolder {
        id: FolderId::new(),
        kind: GroupingKind::Person,
        name: "People".to_string(),
        path: PathBuf::from("/data/people-collections"),
        virtual_library_ids: Vec::new(),
    }
}

pub fn collection(name: &str) -> Collection {
    let folder = folder();
    Collection {
        id: CollectionId::new(),
        name: name.to_string(),
        overview: None,
        images: Vec::new(),
        folder_id: folder.id,
        path: folder.collection_path(name),
        virtual_library_ids: folder.virtual_library_ids,
        linked_items: BTreeSet::new(),
    }
}
