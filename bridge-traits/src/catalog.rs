//! Library Catalog Contract
//!
//! Data types and the async interface for the host media catalog. The catalog
//! owns grouping entities and items; the curator only reads them. Collections
//! live under a dedicated per-kind folder and are the only objects the curator
//! mutates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::BitOr;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{BridgeError, Result};

// ============================================================================
// ID Types
// ============================================================================

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_string(s: &str) -> std::result::Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

catalog_id!(
    /// Identifier of a person or studio in the catalog
    EntityId
);
catalog_id!(
    /// Identifier of a media item
    ItemId
);
catalog_id!(
    /// Identifier of a persisted collection (box set)
    CollectionId
);
catalog_id!(
    /// Identifier of a collection root folder
    FolderId
);

// ============================================================================
// Enumerations
// ============================================================================

/// The attribute a curated collection is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingKind {
    /// Cast and crew members
    Person,
    /// Production studios
    Studio,
}

impl GroupingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingKind::Person => "person",
            GroupingKind::Studio => "studio",
        }
    }

    /// Display name of the dedicated collection folder for this kind
    pub fn folder_name(&self) -> &'static str {
        match self {
            GroupingKind::Person => "People",
            GroupingKind::Studio => "Studios",
        }
    }

    /// Directory name used for the folder's backing storage
    pub fn folder_dir_name(&self) -> String {
        format!(
            "{}-collections",
            self.folder_name().to_lowercase().replace(' ', "-")
        )
    }
}

impl FromStr for GroupingKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "person" | "people" | "cast" => Ok(GroupingKind::Person),
            "studio" | "studios" => Ok(GroupingKind::Studio),
            _ => Err(BridgeError::OperationFailed(format!(
                "Unknown grouping kind: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for GroupingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discrete type tag of a library item
///
/// Rendered in PascalCase; item-kind filters match against this rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Movie,
    Series,
    Season,
    Episode,
    Trailer,
    MusicVideo,
    MusicAlbum,
    Audio,
    Video,
    Book,
    BoxSet,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Movie => "Movie",
            ItemKind::Series => "Series",
            ItemKind::Season => "Season",
            ItemKind::Episode => "Episode",
            ItemKind::Trailer => "Trailer",
            ItemKind::MusicVideo => "MusicVideo",
            ItemKind::MusicAlbum => "MusicAlbum",
            ItemKind::Audio => "Audio",
            ItemKind::Video => "Video",
            ItemKind::Book => "Book",
            ItemKind::BoxSet => "BoxSet",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type of a person's involvement in an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleType {
    Actor,
    GuestStar,
    Director,
    Writer,
    Producer,
    Composer,
    Conductor,
    Lyricist,
    Unknown,
}

impl RoleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleType::Actor => "Actor",
            RoleType::GuestStar => "GuestStar",
            RoleType::Director => "Director",
            RoleType::Writer => "Writer",
            RoleType::Producer => "Producer",
            RoleType::Composer => "Composer",
            RoleType::Conductor => "Conductor",
            RoleType::Lyricist => "Lyricist",
            RoleType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Image slot type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageType {
    Primary,
    Art,
    Backdrop,
    Banner,
    Logo,
    Thumb,
    Disc,
    Screenshot,
    Profile,
}

// ============================================================================
// Catalog Objects
// ============================================================================

/// Image descriptor attached to a catalog object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageInfo {
    pub image_type: ImageType,
    pub path: String,
}

impl ImageInfo {
    pub fn new(image_type: ImageType, path: impl Into<String>) -> Self {
        Self {
            image_type,
            path: path.into(),
        }
    }
}

/// A person or studio that collections are built around
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingEntity {
    pub id: EntityId,
    pub kind: GroupingKind,
    /// Display name, also the join key with collections
    pub name: String,
    pub overview: Option<String>,
    pub images: Vec<ImageInfo>,
}

impl GroupingEntity {
    pub fn new(kind: GroupingKind, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            kind,
            name: name.into(),
            overview: None,
            images: Vec::new(),
        }
    }

    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    pub fn with_image(mut self, image: ImageInfo) -> Self {
        self.images.push(image);
        self
    }

    /// Whether descriptive text or images are missing
    pub fn lacks_metadata(&self) -> bool {
        self.overview.is_none() || self.images.is_empty()
    }
}

/// A media-library item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub kind: ItemKind,
    pub genres: Vec<String>,
    pub overview: Option<String>,
    pub images: Vec<ImageInfo>,
    /// Names of the studios credited on this item
    pub studios: Vec<String>,
}

impl Item {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            kind,
            genres: Vec::new(),
            overview: None,
            images: Vec::new(),
            studios: Vec::new(),
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genres.push(genre.into());
        self
    }

    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    pub fn with_studio(mut self, studio: impl Into<String>) -> Self {
        self.studios.push(studio.into());
        self
    }
}

/// A person's credit on an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Name of the credited person (matches `GroupingEntity::name`)
    pub person_name: String,
    /// Character or job title, e.g. "Forrest Gump"
    pub role_name: Option<String>,
    pub role_type: RoleType,
}

impl RoleAssignment {
    pub fn new(person_name: impl Into<String>, role_type: RoleType) -> Self {
        Self {
            person_name: person_name.into(),
            role_name: None,
            role_type,
        }
    }

    pub fn with_role_name(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = Some(role_name.into());
        self
    }
}

/// Dedicated root folder holding the curated collections of one kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFolder {
    pub id: FolderId,
    pub kind: GroupingKind,
    pub name: String,
    pub path: PathBuf,
    /// Virtual libraries (box-set type) mapped onto this folder
    pub virtual_library_ids: Vec<Uuid>,
}

impl CollectionFolder {
    /// Storage location for a collection with the given name
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.path.join(format!("{} [boxset]", name))
    }
}

/// A persisted collection of item references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    /// Equals the owning entity's name
    pub name: String,
    pub overview: Option<String>,
    pub images: Vec<ImageInfo>,
    pub folder_id: FolderId,
    pub path: PathBuf,
    pub virtual_library_ids: Vec<Uuid>,
    /// Linked children
    pub linked_items: BTreeSet<ItemId>,
}

/// Item query against the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub recursive: bool,
    pub person_ids: Vec<EntityId>,
    pub studio_ids: Vec<EntityId>,
    pub exclude_kinds: Vec<ItemKind>,
}

impl ItemQuery {
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            ..Default::default()
        }
    }

    pub fn with_person(mut self, id: EntityId) -> Self {
        self.person_ids.push(id);
        self
    }

    pub fn with_studio(mut self, id: EntityId) -> Self {
        self.studio_ids.push(id);
        self
    }

    pub fn excluding(mut self, kind: ItemKind) -> Self {
        self.exclude_kinds.push(kind);
        self
    }
}

/// Which parts of a collection a metadata write touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataUpdate {
    pub images: bool,
    pub overview: bool,
}

impl MetadataUpdate {
    pub const NONE: Self = Self {
        images: false,
        overview: false,
    };

    pub fn is_empty(&self) -> bool {
        !self.images && !self.overview
    }
}

impl BitOr for MetadataUpdate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            images: self.images || rhs.images,
            overview: self.overview || rhs.overview,
        }
    }
}

// ============================================================================
// Catalog Trait
// ============================================================================

/// Query and mutation API of the host media catalog
///
/// Implementations must be safe to call concurrently for distinct
/// collection identifiers.
#[async_trait]
pub trait LibraryCatalog: Send + Sync {
    /// Enumerate all grouping entities of a kind
    async fn grouping_entities(&self, kind: GroupingKind) -> Result<Vec<GroupingEntity>>;

    /// Enumerate items matching a query
    async fn query_items(&self, query: &ItemQuery) -> Result<Vec<Item>>;

    /// Role assignments credited on an item
    async fn item_roles(&self, item_id: ItemId) -> Result<Vec<RoleAssignment>>;

    /// Resolve the dedicated collection folder for a kind, creating it with a
    /// box-set virtual-library mapping if absent
    async fn ensure_collection_folder(&self, kind: GroupingKind) -> Result<CollectionFolder>;

    /// Collections rooted directly under a folder
    async fn collections_in(&self, folder_id: FolderId) -> Result<Vec<Collection>>;

    /// Items currently linked into a collection
    async fn linked_children(&self, collection_id: CollectionId) -> Result<Vec<Item>>;

    /// Create an empty collection under a folder, sharing its virtual-library scope
    async fn create_collection(&self, name: &str, folder: &CollectionFolder) -> Result<Collection>;

    /// Delete a collection, optionally with its backing storage location
    async fn delete_collection(&self, collection_id: CollectionId, delete_storage: bool) -> Result<()>;

    async fn add_to_collection(&self, collection_id: CollectionId, item_ids: &[ItemId]) -> Result<()>;

    async fn remove_from_collection(
        &self,
        collection_id: CollectionId,
        item_ids: &[ItemId],
    ) -> Result<()>;

    /// Full metadata refresh of an entity from external providers
    ///
    /// Returns the entity as stored after the refresh.
    async fn refresh_entity_metadata(&self, entity: &GroupingEntity) -> Result<GroupingEntity>;

    /// Persist a collection's overview and images
    async fn update_collection_metadata(
        &self,
        collection: &Collection,
        update: MetadataUpdate,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_id_roundtrip_string() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id = ItemId::from_string(uuid_str).unwrap();
        assert_eq!(id.to_string(), uuid_str);
        assert!(EntityId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_grouping_kind_parsing() {
        assert_eq!("Person".parse::<GroupingKind>().unwrap(), GroupingKind::Person);
        assert_eq!("studios".parse::<GroupingKind>().unwrap(), GroupingKind::Studio);
        assert!("genre".parse::<GroupingKind>().is_err());
    }

    #[test]
    fn test_folder_dir_name() {
        assert_eq!(GroupingKind::Person.folder_dir_name(), "people-collections");
        assert_eq!(GroupingKind::Studio.folder_dir_name(), "studios-collections");
    }

    #[test]
    fn test_collection_path() {
        let folder = CollectionFolder {
            id: FolderId::new(),
            kind: GroupingKind::Person,
            name: "People".to_string(),
            path: PathBuf::from("/data/people-collections"),
            virtual_library_ids: vec![],
        };

        assert_eq!(
            folder.collection_path("Tom Hanks"),
            PathBuf::from("/data/people-collections/Tom Hanks [boxset]")
        );
    }

    #[test]
    fn test_item_kind_rendering() {
        assert_eq!(ItemKind::MusicVideo.to_string(), "MusicVideo");
        assert_eq!(RoleType::GuestStar.to_string(), "GuestStar");
    }

    #[test]
    fn test_metadata_update_merge() {
        let images = MetadataUpdate {
            images: true,
            overview: false,
        };
        let overview = MetadataUpdate {
            images: false,
            overview: true,
        };

        assert!(MetadataUpdate::NONE.is_empty());
        let merged = images | overview;
        assert!(merged.images && merged.overview);
        assert!(!merged.is_empty());
    }

    #[test]
    fn test_entity_lacks_metadata() {
        let bare = GroupingEntity::new(GroupingKind::Person, "Tom Hanks");
        assert!(bare.lacks_metadata());

        let described = bare
            .with_overview("Actor")
            .with_image(ImageInfo::new(ImageType::Primary, "/img/tom.jpg"));
        assert!(!described.lacks_metadata());
    }
}
