//! # Metadata Propagator
//!
//! Copies descriptive text and images from a grouping entity onto its
//! collection.
//!
//! ## Rules
//!
//! - With `force`, a source lacking overview or images is first refreshed from
//!   its providers when `fetch_missing_metadata` allows it. A failed refresh is
//!   logged and propagation continues with what the source already has.
//! - Images are compared slot by slot. Without `force` only empty target slots
//!   are filled. With `force` differing slots are overwritten and target slots
//!   past the end of the source are dropped.
//! - The overview is copied when it differs and the target has none, or when
//!   `force` is set.
//! - Nothing is written when neither part changed.

use bridge_traits::catalog::{Collection, GroupingEntity, LibraryCatalog, MetadataUpdate};
use bridge_traits::error::Result as BridgeResult;
use core_runtime::config::CuratorConfig;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataPropagator {
    force: bool,
    fetch_missing: bool,
}

impl MetadataPropagator {
    pub fn new(config: &CuratorConfig) -> Self {
        Self {
            force: config.overwrite_metadata,
            fetch_missing: config.should_refresh_source(),
        }
    }

    pub fn force(&self) -> bool {
        self.force
    }

    /// Apply the entity's metadata to the collection, returning what was written
    pub async fn propagate(
        &self,
        catalog: &dyn LibraryCatalog,
        source: &GroupingEntity,
        target: &Collection,
    ) -> BridgeResult<MetadataUpdate> {
        let refreshed;
        let source = if self.fetch_missing && source.lacks_metadata() {
            match catalog.refresh_entity_metadata(source).await {
                Ok(entity) => {
                    refreshed = entity;
                    &refreshed
                }
                Err(e) => {
                    warn!(name = %source.name, error = %e, "Metadata refresh failed");
                    source
                }
            }
        } else {
            source
        };

        let (merged, update) = merge(source, target, self.force);
        if update.is_empty() {
            return Ok(MetadataUpdate::NONE);
        }

        catalog.update_collection_metadata(&merged, update).await?;
        debug!(
            name = %target.name,
            images = update.images,
            overview = update.overview,
            "Collection metadata updated"
        );
        Ok(update)
    }
}

/// Compute the target's metadata after propagation
pub fn merge(
    source: &GroupingEntity,
    target: &Collection,
    force: bool,
) -> (Collection, MetadataUpdate) {
    let mut merged = target.clone();

    let slots = source.images.len().max(target.images.len());
    let mut images = Vec::with_capacity(slots);
    for slot in 0..slots {
        match (source.images.get(slot), target.images.get(slot)) {
            (None, Some(_)) if force => {}
            (None, Some(existing)) => images.push(existing.clone()),
            (Some(image), None) => images.push(image.clone()),
            (Some(image), Some(existing)) if force && image != existing => {
                images.push(image.clone())
            }
            (Some(_), Some(existing)) => images.push(existing.clone()),
            (None, None) => {}
        }
    }

    let images_changed = images != target.images;
    merged.images = images;

    let overview_changed =
        source.overview != target.overview && (target.overview.is_none() || force);
    if overview_changed {
        merged.overview = source.overview.clone();
    }

    (
        merged,
        MetadataUpdate {
            images: images_changed,
            overview: overview_changed,
        },
    )
}
