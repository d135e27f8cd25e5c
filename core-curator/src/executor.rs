//! # Plan Executor
//!
//! Applies a [`ReconciliationPlan`] through the catalog's mutation API. Steps
//! run in plan order and the first failing step aborts the rest of the key's
//! plan. Writes already made stay in place and are reported through
//! [`ExecutionError::outcome`].

use bridge_traits::catalog::{Collection, CollectionFolder, LibraryCatalog, MetadataUpdate};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use core_runtime::logging::strip_path;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::planner::{DeleteReason, PlanStep, ReconciliationPlan};
use crate::propagator::MetadataPropagator;
use crate::snapshot::SnapshotKey;

/// What one key's plan changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub created: bool,
    pub deletions: Vec<DeleteReason>,
    pub added: usize,
    pub removed: usize,
    pub metadata: MetadataUpdate,
}

impl ExecutionOutcome {
    pub fn is_noop(&self) -> bool {
        !self.created
            && self.deletions.is_empty()
            && self.added == 0
            && self.removed == 0
            && self.metadata.is_empty()
    }
}

/// A step failed after `outcome` had already been applied
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct ExecutionError {
    pub outcome: ExecutionOutcome,
    pub source: BridgeError,
}

pub struct PlanExecutor {
    catalog: Arc<dyn LibraryCatalog>,
    folder: CollectionFolder,
    propagator: MetadataPropagator,
}

impl PlanExecutor {
    pub fn new(
        catalog: Arc<dyn LibraryCatalog>,
        folder: CollectionFolder,
        propagator: MetadataPropagator,
    ) -> Self {
        Self {
            catalog,
            folder,
            propagator,
        }
    }

    #[instrument(skip(self, plan, key), fields(name = %plan.name, steps = plan.steps.len()))]
    pub async fn execute(
        &self,
        plan: &ReconciliationPlan,
        key: &SnapshotKey,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let mut outcome = ExecutionOutcome::default();
        match self.apply(plan, key, &mut outcome).await {
            Ok(()) => Ok(outcome),
            Err(source) => Err(ExecutionError { outcome, source }),
        }
    }

    async fn apply(
        &self,
        plan: &ReconciliationPlan,
        key: &SnapshotKey,
        outcome: &mut ExecutionOutcome,
    ) -> BridgeResult<()> {
        let mut target: Option<Collection> = key.collection.clone();

        for step in &plan.steps {
            match step {
                PlanStep::DeleteCollection { collection, reason } => {
                    self.catalog.delete_collection(collection.id, true).await?;
                    debug!(
                        name = %collection.name,
                        collection_id = %collection.id,
                        reason = %reason,
                        storage_path = strip_path(&collection.path.to_string_lossy()),
                        "Collection deleted"
                    );
                    if target.as_ref().map(|t| t.id) == Some(collection.id) {
                        target = None;
                    }
                    outcome.deletions.push(*reason);
                }
                PlanStep::CreateCollection => {
                    let created = self.catalog.create_collection(&plan.name, &self.folder).await?;
                    debug!(
                        name = %created.name,
                        collection_id = %created.id,
                        collection_path = strip_path(&created.path.to_string_lossy()),
                        "Collection created"
                    );
                    target = Some(created);
                    outcome.created = true;
                }
                PlanStep::RemoveItems(ids) => {
                    let collection = require_target(&target, &plan.name)?;
                    self.catalog.remove_from_collection(collection.id, ids).await?;
                    for item_id in ids {
                        debug!(name = %plan.name, item_id = %item_id, "Item no longer matches, removed");
                    }
                    outcome.removed += ids.len();
                }
                PlanStep::AddItems(ids) => {
                    let collection = require_target(&target, &plan.name)?;
                    self.catalog.add_to_collection(collection.id, ids).await?;
                    for item_id in ids {
                        debug!(name = %plan.name, item_id = %item_id, "Item added");
                    }
                    outcome.added += ids.len();
                }
                PlanStep::PropagateMetadata => {
                    let collection = require_target(&target, &plan.name)?;
                    if let Some(entity) = &key.entity {
                        outcome.metadata = self
                            .propagator
                            .propagate(self.catalog.as_ref(), entity, collection)
                            .await?;
                    }
                }
            }
        }

        Ok(())
    }
}

fn require_target<'a>(target: &'a Option<Collection>, name: &str) -> BridgeResult<&'a Collection> {
    target.as_ref().ok_or_else(|| {
        BridgeError::OperationFailed(format!("No collection to update for '{}'", name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{collection, folder, MockCatalog};
    use crate::planner::PlanStep;
    use bridge_traits::catalog::{GroupingEntity, GroupingKind, ItemId};
    use core_runtime::config::CuratorConfig;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn key(collection: Option<Collection>) -> SnapshotKey {
        SnapshotKey {
            name: "Tom Hanks".to_string(),
            entity: Some(GroupingEntity::new(GroupingKind::Person, "Tom Hanks")),
            collection,
            duplicates: Vec::new(),
        }
    }

    fn executor(catalog: MockCatalog) -> PlanExecutor {
        PlanExecutor::new(
            Arc::new(catalog),
            folder(),
            MetadataPropagator::new(&CuratorConfig::default().with_fetch_missing_metadata(false)),
        )
    }

    #[tokio::test]
    async fn test_create_then_add_targets_new_collection() {
        let created = collection("Tom Hanks");
        let created_id = created.id;
        let items = vec![ItemId::new(), ItemId::new()];

        let mut catalog = MockCatalog::new();
        let mut seq = Sequence::new();
        catalog
            .expect_create_collection()
            .withf(|name, _| name == "Tom Hanks")
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| Ok(created.clone()));
        let expected = items.clone();
        catalog
            .expect_add_to_collection()
            .withf(move |id, ids| *id == created_id && ids == expected.as_slice())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        catalog.expect_update_collection_metadata().never();

        let plan = ReconciliationPlan {
            name: "Tom Hanks".to_string(),
            steps: vec![
                PlanStep::CreateCollection,
                PlanStep::AddItems(items),
                PlanStep::PropagateMetadata,
            ],
        };

        let outcome = executor(catalog).execute(&plan, &key(None)).await.unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.added, 2);
        assert!(outcome.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_storage() {
        let existing = collection("Tom Hanks");

        let mut catalog = MockCatalog::new();
        catalog
            .expect_delete_collection()
            .with(eq(existing.id), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));

        let plan = ReconciliationPlan {
            name: "Tom Hanks".to_string(),
            steps: vec![PlanStep::DeleteCollection {
                collection: existing.clone(),
                reason: DeleteReason::EntityFilteredOut,
            }],
        };

        let outcome = executor(catalog)
            .execute(&plan, &key(Some(existing)))
            .await
            .unwrap();
        assert_eq!(outcome.deletions, vec![DeleteReason::EntityFilteredOut]);
    }

    #[tokio::test]
    async fn test_failed_step_stops_the_plan() {
        let existing = collection("Tom Hanks");

        let mut catalog = MockCatalog::new();
        catalog
            .expect_remove_from_collection()
            .times(1)
            .returning(|_, _| Err(BridgeError::Storage("disk full".to_string())));
        catalog.expect_add_to_collection().never();

        let plan = ReconciliationPlan {
            name: "Tom Hanks".to_string(),
            steps: vec![
                PlanStep::RemoveItems(vec![ItemId::new()]),
                PlanStep::AddItems(vec![ItemId::new()]),
            ],
        };

        let err = executor(catalog)
            .execute(&plan, &key(Some(existing)))
            .await
            .unwrap_err();
        assert!(matches!(err.source, BridgeError::Storage(_)));
        assert!(err.outcome.is_noop());
    }

    #[tokio::test]
    async fn test_failure_keeps_writes_already_made() {
        let created = collection("Tom Hanks");

        let mut catalog = MockCatalog::new();
        catalog
            .expect_create_collection()
            .times(1)
            .returning(move |_, _| Ok(created.clone()));
        catalog
            .expect_add_to_collection()
            .times(1)
            .returning(|_, _| Err(BridgeError::Storage("disk full".to_string())));

        let plan = ReconciliationPlan {
            name: "Tom Hanks".to_string(),
            steps: vec![
                PlanStep::CreateCollection,
                PlanStep::AddItems(vec![ItemId::new()]),
                PlanStep::PropagateMetadata,
            ],
        };

        let err = executor(catalog).execute(&plan, &key(None)).await.unwrap_err();
        assert!(err.outcome.created);
        assert_eq!(err.outcome.added, 0);
        assert_eq!(err.to_string(), "Catalog storage error: disk full");
    }

    #[tokio::test]
    async fn test_update_without_collection_is_rejected() {
        let plan = ReconciliationPlan {
            name: "Tom Hanks".to_string(),
            steps: vec![PlanStep::AddItems(vec![ItemId::new()])],
        };

        let err = executor(MockCatalog::new())
            .execute(&plan, &key(None))
            .await
            .unwrap_err();
        assert!(matches!(err.source, BridgeError::OperationFailed(_)));
    }
}
