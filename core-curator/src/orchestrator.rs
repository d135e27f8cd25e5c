//! # Run Orchestrator
//!
//! Drives one curation run end to end.
//!
//! ## Overview
//!
//! 1. **Validating**: every filter pattern of the variant is compiled. Any
//!    failure ends the run with [`CuratorError::Configuration`] before the
//!    catalog is touched.
//! 2. The library snapshot is read once. A failed read ends the run with
//!    [`CuratorError::Snapshot`].
//! 3. **Running**: keys are processed in snapshot order. Cancellation is
//!    checked before each key; a started key always finishes. A key that fails
//!    is logged and recorded along with any writes it made before failing,
//!    and the loop moves on.
//! 4. The run ends `Completed`, or `Failed` with
//!    [`CuratorError::AggregateFailure`] when any key failed.
//!
//! ## Usage
//!
//! ```ignore
//! use core_curator::{CastGrouping, Curator};
//! use bridge_traits::progress::NeverCancelled;
//!
//! let curator = Curator::new(Arc::new(CastGrouping), catalog, config)
//!     .with_event_bus(bus);
//! let report = curator.run(&|percent: f64| println!("{percent:.0}%"), &NeverCancelled).await?;
//! println!("created {}", report.stats.collections_created);
//! ```

use bridge_traits::catalog::{GroupingKind, LibraryCatalog};
use bridge_traits::progress::{CancellationSignal, ProgressSink};
use bridge_traits::time::{Clock, SystemClock};
use core_runtime::config::CuratorConfig;
use core_runtime::events::{CoreEvent, CurationEvent, EventBus};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace};

use crate::error::{CuratorError, Result};
use crate::executor::{ExecutionOutcome, PlanExecutor};
use crate::filter::CompiledFilters;
use crate::job::{CurationRun, RunId, RunReport};
use crate::planner::{self, ReconciliationPlan};
use crate::propagator::MetadataPropagator;
use crate::snapshot::{KeyMembership, LibrarySnapshot, RoleIndex, SnapshotKey};
use crate::variant::GroupingVariant;

/// Reconciliation engine for one grouping kind
pub struct Curator {
    variant: Arc<dyn GroupingVariant>,
    catalog: Arc<dyn LibraryCatalog>,
    config: CuratorConfig,
    event_bus: Option<Arc<EventBus>>,
    clock: Arc<dyn Clock>,
}

impl Curator {
    pub fn new(
        variant: Arc<dyn GroupingVariant>,
        catalog: Arc<dyn LibraryCatalog>,
        config: CuratorConfig,
    ) -> Self {
        Self {
            variant,
            catalog,
            config,
            event_bus: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Time source for run timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn kind(&self) -> GroupingKind {
        self.variant.kind()
    }

    pub fn config(&self) -> &CuratorConfig {
        &self.config
    }

    /// Compile the variant's filters
    pub fn validate(&self) -> Result<CompiledFilters> {
        CompiledFilters::compile(&self.config.filters, self.variant.filter_fields())
            .map_err(|invalid| CuratorError::Configuration { invalid })
    }

    /// Run one reconciliation pass
    ///
    /// Returns the report for completed and cancelled runs.
    ///
    /// # Errors
    ///
    /// - [`CuratorError::Configuration`] if a filter pattern does not compile
    /// - [`CuratorError::Snapshot`] if the snapshot cannot be read
    /// - [`CuratorError::AggregateFailure`] if any grouping key failed
    #[instrument(skip(self, progress, cancel), fields(kind = %self.variant.kind()))]
    pub async fn run(
        &self,
        progress: &dyn ProgressSink,
        cancel: &dyn CancellationSignal,
    ) -> Result<RunReport> {
        let kind = self.variant.kind();
        let clock = self.clock.as_ref();
        let run = CurationRun::new(kind, clock).begin_validation()?;
        let run_id = run.id;

        let filters = match self.validate() {
            Ok(filters) => filters,
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Curation aborted");
                let run = run.fail(e.to_string(), clock)?;
                self.emit_failed(&run);
                return Err(e);
            }
        };

        let snapshot = match LibrarySnapshot::read(self.catalog.as_ref(), kind).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let e = CuratorError::Snapshot(e);
                error!(run_id = %run_id, error = %e, "Curation aborted");
                let run = run.fail(e.to_string(), clock)?;
                self.emit_failed(&run);
                return Err(e);
            }
        };

        let mut run = run.start(snapshot.len(), clock)?;
        info!(run_id = %run_id, kind = %kind, keys = snapshot.len(), "Curation started");
        self.emit(CurationEvent::RunStarted {
            run_id: run_id.to_string(),
            kind: kind.to_string(),
            total_keys: snapshot.len() as u64,
        });

        let executor = PlanExecutor::new(
            Arc::clone(&self.catalog),
            snapshot.folder.clone(),
            MetadataPropagator::new(&self.config),
        );
        let mut roles = RoleIndex::new();

        for key in &snapshot.keys {
            if cancel.is_cancelled() {
                let run = run.cancel(clock)?;
                info!(
                    run_id = %run_id,
                    processed = run.progress.processed,
                    total = run.progress.total,
                    "Curation cancelled"
                );
                self.emit(CurationEvent::RunCancelled {
                    run_id: run_id.to_string(),
                    processed: run.progress.processed as u64,
                    total: run.progress.total as u64,
                });
                return Ok(run.report());
            }

            let (outcome, failure) = match self.plan_key(key, &filters, &mut roles).await {
                Ok(plan) => match executor.execute(&plan, key).await {
                    Ok(outcome) => (outcome, None),
                    Err(e) => (e.outcome, Some(CuratorError::catalog(&key.name, e.source))),
                },
                Err(e) => (ExecutionOutcome::default(), Some(e)),
            };

            // Partial writes of a failed key count too
            run.record_outcome(&outcome)?;
            self.emit_outcome(run_id, &key.name, &outcome);

            if let Some(e) = failure {
                error!(name = %key.name, error = %e, "Failed to curate grouping key");
                run.record_failure(key.name.clone(), e.to_string())?;
                self.emit(CurationEvent::KeyFailed {
                    run_id: run_id.to_string(),
                    name: key.name.clone(),
                    message: e.to_string(),
                });
            }

            run.advance()?;
            progress.report(run.progress.percent);
            self.emit(CurationEvent::Progress {
                run_id: run_id.to_string(),
                processed: run.progress.processed as u64,
                total: run.progress.total as u64,
                percent: run.progress.percent.round() as u8,
            });
        }

        if run.failures.is_empty() {
            let run = run.complete(clock)?;
            if snapshot.is_empty() {
                progress.report(run.progress.percent);
            }
            let report = run.report();
            info!(
                run_id = %run_id,
                created = report.stats.collections_created,
                deleted = report.stats.collections_deleted,
                added = report.stats.items_added,
                removed = report.stats.items_removed,
                "Curation completed"
            );
            self.emit(CurationEvent::RunCompleted {
                run_id: run_id.to_string(),
                collections_created: report.stats.collections_created,
                collections_deleted: report.stats.collections_deleted,
                items_added: report.stats.items_added,
                items_removed: report.stats.items_removed,
                duration_ms: report.duration_ms().unwrap_or_default(),
            });
            return Ok(report);
        }

        let failures = run.failures.clone();
        let message = format!(
            "{} of {} grouping keys failed",
            failures.len(),
            run.progress.total
        );
        let run = run.fail(message, clock)?;
        error!(run_id = %run_id, keys_failed = failures.len(), "Curation finished with failures");
        self.emit_failed(&run);

        Err(CuratorError::AggregateFailure {
            failures,
            report: Box::new(run.report()),
        })
    }

    /// Evaluate one key and plan its changes
    async fn plan_key(
        &self,
        key: &SnapshotKey,
        filters: &CompiledFilters,
        roles: &mut RoleIndex,
    ) -> Result<ReconciliationPlan> {
        let catalog = self.catalog.as_ref();
        let variant = self.variant.as_ref();

        let entity_passes = key
            .entity
            .as_ref()
            .is_some_and(|entity| filters.entity_matches(entity));

        let candidates = match &key.entity {
            Some(entity) if entity_passes => {
                let membership = KeyMembership::load(catalog, variant, key)
                    .await
                    .map_err(|e| CuratorError::catalog(&key.name, e))?;
                membership
                    .evaluate(catalog, variant, filters, entity, roles)
                    .await
                    .map_err(|e| CuratorError::catalog(&key.name, e))?
            }
            Some(_) => {
                debug!(name = %key.name, "Entity does not match filters");
                Vec::new()
            }
            None => Vec::new(),
        };

        for candidate in &candidates {
            trace!(
                name = %key.name,
                item = %candidate.item_name,
                linked = candidate.linked,
                qualifies = candidate.qualifies,
                "Candidate evaluated"
            );
        }

        Ok(planner::plan(key, entity_passes, &candidates))
    }

    fn emit_outcome(&self, run_id: RunId, name: &str, outcome: &ExecutionOutcome) {
        for reason in &outcome.deletions {
            self.emit(CurationEvent::CollectionDeleted {
                run_id: run_id.to_string(),
                name: name.to_string(),
                reason: reason.to_string(),
            });
        }
        if outcome.created {
            self.emit(CurationEvent::CollectionCreated {
                run_id: run_id.to_string(),
                name: name.to_string(),
            });
        }
        if outcome.added > 0 || outcome.removed > 0 {
            self.emit(CurationEvent::MembershipChanged {
                run_id: run_id.to_string(),
                name: name.to_string(),
                added: outcome.added as u64,
                removed: outcome.removed as u64,
            });
        }
        if !outcome.metadata.is_empty() {
            self.emit(CurationEvent::MetadataPropagated {
                run_id: run_id.to_string(),
                name: name.to_string(),
                images: outcome.metadata.images,
                overview: outcome.metadata.overview,
            });
        }
    }

    fn emit_failed(&self, run: &CurationRun) {
        self.emit(CurationEvent::RunFailed {
            run_id: run.id.to_string(),
            message: run.error_message.clone().unwrap_or_default(),
            keys_failed: run.stats.keys_failed,
        });
    }

    fn emit(&self, event: CurationEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Curation(event)).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCatalog;
    use crate::variant::CastGrouping;
    use bridge_traits::error::BridgeError;
    use bridge_traits::progress::NeverCancelled;
    use core_runtime::config::FilterConfig;

    #[tokio::test]
    async fn test_invalid_pattern_fails_before_catalog_access() {
        let mut catalog = MockCatalog::new();
        catalog.expect_ensure_collection_folder().never();
        catalog.expect_grouping_entities().never();

        let config = CuratorConfig::default()
            .with_filters(FilterConfig::default().with_item_genre("(unclosed"));
        let bus = Arc::new(EventBus::new(16));
        let mut events = bus.subscribe();
        let curator = Curator::new(Arc::new(CastGrouping), Arc::new(catalog), config)
            .with_event_bus(bus);

        let err = curator.run(&|_: f64| {}, &NeverCancelled).await.unwrap_err();
        assert!(matches!(err, CuratorError::Configuration { ref invalid } if invalid.len() == 1));

        let event = events.recv().await.unwrap();
        assert!(matches!(event, CoreEvent::Curation(CurationEvent::RunFailed { .. })));
    }

    #[tokio::test]
    async fn test_snapshot_failure_aborts_run() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_ensure_collection_folder()
            .returning(|_| Err(BridgeError::NotAvailable("catalog offline".to_string())));

        let curator = Curator::new(
            Arc::new(CastGrouping),
            Arc::new(catalog),
            CuratorConfig::default(),
        );

        let err = curator.run(&|_: f64| {}, &NeverCancelled).await.unwrap_err();
        assert!(matches!(err, CuratorError::Snapshot(BridgeError::NotAvailable(_))));
        assert!(err.report().is_none());
    }
}
