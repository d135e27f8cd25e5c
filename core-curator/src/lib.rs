//! # Core Curator
//!
//! Reconciliation engine that keeps auto-curated collections (one per person
//! or per studio) consistent with the media library.
//!
//! ## Overview
//!
//! ```text
//! Curator::run
//!   → LibrarySnapshot::read       (read, once per run)
//!   → CompiledFilters             (predicates)
//!   → planner::plan               (diff, per key)
//!   → PlanExecutor::execute       (write, per key)
//!   → MetadataPropagator          (write, per key)
//! ```
//!
//! One engine serves both grouping kinds; [`CastGrouping`] and
//! [`StudioGrouping`] supply the differences through [`GroupingVariant`].
//!
//! ## Guarantees
//!
//! - Invalid filter patterns abort the run before any catalog write.
//! - A failing key is logged and skipped; other keys still converge.
//! - Removals are applied before additions within a key.
//! - Cancellation is checked between keys only.
//! - A second run against an unchanged catalog writes nothing.
//!
//! ## Usage
//!
//! ```ignore
//! use core_curator::{CastGrouping, CuratorTask};
//! use core_runtime::config::CurationSettings;
//!
//! let task = CuratorTask::new(Arc::new(CastGrouping), catalog, Arc::new(CurationSettings::default()));
//! let report = task.run(&bridge_traits::NoProgress, &token).await?;
//! ```

pub mod error;
pub mod executor;
pub mod filter;
pub mod job;
pub mod orchestrator;
pub mod planner;
pub mod propagator;
pub mod snapshot;
pub mod task;
pub mod variant;

#[cfg(test)]
mod mock;

pub use error::{CuratorError, Result};
pub use executor::{ExecutionError, ExecutionOutcome, PlanExecutor};
pub use filter::{CompiledFilters, FilterField, InvalidPattern};
pub use job::{CurationRun, KeyFailure, RunId, RunProgress, RunReport, RunStats, RunStatus};
pub use orchestrator::Curator;
pub use planner::{plan, Candidate, DeleteReason, PlanStep, ReconciliationPlan};
pub use propagator::MetadataPropagator;
pub use snapshot::{KeyMembership, LibrarySnapshot, RoleIndex, SnapshotKey};
pub use task::{ConfigProvider, CuratorTask, TASK_CATEGORY};
pub use variant::{CastGrouping, GroupingVariant, StudioGrouping};
