//! # Curation Run State Machine
//!
//! Tracks one reconciliation run with validated state transitions.
//!
//! ## State Machine
//!
//! ```text
//! Idle → Validating → Running → Completed
//!   ↓         ↓          ↓
//!   └──────→ Failed ←────┤
//!                        └──→ Cancelled
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_curator::job::CurationRun;
//! use bridge_traits::GroupingKind;
//!
//! let clock = SystemClock;
//! let run = CurationRun::new(GroupingKind::Person, &clock)
//!     .begin_validation()?
//!     .start(42, &clock)?;
//! // ... per key: run.record_outcome(..) / run.record_failure(..), run.advance()
//! let run = run.complete(&clock)?;
//! let report = run.report();
//! ```

use bridge_traits::catalog::GroupingKind;
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{CuratorError, Result};
use crate::executor::ExecutionOutcome;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a curation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created, nothing checked yet
    Idle,
    /// Filter patterns are being compiled
    Validating,
    /// Grouping keys are being reconciled
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Cancelled | RunStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Validating => "validating",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
        }
    }
}

impl FromStr for RunStatus {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(RunStatus::Idle),
            "validating" => Ok(RunStatus::Validating),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "cancelled" => Ok(RunStatus::Cancelled),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(CuratorError::InvalidStateTransition {
                from: s.to_string(),
                to: "parse".to_string(),
                reason: format!("Unknown run status: {}", s),
            }),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Progress and Statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    /// Grouping keys handled so far, failed ones included
    pub processed: usize,
    pub total: usize,
    /// `100 * processed / total`, 0-100
    pub percent: f64,
}

impl RunProgress {
    pub fn new(total: usize) -> Self {
        Self {
            processed: 0,
            total,
            percent: 0.0,
        }
    }

    pub fn advance(&mut self) {
        self.processed = (self.processed + 1).min(self.total);
        self.percent = if self.total > 0 {
            (100.0 * self.processed as f64 / self.total as f64).min(100.0)
        } else {
            100.0
        };
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub collections_created: u64,
    pub collections_deleted: u64,
    pub items_added: u64,
    pub items_removed: u64,
    pub metadata_updates: u64,
    pub keys_failed: u64,
}

impl RunStats {
    /// Total catalog writes made by the run
    pub fn total_mutations(&self) -> u64 {
        self.collections_created
            + self.collections_deleted
            + self.items_added
            + self.items_removed
            + self.metadata_updates
    }

    fn absorb(&mut self, outcome: &ExecutionOutcome) {
        if outcome.created {
            self.collections_created += 1;
        }
        self.collections_deleted += outcome.deletions.len() as u64;
        self.items_added += outcome.added as u64;
        self.items_removed += outcome.removed as u64;
        if !outcome.metadata.is_empty() {
            self.metadata_updates += 1;
        }
    }
}

/// A grouping key whose processing failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFailure {
    pub key: String,
    pub message: String,
}

impl std::fmt::Display for KeyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

// ============================================================================
// Run Entity
// ============================================================================

/// A curation run with state machine semantics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationRun {
    pub id: RunId,
    pub kind: GroupingKind,
    pub status: RunStatus,
    pub progress: RunProgress,
    pub stats: RunStats,
    pub failures: Vec<KeyFailure>,
    /// Set when the run fails outright
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CurationRun {
    pub fn new(kind: GroupingKind, clock: &dyn Clock) -> Self {
        Self {
            id: RunId::new(),
            kind,
            status: RunStatus::Idle,
            progress: RunProgress::default(),
            stats: RunStats::default(),
            failures: Vec::new(),
            error_message: None,
            created_at: clock.now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn begin_validation(mut self) -> Result<Self> {
        self.validate_transition(RunStatus::Validating)?;
        self.status = RunStatus::Validating;
        Ok(self)
    }

    /// Enter `Running` with the number of grouping keys to process
    pub fn start(mut self, total: usize, clock: &dyn Clock) -> Result<Self> {
        self.validate_transition(RunStatus::Running)?;
        self.status = RunStatus::Running;
        self.started_at = Some(clock.now());
        self.progress = RunProgress::new(total);
        Ok(self)
    }

    pub fn record_outcome(&mut self, outcome: &ExecutionOutcome) -> Result<()> {
        self.ensure_running("record_outcome")?;
        self.stats.absorb(outcome);
        Ok(())
    }

    pub fn record_failure(&mut self, key: impl Into<String>, message: impl Into<String>) -> Result<()> {
        self.ensure_running("record_failure")?;
        self.stats.keys_failed += 1;
        self.failures.push(KeyFailure {
            key: key.into(),
            message: message.into(),
        });
        Ok(())
    }

    /// Mark one more key as processed
    pub fn advance(&mut self) -> Result<()> {
        self.ensure_running("advance")?;
        self.progress.advance();
        Ok(())
    }

    pub fn complete(mut self, clock: &dyn Clock) -> Result<Self> {
        self.validate_transition(RunStatus::Completed)?;
        self.status = RunStatus::Completed;
        self.finished_at = Some(clock.now());
        self.progress.percent = 100.0;
        Ok(self)
    }

    pub fn cancel(mut self, clock: &dyn Clock) -> Result<Self> {
        self.validate_transition(RunStatus::Cancelled)?;
        self.status = RunStatus::Cancelled;
        self.finished_at = Some(clock.now());
        Ok(self)
    }

    pub fn fail(mut self, message: impl Into<String>, clock: &dyn Clock) -> Result<Self> {
        self.validate_transition(RunStatus::Failed)?;
        self.status = RunStatus::Failed;
        self.finished_at = Some(clock.now());
        self.error_message = Some(message.into());
        Ok(self)
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            run_id: self.id,
            kind: self.kind,
            status: self.status,
            progress: self.progress.clone(),
            stats: self.stats,
            failures: self.failures.clone(),
            error_message: self.error_message.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }

    fn ensure_running(&self, operation: &str) -> Result<()> {
        if self.status != RunStatus::Running {
            return Err(CuratorError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: operation.to_string(),
                reason: "Run must be running".to_string(),
            });
        }
        Ok(())
    }

    fn validate_transition(&self, to: RunStatus) -> Result<()> {
        let valid = match (self.status, to) {
            (RunStatus::Idle, RunStatus::Validating) => true,
            (RunStatus::Idle, RunStatus::Failed) => true,

            (RunStatus::Validating, RunStatus::Running) => true,
            (RunStatus::Validating, RunStatus::Failed) => true,

            (RunStatus::Running, RunStatus::Completed) => true,
            (RunStatus::Running, RunStatus::Cancelled) => true,
            (RunStatus::Running, RunStatus::Failed) => true,

            _ => false,
        };

        if !valid {
            return Err(CuratorError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

/// Summary of a finished (or aborted) run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub kind: GroupingKind,
    pub status: RunStatus,
    pub progress: RunProgress,
    pub stats: RunStats,
    pub failures: Vec<KeyFailure>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::DeleteReason;
    use bridge_traits::catalog::MetadataUpdate;
    use bridge_traits::time::{FixedClock, SystemClock};
    use chrono::{Duration, TimeZone};

    fn running(total: usize) -> CurationRun {
        CurationRun::new(GroupingKind::Person, &SystemClock)
            .begin_validation()
            .unwrap()
            .start(total, &SystemClock)
            .unwrap()
    }

    #[test]
    fn test_status_is_terminal() {
        assert!(!RunStatus::Idle.is_terminal());
        assert!(!RunStatus::Validating.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("running".parse::<RunStatus>().unwrap(), RunStatus::Running);
        assert_eq!("CANCELLED".parse::<RunStatus>().unwrap(), RunStatus::Cancelled);
        assert!("paused".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let mut run = running(2);
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.started_at.is_some());

        run.advance().unwrap();
        assert_eq!(run.progress.percent, 50.0);
        run.advance().unwrap();

        let run = run.complete(&SystemClock).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.progress.percent, 100.0);
        assert!(run.report().duration_ms().is_some());
    }

    #[test]
    fn test_timestamps_come_from_clock() {
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let finished = started + Duration::milliseconds(1500);

        let run = CurationRun::new(GroupingKind::Person, &FixedClock(started))
            .begin_validation()
            .unwrap()
            .start(0, &FixedClock(started))
            .unwrap()
            .complete(&FixedClock(finished))
            .unwrap();

        assert_eq!(run.created_at, started);
        let report = run.report();
        assert_eq!(report.started_at, Some(started));
        assert_eq!(report.finished_at, Some(finished));
        assert_eq!(report.duration_ms(), Some(1500));
    }

    #[test]
    fn test_validation_can_fail_before_running() {
        let run = CurationRun::new(GroupingKind::Studio, &SystemClock)
            .begin_validation()
            .unwrap()
            .fail("bad pattern", &SystemClock)
            .unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error_message.as_deref(), Some("bad pattern"));
        assert!(run.started_at.is_none());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let idle = || CurationRun::new(GroupingKind::Person, &SystemClock);
        assert!(idle().start(1, &SystemClock).is_err());
        assert!(idle().complete(&SystemClock).is_err());
        assert!(idle().cancel(&SystemClock).is_err());

        let done = running(0).complete(&SystemClock).unwrap();
        assert!(done.clone().fail("late", &SystemClock).is_err());
        assert!(done.cancel(&SystemClock).is_err());
    }

    #[test]
    fn test_recording_requires_running() {
        let mut idle = CurationRun::new(GroupingKind::Person, &SystemClock);
        assert!(idle.advance().is_err());
        assert!(idle.record_failure("Tom Hanks", "boom").is_err());
    }

    #[test]
    fn test_stats_absorb_outcomes() {
        let mut run = running(3);
        run.record_outcome(&ExecutionOutcome {
            created: true,
            deletions: vec![],
            added: 3,
            removed: 0,
            metadata: MetadataUpdate {
                images: false,
                overview: true,
            },
        })
        .unwrap();
        run.record_outcome(&ExecutionOutcome {
            created: false,
            deletions: vec![DeleteReason::EntityFilteredOut],
            added: 0,
            removed: 0,
            metadata: MetadataUpdate::NONE,
        })
        .unwrap();
        run.record_failure("Pixar", "storage offline").unwrap();

        let report = run.report();
        assert_eq!(report.stats.collections_created, 1);
        assert_eq!(report.stats.collections_deleted, 1);
        assert_eq!(report.stats.items_added, 3);
        assert_eq!(report.stats.metadata_updates, 1);
        assert_eq!(report.stats.keys_failed, 1);
        assert_eq!(report.stats.total_mutations(), 6);
        assert_eq!(report.failures[0].to_string(), "Pixar: storage offline");
    }

    #[test]
    fn test_empty_run_reaches_full_progress() {
        let mut progress = RunProgress::new(0);
        progress.advance();
        assert_eq!(progress.processed, 0);
        assert_eq!(progress.percent, 100.0);
    }
}
