//! Scheduled-task adapters
//!
//! [`CuratorTask`] exposes a curator to the host scheduler. Configuration is
//! fetched from a [`ConfigProvider`] at the start of every run, so edits made
//! between runs take effect on the next one.

use async_trait::async_trait;
use bridge_traits::catalog::{GroupingKind, LibraryCatalog};
use bridge_traits::progress::{CancellationSignal, ProgressSink};
use bridge_traits::schedule::{ScheduledTask, TaskError, TaskInfo, TaskTrigger};
use bridge_traits::time::{Clock, SystemClock};
use core_runtime::config::{CurationSettings, CuratorConfig};
use core_runtime::events::EventBus;
use std::sync::Arc;

use crate::error::Result;
use crate::job::RunReport;
use crate::orchestrator::Curator;
use crate::variant::GroupingVariant;

pub const TASK_CATEGORY: &str = "Library Curation";

/// Source of curator configuration
pub trait ConfigProvider: Send + Sync {
    fn curator_config(&self, kind: GroupingKind) -> core_runtime::Result<CuratorConfig>;
}

impl ConfigProvider for CurationSettings {
    fn curator_config(&self, kind: GroupingKind) -> core_runtime::Result<CuratorConfig> {
        Ok(self.for_kind(kind).clone())
    }
}

pub struct CuratorTask {
    variant: Arc<dyn GroupingVariant>,
    catalog: Arc<dyn LibraryCatalog>,
    config: Arc<dyn ConfigProvider>,
    event_bus: Option<Arc<EventBus>>,
    clock: Arc<dyn Clock>,
}

impl CuratorTask {
    pub fn new(
        variant: Arc<dyn GroupingVariant>,
        catalog: Arc<dyn LibraryCatalog>,
        config: Arc<dyn ConfigProvider>,
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

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn kind(&self) -> GroupingKind {
        self.variant.kind()
    }

    /// Host events after which the task should be queued if not running
    pub fn requeue_triggers(&self) -> Vec<TaskTrigger> {
        vec![TaskTrigger::AfterLibraryScan, TaskTrigger::OnConfigurationSaved]
    }

    /// Build a curator from the current configuration and run it
    pub async fn run(
        &self,
        progress: &dyn ProgressSink,
        cancel: &dyn CancellationSignal,
    ) -> Result<RunReport> {
        let config = self.config.curator_config(self.variant.kind())?;
        let mut curator = Curator::new(
            Arc::clone(&self.variant),
            Arc::clone(&self.catalog),
            config,
        )
        .with_clock(Arc::clone(&self.clock));
        if let Some(bus) = &self.event_bus {
            curator = curator.with_event_bus(Arc::clone(bus));
        }
        curator.run(progress, cancel).await
    }
}

#[async_trait]
impl ScheduledTask for CuratorTask {
    fn info(&self) -> TaskInfo {
        let (name, key, subject) = match self.variant.kind() {
            GroupingKind::Person => ("Cast Curator Sync", "CastCuratorSync", "cast and crew"),
            GroupingKind::Studio => ("Studio Curator Sync", "StudioCuratorSync", "studio"),
        };
        TaskInfo {
            name: name.to_string(),
            key: key.to_string(),
            description: format!("Creates and maintains {} collections.", subject),
            category: TASK_CATEGORY.to_string(),
        }
    }

    fn default_triggers(&self) -> Vec<TaskTrigger> {
        vec![TaskTrigger::daily_at_midnight()]
    }

    async fn execute(
        &self,
        progress: &dyn ProgressSink,
        cancel: &dyn CancellationSignal,
    ) -> std::result::Result<(), TaskError> {
        self.run(progress, cancel).await?;
        Ok(())
    }
}
