//! Curator service façade and bootstrap helpers.
//!
//! This crate wires a host-provided [`LibraryCatalog`], the curation settings
//! and an optional event bus into the cast and studio curators, and exposes
//! them as scheduled tasks. Hosts without a catalog of their own can enable
//! the `memory-catalog` feature for a process-local one.

pub mod error;

pub use error::{Result, ServiceError};

use std::path::Path;
use std::sync::{Arc, RwLock};

use bridge_traits::{
    catalog::{GroupingKind, LibraryCatalog},
    progress::{CancellationSignal, ProgressSink},
    schedule::{ScheduledTask, TaskTrigger},
};
use core_curator::{CastGrouping, ConfigProvider, CuratorTask, RunReport, StudioGrouping};
use core_runtime::{
    config::{CurationSettings, CuratorConfig},
    events::EventBus,
    logging::{init_logging, LoggingConfig},
};
use tracing::info;

#[cfg(feature = "memory-catalog")]
pub use bridge_memory::InMemoryCatalog;

/// Aggregated handle to the collaborators the curators require.
pub struct CuratorDependencies {
    pub catalog: Arc<dyn LibraryCatalog>,
    pub event_bus: Option<Arc<EventBus>>,
}

impl CuratorDependencies {
    pub fn new(catalog: Arc<dyn LibraryCatalog>) -> Self {
        Self {
            catalog,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }
}

/// Settings shared between the service and its tasks.
///
/// Every run reads the current value; saved settings apply from the next run.
#[derive(Debug, Default)]
pub struct SharedSettings {
    inner: RwLock<CurationSettings>,
}

impl SharedSettings {
    pub fn new(settings: CurationSettings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub fn get(&self) -> core_runtime::Result<CurationSettings> {
        self.inner
            .read()
            .map(|settings| settings.clone())
            .map_err(|_| core_runtime::Error::Internal("Settings lock poisoned".to_string()))
    }

    pub fn replace(&self, settings: CurationSettings) -> core_runtime::Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| core_runtime::Error::Internal("Settings lock poisoned".to_string()))?;
        *guard = settings;
        Ok(())
    }
}

impl ConfigProvider for SharedSettings {
    fn curator_config(&self, kind: GroupingKind) -> core_runtime::Result<CuratorConfig> {
        Ok(self.get()?.for_kind(kind).clone())
    }
}

/// Results of running both curators.
#[derive(Debug)]
pub struct CurationOutcome {
    pub cast: core_curator::Result<RunReport>,
    pub studio: core_curator::Result<RunReport>,
}

impl CurationOutcome {
    pub fn is_success(&self) -> bool {
        self.cast.is_ok() && self.studio.is_ok()
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CuratorService {
    settings: Arc<SharedSettings>,
    cast: Arc<CuratorTask>,
    studio: Arc<CuratorTask>,
}

impl CuratorService {
    /// Create a new service from the provided dependencies and settings.
    pub fn new(deps: CuratorDependencies, settings: CurationSettings) -> Self {
        let settings = Arc::new(SharedSettings::new(settings));
        let provider: Arc<dyn ConfigProvider> = settings.clone();

        let build = |task: CuratorTask| match &deps.event_bus {
            Some(bus) => Arc::new(task.with_event_bus(Arc::clone(bus))),
            None => Arc::new(task),
        };
        let cast = build(CuratorTask::new(
            Arc::new(CastGrouping),
            Arc::clone(&deps.catalog),
            Arc::clone(&provider),
        ));
        let studio = build(CuratorTask::new(
            Arc::new(StudioGrouping),
            Arc::clone(&deps.catalog),
            provider,
        ));

        Self {
            settings,
            cast,
            studio,
        }
    }

    /// Create a service with settings read from a JSON file.
    pub fn from_settings_file(deps: CuratorDependencies, path: impl AsRef<Path>) -> Result<Self> {
        let settings = CurationSettings::from_json_file(path)?;
        Ok(Self::new(deps, settings))
    }

    pub fn settings(&self) -> Result<CurationSettings> {
        Ok(self.settings.get()?)
    }

    /// Store new settings and return the tasks the host should queue.
    pub fn save_settings(&self, settings: CurationSettings) -> Result<Vec<Arc<dyn ScheduledTask>>> {
        self.settings.replace(settings)?;
        info!("Curation settings saved");
        Ok(self.tasks_triggered_by(TaskTrigger::OnConfigurationSaved))
    }

    /// Tasks the host should queue after a library scan.
    pub fn on_library_scanned(&self) -> Vec<Arc<dyn ScheduledTask>> {
        self.tasks_triggered_by(TaskTrigger::AfterLibraryScan)
    }

    pub fn cast_task(&self) -> Arc<CuratorTask> {
        Arc::clone(&self.cast)
    }

    pub fn studio_task(&self) -> Arc<CuratorTask> {
        Arc::clone(&self.studio)
    }

    /// Both curators as host-schedulable tasks.
    pub fn tasks(&self) -> Vec<Arc<dyn ScheduledTask>> {
        vec![
            self.cast.clone() as Arc<dyn ScheduledTask>,
            self.studio.clone() as Arc<dyn ScheduledTask>,
        ]
    }

    /// Run cast curation, then studio curation.
    ///
    /// Progress is reported across both runs: the cast run covers 0-50 and
    /// the studio run 50-100.
    pub async fn run_all(
        &self,
        progress: &dyn ProgressSink,
        cancel: &dyn CancellationSignal,
    ) -> CurationOutcome {
        let cast_progress = |percent: f64| progress.report(percent / 2.0);
        let cast = self.cast.run(&cast_progress, cancel).await;

        let studio_progress = |percent: f64| progress.report(50.0 + percent / 2.0);
        let studio = self.studio.run(&studio_progress, cancel).await;

        CurationOutcome { cast, studio }
    }

    fn tasks_triggered_by(&self, trigger: TaskTrigger) -> Vec<Arc<dyn ScheduledTask>> {
        [&self.cast, &self.studio]
            .into_iter()
            .filter(|task| task.requeue_triggers().contains(&trigger))
            .map(|task| Arc::clone(task) as Arc<dyn ScheduledTask>)
            .collect()
    }
}

/// Initialize logging and build the service.
///
/// ```ignore
/// use core_service::{bootstrap, CuratorDependencies};
/// use core_runtime::logging::LoggingConfig;
///
/// let service = bootstrap(
///     CuratorDependencies::new(catalog),
///     CurationSettings::default(),
///     LoggingConfig::default(),
/// )?;
/// for task in service.tasks() {
///     println!("{}", task.info().name);
/// }
/// ```
pub fn bootstrap(
    deps: CuratorDependencies,
    settings: CurationSettings,
    logging: LoggingConfig,
) -> Result<CuratorService> {
    init_logging(logging)?;
    Ok(CuratorService::new(deps, settings))
}

/// Build a service over a fresh in-memory catalog.
#[cfg(feature = "memory-catalog")]
pub fn in_memory(
    data_root: impl Into<std::path::PathBuf>,
    settings: CurationSettings,
) -> (CuratorService, Arc<InMemoryCatalog>) {
    let catalog = Arc::new(InMemoryCatalog::new(data_root));
    let service = CuratorService::new(CuratorDependencies::new(catalog.clone()), settings);
    (service, catalog)
}
