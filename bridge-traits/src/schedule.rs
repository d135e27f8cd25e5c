//! Scheduled Task Contract
//!
//! Describes tasks the host scheduler can register, trigger, and run.

use async_trait::async_trait;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::progress::{CancellationSignal, ProgressSink};

/// Error type surfaced to the host scheduler
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Static task metadata shown by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub name: String,
    /// Stable key used to look the task up
    pub key: String,
    pub description: String,
    pub category: String,
}

/// Condition under which the host runs a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskTrigger {
    /// Once a day at the given local time
    Daily { time_of_day: NaiveTime },
    /// After every library scan, unless the task is already running
    AfterLibraryScan,
    /// Whenever the task's configuration is saved
    OnConfigurationSaved,
}

impl TaskTrigger {
    /// Daily trigger at midnight
    pub fn daily_at_midnight() -> Self {
        TaskTrigger::Daily {
            time_of_day: NaiveTime::MIN,
        }
    }
}

/// A long-running task executed by the host scheduler
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    fn info(&self) -> TaskInfo;

    /// Triggers registered when the task is first installed
    fn default_triggers(&self) -> Vec<TaskTrigger>;

    /// Run the task to completion or cancellation
    async fn execute(
        &self,
        progress: &dyn ProgressSink,
        cancel: &dyn CancellationSignal,
    ) -> Result<(), TaskError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_trigger_serialization() {
        let trigger = TaskTrigger::daily_at_midnight();
        let json = serde_json::to_string(&trigger).unwrap();
        assert_eq!(json, r#"{"type":"daily","time_of_day":"00:00:00"}"#);

        let parsed: TaskTrigger = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, trigger);
    }
}
