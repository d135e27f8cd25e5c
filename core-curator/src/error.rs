use bridge_traits::error::BridgeError;
use thiserror::Error;

use crate::filter::InvalidPattern;
use crate::job::{KeyFailure, RunReport};

#[derive(Error, Debug)]
pub enum CuratorError {
    #[error("Invalid filter configuration: {}", describe_patterns(.invalid))]
    Configuration { invalid: Vec<InvalidPattern> },

    #[error("Settings error: {0}")]
    Settings(#[from] core_runtime::Error),

    #[error("Failed to read library snapshot: {0}")]
    Snapshot(#[source] BridgeError),

    #[error("Catalog error while curating '{key}': {source}")]
    Catalog {
        key: String,
        #[source]
        source: BridgeError,
    },

    #[error("{} of {} grouping keys failed", .failures.len(), .report.progress.total)]
    AggregateFailure {
        failures: Vec<KeyFailure>,
        report: Box<RunReport>,
    },

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },
}

impl CuratorError {
    pub fn catalog(key: impl Into<String>, source: BridgeError) -> Self {
        Self::Catalog {
            key: key.into(),
            source,
        }
    }

    /// Final run report, when the run got far enough to produce one
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            CuratorError::AggregateFailure { report, .. } => Some(report),
            _ => None,
        }
    }
}

fn describe_patterns(invalid: &[InvalidPattern]) -> String {
    invalid
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, CuratorError>;
