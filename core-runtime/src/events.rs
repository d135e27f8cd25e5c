//! # Event Bus System
//!
//! Broadcasts curation progress and outcome events using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: [`CoreEvent`] wraps domain event enums (currently
//!   [`CurationEvent`])
//! - **EventBus**: central broadcast channel; every subscriber gets every event
//! - **EventStream**: receiver wrapper with an optional predicate
//!
//! Emission is fire-and-forget. `emit` returns an error when nobody is
//! subscribed; publishers ignore it.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, CurationEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Curation(CurationEvent::CollectionCreated {
//!     run_id: "run-1".to_string(),
//!     name: "Tom Hanks".to_string(),
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.description(), "Collection created");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender is gone.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Curation(CurationEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Curation(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Curation(CurationEvent::RunFailed { .. }) => EventSeverity::Error,
            CoreEvent::Curation(CurationEvent::KeyFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Curation(CurationEvent::RunCompleted { .. })
            | CoreEvent::Curation(CurationEvent::RunCancelled { .. })
            | CoreEvent::Curation(CurationEvent::RunStarted { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Curation Events
// ============================================================================

/// Events emitted by a curation run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CurationEvent {
    /// Configuration validated and snapshot taken
    RunStarted {
        run_id: String,
        /// Grouping kind ("person" or "studio")
        kind: String,
        total_keys: u64,
    },
    /// A key finished processing
    Progress {
        run_id: String,
        processed: u64,
        total: u64,
        /// Whole-number percentage (0-100)
        percent: u8,
    },
    CollectionCreated {
        run_id: String,
        name: String,
    },
    CollectionDeleted {
        run_id: String,
        name: String,
        /// Why the collection was retired
        reason: String,
    },
    MembershipChanged {
        run_id: String,
        name: String,
        added: u64,
        removed: u64,
    },
    MetadataPropagated {
        run_id: String,
        name: String,
        images: bool,
        overview: bool,
    },
    /// Processing one key failed; the run continues
    KeyFailed {
        run_id: String,
        name: String,
        message: String,
    },
    RunCompleted {
        run_id: String,
        collections_created: u64,
        collections_deleted: u64,
        items_added: u64,
        items_removed: u64,
        duration_ms: u64,
    },
    RunCancelled {
        run_id: String,
        processed: u64,
        total: u64,
    },
    RunFailed {
        run_id: String,
        message: String,
        keys_failed: u64,
    },
}

impl CurationEvent {
    fn description(&self) -> &str {
        match self {
            CurationEvent::RunStarted { .. } => "Curation started",
            CurationEvent::Progress { .. } => "Curation in progress",
            CurationEvent::CollectionCreated { .. } => "Collection created",
            CurationEvent::CollectionDeleted { .. } => "Collection deleted",
            CurationEvent::MembershipChanged { .. } => "Collection membership changed",
            CurationEvent::MetadataPropagated { .. } => "Collection metadata updated",
            CurationEvent::KeyFailed { .. } => "Grouping key failed",
            CurationEvent::RunCompleted { .. } => "Curation completed successfully",
            CurationEvent::RunCancelled { .. } => "Curation cancelled",
            CurationEvent::RunFailed { .. } => "Curation failed",
        }
    }

    /// Identifier of the run that emitted the event
    pub fn run_id(&self) -> &str {
        match self {
            CurationEvent::RunStarted { run_id, .. }
            | CurationEvent::Progress { run_id, .. }
            | CurationEvent::CollectionCreated { run_id, .. }
            | CurationEvent::CollectionDeleted { run_id, .. }
            | CurationEvent::MembershipChanged { run_id, .. }
            | CurationEvent::MetadataPropagated { run_id, .. }
            | CurationEvent::KeyFailed { run_id, .. }
            | CurationEvent::RunCompleted { run_id, .. }
            | CurationEvent::RunCancelled { run_id, .. }
            | CurationEvent::RunFailed { run_id, .. } => run_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel shared by publishers and subscribers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event; returns the number of subscribers reached
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Subscribe to future events; past events are not replayed
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` that skips events failing a predicate
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Receive the next matching event
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Receive a matching event without waiting; `None` when drained
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
