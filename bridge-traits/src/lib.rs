//! # Host Bridge Traits
//!
//! Contracts between the curation engine and the host media server.
//!
//! ## Overview
//!
//! The curator never talks to a media server directly. Everything it reads or
//! mutates goes through the traits in this crate, which each host implements
//! once:
//!
//! - [`LibraryCatalog`](catalog::LibraryCatalog) - entities, items, role
//!   assignments, collection folders and collection mutations
//! - [`ScheduledTask`](schedule::ScheduledTask) - a task the host scheduler can
//!   trigger and run
//! - [`ProgressSink`](progress::ProgressSink) and
//!   [`CancellationSignal`](progress::CancellationSignal) - per-run hooks
//! - [`Clock`](time::Clock) and [`LoggerSink`](time::LoggerSink) - time source
//!   and log forwarding
//!
//! ## Error Handling
//!
//! All catalog operations return [`BridgeError`](error::BridgeError). Hosts
//! should map their native failures onto it with enough context (object kind,
//! identifier) for the curator to log a useful message.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`; implementations are shared as
//! `Arc<dyn Trait>` across async tasks.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::catalog::{GroupingKind, LibraryCatalog};
//!
//! async fn list_people(catalog: &dyn LibraryCatalog) -> bridge_traits::error::Result<()> {
//!     for person in catalog.grouping_entities(GroupingKind::Person).await? {
//!         println!("{}", person.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod progress;
pub mod schedule;
pub mod time;

pub use catalog::{
    Collection, CollectionFolder, CollectionId, EntityId, FolderId, GroupingEntity, GroupingKind,
    ImageInfo, ImageType, Item, ItemId, ItemKind, ItemQuery, LibraryCatalog, MetadataUpdate,
    RoleAssignment, RoleType,
};
pub use error::BridgeError;
pub use progress::{CancellationSignal, NeverCancelled, NoProgress, ProgressSink};
pub use schedule::{ScheduledTask, TaskError, TaskInfo, TaskTrigger};
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
