//! # In-Memory Bridge Implementation
//!
//! A [`LibraryCatalog`](bridge_traits::catalog::LibraryCatalog) held entirely
//! in process memory.
//!
//! ## Overview
//!
//! `InMemoryCatalog` stands in for a real media server when embedding the
//! curator in tools and tests:
//! - Seed people, studios, items, credits and pre-existing collections
//! - Record every catalog mutation as a [`CatalogOp`] for later inspection
//! - Inject read or write failures for a chosen entity or collection
//! - Simulate a provider metadata refresh with canned results
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_memory::InMemoryCatalog;
//! use bridge_traits::catalog::{GroupingEntity, GroupingKind, Item, ItemKind, RoleType};
//!
//! #[tokio::main]
//! async fn main() {
//!     let catalog = InMemoryCatalog::new("/var/lib/media");
//!     let tom = catalog.add_entity(GroupingEntity::new(GroupingKind::Person, "Tom Hanks")).await;
//!     let movie = catalog.add_item(Item::new("Big", ItemKind::Movie)).await;
//!     catalog.credit_person(movie, tom, RoleType::Actor, Some("Josh")).await.unwrap();
//! }
//! ```

mod catalog;

pub use catalog::{CatalogOp, InMemoryCatalog};
