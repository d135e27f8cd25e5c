//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `bridge-memory`). Host applications can
//! depend on `curator-workspace` and enable the documented features without
//! wiring each crate individually.

#[cfg(feature = "service")]
pub use core_service;

#[cfg(feature = "memory-catalog")]
pub use bridge_memory;
