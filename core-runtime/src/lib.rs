//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the curation crates:
//! - Logging and tracing setup
//! - Curator configuration
//! - Event bus
//!
//! ## Overview
//!
//! Nothing in this crate knows how reconciliation works. It establishes the
//! logging conventions, the serde-loadable settings each curator reads at the
//! start of a run, and the broadcast channel runs report through.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
