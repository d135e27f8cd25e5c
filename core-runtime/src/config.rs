//! # Curator Configuration
//!
//! Settings for the cast and studio curators.
//!
//! ## Overview
//!
//! Each curator is configured by a [`CuratorConfig`]: two metadata flags and a
//! [`FilterConfig`] of regular-expression patterns. [`CurationSettings`] holds
//! one config per grouping kind and can be loaded from JSON. Every field is
//! optional in JSON; missing fields take the defaults below.
//!
//! | Field | Default |
//! |-------|---------|
//! | `overwrite_metadata` | `true` |
//! | `fetch_missing_metadata` | `true` |
//! | `filters.all_entities` / `filters.all_items` | `true` |
//! | every filter pattern | `".*"` |
//!
//! Patterns are not compiled here; the curator validates them at the start of
//! every run.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CurationSettings, CuratorConfig, FilterConfig};
//!
//! let settings = CurationSettings::from_json_str(r#"{
//!     "cast": { "filters": { "all_entities": false, "entity_name": "^Tom" } }
//! }"#)?;
//! assert!(settings.cast.overwrite_metadata);
//!
//! let studio = CuratorConfig::default()
//!     .with_overwrite_metadata(false)
//!     .with_filters(FilterConfig::default().with_item_kind("Movie"));
//! let settings = CurationSettings::builder().studio(studio).build();
//! ```

use crate::error::{Error, Result};
use bridge_traits::catalog::GroupingKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pattern that matches every value
pub const MATCH_ALL: &str = ".*";

fn match_all() -> String {
    MATCH_ALL.to_string()
}

fn enabled() -> bool {
    true
}

/// Regular-expression filters for one curator
///
/// Entity filters apply to the grouping entity (person or studio), item
/// filters to each candidate item, and role filters to the person's role
/// assignments on an item. Role filters are ignored by the studio curator and
/// share the `all_entities` switch with the entity filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Skip entity and role filters and keep every entity
    #[serde(alias = "all_people", alias = "all_studios")]
    pub all_entities: bool,
    /// Skip item filters and keep every item
    pub all_items: bool,
    #[serde(alias = "person_name", alias = "studio_name")]
    pub entity_name: String,
    #[serde(alias = "person_overview", alias = "studio_overview")]
    pub entity_overview: String,
    pub item_name: String,
    pub item_kind: String,
    pub item_genre: String,
    pub item_overview: String,
    pub role_type: String,
    pub role_name: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            all_entities: enabled(),
            all_items: enabled(),
            entity_name: match_all(),
            entity_overview: match_all(),
            item_name: match_all(),
            item_kind: match_all(),
            item_genre: match_all(),
            item_overview: match_all(),
            role_type: match_all(),
            role_name: match_all(),
        }
    }
}

impl FilterConfig {
    /// Set the entity-name pattern and turn entity filtering on
    pub fn with_entity_name(mut self, pattern: impl Into<String>) -> Self {
        self.entity_name = pattern.into();
        self.all_entities = false;
        self
    }

    /// Set the entity-overview pattern and turn entity filtering on
    pub fn with_entity_overview(mut self, pattern: impl Into<String>) -> Self {
        self.entity_overview = pattern.into();
        self.all_entities = false;
        self
    }

    /// Set the item-name pattern and turn item filtering on
    pub fn with_item_name(mut self, pattern: impl Into<String>) -> Self {
        self.item_name = pattern.into();
        self.all_items = false;
        self
    }

    pub fn with_item_kind(mut self, pattern: impl Into<String>) -> Self {
        self.item_kind = pattern.into();
        self.all_items = false;
        self
    }

    pub fn with_item_genre(mut self, pattern: impl Into<String>) -> Self {
        self.item_genre = pattern.into();
        self.all_items = false;
        self
    }

    pub fn with_item_overview(mut self, pattern: impl Into<String>) -> Self {
        self.item_overview = pattern.into();
        self.all_items = false;
        self
    }

    /// Set the role-type pattern and turn entity filtering on
    ///
    /// Role filters are gated by `all_entities`.
    pub fn with_role_type(mut self, pattern: impl Into<String>) -> Self {
        self.role_type = pattern.into();
        self.all_entities = false;
        self
    }

    pub fn with_role_name(mut self, pattern: impl Into<String>) -> Self {
        self.role_name = pattern.into();
        self.all_entities = false;
        self
    }

    pub fn with_all_entities(mut self, all: bool) -> Self {
        self.all_entities = all;
        self
    }

    pub fn with_all_items(mut self, all: bool) -> Self {
        self.all_items = all;
        self
    }
}

/// Configuration of one curator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuratorConfig {
    /// Overwrite collection metadata that differs from the entity's
    pub overwrite_metadata: bool,
    /// Refresh entities lacking overview or images before copying
    pub fetch_missing_metadata: bool,
    pub filters: FilterConfig,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            overwrite_metadata: enabled(),
            fetch_missing_metadata: enabled(),
            filters: FilterConfig::default(),
        }
    }
}

impl CuratorConfig {
    pub fn with_overwrite_metadata(mut self, overwrite: bool) -> Self {
        self.overwrite_metadata = overwrite;
        self
    }

    pub fn with_fetch_missing_metadata(mut self, fetch: bool) -> Self {
        self.fetch_missing_metadata = fetch;
        self
    }

    pub fn with_filters(mut self, filters: FilterConfig) -> Self {
        self.filters = filters;
        self
    }

    /// Whether a source entity refresh is allowed before propagation
    pub fn should_refresh_source(&self) -> bool {
        self.overwrite_metadata && self.fetch_missing_metadata
    }
}

/// Settings for both curators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationSettings {
    pub cast: CuratorConfig,
    pub studio: CuratorConfig,
}

impl CurationSettings {
    pub fn builder() -> CurationSettingsBuilder {
        CurationSettingsBuilder::default()
    }

    /// Parse settings from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Parse(format!("Invalid settings: {}", e)))
    }

    /// Load settings from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize settings: {}", e)))
    }

    /// Configuration of the curator for a grouping kind
    pub fn for_kind(&self, kind: GroupingKind) -> &CuratorConfig {
        match kind {
            GroupingKind::Person => &self.cast,
            GroupingKind::Studio => &self.studio,
        }
    }
}

/// Builder for [`CurationSettings`]
#[derive(Default)]
pub struct CurationSettingsBuilder {
    cast: Option<CuratorConfig>,
    studio: Option<CuratorConfig>,
}

impl CurationSettingsBuilder {
    pub fn cast(mut self, config: CuratorConfig) -> Self {
        self.cast = Some(config);
        self
    }

    pub fn studio(mut self, config: CuratorConfig) -> Self {
        self.studio = Some(config);
        self
    }

    pub fn build(self) -> CurationSettings {
        CurationSettings {
            cast: self.cast.unwrap_or_default(),
            studio: self.studio.unwrap_or_default(),
        }
    }
}
