//! # Filter Evaluator
//!
//! Validates and applies the regular-expression filters of a [`FilterConfig`].
//!
//! ## Matching Rules
//!
//! - Patterns are case-insensitive and unanchored: `"hanks"` matches
//!   `"Tom Hanks"`. Anchor with `^`/`$` for whole-value matches.
//! - Missing text (no overview, no role name) is matched as the empty string.
//! - Genres match when **any** genre satisfies the pattern, so an item
//!   without genres fails the genre filter unless `all_items` is set.
//! - Distinct fields combine with AND.
//! - `all_entities` bypasses entity filters and role filters; `all_items`
//!   bypasses item filters.
//!
//! Fields a variant does not list are never compiled and always match.

use bridge_traits::catalog::{GroupingEntity, Item, RoleAssignment};
use core_runtime::config::FilterConfig;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::error;

/// A configurable filter pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    EntityName,
    EntityOverview,
    ItemName,
    ItemKind,
    ItemGenre,
    ItemOverview,
    RoleType,
    RoleName,
}

impl FilterField {
    /// Fields shared by every grouping variant
    pub const COMMON: &'static [FilterField] = &[
        FilterField::EntityName,
        FilterField::EntityOverview,
        FilterField::ItemName,
        FilterField::ItemKind,
        FilterField::ItemGenre,
        FilterField::ItemOverview,
    ];

    /// Common fields plus role filters
    pub const WITH_ROLES: &'static [FilterField] = &[
        FilterField::EntityName,
        FilterField::EntityOverview,
        FilterField::ItemName,
        FilterField::ItemKind,
        FilterField::ItemGenre,
        FilterField::ItemOverview,
        FilterField::RoleType,
        FilterField::RoleName,
    ];

    /// Configuration key of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterField::EntityName => "entity_name",
            FilterField::EntityOverview => "entity_overview",
            FilterField::ItemName => "item_name",
            FilterField::ItemKind => "item_kind",
            FilterField::ItemGenre => "item_genre",
            FilterField::ItemOverview => "item_overview",
            FilterField::RoleType => "role_type",
            FilterField::RoleName => "role_name",
        }
    }

    pub fn pattern<'a>(&self, config: &'a FilterConfig) -> &'a str {
        match self {
            FilterField::EntityName => &config.entity_name,
            FilterField::EntityOverview => &config.entity_overview,
            FilterField::ItemName => &config.item_name,
            FilterField::ItemKind => &config.item_kind,
            FilterField::ItemGenre => &config.item_genre,
            FilterField::ItemOverview => &config.item_overview,
            FilterField::RoleType => &config.role_type,
            FilterField::RoleName => &config.role_name,
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pattern that failed to compile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidPattern {
    pub field: FilterField,
    pub pattern: String,
    /// Regex engine diagnostic
    pub message: String,
}

impl fmt::Display for InvalidPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.field, self.pattern)
    }
}

fn compile_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Check that every listed pattern compiles
pub fn validate(
    config: &FilterConfig,
    fields: &[FilterField],
) -> std::result::Result<(), Vec<InvalidPattern>> {
    CompiledFilters::compile(config, fields).map(|_| ())
}

/// Filters compiled once per run
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    all_entities: bool,
    all_items: bool,
    patterns: HashMap<FilterField, Regex>,
}

impl CompiledFilters {
    /// Compile the listed fields, reporting every pattern that fails
    pub fn compile(
        config: &FilterConfig,
        fields: &[FilterField],
    ) -> std::result::Result<Self, Vec<InvalidPattern>> {
        let mut patterns = HashMap::with_capacity(fields.len());
        let mut invalid = Vec::new();

        for field in fields {
            let pattern = field.pattern(config);
            match compile_pattern(pattern) {
                Ok(regex) => {
                    patterns.insert(*field, regex);
                }
                Err(e) => {
                    error!(filter = %field, pattern = pattern, "Invalid regex pattern");
                    invalid.push(InvalidPattern {
                        field: *field,
                        pattern: pattern.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if !invalid.is_empty() {
            return Err(invalid);
        }

        Ok(Self {
            all_entities: config.all_entities,
            all_items: config.all_items,
            patterns,
        })
    }

    fn matches(&self, field: FilterField, value: &str) -> bool {
        self.patterns
            .get(&field)
            .map_or(true, |regex| regex.is_match(value))
    }

    pub fn entity_matches(&self, entity: &GroupingEntity) -> bool {
        self.all_entities
            || (self.matches(FilterField::EntityName, &entity.name)
                && self.matches(
                    FilterField::EntityOverview,
                    entity.overview.as_deref().unwrap_or_default(),
                ))
    }

    pub fn item_matches(&self, item: &Item) -> bool {
        if self.all_items {
            return true;
        }

        let genre_matches = item
            .genres
            .iter()
            .any(|genre| self.matches(FilterField::ItemGenre, genre));

        self.matches(FilterField::ItemName, &item.name)
            && self.matches(FilterField::ItemKind, item.kind.as_str())
            && genre_matches
            && self.matches(
                FilterField::ItemOverview,
                item.overview.as_deref().unwrap_or_default(),
            )
    }

    pub fn role_matches(&self, role: &RoleAssignment) -> bool {
        self.all_entities
            || (self.matches(FilterField::RoleType, role.role_type.as_str())
                && self.matches(
                    FilterField::RoleName,
                    role.role_name.as_deref().unwrap_or_default(),
                ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::catalog::{GroupingKind, ItemKind, RoleType};

    fn compiled(config: FilterConfig) -> CompiledFilters {
        CompiledFilters::compile(&config, FilterField::WITH_ROLES).unwrap()
    }

    fn tom_hanks() -> GroupingEntity {
        GroupingEntity::new(GroupingKind::Person, "Tom Hanks").with_overview("American actor")
    }

    #[test]
    fn test_defaults_match_everything() {
        let filters = compiled(FilterConfig::default());
        let item = Item::new("Big", ItemKind::Movie);

        assert!(filters.entity_matches(&tom_hanks()));
        assert!(filters.item_matches(&item));
        assert!(filters.role_matches(&RoleAssignment::new("Tom Hanks", RoleType::Actor)));
    }

    #[test]
    fn test_entity_name_is_case_insensitive_and_unanchored() {
        let filters = compiled(FilterConfig::default().with_entity_name("hanks"));
        assert!(filters.entity_matches(&tom_hanks()));

        let anchored = compiled(FilterConfig::default().with_entity_name("^Tom$"));
        assert!(!anchored.entity_matches(&tom_hanks()));
    }

    #[test]
    fn test_missing_overview_matches_as_empty() {
        let bare = GroupingEntity::new(GroupingKind::Person, "Meg Ryan");

        let permissive = compiled(FilterConfig::default().with_entity_overview("^$"));
        assert!(permissive.entity_matches(&bare));

        let strict = compiled(FilterConfig::default().with_entity_overview("actor"));
        assert!(!strict.entity_matches(&bare));
        assert!(strict.entity_matches(&tom_hanks()));
    }

    #[test]
    fn test_all_entities_bypasses_entity_filters() {
        let config = FilterConfig::default()
            .with_entity_name("^Nobody$")
            .with_all_entities(true);
        assert!(compiled(config).entity_matches(&tom_hanks()));
    }

    #[test]
    fn test_genre_matches_any_value() {
        let filters = compiled(FilterConfig::default().with_item_genre("^drama$"));

        let drama = Item::new("Cast Away", ItemKind::Movie)
            .with_genre("Adventure")
            .with_genre("Drama");
        let comedy = Item::new("Big", ItemKind::Movie).with_genre("Comedy");

        assert!(filters.item_matches(&drama));
        assert!(!filters.item_matches(&comedy));
    }

    #[test]
    fn test_item_without_genres_fails_active_item_filters() {
        let untagged = Item::new("Home Video", ItemKind::Video);

        assert!(!compiled(FilterConfig::default().with_item_genre(".*")).item_matches(&untagged));
        assert!(!compiled(FilterConfig::default().with_item_kind("video")).item_matches(&untagged));
        assert!(compiled(FilterConfig::default()).item_matches(&untagged));
    }

    #[test]
    fn test_item_fields_combine_with_and() {
        let filters = compiled(
            FilterConfig::default()
                .with_item_kind("^Movie$")
                .with_item_name("^B"),
        );

        assert!(filters.item_matches(&Item::new("Big", ItemKind::Movie)));
        assert!(!filters.item_matches(&Item::new("Bosom Buddies", ItemKind::Series)));
        assert!(!filters.item_matches(&Item::new("Splash", ItemKind::Movie)));
    }

    #[test]
    fn test_role_filters_bypassed_by_all_entities() {
        let role = RoleAssignment::new("Tom Hanks", RoleType::Producer);

        let strict = compiled(
            FilterConfig::default()
                .with_role_type("^Actor$")
                .with_all_entities(false),
        );
        assert!(!strict.role_matches(&role));

        let bypassed = compiled(
            FilterConfig::default()
                .with_role_type("^Actor$")
                .with_all_entities(true),
        );
        assert!(bypassed.role_matches(&role));
    }

    #[test]
    fn test_role_name_filter() {
        let filters = compiled(
            FilterConfig::default()
                .with_role_name("gump")
                .with_all_entities(false),
        );

        let forrest = RoleAssignment::new("Tom Hanks", RoleType::Actor).with_role_name("Forrest Gump");
        let uncredited = RoleAssignment::new("Tom Hanks", RoleType::Actor);

        assert!(filters.role_matches(&forrest));
        assert!(!filters.role_matches(&uncredited));
    }

    #[test]
    fn test_validate_reports_every_invalid_field() {
        let config = FilterConfig::default()
            .with_item_genre("(unclosed")
            .with_role_name("[z-a]");

        let invalid = validate(&config, FilterField::WITH_ROLES).unwrap_err();
        let fields: Vec<_> = invalid.iter().map(|p| p.field).collect();

        assert_eq!(fields, vec![FilterField::ItemGenre, FilterField::RoleName]);
        assert_eq!(invalid[0].pattern, "(unclosed");
        assert!(!invalid[0].message.is_empty());
    }

    #[test]
    fn test_unlisted_fields_are_not_validated() {
        let config = FilterConfig::default().with_role_type("(unclosed");

        assert!(validate(&config, FilterField::COMMON).is_ok());
        assert!(validate(&config, FilterField::WITH_ROLES).is_err());
    }
}
