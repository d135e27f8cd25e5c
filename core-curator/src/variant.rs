//! Grouping variants
//!
//! The reconciliation engine is shared by every grouping kind. A variant
//! supplies the few things that differ: which entities it groups by, how the
//! entity's items are queried, which filters apply, and whether role
//! assignments participate.

use bridge_traits::catalog::{GroupingEntity, GroupingKind, ItemKind, ItemQuery};

use crate::filter::FilterField;

/// Capability interface of a grouping kind
pub trait GroupingVariant: Send + Sync {
    fn kind(&self) -> GroupingKind;

    /// Query selecting every item associated with the entity
    fn item_query(&self, entity: &GroupingEntity) -> ItemQuery;

    /// Filter fields validated and applied for this variant
    fn filter_fields(&self) -> &'static [FilterField];

    /// Whether an item must carry a passing role assignment under the
    /// entity's name to qualify
    fn uses_role_assignments(&self) -> bool;
}

/// Collections of cast and crew members
#[derive(Debug, Clone, Copy, Default)]
pub struct CastGrouping;

impl GroupingVariant for CastGrouping {
    fn kind(&self) -> GroupingKind {
        GroupingKind::Person
    }

    fn item_query(&self, entity: &GroupingEntity) -> ItemQuery {
        ItemQuery::recursive().with_person(entity.id)
    }

    fn filter_fields(&self) -> &'static [FilterField] {
        FilterField::WITH_ROLES
    }

    fn uses_role_assignments(&self) -> bool {
        true
    }
}

/// Collections of production studios
#[derive(Debug, Clone, Copy, Default)]
pub struct StudioGrouping;

impl GroupingVariant for StudioGrouping {
    fn kind(&self) -> GroupingKind {
        GroupingKind::Studio
    }

    // Box sets carry their members' studios; never nest them.
    fn item_query(&self, entity: &GroupingEntity) -> ItemQuery {
        ItemQuery::recursive()
            .with_studio(entity.id)
            .excluding(ItemKind::BoxSet)
    }

    fn filter_fields(&self) -> &'static [FilterField] {
        FilterField::COMMON
    }

    fn uses_role_assignments(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_query_scopes_by_person() {
        let tom = GroupingEntity::new(GroupingKind::Person, "Tom Hanks");
        let query = CastGrouping.item_query(&tom);

        assert!(query.recursive);
        assert_eq!(query.person_ids, vec![tom.id]);
        assert!(query.studio_ids.is_empty());
        assert!(CastGrouping.uses_role_assignments());
        assert!(CastGrouping.filter_fields().contains(&FilterField::RoleName));
    }

    #[test]
    fn test_studio_query_excludes_box_sets() {
        let pixar = GroupingEntity::new(GroupingKind::Studio, "Pixar");
        let query = StudioGrouping.item_query(&pixar);

        assert_eq!(query.studio_ids, vec![pixar.id]);
        assert_eq!(query.exclude_kinds, vec![ItemKind::BoxSet]);
        assert!(!StudioGrouping.uses_role_assignments());
        assert!(!StudioGrouping.filter_fields().contains(&FilterField::RoleType));
    }
}
