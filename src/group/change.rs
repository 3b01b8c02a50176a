//! Change detection between two versions of a group definition
//!
//! Used to decide whether an edited definition needs to be saved. Name, type
//! and description compare case-insensitively. Explicit members and subgroups
//! compare as sets. Site, datatype and other filters compare positionally by
//! default, so re-ordering equivalent filters counts as a change; a detector
//! built with `positional_filters = false` compares them as multisets.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use super::definition::{GroupDefinition, GroupRef, OtherFilter, SubgroupOp};
use crate::config::ChangeDetectionConfig;

/// First material difference found between two definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChange {
    /// Name differs
    Name,
    /// Group type differs
    GroupType,
    /// Description differs
    Description,
    /// One of the subgroup sets differs
    Subgroups(SubgroupOp),
    /// Explicit member set differs
    ExplicitMembers,
    /// Site filters differ
    Sites,
    /// Datatype filters differ
    DataTypes,
    /// Other part filters differ
    OtherFilters,
}

impl fmt::Display for GroupChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupChange::Name => write!(f, "name"),
            GroupChange::GroupType => write!(f, "group type"),
            GroupChange::Description => write!(f, "description"),
            GroupChange::Subgroups(op) => write!(f, "{} subgroups", op),
            GroupChange::ExplicitMembers => write!(f, "explicit members"),
            GroupChange::Sites => write!(f, "site filters"),
            GroupChange::DataTypes => write!(f, "datatype filters"),
            GroupChange::OtherFilters => write!(f, "other filters"),
        }
    }
}

/// Structural comparison of group definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeDetector {
    positional_filters: bool,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self {
            positional_filters: true,
        }
    }
}

impl ChangeDetector {
    /// Create a detector
    pub fn new(positional_filters: bool) -> Self {
        Self { positional_filters }
    }

    /// Create a detector from configuration
    pub fn from_config(config: &ChangeDetectionConfig) -> Self {
        Self::new(config.positional_filters)
    }

    /// Whether filter lists are compared by position
    pub fn positional_filters(&self) -> bool {
        self.positional_filters
    }

    /// Whether `new` differs materially from `old`
    pub fn has_changed(&self, old: &GroupDefinition, new: &GroupDefinition) -> bool {
        match self.first_difference(old, new) {
            Some(change) => {
                debug!(group = %new.name(), %change, "Group definition changed");
                true
            },
            None => false,
        }
    }

    /// The first difference found, in a fixed check order
    pub fn first_difference(
        &self,
        old: &GroupDefinition,
        new: &GroupDefinition,
    ) -> Option<GroupChange> {
        if !old.name().eq_ignore_ascii_case(new.name()) {
            return Some(GroupChange::Name);
        }
        if !old.group_type().eq_ignore_ascii_case(new.group_type()) {
            return Some(GroupChange::GroupType);
        }
        if !old.description().eq_ignore_ascii_case(new.description()) {
            return Some(GroupChange::Description);
        }

        for op in SubgroupOp::ALL {
            if !same_groups(old.subgroup_set(op), new.subgroup_set(op)) {
                return Some(GroupChange::Subgroups(op));
            }
        }

        // Nothing left to compare when neither side lists members or filters
        if old.has_no_member_content() && new.has_no_member_content() {
            return None;
        }

        if !same_members(old, new) {
            return Some(GroupChange::ExplicitMembers);
        }
        if !self.same_ids(old.datatypes(), new.datatypes()) {
            return Some(GroupChange::DataTypes);
        }
        if !self.same_ids(old.sites(), new.sites()) {
            return Some(GroupChange::Sites);
        }
        if !self.same_filters(old.other_filters(), new.other_filters()) {
            return Some(GroupChange::OtherFilters);
        }

        None
    }

    fn same_ids<T: Ord + Copy>(&self, old: &[T], new: &[T]) -> bool {
        if old.len() != new.len() {
            return false;
        }
        if self.positional_filters {
            return old == new;
        }
        let mut old = old.to_vec();
        let mut new = new.to_vec();
        old.sort_unstable();
        new.sort_unstable();
        old == new
    }

    fn same_filters(&self, old: &[OtherFilter], new: &[OtherFilter]) -> bool {
        if old.len() != new.len() {
            return false;
        }
        if self.positional_filters {
            return old.iter().zip(new).all(|(a, b)| a == b);
        }
        let mut old: Vec<(String, String)> = old.iter().map(OtherFilter::sort_key).collect();
        let mut new: Vec<(String, String)> = new.iter().map(OtherFilter::sort_key).collect();
        old.sort_unstable();
        new.sort_unstable();
        old == new
    }
}

/// Whether `new` differs materially from `old`, comparing filters by position
pub fn has_changed(old: &GroupDefinition, new: &GroupDefinition) -> bool {
    ChangeDetector::default().has_changed(old, new)
}

fn same_members(old: &GroupDefinition, new: &GroupDefinition) -> bool {
    let old: HashSet<_> = old.explicit_members().iter().collect();
    let new: HashSet<_> = new.explicit_members().iter().collect();
    old == new
}

fn same_groups(old: &[GroupRef], new: &[GroupRef]) -> bool {
    let old: HashSet<_> = old.iter().map(|g| g.id).collect();
    let new: HashSet<_> = new.iter().map(|g| g.id).collect();
    old == new
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataTypeId, GroupId, SiteId, TsKey};

    fn base() -> GroupDefinition {
        GroupDefinition::new("Gages", "basin")
            .with_id(GroupId(1))
            .with_description("Main stem gages")
    }

    #[test]
    fn test_identical_empty_definitions_unchanged() {
        let old = GroupDefinition::new("", "");
        assert!(!has_changed(&old, &old.clone()));
        assert!(!has_changed(&base(), &base()));
    }

    #[test]
    fn test_scalar_fields_case_insensitive() {
        let old = base();
        let mut new = base();
        new.set_description("MAIN STEM GAGES");
        new.set_name("gages");
        assert!(!has_changed(&old, &new));

        new.set_group_type("region");
        assert_eq!(
            ChangeDetector::default().first_difference(&old, &new),
            Some(GroupChange::GroupType)
        );
    }

    #[test]
    fn test_explicit_members_are_a_set() {
        let mut old = base();
        let mut new = base();
        for k in [1, 2, 3] {
            old.add_explicit_member(TsKey(k));
        }
        for k in [3, 1, 2] {
            new.add_explicit_member(TsKey(k));
        }
        assert!(!has_changed(&old, &new));

        new.remove_explicit_member(TsKey(2));
        new.add_explicit_member(TsKey(4));
        assert_eq!(
            ChangeDetector::default().first_difference(&old, &new),
            Some(GroupChange::ExplicitMembers)
        );
    }

    #[test]
    fn test_repeated_keys_do_not_hide_additions() {
        let old: GroupDefinition = serde_json::from_str(
            r#"{"name": "Gages", "group_type": "basin", "explicit_members": [1, 1, 2]}"#,
        )
        .unwrap();
        let new: GroupDefinition = serde_json::from_str(
            r#"{"name": "Gages", "group_type": "basin", "explicit_members": [1, 2, 3]}"#,
        )
        .unwrap();
        assert_eq!(
            ChangeDetector::default().first_difference(&old, &new),
            Some(GroupChange::ExplicitMembers)
        );

        let same: GroupDefinition = serde_json::from_str(
            r#"{"name": "Gages", "group_type": "basin", "explicit_members": [2, 1]}"#,
        )
        .unwrap();
        assert!(!has_changed(&old, &same));
    }

    #[test]
    fn test_repeated_subgroups_do_not_hide_additions() {
        let old: GroupDefinition = serde_json::from_str(
            r#"{"name": "Gages", "group_type": "basin",
                "excluded": [{"id": 5, "name": "Up"}, {"id": 5, "name": "Up"}]}"#,
        )
        .unwrap();
        let new: GroupDefinition = serde_json::from_str(
            r#"{"name": "Gages", "group_type": "basin",
                "excluded": [{"id": 5, "name": "Up"}, {"id": 6, "name": "Down"}]}"#,
        )
        .unwrap();
        assert_eq!(
            ChangeDetector::default().first_difference(&old, &new),
            Some(GroupChange::Subgroups(SubgroupOp::Exclude))
        );
    }

    #[test]
    fn test_subgroup_sets_compared_independently() {
        let mut old = base();
        let mut new = base();
        old.add_subgroup(SubgroupOp::Include, GroupRef::new(GroupId(5), "Up"))
            .unwrap();
        new.add_subgroup(SubgroupOp::Exclude, GroupRef::new(GroupId(5), "Up"))
            .unwrap();
        assert_eq!(
            ChangeDetector::default().first_difference(&old, &new),
            Some(GroupChange::Subgroups(SubgroupOp::Include))
        );

        // Renamed reference is the same subgroup
        let mut renamed = base();
        renamed
            .add_subgroup(SubgroupOp::Include, GroupRef::new(GroupId(5), "Upstream"))
            .unwrap();
        assert!(!has_changed(&old, &renamed));
    }

    #[test]
    fn test_other_filters_positional_by_default() {
        let mut old = base();
        let mut new = base();
        old.add_other_filter("Interval", "1Hour");
        old.add_other_filter("Version", "raw");
        new.add_other_filter("Version", "raw");
        new.add_other_filter("Interval", "1Hour");

        assert!(has_changed(&old, &new));
        assert!(!ChangeDetector::new(false).has_changed(&old, &new));
    }

    #[test]
    fn test_other_filters_case_insensitive() {
        let mut old = base();
        let mut new = base();
        old.add_other_filter("Version", "raw");
        new.add_other_filter("VERSION", "RAW");
        assert!(!has_changed(&old, &new));
    }

    #[test]
    fn test_site_and_datatype_order() {
        let mut old = base();
        let mut new = base();
        old.add_site(SiteId(1));
        old.add_site(SiteId(2));
        new.add_site(SiteId(2));
        new.add_site(SiteId(1));
        assert_eq!(
            ChangeDetector::default().first_difference(&old, &new),
            Some(GroupChange::Sites)
        );
        assert!(!ChangeDetector::new(false).has_changed(&old, &new));

        new.add_datatype(DataTypeId(9));
        assert_eq!(
            ChangeDetector::new(false).first_difference(&old, &new),
            Some(GroupChange::DataTypes)
        );
    }

    #[test]
    fn test_detector_does_not_mutate_inputs() {
        let mut old = base();
        old.add_other_filter("Interval", "1Hour");
        let new = old.clone();
        let detector = ChangeDetector::default();
        assert_eq!(detector.has_changed(&old, &new), detector.has_changed(&old, &new));
        assert_eq!(old.intervals(), vec!["1Hour"]);
    }
}
