//! Group definition entity
//!
//! A `GroupDefinition` is declarative: explicit members, attribute filters and
//! typed subgroup references fully determine its resolved membership. All
//! mutation goes through the add/remove operations below; a definition is not
//! meant to be edited concurrently.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{DataTypeId, GroupId, SiteId, TsKey};

// ============================================================================
// Subgroup References
// ============================================================================

/// How a subgroup combines with the group that references it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubgroupOp {
    /// Union the subgroup's members into the result
    Include,
    /// Subtract the subgroup's members from the result
    Exclude,
    /// Keep only members also in the subgroup
    Intersect,
}

impl SubgroupOp {
    /// All operations, in the order they are applied
    pub const ALL: [SubgroupOp; 3] = [SubgroupOp::Include, SubgroupOp::Exclude, SubgroupOp::Intersect];

    /// Parse a stored one-letter code
    ///
    /// `A` is include, `S` and `F` are exclude, `I` is intersect.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "A" => Some(SubgroupOp::Include),
            "S" | "F" => Some(SubgroupOp::Exclude),
            "I" => Some(SubgroupOp::Intersect),
            _ => None,
        }
    }

    /// One-letter code for storage
    pub fn code(&self) -> char {
        match self {
            SubgroupOp::Include => 'A',
            SubgroupOp::Exclude => 'S',
            SubgroupOp::Intersect => 'I',
        }
    }
}

impl fmt::Display for SubgroupOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubgroupOp::Include => "Add",
            SubgroupOp::Exclude => "Subtract",
            SubgroupOp::Intersect => "Intersect",
        };
        f.write_str(label)
    }
}

/// Reference to a saved group
///
/// Identity is the group id; the name is carried for messages only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRef {
    /// Saved group id
    pub id: GroupId,
    /// Group name at the time the reference was taken
    pub name: String,
}

impl GroupRef {
    /// Create a reference
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl PartialEq for GroupRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GroupRef {}

impl Hash for GroupRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

// ============================================================================
// Other Filters
// ============================================================================

/// A (part name, part value) filter on a TSID part other than site/datatype
///
/// Two filters are equal when both name and value match case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherFilter {
    part: String,
    value: String,
}

impl OtherFilter {
    /// Create a filter
    pub fn new(part: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            part: part.into(),
            value: value.into(),
        }
    }

    /// TSID part name
    pub fn part(&self) -> &str {
        &self.part
    }

    /// Value to match
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether this filter is on the named part
    pub fn is_part(&self, part: &str) -> bool {
        self.part.eq_ignore_ascii_case(part)
    }

    /// Whether the value uses `*` wildcards
    pub fn is_wildcard(&self) -> bool {
        self.value.contains('*')
    }

    /// Upper-cased (part, value) used for order-independent comparison
    pub(crate) fn sort_key(&self) -> (String, String) {
        (self.part.to_ascii_uppercase(), self.value.to_ascii_uppercase())
    }
}

impl PartialEq for OtherFilter {
    fn eq(&self, other: &Self) -> bool {
        self.part.eq_ignore_ascii_case(&other.part) && self.value.eq_ignore_ascii_case(&other.value)
    }
}

impl Eq for OtherFilter {}

impl fmt::Display for OtherFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.part, self.value)
    }
}

// ============================================================================
// Group Definition
// ============================================================================

fn default_expanded() -> bool {
    true
}

/// A named, declarative definition of a set of time series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDefinition {
    #[serde(default)]
    id: Option<GroupId>,
    name: String,
    group_type: String,
    #[serde(default)]
    description: String,

    #[serde(default)]
    explicit_members: Vec<TsKey>,
    #[serde(default)]
    site_filters: Vec<SiteId>,
    #[serde(default)]
    datatype_filters: Vec<DataTypeId>,
    #[serde(default)]
    other_filters: Vec<OtherFilter>,

    #[serde(default)]
    included: Vec<GroupRef>,
    #[serde(default)]
    excluded: Vec<GroupRef>,
    #[serde(default)]
    intersected: Vec<GroupRef>,

    /// False for a definition loaded without its members and subgroups
    #[serde(default = "default_expanded")]
    is_expanded: bool,

    /// True for groups built programmatically rather than saved by a user
    #[serde(default)]
    is_transient: bool,
}

impl GroupDefinition {
    /// Create a new, unsaved, fully loaded definition
    pub fn new(name: impl Into<String>, group_type: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            group_type: group_type.into(),
            description: String::new(),
            explicit_members: Vec::new(),
            site_filters: Vec::new(),
            datatype_filters: Vec::new(),
            other_filters: Vec::new(),
            included: Vec::new(),
            excluded: Vec::new(),
            intersected: Vec::new(),
            is_expanded: true,
            is_transient: false,
        }
    }

    /// Create a collapsed definition that must be loaded before resolution
    pub fn collapsed(id: GroupId, name: impl Into<String>, group_type: impl Into<String>) -> Self {
        let mut def = Self::new(name, group_type);
        def.id = Some(id);
        def.is_expanded = false;
        def
    }

    /// Set the id
    pub fn with_id(mut self, id: GroupId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    // ------------------------------------------------------------------
    // Scalar attributes
    // ------------------------------------------------------------------

    /// Saved id, `None` for a new group
    pub fn id(&self) -> Option<GroupId> {
        self.id
    }

    /// Replace the id
    pub fn set_id(&mut self, id: Option<GroupId>) {
        self.id = id;
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the group
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Classification tag
    pub fn group_type(&self) -> &str {
        &self.group_type
    }

    /// Replace the classification tag
    pub fn set_group_type(&mut self, group_type: impl Into<String>) {
        self.group_type = group_type.into();
    }

    /// Free text description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Replace the description
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Reference to this group, `None` until it has been saved
    pub fn to_ref(&self) -> Option<GroupRef> {
        self.id.map(|id| GroupRef::new(id, self.name.clone()))
    }

    /// Whether members and subgroups have been loaded
    pub fn is_expanded(&self) -> bool {
        self.is_expanded
    }

    /// Mark the definition as loaded or collapsed
    pub fn set_expanded(&mut self, expanded: bool) {
        self.is_expanded = expanded;
    }

    /// Whether the group was built programmatically
    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    /// Mark the group as programmatically built
    pub fn set_transient(&mut self, transient: bool) {
        self.is_transient = transient;
    }

    // ------------------------------------------------------------------
    // Explicit members and site/datatype filters
    // ------------------------------------------------------------------

    /// Explicitly listed members
    pub fn explicit_members(&self) -> &[TsKey] {
        &self.explicit_members
    }

    /// Add an explicit member; returns false if already present
    pub fn add_explicit_member(&mut self, key: TsKey) -> bool {
        push_unique(&mut self.explicit_members, key)
    }

    /// Remove an explicit member; returns false if absent
    pub fn remove_explicit_member(&mut self, key: TsKey) -> bool {
        remove_value(&mut self.explicit_members, &key)
    }

    /// Site filters in insertion order
    pub fn sites(&self) -> &[SiteId] {
        &self.site_filters
    }

    /// Add a site filter; returns false if already present
    pub fn add_site(&mut self, site: SiteId) -> bool {
        push_unique(&mut self.site_filters, site)
    }

    /// Remove a site filter; returns false if absent
    pub fn remove_site(&mut self, site: SiteId) -> bool {
        remove_value(&mut self.site_filters, &site)
    }

    /// Datatype filters in insertion order
    pub fn datatypes(&self) -> &[DataTypeId] {
        &self.datatype_filters
    }

    /// Add a datatype filter; returns false if already present
    pub fn add_datatype(&mut self, datatype: DataTypeId) -> bool {
        push_unique(&mut self.datatype_filters, datatype)
    }

    /// Remove a datatype filter; returns false if absent
    pub fn remove_datatype(&mut self, datatype: DataTypeId) -> bool {
        remove_value(&mut self.datatype_filters, &datatype)
    }

    // ------------------------------------------------------------------
    // Other filters
    // ------------------------------------------------------------------

    /// Other part filters in insertion order
    pub fn other_filters(&self) -> &[OtherFilter] {
        &self.other_filters
    }

    /// Add a part filter
    ///
    /// An equal pair (case-insensitive) is removed first, so re-adding a
    /// filter moves it to the end.
    pub fn add_other_filter(&mut self, part: impl Into<String>, value: impl Into<String>) {
        let filter = OtherFilter::new(part, value);
        self.other_filters.retain(|f| *f != filter);
        self.other_filters.push(filter);
    }

    /// Remove a part filter (case-insensitive); returns false if absent
    pub fn remove_other_filter(&mut self, part: &str, value: &str) -> bool {
        let filter = OtherFilter::new(part, value);
        remove_value(&mut self.other_filters, &filter)
    }

    /// Values filtered for one part, in insertion order
    pub fn other_filter_values(&self, part: &str) -> Vec<&str> {
        self.other_filters
            .iter()
            .filter(|f| f.is_part(part))
            .map(|f| f.value())
            .collect()
    }

    /// Interval filter values
    pub fn intervals(&self) -> Vec<&str> {
        self.other_filter_values("Interval")
    }

    /// Duration filter values
    pub fn durations(&self) -> Vec<&str> {
        self.other_filter_values("Duration")
    }

    /// Param type filter values
    pub fn param_types(&self) -> Vec<&str> {
        self.other_filter_values("ParamType")
    }

    /// Version filter values
    pub fn versions(&self) -> Vec<&str> {
        self.other_filter_values("Version")
    }

    /// True when there are no explicit members and no filters of any kind
    pub fn has_no_member_content(&self) -> bool {
        self.explicit_members.is_empty()
            && self.site_filters.is_empty()
            && self.datatype_filters.is_empty()
            && self.other_filters.is_empty()
    }

    // ------------------------------------------------------------------
    // Subgroups
    // ------------------------------------------------------------------

    /// Subgroups combined with one operation
    pub fn subgroup_set(&self, op: SubgroupOp) -> &[GroupRef] {
        match op {
            SubgroupOp::Include => &self.included,
            SubgroupOp::Exclude => &self.excluded,
            SubgroupOp::Intersect => &self.intersected,
        }
    }

    fn subgroup_set_mut(&mut self, op: SubgroupOp) -> &mut Vec<GroupRef> {
        match op {
            SubgroupOp::Include => &mut self.included,
            SubgroupOp::Exclude => &mut self.excluded,
            SubgroupOp::Intersect => &mut self.intersected,
        }
    }

    /// Included subgroups
    pub fn included(&self) -> &[GroupRef] {
        &self.included
    }

    /// Excluded subgroups
    pub fn excluded(&self) -> &[GroupRef] {
        &self.excluded
    }

    /// Intersected subgroups
    pub fn intersected(&self) -> &[GroupRef] {
        &self.intersected
    }

    /// Every subgroup reference with its operation
    pub fn subgroups(&self) -> impl Iterator<Item = (SubgroupOp, &GroupRef)> {
        SubgroupOp::ALL
            .into_iter()
            .flat_map(move |op| self.subgroup_set(op).iter().map(move |g| (op, g)))
    }

    /// Add a subgroup reference
    ///
    /// Rejects the group itself and a group already in the same set. The
    /// same group may appear in different sets.
    pub fn add_subgroup(&mut self, op: SubgroupOp, group: GroupRef) -> Result<(), ValidationError> {
        let is_self = self.id == Some(group.id);
        if is_self || self.subgroup_set(op).contains(&group) {
            return Err(ValidationError::DuplicateOrSelfReference {
                group: group.name,
                op,
            });
        }
        self.subgroup_set_mut(op).push(group);
        Ok(())
    }

    /// Add several subgroup references, skipping the rejected ones
    ///
    /// Returns one error per rejected reference.
    pub fn add_subgroups<I>(&mut self, op: SubgroupOp, groups: I) -> Vec<ValidationError>
    where
        I: IntoIterator<Item = GroupRef>,
    {
        groups
            .into_iter()
            .filter_map(|group| self.add_subgroup(op, group).err())
            .collect()
    }

    /// Remove a subgroup reference from one set; returns false if absent
    pub fn remove_subgroup(&mut self, op: SubgroupOp, id: GroupId) -> bool {
        let set = self.subgroup_set_mut(op);
        let before = set.len();
        set.retain(|g| g.id != id);
        set.len() != before
    }

    /// Whether the group is referenced in any of the three sets
    pub fn has_subgroup(&self, id: GroupId) -> bool {
        self.subgroups().any(|(_, g)| g.id == id)
    }

    // ------------------------------------------------------------------
    // Whole-definition operations
    // ------------------------------------------------------------------

    /// Copy under a new name, as a new unsaved group
    ///
    /// The copy keeps all members, filters and subgroups but has no id and
    /// is marked collapsed until it is saved and reloaded.
    pub fn copy_as(&self, new_name: impl Into<String>) -> GroupDefinition {
        let mut copy = self.clone();
        copy.id = None;
        copy.name = new_name.into();
        copy.is_expanded = false;
        copy
    }

    /// Remove all members, filters and subgroups
    pub fn clear(&mut self) {
        self.explicit_members.clear();
        self.site_filters.clear();
        self.datatype_filters.clear();
        self.other_filters.clear();
        self.included.clear();
        self.excluded.clear();
        self.intersected.clear();
    }
}

impl fmt::Display for GroupDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} ({})", self.name, id),
            None => write!(f, "{} (new)", self.name),
        }
    }
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) -> bool {
    if values.contains(&value) {
        return false;
    }
    values.push(value);
    true
}

fn remove_value<T: PartialEq>(values: &mut Vec<T>, value: &T) -> bool {
    match values.iter().position(|v| v == value) {
        Some(idx) => {
            values.remove(idx);
            true
        },
        None => false,
    }
}
