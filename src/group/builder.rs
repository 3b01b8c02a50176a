//! Group definition builder
//!
//! Converts raw editor input into a validated `GroupDefinition`. Name and
//! type are hard requirements; filter values that do not match the live
//! catalog and rejected subgroup references are dropped and reported, so a
//! batch of input always produces a definition once the scalars are valid.
//!
//! # Example
//!
//! ```rust
//! use tsgroup::catalog::InMemoryCatalog;
//! use tsgroup::group::GroupDefinitionBuilder;
//!
//! let catalog = InMemoryCatalog::from_paths(["ALPHA-1.Stage.Inst.1Hour.0.raw"]).unwrap();
//! let outcome = GroupDefinitionBuilder::new()
//!     .name("Gages")
//!     .group_type("basin")
//!     .query_item("Site", "ALPHA-1")
//!     .query_item("Site", "NOWHERE")
//!     .query_item("Interval", "1Hour")
//!     .build(&catalog)
//!     .unwrap();
//!
//! assert_eq!(outcome.definition.sites().len(), 1);
//! assert_eq!(outcome.definition.intervals(), vec!["1Hour"]);
//! assert_eq!(outcome.misses.len(), 1);
//! ```

use tracing::{debug, warn};

use super::definition::{GroupDefinition, GroupRef, SubgroupOp};
use crate::catalog::TsCatalog;
use crate::error::{LookupMiss, Result, ValidationError};
use crate::types::{canonical_part_name, DataTypeId, GroupId, SiteId, TsKey};

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// The validated definition
    pub definition: GroupDefinition,
    /// Filter values that matched nothing in the catalog and were dropped
    pub misses: Vec<LookupMiss>,
    /// Subgroup references that were rejected and skipped
    pub rejected: Vec<ValidationError>,
}

/// Builder for group definitions from raw editor input
#[derive(Debug, Clone, Default)]
pub struct GroupDefinitionBuilder {
    id: Option<GroupId>,
    name: String,
    group_type: String,
    description: String,
    explicit_members: Vec<TsKey>,
    sites: Vec<SiteId>,
    datatypes: Vec<DataTypeId>,
    query_items: Vec<(String, String)>,
    subgroups: Vec<(SubgroupOp, GroupRef)>,
    transient: bool,
}

impl GroupDefinitionBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing definition's scalar attributes and content
    pub fn from_definition(def: &GroupDefinition) -> Self {
        Self {
            id: def.id(),
            name: def.name().to_string(),
            group_type: def.group_type().to_string(),
            description: def.description().to_string(),
            explicit_members: def.explicit_members().to_vec(),
            sites: def.sites().to_vec(),
            datatypes: def.datatypes().to_vec(),
            query_items: def
                .other_filters()
                .iter()
                .map(|f| (f.part().to_string(), f.value().to_string()))
                .collect(),
            subgroups: def.subgroups().map(|(op, g)| (op, g.clone())).collect(),
            transient: def.is_transient(),
        }
    }

    /// Saved id of the group being edited
    pub fn id(mut self, id: GroupId) -> Self {
        self.id = Some(id);
        self
    }

    /// Group name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Classification tag
    pub fn group_type(mut self, group_type: impl Into<String>) -> Self {
        self.group_type = group_type.into();
        self
    }

    /// Description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Explicitly listed member
    pub fn explicit_member(mut self, key: TsKey) -> Self {
        self.explicit_members.push(key);
        self
    }

    /// Already resolved site filter
    pub fn site(mut self, site: SiteId) -> Self {
        self.sites.push(site);
        self
    }

    /// Already resolved datatype filter
    pub fn datatype(mut self, datatype: DataTypeId) -> Self {
        self.datatypes.push(datatype);
        self
    }

    /// A raw query item as typed in the editor
    ///
    /// `Site`/`Location` values are site names, `DataType`/`Param` values are
    /// datatype codes, any other label is a TSID part name.
    pub fn query_item(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_items.push((label.into(), value.into()));
        self
    }

    /// Subgroup reference
    pub fn subgroup(mut self, op: SubgroupOp, group: GroupRef) -> Self {
        self.subgroups.push((op, group));
        self
    }

    /// Mark the group as programmatically built
    pub fn transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }

    /// Validate and build against the live catalog
    ///
    /// Fails only on an empty name or type, or a catalog failure.
    pub fn build(self, catalog: &dyn TsCatalog) -> Result<BuildOutcome> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let group_type = self.group_type.trim();
        if group_type.is_empty() {
            return Err(ValidationError::EmptyType.into());
        }

        let mut definition =
            GroupDefinition::new(name, group_type).with_description(self.description.trim());
        definition.set_id(self.id);
        definition.set_transient(self.transient);

        for key in self.explicit_members {
            definition.add_explicit_member(key);
        }
        for site in self.sites {
            definition.add_site(site);
        }
        for datatype in self.datatypes {
            definition.add_datatype(datatype);
        }

        let mut misses = Vec::new();
        for (label, value) in &self.query_items {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match canonical_part_name(label).as_str() {
                "location" => match catalog.site_id(value) {
                    Some(site) => {
                        definition.add_site(site);
                    },
                    None => misses.push(LookupMiss::SiteName(value.to_string())),
                },
                "param" => match catalog.datatype_id(value) {
                    Some(datatype) => {
                        definition.add_datatype(datatype);
                    },
                    None => misses.push(LookupMiss::DataTypeCode(value.to_string())),
                },
                _ => {
                    let part = label.trim();
                    // Wildcards are checked when the group is resolved
                    if value.contains('*') || catalog.has_part_value(part, value)? {
                        definition.add_other_filter(part, value);
                    } else {
                        misses.push(LookupMiss::PartValue {
                            part: part.to_string(),
                            value: value.to_string(),
                        });
                    }
                },
            }
        }

        let mut rejected = Vec::new();
        for (op, group) in self.subgroups {
            if let Err(e) = definition.add_subgroup(op, group) {
                rejected.push(e);
            }
        }

        for miss in &misses {
            warn!(group = %definition.name(), "Discarding query item: {}", miss);
        }
        for err in &rejected {
            warn!(group = %definition.name(), "Skipping subgroup: {}", err);
        }
        debug!(
            group = %definition.name(),
            misses = misses.len(),
            rejected = rejected.len(),
            "Group definition built"
        );

        Ok(BuildOutcome {
            definition,
            misses,
            rejected,
        })
    }
}
