//! JSON fixtures for the in-memory catalog and group store
//!
//! Catalog file:
//!
//! ```json
//! { "series": ["ALPHA-1.Stage.Inst.1Hour.0.raw", "BETA.Flow.Ave.1Day.1Day.rev"] }
//! ```
//!
//! Groups file. Subgroups are referenced by name, members by path:
//!
//! ```json
//! { "groups": [
//!     { "name": "Hourly", "group_type": "basin",
//!       "filters": [{ "part": "Interval", "value": "1Hour" }] },
//!     { "name": "Alpha hourly", "group_type": "basin",
//!       "sites": ["ALPHA-1"], "include": ["Hourly"], "exclude": [] }
//! ] }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use tsgroup::catalog::{InMemoryCatalog, InMemoryGroupStore};
use tsgroup::group::{GroupDefinitionBuilder, GroupRef, SubgroupOp};
use tsgroup::types::GroupId;
use tsgroup::{Error, Result};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    series: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GroupsFile {
    groups: Vec<GroupEntry>,
}

#[derive(Debug, Deserialize)]
struct FilterEntry {
    part: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct GroupEntry {
    name: String,
    group_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    sites: Vec<String>,
    #[serde(default)]
    datatypes: Vec<String>,
    #[serde(default)]
    filters: Vec<FilterEntry>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    intersect: Vec<String>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| Error::Serialization(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load a catalog fixture
pub fn load_catalog(path: &Path) -> Result<InMemoryCatalog> {
    let file: CatalogFile = read_json(path)?;
    InMemoryCatalog::from_paths(&file.series)
}

/// Group ids allocated by upper-cased name, shared across fixture files
#[derive(Debug, Default)]
pub struct GroupIds {
    ids: HashMap<String, GroupId>,
}

impl GroupIds {
    fn get_or_assign(&mut self, name: &str) -> GroupId {
        let next = GroupId(self.ids.len() as u64 + 1);
        *self.ids.entry(name.trim().to_ascii_uppercase()).or_insert(next)
    }

    fn get(&self, name: &str) -> Option<GroupId> {
        self.ids.get(&name.trim().to_ascii_uppercase()).copied()
    }
}

/// Load a groups fixture into a new store
///
/// Unknown member paths and subgroup names are skipped with a warning.
pub fn load_groups(
    path: &Path,
    catalog: &InMemoryCatalog,
    ids: &mut GroupIds,
) -> Result<InMemoryGroupStore> {
    let file: GroupsFile = read_json(path)?;
    for entry in &file.groups {
        ids.get_or_assign(&entry.name);
    }

    let store = InMemoryGroupStore::new();
    for entry in file.groups {
        let mut builder = GroupDefinitionBuilder::new()
            .id(ids.get_or_assign(&entry.name))
            .name(&entry.name)
            .group_type(&entry.group_type)
            .description(&entry.description);

        for member in &entry.members {
            match catalog.key_for_path(member) {
                Some(key) => builder = builder.explicit_member(key),
                None => warn!(group = %entry.name, member = %member, "Unknown member path"),
            }
        }
        for site in entry.sites {
            builder = builder.query_item("Site", site);
        }
        for datatype in entry.datatypes {
            builder = builder.query_item("DataType", datatype);
        }
        for filter in entry.filters {
            builder = builder.query_item(filter.part, filter.value);
        }

        let sets = [
            (SubgroupOp::Include, &entry.include),
            (SubgroupOp::Exclude, &entry.exclude),
            (SubgroupOp::Intersect, &entry.intersect),
        ];
        for (op, names) in sets {
            for name in names {
                match ids.get(name) {
                    Some(id) => builder = builder.subgroup(op, GroupRef::new(id, name.as_str())),
                    None => warn!(group = %entry.name, subgroup = %name, "Unknown subgroup"),
                }
            }
        }

        store.save(builder.build(catalog)?.definition);
    }

    Ok(store)
}
