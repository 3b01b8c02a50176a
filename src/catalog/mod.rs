//! Catalog Collaborators and Snapshots
//!
//! The resolver never talks to a database. It consumes two read-only
//! collaborators and a frozen, indexed snapshot built from one of them:
//!
//! ```text
//! ┌─────────────────┐  list_all   ┌─────────────────┐  bitmaps   ┌──────────────┐
//! │   TsCatalog     │────────────▶│  CatalogIndex   │───────────▶│   Resolver   │
//! └─────────────────┘             └─────────────────┘            └──────────────┘
//! ┌─────────────────┐        group_by_id                                ▲
//! │   GroupLookup   │───────────────────────────────────────────────────┘
//! └─────────────────┘
//! ```
//!
//! # Components
//!
//! - `TsCatalog`: lists every known TSID and resolves site names / datatype codes
//! - `GroupLookup`: materializes subgroup references into definitions
//! - `CatalogIndex`: frozen snapshot indexed by site, datatype and part value
//! - `CatalogCache`: owns a snapshot until `refresh()` is called
//! - `InMemoryCatalog` / `InMemoryGroupStore`: in-process implementations

pub mod bitmap;
pub mod cache;
pub mod index;

pub use bitmap::{MemberBitmap, MemberIter, Ordinal};
pub use cache::{CatalogCache, CatalogCacheStats};
pub use index::CatalogIndex;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::group::GroupDefinition;
use crate::types::{DataTypeId, GroupId, SiteId, TimeSeriesId, TsKey};

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Read-only provider of the time series catalog
pub trait TsCatalog: Send + Sync {
    /// Every known TSID
    fn list_all(&self) -> Result<Vec<TimeSeriesId>>;

    /// Site id for a site name (case-insensitive)
    fn site_id(&self, name: &str) -> Option<SiteId>;

    /// Datatype id for a datatype code (case-insensitive)
    fn datatype_id(&self, code: &str) -> Option<DataTypeId>;

    /// Whether any TSID has this value (case-insensitive) for the named part
    fn has_part_value(&self, part: &str, value: &str) -> Result<bool> {
        Ok(self.list_all()?.iter().any(|tsid| {
            tsid.part(part)
                .is_some_and(|v| v.eq_ignore_ascii_case(value))
        }))
    }
}

/// Read-only provider of saved group definitions
pub trait GroupLookup: Send + Sync {
    /// Fully loaded definition for a group id, `None` if no such group exists
    fn group_by_id(&self, id: GroupId) -> Result<Option<GroupDefinition>>;
}

// ============================================================================
// In-Memory Catalog
// ============================================================================

#[derive(Debug, Default)]
struct CatalogTables {
    series: Vec<TimeSeriesId>,
    keys: HashMap<TsKey, usize>,
    sites: HashMap<String, SiteId>,
    datatypes: HashMap<String, DataTypeId>,
}

/// In-process catalog
///
/// `register` parses a TSID path and allocates keys, site ids and datatype
/// ids on demand. Site names are the full Location part and datatype codes
/// the full Param part.
#[derive(Debug)]
pub struct InMemoryCatalog {
    tables: RwLock<CatalogTables>,
    next_id: AtomicU64,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(CatalogTables::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a catalog from TSID paths
    pub fn from_paths<I, S>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let catalog = Self::new();
        for path in paths {
            catalog.register(path.as_ref())?;
        }
        Ok(catalog)
    }

    /// Register a TSID path, returning its key
    ///
    /// Registering the same path twice (case-insensitive) returns the
    /// existing key.
    pub fn register(&self, path: &str) -> Result<TsKey> {
        let mut tables = self.tables.write();

        if let Some(existing) = tables
            .series
            .iter()
            .find(|t| t.unique_string().eq_ignore_ascii_case(path.trim()))
        {
            return Ok(existing.key());
        }

        let parsed = TimeSeriesId::parse_path(TsKey(0), SiteId(0), DataTypeId(0), path)
            .map_err(|e| Error::Catalog(e.to_string()))?;
        let location = parsed.part("Location").unwrap_or_default().to_ascii_uppercase();
        let param = parsed.part("Param").unwrap_or_default().to_ascii_uppercase();

        let site = *tables
            .sites
            .entry(location)
            .or_insert_with(|| SiteId(self.next_id.fetch_add(1, Ordering::Relaxed)));
        let datatype = *tables
            .datatypes
            .entry(param)
            .or_insert_with(|| DataTypeId(self.next_id.fetch_add(1, Ordering::Relaxed)));
        let key = TsKey(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tsid = parsed.with_ids(key, site, datatype);

        let position = tables.series.len();
        tables.keys.insert(key, position);
        tables.series.push(tsid);
        Ok(key)
    }

    /// Insert a prebuilt TSID, registering its site and datatype names
    pub fn insert(&self, tsid: TimeSeriesId, site_name: &str, datatype_code: &str) {
        let max_id = tsid.key().0.max(tsid.site().0).max(tsid.datatype().0);
        self.next_id.fetch_max(max_id + 1, Ordering::Relaxed);

        let mut tables = self.tables.write();
        tables
            .sites
            .insert(site_name.to_ascii_uppercase(), tsid.site());
        tables
            .datatypes
            .insert(datatype_code.to_ascii_uppercase(), tsid.datatype());

        match tables.keys.get(&tsid.key()).copied() {
            Some(position) => tables.series[position] = tsid,
            None => {
                let position = tables.series.len();
                tables.keys.insert(tsid.key(), position);
                tables.series.push(tsid);
            },
        }
    }

    /// Look up a TSID by key
    pub fn get(&self, key: TsKey) -> Option<TimeSeriesId> {
        let tables = self.tables.read();
        tables
            .keys
            .get(&key)
            .map(|&position| tables.series[position].clone())
    }

    /// Look up a TSID key by its path (case-insensitive)
    pub fn key_for_path(&self, path: &str) -> Option<TsKey> {
        self.tables
            .read()
            .series
            .iter()
            .find(|t| t.unique_string().eq_ignore_ascii_case(path.trim()))
            .map(|t| t.key())
    }

    /// Number of registered series
    pub fn len(&self) -> usize {
        self.tables.read().series.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TsCatalog for InMemoryCatalog {
    fn list_all(&self) -> Result<Vec<TimeSeriesId>> {
        Ok(self.tables.read().series.clone())
    }

    fn site_id(&self, name: &str) -> Option<SiteId> {
        self.tables
            .read()
            .sites
            .get(&name.trim().to_ascii_uppercase())
            .copied()
    }

    fn datatype_id(&self, code: &str) -> Option<DataTypeId> {
        self.tables
            .read()
            .datatypes
            .get(&code.trim().to_ascii_uppercase())
            .copied()
    }
}

// ============================================================================
// In-Memory Group Store
// ============================================================================

/// In-process group store implementing `GroupLookup`
#[derive(Debug)]
pub struct InMemoryGroupStore {
    groups: RwLock<HashMap<GroupId, GroupDefinition>>,
    next_id: AtomicU64,
}

impl InMemoryGroupStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Save a definition, assigning an id to new groups
    ///
    /// Returns the saved definition's id.
    pub fn save(&self, mut definition: GroupDefinition) -> GroupId {
        let id = match definition.id() {
            Some(id) => {
                // Keep id allocation ahead of externally assigned ids
                self.next_id.fetch_max(id.0 + 1, Ordering::Relaxed);
                id
            },
            None => GroupId(self.next_id.fetch_add(1, Ordering::Relaxed)),
        };
        definition.set_id(Some(id));
        self.groups.write().insert(id, definition);
        id
    }

    /// Remove a group, returning its definition
    pub fn remove(&self, id: GroupId) -> Option<GroupDefinition> {
        self.groups.write().remove(&id)
    }

    /// Find a group by name (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<GroupDefinition> {
        self.groups
            .read()
            .values()
            .find(|g| g.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    /// All saved definitions, ordered by id
    pub fn all(&self) -> Vec<GroupDefinition> {
        let mut groups: Vec<GroupDefinition> = self.groups.read().values().cloned().collect();
        groups.sort_by_key(|g| g.id());
        groups
    }

    /// Number of saved groups
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupLookup for InMemoryGroupStore {
    fn group_by_id(&self, id: GroupId) -> Result<Option<GroupDefinition>> {
        Ok(self.groups.read().get(&id).cloned())
    }
}
