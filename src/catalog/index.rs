//! Frozen Catalog Snapshot with Inverted Indexes
//!
//! `CatalogIndex` assigns each distinct TSID a dense ordinal and keeps one
//! `MemberBitmap` per site, per datatype and per (part, value) pair, so that
//! every filter family of a group definition is an O(1) lookup rather than a
//! scan of the catalog.
//!
//! Part values are indexed upper-cased; lookups are case-insensitive. The
//! derived base/sub parts of Location, Param and Version are indexed too.

use std::collections::HashMap;

use tracing::debug;

use super::bitmap::{MemberBitmap, Ordinal};
use super::TsCatalog;
use crate::error::{Error, Result};
use crate::types::{canonical_part_name, DataTypeId, SiteId, TimeSeriesId, TsKey};

/// Derived compound parts indexed alongside the stored parts
const DERIVED_PARTS: [&str; 6] = [
    "baselocation",
    "sublocation",
    "baseparam",
    "subparam",
    "baseversion",
    "subversion",
];

/// Immutable, indexed snapshot of a catalog
#[derive(Debug, Default)]
pub struct CatalogIndex {
    /// Ordinal -> TSID
    series: Vec<TimeSeriesId>,

    /// Key -> ordinal
    by_key: HashMap<TsKey, Ordinal>,

    /// Members per site
    by_site: HashMap<SiteId, MemberBitmap>,

    /// Members per datatype
    by_datatype: HashMap<DataTypeId, MemberBitmap>,

    /// Canonical part name -> upper-cased value -> members
    by_part: HashMap<String, HashMap<String, MemberBitmap>>,

    /// Every series in the snapshot
    all: MemberBitmap,
}

impl CatalogIndex {
    /// Build a snapshot from a list of TSIDs
    ///
    /// TSIDs are deduplicated by key; the first occurrence wins.
    pub fn build(tsids: Vec<TimeSeriesId>) -> Result<Self> {
        let mut index = CatalogIndex::default();
        let mut duplicates = 0usize;

        for tsid in tsids {
            if index.by_key.contains_key(&tsid.key()) {
                duplicates += 1;
                continue;
            }

            let ordinal = Ordinal::try_from(index.series.len())
                .map_err(|_| Error::Catalog("catalog exceeds addressable size".into()))?;

            index.by_key.insert(tsid.key(), ordinal);
            index.by_site.entry(tsid.site()).or_default().set(ordinal);
            index
                .by_datatype
                .entry(tsid.datatype())
                .or_default()
                .set(ordinal);

            for (name, value) in tsid.parts() {
                index.add_part(&canonical_part_name(name), value, ordinal);
            }
            for derived in DERIVED_PARTS {
                if let Some(value) = tsid.part(derived) {
                    index.add_part(derived, value, ordinal);
                }
            }

            index.all.set(ordinal);
            index.series.push(tsid);
        }

        debug!(
            series = index.series.len(),
            duplicates,
            parts = index.by_part.len(),
            "Catalog snapshot built"
        );

        Ok(index)
    }

    /// Build a snapshot from a catalog collaborator
    pub fn from_catalog(catalog: &dyn TsCatalog) -> Result<Self> {
        Self::build(catalog.list_all()?)
    }

    fn add_part(&mut self, part: &str, value: &str, ordinal: Ordinal) {
        self.by_part
            .entry(part.to_string())
            .or_default()
            .entry(value.to_ascii_uppercase())
            .or_default()
            .set(ordinal);
    }

    /// Number of distinct series
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Check if the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// All series in ordinal order
    pub fn series(&self) -> &[TimeSeriesId] {
        &self.series
    }

    /// Ordinal of a key
    pub fn ordinal(&self, key: TsKey) -> Option<Ordinal> {
        self.by_key.get(&key).copied()
    }

    /// TSID at an ordinal
    pub fn get(&self, ordinal: Ordinal) -> Option<&TimeSeriesId> {
        self.series.get(ordinal as usize)
    }

    /// TSID for a key
    pub fn get_by_key(&self, key: TsKey) -> Option<&TimeSeriesId> {
        self.ordinal(key).and_then(|o| self.get(o))
    }

    /// Members at a site
    pub fn site_members(&self, site: SiteId) -> Option<&MemberBitmap> {
        self.by_site.get(&site)
    }

    /// Members of a datatype
    pub fn datatype_members(&self, datatype: DataTypeId) -> Option<&MemberBitmap> {
        self.by_datatype.get(&datatype)
    }

    /// Members whose part equals the value (case-insensitive)
    pub fn part_members(&self, part: &str, value: &str) -> Option<&MemberBitmap> {
        self.by_part
            .get(&canonical_part_name(part))?
            .get(&value.to_ascii_uppercase())
    }

    /// Distinct upper-cased values of a part with their members
    pub fn part_values<'a>(
        &'a self,
        part: &str,
    ) -> impl Iterator<Item = (&'a str, &'a MemberBitmap)> + 'a {
        self.by_part
            .get(&canonical_part_name(part))
            .into_iter()
            .flat_map(|values| values.iter().map(|(v, b)| (v.as_str(), b)))
    }

    /// Every series in the snapshot
    pub fn all(&self) -> &MemberBitmap {
        &self.all
    }

    /// Resolve a bitmap back to TSIDs
    pub fn materialize<'a>(
        &'a self,
        bitmap: &'a MemberBitmap,
    ) -> impl Iterator<Item = &'a TimeSeriesId> + 'a {
        bitmap.iter().filter_map(move |o| self.get(o))
    }

    /// Approximate memory used by the bitmaps
    pub fn memory_bytes(&self) -> usize {
        let sites: usize = self.by_site.values().map(|b| b.memory_bytes()).sum();
        let datatypes: usize = self.by_datatype.values().map(|b| b.memory_bytes()).sum();
        let parts: usize = self
            .by_part
            .values()
            .flat_map(|values| values.values())
            .map(|b| b.memory_bytes())
            .sum();
        sites + datatypes + parts + self.all.memory_bytes()
    }
}
