//! Explicit Catalog Snapshot Cache
//!
//! Selection dialogs and repeated evaluations reuse one catalog snapshot and
//! its base/sub decompositions instead of rescanning the catalog each time.
//! The cache never invalidates on its own: the snapshot is built on first use
//! and replaced only by `refresh()`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tsgroup::catalog::{CatalogCache, InMemoryCatalog};
//! use tsgroup::decompose::CompoundPart;
//!
//! let catalog = Arc::new(InMemoryCatalog::from_paths(["ALPHA-1.Stage.Inst.1Hour.0.raw"]).unwrap());
//! let cache = CatalogCache::new(catalog.clone());
//!
//! assert_eq!(cache.index().unwrap().len(), 1);
//! catalog.register("BETA.Stage.Inst.1Hour.0.raw").unwrap();
//!
//! // Still the old snapshot until refreshed
//! assert_eq!(cache.index().unwrap().len(), 1);
//! cache.refresh().unwrap();
//! assert_eq!(cache.index().unwrap().len(), 2);
//! assert_eq!(cache.decomposition(CompoundPart::Location).unwrap().len(), 2);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::index::CatalogIndex;
use super::TsCatalog;
use crate::decompose::{decompose, BaseSubPartSpec, CompoundPart};
use crate::error::Result;

/// Statistics for the catalog cache
#[derive(Debug, Default)]
struct CacheCounters {
    loads: AtomicU64,
    hits: AtomicU64,
    refreshes: AtomicU64,
}

/// Snapshot of cache statistics (non-atomic copy)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogCacheStats {
    /// Snapshots built from the catalog
    pub loads: u64,
    /// Requests served from an existing snapshot
    pub hits: u64,
    /// Explicit refreshes
    pub refreshes: u64,
}

/// Decompositions tagged with the snapshot they were built from
#[derive(Default)]
struct Decompositions {
    source: Option<Arc<CatalogIndex>>,
    by_part: HashMap<CompoundPart, Arc<Vec<BaseSubPartSpec>>>,
}

impl Decompositions {
    fn built_from(&self, index: &Arc<CatalogIndex>) -> bool {
        self.source.as_ref().is_some_and(|s| Arc::ptr_eq(s, index))
    }
}

/// Owned cache of one catalog snapshot and its decompositions
pub struct CatalogCache {
    catalog: Arc<dyn TsCatalog>,
    index: RwLock<Option<Arc<CatalogIndex>>>,
    decompositions: RwLock<Decompositions>,
    counters: CacheCounters,
}

impl CatalogCache {
    /// Create an empty cache over a catalog
    pub fn new(catalog: Arc<dyn TsCatalog>) -> Self {
        Self {
            catalog,
            index: RwLock::new(None),
            decompositions: RwLock::new(Decompositions::default()),
            counters: CacheCounters::default(),
        }
    }

    /// The cached snapshot, built on first use
    pub fn index(&self) -> Result<Arc<CatalogIndex>> {
        {
            let cached = self.index.read();
            if let Some(index) = cached.as_ref() {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(index.clone());
            }
        }

        let mut slot = self.index.write();

        // Double-check after acquiring write lock
        if let Some(index) = slot.as_ref() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(index.clone());
        }

        let index = Arc::new(CatalogIndex::from_catalog(self.catalog.as_ref())?);
        self.counters.loads.fetch_add(1, Ordering::Relaxed);
        *slot = Some(index.clone());
        Ok(index)
    }

    /// Base/sub decomposition of one compound part over the cached snapshot
    pub fn decomposition(&self, part: CompoundPart) -> Result<Arc<Vec<BaseSubPartSpec>>> {
        let index = self.index()?;
        {
            let cached = self.decompositions.read();
            if cached.built_from(&index) {
                if let Some(specs) = cached.by_part.get(&part) {
                    return Ok(specs.clone());
                }
            }
        }

        let specs = Arc::new(decompose(index.series(), part));
        Ok(self.store_decomposition(&index, part, specs))
    }

    /// Keep rows built from `index` unless a refresh has replaced it since
    fn store_decomposition(
        &self,
        index: &Arc<CatalogIndex>,
        part: CompoundPart,
        specs: Arc<Vec<BaseSubPartSpec>>,
    ) -> Arc<Vec<BaseSubPartSpec>> {
        let mut cached = self.decompositions.write();
        if !cached.built_from(index) {
            let current = self
                .index
                .read()
                .as_ref()
                .is_some_and(|i| Arc::ptr_eq(i, index));
            if !current {
                debug!(?part, "Dropping decomposition of a replaced snapshot");
                return specs;
            }
            *cached = Decompositions {
                source: Some(index.clone()),
                by_part: HashMap::new(),
            };
        }
        cached.by_part.entry(part).or_insert(specs).clone()
    }

    /// Rebuild the snapshot from the catalog and drop the decompositions
    ///
    /// On failure the previous snapshot is kept.
    pub fn refresh(&self) -> Result<Arc<CatalogIndex>> {
        let index = Arc::new(CatalogIndex::from_catalog(self.catalog.as_ref())?);

        *self.index.write() = Some(index.clone());
        *self.decompositions.write() = Decompositions::default();

        self.counters.loads.fetch_add(1, Ordering::Relaxed);
        self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
        debug!(series = index.len(), "Catalog cache refreshed");
        Ok(index)
    }

    /// Whether a snapshot has been built
    pub fn is_loaded(&self) -> bool {
        self.index.read().is_some()
    }

    /// Get statistics
    pub fn stats(&self) -> CatalogCacheStats {
        CatalogCacheStats {
            loads: self.counters.loads.load(Ordering::Relaxed),
            hits: self.counters.hits.load(Ordering::Relaxed),
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
        }
    }
}
