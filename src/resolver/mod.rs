//! Group Membership Resolution
//!
//! Expands a `GroupDefinition` into the concrete, deduplicated set of time
//! series it denotes against a frozen `CatalogIndex`.
//!
//! # Algorithm
//!
//! ```text
//! base     = explicit ∪ site matches ∪ datatype matches ∪ other-filter matches
//! result   = (base ∪ included) − excluded
//! result   = result ∩ (intersected₁ ∩ intersected₂ ∩ ...)   if any intersected
//! ```
//!
//! The order of the three steps is fixed. Subgroups are resolved depth-first
//! on an explicit work stack, so deep subgroup graphs cannot overflow the
//! call stack. A group reached twice on the current path is a cycle and fails
//! the whole resolution with `CycleError`; a group reached twice through
//! different paths is resolved once per call.
//!
//! Values that match nothing (unknown explicit members, part values with no
//! series, missing subgroups, unusable wildcards) are `LookupMiss`es: they are
//! left out of the result, collected on the `ResolvedMembership`, and
//! summarized in a single warning per resolution.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tsgroup::catalog::{CatalogIndex, InMemoryCatalog, InMemoryGroupStore};
//! use tsgroup::group::GroupDefinition;
//! use tsgroup::resolver::MembershipResolver;
//!
//! let catalog = InMemoryCatalog::from_paths([
//!     "ALPHA-1.Stage.Inst.1Hour.0.raw",
//!     "BETA-1.Stage.Inst.1Day.0.raw",
//! ])
//! .unwrap();
//! let index = Arc::new(CatalogIndex::from_catalog(&catalog).unwrap());
//! let resolver = MembershipResolver::new(index, Arc::new(InMemoryGroupStore::new()));
//!
//! let mut hourly = GroupDefinition::new("Hourly", "basin");
//! hourly.add_other_filter("Interval", "1Hour");
//!
//! let members = resolver.resolve(&hourly).unwrap();
//! assert_eq!(members.len(), 1);
//! ```

pub mod pattern;

pub use pattern::{PatternCache, PatternError};

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::{CatalogIndex, GroupLookup, MemberBitmap};
use crate::config::ResolverConfig;
use crate::error::{CycleError, Error, LookupMiss, Result};
use crate::group::{GroupDefinition, GroupRef, OtherFilter, SubgroupOp};
use crate::types::{GroupId, TimeSeriesId, TsKey};

/// Number of misses spelled out in the summary warning
const MISS_SUMMARY_LIMIT: usize = 5;

// ============================================================================
// Resolver Statistics
// ============================================================================

/// Statistics for the membership resolver
#[derive(Debug, Default)]
pub struct ResolverStats {
    /// Completed resolutions
    pub resolutions: AtomicU64,

    /// Resolutions that failed on a cycle
    pub cycles: AtomicU64,

    /// Lookup misses reported
    pub lookup_misses: AtomicU64,

    /// Subgroup definitions fetched from the group lookup
    pub subgroup_loads: AtomicU64,

    /// Subgroups answered from the per-call memo
    pub memo_hits: AtomicU64,
}

impl ResolverStats {
    /// Get a snapshot of statistics
    pub fn snapshot(&self) -> ResolverStatsSnapshot {
        ResolverStatsSnapshot {
            resolutions: self.resolutions.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            lookup_misses: self.lookup_misses.load(Ordering::Relaxed),
            subgroup_loads: self.subgroup_loads.load(Ordering::Relaxed),
            memo_hits: self.memo_hits.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of resolver statistics (non-atomic copy)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverStatsSnapshot {
    /// Completed resolutions
    pub resolutions: u64,
    /// Cycle failures
    pub cycles: u64,
    /// Lookup misses
    pub lookup_misses: u64,
    /// Subgroup loads
    pub subgroup_loads: u64,
    /// Memo hits
    pub memo_hits: u64,
}

// ============================================================================
// Resolved Membership
// ============================================================================

/// The concrete member set of a group
///
/// Deduplicated by TSID key. Iteration follows catalog snapshot order, which
/// is not a contract; use `sorted()` for a stable order.
#[derive(Debug, Clone)]
pub struct ResolvedMembership {
    index: Arc<CatalogIndex>,
    members: MemberBitmap,
    misses: Vec<LookupMiss>,
}

impl ResolvedMembership {
    /// Number of members
    pub fn len(&self) -> usize {
        self.members.cardinality()
    }

    /// Check if there are no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the series with this key is a member
    pub fn contains(&self, key: TsKey) -> bool {
        self.index
            .ordinal(key)
            .is_some_and(|ordinal| self.members.contains(ordinal))
    }

    /// Iterate over the member TSIDs
    pub fn iter(&self) -> impl Iterator<Item = &TimeSeriesId> {
        self.index.materialize(&self.members)
    }

    /// Iterate over the member keys
    pub fn keys(&self) -> impl Iterator<Item = TsKey> + '_ {
        self.iter().map(|tsid| tsid.key())
    }

    /// Members sorted by their dotted path (case-insensitive)
    pub fn sorted(&self) -> Vec<&TimeSeriesId> {
        let mut members: Vec<&TimeSeriesId> = self.iter().collect();
        members.sort_by_cached_key(|tsid| tsid.unique_string().to_ascii_uppercase());
        members
    }

    /// Values that were left out because nothing matched them
    pub fn misses(&self) -> &[LookupMiss] {
        &self.misses
    }

    /// Members as a snapshot bitmap
    pub fn bitmap(&self) -> &MemberBitmap {
        &self.members
    }
}

// ============================================================================
// Work Stack
// ============================================================================

/// One group being resolved
struct Frame {
    id: Option<GroupId>,
    name: String,
    /// How the parent combines this group, `None` for the root
    via: Option<SubgroupOp>,
    children: Vec<(SubgroupOp, GroupRef)>,
    next: usize,
    /// Base members plus everything included so far
    included: MemberBitmap,
    excluded: MemberBitmap,
    intersected: Option<MemberBitmap>,
}

impl Frame {
    fn next_child(&mut self) -> Option<(SubgroupOp, GroupRef)> {
        let child = self.children.get(self.next).cloned();
        if child.is_some() {
            self.next += 1;
        }
        child
    }

    fn absorb(&mut self, op: SubgroupOp, members: &MemberBitmap) {
        match op {
            SubgroupOp::Include => self.included.or_assign(members),
            SubgroupOp::Exclude => self.excluded.or_assign(members),
            SubgroupOp::Intersect => {
                self.intersected = Some(match self.intersected.take() {
                    Some(acc) => acc.and(members),
                    None => members.clone(),
                });
            },
        }
    }

    fn finish(self) -> MemberBitmap {
        let result = self.included.and_not(&self.excluded);
        match self.intersected {
            Some(intersected) => result.and(&intersected),
            None => result,
        }
    }
}

/// Misses of one resolution, in first-seen order without repeats
#[derive(Default)]
struct MissLog {
    seen: HashSet<LookupMiss>,
    misses: Vec<LookupMiss>,
}

impl MissLog {
    fn push(&mut self, miss: LookupMiss) {
        if self.seen.insert(miss.clone()) {
            self.misses.push(miss);
        }
    }
}

// ============================================================================
// Membership Resolver
// ============================================================================

/// Resolves group definitions against one catalog snapshot
pub struct MembershipResolver {
    index: Arc<CatalogIndex>,
    lookup: Arc<dyn GroupLookup>,
    config: ResolverConfig,
    patterns: PatternCache,
    stats: ResolverStats,
}

impl MembershipResolver {
    /// Create a resolver with default configuration
    pub fn new(index: Arc<CatalogIndex>, lookup: Arc<dyn GroupLookup>) -> Self {
        Self::with_config(index, lookup, ResolverConfig::default())
    }

    /// Create a resolver with custom configuration
    pub fn with_config(
        index: Arc<CatalogIndex>,
        lookup: Arc<dyn GroupLookup>,
        config: ResolverConfig,
    ) -> Self {
        let patterns = PatternCache::new(config.max_pattern_len, config.max_pattern_cache);
        Self {
            index,
            lookup,
            config,
            patterns,
            stats: ResolverStats::default(),
        }
    }

    /// The catalog snapshot resolved against
    pub fn index(&self) -> &Arc<CatalogIndex> {
        &self.index
    }

    /// Get statistics
    pub fn stats(&self) -> ResolverStatsSnapshot {
        self.stats.snapshot()
    }

    /// Resolve a saved group by id
    pub fn resolve_id(&self, id: GroupId) -> Result<ResolvedMembership> {
        let def = self
            .lookup
            .group_by_id(id)?
            .ok_or_else(|| Error::Catalog(format!("group {} not found", id)))?;
        self.resolve(&def)
    }

    /// Resolve a definition into its member set
    ///
    /// Fails only on a subgroup cycle or a collaborator failure; unmatched
    /// values are reported on the result instead.
    pub fn resolve(&self, def: &GroupDefinition) -> Result<ResolvedMembership> {
        let mut misses = MissLog::default();
        let mut memo: HashMap<GroupId, MemberBitmap> = HashMap::new();

        let root = self.load_if_collapsed(def)?;
        let mut stack = vec![self.open_frame(root.as_ref().unwrap_or(def), None, &mut misses)];

        let members = loop {
            let next = match stack.last_mut() {
                Some(frame) => frame.next_child(),
                None => break MemberBitmap::new(),
            };

            let Some((op, child)) = next else {
                let Some(done) = stack.pop() else {
                    break MemberBitmap::new();
                };
                let (id, via) = (done.id, done.via);
                let members = done.finish();

                match (stack.last_mut(), via) {
                    (Some(parent), Some(op)) => {
                        parent.absorb(op, &members);
                        if let Some(id) = id {
                            memo.insert(id, members);
                        }
                    },
                    _ => break members,
                }
                continue;
            };

            if let Some(members) = memo.get(&child.id) {
                self.stats.memo_hits.fetch_add(1, Ordering::Relaxed);
                absorb_into_top(&mut stack, op, members);
                continue;
            }

            if let Some(start) = stack.iter().position(|f| f.id == Some(child.id)) {
                let mut chain: Vec<String> = stack[start..].iter().map(|f| f.name.clone()).collect();
                chain.push(stack[start].name.clone());
                self.stats.cycles.fetch_add(1, Ordering::Relaxed);
                debug!(group = %def.name(), chain = %chain.join(" -> "), "Subgroup cycle");
                return Err(CycleError { chain }.into());
            }

            match self.lookup.group_by_id(child.id)? {
                Some(loaded) => {
                    self.stats.subgroup_loads.fetch_add(1, Ordering::Relaxed);
                    let frame = self.open_frame(&loaded, Some(op), &mut misses);
                    stack.push(frame);
                },
                None => {
                    misses.push(LookupMiss::Subgroup(child));
                    absorb_into_top(&mut stack, op, &MemberBitmap::new());
                },
            }
        };

        let misses = misses.misses;
        self.stats.resolutions.fetch_add(1, Ordering::Relaxed);
        self.stats
            .lookup_misses
            .fetch_add(misses.len() as u64, Ordering::Relaxed);

        if !misses.is_empty() {
            let summary: Vec<String> = misses
                .iter()
                .take(MISS_SUMMARY_LIMIT)
                .map(|m| m.to_string())
                .collect();
            let more = misses.len().saturating_sub(MISS_SUMMARY_LIMIT);
            let suffix = if more > 0 {
                format!(" (+{} more)", more)
            } else {
                String::new()
            };
            warn!(
                group = %def.name(),
                misses = misses.len(),
                "Values left out of group: {}{}",
                summary.join("; "),
                suffix
            );
        }
        debug!(
            group = %def.name(),
            members = members.cardinality(),
            subgroups = memo.len(),
            "Group resolved"
        );

        Ok(ResolvedMembership {
            index: self.index.clone(),
            members,
            misses,
        })
    }

    /// Full definition for a collapsed one, `None` when `def` can be used as is
    fn load_if_collapsed(&self, def: &GroupDefinition) -> Result<Option<GroupDefinition>> {
        match def.id() {
            Some(id) if !def.is_expanded() => {
                self.stats.subgroup_loads.fetch_add(1, Ordering::Relaxed);
                self.lookup.group_by_id(id)
            },
            _ => Ok(None),
        }
    }

    fn open_frame(
        &self,
        def: &GroupDefinition,
        via: Option<SubgroupOp>,
        misses: &mut MissLog,
    ) -> Frame {
        Frame {
            id: def.id(),
            name: def.name().to_string(),
            via,
            children: def.subgroups().map(|(op, g)| (op, g.clone())).collect(),
            next: 0,
            included: self.base_members(def, misses),
            excluded: MemberBitmap::new(),
            intersected: None,
        }
    }

    /// Union of explicit members and every filter match
    fn base_members(&self, def: &GroupDefinition, misses: &mut MissLog) -> MemberBitmap {
        let mut base = MemberBitmap::new();

        for &key in def.explicit_members() {
            match self.index.ordinal(key) {
                Some(ordinal) => base.set(ordinal),
                None => misses.push(LookupMiss::ExplicitMember(key)),
            }
        }

        for &site in def.sites() {
            match self.index.site_members(site) {
                Some(members) => base.or_assign(members),
                None => misses.push(LookupMiss::Site(site)),
            }
        }

        for &datatype in def.datatypes() {
            match self.index.datatype_members(datatype) {
                Some(members) => base.or_assign(members),
                None => misses.push(LookupMiss::DataType(datatype)),
            }
        }

        for filter in def.other_filters() {
            let outcome = if filter.is_wildcard() && self.config.enable_wildcards {
                self.wildcard_members(filter, &mut base)
            } else {
                match self.index.part_members(filter.part(), filter.value()) {
                    Some(members) => {
                        base.or_assign(members);
                        FilterMatch::Matched
                    },
                    None => FilterMatch::NoMatch,
                }
            };

            let miss = match outcome {
                FilterMatch::Matched => continue,
                FilterMatch::NoMatch => LookupMiss::PartValue {
                    part: filter.part().to_string(),
                    value: filter.value().to_string(),
                },
                FilterMatch::InvalidPattern => LookupMiss::InvalidPattern {
                    part: filter.part().to_string(),
                    value: filter.value().to_string(),
                },
            };
            misses.push(miss);
        }

        base
    }

    /// Add every series whose part matches a wildcard filter
    fn wildcard_members(&self, filter: &OtherFilter, base: &mut MemberBitmap) -> FilterMatch {
        let regex = match self.patterns.get_or_compile(filter.value()) {
            Ok(regex) => regex,
            Err(e) => {
                debug!(part = filter.part(), error = %e, "Rejected wildcard filter");
                return FilterMatch::InvalidPattern;
            },
        };

        let mut outcome = FilterMatch::NoMatch;
        for (value, members) in self.index.part_values(filter.part()) {
            if regex.is_match(value) {
                base.or_assign(members);
                outcome = FilterMatch::Matched;
            }
        }
        outcome
    }
}

/// How one part filter fared against the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterMatch {
    Matched,
    NoMatch,
    InvalidPattern,
}

fn absorb_into_top(stack: &mut [Frame], op: SubgroupOp, members: &MemberBitmap) {
    if let Some(top) = stack.last_mut() {
        top.absorb(op, members);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, InMemoryGroupStore, TsCatalog};
    use crate::types::{DataTypeId, SiteId};

    struct Fixture {
        catalog: InMemoryCatalog,
        store: Arc<InMemoryGroupStore>,
        resolver: MembershipResolver,
    }

    impl Fixture {
        fn key(&self, path: &str) -> TsKey {
            self.catalog.key_for_path(path).unwrap()
        }

        fn paths(&self, members: &ResolvedMembership) -> Vec<String> {
            members.sorted().iter().map(|t| t.unique_string()).collect()
        }
    }

    fn fixture() -> Fixture {
        let catalog = InMemoryCatalog::from_paths([
            "ALPHA-1.Stage.Inst.1Hour.0.raw",
            "ALPHA-2.Stage.Inst.1Hour.0.raw",
            "ALPHA-2.Flow.Ave.1Day.1Day.rev",
            "BETA-1.Flow.Inst.15Minutes.0.raw",
            "GAMMA.Elev.Inst.1Hour.0.rev",
        ])
        .unwrap();
        let store = Arc::new(InMemoryGroupStore::new());
        let index = Arc::new(CatalogIndex::from_catalog(&catalog).unwrap());
        let resolver = MembershipResolver::new(index, store.clone());
        Fixture {
            catalog,
            store,
            resolver,
        }
    }

    fn saved(fx: &Fixture, def: GroupDefinition) -> GroupRef {
        let name = def.name().to_string();
        let id = fx.store.save(def);
        GroupRef::new(id, name)
    }

    #[test]
    fn test_empty_group_resolves_empty() {
        let fx = fixture();
        let members = fx.resolver.resolve(&GroupDefinition::new("Empty", "t")).unwrap();
        assert!(members.is_empty());
        assert!(members.misses().is_empty());
    }

    #[test]
    fn test_filter_families_are_ored() {
        let fx = fixture();
        let mut def = GroupDefinition::new("Mixed", "t");
        def.add_site(fx.catalog.site_id("BETA-1").unwrap());
        def.add_datatype(fx.catalog.datatype_id("Elev").unwrap());
        def.add_other_filter("Version", "REV");
        def.add_explicit_member(fx.key("ALPHA-1.Stage.Inst.1Hour.0.raw"));

        let members = fx.resolver.resolve(&def).unwrap();
        assert_eq!(
            fx.paths(&members),
            vec![
                "ALPHA-1.Stage.Inst.1Hour.0.raw",
                "ALPHA-2.Flow.Ave.1Day.1Day.rev",
                "BETA-1.Flow.Inst.15Minutes.0.raw",
                "GAMMA.Elev.Inst.1Hour.0.rev",
            ]
        );
    }

    #[test]
    fn test_derived_part_and_wildcard_filters() {
        let fx = fixture();
        let mut def = GroupDefinition::new("Alpha", "t");
        def.add_other_filter("BaseLocation", "alpha");
        assert_eq!(fx.resolver.resolve(&def).unwrap().len(), 3);

        let mut def = GroupDefinition::new("Subs", "t");
        def.add_other_filter("Location", "*-1");
        let members = fx.resolver.resolve(&def).unwrap();
        assert_eq!(
            fx.paths(&members),
            vec!["ALPHA-1.Stage.Inst.1Hour.0.raw", "BETA-1.Flow.Inst.15Minutes.0.raw"]
        );
    }

    #[test]
    fn test_wildcards_disabled_match_literally() {
        let fx = fixture();
        let config = ResolverConfig {
            enable_wildcards: false,
            ..ResolverConfig::default()
        };
        let resolver =
            MembershipResolver::with_config(fx.resolver.index().clone(), fx.store.clone(), config);
        let mut def = GroupDefinition::new("Subs", "t");
        def.add_other_filter("Location", "*-1");

        let members = resolver.resolve(&def).unwrap();
        assert!(members.is_empty());
        assert_eq!(members.misses().len(), 1);
    }

    #[test]
    fn test_set_algebra_order() {
        let fx = fixture();
        let mut hourly = GroupDefinition::new("Hourly", "t");
        hourly.add_other_filter("Interval", "1Hour");
        let hourly = saved(&fx, hourly);

        let mut alpha = GroupDefinition::new("Alpha", "t");
        alpha.add_other_filter("BaseLocation", "ALPHA");
        let alpha = saved(&fx, alpha);

        let mut stage = GroupDefinition::new("Stage", "t");
        stage.add_datatype(fx.catalog.datatype_id("Stage").unwrap());
        let stage = saved(&fx, stage);

        // (BETA-1 ∪ Hourly) − Stage
        let mut def = GroupDefinition::new("Combo", "t");
        def.add_site(fx.catalog.site_id("BETA-1").unwrap());
        def.add_subgroup(SubgroupOp::Include, hourly.clone()).unwrap();
        def.add_subgroup(SubgroupOp::Exclude, stage.clone()).unwrap();
        let members = fx.resolver.resolve(&def).unwrap();
        assert_eq!(
            fx.paths(&members),
            vec!["BETA-1.Flow.Inst.15Minutes.0.raw", "GAMMA.Elev.Inst.1Hour.0.rev"]
        );

        // Alpha shares nothing with what is left
        def.add_subgroup(SubgroupOp::Intersect, alpha).unwrap();
        assert!(fx.resolver.resolve(&def).unwrap().is_empty());
    }

    #[test]
    fn test_exclusion_applies_after_inclusion() {
        let fx = fixture();
        let mut stage = GroupDefinition::new("Stage", "t");
        stage.add_datatype(fx.catalog.datatype_id("Stage").unwrap());
        let stage = saved(&fx, stage);

        let mut def = GroupDefinition::new("Combo", "t");
        def.add_subgroup(SubgroupOp::Include, stage.clone()).unwrap();
        def.add_subgroup(SubgroupOp::Exclude, stage).unwrap();
        assert!(fx.resolver.resolve(&def).unwrap().is_empty());
    }

    #[test]
    fn test_intersect_only_equals_subgroup() {
        let fx = fixture();
        let mut hourly = GroupDefinition::new("Hourly", "t");
        hourly.add_other_filter("Interval", "1Hour");
        let expected = fx.resolver.resolve(&hourly).unwrap();
        let hourly = saved(&fx, hourly);

        let mut def = GroupDefinition::new("Wrapper", "t");
        def.add_subgroup(SubgroupOp::Intersect, hourly).unwrap();
        let members = fx.resolver.resolve(&def).unwrap();

        let a: HashSet<TsKey> = members.keys().collect();
        let b: HashSet<TsKey> = expected.keys().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_direct_cycle_rejected() {
        let fx = fixture();
        let a_id = fx.store.save(GroupDefinition::new("A", "t"));
        let mut b = GroupDefinition::new("B", "t");
        b.add_subgroup(SubgroupOp::Include, GroupRef::new(a_id, "A")).unwrap();
        let b_ref = saved(&fx, b);

        let mut a = fx.store.group_by_id(a_id).unwrap().unwrap();
        a.add_subgroup(SubgroupOp::Include, b_ref).unwrap();
        fx.store.save(a.clone());

        let err = fx.resolver.resolve(&a).unwrap_err();
        match err {
            Error::Cycle(CycleError { chain }) => assert_eq!(chain, vec!["A", "B", "A"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fx.resolver.stats().cycles, 1);
    }

    #[test]
    fn test_diamond_is_not_a_cycle_and_is_memoized() {
        let fx = fixture();
        let mut leaf = GroupDefinition::new("Leaf", "t");
        leaf.add_other_filter("Interval", "1Day");
        let leaf = saved(&fx, leaf);

        let mut left = GroupDefinition::new("Left", "t");
        left.add_subgroup(SubgroupOp::Include, leaf.clone()).unwrap();
        let left = saved(&fx, left);

        let mut right = GroupDefinition::new("Right", "t");
        right.add_subgroup(SubgroupOp::Include, leaf).unwrap();
        let right = saved(&fx, right);

        let mut top = GroupDefinition::new("Top", "t");
        top.add_subgroup(SubgroupOp::Include, left).unwrap();
        top.add_subgroup(SubgroupOp::Intersect, right).unwrap();

        let members = fx.resolver.resolve(&top).unwrap();
        assert_eq!(fx.paths(&members), vec!["ALPHA-2.Flow.Ave.1Day.1Day.rev"]);
        assert_eq!(fx.resolver.stats().memo_hits, 1);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let fx = fixture();
        let mut prev: Option<GroupRef> = None;
        for i in 0..5_000 {
            let mut def = GroupDefinition::new(format!("G{}", i), "t");
            if let Some(p) = prev.take() {
                def.add_subgroup(SubgroupOp::Include, p).unwrap();
            } else {
                def.add_other_filter("Version", "rev");
            }
            prev = Some(saved(&fx, def));
        }

        let top = fx.store.group_by_id(prev.unwrap().id).unwrap().unwrap();
        assert_eq!(fx.resolver.resolve(&top).unwrap().len(), 2);
    }

    #[test]
    fn test_misses_aggregated() {
        let fx = fixture();
        let mut def = GroupDefinition::new("Misses", "t");
        def.add_explicit_member(TsKey(9_999));
        def.add_other_filter("Interval", "1Week");
        def.add_site(SiteId(12_345));
        def.add_subgroup(SubgroupOp::Include, GroupRef::new(GroupId(777), "Gone"))
            .unwrap();
        def.add_other_filter("Interval", "1Hour");

        let members = fx.resolver.resolve(&def).unwrap();
        assert_eq!(members.len(), 3);
        assert_eq!(
            members.misses(),
            &[
                LookupMiss::ExplicitMember(TsKey(9_999)),
                LookupMiss::Site(SiteId(12_345)),
                LookupMiss::PartValue {
                    part: "Interval".into(),
                    value: "1Week".into(),
                },
                LookupMiss::Subgroup(GroupRef::new(GroupId(777), "Gone")),
            ]
        );
        assert_eq!(fx.resolver.stats().lookup_misses, 4);
    }

    #[test]
    fn test_unknown_site_and_datatype_reported() {
        let fx = fixture();
        let mut def = GroupDefinition::new("Unknown ids", "t");
        def.add_site(SiteId(999));
        def.add_datatype(DataTypeId(998));
        def.add_other_filter("Interval", "1Week");

        let members = fx.resolver.resolve(&def).unwrap();
        assert!(members.is_empty());
        assert_eq!(
            members.misses(),
            &[
                LookupMiss::Site(SiteId(999)),
                LookupMiss::DataType(DataTypeId(998)),
                LookupMiss::PartValue {
                    part: "Interval".into(),
                    value: "1Week".into(),
                },
            ]
        );
    }

    #[test]
    fn test_unusable_wildcard_reported_once() {
        let fx = fixture();
        let config = ResolverConfig {
            max_pattern_len: 4,
            ..ResolverConfig::default()
        };
        let resolver =
            MembershipResolver::with_config(fx.resolver.index.clone(), fx.store.clone(), config);

        let mut def = GroupDefinition::new("Long pattern", "t");
        def.add_other_filter("Location", "ALPHA-*");
        def.add_other_filter("Version", "rev");

        let members = resolver.resolve(&def).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(
            members.misses(),
            &[LookupMiss::InvalidPattern {
                part: "Location".into(),
                value: "ALPHA-*".into(),
            }]
        );
    }

    #[test]
    fn test_collapsed_definition_is_loaded() {
        let fx = fixture();
        let mut full = GroupDefinition::new("Stored", "t");
        full.add_other_filter("Version", "raw");
        let stored = saved(&fx, full);

        let collapsed = GroupDefinition::collapsed(stored.id, "Stored", "t");
        let members = fx.resolver.resolve(&collapsed).unwrap();
        assert_eq!(members.len(), 3);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let fx = fixture();
        let mut def = GroupDefinition::new("Hourly", "t");
        def.add_other_filter("Interval", "1Hour");
        def.add_other_filter("Location", "BETA-*");

        let first: Vec<TsKey> = fx.resolver.resolve(&def).unwrap().keys().collect();
        let second: Vec<TsKey> = fx.resolver.resolve(&def).unwrap().keys().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_resolve_id() {
        let fx = fixture();
        let mut def = GroupDefinition::new("Flow", "t");
        def.add_datatype(fx.catalog.datatype_id("flow").unwrap());
        let r = saved(&fx, def);

        let members = fx.resolver.resolve_id(r.id).unwrap();
        assert!(members.contains(fx.key("BETA-1.Flow.Inst.15Minutes.0.raw")));
        assert!(!members.contains(fx.key("GAMMA.Elev.Inst.1Hour.0.rev")));
        assert!(matches!(
            fx.resolver.resolve_id(GroupId(4_242)),
            Err(Error::Catalog(_))
        ));
    }
}
