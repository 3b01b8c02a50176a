//! Integration tests for group membership resolution
//!
//! Builds groups through the builder against an in-memory catalog, saves
//! them to a group store and resolves them end to end.

use std::sync::Arc;

use tsgroup::catalog::{CatalogCache, GroupLookup, InMemoryCatalog, InMemoryGroupStore};
use tsgroup::config::ResolverConfig;
use tsgroup::error::LookupMiss;
use tsgroup::group::{validate_acyclic, GroupDefinition, GroupDefinitionBuilder, GroupRef, SubgroupOp};
use tsgroup::resolver::MembershipResolver;
use tsgroup::types::GroupId;
use tsgroup::Error;

// =============================================================================
// Helper Functions
// =============================================================================

const SERIES: &[&str] = &[
    "ALPHA-1.Stage.Inst.1Hour.0.raw",
    "ALPHA-1.Flow.Ave.1Day.1Day.rev",
    "ALPHA-2.Stage.Inst.1Hour.0.raw",
    "BETA-1.Stage.Inst.15Minutes.0.raw",
    "BETA.Flow.Inst.1Hour.0.rev",
    "GAMMA-North.Precip-Cum.Total.1Day.1Day.raw",
];

struct Fixture {
    catalog: Arc<InMemoryCatalog>,
    store: Arc<InMemoryGroupStore>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            catalog: Arc::new(InMemoryCatalog::from_paths(SERIES).unwrap()),
            store: Arc::new(InMemoryGroupStore::new()),
        }
    }

    fn resolver(&self) -> MembershipResolver {
        let cache = CatalogCache::new(self.catalog.clone());
        MembershipResolver::new(cache.index().unwrap(), self.store.clone())
    }

    fn save(&self, builder: GroupDefinitionBuilder) -> GroupRef {
        let outcome = builder.build(self.catalog.as_ref()).unwrap();
        let name = outcome.definition.name().to_string();
        let id = self.store.save(outcome.definition);
        GroupRef::new(id, name)
    }

    fn paths(&self, def: &GroupDefinition) -> Vec<String> {
        self.resolver()
            .resolve(def)
            .unwrap()
            .sorted()
            .iter()
            .map(|t| t.unique_string())
            .collect()
    }
}

fn group(name: &str) -> GroupDefinitionBuilder {
    GroupDefinitionBuilder::new().name(name).group_type("basin")
}

// =============================================================================
// Base Set
// =============================================================================

#[test]
fn test_site_and_interval_filters_are_ored() {
    let fx = Fixture::new();
    let outcome = group("Mixed")
        .query_item("Location", "BETA")
        .query_item("Interval", "15Minutes")
        .build(fx.catalog.as_ref())
        .unwrap();
    assert!(outcome.misses.is_empty());

    assert_eq!(
        fx.paths(&outcome.definition),
        vec!["BETA-1.Stage.Inst.15Minutes.0.raw", "BETA.Flow.Inst.1Hour.0.rev"]
    );
}

#[test]
fn test_base_and_sub_part_filters() {
    let fx = Fixture::new();

    let mut by_base = GroupDefinition::new("Alpha", "basin");
    by_base.add_other_filter("BaseLocation", "alpha");
    assert_eq!(fx.paths(&by_base).len(), 3);

    let mut by_sub = GroupDefinition::new("Ones", "basin");
    by_sub.add_other_filter("SubLocation", "1");
    assert_eq!(
        fx.paths(&by_sub),
        vec![
            "ALPHA-1.Flow.Ave.1Day.1Day.rev",
            "ALPHA-1.Stage.Inst.1Hour.0.raw",
            "BETA-1.Stage.Inst.15Minutes.0.raw",
        ]
    );
}

#[test]
fn test_wildcard_location_filter() {
    let fx = Fixture::new();
    let outcome = group("Alpha sites")
        .query_item("Location", "ALPHA-1")
        .query_item("Version", "r*")
        .build(fx.catalog.as_ref())
        .unwrap();

    // Location resolves to a site id, the wildcard stays a part filter
    assert_eq!(outcome.definition.sites().len(), 1);
    assert_eq!(outcome.definition.versions(), vec!["r*"]);
    assert_eq!(fx.paths(&outcome.definition).len(), SERIES.len());
}

#[test]
fn test_wildcards_disabled_match_literally() {
    let fx = Fixture::new();
    let mut def = GroupDefinition::new("Literal", "basin");
    def.add_other_filter("Location", "ALPHA-*");

    let cache = CatalogCache::new(fx.catalog.clone());
    let config = ResolverConfig {
        enable_wildcards: false,
        ..ResolverConfig::default()
    };
    let resolver = MembershipResolver::with_config(cache.index().unwrap(), fx.store.clone(), config);
    let members = resolver.resolve(&def).unwrap();

    assert!(members.is_empty());
    assert_eq!(members.misses().len(), 1);
}

#[test]
fn test_empty_group_resolves_empty() {
    let fx = Fixture::new();
    let def = GroupDefinition::new("Empty", "basin");
    let members = fx.resolver().resolve(&def).unwrap();
    assert!(members.is_empty());
    assert!(members.misses().is_empty());
}

// =============================================================================
// Subgroup Algebra
// =============================================================================

#[test]
fn test_include_exclude_intersect() {
    let fx = Fixture::new();
    let hourly = fx.save(group("Hourly").query_item("Interval", "1Hour"));
    let stage = fx.save(group("Stage").query_item("Param", "Stage"));
    let alpha2 = fx.save(group("Alpha 2").query_item("Location", "ALPHA-2"));

    let outcome = group("Hourly stage")
        .subgroup(SubgroupOp::Include, hourly)
        .subgroup(SubgroupOp::Exclude, alpha2)
        .subgroup(SubgroupOp::Intersect, stage)
        .build(fx.catalog.as_ref())
        .unwrap();
    assert!(outcome.rejected.is_empty());

    assert_eq!(
        fx.paths(&outcome.definition),
        vec!["ALPHA-1.Stage.Inst.1Hour.0.raw"]
    );
}

#[test]
fn test_exclude_applies_before_intersect() {
    let fx = Fixture::new();
    let beta = fx.save(group("Beta").query_item("BaseLocation", "BETA"));
    let all_stage = fx.save(group("Stage").query_item("Param", "Stage"));

    // BETA-1 is excluded first, so intersecting with Stage cannot bring it back
    let outcome = group("Stage without beta")
        .query_item("ParamType", "Inst")
        .subgroup(SubgroupOp::Exclude, beta)
        .subgroup(SubgroupOp::Intersect, all_stage)
        .build(fx.catalog.as_ref())
        .unwrap();

    assert_eq!(
        fx.paths(&outcome.definition),
        vec!["ALPHA-1.Stage.Inst.1Hour.0.raw", "ALPHA-2.Stage.Inst.1Hour.0.raw"]
    );
}

#[test]
fn test_nested_groups_through_store() {
    let fx = Fixture::new();
    let daily = fx.save(group("Daily").query_item("Interval", "1Day"));
    let wrapper = fx.save(group("Wrapper").subgroup(SubgroupOp::Include, daily));
    let top = fx.save(group("Top").subgroup(SubgroupOp::Include, wrapper));

    let members = fx.resolver().resolve_id(top.id).unwrap();
    assert_eq!(members.len(), 2);
}

#[test]
fn test_collapsed_reference_resolves_like_saved_group() {
    let fx = Fixture::new();
    let hourly = fx.save(group("Hourly").query_item("Interval", "1Hour"));

    let collapsed = GroupDefinition::collapsed(hourly.id, "Hourly", "basin");
    let saved = fx.store.group_by_id(hourly.id).unwrap().unwrap();
    assert_eq!(fx.paths(&collapsed), fx.paths(&saved));
}

// =============================================================================
// Failure Modes
// =============================================================================

#[test]
fn test_cycle_through_store_fails_resolution() {
    let fx = Fixture::new();
    let a_id = fx.store.save(GroupDefinition::new("A", "basin"));
    let b_id = fx.store.save(GroupDefinition::new("B", "basin"));

    let mut a = fx.store.group_by_id(a_id).unwrap().unwrap();
    a.add_subgroup(SubgroupOp::Include, GroupRef::new(b_id, "B")).unwrap();
    fx.store.save(a);

    let mut b = fx.store.group_by_id(b_id).unwrap().unwrap();
    b.add_subgroup(SubgroupOp::Exclude, GroupRef::new(a_id, "A")).unwrap();

    // Edit-time check refuses the save
    assert!(validate_acyclic(&b, fx.store.as_ref()).is_err());

    // A store that accepted it anyway still fails at resolution time
    fx.store.save(b);
    match fx.resolver().resolve_id(a_id) {
        Err(Error::Cycle(cycle)) => assert_eq!(cycle.chain, vec!["A", "B", "A"]),
        other => panic!("expected a cycle, got {:?}", other.map(|m| m.len())),
    }
}

#[test]
fn test_misses_are_reported_not_fatal() {
    let fx = Fixture::new();
    let outcome = group("Partial")
        .query_item("Location", "NOWHERE")
        .query_item("Interval", "1Hour")
        .build(fx.catalog.as_ref())
        .unwrap();
    assert_eq!(outcome.misses, vec![LookupMiss::SiteName("NOWHERE".to_string())]);

    let mut def = outcome.definition;
    def.add_subgroup(SubgroupOp::Include, GroupRef::new(GroupId(999), "Gone"))
        .unwrap();

    let members = fx.resolver().resolve(&def).unwrap();
    assert_eq!(members.len(), 3);
    assert!(matches!(members.misses(), [LookupMiss::Subgroup(r)] if r.id == GroupId(999)));
}

#[test]
fn test_unknown_group_id_is_an_error() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.resolver().resolve_id(GroupId(42)),
        Err(Error::Catalog(_))
    ));
}

#[test]
fn test_catalog_refresh_sees_new_series() {
    let fx = Fixture::new();
    let cache = CatalogCache::new(fx.catalog.clone());
    let mut def = GroupDefinition::new("Delta", "basin");
    def.add_other_filter("BaseLocation", "DELTA");

    let before = MembershipResolver::new(cache.index().unwrap(), fx.store.clone());
    assert!(before.resolve(&def).unwrap().is_empty());

    fx.catalog.register("DELTA-9.Stage.Inst.1Hour.0.raw").unwrap();
    let after = MembershipResolver::new(cache.refresh().unwrap(), fx.store.clone());
    assert_eq!(after.resolve(&def).unwrap().len(), 1);
}
