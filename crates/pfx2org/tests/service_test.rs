// End-to-end tests for the lookup service, built from in-memory records.

use pfx2org::{AttrValue, LookupService, OrgSizeTable, PrefixRecord, SharedService};

fn sample_records() -> Vec<PrefixRecord> {
    vec![
        PrefixRecord::new("216.1.81.0/24", Some("Example Corp"))
            .with_attr("origin_asn", AttrValue::Int(64500)),
        PrefixRecord::new("216.1.81.0/25", Some("Sub Org")),
        PrefixRecord::new("10.0.0.0/8", Some("AT&T, Inc.")),
        PrefixRecord::new("2001:db8::/32", Some("Example Corp")),
        PrefixRecord::new("203.0.113.0/24", None),
    ]
}

#[test]
fn test_every_inserted_prefix_matches_itself() {
    let service = LookupService::from_records(sample_records());

    for prefix in [
        "216.1.81.0/24",
        "216.1.81.0/25",
        "10.0.0.0/8",
        "2001:db8::/32",
        "203.0.113.0/24",
    ] {
        let entry = service
            .search_by_prefix(prefix)
            .unwrap()
            .unwrap_or_else(|| panic!("{} should match itself", prefix));
        assert!(
            entry.records().iter().any(|r| r.prefix == prefix),
            "entry for {} should contain a record with that prefix",
            prefix
        );
    }
}

#[test]
fn test_query_resolves_to_longest_covering_entry() {
    let service = LookupService::from_records(sample_records());

    // Host address inside the /25: the /25 is more specific than the /24.
    let entry = service.search_by_prefix("216.1.81.5/25").unwrap().unwrap();
    assert_eq!(entry.prefix(), "216.1.81.0/25");

    // No /28 is stored; the covering /25 still wins.
    let entry = service.search_by_prefix("216.1.81.5/28").unwrap().unwrap();
    assert_eq!(entry.prefix(), "216.1.81.0/25");

    // Upper half of the /24 is outside the /25.
    let entry = service.search_by_prefix("216.1.81.200").unwrap().unwrap();
    assert_eq!(entry.prefix(), "216.1.81.0/24");
    assert_eq!(
        entry.records()[0].attr("origin_asn"),
        Some(&AttrValue::Int(64500))
    );
}

#[test]
fn test_invalid_prefix_is_rejected_before_lookup() {
    let service = LookupService::from_records(sample_records());

    for query in ["999.1.1.1/99", "not-an-ip", "10.0.0.0/33", "", "10.0.0.0/x"] {
        assert!(
            service.search_by_prefix(query).is_err(),
            "{:?} should be rejected as invalid",
            query
        );
    }
}

#[test]
fn test_uncovered_prefix_is_not_found() {
    let service = LookupService::from_records(sample_records());
    assert!(service.search_by_prefix("8.8.8.8").unwrap().is_none());
    assert!(service.search_by_prefix("192.0.2.0/24").unwrap().is_none());
}

#[test]
fn test_family_mismatch_is_not_found() {
    let v4_only = LookupService::from_records(vec![PrefixRecord::new(
        "10.0.0.0/8",
        Some("Example Corp"),
    )]);
    assert!(v4_only.search_by_prefix("2001:db8::1").unwrap().is_none());

    let v6_only = LookupService::from_records(vec![PrefixRecord::new(
        "2001:db8::/32",
        Some("Example Corp"),
    )]);
    assert!(v6_only.search_by_prefix("10.0.0.1").unwrap().is_none());
}

#[test]
fn test_duplicate_rows_grouped_lossless_in_order() {
    let service = LookupService::from_records(vec![
        PrefixRecord::new("192.0.2.0/24", Some("First")),
        PrefixRecord::new("192.0.2.0/24", Some("Second")),
        PrefixRecord::new("192.0.2.0/24", Some("First")),
    ]);

    let entry = service.search_by_prefix("192.0.2.7").unwrap().unwrap();
    assert_eq!(entry.len(), 3);
    let owners: Vec<_> = entry
        .records()
        .iter()
        .map(|r| r.owner.as_deref().unwrap())
        .collect();
    // Duplicates are concatenated, not deduplicated by content.
    assert_eq!(owners, ["First", "Second", "First"]);
}

#[test]
fn test_organization_search_is_case_insensitive_raw_substring() {
    let service = LookupService::from_records(sample_records());

    let lower = service.search_by_organization("corp");
    let upper = service.search_by_organization("CORP");
    let owners: Vec<_> = lower
        .iter()
        .map(|r| (r.prefix.as_str(), r.owner.as_deref().unwrap()))
        .collect();
    assert_eq!(
        owners,
        [
            ("216.1.81.0/24", "Example Corp"),
            ("2001:db8::/32", "Example Corp"),
        ]
    );
    assert_eq!(lower.len(), upper.len());

    // Matching is on the raw fragment: punctuation is significant.
    assert_eq!(service.search_by_organization("at&t").len(), 1);
    assert!(service.search_by_organization("at t").is_empty());

    // Records without an owner never match, and no match is not an error.
    assert!(service.search_by_organization("zzz-no-such-org").is_empty());
}

#[test]
fn test_rows_with_unparseable_prefix_are_dropped() {
    let service = LookupService::from_records(vec![
        PrefixRecord::new("10.0.0.0/8", Some("Example Corp")),
        PrefixRecord::new("garbage", Some("Ghost Org")),
    ]);

    assert_eq!(service.record_count(), 1);
    assert_eq!(service.prefix_count(), 1);
    assert!(service.search_by_organization("ghost").is_empty());
}

#[test]
fn test_enrichment_side_table_is_optional() {
    let mut org_sizes = OrgSizeTable::empty();
    org_sizes.insert("AT&amp;T, Inc.", "large;backbone");

    let service = LookupService::from_records(sample_records()).with_org_sizes(org_sizes);

    // Lookup is by normalized name, so punctuation variants all hit.
    assert_eq!(
        service.organization_info("AT&T Inc"),
        Some("large;backbone")
    );
    assert_eq!(
        service.organization_info("at&t, inc."),
        Some("large;backbone")
    );
    // Absence is "no enrichment available", not an error.
    assert_eq!(service.organization_info("Example Corp"), None);

    let bare = LookupService::from_records(sample_records());
    assert_eq!(bare.organization_info("AT&T Inc"), None);
}

#[test]
fn test_stats_reflect_queries() {
    let service = LookupService::from_records(sample_records());

    service.search_by_prefix("10.11.12.13").unwrap(); // match, cache miss
    service.search_by_prefix("10.11.12.13").unwrap(); // match, cache hit
    service.search_by_prefix("8.8.8.8").unwrap(); // no match
    assert!(service.search_by_prefix("bogus").is_err()); // invalid
    service.search_by_organization("corp"); // match
    service.search_by_organization("zzz"); // no match

    let stats = service.stats();
    assert_eq!(stats.total_queries, 6);
    assert_eq!(stats.prefix_queries, 4);
    assert_eq!(stats.org_queries, 2);
    assert_eq!(stats.queries_with_match, 3);
    assert_eq!(stats.queries_without_match, 2);
    assert_eq!(stats.cache_hits, 1);
    assert!(stats.match_rate() > 0.0);
    assert!(stats.cache_hit_rate() > 0.0);
}

#[test]
fn test_cache_can_be_disabled() {
    let service =
        LookupService::from_records(sample_records()).with_cache_capacity(0);

    service.search_by_prefix("216.1.81.77").unwrap();
    service.search_by_prefix("216.1.81.77").unwrap();

    let stats = service.stats();
    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.cache_misses, 0);
    assert_eq!(service.cache_size(), 0);
}

#[test]
fn test_clear_cache() {
    let service = LookupService::from_records(sample_records());

    service.search_by_prefix("203.0.113.9").unwrap();
    assert!(service.cache_size() >= 1);

    service.clear_cache();
    assert_eq!(service.cache_size(), 0);
}

#[test]
fn test_shared_service_atomic_replacement() {
    let shared = SharedService::new(LookupService::from_records(vec![PrefixRecord::new(
        "198.51.100.0/24",
        Some("Old Owner"),
    )]));
    assert_eq!(shared.generation(), 1);

    let entry = shared.search_by_prefix("198.51.100.1").unwrap().unwrap();
    assert_eq!(entry.records()[0].owner.as_deref(), Some("Old Owner"));

    // Pin the old snapshot, then swap in a rebuilt one.
    let old_snapshot = shared.snapshot();
    shared.replace(LookupService::from_records(vec![PrefixRecord::new(
        "198.51.100.0/24",
        Some("New Owner"),
    )]));
    assert_eq!(shared.generation(), 2);

    // The handle serves the new snapshot; the generation bump invalidated
    // the thread-local cache, so no stale entry survives the swap.
    let entry = shared.search_by_prefix("198.51.100.1").unwrap().unwrap();
    assert_eq!(entry.records()[0].owner.as_deref(), Some("New Owner"));

    // The pinned old snapshot's structures remain valid for in-flight use.
    old_snapshot.clear_cache();
    let entry = old_snapshot
        .search_by_prefix("198.51.100.1")
        .unwrap()
        .unwrap();
    assert_eq!(entry.records()[0].owner.as_deref(), Some("Old Owner"));
}

#[test]
fn test_counts() {
    let service = LookupService::from_records(sample_records());
    assert_eq!(service.record_count(), 5);
    assert_eq!(service.prefix_count(), 5);
    assert_eq!(service.family_count(pfx2org::AddressFamily::V4), 4);
    assert_eq!(service.family_count(pfx2org::AddressFamily::V6), 1);
}
