//! Canonical-prefix index
//!
//! Authoritative mapping from the exact prefix string (as it appears in the
//! source table) to the one-or-more records that share it, partitioned by
//! address family. Built once from a snapshot of the table and read-only
//! afterward. Also keeps the flat record list in source order, which is what
//! organization search scans.

use crate::record::PrefixRecord;
use pfx2org_ip_trie::AddressFamily;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// All records sharing one canonical prefix, in source-table order.
///
/// Duplicated prefixes are concatenated, never merged or deduplicated by
/// content: an entry always has at least one record and exactly as many as
/// the table had rows for that prefix.
#[derive(Debug)]
pub struct PrefixEntry {
    prefix: String,
    records: Vec<Arc<PrefixRecord>>,
}

impl PrefixEntry {
    /// The canonical prefix string all records in this entry share.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The grouped records, in original table order.
    pub fn records(&self) -> &[Arc<PrefixRecord>] {
        &self.records
    }

    /// Number of records grouped under this prefix.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a built entry; present for completeness.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Exact-key index from canonical prefix to grouped records.
pub struct PrefixIndex {
    v4: FxHashMap<String, Arc<PrefixEntry>>,
    v6: FxHashMap<String, Arc<PrefixEntry>>,
    /// Every record in source-table order, across both families.
    records: Vec<Arc<PrefixRecord>>,
}

impl PrefixIndex {
    /// Build the index from the full record list in one stable pass.
    ///
    /// Records are partitioned by family and grouped by their exact prefix
    /// string; within a group the original relative order is preserved.
    pub fn build(records: Vec<PrefixRecord>) -> Self {
        let records: Vec<Arc<PrefixRecord>> = records.into_iter().map(Arc::new).collect();

        let mut v4_groups: FxHashMap<String, Vec<Arc<PrefixRecord>>> = FxHashMap::default();
        let mut v6_groups: FxHashMap<String, Vec<Arc<PrefixRecord>>> = FxHashMap::default();

        for record in &records {
            let groups = match record.family() {
                AddressFamily::V4 => &mut v4_groups,
                AddressFamily::V6 => &mut v6_groups,
            };
            groups
                .entry(record.prefix.clone())
                .or_default()
                .push(Arc::clone(record));
        }

        let freeze = |groups: FxHashMap<String, Vec<Arc<PrefixRecord>>>| {
            groups
                .into_iter()
                .map(|(prefix, group)| {
                    let entry = Arc::new(PrefixEntry {
                        prefix: prefix.clone(),
                        records: group,
                    });
                    (prefix, entry)
                })
                .collect()
        };

        Self {
            v4: freeze(v4_groups),
            v6: freeze(v6_groups),
            records,
        }
    }

    /// Full entry for a canonical prefix, or `None`.
    pub fn lookup_exact(
        &self,
        canonical: &str,
        family: AddressFamily,
    ) -> Option<&Arc<PrefixEntry>> {
        match family {
            AddressFamily::V4 => self.v4.get(canonical),
            AddressFamily::V6 => self.v6.get(canonical),
        }
    }

    /// All records whose owner contains `fragment`, case-insensitively.
    ///
    /// Records without an owner never match. Result order is the underlying
    /// table's iteration order; no relevance ranking is applied.
    pub fn matching_organization(&self, fragment: &str) -> Vec<Arc<PrefixRecord>> {
        let needle = fragment.to_lowercase();
        self.records
            .iter()
            .filter(|record| {
                record
                    .owner
                    .as_ref()
                    .is_some_and(|owner| owner.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    /// Every record in source-table order.
    pub fn records(&self) -> &[Arc<PrefixRecord>] {
        &self.records
    }

    /// Total rows loaded from the table.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Distinct canonical prefixes across both families.
    pub fn prefix_count(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    /// Distinct canonical prefixes for one family.
    pub fn family_count(&self, family: AddressFamily) -> usize {
        match family {
            AddressFamily::V4 => self.v4.len(),
            AddressFamily::V6 => self.v6.len(),
        }
    }
}
