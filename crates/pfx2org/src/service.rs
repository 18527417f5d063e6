//! Lookup service
//!
//! The query façade over the dual-stack trie and the canonical-prefix index.
//! Everything is built once during initialization and is read-only
//! afterward, so a service is safe to share across threads without locking.
//!
//! Prefix queries are *longest-covering-prefix* lookups: the query is first
//! canonicalized to the most specific stored prefix that contains it, and
//! that prefix's full entry is returned. A query more specific or less
//! specific than any stored prefix still resolves to its covering entry; it
//! is not a set-membership check.
//!
//! # Example
//!
//! ```
//! use pfx2org::{LookupService, PrefixRecord};
//!
//! let service = LookupService::from_records(vec![
//!     PrefixRecord::new("216.1.81.0/24", Some("Example Corp")),
//!     PrefixRecord::new("216.1.81.0/25", Some("Sub Org")),
//! ]);
//!
//! let entry = service.search_by_prefix("216.1.81.5/28")?.unwrap();
//! assert_eq!(entry.prefix(), "216.1.81.0/25");
//! # Ok::<(), pfx2org::InvalidPrefixError>(())
//! ```

use crate::error::Pfx2OrgError;
use crate::index::{PrefixEntry, PrefixIndex};
use crate::loader::{self, TableConfig};
use crate::org_size::OrgSizeTable;
use crate::record::PrefixRecord;
use lru::LruCache;
use pfx2org_ip_trie::{parse_prefix, AddressFamily, DualStackTrie, InvalidPrefixError};
use rustc_hash::FxHasher;
use std::cell::RefCell;
use std::hash::BuildHasherDefault;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

// Thread-local query cache with generation tracking. Each thread gets its
// own LRU for zero-contention queries; the generation is checked so caches
// invalidate when a shared handle swaps in a new snapshot.
type QueryCache = (
    u64,
    LruCache<String, Arc<PrefixEntry>, BuildHasherDefault<FxHasher>>,
);

thread_local! {
    static QUERY_CACHE: RefCell<Option<QueryCache>> = const { RefCell::new(None) };
}

/// Default LRU capacity for prefix-query results
const DEFAULT_QUERY_CACHE_SIZE: usize = 10_000;

/// Statistics for service queries and cache performance
///
/// Uses atomic counters for thread-safe access across all threads.
#[derive(Debug, Default)]
pub struct ServiceStats {
    /// Total number of queries executed
    pub total_queries: AtomicU64,
    /// Prefix queries
    pub prefix_queries: AtomicU64,
    /// Organization queries
    pub org_queries: AtomicU64,
    /// Queries that found at least one record
    pub queries_with_match: AtomicU64,
    /// Queries that found nothing
    pub queries_without_match: AtomicU64,
    /// Prefix queries served from the thread-local cache
    pub cache_hits: AtomicU64,
    /// Prefix queries that required a trie walk
    pub cache_misses: AtomicU64,
}

impl ServiceStats {
    /// Take a snapshot of current statistics.
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            prefix_queries: self.prefix_queries.load(Ordering::Relaxed),
            org_queries: self.org_queries.load(Ordering::Relaxed),
            queries_with_match: self.queries_with_match.load(Ordering::Relaxed),
            queries_without_match: self.queries_without_match.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of service statistics at a point in time
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceStatsSnapshot {
    /// Total number of queries executed
    pub total_queries: u64,
    /// Prefix queries
    pub prefix_queries: u64,
    /// Organization queries
    pub org_queries: u64,
    /// Queries that found at least one record
    pub queries_with_match: u64,
    /// Queries that found nothing
    pub queries_without_match: u64,
    /// Prefix queries served from the thread-local cache
    pub cache_hits: u64,
    /// Prefix queries that required a trie walk
    pub cache_misses: u64,
}

impl ServiceStatsSnapshot {
    /// Cache hit rate (0.0 to 1.0).
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Match rate (0.0 to 1.0).
    pub fn match_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.queries_with_match as f64 / self.total_queries as f64
        }
    }
}

/// Options for opening a service from a source table.
#[derive(Debug, Clone)]
struct ServiceOptions {
    path: PathBuf,
    cache_capacity: Option<usize>,
    table: TableConfig,
    org_sizes: Option<PathBuf>,
}

/// Builder for loading a [`LookupService`] from a Parquet table.
///
/// Created via [`LookupService::from`]. Configure column names, cache size
/// and the optional side table, then call [`load`](Self::load).
///
/// # Examples
///
/// ```no_run
/// use pfx2org::LookupService;
///
/// let service = LookupService::from("pfx2org_sample_2025-04-01.parquet")
///     .cache_capacity(100_000)
///     .org_sizes("org_sizes.json")
///     .load()?;
/// # Ok::<(), pfx2org::Pfx2OrgError>(())
/// ```
pub struct ServiceOpener {
    options: ServiceOptions,
}

impl ServiceOpener {
    fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            options: ServiceOptions {
                path: path.into(),
                cache_capacity: None,
                table: TableConfig::default(),
                org_sizes: None,
            },
        }
    }

    /// Set the thread-local query cache capacity.
    ///
    /// Default: 10,000 entries. The cache only helps workloads that repeat
    /// queries; sequential scans should disable it.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.options.cache_capacity = Some(capacity);
        self
    }

    /// Disable the query cache entirely.
    pub fn no_cache(mut self) -> Self {
        self.options.cache_capacity = Some(0);
        self
    }

    /// Override the prefix column name (default `"prefix"`).
    pub fn prefix_column(mut self, name: impl Into<String>) -> Self {
        self.options.table = self.options.table.with_prefix_column(name);
        self
    }

    /// Override the owner column name (default `"Direct Owner (DO)"`).
    pub fn owner_column(mut self, name: impl Into<String>) -> Self {
        self.options.table = self.options.table.with_owner_column(name);
        self
    }

    /// Load the organization-size side table from a JSON file.
    pub fn org_sizes(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.org_sizes = Some(path.into());
        self
    }

    /// Read the table and build the service.
    ///
    /// This is the one-time blocking load; a failure here is terminal for
    /// this attempt and is surfaced, never retried internally.
    pub fn load(self) -> Result<LookupService, Pfx2OrgError> {
        let records = loader::load_prefix_table(&self.options.path, &self.options.table)?;

        let org_sizes = match &self.options.org_sizes {
            Some(path) => OrgSizeTable::from_json_file(path)?,
            None => OrgSizeTable::empty(),
        };

        let mut service = LookupService::from_records(records).with_org_sizes(org_sizes);
        if let Some(capacity) = self.options.cache_capacity {
            service = service.with_cache_capacity(capacity);
        }
        Ok(service)
    }
}

/// Prefix and organization lookups over one loaded table snapshot.
///
/// Built once, then immutable: safe for unbounded concurrent reads from any
/// number of threads with no locking. To serve a newer table snapshot, build
/// a fresh instance and swap it in via
/// [`SharedService`](crate::SharedService).
pub struct LookupService {
    trie: DualStackTrie,
    index: PrefixIndex,
    org_sizes: OrgSizeTable,
    cache_capacity: usize,
    cache_enabled: bool,
    /// Query statistics (thread-safe atomic counters)
    stats: Arc<ServiceStats>,
    /// Bumped by a shared handle on snapshot replacement to invalidate
    /// thread-local caches
    cache_generation: Arc<AtomicU64>,
}

impl LookupService {
    /// Create an opener with the fluent builder API.
    pub fn from(path: impl Into<PathBuf>) -> ServiceOpener {
        ServiceOpener::new(path)
    }

    /// Build a service directly from records.
    ///
    /// Partitions the rows by address family and populates the trie and the
    /// index together, from the same partition, so their key sets stay in
    /// lock-step. Rows whose prefix string does not parse as a CIDR are
    /// dropped with a warning; dataset validation is out of scope.
    pub fn from_records(records: Vec<PrefixRecord>) -> Self {
        let mut trie = DualStackTrie::new();
        let mut kept = Vec::with_capacity(records.len());
        let mut skipped = 0usize;

        for record in records {
            match parse_prefix(&record.prefix) {
                Ok(network) => {
                    trie.insert(&network, &record.prefix);
                    kept.push(record);
                }
                Err(_) => {
                    warn!(prefix = %record.prefix, "dropping row with unparseable prefix");
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!(rows = skipped, "dropped rows with unparseable prefixes");
        }

        let index = PrefixIndex::build(kept);
        debug!(
            ipv4 = trie.ipv4_count(),
            ipv6 = trie.ipv6_count(),
            records = index.record_count(),
            "built lookup structures"
        );

        Self {
            trie,
            index,
            org_sizes: OrgSizeTable::empty(),
            cache_capacity: DEFAULT_QUERY_CACHE_SIZE,
            cache_enabled: true,
            stats: Arc::new(ServiceStats::default()),
            cache_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Attach an organization-size side table.
    pub fn with_org_sizes(mut self, org_sizes: OrgSizeTable) -> Self {
        self.org_sizes = org_sizes;
        self
    }

    /// Set the query cache capacity; 0 disables caching.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        if capacity == 0 {
            self.cache_enabled = false;
        } else {
            self.cache_capacity = capacity;
            self.cache_enabled = true;
        }
        self
    }

    /// Resolve a prefix query to its covering table entry.
    ///
    /// The query is validated first (`addr` or `addr/len`; host bits are
    /// truncated), dispatched to its family's trie, canonicalized to the
    /// longest stored prefix covering it, and the full grouped entry for
    /// that canonical prefix is returned.
    ///
    /// Returns `Ok(None)` when no stored prefix covers the query — including
    /// the family-mismatch case — and `Err` only for syntactically invalid
    /// input, which never reaches the index.
    pub fn search_by_prefix(
        &self,
        query: &str,
    ) -> Result<Option<Arc<PrefixEntry>>, InvalidPrefixError> {
        self.stats.total_queries.fetch_add(1, Ordering::Relaxed);
        self.stats.prefix_queries.fetch_add(1, Ordering::Relaxed);

        // Only valid queries with a match are ever cached, so a hit can
        // bypass validation.
        if let Some(Some(entry)) = self.with_cache(|cache| cache.get(query).cloned()) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            self.stats.queries_with_match.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(entry));
        }

        let network = parse_prefix(query)?;
        let family = AddressFamily::of_network(&network);

        if self.cache_enabled {
            self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        }

        let Some(canonical) = self.trie.longest_covering(&network) else {
            self.stats
                .queries_without_match
                .fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let entry = match self.index.lookup_exact(canonical, family) {
            Some(entry) => Arc::clone(entry),
            None => {
                // The trie and index are built in lock-step, so a covering
                // prefix without an index entry is an internal consistency
                // failure, reported rather than swallowed.
                error!(canonical, %family, "covering prefix missing from index");
                debug_assert!(false, "trie and index out of lock-step");
                self.stats
                    .queries_without_match
                    .fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
        };

        self.stats.queries_with_match.fetch_add(1, Ordering::Relaxed);
        self.with_cache(|cache| cache.put(query.to_string(), Arc::clone(&entry)));
        Ok(Some(entry))
    }

    /// All records whose organization owner contains `fragment`.
    ///
    /// Matching is case-insensitive on the raw fragment (no normalization),
    /// records without an owner never match, and results come back in
    /// source-table order.
    pub fn search_by_organization(&self, fragment: &str) -> Vec<Arc<PrefixRecord>> {
        self.stats.total_queries.fetch_add(1, Ordering::Relaxed);
        self.stats.org_queries.fetch_add(1, Ordering::Relaxed);

        let matches = self.index.matching_organization(fragment);
        if matches.is_empty() {
            self.stats
                .queries_without_match
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.queries_with_match.fetch_add(1, Ordering::Relaxed);
        }
        matches
    }

    /// Enrichment tags for an organization name, if the side table has it.
    ///
    /// The name is normalized before lookup. `None` just means no enrichment
    /// is available; the side table is optional and often empty.
    pub fn organization_info(&self, name: &str) -> Option<&str> {
        self.org_sizes.get(name)
    }

    /// Distinct canonical prefixes across both families.
    pub fn prefix_count(&self) -> usize {
        self.index.prefix_count()
    }

    /// Distinct canonical prefixes for one family.
    pub fn family_count(&self, family: AddressFamily) -> usize {
        self.index.family_count(family)
    }

    /// Total rows kept from the source table.
    pub fn record_count(&self) -> usize {
        self.index.record_count()
    }

    /// Get a statistics snapshot aggregated across all threads.
    pub fn stats(&self) -> ServiceStatsSnapshot {
        self.stats.snapshot()
    }

    /// Clear the current thread's query cache.
    pub fn clear_cache(&self) {
        if self.cache_enabled {
            QUERY_CACHE.with(|cache| {
                if let Some((_, c)) = cache.borrow_mut().as_mut() {
                    c.clear();
                }
            });
        }
    }

    /// Number of entries in the current thread's query cache.
    pub fn cache_size(&self) -> usize {
        if !self.cache_enabled {
            return 0;
        }
        QUERY_CACHE.with(|cache| cache.borrow().as_ref().map_or(0, |(_, c)| c.len()))
    }

    /// Adopt a shared generation counter (used by a shared handle so that
    /// swapping snapshots invalidates thread-local caches).
    pub(crate) fn set_cache_generation(&mut self, generation: Arc<AtomicU64>) {
        self.cache_generation = generation;
    }

    /// Access the thread-local cache, initializing or invalidating it when
    /// the generation changed.
    #[inline]
    fn with_cache<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut LruCache<String, Arc<PrefixEntry>, BuildHasherDefault<FxHasher>>) -> R,
    {
        if !self.cache_enabled {
            return None;
        }

        let current_gen = self.cache_generation.load(Ordering::Acquire);

        QUERY_CACHE.with(|cache| {
            let capacity = NonZeroUsize::new(self.cache_capacity)?;
            let mut cache_borrow = cache.borrow_mut();

            let needs_reset = match *cache_borrow {
                None => true,
                Some((generation, _)) if generation != current_gen => true,
                _ => false,
            };

            if needs_reset {
                *cache_borrow = Some((
                    current_gen,
                    LruCache::with_hasher(capacity, BuildHasherDefault::<FxHasher>::default()),
                ));
            }

            cache_borrow.as_mut().map(|(_, cache)| f(cache))
        })
    }
}
