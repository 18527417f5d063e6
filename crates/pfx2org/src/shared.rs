//! Atomic snapshot replacement
//!
//! A [`SharedService`] holds the current [`LookupService`] behind a
//! lock-free atomic Arc pointer. When a new table snapshot is loaded (for
//! example a newer dated export), [`replace`](SharedService::replace) swaps
//! the fully built instance in atomically: in-flight queries keep the old
//! structures alive until they drop their Arc, and no reader ever observes a
//! partially built service.
//!
//! # Example
//!
//! ```no_run
//! use pfx2org::{LookupService, SharedService};
//!
//! let shared = SharedService::new(
//!     LookupService::from("pfx2org_sample_2025-04-01.parquet").load()?,
//! );
//!
//! // Later, a newer snapshot appears:
//! shared.replace(LookupService::from("pfx2org_sample_2025-05-01.parquet").load()?);
//!
//! // Queries transparently use the latest snapshot.
//! let result = shared.search_by_prefix("216.1.81.0/24")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::index::PrefixEntry;
use crate::record::PrefixRecord;
use crate::service::LookupService;
use arc_swap::ArcSwap;
use pfx2org_ip_trie::InvalidPrefixError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared handle over the current service snapshot.
///
/// `Send + Sync`; clone-free sharing via `Arc<SharedService>`. The query
/// path takes no locks: readers load the current Arc, and the generation
/// counter lets per-thread query caches notice a swap and reset.
pub struct SharedService {
    /// Current service behind a lock-free atomic Arc pointer
    current: ArcSwap<LookupService>,
    /// Incremented on each replacement to invalidate thread-local caches
    generation: Arc<AtomicU64>,
}

impl SharedService {
    /// Wrap a freshly built service.
    pub fn new(mut service: LookupService) -> Self {
        // Generation 1: distinct from the 0 that unshared services carry.
        let generation = Arc::new(AtomicU64::new(1));
        service.set_cache_generation(Arc::clone(&generation));
        Self {
            current: ArcSwap::from_pointee(service),
            generation,
        }
    }

    /// Swap in a new fully built snapshot.
    ///
    /// The generation is bumped before the swap so that a thread-local cache
    /// populated against the old snapshot can never serve the new one.
    pub fn replace(&self, mut service: LookupService) {
        service.set_cache_generation(Arc::clone(&self.generation));
        self.generation.fetch_add(1, Ordering::Release);
        self.current.store(Arc::new(service));
        info!(
            generation = self.generation.load(Ordering::Relaxed),
            "replaced service snapshot"
        );
    }

    /// The current snapshot, for callers that want to pin one across
    /// several queries.
    pub fn snapshot(&self) -> Arc<LookupService> {
        self.current.load_full()
    }

    /// Current generation counter (starts at 1, bumped per replacement).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Prefix query against the current snapshot.
    pub fn search_by_prefix(
        &self,
        query: &str,
    ) -> Result<Option<Arc<PrefixEntry>>, InvalidPrefixError> {
        self.current.load().search_by_prefix(query)
    }

    /// Organization query against the current snapshot.
    pub fn search_by_organization(&self, fragment: &str) -> Vec<Arc<PrefixRecord>> {
        self.current.load().search_by_organization(fragment)
    }
}
