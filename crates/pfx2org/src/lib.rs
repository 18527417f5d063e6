//! pfx2org - Prefix-to-Organization Lookup
//!
//! Resolves an IP prefix or an organization-name fragment against a dataset
//! mapping network prefixes to owning organizations. The dataset is loaded
//! once from a Parquet table into two in-memory structures per address
//! family: a longest-prefix-match trie that canonicalizes an arbitrary query
//! prefix to the exact stored prefix covering it, and an index from that
//! canonical prefix to its one-or-more organization records.
//!
//! # Quick Start
//!
//! ```no_run
//! use pfx2org::LookupService;
//!
//! let service = LookupService::from("pfx2org_sample_2025-04-01.parquet").load()?;
//!
//! // Longest-covering-prefix lookup: a /28 inside a stored /25 resolves to
//! // the /25's entry.
//! if let Some(entry) = service.search_by_prefix("216.1.81.5/28")? {
//!     for record in entry.records() {
//!         println!("{} -> {:?}", entry.prefix(), record.owner);
//!     }
//! }
//!
//! // Case-insensitive substring search over organization owners.
//! for record in service.search_by_organization("corp") {
//!     println!("{} owned by {:?}", record.prefix, record.owner);
//! }
//! # Ok::<(), pfx2org::Pfx2OrgError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! Parquet table ──load once──▶ Vec<PrefixRecord>
//!                                   │ partition by family
//!                    ┌──────────────┴──────────────┐
//!              DualStackTrie                 PrefixIndex
//!        (membership, LPM walk)     (canonical prefix → records)
//!                    └──────────────┬──────────────┘
//!                             LookupService
//!                    search_by_prefix / search_by_organization
//! ```
//!
//! Both structures are built together from the same partition, so their key
//! sets stay in lock-step, and are immutable afterward: queries are pure
//! in-memory reads, safe for unbounded concurrency without locking. A newer
//! snapshot replaces the whole instance atomically via [`SharedService`].

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types for load-time and query-time failures
pub mod error;
/// Canonical-prefix index with grouped records
pub mod index;
/// Parquet source-table loading
pub mod loader;
/// Organization-string normalization
pub mod normalize;
/// Optional organization-size side table
pub mod org_size;
/// Record model for table rows
pub mod record;
/// The query façade
pub mod service;
/// Atomic snapshot replacement
pub mod shared;

pub use crate::error::{LoadError, Pfx2OrgError, Result};
pub use crate::index::{PrefixEntry, PrefixIndex};
pub use crate::loader::{load_prefix_table, TableConfig};
pub use crate::normalize::normalize;
pub use crate::org_size::OrgSizeTable;
pub use crate::record::{AttrValue, PrefixRecord};
pub use crate::service::{LookupService, ServiceOpener, ServiceStats, ServiceStatsSnapshot};
pub use crate::shared::SharedService;

/// Longest-prefix-match primitives, re-exported from the trie crate
pub use pfx2org_ip_trie::{parse_prefix, AddressFamily, DualStackTrie, InvalidPrefixError, IpNetwork};

/// Library version string
pub const PFX2ORG_VERSION: &str = env!("CARGO_PKG_VERSION");
