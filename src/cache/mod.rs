//! Vetrina cache subsystem.
//!
//! Everything that survives a request lives behind the durable
//! [`store::CacheStore`]: serialized cache entries, the fragment registry,
//! popularity counters, and search index snapshots. Request handlers are
//! stateless; there is no in-process cache shared across invocations.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `vetrina.toml`:
//!
//! ```toml
//! [cache]
//! stale_threshold = 0.75
//! ttl_short_seconds = 1800
//! # ... see config for all options
//! ```

mod entry;
pub mod keys;
mod popularity;
mod registry;
mod revalidate;
mod store;
mod ttl;

pub use entry::{CacheEntry, Freshness};
pub use popularity::PopularityTracker;
pub use registry::{FragmentRegistry, InvalidationOutcome, InvalidationSelector};
pub use revalidate::{CacheRead, Revalidator};
pub use store::{CacheStore, MemoryStore, PutOptions, StoreError, StoredEntry, get_json, put_json};
pub use ttl::TtlPolicy;
