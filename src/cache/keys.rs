//! Cache key construction.
//!
//! Every key family gets a distinct prefix so prefix listing can scope
//! registry sweeps and counter aggregation without touching other data.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use time::Date;

use crate::domain::fragment::FragmentKey;

pub const PRODUCT_PREFIX: &str = "product:";
pub const FRAGMENT_PREFIX: &str = "fragment:";
pub const REGISTRY_PREFIX: &str = "fragment-registry:";
pub const POPULARITY_PREFIX: &str = "popularity:";
pub const SEARCH_RESULT_PREFIX: &str = "search:results:";
pub const INDEX_CURRENT_KEY: &str = "search:index:current";

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

pub fn product_key(id: &str) -> String {
    format!("{PRODUCT_PREFIX}{id}")
}

pub fn fragment_key(key: &FragmentKey) -> String {
    format!("{FRAGMENT_PREFIX}{key}")
}

pub fn registry_key(key: &FragmentKey) -> String {
    format!("{REGISTRY_PREFIX}{key}")
}

/// Day-bucketed counter key. The calendar date is rendered explicitly so
/// key ordering matches chronological ordering.
pub fn popularity_key(day: Date, entity: &str) -> String {
    format!("{}{}:{entity}", POPULARITY_PREFIX, day_bucket(day))
}

pub fn popularity_day_prefix(day: Date) -> String {
    format!("{}{}:", POPULARITY_PREFIX, day_bucket(day))
}

pub fn day_bucket(day: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        day.year(),
        u8::from(day.month()),
        day.day()
    )
}

pub fn search_result_key(query_hash: u64) -> String {
    format!("{SEARCH_RESULT_PREFIX}{query_hash:016x}")
}

pub fn index_backup_key(version: u64) -> String {
    format!("search:index:v{version}")
}
